use std::{fs::File, io::BufWriter};

use trema::{CsvOptions, Database, Status, export_csv, traits::Parser};

use crate::validation::{validate_file_path, validate_language_code, validate_output_path};

/// Export one language of the database to a spreadsheet CSV file.
///
/// Returns the number of rows written.
pub fn run_export(
    db_path: &str,
    language: &str,
    output: &str,
    statuses: Option<&str>,
    options: &CsvOptions,
) -> Result<usize, String> {
    validate_file_path(db_path)?;
    validate_language_code(language)?;
    validate_output_path(output)?;

    let statuses = statuses.map(Status::parse_list);
    if let Some(statuses) = &statuses
        && statuses.is_empty()
    {
        return Err("Status filter cannot be empty".to_string());
    }

    let db = Database::read_from(db_path)
        .map_err(|e| format!("Cannot read database {}: {}", db_path, e))?;
    if language != db.master_language() && !db.languages().contains(language) {
        return Err(format!("Language {} not found in database", language));
    }

    let file = File::create(output).map_err(|e| format!("Cannot create {}: {}", output, e))?;
    export_csv(
        &db,
        language,
        statuses.as_deref(),
        BufWriter::new(file),
        options,
    )
    .map_err(|e| format!("Cannot export to {}: {}", output, e))
}
