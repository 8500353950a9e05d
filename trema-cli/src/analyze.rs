use trema::{Analysis, Analyzer, AnalyzerOptions, CsvFile, CsvOptions, Database, traits::Parser};

use crate::validation::{validate_file_path, validate_output_path};

/// Inputs shared by `analyze` and `import`.
#[derive(Debug, Clone)]
pub struct AnalyzeContext {
    pub db: String,
    pub input: String,
    pub csv: CsvOptions,
    pub keep_db_master: bool,
}

/// Read the database and the CSV file and analyze one against the other.
pub fn load_analysis(context: &AnalyzeContext) -> Result<(Database, Analysis), String> {
    validate_file_path(&context.db)?;
    validate_file_path(&context.input)?;

    let db = Database::read_from(&context.db)
        .map_err(|e| format!("Cannot read database {}: {}", context.db, e))?;
    let import = CsvFile::read_from_with(&context.input, &context.csv)
        .map_err(|e| format!("Cannot read {}: {}", context.input, e))?;

    let options = AnalyzerOptions::new().with_master_value_from_file(!context.keep_db_master);
    let mut analyzer =
        Analyzer::with_options(&import, &db, options).map_err(|e| e.to_string())?;
    analyzer.analyze();
    let analysis = analyzer.into_analysis();

    Ok((db, analysis))
}

/// Analyze, apply the accepted changes and write the updated database.
///
/// Accepted conflicting changes are applied only with `include_conflicting`.
/// Returns the number of changes applied.
pub fn run_import(
    context: &AnalyzeContext,
    output: &str,
    include_conflicting: bool,
) -> Result<usize, String> {
    validate_output_path(output)?;
    let (mut db, analysis) = load_analysis(context)?;

    let applied = if include_conflicting {
        analysis.apply(&mut db)
    } else {
        analysis.apply_non_conflicting(&mut db)
    };

    db.write_to(output)
        .map_err(|e| format!("Cannot write database {}: {}", output, e))?;
    Ok(applied)
}
