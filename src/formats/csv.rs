//! Spreadsheet CSV export files.
//!
//! The layout is the one translators get from an export and send back:
//!
//! ```text
//! Key;Status;[Master (<lang>);]Value (<lang>);Context
//! ```
//!
//! The `Master` column is present only when the exported language is not
//! the master language. Header names are matched case-insensitively; the
//! languages are taken from the parenthesised suffix. The context column is
//! written for translators and ignored on import.

use std::{
    fs::File,
    io::{BufRead, Read, Write},
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;
use unic_langid::LanguageIdentifier;

use crate::{
    error::Error,
    import::ImportFile,
    status::Status,
    traits::{ImportSource, Parser},
    types::Database,
};

pub const KEY_HEADER: &str = "Key";
pub const STATUS_HEADER: &str = "Status";
pub const MASTER_HEADER: &str = "Master";
pub const VALUE_HEADER: &str = "Value";
pub const CONTEXT_HEADER: &str = "Context";

const WRONG_HEADER: &str =
    "expected header format: Key;Status;[Master (<language>);]Value (<language>);Context";

lazy_static! {
    static ref LANGUAGE_REGEX: Regex = Regex::new(r"\(([^()]*)\)").unwrap();
}

/// Options for reading and writing CSV files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field separator. Defaults to `;`.
    pub separator: u8,

    /// WHATWG encoding label used when reading from a path. Without one the
    /// file is read as UTF-8, honouring a byte order mark.
    pub encoding: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            separator: b';',
            encoding: None,
        }
    }
}

impl CsvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// Languages declared by a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Columns {
    master_language: Option<String>,
    language: String,
}

impl Columns {
    fn count(&self) -> usize {
        if self.master_language.is_some() { 5 } else { 4 }
    }
}

/// An import source read from a spreadsheet CSV export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFile {
    path: Option<PathBuf>,
    file: ImportFile,
}

impl CsvFile {
    /// Parses CSV content from any reader.
    pub fn from_reader_with<R: Read>(reader: R, options: &CsvOptions) -> Result<Self, Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(options.separator)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = rdr.records();
        let header = match rows.next() {
            Some(record) => trimmed(&record?),
            None => return Err(Error::invalid_header("the file is empty")),
        };
        let columns = parse_header(&header)?;
        let mut file = ImportFile::new(columns.language.clone(), columns.master_language.clone());

        for (index, record) in rows.enumerate() {
            let record = record?;
            let line = record
                .position()
                .map(|position| position.line() as usize)
                .unwrap_or(index + 2);
            let row = trimmed(&record);

            if row.len() == 1 && row[0].is_empty() {
                continue;
            }
            if row.len() != columns.count() {
                return Err(Error::invalid_row(
                    line,
                    format!(
                        "Expected {} columns, but got {}.",
                        columns.count(),
                        row.len()
                    ),
                ));
            }

            let mut fields = row.into_iter();
            let key = fields.next().unwrap_or_default();
            let status = Status::by_name(&fields.next().unwrap_or_default());
            let master_value = if columns.master_language.is_some() {
                fields.next()
            } else {
                None
            };
            let value = fields.next().unwrap_or_default();
            file.add(key, status, master_value, value);
        }

        Ok(CsvFile { path: None, file })
    }

    /// Reads a CSV file, decoding it with the configured encoding.
    pub fn read_from_with<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Self, Error> {
        let path = path.as_ref();
        let encoding = match options.encoding.as_deref() {
            Some(label) => Some(
                encoding_rs::Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| Error::UnknownEncoding(label.to_string()))?,
            ),
            None => None,
        };

        let file = File::open(path).map_err(Error::Io)?;
        let decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .encoding(encoding)
            .bom_override(true)
            .build(file);

        let mut csv_file = Self::from_reader_with(decoder, options)?;
        csv_file.path = Some(path.to_path_buf());
        Ok(csv_file)
    }

    /// The path the file was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn import_file(&self) -> &ImportFile {
        &self.file
    }

    pub fn into_import_file(self) -> ImportFile {
        self.file
    }

    /// Writes the records back in the spreadsheet layout, with an empty
    /// context column.
    pub fn to_writer_with<W: Write>(&self, writer: W, options: &CsvOptions) -> Result<(), Error> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(options.separator)
            .from_writer(writer);

        let master_language = self.file.master_language();
        wtr.write_record(header_row(master_language, self.file.language()))?;
        for record in self.file.records() {
            let mut row = vec![record.key.as_str(), record.status.name()];
            if master_language.is_some() {
                row.push(record.master_value.as_deref().unwrap_or_default());
            }
            row.push(record.value.as_str());
            row.push("");
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl From<ImportFile> for CsvFile {
    fn from(file: ImportFile) -> Self {
        CsvFile { path: None, file }
    }
}

impl Parser for CsvFile {
    /// Parse `;` separated content from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        Self::from_reader_with(reader, &CsvOptions::default())
    }

    /// Override default file reading to support BOM-aware decoding.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::read_from_with(path, &CsvOptions::default())
    }

    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        self.to_writer_with(writer, &CsvOptions::default())
    }
}

impl ImportSource for CsvFile {
    fn len(&self) -> usize {
        self.file.len()
    }

    fn keys(&self) -> Vec<&str> {
        self.file.keys()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.file.contains_key(key)
    }

    fn language(&self) -> &str {
        self.file.language()
    }

    fn master_language(&self) -> Option<&str> {
        self.file.master_language()
    }

    fn status(&self, key: &str) -> Option<Status> {
        self.file.status(key)
    }

    fn value(&self, key: &str) -> Option<&str> {
        self.file.value(key)
    }

    fn master_value(&self, key: &str) -> Option<&str> {
        self.file.master_value(key)
    }
}

/// Exports the values of `language` in the spreadsheet layout.
///
/// Text nodes without a value for `language` are skipped, and so are values
/// whose status is not listed in `statuses` when a filter is given. Returns
/// the number of rows written, header excluded.
pub fn export<W: Write>(
    db: &Database,
    language: &str,
    statuses: Option<&[Status]>,
    writer: W,
    options: &CsvOptions,
) -> Result<usize, Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.separator)
        .from_writer(writer);

    let master_language = db.master_language();
    let with_master = language != master_language;
    wtr.write_record(header_row(with_master.then_some(master_language), language))?;

    let mut rows = 0;
    for text_node in db.text_nodes() {
        let Some(value_node) = text_node.value_node(language) else {
            continue;
        };
        if let Some(statuses) = statuses
            && !statuses.contains(&value_node.status)
        {
            continue;
        }

        let mut row = vec![text_node.key.as_str(), value_node.status.name()];
        if with_master {
            row.push(
                text_node
                    .value_node(master_language)
                    .map(|master| master.value.as_str())
                    .unwrap_or_default(),
            );
        }
        row.push(value_node.value.as_str());
        row.push(text_node.context.as_str());
        wtr.write_record(row)?;
        rows += 1;
    }
    wtr.flush()?;

    info!(language, rows, "exported csv");
    Ok(rows)
}

fn header_row(master_language: Option<&str>, language: &str) -> Vec<String> {
    let mut header = vec![KEY_HEADER.to_string(), STATUS_HEADER.to_string()];
    if let Some(master_language) = master_language {
        header.push(format!("{MASTER_HEADER} ({master_language})"));
    }
    header.push(format!("{VALUE_HEADER} ({language})"));
    header.push(CONTEXT_HEADER.to_string());
    header
}

fn trimmed(record: &csv::StringRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| field.trim_start().to_string())
        .collect()
}

fn parse_header(header: &[String]) -> Result<Columns, Error> {
    if header.len() < 4 {
        return Err(Error::invalid_header(WRONG_HEADER));
    }
    let column = |index: usize| header.get(index).map(String::as_str).unwrap_or_default();

    if !column(0).eq_ignore_ascii_case(KEY_HEADER) || !column(1).eq_ignore_ascii_case(STATUS_HEADER)
    {
        return Err(Error::invalid_header(WRONG_HEADER));
    }

    let mut current = 2;
    let master_language = if starts_with_ignore_case(column(current), MASTER_HEADER) {
        let language = extract_language(column(current))?;
        current += 1;
        Some(language)
    } else {
        None
    };

    if !starts_with_ignore_case(column(current), VALUE_HEADER) {
        return Err(Error::invalid_header(WRONG_HEADER));
    }
    let language = extract_language(column(current))?;
    if master_language.as_deref() == Some(language.as_str()) {
        return Err(Error::invalid_header(
            "the master language cannot be the same as the exported language",
        ));
    }
    current += 1;

    if !column(current).eq_ignore_ascii_case(CONTEXT_HEADER) {
        return Err(Error::invalid_header(WRONG_HEADER));
    }

    Ok(Columns {
        master_language,
        language,
    })
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Extracts `de` from `Value (de)`.
fn extract_language(heading: &str) -> Result<String, Error> {
    let language = LANGUAGE_REGEX
        .captures(heading)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim())
        .filter(|language| !language.is_empty())
        .ok_or_else(|| Error::invalid_header(WRONG_HEADER))?;

    language.parse::<LanguageIdentifier>().map_err(|_| {
        Error::invalid_header(format!("`{language}` is not a valid language code"))
    })?;
    Ok(language.to_string())
}
