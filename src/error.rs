//! All error types for the trema crate.
//!
//! These are returned from all fallible operations (analyzer construction,
//! parsing, serialization, database edits).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "the imported language `{imported}` does not match the database master language `{database}`"
    )]
    LanguageMismatch { imported: String, database: String },

    #[error(
        "the imported master language `{imported}` does not match the database master language `{database}`"
    )]
    MasterLanguageMismatch { imported: String, database: String },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("CSV parse error: {0}")]
    CsvParse(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid row at line {line}: {message}")]
    InvalidRow { line: usize, message: String },

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("unknown encoding `{0}`")]
    UnknownEncoding(String),
}

impl Error {
    /// Creates a new row error for the given 1-based line.
    pub fn invalid_row(line: usize, message: impl Into<String>) -> Self {
        Error::InvalidRow {
            line,
            message: message.into(),
        }
    }

    /// Creates a new header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Error::InvalidHeader(message.into())
    }

    /// Whether the error rejects the pairing of an import source with a
    /// database rather than the content of either.
    pub fn is_language_mismatch(&self) -> bool {
        matches!(
            self,
            Error::LanguageMismatch { .. } | Error::MasterLanguageMismatch { .. }
        )
    }
}
