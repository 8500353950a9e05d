#![forbid(unsafe_code)]
//! Text resource database toolkit for Rust.
//!
//! Translators edit exported resource files offline; `trema` merges their
//! work back into the database without silently overwriting newer work and
//! without letting them add keys or languages.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use trema::{Analyzer, CsvFile, Database, traits::Parser};
//!
//! let mut db = Database::read_from("texts.json")?;
//! let import = CsvFile::read_from("texts_fr.csv")?;
//!
//! let mut analyzer = Analyzer::new(&import, &db)?;
//! analyzer.analyze();
//! for change in analyzer.conflicting_changes() {
//!     println!("needs review: {}", change);
//! }
//! let analysis = analyzer.into_analysis();
//! analysis.apply_non_conflicting(&mut db);
//! db.write_to("texts.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Change types
//!
//! - **Key / language / master language additions**: reported, never applied
//! - **Master value changed**: acceptable, but not accepted by default
//! - **Imported status older / newer**: same text, different status
//! - **Value changed / value and status changed**: decided by the status
//!   the database holds

pub mod analyzer;
pub mod change;
pub mod error;
pub mod formats;
pub mod import;
pub mod status;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    analyzer::{
        Analysis, AnalysisSummary, Analyzer, AnalyzerOptions, ImportedKey, apply_all,
        apply_change, classify, decide, is_applicable,
    },
    change::{Change, ChangeType, ConflictDecision},
    error::Error,
    formats::{CsvFile, CsvOptions, export_csv},
    import::{ImportFile, ImportRecord},
    status::Status,
    traits::ImportSource,
    types::{Database, DatabaseEvent, TextNode, ValueNode},
};
