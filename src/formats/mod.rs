//! File formats import sources are read from and exported to.

pub mod csv;

// Reexporting the formats for easier access
pub use csv::{CsvFile, CsvOptions, export as export_csv};
