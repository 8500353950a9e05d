//! CLI library for testing purposes

pub mod analyze;
pub mod export;
pub mod report;
pub mod validation;

pub use analyze::{AnalyzeContext, load_analysis, run_import};
pub use export::run_export;
pub use report::{format_change, print_report};
