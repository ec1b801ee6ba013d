//! Veraflaws - Veracode flaw export
//!
//! Collects the flaws of the most recent completed build of every application
//! in a Veracode account and writes them to a single CSV report.
pub mod cli;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod filter;
pub mod row;
pub mod selector;
pub mod source;
pub mod writer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use driver::{RunConfig, RunSummary, run};
pub use error::{FlawsError, Result};
pub use filter::FilterOptions;
pub use source::FlawSource;
pub use writer::WriteFailurePolicy;
