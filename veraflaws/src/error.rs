//! Error types for veraflaws
use crate::credentials::CredentialError;
use std::path::PathBuf;
use veracode_platform::{BuildError, VeracodeError};

/// Custom error type for veraflaws operations
#[derive(thiserror::Error, Debug)]
pub enum FlawsError {
    /// Client construction or other Veracode API error
    #[error("Veracode API error: {0}")]
    VeracodeApi(#[from] VeracodeError),

    /// The account's application list could not be retrieved
    #[error("Failed to list applications: {0}")]
    ApplicationList(#[source] VeracodeError),

    /// The build history of an application could not be retrieved
    #[error("Failed to list builds for application {app_id}: {source}")]
    BuildList {
        app_id: String,
        #[source]
        source: BuildError,
    },

    /// Credential error
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// The output file could not be created
    #[error("Failed to create output file {}: {source}", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding error outside a data row (header)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A data row could not be written and row failures are fatal
    #[error("Failed to write row {unique_id}: {source}")]
    RowWrite {
        unique_id: String,
        #[source]
        source: csv::Error,
    },

    /// File I/O error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for veraflaws operations
pub type Result<T> = std::result::Result<T, FlawsError>;
