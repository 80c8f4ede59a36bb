//! Error types for CadForge

use thiserror::Error;

/// Main error type for CadForge
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Security check failed for {name}")]
    SecurityRejected { name: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Contour processing failed: {0}")]
    ContourFailed(String),

    #[error("Failed to process contour")]
    ProcessingFailed,

    #[error("Request timed out")]
    Timeout,

    #[error("No file is eligible for processing")]
    NoEligibleEntry,

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Duplicate entry id: {0}")]
    DuplicateEntry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found in {0}")]
    ConfigNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ForgeError {
    /// Message suitable for user-facing notifications.
    ///
    /// Service failures carry the backend's own message; it is surfaced
    /// verbatim, without the error-kind prefix Display adds.
    pub fn notification(&self) -> String {
        match self {
            ForgeError::Validation(msg)
            | ForgeError::UploadFailed(msg)
            | ForgeError::ConversionFailed(msg)
            | ForgeError::ContourFailed(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
