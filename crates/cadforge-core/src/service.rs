//! Service collaborator contracts
//!
//! The session orchestrates against these traits; the concrete scanner,
//! converter, and contour client live in `cadforge-services`.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ContentRef, EntryId, TargetFormat};

/// Outcome of a security scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanVerdict {
    Accepted,
    Rejected,
}

/// Reference to a converted artifact produced by the conversion service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertedArtifact {
    pub location: String,
}

/// Asynchronous security check over uploaded content.
///
/// The scan runs in the background after registration; entry creation never
/// waits on it.
#[async_trait]
pub trait SecurityScanner: Send + Sync {
    async fn scan(&self, content: &ContentRef, size_bytes: u64) -> Result<ScanVerdict>;
}

/// Converts a registered file to a target format.
///
/// The format is validated against [`TargetFormat`] before a call ever
/// reaches an implementation.
#[async_trait]
pub trait ConversionService: Send + Sync {
    async fn convert(&self, id: &EntryId, format: TargetFormat) -> Result<ConvertedArtifact>;
}

/// Extracts a contour artifact from raw file bytes.
#[async_trait]
pub trait ContourService: Send + Sync {
    async fn extract(&self, file_name: &str, content: ContentRef) -> Result<ContentRef>;
}
