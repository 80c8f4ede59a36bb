//! Core type definitions for CadForge

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};

/// Unique identifier for a registry entry, assigned at creation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(String);

impl EntryId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque ownership handle to binary content.
///
/// Originals live in memory; a converted artifact may instead be a location
/// reference handed back by the conversion service. Dropping the last clone
/// releases in-memory content.
#[derive(Clone, Debug)]
pub enum ContentRef {
    Memory(Bytes),
    Location(String),
}

impl ContentRef {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        ContentRef::Memory(bytes.into())
    }

    /// In-memory content, if this handle holds any.
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            ContentRef::Memory(b) => Some(b),
            ContentRef::Location(_) => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            ContentRef::Memory(_) => None,
            ContentRef::Location(loc) => Some(loc),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            ContentRef::Memory(b) => b.len() as u64,
            ContentRef::Location(_) => 0,
        }
    }
}

/// Lifecycle status of a registry entry.
///
/// A rejected scan removes the entry from the registry outright, so
/// rejection is an event rather than a stored status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Secure,
    Processing,
    Ready,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Secure => "secure",
            FileStatus::Processing => "processing",
            FileStatus::Ready => "ready",
            FileStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported conversion targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Pdf,
    Svg,
    Png,
}

impl TargetFormat {
    /// Get all supported formats
    pub fn all() -> &'static [TargetFormat] {
        &[TargetFormat::Pdf, TargetFormat::Svg, TargetFormat::Png]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Svg => "svg",
            TargetFormat::Png => "png",
        }
    }

    /// Parse a user-supplied format tag. Unknown formats are a client-side
    /// validation error, never sent to the conversion service.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(TargetFormat::Pdf),
            "svg" => Ok(TargetFormat::Svg),
            "png" => Ok(TargetFormat::Png),
            other => Err(ForgeError::Validation(format!(
                "Unsupported conversion format: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TargetFormat {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A processing action requested against the oldest eligible entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingAction {
    Convert(TargetFormat),
    Contour,
}

impl std::fmt::Display for ProcessingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingAction::Convert(format) => write!(f, "convert to {}", format),
            ProcessingAction::Contour => write!(f, "contour extraction"),
        }
    }
}

/// Where a successful processing result lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedArtifactPolicy {
    /// Attach the derived artifact to the source entry.
    InPlace,
    /// Register the derived artifact as its own standalone entry.
    Sibling,
}

/// One tracked file (original upload or derived artifact).
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub id: EntryId,
    pub name: String,
    pub size_bytes: u64,
    pub original: ContentRef,
    pub derived: Option<ContentRef>,
    pub derived_format: Option<String>,
    pub status: FileStatus,
    pub is_derived_artifact: bool,
    pub created_at: DateTime<Utc>,
}

impl FileEntry {
    /// Create an entry for a freshly uploaded original, awaiting its scan.
    pub fn new(name: impl Into<String>, content: ContentRef) -> Self {
        Self {
            id: EntryId::new(),
            name: name.into(),
            size_bytes: content.size_bytes(),
            original: content,
            derived: None,
            derived_format: None,
            status: FileStatus::Pending,
            is_derived_artifact: false,
            created_at: Utc::now(),
        }
    }

    /// Create a standalone entry for a processing output. Derived artifacts
    /// skip the scan and are immediately downloadable.
    pub fn new_derived(name: impl Into<String>, content: ContentRef) -> Self {
        Self {
            id: EntryId::new(),
            name: name.into(),
            size_bytes: content.size_bytes(),
            original: content,
            derived: None,
            derived_format: None,
            status: FileStatus::Ready,
            is_derived_artifact: true,
            created_at: Utc::now(),
        }
    }

    /// Eligible target for a processing action. Failed entries may be
    /// retried; everything else is either not yet scanned, busy, or done.
    pub fn is_processable(&self) -> bool {
        matches!(self.status, FileStatus::Secure | FileStatus::Failed)
    }

    /// Filename to use when downloading this entry's content.
    pub fn download_name(&self) -> String {
        match &self.derived_format {
            Some(format) if self.derived.is_some() => replace_extension(&self.name, format),
            _ => self.name.clone(),
        }
    }

    /// Content reference to serve for a download: the derived artifact when
    /// one is attached, otherwise the original.
    pub fn download_content(&self) -> &ContentRef {
        self.derived.as_ref().unwrap_or(&self.original)
    }
}

/// Filename for a contour output: the original base name with a trailing
/// `.dwg`/`.dxf` stripped (case-insensitive), suffixed with `_contour.dwg`.
pub fn contour_file_name(original: &str) -> String {
    let base = match original.len().checked_sub(4) {
        Some(idx) if original.is_char_boundary(idx) => {
            let (head, tail) = original.split_at(idx);
            if tail.eq_ignore_ascii_case(".dwg") || tail.eq_ignore_ascii_case(".dxf") {
                head
            } else {
                original
            }
        }
        _ => original,
    };
    format!("{}_contour.dwg", base)
}

/// Replace the extension of `name` with `ext` (no leading dot). Names
/// without an extension get one appended.
pub fn replace_extension(name: &str, ext: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => format!("{}.{}", &name[..idx], ext),
        _ => format!("{}.{}", name, ext),
    }
}

/// Registry notification delivered to presentation adapters.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Uploaded { id: EntryId, name: String },
    UploadProgress { percent: u8 },
    ScanPassed { id: EntryId },
    ScanRejected { id: EntryId, name: String },
    ProcessingStarted { id: EntryId, action: ProcessingAction },
    ProcessingSucceeded { id: EntryId, derived: Option<EntryId> },
    ProcessingFailed { id: EntryId, message: String },
    Deleted { id: EntryId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_ids_are_distinct() {
        let ids: Vec<EntryId> = (0..64).map(|_| EntryId::new()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn contour_name_strips_cad_extensions() {
        assert_eq!(contour_file_name("floor.dwg"), "floor_contour.dwg");
        assert_eq!(contour_file_name("Plan.DWG"), "Plan_contour.dwg");
        assert_eq!(contour_file_name("site.dxf"), "site_contour.dwg");
        assert_eq!(contour_file_name("noext"), "noext_contour.dwg");
    }

    #[test]
    fn replace_extension_handles_missing_dot() {
        assert_eq!(replace_extension("plan.dwg", "pdf"), "plan.pdf");
        assert_eq!(replace_extension("plan", "pdf"), "plan.pdf");
        assert_eq!(replace_extension("a.b.dwg", "svg"), "a.b.svg");
    }

    #[test]
    fn parse_format_rejects_unknown() {
        assert_eq!(TargetFormat::parse("PDF").unwrap(), TargetFormat::Pdf);
        assert!(TargetFormat::parse("docx").is_err());
    }

    #[test]
    fn download_name_uses_derived_format() {
        let mut entry = FileEntry::new("plan.dwg", ContentRef::from_bytes(vec![1, 2, 3]));
        assert_eq!(entry.download_name(), "plan.dwg");

        entry.derived = Some(ContentRef::Location("converted/x.pdf".into()));
        entry.derived_format = Some("pdf".into());
        assert_eq!(entry.download_name(), "plan.pdf");
    }
}
