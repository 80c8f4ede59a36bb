//! Upload session orchestration
//!
//! Tracks a file through upload -> security scan -> optional processing ->
//! ready for download. The session owns the registry plus the service
//! collaborators and is cheap to clone into background tasks.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ForgeConfig;
use crate::error::{ForgeError, Result};
use crate::registry::FileRegistry;
use crate::service::{ContourService, ConversionService, ScanVerdict, SecurityScanner};
use crate::types::{
    contour_file_name, replace_extension, ContentRef, DerivedArtifactPolicy, EntryId, FileEntry,
    FileStatus, ProcessingAction, SessionEvent, TargetFormat,
};
use crate::validate;

/// Result of a processing request: the claimed source entry and, when the
/// sibling policy applies, the id of the newly registered artifact.
#[derive(Clone, Debug)]
pub struct ProcessingOutcome {
    pub source: EntryId,
    pub derived: Option<EntryId>,
}

/// Content ready to hand to a download mechanism.
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub file_name: String,
    pub content: ContentRef,
}

#[derive(Clone)]
pub struct UploadSession {
    registry: Arc<FileRegistry>,
    scanner: Arc<dyn SecurityScanner>,
    converter: Arc<dyn ConversionService>,
    contour: Arc<dyn ContourService>,
    config: Arc<ForgeConfig>,
}

impl UploadSession {
    pub fn new(
        registry: Arc<FileRegistry>,
        scanner: Arc<dyn SecurityScanner>,
        converter: Arc<dyn ConversionService>,
        contour: Arc<dyn ContourService>,
        config: ForgeConfig,
    ) -> Self {
        Self {
            registry,
            scanner,
            converter,
            contour,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> Arc<FileRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.registry.subscribe()
    }

    /// Validate and register an upload, then kick off its background scan.
    ///
    /// Returns as soon as the entry is visible in the registry in `Pending`;
    /// the scan result is applied later through the registry, so an entry
    /// deleted mid-scan simply never sees its verdict.
    pub async fn upload(&self, name: &str, content: ContentRef) -> Result<EntryId> {
        validate::validate_upload(name, content.size_bytes(), &self.config)?;

        self.simulate_transfer().await?;

        let entry = FileEntry::new(name, content.clone());
        let id = entry.id.clone();
        self.registry.insert_front(entry).await?;
        info!("Uploaded {} ({})", name, id);
        self.registry.emit(SessionEvent::Uploaded {
            id: id.clone(),
            name: name.to_string(),
        });

        self.spawn_scan(id.clone(), name.to_string(), content);
        Ok(id)
    }

    /// Progress ticks for the simulated transfer. A real transport would
    /// report actual progress and may fail with `UploadFailed`.
    async fn simulate_transfer(&self) -> Result<()> {
        let ticks = self.config.upload_ticks;
        for tick in 1..=ticks {
            tokio::time::sleep(self.config.upload_tick()).await;
            let percent = (tick * 100 / ticks) as u8;
            self.registry.emit(SessionEvent::UploadProgress { percent });
        }
        Ok(())
    }

    fn spawn_scan(&self, id: EntryId, name: String, content: ContentRef) {
        let registry = self.registry.clone();
        let scanner = self.scanner.clone();
        let size = content.size_bytes();

        tokio::spawn(async move {
            let verdict = scanner.scan(&content, size).await;
            match verdict {
                Ok(ScanVerdict::Accepted) => {
                    let updated = registry
                        .update(&id, |e| e.status = FileStatus::Secure)
                        .await;
                    if updated {
                        info!("Security check passed for {}", name);
                        registry.emit(SessionEvent::ScanPassed { id });
                    }
                }
                Ok(ScanVerdict::Rejected) => {
                    if registry.remove(&id).await.is_some() {
                        warn!("Security check rejected {}, entry removed", name);
                        registry.emit(SessionEvent::ScanRejected { id, name });
                    }
                }
                Err(e) => {
                    // A scanner that cannot produce a verdict is treated as
                    // a rejection; the entry must not stay Pending forever.
                    if registry.remove(&id).await.is_some() {
                        warn!("Security scan of {} failed: {}", name, e);
                        registry.emit(SessionEvent::ScanRejected { id, name });
                    }
                }
            }
        });
    }

    /// Run a processing action against the oldest eligible entry.
    ///
    /// The entry is claimed atomically (`Secure`/`Failed` -> `Processing`),
    /// so a second request while one is in flight finds nothing to claim.
    /// Both continuations resolve the claim: success lands the artifact per
    /// the configured policy, failure returns the entry to a retryable
    /// `Failed` state.
    pub async fn process(&self, action: ProcessingAction) -> Result<ProcessingOutcome> {
        let id = self
            .registry
            .claim_oldest_eligible()
            .await
            .ok_or(ForgeError::NoEligibleEntry)?;
        self.run_claimed(id, action).await
    }

    /// Run a processing action against one specific entry.
    ///
    /// Callers that walk an explicit id list (each upload once) use this
    /// instead of repeated eligibility selection, which would re-pick a
    /// source the sibling policy returned to `Secure`. Entries that are
    /// not claimable (removed, still pending, already processing) report
    /// `NoEligibleEntry`.
    pub async fn process_entry(
        &self,
        id: &EntryId,
        action: ProcessingAction,
    ) -> Result<ProcessingOutcome> {
        if !self.registry.try_begin_processing(id).await {
            return Err(ForgeError::NoEligibleEntry);
        }
        self.run_claimed(id.clone(), action).await
    }

    async fn run_claimed(
        &self,
        id: EntryId,
        action: ProcessingAction,
    ) -> Result<ProcessingOutcome> {
        let entry = match self.registry.get(&id).await {
            Some(entry) => entry,
            None => return Err(ForgeError::EntryNotFound(id.to_string())),
        };

        info!("Starting {} for {}", action, entry.name);
        self.registry.emit(SessionEvent::ProcessingStarted {
            id: id.clone(),
            action,
        });

        let result = match action {
            ProcessingAction::Convert(format) => self.run_conversion(&entry, format).await,
            ProcessingAction::Contour => self.run_contour(&entry).await,
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Deleted-meanwhile entries make this a no-op; everything
                // else becomes eligible for a retry.
                let reverted = self
                    .registry
                    .update(&id, |e| e.status = FileStatus::Failed)
                    .await;
                if reverted {
                    warn!("{} failed for {}: {}", action, entry.name, e);
                    self.registry.emit(SessionEvent::ProcessingFailed {
                        id,
                        message: e.notification(),
                    });
                }
                Err(e)
            }
        }
    }

    async fn run_conversion(
        &self,
        entry: &FileEntry,
        format: TargetFormat,
    ) -> Result<ProcessingOutcome> {
        let artifact = self
            .converter
            .convert(&entry.id, format)
            .await
            .map_err(|e| match e {
                e @ (ForgeError::ConversionFailed(_) | ForgeError::Timeout) => e,
                other => ForgeError::ConversionFailed(other.notification()),
            })?;
        let content = ContentRef::Location(artifact.location);
        self.land_artifact(
            entry,
            self.config.conversion_policy,
            replace_extension(&entry.name, format.as_str()),
            format.as_str().to_string(),
            content,
        )
        .await
    }

    async fn run_contour(&self, entry: &FileEntry) -> Result<ProcessingOutcome> {
        let content = self
            .contour
            .extract(&entry.name, entry.original.clone())
            .await?;
        self.land_artifact(
            entry,
            self.config.contour_policy,
            contour_file_name(&entry.name),
            "contour".to_string(),
            content,
        )
        .await
    }

    /// Land a successful processing result per the configured policy.
    ///
    /// In-place: the source entry becomes `Ready` with the artifact
    /// attached. Sibling: the source returns to `Secure` and the artifact
    /// is registered as its own entry. If the source was deleted while the
    /// service ran, the result is discarded entirely.
    async fn land_artifact(
        &self,
        entry: &FileEntry,
        policy: DerivedArtifactPolicy,
        derived_name: String,
        format_tag: String,
        content: ContentRef,
    ) -> Result<ProcessingOutcome> {
        let id = entry.id.clone();
        match policy {
            DerivedArtifactPolicy::InPlace => {
                let updated = self
                    .registry
                    .update(&id, |e| {
                        e.status = FileStatus::Ready;
                        e.derived = Some(content.clone());
                        e.derived_format = Some(format_tag.clone());
                    })
                    .await;
                if !updated {
                    debug!("Source entry {} deleted mid-processing, result dropped", id);
                    return Ok(ProcessingOutcome {
                        source: id,
                        derived: None,
                    });
                }
                info!("{} is ready ({})", entry.name, format_tag);
                self.registry.emit(SessionEvent::ProcessingSucceeded {
                    id: id.clone(),
                    derived: None,
                });
                Ok(ProcessingOutcome {
                    source: id,
                    derived: None,
                })
            }
            DerivedArtifactPolicy::Sibling => {
                let reverted = self
                    .registry
                    .update(&id, |e| e.status = FileStatus::Secure)
                    .await;
                if !reverted {
                    debug!("Source entry {} deleted mid-processing, result dropped", id);
                    return Ok(ProcessingOutcome {
                        source: id,
                        derived: None,
                    });
                }

                let artifact = FileEntry::new_derived(derived_name, content);
                let derived_id = artifact.id.clone();
                let artifact_name = artifact.name.clone();
                self.registry.insert_front(artifact).await?;
                info!("Derived artifact {} registered", artifact_name);
                self.registry.emit(SessionEvent::ProcessingSucceeded {
                    id: id.clone(),
                    derived: Some(derived_id.clone()),
                });
                Ok(ProcessingOutcome {
                    source: id,
                    derived: Some(derived_id),
                })
            }
        }
    }

    /// Remove an entry in any state. In-flight scan or processing callbacks
    /// for it become no-ops.
    pub async fn delete(&self, id: &EntryId) -> bool {
        match self.registry.remove(id).await {
            Some(entry) => {
                info!("Deleted {} ({})", entry.name, id);
                self.registry.emit(SessionEvent::Deleted { id: id.clone() });
                true
            }
            None => false,
        }
    }

    /// Resolve an entry into downloadable content and a filename: the
    /// derived artifact with its format extension when attached, the
    /// original otherwise.
    pub async fn download(&self, id: &EntryId) -> Result<DownloadRequest> {
        let entry = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| ForgeError::EntryNotFound(id.to_string()))?;
        Ok(DownloadRequest {
            file_name: entry.download_name(),
            content: entry.download_content().clone(),
        })
    }

    pub async fn files(&self) -> Vec<FileEntry> {
        self.registry.snapshot().await
    }
}
