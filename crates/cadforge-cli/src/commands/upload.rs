//! Upload command: runs a full session lifecycle in one invocation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;

use cadforge_core::{
    validate, ContentRef, EntryId, FileRegistry, FileStatus, ForgeConfig, ForgeError,
    ProcessingAction, SessionEvent, TargetFormat, UploadSession,
};
use cadforge_services::{HttpContourService, MockConverter, MockScanner};

pub async fn run(
    files: Vec<PathBuf>,
    contour: bool,
    convert: Option<String>,
    out: PathBuf,
) -> Result<()> {
    let config = ForgeConfig::load_from_directory(&std::env::current_dir()?)?;

    // Validate the requested action before any upload happens
    let action = match (contour, convert) {
        (true, _) => Some(ProcessingAction::Contour),
        (false, Some(format)) => Some(ProcessingAction::Convert(TargetFormat::parse(&format)?)),
        (false, None) => None,
    };

    let session = build_session(config)?;
    let printer = tokio::spawn(print_events(session.subscribe()));

    let mut uploaded = Vec::new();
    for path in &files {
        match upload_one(&session, path).await {
            Ok(id) => uploaded.push(id),
            Err(e) => eprintln!("{} {}: {}", "Skipped".yellow(), path.display(), e),
        }
    }

    if uploaded.is_empty() {
        printer.abort();
        anyhow::bail!("No files were uploaded");
    }

    wait_for_scans(&session).await;

    if let Some(action) = action {
        run_action(&session, action, &uploaded).await;
    }

    print_listing(&session).await;
    write_artifacts(&session, &out).await?;

    // Give the printer a moment to drain before tearing it down
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    Ok(())
}

fn build_session(config: ForgeConfig) -> Result<UploadSession> {
    let scanner = Arc::new(MockScanner::from_config(&config));
    let converter = Arc::new(MockConverter::from_config(&config));
    let contour = Arc::new(HttpContourService::from_config(&config)?);
    Ok(UploadSession::new(
        Arc::new(FileRegistry::new()),
        scanner,
        converter,
        contour,
        config,
    ))
}

async fn upload_one(session: &UploadSession, path: &Path) -> Result<EntryId> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?;
    let bytes =
        std::fs::read(path).map_err(|e| ForgeError::UploadFailed(e.to_string()))?;
    let id = session.upload(name, ContentRef::from_bytes(bytes)).await?;
    Ok(id)
}

/// Block until no entry is still awaiting its security verdict.
async fn wait_for_scans(session: &UploadSession) {
    loop {
        if session
            .registry()
            .by_status(FileStatus::Pending)
            .await
            .is_empty()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Run the action once per uploaded entry. Processing by explicit id keeps
/// the pass bounded: under the sibling policy a finished source returns to
/// `Secure` and eligibility-based selection would claim it again.
async fn run_action(session: &UploadSession, action: ProcessingAction, uploaded: &[EntryId]) {
    for id in uploaded {
        match session.process_entry(id, action).await {
            Ok(_) => {}
            // Entry was rejected by the scan or deleted; nothing to do
            Err(ForgeError::NoEligibleEntry) => {}
            // Service failures are already surfaced as notifications
            Err(_) => {}
        }
    }
}

async fn print_listing(session: &UploadSession) {
    let files = session.files().await;
    if files.is_empty() {
        println!("\n{}", "No files in this session.".dimmed());
        return;
    }

    println!("\n{}", "Files".bold());
    for entry in &files {
        let status = match entry.status {
            FileStatus::Ready | FileStatus::Secure => entry.status.to_string().green(),
            FileStatus::Failed => entry.status.to_string().red(),
            _ => entry.status.to_string().normal(),
        };
        let marker = if entry.is_derived_artifact { "derived" } else { "upload" };
        println!(
            "  {:<40} {:>10}  {}  ({})",
            entry.name,
            validate::format_size(entry.size_bytes),
            status,
            marker
        );
    }
}

async fn write_artifacts(session: &UploadSession, out: &Path) -> Result<()> {
    let entries = session.files().await;
    let ready: Vec<_> = entries
        .iter()
        .filter(|e| e.status == FileStatus::Ready)
        .collect();
    if ready.is_empty() {
        return Ok(());
    }

    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory {}", out.display()))?;

    for entry in ready {
        let download = session.download(&entry.id).await?;
        match &download.content {
            ContentRef::Memory(bytes) => {
                let path = out.join(&download.file_name);
                std::fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("{} {}", "Saved".green().bold(), path.display());
            }
            ContentRef::Location(location) => {
                println!(
                    "{} {} -> {}",
                    "Converted".green().bold(),
                    download.file_name,
                    location
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadforge_core::{
        ContourService, ConversionService, ConvertedArtifact, Result as ForgeResult, ScanVerdict,
        SecurityScanner,
    };

    struct InstantScanner;

    #[async_trait]
    impl SecurityScanner for InstantScanner {
        async fn scan(&self, _content: &ContentRef, _size_bytes: u64) -> ForgeResult<ScanVerdict> {
            Ok(ScanVerdict::Accepted)
        }
    }

    struct InstantConverter;

    #[async_trait]
    impl ConversionService for InstantConverter {
        async fn convert(
            &self,
            id: &EntryId,
            format: TargetFormat,
        ) -> ForgeResult<ConvertedArtifact> {
            Ok(ConvertedArtifact {
                location: format!("converted/{}.{}", id, format),
            })
        }
    }

    struct InstantContour;

    #[async_trait]
    impl ContourService for InstantContour {
        async fn extract(&self, _file_name: &str, _content: ContentRef) -> ForgeResult<ContentRef> {
            Ok(ContentRef::from_bytes(vec![1u8; 16]))
        }
    }

    fn test_session() -> UploadSession {
        let config = ForgeConfig {
            upload_tick_ms: 1,
            upload_ticks: 1,
            ..Default::default()
        };
        UploadSession::new(
            Arc::new(FileRegistry::new()),
            Arc::new(InstantScanner),
            Arc::new(InstantConverter),
            Arc::new(InstantContour),
            config,
        )
    }

    #[tokio::test]
    async fn contour_pass_processes_each_upload_exactly_once() {
        let session = test_session();
        let a = session
            .upload("a.dwg", ContentRef::from_bytes(vec![0u8; 64]))
            .await
            .unwrap();
        let b = session
            .upload("b.dwg", ContentRef::from_bytes(vec![0u8; 64]))
            .await
            .unwrap();
        wait_for_scans(&session).await;

        run_action(&session, ProcessingAction::Contour, &[a, b]).await;

        // Two originals plus one sibling artifact each; sources reverted to
        // Secure must not be picked up again within the same pass.
        let files = session.files().await;
        assert_eq!(files.len(), 4);
        assert_eq!(files.iter().filter(|e| e.is_derived_artifact).count(), 2);
    }

    #[tokio::test]
    async fn conversion_pass_skips_rejected_uploads() {
        let session = test_session();
        let id = session
            .upload("a.dwg", ContentRef::from_bytes(vec![0u8; 64]))
            .await
            .unwrap();
        wait_for_scans(&session).await;
        session.delete(&id).await;

        // A removed id is skipped rather than erroring the whole pass
        run_action(&session, ProcessingAction::Convert(TargetFormat::Pdf), &[id]).await;
        assert!(session.files().await.is_empty());
    }
}

/// Event subscriber: renders registry notifications as colored lines and
/// drives the upload progress bar. The toast analogue of the pipeline.
async fn print_events(mut rx: broadcast::Receiver<SessionEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Ok(event) = rx.recv().await {
        match event {
            SessionEvent::UploadProgress { percent } => {
                let b = bar.get_or_insert_with(|| {
                    let b = ProgressBar::new(100);
                    b.set_style(
                        ProgressStyle::with_template("  uploading {bar:30} {pos:>3}%")
                            .expect("static template"),
                    );
                    b
                });
                b.set_position(percent as u64);
                if percent >= 100 {
                    if let Some(b) = bar.take() {
                        b.finish_and_clear();
                    }
                }
            }
            SessionEvent::Uploaded { name, .. } => {
                println!("{} {}", "Uploaded".green().bold(), name);
            }
            SessionEvent::ScanPassed { .. } => {
                println!("{}", "Security check passed".green());
            }
            SessionEvent::ScanRejected { name, .. } => {
                println!(
                    "{} {} has been removed",
                    "Security check failed:".red().bold(),
                    name
                );
            }
            SessionEvent::ProcessingStarted { action, .. } => {
                println!("{} {}...", "Running".cyan(), action);
            }
            SessionEvent::ProcessingSucceeded { derived, .. } => {
                if derived.is_some() {
                    println!("{}", "Derived artifact registered".green());
                } else {
                    println!("{}", "Processing finished".green());
                }
            }
            SessionEvent::ProcessingFailed { message, .. } => {
                println!("{} {}", "Processing failed:".red().bold(), message);
            }
            SessionEvent::Deleted { .. } => {
                println!("{}", "File deleted".dimmed());
            }
        }
    }
}
