//! In-memory file registry
//!
//! The registry is the session's only shared mutable state. Every mutation
//! goes through its write lock, and every keyed mutation is a silent no-op
//! when the id is absent: a scan or service callback racing a user deletion
//! must never error or resurrect the entry.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::error::{ForgeError, Result};
use crate::types::{EntryId, FileEntry, FileStatus, SessionEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Ordered, unique-keyed collection of tracked files, newest first.
pub struct FileRegistry {
    entries: Arc<RwLock<Vec<FileEntry>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl FileRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            events,
        }
    }

    /// Subscribe to registry notifications. Receivers that lag or disappear
    /// never block mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Broadcast an event to all subscribers.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Insert a new entry at the front (newest-first display order).
    pub async fn insert_front(&self, entry: FileEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(ForgeError::DuplicateEntry(entry.id.to_string()));
        }
        debug!("Registering entry {} ({})", entry.id, entry.name);
        entries.insert(0, entry);
        Ok(())
    }

    /// Remove an entry by id. Absent ids are a no-op returning `None`.
    pub async fn remove(&self, id: &EntryId) -> Option<FileEntry> {
        let mut entries = self.entries.write().await;
        let idx = entries.iter().position(|e| &e.id == id)?;
        Some(entries.remove(idx))
    }

    /// Replace the entry with a patched copy. Returns `false` without
    /// touching anything when the id is absent; callers never need their
    /// own existence checks.
    pub async fn update(&self, id: &EntryId, patch: impl FnOnce(&mut FileEntry)) -> bool {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| &e.id == id) {
            Some(slot) => {
                let mut replacement = slot.clone();
                patch(&mut replacement);
                *slot = replacement;
                true
            }
            None => {
                debug!("Update for absent entry {} dropped", id);
                false
            }
        }
    }

    /// Atomically claim an eligible entry for processing.
    ///
    /// Succeeds only for `Secure` or retryable `Failed` entries, flipping
    /// them to `Processing` under the write lock so the same entry can
    /// never carry two in-flight operations.
    pub async fn try_begin_processing(&self, id: &EntryId) -> bool {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| &e.id == id) {
            Some(entry) if entry.is_processable() => {
                entry.status = FileStatus::Processing;
                true
            }
            _ => false,
        }
    }

    /// Selection strategy for processing requests: the oldest eligible
    /// entry wins, ties broken by insertion order. Deliberately not
    /// user-targeted; swap this function to change the policy.
    pub async fn select_oldest_eligible(&self) -> Option<EntryId> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .rev()
            .find(|e| e.is_processable())
            .map(|e| e.id.clone())
    }

    /// Select and claim the oldest eligible entry in one step.
    ///
    /// Selection and the `Processing` flip happen under the same write
    /// lock, so two concurrent requests always claim distinct entries when
    /// two are eligible.
    pub async fn claim_oldest_eligible(&self) -> Option<EntryId> {
        let mut entries = self.entries.write().await;
        let entry = entries.iter_mut().rev().find(|e| e.is_processable())?;
        entry.status = FileStatus::Processing;
        Some(entry.id.clone())
    }

    pub async fn get(&self, id: &EntryId) -> Option<FileEntry> {
        let entries = self.entries.read().await;
        entries.iter().find(|e| &e.id == id).cloned()
    }

    /// Current registry contents, newest first.
    pub async fn snapshot(&self) -> Vec<FileEntry> {
        self.entries.read().await.clone()
    }

    pub async fn by_status(&self, status: FileStatus) -> Vec<FileEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentRef;

    fn entry(name: &str) -> FileEntry {
        FileEntry::new(name, ContentRef::from_bytes(vec![0u8; 8]))
    }

    #[tokio::test]
    async fn insert_front_keeps_newest_first() {
        let registry = FileRegistry::new();
        registry.insert_front(entry("first.dwg")).await.unwrap();
        registry.insert_front(entry("second.dwg")).await.unwrap();

        let names: Vec<String> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["second.dwg", "first.dwg"]);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let registry = FileRegistry::new();
        let e = entry("plan.dwg");
        let dup = e.clone();
        registry.insert_front(e).await.unwrap();
        assert!(matches!(
            registry.insert_front(dup).await,
            Err(ForgeError::DuplicateEntry(_))
        ));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn update_absent_id_is_a_noop() {
        let registry = FileRegistry::new();
        registry.insert_front(entry("plan.dwg")).await.unwrap();

        let ghost = EntryId::new();
        let updated = registry
            .update(&ghost, |e| e.status = FileStatus::Secure)
            .await;

        assert!(!updated);
        assert_eq!(registry.snapshot().await[0].status, FileStatus::Pending);
    }

    #[tokio::test]
    async fn try_begin_processing_claims_once() {
        let registry = FileRegistry::new();
        let mut e = entry("plan.dwg");
        e.status = FileStatus::Secure;
        let id = e.id.clone();
        registry.insert_front(e).await.unwrap();

        assert!(registry.try_begin_processing(&id).await);
        // Second claim sees Processing and refuses
        assert!(!registry.try_begin_processing(&id).await);

        // A failed entry is claimable again
        registry.update(&id, |e| e.status = FileStatus::Failed).await;
        assert!(registry.try_begin_processing(&id).await);
    }

    #[tokio::test]
    async fn oldest_eligible_wins_selection() {
        let registry = FileRegistry::new();

        let mut oldest = entry("oldest.dwg");
        oldest.status = FileStatus::Secure;
        let oldest_id = oldest.id.clone();

        let mut newer = entry("newer.dwg");
        newer.status = FileStatus::Secure;

        registry.insert_front(oldest).await.unwrap();
        registry.insert_front(newer).await.unwrap();
        registry.insert_front(entry("pending.dwg")).await.unwrap();

        assert_eq!(registry.select_oldest_eligible().await, Some(oldest_id));
    }

    #[tokio::test]
    async fn claims_hand_out_distinct_entries() {
        let registry = FileRegistry::new();
        let mut first = entry("first.dwg");
        first.status = FileStatus::Secure;
        let first_id = first.id.clone();
        let mut second = entry("second.dwg");
        second.status = FileStatus::Secure;
        let second_id = second.id.clone();

        registry.insert_front(first).await.unwrap();
        registry.insert_front(second).await.unwrap();

        // Oldest first, then the remaining entry, then nothing
        assert_eq!(registry.claim_oldest_eligible().await, Some(first_id.clone()));
        assert_eq!(registry.claim_oldest_eligible().await, Some(second_id));
        assert_eq!(registry.claim_oldest_eligible().await, None);

        assert_eq!(
            registry.get(&first_id).await.unwrap().status,
            FileStatus::Processing
        );
    }

    #[tokio::test]
    async fn filtered_view_by_status() {
        let registry = FileRegistry::new();
        let mut secure = entry("secure.dwg");
        secure.status = FileStatus::Secure;
        registry.insert_front(secure).await.unwrap();
        registry.insert_front(entry("pending.dwg")).await.unwrap();

        let secure_view = registry.by_status(FileStatus::Secure).await;
        assert_eq!(secure_view.len(), 1);
        assert_eq!(secure_view[0].name, "secure.dwg");
    }
}
