// In-memory blame cache.
// One entry per file identity: absent (not started), pending, or done. Failures evict.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::error::Result;
use crate::workspace::FileIdentity;

use super::BlameFile;

/// Result of one fetch attempt. `Ok(None)` means the attempt was cancelled.
pub type Outcome = Result<Option<Arc<BlameFile>>>;

type Entries = HashMap<FileIdentity, CacheEntry>;

enum CacheEntry {
    Pending {
        id: u64,
        outcome: watch::Receiver<Option<Outcome>>,
    },
    Done(Arc<BlameFile>),
}

/// Observable state of a cache key.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    NotStarted,
    Pending,
    Done,
}

/// What a caller should do after looking up a key.
pub enum Lookup {
    /// Completed result.
    Hit(Arc<BlameFile>),
    /// Another caller is fetching; wait for its outcome.
    Wait(Waiter),
    /// The caller now owns the fetch and must complete it.
    Claimed(PendingFetch),
}

/// Process-lifetime cache of blame results keyed by file identity.
///
/// The map is only touched synchronously; the lock is never held across an await.
#[derive(Clone, Default)]
pub struct BlameCache {
    entries: Arc<Mutex<Entries>>,
    next_id: Arc<AtomicU64>,
}

impl BlameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, claiming the fetch when nothing is cached or pending.
    pub fn lookup(&self, file: &FileIdentity) -> Lookup {
        let mut entries = lock(&self.entries);
        match entries.get(file) {
            Some(CacheEntry::Done(blame)) => Lookup::Hit(Arc::clone(blame)),
            Some(CacheEntry::Pending { outcome, .. }) => Lookup::Wait(Waiter {
                outcome: outcome.clone(),
            }),
            None => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (sender, receiver) = watch::channel(None);
                entries.insert(
                    file.clone(),
                    CacheEntry::Pending {
                        id,
                        outcome: receiver,
                    },
                );
                Lookup::Claimed(PendingFetch {
                    entries: Arc::clone(&self.entries),
                    file: file.clone(),
                    id,
                    sender,
                    completed: false,
                })
            }
        }
    }

    /// Completed result for a key, if any.
    pub fn get(&self, file: &FileIdentity) -> Option<Arc<BlameFile>> {
        match lock(&self.entries).get(file) {
            Some(CacheEntry::Done(blame)) => Some(Arc::clone(blame)),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn state(&self, file: &FileIdentity) -> EntryState {
        match lock(&self.entries).get(file) {
            None => EntryState::NotStarted,
            Some(CacheEntry::Pending { .. }) => EntryState::Pending,
            Some(CacheEntry::Done(_)) => EntryState::Done,
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. In-flight fetches finish but are not stored.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to another caller's in-flight fetch.
pub struct Waiter {
    outcome: watch::Receiver<Option<Outcome>>,
}

impl Waiter {
    /// Wait for the fetch to finish. None means its owner went away without an outcome.
    pub async fn wait(mut self) -> Option<Outcome> {
        loop {
            if let Some(outcome) = self.outcome.borrow_and_update().clone() {
                return Some(outcome);
            }
            if self.outcome.changed().await.is_err() {
                return self.outcome.borrow().clone();
            }
        }
    }
}

/// Ownership of a pending entry.
///
/// Dropping it without completing removes the entry so the next caller starts over.
pub struct PendingFetch {
    entries: Arc<Mutex<Entries>>,
    file: FileIdentity,
    id: u64,
    sender: watch::Sender<Option<Outcome>>,
    completed: bool,
}

impl PendingFetch {
    /// Record the outcome and hand it to every waiter.
    pub fn complete(mut self, outcome: Outcome) -> Outcome {
        {
            let mut entries = lock(&self.entries);
            if self.owns_entry(&entries) {
                match &outcome {
                    Ok(Some(blame)) => {
                        entries.insert(self.file.clone(), CacheEntry::Done(Arc::clone(blame)));
                    }
                    Ok(None) | Err(_) => {
                        entries.remove(&self.file);
                    }
                }
            }
        }
        self.completed = true;
        self.sender.send_replace(Some(outcome.clone()));
        outcome
    }

    fn owns_entry(&self, entries: &Entries) -> bool {
        matches!(entries.get(&self.file), Some(CacheEntry::Pending { id, .. }) if *id == self.id)
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut entries = lock(&self.entries);
        if self.owns_entry(&entries) {
            entries.remove(&self.file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlameError;
    use crate::workspace::{HeadType, ProviderLocation, RevisionInfo};

    fn blame() -> Arc<BlameFile> {
        Arc::new(BlameFile {
            location: ProviderLocation {
                owner: "o".to_string(),
                repo: "r".to_string(),
                path: "a.rs".to_string(),
            },
            revision: RevisionInfo {
                kind: HeadType::Branch,
                name: "main".to_string(),
                revision: "main".to_string(),
            },
            ranges: Vec::new(),
        })
    }

    fn claim(cache: &BlameCache, file: &FileIdentity) -> PendingFetch {
        match cache.lookup(file) {
            Lookup::Claimed(pending) => pending,
            _ => panic!("expected to claim {file}"),
        }
    }

    #[test]
    fn test_claim_then_done() {
        let cache = BlameCache::new();
        let file = FileIdentity::new("a");
        assert_eq!(cache.state(&file), EntryState::NotStarted);

        let pending = claim(&cache, &file);
        assert_eq!(cache.state(&file), EntryState::Pending);
        assert!(matches!(cache.lookup(&file), Lookup::Wait(_)));

        let value = blame();
        pending.complete(Ok(Some(Arc::clone(&value)))).unwrap();
        assert_eq!(cache.state(&file), EntryState::Done);

        let first = cache.get(&file).unwrap();
        let second = cache.get(&file).unwrap();
        assert!(Arc::ptr_eq(&first, &value));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failure_evicts() {
        let cache = BlameCache::new();
        let file = FileIdentity::new("a");
        let pending = claim(&cache, &file);
        let outcome = pending.complete(Err(BlameError::RemoteRequestFailed("boom".to_string())));
        assert!(outcome.is_err());
        assert_eq!(cache.state(&file), EntryState::NotStarted);
        assert!(matches!(cache.lookup(&file), Lookup::Claimed(_)));
    }

    #[test]
    fn test_cancelled_outcome_not_cached() {
        let cache = BlameCache::new();
        let file = FileIdentity::new("a");
        claim(&cache, &file).complete(Ok(None)).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_dropped_claim_releases_key() {
        let cache = BlameCache::new();
        let file = FileIdentity::new("a");
        drop(claim(&cache, &file));
        assert_eq!(cache.state(&file), EntryState::NotStarted);
    }

    #[test]
    fn test_clear_during_fetch_does_not_resurrect() {
        let cache = BlameCache::new();
        let file = FileIdentity::new("a");
        let pending = claim(&cache, &file);
        cache.clear();
        pending.complete(Ok(Some(blame()))).unwrap();
        assert!(cache.get(&file).is_none());
    }

    #[test]
    fn test_stale_claim_leaves_newer_entry_alone() {
        let cache = BlameCache::new();
        let file = FileIdentity::new("a");
        let stale = claim(&cache, &file);
        cache.clear();
        let fresh = claim(&cache, &file);
        drop(stale);
        assert_eq!(cache.state(&file), EntryState::Pending);
        fresh.complete(Ok(Some(blame()))).unwrap();
        assert_eq!(cache.state(&file), EntryState::Done);
    }

    #[tokio::test]
    async fn test_waiter_receives_outcome() {
        let cache = BlameCache::new();
        let file = FileIdentity::new("a");
        let pending = claim(&cache, &file);
        let Lookup::Wait(waiter) = cache.lookup(&file) else {
            panic!("expected waiter");
        };

        let value = blame();
        pending.complete(Ok(Some(Arc::clone(&value)))).unwrap();
        let received = waiter.wait().await.unwrap().unwrap().unwrap();
        assert!(Arc::ptr_eq(&received, &value));
    }

    #[tokio::test]
    async fn test_waiter_sees_abandoned_fetch() {
        let cache = BlameCache::new();
        let file = FileIdentity::new("a");
        let pending = claim(&cache, &file);
        let Lookup::Wait(waiter) = cache.lookup(&file) else {
            panic!("expected waiter");
        };
        drop(pending);
        assert!(waiter.wait().await.is_none());
    }
}
