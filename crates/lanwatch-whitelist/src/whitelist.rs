//! Process-scoped whitelist handle.
//!
//! Holds the in-memory copy of the persisted list. Mutations take the lock,
//! flush the complete new list through the store, and only then swap the
//! in-memory copy, so an acknowledged change is always on disk and two
//! concurrent mutations can never interleave their writes. The change
//! listener runs under the same lock and sees every change in order.

use std::path::PathBuf;
use std::sync::Arc;

use lanwatch_core::HardwareId;
use parking_lot::Mutex;

use crate::store::{JsonFileStore, StoreError, WhitelistStore};
use crate::Result;

/// Receives the complete list after every successful mutation.
///
/// Called with the mutation lock held: implementations must not block or
/// call back into the [`Whitelist`].
pub trait ChangeListener: Send + Sync {
    fn whitelist_changed(&self, ids: &[HardwareId]);
}

/// Thread-safe whitelist. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct Whitelist {
    inner: Arc<Inner>,
}

struct Inner {
    store: Box<dyn WhitelistStore>,
    ids: Mutex<Vec<HardwareId>>,
    listener: Option<Arc<dyn ChangeListener>>,
}

impl Whitelist {
    /// Load the whitelist from `store`.
    ///
    /// A corrupt or unreadable store is logged and treated as empty; the next
    /// successful mutation overwrites it.
    pub fn open(store: impl WhitelistStore + 'static) -> Self {
        Self::load(Box::new(store), None)
    }

    /// Like [`Whitelist::open`], notifying `listener` of every change.
    pub fn open_with_listener(
        store: impl WhitelistStore + 'static,
        listener: Arc<dyn ChangeListener>,
    ) -> Self {
        Self::load(Box::new(store), Some(listener))
    }

    fn load(store: Box<dyn WhitelistStore>, listener: Option<Arc<dyn ChangeListener>>) -> Self {
        let ids = match store.load() {
            Ok(ids) => {
                tracing::info!(entries = ids.len(), "Whitelist loaded");
                ids
            }
            Err(e @ StoreError::Corrupt { .. }) => {
                tracing::warn!(error = %e, "Whitelist corrupt, starting empty");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Whitelist unreadable, starting empty");
                Vec::new()
            }
        };

        Self {
            inner: Arc::new(Inner {
                store,
                ids: Mutex::new(ids),
                listener,
            }),
        }
    }

    /// Open a whitelist backed by a JSON file at `path`.
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::open(JsonFileStore::new(path))
    }

    pub fn contains(&self, id: &HardwareId) -> bool {
        self.inner.ids.lock().contains(id)
    }

    /// Current whitelist in insertion order.
    pub fn snapshot(&self) -> Vec<HardwareId> {
        self.inner.ids.lock().clone()
    }

    /// Trust `id`. Returns `false` without touching the store if already trusted.
    pub fn add(&self, id: &HardwareId) -> Result<bool> {
        let mut ids = self.inner.ids.lock();
        if ids.contains(id) {
            return Ok(false);
        }

        let mut next = ids.clone();
        next.push(id.clone());
        self.inner.store.save(&next)?;
        *ids = next;

        tracing::info!(mac = %id, entries = ids.len(), "Device whitelisted");
        self.notify(&ids);
        Ok(true)
    }

    /// Revoke trust in `id`. Returns `false` without touching the store if absent.
    pub fn remove(&self, id: &HardwareId) -> Result<bool> {
        let mut ids = self.inner.ids.lock();
        if !ids.contains(id) {
            return Ok(false);
        }

        let next: Vec<HardwareId> = ids.iter().filter(|x| *x != id).cloned().collect();
        self.inner.store.save(&next)?;
        *ids = next;

        tracing::info!(mac = %id, entries = ids.len(), "Device removed from whitelist");
        self.notify(&ids);
        Ok(true)
    }

    fn notify(&self, ids: &[HardwareId]) {
        if let Some(listener) = &self.inner.listener {
            listener.whitelist_changed(ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn id(raw: &str) -> HardwareId {
        HardwareId::canonicalize(raw)
    }

    /// In-memory store that counts saves and can be told to fail them.
    #[derive(Default)]
    struct CountingStore {
        saves: Arc<AtomicUsize>,
        fail: bool,
    }

    impl WhitelistStore for CountingStore {
        fn load(&self) -> Result<Vec<HardwareId>> {
            Ok(Vec::new())
        }

        fn save(&self, _ids: &[HardwareId]) -> Result<()> {
            if self.fail {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.json");
        let whitelist = Whitelist::open_file(&path);
        let mac = id("aa:bb:cc:dd:ee:01");

        assert!(whitelist.add(&mac).unwrap());
        assert!(!whitelist.add(&mac).unwrap());

        let persisted: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted, vec!["aa:bb:cc:dd:ee:01".to_string()]);
    }

    #[test]
    fn remove_absent_does_not_rewrite() {
        let saves = Arc::new(AtomicUsize::new(0));
        let whitelist = Whitelist::open(CountingStore {
            saves: saves.clone(),
            fail: false,
        });

        assert!(!whitelist.remove(&id("aa:bb:cc:dd:ee:01")).unwrap());
        assert_eq!(saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remove_absent_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.json");
        let whitelist = Whitelist::open_file(&path);

        assert!(!whitelist.remove(&id("aa:bb:cc:dd:ee:01")).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.json");

        let whitelist = Whitelist::open_file(&path);
        whitelist.add(&id("aa:bb:cc:dd:ee:01")).unwrap();
        whitelist.add(&id("aa:bb:cc:dd:ee:02")).unwrap();
        assert!(whitelist.remove(&id("aa:bb:cc:dd:ee:01")).unwrap());

        let reopened = Whitelist::open_file(&path);
        assert_eq!(reopened.snapshot(), vec![id("aa:bb:cc:dd:ee:02")]);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.json");
        fs::write(&path, "[\"aa:bb").unwrap();

        let whitelist = Whitelist::open_file(&path);
        assert!(whitelist.snapshot().is_empty());

        // The next mutation replaces the corrupt file.
        whitelist.add(&id("aa:bb:cc:dd:ee:01")).unwrap();
        assert_eq!(
            Whitelist::open_file(&path).snapshot(),
            vec![id("aa:bb:cc:dd:ee:01")]
        );
    }

    #[test]
    fn failed_save_leaves_cache_unchanged() {
        let whitelist = Whitelist::open(CountingStore {
            fail: true,
            ..Default::default()
        });
        let mac = id("aa:bb:cc:dd:ee:01");

        assert!(whitelist.add(&mac).is_err());
        assert!(!whitelist.contains(&mac));
    }

    #[derive(Default)]
    struct RecordingListener {
        seen: Mutex<Vec<Vec<HardwareId>>>,
    }

    impl ChangeListener for RecordingListener {
        fn whitelist_changed(&self, ids: &[HardwareId]) {
            self.seen.lock().push(ids.to_vec());
        }
    }

    #[test]
    fn listener_sees_changes_only() {
        let listener = Arc::new(RecordingListener::default());
        let whitelist = Whitelist::open_with_listener(CountingStore::default(), listener.clone());
        let mac = id("aa:bb:cc:dd:ee:01");

        whitelist.add(&mac).unwrap();
        whitelist.add(&mac).unwrap();
        whitelist.remove(&id("aa:bb:cc:dd:ee:02")).unwrap();
        whitelist.remove(&mac).unwrap();

        assert_eq!(*listener.seen.lock(), vec![vec![mac], vec![]]);
    }

    #[test]
    fn listener_not_called_when_save_fails() {
        let listener = Arc::new(RecordingListener::default());
        let whitelist = Whitelist::open_with_listener(
            CountingStore {
                fail: true,
                ..Default::default()
            },
            listener.clone(),
        );

        assert!(whitelist.add(&id("aa:bb:cc:dd:ee:01")).is_err());
        assert!(listener.seen.lock().is_empty());
    }

    #[test]
    fn concurrent_changes_are_observed_in_order() {
        let listener = Arc::new(RecordingListener::default());
        let whitelist = Whitelist::open_with_listener(CountingStore::default(), listener.clone());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let whitelist = whitelist.clone();
                std::thread::spawn(move || {
                    whitelist.add(&id(&format!("aa:bb:cc:dd:ee:{i:02x}"))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Each notification extends the previous one; the last is the final list.
        let seen = listener.seen.lock();
        assert_eq!(seen.len(), 8);
        for (n, list) in seen.iter().enumerate() {
            assert_eq!(list.len(), n + 1);
            if n > 0 {
                assert!(list.starts_with(&seen[n - 1]));
            }
        }
        assert_eq!(seen.last().unwrap(), &whitelist.snapshot());
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.json");
        let whitelist = Whitelist::open_file(&path);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let whitelist = whitelist.clone();
                std::thread::spawn(move || {
                    whitelist.add(&id(&format!("aa:bb:cc:dd:ee:{i:02x}"))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(Whitelist::open_file(&path).snapshot().len(), 8);
    }
}
