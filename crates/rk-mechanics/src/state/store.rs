//! The in-memory state map and its flush policy.

use tracing::{debug, warn};

use super::backend::{MemoryBackend, StateBackend, StateMap};
use super::UserState;
use crate::error::StoreError;

/// The result of a [`StateStore::update`].
#[derive(Debug)]
pub struct Update<T> {
    /// Whatever the mutation returned.
    pub value: T,
    /// Whether the record changed.
    pub changed: bool,
    /// Set when the record changed but could not be flushed. The in-memory
    /// change is kept regardless.
    pub persist_warning: Option<StoreError>,
}

/// Owns every [`UserState`] and writes them through a [`StateBackend`].
pub struct StateStore {
    users: StateMap,
    backend: Box<dyn StateBackend>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("users", &self.users.len())
            .finish_non_exhaustive()
    }
}

impl StateStore {
    /// Load every record from `backend`.
    pub fn open(backend: impl StateBackend + 'static) -> Result<Self, StoreError> {
        let users = backend.load()?;
        debug!(users = users.len(), "loaded user state");
        Ok(Self {
            users,
            backend: Box::new(backend),
        })
    }

    /// An empty store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            users: StateMap::new(),
            backend: Box::new(MemoryBackend::new()),
        }
    }

    /// The record for a user, if one was ever created.
    pub fn get(&self, user_id: &str) -> Option<&UserState> {
        self.users.get(user_id)
    }

    /// Number of known users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no user has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Every record, in user id order.
    pub fn users(&self) -> &StateMap {
        &self.users
    }

    /// Write the whole map to the backend.
    pub fn save_all(&self) -> Result<(), StoreError> {
        self.backend.save(&self.users)
    }

    /// Mutate one user's record and flush the map if it changed.
    ///
    /// A missing record starts from defaults and is only inserted once the
    /// mutation changes it. A failed flush is logged and reported in the
    /// returned [`Update`]; the mutation itself is never rolled back.
    pub fn update<T>(&mut self, user_id: &str, f: impl FnOnce(&mut UserState) -> T) -> Update<T> {
        let before = self.users.get(user_id).copied().unwrap_or_default();
        let mut state = before;
        let value = f(&mut state);
        let changed = state != before;

        let persist_warning = if changed {
            self.users.insert(user_id.to_string(), state);
            self.save_all().err().inspect(|e| {
                warn!(user = user_id, error = %e, "failed to persist user state");
            })
        } else {
            None
        };

        Update {
            value,
            changed,
            persist_warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBackend;

    impl StateBackend for FailingBackend {
        fn load(&self) -> Result<StateMap, StoreError> {
            Ok(StateMap::new())
        }

        fn save(&self, _states: &StateMap) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: "/dev/full".into(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    #[test]
    fn unchanged_update_creates_no_record() {
        let backend = MemoryBackend::new();
        let mut store = StateStore::open(backend.clone()).unwrap();
        let u = store.update("amy", |s| *s);
        assert_eq!(u.value, UserState::default());
        assert!(store.get("amy").is_none());
        assert!(store.is_empty());

        // A later flush for someone else does not write amy either.
        store.update("zed", |s| s.death.failures = 1);
        assert_eq!(store.len(), 1);
        assert!(!backend.load().unwrap().contains_key("amy"));
    }

    #[test]
    fn open_loads_existing_records() {
        let backend = MemoryBackend::new();
        let mut seed = StateMap::new();
        let mut s = UserState::default();
        s.death.failures = 2;
        seed.insert("amy".to_string(), s);
        backend.save(&seed).unwrap();

        let store = StateStore::open(backend).unwrap();
        assert_eq!(store.get("amy").unwrap().death.failures, 2);
    }

    #[test]
    fn open_fails_on_corrupt_state() {
        let backend = MemoryBackend::with_contents("not json");
        assert!(StateStore::open(backend).is_err());
    }

    #[test]
    fn update_flushes_only_on_change() {
        let backend = MemoryBackend::new();
        let mut store = StateStore::open(backend.clone()).unwrap();

        let u = store.update("amy", |s| s.pity.cooldown);
        assert!(!u.changed);
        assert!(backend.contents().is_none());
        assert!(store.get("amy").is_none());

        let u = store.update("amy", |s| s.status.pending_damage += 3);
        assert!(u.changed);
        assert!(u.persist_warning.is_none());
        let saved = backend.load().unwrap();
        assert_eq!(saved["amy"].status.pending_damage, 3);
    }

    #[test]
    fn failed_flush_keeps_memory_state() {
        let mut store = StateStore::open(FailingBackend).unwrap();
        let u = store.update("amy", |s| s.status.next_advantage = true);
        assert!(u.changed);
        assert!(matches!(u.persist_warning, Some(StoreError::Io { .. })));
        assert!(store.get("amy").unwrap().status.next_advantage);
    }

    #[test]
    fn resave_without_rolls_is_byte_identical() {
        let backend = MemoryBackend::new();
        let mut store = StateStore::open(backend.clone()).unwrap();
        store.update("zed", |s| s.pity.streak_fail_count = 5);
        store.update("amy", |s| s.death.successes = 1);
        let first = backend.contents().unwrap();

        let reopened = StateStore::open(backend.clone()).unwrap();
        reopened.save_all().unwrap();
        assert_eq!(backend.contents().unwrap(), first);
    }
}
