//! Durable locations for the user state map.
//!
//! A backend reads the whole map at startup and rewrites the whole map on
//! every flush. The JSON encoding sorts user ids, so loading and re-saving
//! an unchanged map produces identical bytes.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use super::UserState;
use crate::error::StoreError;

/// User id to state, in id order.
pub type StateMap = BTreeMap<String, UserState>;

/// A durable home for the state map.
pub trait StateBackend: Send {
    /// Read every record. A location that was never written is empty.
    fn load(&self) -> Result<StateMap, StoreError>;

    /// Replace every record. Must be all-or-nothing.
    fn save(&self, states: &StateMap) -> Result<(), StoreError>;
}

/// Encode a state map as pretty JSON with a trailing newline.
pub fn encode(states: &StateMap) -> Result<String, StoreError> {
    let mut text = serde_json::to_string_pretty(states).map_err(StoreError::Serialize)?;
    text.push('\n');
    Ok(text)
}

/// Decode a state map. Blank text is an empty map.
pub fn decode(text: &str) -> Result<StateMap, StoreError> {
    if text.trim().is_empty() {
        return Ok(StateMap::new());
    }
    serde_json::from_str(text).map_err(StoreError::Deserialize)
}

/// Stores the map as a JSON file, replaced atomically on each save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Use the file at `path`. It is created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateBackend for JsonFileBackend {
    fn load(&self) -> Result<StateMap, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => decode(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StateMap::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, states: &StateMap) -> Result<(), StoreError> {
        let text = encode(states)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        // Write beside the target so the rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

/// Keeps the encoded map in memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that already holds `text`.
    pub fn with_contents(text: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(text.into()))),
        }
    }

    /// The last saved text, if any save happened.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self) -> Result<StateMap, StoreError> {
        match self.contents.lock().as_deref() {
            Some(text) => decode(text),
            None => Ok(StateMap::new()),
        }
    }

    fn save(&self, states: &StateMap) -> Result<(), StoreError> {
        let text = encode(states)?;
        *self.contents.lock() = Some(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> StateMap {
        let mut map = StateMap::new();
        let mut a = UserState::default();
        a.pity.streak_fail_count = 2;
        a.status.next_advantage = true;
        map.insert("zed".to_string(), a);
        map.insert("amy".to_string(), UserState::default());
        map
    }

    #[test]
    fn encode_sorts_ids_and_ends_with_newline() {
        let text = encode(&sample()).unwrap();
        assert!(text.ends_with("}\n"));
        let amy = text.find("\"amy\"").unwrap();
        let zed = text.find("\"zed\"").unwrap();
        assert!(amy < zed);
    }

    #[test]
    fn decode_blank_is_empty() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n").unwrap().is_empty());
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(matches!(decode("{ nope"), Err(StoreError::Deserialize(_))));
    }

    #[test]
    fn file_missing_loads_empty() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("state.json"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn file_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let backend = JsonFileBackend::new(&path);
        backend.save(&sample()).unwrap();
        assert!(path.exists());
        assert_eq!(backend.load().unwrap(), sample());
    }

    #[test]
    fn file_resave_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let backend = JsonFileBackend::new(&path);
        backend.save(&sample()).unwrap();
        let first = std::fs::read(&path).unwrap();

        let loaded = backend.load().unwrap();
        backend.save(&loaded).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn file_save_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nope").join("state.json"));
        assert!(matches!(
            backend.save(&sample()),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn memory_backend_shares_contents() {
        let backend = MemoryBackend::new();
        assert!(backend.contents().is_none());
        let clone = backend.clone();
        clone.save(&sample()).unwrap();
        assert_eq!(backend.load().unwrap(), sample());
        assert!(backend.contents().unwrap().contains("streakFailCount"));
    }
}
