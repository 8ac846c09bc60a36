//! Persisted session records.
//!
//! The client remembers its last confirmed placement in one JSON document so
//! a restart (or page reload, in the original surface) can put the user back
//! in the same room. A record is trusted only while fresh: after an hour,
//! or when the stored text does not parse back into a well-formed record,
//! it is treated as absent and purged.

use std::{io, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use worldchat_proto::RoomId;

/// How long a stored record remains trustworthy.
pub const RECORD_TTL: Duration = Duration::from_secs(60 * 60);

/// Errors from session record storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage failed.
    #[error("store io: {0}")]
    Io(#[from] io::Error),

    /// Stored text is not a well-formed record.
    #[error("malformed record: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// The client's durable memory of its last confirmed placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Room the client last occupied.
    pub room_id: RoomId,
    /// Member count at the last update.
    pub member_count: u32,
    /// Room capacity at the last update.
    pub capacity: u32,
    /// When the placement was confirmed, unix milliseconds.
    pub saved_at_ms: u64,
}

impl SessionRecord {
    /// Whether the record is still inside its trust window.
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.saved_at_ms) < RECORD_TTL.as_millis() as u64
    }
}

/// Single-slot storage for the session record.
///
/// Mirrors the single local-storage key of the original surface: one
/// document, read rarely, overwritten on every placement.
pub trait SessionStore {
    /// Load the stored record, if any.
    ///
    /// `Ok(None)` means no record; `Err` means the slot holds something that
    /// is not a record (callers purge it and move on).
    fn load(&self) -> Result<Option<SessionRecord>, StoreError>;

    /// Overwrite the slot with a record.
    fn save(&mut self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Empty the slot.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// File-backed store holding the record as one JSON document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store at the given path. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<Option<SessionRecord>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&text).map(Some).map_err(StoreError::Malformed)
    }

    fn save(&mut self, record: &SessionRecord) -> Result<(), StoreError> {
        let text = serde_json::to_string(record).map_err(StoreError::Malformed)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and headless use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Option<String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose slot holds arbitrary text, parsed on load.
    ///
    /// Lets tests plant tampered or legacy content.
    pub fn with_raw(text: impl Into<String>) -> Self {
        Self { slot: Some(text.into()) }
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<SessionRecord>, StoreError> {
        match &self.slot {
            None => Ok(None),
            Some(text) => serde_json::from_str(text).map(Some).map_err(StoreError::Malformed),
        }
    }

    fn save(&mut self, record: &SessionRecord) -> Result<(), StoreError> {
        let text = serde_json::to_string(record).map_err(StoreError::Malformed)?;
        self.slot = Some(text);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(saved_at_ms: u64) -> SessionRecord {
        SessionRecord {
            room_id: RoomId::from_number(3).unwrap(),
            member_count: 2,
            capacity: 50,
            saved_at_ms,
        }
    }

    #[test]
    fn record_round_trips_through_memory_store() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&record(1_000)).unwrap();
        assert_eq!(store.load().unwrap(), Some(record(1_000)));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn record_round_trips_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("session.json"));

        assert!(store.load().unwrap().is_none());

        store.save(&record(7)).unwrap();
        assert_eq!(store.load().unwrap(), Some(record(7)));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap(); // clearing an empty slot is fine
    }

    #[test]
    fn freshness_honors_the_one_hour_window() {
        let saved = 1_000_000;
        let rec = record(saved);

        assert!(rec.is_fresh(saved));
        assert!(rec.is_fresh(saved + RECORD_TTL.as_millis() as u64 - 1));
        assert!(!rec.is_fresh(saved + RECORD_TTL.as_millis() as u64));
    }

    #[test]
    fn tampered_room_id_fails_to_load() {
        let store = MemoryStore::with_raw(
            r#"{"room_id":"room_evil","member_count":1,"capacity":50,"saved_at_ms":0}"#,
        );
        assert!(matches!(store.load(), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn garbage_text_fails_to_load() {
        let store = MemoryStore::with_raw("not json at all");
        assert!(matches!(store.load(), Err(StoreError::Malformed(_))));
    }
}
