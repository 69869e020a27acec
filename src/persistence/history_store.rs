//! Persists the tracker's history/acknowledgement state to
//! `error_history.json` (spec.md §6.5). Write failures are logged and
//! swallowed: the in-memory tracker remains the source of truth, and the
//! next successful write re-enforces the on-disk caps (spec.md §7
//! "Persistence failures").

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::core::tracker::HistoryRecord;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryDocument {
    pub history: Vec<HistoryRecord>,
    pub acknowledged_errors: Vec<String>,
    pub last_updated: Option<DateTime<Local>>,
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        let mut p = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push(".config");
        p.push("linksentry");
        p.push("error_history.json");
        p
    }

    pub fn load(&self) -> HistoryDocument {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => HistoryDocument::default(),
        }
    }

    /// Best-effort save. Errors are returned to the caller to log, but
    /// never propagated as a hard failure per spec.md §7.
    pub fn save(&self, mut document: HistoryDocument) -> std::io::Result<()> {
        document.last_updated = Some(Local::now());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, serialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("error_history.json"));
        let doc = HistoryDocument {
            history: Vec::new(),
            acknowledged_errors: vec!["a.com".to_string()],
            last_updated: None,
        };
        store.save(doc).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.acknowledged_errors, vec!["a.com".to_string()]);
        assert!(loaded.last_updated.is_some());
    }

    #[test]
    fn missing_file_loads_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("missing.json"));
        let loaded = store.load();
        assert!(loaded.history.is_empty());
    }
}
