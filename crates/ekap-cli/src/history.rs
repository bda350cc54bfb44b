//! Recently opened bid files.
//!
//! Persistence sits behind [`HistoryStore`] so the command code never touches a global. The
//! binary uses [`JsonFileHistory`]; tests use [`MemoryHistory`].

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::fs::atomic_write_bytes;

/// Most entries kept, newest first.
pub const MAX_HISTORY: usize = 10;

const HISTORY_FILE: &str = "history.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    /// Unix seconds.
    pub last_opened: u64,
}

impl HistoryEntry {
    pub fn for_path(path: &Path, size: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path: path.to_string_lossy().into_owned(),
            size,
            last_opened: unix_now(),
        }
    }
}

pub trait HistoryStore {
    fn load(&self) -> io::Result<Vec<HistoryEntry>>;
    fn save(&mut self, entries: &[HistoryEntry]) -> io::Result<()>;
}

/// Put `entry` first, drop older entries with the same path and cap the list at
/// [`MAX_HISTORY`]. Returns the stored list.
pub fn record(store: &mut dyn HistoryStore, entry: HistoryEntry) -> io::Result<Vec<HistoryEntry>> {
    let mut entries = store.load()?;
    entries.retain(|e| e.path != entry.path);
    entries.insert(0, entry);
    entries.truncate(MAX_HISTORY);
    store.save(&entries)?;
    Ok(entries)
}

/// History kept as a JSON array on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `history.json` in the platform's local data directory, if one can be determined.
    pub fn default_location() -> Option<Self> {
        let dirs = directories::ProjectDirs::from("com", "ekap", "ekap")?;
        Some(Self::new(dirs.data_local_dir().join(HISTORY_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonFileHistory {
    fn load(&self) -> io::Result<Vec<HistoryEntry>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        match serde_json::from_slice(&bytes) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                log::warn!(
                    "ignoring unreadable history file {}: {err}",
                    self.path.display()
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&mut self, entries: &[HistoryEntry]) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        atomic_write_bytes(&self.path, &json)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore for MemoryHistory {
    fn load(&self) -> io::Result<Vec<HistoryEntry>> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &[HistoryEntry]) -> io::Result<()> {
        self.entries = entries.to_vec();
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
