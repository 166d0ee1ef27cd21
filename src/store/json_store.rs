use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

use crate::session::result::SessionResult;
use crate::store::schema::{HistoryData, ProgressSnapshot, SCHEMA_VERSION};

const HISTORY_FILE: &str = "history.json";
const PROGRESS_FILE: &str = "progress.json";

/// Local persistence. Both documents live under one data dir and use
/// last-writer-wins overwrite semantics (single-user assumption).
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vocadr");
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.file_path(name);
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(_) => T::default(),
            }
        } else {
            T::default()
        }
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// A history written by a different schema is treated as empty rather
    /// than half-parsed.
    pub fn load_history(&self) -> HistoryData {
        let history: HistoryData = self.load(HISTORY_FILE);
        if history.schema_version != SCHEMA_VERSION {
            return HistoryData::default();
        }
        history
    }

    /// Load the full list, push, persist the full list back.
    pub fn append_result(&self, result: SessionResult) -> Result<HistoryData> {
        let mut history = self.load_history();
        history.results.push(result);
        self.save(HISTORY_FILE, &history)?;
        Ok(history)
    }

    /// Returns None when no snapshot exists, or when one exists but can't
    /// be trusted (parse failure or schema mismatch).
    pub fn load_progress(&self) -> Option<ProgressSnapshot> {
        let path = self.file_path(PROGRESS_FILE);
        if !path.exists() {
            return None;
        }
        let content = fs::read_to_string(&path).ok()?;
        let snapshot: ProgressSnapshot = serde_json::from_str(&content).ok()?;
        (snapshot.schema_version == SCHEMA_VERSION).then_some(snapshot)
    }

    pub fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        self.save(PROGRESS_FILE, snapshot)
    }

    /// Removing an absent snapshot is fine; interruption and completion
    /// both call this unconditionally.
    pub fn clear_progress(&self) -> Result<()> {
        let path = self.file_path(PROGRESS_FILE);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
