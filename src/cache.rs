use color_eyre::Result;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::history::HistoryEntry;

pub const HISTORY_FILE: &str = "query_history.jsonl";

/// Registry of known cache files
const CACHE_FILES: &[&str] = &[HISTORY_FILE];

/// Manages cache directory and cache file operations
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    /// Create a new CacheManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    /// Create a CacheManager with a custom cache directory (primarily for testing)
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get path to a specific cache file
    pub fn cache_file(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Clear all registered cache files
    pub fn clear_all(&self) -> Result<()> {
        for filename in CACHE_FILES {
            let file_path = self.cache_file(filename);
            if file_path.exists() {
                if let Err(e) = fs::remove_file(&file_path) {
                    warn!(file = filename, error = %e, "could not remove cache file");
                }
            }
        }

        Ok(())
    }

    /// Load stored query history, one JSON object per line.
    ///
    /// Lines that fail to parse are skipped.
    pub fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        let history_file = self.cache_file(HISTORY_FILE);

        if !history_file.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&history_file)?);
        let mut history = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) => history.push(entry),
                Err(e) => warn!(error = %e, "skipping unreadable history line"),
            }
        }

        Ok(history)
    }

    /// Replace the stored history with `entries`, written oldest first.
    pub fn save_history<'a>(
        &self,
        entries: impl DoubleEndedIterator<Item = &'a HistoryEntry>,
    ) -> Result<()> {
        self.ensure_cache_dir()?;
        let mut file = fs::File::create(self.cache_file(HISTORY_FILE))?;

        for entry in entries.rev() {
            writeln!(file, "{}", serde_json::to_string(entry)?)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryLedger;
    use std::time::Duration;

    #[test]
    fn test_history_round_trip_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::with_dir(dir.path().join("tabq"));
        assert!(cache.load_history().unwrap().is_empty());

        let mut ledger = HistoryLedger::new(5);
        ledger.record("SELECT 1", Duration::from_millis(2), 1, None);
        ledger.record("SELEC", Duration::from_millis(1), 0, Some("bad".to_string()));
        cache.save_history(ledger.entries()).unwrap();

        let stored = cache.load_history().unwrap();
        assert_eq!(stored.len(), 2);
        // oldest first on disk
        assert_eq!(stored[0].sql, "SELECT 1");
        assert_eq!(stored[1].error.as_deref(), Some("bad"));

        cache.clear_all().unwrap();
        assert!(!cache.cache_file(HISTORY_FILE).exists());
    }

    #[test]
    fn test_unreadable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::with_dir(dir.path().to_path_buf());
        std::fs::write(
            cache.cache_file(HISTORY_FILE),
            "not json\n{\"id\":3,\"sql\":\"SELECT 3\",\"timestamp\":\"2024-01-01T00:00:00Z\",\"duration_ms\":4,\"row_count\":1}\n",
        )
        .unwrap();
        let stored = cache.load_history().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, 3);
        assert!(stored[0].error.is_none());
    }
}
