//! Ledger connection and schema management

use anyhow::{Context, Result};
use dirs::cache_dir;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// SQLite-backed history of dataset runs
pub struct RunLedger {
    pub(crate) conn: Connection,
}

impl RunLedger {
    /// Open (creating if needed) the ledger at `path`, or at the default
    /// location when `None`.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let db_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)
            .with_context(|| format!("opening run ledger at {}", db_path.display()))?;
        let mut ledger = Self { conn };
        ledger.initialize_schema()?;
        Ok(ledger)
    }

    /// A throwaway ledger for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let mut ledger = Self {
            conn: Connection::open_in_memory()?,
        };
        ledger.initialize_schema()?;
        Ok(ledger)
    }

    /// `{cache dir}/dodgers-data/runs.db`
    pub fn default_path() -> Result<PathBuf> {
        let base = cache_dir().context("could not determine a cache directory")?;
        Ok(base.join("dodgers-data").join("runs.db"))
    }

    pub(crate) fn initialize_schema(&mut self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dataset TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                finished_at INTEGER NOT NULL,
                status TEXT NOT NULL,
                stage TEXT,
                reason TEXT,
                rows INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_dataset_started
             ON runs(dataset, started_at)",
            [],
        )?;

        Ok(())
    }
}
