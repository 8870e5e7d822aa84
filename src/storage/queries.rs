//! Recording and reading dataset runs

use super::{models::*, schema::RunLedger};
use crate::pipeline::RunOutcome;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const SELECT_COLUMNS: &str =
    "SELECT id, dataset, started_at, finished_at, status, stage, reason, rows FROM runs";

impl RunLedger {
    /// Append one run; returns its row id.
    pub fn record(&mut self, outcome: &RunOutcome) -> Result<i64> {
        let status = if outcome.is_success() {
            STATUS_SUCCESS
        } else {
            STATUS_FAILED
        };
        self.conn.execute(
            "INSERT INTO runs (dataset, started_at, finished_at, status, stage, reason, rows)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                outcome.dataset,
                outcome.started_at.timestamp(),
                outcome.finished_at.timestamp(),
                status,
                outcome.failed_stage().map(|s| s.as_str()),
                outcome.reason(),
                outcome.rows_written() as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent runs first, optionally for one dataset.
    pub fn recent(&self, dataset: Option<&str>, limit: usize) -> Result<Vec<LedgerEntry>> {
        let limit = limit as i64;
        let entries = match dataset {
            Some(name) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{} WHERE dataset = ? ORDER BY started_at DESC, id DESC LIMIT ?",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![name, limit], entry_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{} ORDER BY started_at DESC, id DESC LIMIT ?",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![limit], entry_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(entries)
    }

    /// The latest successful run of `dataset`.
    pub fn last_success(&self, dataset: &str) -> Result<Option<LedgerEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE dataset = ? AND status = ? ORDER BY started_at DESC, id DESC LIMIT 1",
                    SELECT_COLUMNS
                ),
                params![dataset, STATUS_SUCCESS],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn entry_from_row(row: &Row) -> rusqlite::Result<LedgerEntry> {
    let rows: i64 = row.get(7)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        dataset: row.get(1)?,
        started_at: timestamp(row, 2)?,
        finished_at: timestamp(row, 3)?,
        status: row.get(4)?,
        stage: row.get(5)?,
        reason: row.get(6)?,
        rows: rows.max(0) as u64,
    })
}
