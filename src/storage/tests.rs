//! Unit tests for the run ledger

use super::*;
use crate::pipeline::{RunOutcome, RunStatus, Stage};
use crate::sink::SinkReport;
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

fn outcome(dataset: &str, minute: i64, ok: bool) -> RunOutcome {
    let started_at = Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).unwrap() + Duration::minutes(minute);
    let status = if ok {
        RunStatus::Succeeded {
            rows: vec![("a".to_string(), 3), ("b".to_string(), 4)],
            report: SinkReport::default(),
        }
    } else {
        RunStatus::Failed {
            stage: Stage::Extract,
            reason: "HTTP request failed: 503".to_string(),
        }
    };
    RunOutcome {
        dataset: dataset.to_string(),
        started_at,
        finished_at: started_at + Duration::seconds(5),
        status,
    }
}

#[test]
fn test_record_and_read_back() {
    let mut ledger = RunLedger::open_in_memory().unwrap();
    let id = ledger.record(&outcome("roster", 0, true)).unwrap();
    assert!(id > 0);

    let entries = ledger.recent(None, 10).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.dataset, "roster");
    assert!(entry.is_success());
    assert_eq!(entry.rows, 7);
    assert_eq!(entry.stage, None);
    assert_eq!(entry.finished_at - entry.started_at, Duration::seconds(5));
}

#[test]
fn test_failed_run_keeps_stage_and_reason() {
    let mut ledger = RunLedger::open_in_memory().unwrap();
    ledger.record(&outcome("pitches", 0, false)).unwrap();

    let entry = &ledger.recent(Some("pitches"), 1).unwrap()[0];
    assert_eq!(entry.status, STATUS_FAILED);
    assert_eq!(entry.stage.as_deref(), Some("extract"));
    assert_eq!(entry.reason.as_deref(), Some("HTTP request failed: 503"));
    assert_eq!(entry.rows, 0);
}

#[test]
fn test_recent_is_newest_first_and_filtered() {
    let mut ledger = RunLedger::open_in_memory().unwrap();
    ledger.record(&outcome("roster", 0, true)).unwrap();
    ledger.record(&outcome("batting", 1, true)).unwrap();
    ledger.record(&outcome("roster", 2, false)).unwrap();

    let all = ledger.recent(None, 10).unwrap();
    let order: Vec<&str> = all.iter().map(|e| e.dataset.as_str()).collect();
    assert_eq!(order, vec!["roster", "batting", "roster"]);

    let roster = ledger.recent(Some("roster"), 10).unwrap();
    assert_eq!(roster.len(), 2);
    assert!(!roster[0].is_success());

    assert_eq!(ledger.recent(None, 1).unwrap().len(), 1);
}

#[test]
fn test_last_success_skips_failures() {
    let mut ledger = RunLedger::open_in_memory().unwrap();
    assert!(ledger.last_success("roster").unwrap().is_none());

    ledger.record(&outcome("roster", 0, true)).unwrap();
    ledger.record(&outcome("roster", 5, false)).unwrap();

    let last = ledger.last_success("roster").unwrap().unwrap();
    assert_eq!(
        last.started_at,
        Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).unwrap()
    );
}

#[test]
fn test_open_creates_parent_dirs_and_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/ledger/runs.db");
    {
        let mut ledger = RunLedger::open(Some(&path)).unwrap();
        ledger.record(&outcome("standings", 0, true)).unwrap();
    }
    let ledger = RunLedger::open(Some(&path)).unwrap();
    assert_eq!(ledger.recent(Some("standings"), 5).unwrap().len(), 1);
}
