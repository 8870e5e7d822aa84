//! Unit tests for command handlers

use super::fetch::handle_fetch;
use super::history::{format_entries, handle_history};
use super::post::handle_post;
use super::project::handle_project;
use super::summarize::{handle_summarize_toplines, TOPLINES_DATASET};
use super::*;
use crate::cli::types::{Dataset, PostKind};
use crate::config::{Endpoints, StoreTarget};
use crate::projection::ProjectionParams;
use crate::Season;
use chrono::{Duration, TimeZone};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context(dir: &TempDir, server: Option<&MockServer>) -> CommandContext {
    let mut config = RunConfig::default();
    config.season = Season::new(2024);
    config.data_dir = dir.path().join("data");
    config.store = StoreTarget::Local {
        dir: dir.path().join("mirror"),
    };
    if let Some(server) = server {
        config.endpoints = Endpoints::all_at(&server.uri());
    }
    CommandContext::with_ledger(config, Some(RunLedger::open_in_memory().unwrap())).unwrap()
}

fn standings_body() -> serde_json::Value {
    json!({
        "records": [{
            "teamRecords": [{
                "team": {"id": 119, "name": "Los Angeles Dodgers"},
                "wins": 98, "losses": 64, "winningPercentage": ".605",
                "gamesBack": "-"
            }]
        }]
    })
}

#[test]
fn test_format_outcomes() {
    let started_at = Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).unwrap();
    let ok = RunOutcome {
        dataset: "roster".to_string(),
        started_at,
        finished_at: started_at + Duration::milliseconds(1500),
        status: RunStatus::Succeeded {
            rows: vec![("dodgers_roster_current".to_string(), 40)],
            report: SinkReport::default(),
        },
    };
    let failed = failed_outcome(
        "pitches",
        started_at,
        Stage::Extract,
        &DataError::no_data("pitches"),
    );

    let lines = format_outcomes(&[ok, failed]);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("DATASET"));
    assert!(lines[1].starts_with("roster "));
    assert!(lines[1].contains("ok"));
    assert!(lines[1].contains("40"));
    assert!(lines[1].contains("1.5"));
    assert!(lines[1].ends_with("dodgers_roster_current"));
    assert!(lines[2].contains("FAILED"));
    assert!(lines[2].ends_with("extract: pitches returned no data"));
}

#[test]
fn test_document_outcome_without_any_write_is_sink_failure() {
    let outcome = document_outcome("projection", Utc::now(), "x", 3, SinkReport::default());
    assert_eq!(outcome.failed_stage(), Some(Stage::Sink));
}

#[tokio::test]
async fn test_fetch_records_success_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/standings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(standings_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir, Some(&server));

    let outcomes = handle_fetch(
        &mut ctx,
        &[
            Dataset::LeagueStandings,
            Dataset::Transactions,
            Dataset::LeagueStandings,
        ],
    )
    .await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_success(), "{:?}", outcomes[0].status);
    assert_eq!(outcomes[0].rows_written(), 1);
    assert_eq!(outcomes[1].failed_stage(), Some(Stage::Extract));

    let entries = handle_history(&ctx, None, 10).unwrap();
    assert_eq!(entries.len(), 2);
    let failed = handle_history(&ctx, Some(Dataset::Transactions), 10).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].stage.as_deref(), Some("extract"));

    let lines = format_entries(&entries);
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_project_is_recorded_even_without_input() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir, None);

    let params = ProjectionParams {
        seed: Some(1),
        ..ProjectionParams::default()
    };
    let projection = handle_project(&mut ctx, &params).await;
    assert!(projection.timeseries.is_empty());

    let ledger = ctx.ledger.as_ref().unwrap();
    let last = ledger.last_success(super::project::DATASET).unwrap();
    assert!(last.is_some());
}

#[tokio::test]
async fn test_toplines_without_published_tables_fail_at_extract() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir, None);

    assert!(handle_summarize_toplines(&mut ctx).await.is_none());

    let ledger = ctx.ledger.as_ref().unwrap();
    assert!(ledger.last_success(TOPLINES_DATASET).unwrap().is_none());
    let entries = ledger.recent(Some(TOPLINES_DATASET), 5).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].stage.as_deref(), Some("extract"));
}

#[tokio::test]
async fn test_live_post_needs_a_webhook() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, None);
    let result = handle_post(&ctx, PostKind::Batting, true, false).await;
    assert!(matches!(result, Err(DataError::MissingEnv { .. })));
}

#[tokio::test]
async fn test_dry_run_post_reports_upstream_failure_without_error() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, None);
    // No season summary has been published.
    let result = handle_post(&ctx, PostKind::Pitching, false, false).await;
    assert!(matches!(result, Ok(None)));
}

#[test]
fn test_history_without_ledger() {
    let dir = TempDir::new().unwrap();
    let mut config = RunConfig::default();
    config.data_dir = dir.path().join("data");
    let ctx = CommandContext::with_ledger(config, None).unwrap();
    assert!(handle_history(&ctx, None, 5).unwrap().is_empty());
}
