//! Integration tests running whole dataset pipelines against mock upstreams

use dodgers_data::{
    config::{Endpoints, RunConfig, StoreTarget},
    core::Fetcher,
    pipeline::{RunContext, Stage},
    sources::run_dataset,
    store::Store,
    table::Value,
    Dataset, Season,
};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROSTER_PAGE: &str = r#"
<html><body>
<table class="roster__table">
  <thead><tr><td>CATCHERS</td><td>B/T</td></tr></thead>
  <tbody>
    <tr>
      <td><img src="https://img.mlbstatic.com/mlb-photos/image/upload/w_180,q_auto/v1/people/669257/headshot/67/current"></td>
      <td><a href="/player/will-smith-669257">Will Smith</a><span class="jersey">16</span></td>
      <td>R/R</td><td>5' 10"</td><td>195</td><td>3/28/1995</td>
    </tr>
  </tbody>
</table>
</body></html>"#;

fn config_for(server: &MockServer, dir: &Path) -> RunConfig {
    let mut config = RunConfig::default();
    config.season = Season::new(2024);
    config.endpoints = Endpoints::all_at(&server.uri());
    config.data_dir = dir.join("data");
    config.store = StoreTarget::Local {
        dir: dir.join("mirror"),
    };
    config
}

#[tokio::test]
async fn test_roster_is_written_locally_and_mirrored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dodgers/roster/40-man"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ROSTER_PAGE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_for(&server, dir.path());
    let fetcher = Fetcher::new().unwrap();
    let store = Store::from_config(&config, reqwest::Client::new());
    let ctx = RunContext::new(&config, &fetcher, &store);

    let outcome = run_dataset(Dataset::Roster, &ctx).await;
    assert!(outcome.is_success(), "{:?}", outcome.status);
    assert_eq!(outcome.rows_written(), 1);

    for file in ["dodgers_roster_current.csv", "dodgers_roster_current.json"] {
        assert!(dir.path().join("data/roster").join(file).exists(), "{}", file);
        assert!(
            dir.path()
                .join("mirror/dodgers/data/roster")
                .join(file)
                .exists(),
            "{}",
            file
        );
    }

    let table = ctx
        .load_table("roster/dodgers_roster_current.json")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(table.get(0, "name"), Some(&Value::from("Will Smith")));
}

#[tokio::test]
async fn test_transactions_archive_grows_without_duplicates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactions": [
                {"date": "2024-04-01T00:00:00", "description": "Recalled RHP Gavin Stone.",
                 "person": {"fullName": "Gavin Stone"}},
                {"date": "2024-04-02", "description": "Placed LHP Clayton Kershaw on the 60-day IL.",
                 "person": {"fullName": "Clayton Kershaw"}}
            ]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactions": [
                {"date": "2024-04-02", "description": "Placed LHP Clayton Kershaw on the 60-day IL.",
                 "person": {"fullName": "Clayton Kershaw"}},
                {"date": "2024-04-05", "description": "Optioned RHP Gavin Stone.",
                 "person": {"fullName": "Gavin Stone"}}
            ]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_for(&server, dir.path());
    let store = Store::from_config(&config, reqwest::Client::new());

    // Separate fetchers so the page cache does not hide the second response.
    let first_fetcher = Fetcher::new().unwrap();
    let first = run_dataset(
        Dataset::Transactions,
        &RunContext::new(&config, &first_fetcher, &store),
    )
    .await;
    assert!(first.is_success(), "{:?}", first.status);
    assert_eq!(first.rows_written(), 2);

    let second_fetcher = Fetcher::new().unwrap();
    let ctx = RunContext::new(&config, &second_fetcher, &store);
    let second = run_dataset(Dataset::Transactions, &ctx).await;
    assert!(second.is_success(), "{:?}", second.status);
    assert_eq!(second.rows_written(), 3);

    let archive = ctx
        .load_table("roster/dodgers_transactions_archive.json")
        .await
        .unwrap()
        .unwrap();
    let dates: Vec<&Value> = (0..archive.len())
        .filter_map(|row| archive.get(row, "date"))
        .collect();
    assert_eq!(
        dates,
        vec![
            &Value::from("2024-04-05"),
            &Value::from("2024-04-02"),
            &Value::from("2024-04-01")
        ]
    );
}

#[tokio::test]
async fn test_upstream_failure_is_an_extract_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_for(&server, dir.path());
    let fetcher = Fetcher::new().unwrap();
    let store = Store::from_config(&config, reqwest::Client::new());
    let ctx = RunContext::new(&config, &fetcher, &store);

    let outcome = run_dataset(Dataset::LeagueStandings, &ctx).await;
    assert_eq!(outcome.failed_stage(), Some(Stage::Extract));
    assert!(outcome.reason().unwrap().contains("503"));
    assert!(!dir.path().join("data/standings").exists());
}

#[tokio::test]
async fn test_league_ranks_keep_missing_boards_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bdfed/stats/team"))
        .and(query_param("sortStat", "walks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stats": [{"teamName": "Atlanta Braves", "rank": 1}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bdfed/stats/team"))
        .and(query_param("sortStat", "earnedRunAverage"))
        .and(query_param("order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stats": [{"teamName": "Los Angeles Dodgers", "rank": 2}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bdfed/stats/team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stats": [
                {"teamName": "Atlanta Braves", "rank": 4},
                {"teamName": "Los Angeles Dodgers", "rank": 5}
            ]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_for(&server, dir.path());
    let fetcher = Fetcher::new().unwrap();
    let store = Store::from_config(&config, reqwest::Client::new());
    let ctx = RunContext::new(&config, &fetcher, &store);

    let outcome = run_dataset(Dataset::LeagueRanks, &ctx).await;
    assert!(outcome.is_success(), "{:?}", outcome.status);
    assert_eq!(outcome.rows_written(), 11);

    let table = ctx
        .load_table("standings/dodgers_league_ranks_2024.json")
        .await
        .unwrap()
        .unwrap();
    let rank_of = |stat: &str| {
        (0..table.len())
            .find(|&row| table.get(row, "stat") == Some(&Value::from(stat)))
            .and_then(|row| table.get(row, "rank").cloned())
    };
    assert_eq!(rank_of("hitting_runs"), Some(Value::Int(5)));
    assert_eq!(rank_of("pitching_earnedRunAverage"), Some(Value::Int(2)));
    assert_eq!(rank_of("pitching_walks"), Some(Value::Null));
}

#[tokio::test]
async fn test_attendance_combines_both_leagues() {
    let server = MockServer::start().await;
    for (league, team, total, per_game) in [
        ("AL", "New York Yankees", "3,309,838", "40,862"),
        ("NL", "Los Angeles Dodgers", "3,941,251", "48,657"),
    ] {
        let page = format!(
            r#"<table><thead><tr><th>Tm</th><th>Attendance</th><th>Attend/G</th></tr></thead>
            <tbody><tr><th>{}</th><td>{}</td><td>{}</td></tr></tbody></table>"#,
            team, total, per_game
        );
        Mock::given(method("GET"))
            .and(path(format!("/leagues/{}/2024-misc.shtml", league)))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let config = config_for(&server, dir.path());
    let fetcher = Fetcher::new().unwrap();
    let store = Store::from_config(&config, reqwest::Client::new());
    let ctx = RunContext::new(&config, &fetcher, &store);

    let outcome = run_dataset(Dataset::Attendance, &ctx).await;
    assert!(outcome.is_success(), "{:?}", outcome.status);

    let table = ctx
        .load_table("standings/mlb_team_attendance.json")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(0, "team"), Some(&Value::from("Los Angeles Dodgers")));
    assert_eq!(table.get(0, "league"), Some(&Value::from("NL")));
    assert_eq!(table.get(1, "attend_game"), Some(&Value::Int(40862)));
}

#[tokio::test]
async fn test_schedule_publishes_csv_and_json() {
    let server = MockServer::start().await;
    let page = r#"<table id="team_schedule"><thead><tr>
        <th>Gm#</th><th>Date</th><th></th><th>Tm</th><th></th><th>Opp</th><th>W/L</th>
        <th>R</th><th>RA</th><th>cLI</th></tr></thead>
      <tbody>
        <tr><th>1</th><td>Wednesday, Mar 20</td><td>boxscore</td><td>LAD</td><td>@</td><td>SDP</td>
            <td>W</td><td>5</td><td>2</td><td>1.00</td></tr>
        <tr><th>2</th><td>Thursday, Mar 21</td><td>preview</td><td>LAD</td><td></td><td>SFG</td>
            <td></td><td>10:10 PM</td><td></td><td></td></tr>
      </tbody></table>"#;
    Mock::given(method("GET"))
        .and(path("/teams/LAD/2024-schedule-scores.shtml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_for(&server, dir.path());
    let fetcher = Fetcher::new().unwrap();
    let store = Store::from_config(&config, reqwest::Client::new());
    let ctx = RunContext::new(&config, &fetcher, &store);

    let outcome = run_dataset(Dataset::Schedule, &ctx).await;
    assert!(outcome.is_success(), "{:?}", outcome.status);
    assert_eq!(outcome.rows_written(), 2);
    assert!(dir
        .path()
        .join("mirror/dodgers/data/standings/dodgers_schedule.csv")
        .exists());

    let table = ctx
        .load_table("standings/dodgers_schedule.json")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(table.get(0, "placement"), Some(&Value::from("last")));
    assert_eq!(table.get(0, "game_start"), Some(&Value::from("5-2")));
    assert_eq!(table.get(1, "opp_name"), Some(&Value::from("San Francisco Giants")));
    assert_eq!(table.get(1, "game_start"), Some(&Value::from("7:10 PM")));
}
