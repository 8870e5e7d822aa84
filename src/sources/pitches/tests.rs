//! Unit tests for pitch rows and zone geometry

use super::*;
use crate::config::{Endpoints, RunConfig, StoreTarget};
use crate::core::Fetcher;
use crate::pipeline::run_source;
use crate::store::Store;
use crate::Season;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-3
}

fn schedule() -> serde_json::Value {
    json!({
        "dates": [
            {"games": [{
                "gamePk": 745001,
                "officialDate": "2024-04-01",
                "status": {"abstractGameState": "Final"},
                "teams": {
                    "home": {"team": {"id": 119, "name": "Los Angeles Dodgers"}},
                    "away": {"team": {"id": 147, "name": "San Francisco Giants"}}
                }
            }]},
            {"games": [
                {
                    "gamePk": 745002,
                    "officialDate": "2024-04-02",
                    "status": {"abstractGameState": "Final"},
                    "teams": {
                        "home": {"team": {"id": 147}},
                        "away": {"team": {"id": 119}}
                    }
                },
                {
                    "gamePk": 745003,
                    "officialDate": "2024-04-02",
                    "status": {"abstractGameState": "Final"},
                    "teams": {
                        "home": {"team": {"id": 110}},
                        "away": {"team": {"id": 111}}
                    }
                }
            ]},
            {"games": [{
                "gamePk": 745004,
                "officialDate": "2024-04-03",
                "status": {"abstractGameState": "Preview"},
                "teams": {
                    "home": {"team": {"id": 119}},
                    "away": {"team": {"id": 147}}
                }
            }]}
        ]
    })
}

fn feed() -> serde_json::Value {
    json!({
        "home_batters": {
            "660271": [
                {"play_id": "b", "inning": 1, "ab_number": 1, "pitch_number": 2,
                 "batter_name": "Shohei Ohtani", "pitcher_name": "Logan Webb",
                 "pitch_name": "Sinker", "start_speed": 92.4, "pitch_call": "called_strike",
                 "result": "Strikeout", "des": "Shohei Ohtani strikes out looking.",
                 "zone": 14, "px": 1.0, "pz": 4.0, "sz_bot": 1.5, "sz_top": 3.5},
                {"play_id": "a", "inning": 1, "ab_number": 1, "pitch_number": 1,
                 "batter_name": "Shohei Ohtani", "pitch_call": "ball"}
            ]
        },
        "away_batters": {
            "592450": [
                {"play_id": "z", "inning": 1, "ab_number": 2, "pitch_number": 1,
                 "px": 0.0, "pz": 2.5, "sz_bot": 1.5, "sz_top": 3.5}
            ]
        }
    })
}

#[test]
fn test_zone_distance_inside() {
    let d = zone_distance(Some(0.0), Some(2.5), Some(1.5), Some(3.5)).unwrap();
    assert_eq!(d.center_inches, 0.0);
    assert!(approx(d.edge_inches, -1.45));
    assert!(d.in_zone);
}

#[test]
fn test_zone_distance_ball_clipping_the_edge_is_in_zone() {
    // 0.092 ft outside the edge is within one ball radius.
    let d = zone_distance(Some(0.8), Some(2.0), Some(1.5), Some(3.5)).unwrap();
    assert!(approx(d.center_inches, 1.104));
    assert!(approx(d.edge_inches, 1.104 - 1.45));
    assert!(d.in_zone);
}

#[test]
fn test_zone_distance_corner() {
    let d = zone_distance(Some(1.0), Some(4.0), Some(1.5), Some(3.5)).unwrap();
    let expected = (0.292f64.powi(2) + 0.5f64.powi(2)).sqrt() * 12.0;
    assert!(approx(d.center_inches, expected));
    assert!(!d.in_zone);
}

#[test]
fn test_zone_distance_missing_coordinates() {
    assert!(zone_distance(None, Some(2.5), Some(1.5), Some(3.5)).is_none());
    assert!(zone_distance(Some(0.0), Some(2.5), None, Some(3.5)).is_none());
}

#[test]
fn test_final_games_records_batting_side() {
    let schedule: ScheduleResponse = serde_json::from_value(schedule()).unwrap();
    let games = final_games(&schedule, TeamId::new(119));
    assert_eq!(games.len(), 2);
    assert_eq!(games[0].side, BattingSide::Home);
    assert_eq!(games[1].side, BattingSide::Away);
    assert_eq!(games[1].game_pk, GamePk::new(745002));
}

#[test]
fn test_pitch_rows_sorted_with_geometry() {
    let feed: GameFeed = serde_json::from_value(feed()).unwrap();
    let game = FinalGame {
        game_pk: GamePk::new(745001),
        game_date: Some("2024-04-01".to_string()),
        side: BattingSide::Home,
    };

    let rows = pitch_rows(&game, &feed);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].pitch_id.as_deref(), Some("a"));
    assert!(!rows[0].pitch_in_zone);
    assert_eq!(rows[0].dist_from_sz_center_inches, None);

    let strike = &rows[1];
    assert_eq!(strike.pitch_velocity, Some(92.4));
    assert!(!strike.pitch_in_zone);
    assert!(strike.dist_from_sz_edge_inches.unwrap() > 5.0);
    assert_eq!(strike.game_date.as_deref(), Some("2024-04-01"));

    assert!(Table::from_records(&rows).is_ok());
}

#[test]
fn test_archived_games() {
    let rows = vec![
        PitchRow {
            game_pk: 1,
            ..sample_row()
        },
        PitchRow {
            game_pk: 2,
            ..sample_row()
        },
    ];
    let table = Table::from_records(&rows).unwrap();
    let archived = archived_games(&table);
    assert!(archived.contains(&GamePk::new(1)));
    assert!(archived.contains(&GamePk::new(2)));
    assert_eq!(archived.len(), 2);
}

fn sample_row() -> PitchRow {
    PitchRow {
        game_pk: 0,
        game_date: Some("2024-04-01".to_string()),
        pitch_id: None,
        inning: Some(1),
        ab_number: Some(1),
        pitch_number: Some(1),
        batter: None,
        pitcher: None,
        pitch_name: None,
        pitch_velocity: None,
        pitch_call: None,
        pitch_in_zone: false,
        at_bat_eventual_result: None,
        at_bat_eventual_desc: None,
        dist_from_sz_center_inches: None,
        dist_from_sz_edge_inches: None,
        zone: None,
        px: None,
        pz: None,
        sz_bot: None,
        sz_top: None,
    }
}

#[tokio::test]
async fn test_second_run_only_downloads_new_games() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schedule()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gf"))
        .and(query_param("game_pk", "745001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gf"))
        .and(query_param("game_pk", "745002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = RunConfig::default();
    config.season = Season::new(2024);
    config.endpoints = Endpoints::all_at(&server.uri());
    config.data_dir = dir.path().join("data");
    config.store = StoreTarget::Local {
        dir: dir.path().join("mirror"),
    };
    let fetcher = Fetcher::new().unwrap();
    let store = Store::from_config(&config, reqwest::Client::new());
    let ctx = RunContext::new(&config, &fetcher, &store);

    let first = run_source(&PitchesSource, &ctx).await;
    assert!(first.is_success(), "{:?}", first.status);
    // Two home-batter pitches from the first game, one away-batter pitch from the second.
    assert_eq!(first.rows_written(), 3);

    // Every final game is archived now, so no feed is fetched again.
    let second = run_source(&PitchesSource, &ctx).await;
    assert!(second.is_success(), "{:?}", second.status);
    assert_eq!(second.rows_written(), 3);

    let published = ctx
        .load_table("pitches/dodgers_pitches_2024.json")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.get(0, "game_date"), Some(&Value::from("2024-04-01")));
}
