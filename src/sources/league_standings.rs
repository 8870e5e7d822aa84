//! Standings metrics for every MLB team from the stats API

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pipeline::{Artifact, Extract, RunContext, Source, JSON_DOCUMENT};
use crate::sources::{float_or_zero, int_or_zero};
use crate::table::{ColumnType, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "league-standings";

/// Raw response of `/api/v1/standings`
#[derive(Debug, Clone, Deserialize)]
pub struct StandingsResponse {
    #[serde(default)]
    pub records: Vec<DivisionRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DivisionRecord {
    #[serde(rename = "teamRecords", default)]
    pub team_records: Vec<TeamRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedRef {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRef {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(default)]
    pub division: NamedRef,
    #[serde(default)]
    pub league: NamedRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Streak {
    #[serde(rename = "streakType")]
    pub streak_type: Option<String>,
    #[serde(rename = "streakNumber")]
    pub streak_number: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRecord {
    pub team: TeamRef,
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    #[serde(rename = "winningPercentage")]
    pub winning_percentage: Option<String>,
    #[serde(rename = "divisionRank")]
    pub division_rank: Option<String>,
    #[serde(rename = "leagueRank")]
    pub league_rank: Option<String>,
    #[serde(rename = "sportRank")]
    pub sport_rank: Option<String>,
    #[serde(rename = "gamesBack")]
    pub games_back: Option<String>,
    #[serde(rename = "divisionGamesBack")]
    pub division_games_back: Option<String>,
    #[serde(rename = "leagueGamesBack")]
    pub league_games_back: Option<String>,
    #[serde(default)]
    pub streak: Streak,
    #[serde(rename = "magicNumber")]
    pub magic_number: Option<String>,
    #[serde(rename = "eliminationNumber")]
    pub elimination_number: Option<String>,
    #[serde(rename = "gamesPlayed")]
    pub games_played: Option<i64>,
    #[serde(rename = "runsScored")]
    pub runs_scored: Option<i64>,
    #[serde(rename = "runsAllowed")]
    pub runs_allowed: Option<i64>,
    #[serde(rename = "runDifferential")]
    pub run_differential: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team_id: i64,
    pub team_name: String,
    pub wins: i64,
    pub losses: i64,
    pub winning_percentage: f64,
    pub division_rank: i64,
    pub league_rank: i64,
    pub sport_rank: i64,
    pub games_back: f64,
    pub division_games_back: f64,
    pub league_games_back: f64,
    pub streak_type: String,
    pub streak_number: i64,
    pub magic_number: String,
    pub elimination_number: String,
    pub division_name: String,
    pub league_name: String,
    pub games_played: i64,
    pub runs_scored: i64,
    pub runs_against: i64,
    pub run_differential: i64,
}

impl Record for TeamStanding {
    fn schema() -> Schema {
        Schema::of(&[
            ("team_id", ColumnType::Int),
            ("team_name", ColumnType::Text),
            ("wins", ColumnType::Int),
            ("losses", ColumnType::Int),
            ("winning_percentage", ColumnType::Float),
            ("division_rank", ColumnType::Int),
            ("league_rank", ColumnType::Int),
            ("sport_rank", ColumnType::Int),
            ("games_back", ColumnType::Float),
            ("division_games_back", ColumnType::Float),
            ("league_games_back", ColumnType::Float),
            ("streak_type", ColumnType::Text),
            ("streak_number", ColumnType::Int),
            ("magic_number", ColumnType::Text),
            ("elimination_number", ColumnType::Text),
            ("division_name", ColumnType::Text),
            ("league_name", ColumnType::Text),
            ("games_played", ColumnType::Int),
            ("runs_scored", ColumnType::Int),
            ("runs_against", ColumnType::Int),
            ("run_differential", ColumnType::Int),
        ])
    }
}

pub struct LeagueStandingsSource;

impl LeagueStandingsSource {
    pub fn url(ctx: &RunContext<'_>) -> String {
        format!(
            "{}/api/v1/standings?leagueId=103,104&season={}&standingsTypes=regularSeason&hydrate=team(division,league)",
            ctx.config.endpoints.statsapi, ctx.config.season
        )
    }

    pub fn artifact(season: u16) -> Artifact {
        Artifact::new(
            "standings",
            format!("all_teams_standings_metrics_{}", season),
            JSON_DOCUMENT,
        )
    }
}

impl Source for LeagueStandingsSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let response: StandingsResponse = ctx.fetcher.get_json(&Self::url(ctx)).await?;
        let teams = flatten_standings(response)?;
        Ok(vec![Extract {
            artifact: Self::artifact(ctx.config.season.as_u16()),
            table: Table::from_records(&teams)?,
        }])
    }
}

/// Games back as a number; the API reports the leader as `-`.
pub fn games_back(value: Option<&str>) -> f64 {
    match value.map(str::trim) {
        None | Some("-") | Some("") => 0.0,
        Some(v) => v.trim_start_matches('+').parse().unwrap_or_else(|_| {
            warn!(value = v, "unparseable games back, using 0");
            0.0
        }),
    }
}

fn text_or_na(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "N/A".to_string())
}

/// One row per team across every division in the response.
pub fn flatten_standings(response: StandingsResponse) -> Result<Vec<TeamStanding>> {
    let teams: Vec<TeamStanding> = response
        .records
        .into_iter()
        .flat_map(|division| division.team_records)
        .map(|record| TeamStanding {
            team_id: record.team.id.unwrap_or_default(),
            team_name: text_or_na(record.team.name),
            wins: record.wins.unwrap_or_default(),
            losses: record.losses.unwrap_or_default(),
            winning_percentage: float_or_zero(
                record.winning_percentage.as_deref(),
                "winningPercentage",
            ),
            division_rank: int_or_zero(record.division_rank.as_deref(), "divisionRank"),
            league_rank: int_or_zero(record.league_rank.as_deref(), "leagueRank"),
            sport_rank: int_or_zero(record.sport_rank.as_deref(), "sportRank"),
            games_back: games_back(record.games_back.as_deref()),
            division_games_back: games_back(record.division_games_back.as_deref()),
            league_games_back: games_back(record.league_games_back.as_deref()),
            streak_type: text_or_na(record.streak.streak_type),
            streak_number: record.streak.streak_number.unwrap_or_default(),
            magic_number: text_or_na(record.magic_number),
            elimination_number: text_or_na(record.elimination_number),
            division_name: text_or_na(record.team.division.name),
            league_name: text_or_na(record.team.league.name),
            games_played: record.games_played.unwrap_or_default(),
            runs_scored: record.runs_scored.unwrap_or_default(),
            runs_against: record.runs_allowed.unwrap_or_default(),
            run_differential: record.run_differential.unwrap_or_default(),
        })
        .collect();

    if teams.is_empty() {
        return Err(DataError::no_data("MLB standings API"));
    }
    Ok(teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> StandingsResponse {
        serde_json::from_value(json!({
            "records": [{
                "teamRecords": [
                    {
                        "team": {
                            "id": 119,
                            "name": "Los Angeles Dodgers",
                            "division": {"id": 203, "name": "National League West"},
                            "league": {"id": 104, "name": "National League"}
                        },
                        "wins": 98, "losses": 64,
                        "winningPercentage": ".605",
                        "divisionRank": "1", "leagueRank": "1", "sportRank": "1",
                        "gamesBack": "-", "divisionGamesBack": "-", "leagueGamesBack": "-",
                        "streak": {"streakType": "wins", "streakNumber": 3},
                        "magicNumber": "E",
                        "gamesPlayed": 162, "runsScored": 842, "runsAllowed": 686,
                        "runDifferential": 156
                    },
                    {
                        "team": {"id": 135, "name": "San Diego Padres"},
                        "wins": 93, "losses": 69,
                        "winningPercentage": ".574",
                        "divisionRank": "2",
                        "gamesBack": "5.0", "divisionGamesBack": "5.0",
                        "leagueGamesBack": "+1.5"
                    }
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_flatten_standings() {
        let teams = flatten_standings(response()).unwrap();
        assert_eq!(teams.len(), 2);

        let dodgers = &teams[0];
        assert_eq!(dodgers.team_id, 119);
        assert_eq!(dodgers.winning_percentage, 0.605);
        assert_eq!(dodgers.games_back, 0.0);
        assert_eq!(dodgers.streak_type, "wins");
        assert_eq!(dodgers.division_name, "National League West");
        assert_eq!(dodgers.runs_against, 686);
        assert_eq!(dodgers.elimination_number, "N/A");
    }

    #[test]
    fn test_missing_fields_become_sentinels() {
        let teams = flatten_standings(response()).unwrap();
        let padres = &teams[1];
        assert_eq!(padres.games_back, 5.0);
        assert_eq!(padres.league_games_back, 1.5);
        assert_eq!(padres.league_rank, 0);
        assert_eq!(padres.division_name, "N/A");
        assert_eq!(padres.streak_number, 0);
    }

    #[test]
    fn test_empty_records_is_no_data() {
        let empty = StandingsResponse { records: vec![] };
        assert!(matches!(
            flatten_standings(empty),
            Err(DataError::NoData { .. })
        ));
    }

    #[test]
    fn test_records_fit_declared_schema() {
        let teams = flatten_standings(response()).unwrap();
        assert_eq!(Table::from_records(&teams).unwrap().len(), 2);
    }
}
