//! Recent results and upcoming games for the schedule widget

use std::sync::LazyLock;

use chrono::{NaiveTime, TimeDelta};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{first_table, HtmlTable};
use crate::pipeline::{Artifact, Extract, RunContext, Source, CSV_AND_JSON};
use crate::sources::standings::{home_away, parse_schedule_date, StandingsSource};
use crate::table::{ColumnType, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "schedule";
/// Games kept on each side of today.
pub const WINDOW: usize = 10;
const NO_VALUE: &str = "--";

static START_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d{1,2}:\d{2}\s?(AM|PM)$").expect("start time pattern"));

const TEAM_NAMES: &[(&str, &str)] = &[
    ("ARI", "Arizona Diamondbacks"),
    ("ATH", "Athletics"),
    ("ATL", "Atlanta Braves"),
    ("BAL", "Baltimore Orioles"),
    ("BOS", "Boston Red Sox"),
    ("CHC", "Chicago Cubs"),
    ("CHW", "Chicago White Sox"),
    ("CIN", "Cincinnati Reds"),
    ("CLE", "Cleveland Guardians"),
    ("COL", "Colorado Rockies"),
    ("DET", "Detroit Tigers"),
    ("HOU", "Houston Astros"),
    ("KCR", "Kansas City Royals"),
    ("LAA", "Los Angeles Angels"),
    ("LAD", "Los Angeles Dodgers"),
    ("MIA", "Miami Marlins"),
    ("MIL", "Milwaukee Brewers"),
    ("MIN", "Minnesota Twins"),
    ("NYM", "New York Mets"),
    ("NYY", "New York Yankees"),
    ("OAK", "Oakland Athletics"),
    ("PHI", "Philadelphia Phillies"),
    ("PIT", "Pittsburgh Pirates"),
    ("SDP", "San Diego Padres"),
    ("SEA", "Seattle Mariners"),
    ("SFG", "San Francisco Giants"),
    ("STL", "St. Louis Cardinals"),
    ("TBR", "Tampa Bay Rays"),
    ("TEX", "Texas Rangers"),
    ("TOR", "Toronto Blue Jays"),
    ("WSN", "Washington Nationals"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGame {
    /// `Apr 2`
    pub date: String,
    pub opp_name: String,
    pub home_away: String,
    /// `win`, `loss` or `--`
    pub result: String,
    /// `last` for played games, `next` for upcoming ones
    pub placement: String,
    /// Final score for played games, Pacific first pitch otherwise
    pub game_start: String,
}

impl Record for ScheduledGame {
    fn schema() -> Schema {
        Schema::of(&[
            ("date", ColumnType::Text),
            ("opp_name", ColumnType::Text),
            ("home_away", ColumnType::Text),
            ("result", ColumnType::Text),
            ("placement", ColumnType::Text),
            ("game_start", ColumnType::Text),
        ])
    }
}

pub struct ScheduleSource;

impl ScheduleSource {
    pub fn artifact() -> Artifact {
        Artifact::new("standings", "dodgers_schedule", CSV_AND_JSON)
    }
}

impl Source for ScheduleSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let html = ctx.fetcher.get_text(&StandingsSource::url(ctx)).await?;
        let games = parse_window(&html, ctx.config.season.as_u16(), WINDOW)?;
        Ok(vec![Extract {
            artifact: Self::artifact(),
            table: Table::from_records(&games)?,
        }])
    }
}

/// The last `window` played games followed by the next `window` unplayed ones.
pub fn parse_window(html: &str, season: u16, window: usize) -> Result<Vec<ScheduledGame>> {
    let table = first_table(html, "table#team_schedule", SOURCE)?;
    let mut played = Vec::new();
    let mut upcoming = Vec::new();

    for row in &table.rows {
        let gm = table.require(row, "Gm#", SOURCE)?;
        if gm == "Gm#" || gm.is_empty() {
            continue;
        }
        let (completed, game) = parse_row(&table, row, season)?;
        if completed {
            played.push(game);
        } else {
            upcoming.push(game);
        }
    }

    if played.is_empty() && upcoming.is_empty() {
        return Err(DataError::no_data(SOURCE));
    }
    debug!(played = played.len(), upcoming = upcoming.len(), "schedule rows");

    let skip = played.len().saturating_sub(window);
    let mut games: Vec<ScheduledGame> = played
        .into_iter()
        .skip(skip)
        .map(|g| ScheduledGame {
            placement: "last".to_string(),
            ..g
        })
        .collect();
    games.extend(upcoming.into_iter().take(window).map(|g| ScheduledGame {
        placement: "next".to_string(),
        ..g
    }));
    Ok(games)
}

fn parse_row(table: &HtmlTable, row: &[String], season: u16) -> Result<(bool, ScheduledGame)> {
    let cell = |name: &str| table.cell(row, name).unwrap_or("").trim();

    let date = parse_schedule_date(table.require(row, "Date", SOURCE)?, season)?;
    let opp = cell("Opp");
    let result = match cell("W/L").chars().next() {
        Some('W') => "win",
        Some('L') => "loss",
        _ => NO_VALUE,
    };
    let completed = result != NO_VALUE || !cell("cLI").is_empty();

    let game_start = if result != NO_VALUE {
        format!("{}-{}", cell("R"), cell("RA"))
    } else {
        match cell("R") {
            "" => NO_VALUE.to_string(),
            text if START_TIME.is_match(text) => eastern_to_pacific(text),
            text => text.to_string(),
        }
    };

    Ok((
        completed,
        ScheduledGame {
            date: date.format("%b %-d").to_string(),
            opp_name: team_name(opp).unwrap_or(opp).to_string(),
            home_away: home_away(table, row)?.to_string(),
            result: result.to_string(),
            placement: String::new(),
            game_start,
        },
    ))
}

/// Full team name for a baseball-reference abbreviation.
pub fn team_name(abbr: &str) -> Option<&'static str> {
    TEAM_NAMES
        .iter()
        .find(|(code, _)| *code == abbr)
        .map(|(_, name)| *name)
}

/// `7:10 PM` Eastern → `4:10 PM`. Text that does not parse is returned as-is.
pub fn eastern_to_pacific(text: &str) -> String {
    match NaiveTime::parse_from_str(&text.to_ascii_uppercase(), "%I:%M %p") {
        Ok(time) => (time - TimeDelta::hours(3)).format("%-I:%M %p").to_string(),
        Err(_) => text.to_string(),
    }
}
