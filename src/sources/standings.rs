//! Game-by-game results from the baseball-reference schedule page

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{first_table, HtmlTable};
use crate::merge::{ArchivePolicy, MergeSpec};
use crate::pipeline::{Artifact, Extract, RunContext, Source, TABULAR};
use crate::sources::{parse_int, round_to};
use crate::table::{ColumnType, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "standings";
pub const SUBJECT: &str = "standings";
pub const ARTIFACT_NAME: &str = "dodgers_standings_1958_present";
pub const ARCHIVE_KEY: &str = "standings/dodgers_standings_1958_present.parquet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub gm: i64,
    /// `YYYY-MM-DD`
    pub game_date: String,
    /// `home` or `away`
    pub home_away: String,
    pub opp: String,
    /// `W`, `L`, or with a walk-off suffix (`W-wo`)
    pub result: String,
    pub r: i64,
    pub ra: i64,
    pub record: String,
    pub rank: i64,
    /// Positive when ahead of the division leader's pace
    pub gb: f64,
    /// `H:MM:SS`
    pub time: String,
    pub time_minutes: i64,
    pub day_night: String,
    pub attendance: i64,
    pub year: String,
    pub wins: i64,
    pub losses: i64,
    pub win_pct: f64,
    pub game_day: String,
}

impl Record for GameResult {
    fn schema() -> Schema {
        Schema::of(&[
            ("gm", ColumnType::Int),
            ("game_date", ColumnType::Text),
            ("home_away", ColumnType::Text),
            ("opp", ColumnType::Text),
            ("result", ColumnType::Text),
            ("r", ColumnType::Int),
            ("ra", ColumnType::Int),
            ("record", ColumnType::Text),
            ("rank", ColumnType::Int),
            ("gb", ColumnType::Float),
            ("time", ColumnType::Text),
            ("time_minutes", ColumnType::Int),
            ("day_night", ColumnType::Text),
            ("attendance", ColumnType::Int),
            ("year", ColumnType::Text),
            ("wins", ColumnType::Int),
            ("losses", ColumnType::Int),
            ("win_pct", ColumnType::Float),
            ("game_day", ColumnType::Text),
        ])
    }
}

pub struct StandingsSource;

impl StandingsSource {
    pub fn url(ctx: &RunContext<'_>) -> String {
        format!(
            "{}/teams/{}/{}-schedule-scores.shtml",
            ctx.config.endpoints.baseball_reference, ctx.config.team.abbr, ctx.config.season
        )
    }

    pub fn artifact() -> Artifact {
        Artifact::new(SUBJECT, ARTIFACT_NAME, TABULAR).with_merge(MergeSpec {
            archive_key: ARCHIVE_KEY.to_string(),
            natural_key: &["gm", "year"],
            sort_by: &["game_date"],
            descending: true,
            policy: ArchivePolicy::Required,
        })
    }
}

impl Source for StandingsSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let html = ctx.fetcher.get_text(&Self::url(ctx)).await?;
        let games = parse_schedule(&html, ctx.config.season.as_u16())?;
        Ok(vec![Extract {
            artifact: Self::artifact(),
            table: Table::from_records(&games)?,
        }])
    }
}

/// Parse the `#team_schedule` table into completed games.
pub fn parse_schedule(html: &str, season: u16) -> Result<Vec<GameResult>> {
    let table = first_table(html, "table#team_schedule", SOURCE)?;
    let mut games = Vec::new();

    for row in &table.rows {
        let gm = table.require(row, "Gm#", SOURCE)?;
        // Header rows repeat every few weeks inside the body.
        if gm == "Gm#" || gm.is_empty() {
            continue;
        }
        let result = table.require(row, "W/L", SOURCE)?;
        if result.is_empty() {
            debug!(gm, "skipping unplayed game");
            continue;
        }
        games.push(parse_game(&table, row, season)?);
    }

    if games.is_empty() {
        return Err(DataError::no_data(SOURCE));
    }
    Ok(games)
}

fn parse_game(table: &HtmlTable, row: &[String], season: u16) -> Result<GameResult> {
    let field = |name: &str| table.require(row, name, SOURCE);

    let gm = parse_int(field("Gm#")?, SOURCE, "Gm#")?;
    let (game_date, game_day) = parse_game_date(field("Date")?, season)?;

    let venue = home_away(table, row)?;

    let record = field("W-L")?.to_string();
    let (wins, losses) = parse_record(&record)?;
    let (time, time_minutes) = parse_duration(field("Time")?)?;

    let attendance = match field("Attendance")?.trim() {
        "" => {
            warn!(gm, "attendance missing, using 0");
            0
        }
        text => parse_int(text, SOURCE, "Attendance")?,
    };

    Ok(GameResult {
        gm,
        game_date,
        home_away: venue.to_string(),
        opp: field("Opp")?.to_string(),
        result: field("W/L")?.to_string(),
        r: parse_int(field("R")?, SOURCE, "R")?,
        ra: parse_int(field("RA")?, SOURCE, "RA")?,
        record,
        rank: parse_int(field("Rank")?, SOURCE, "Rank")?,
        gb: parse_games_back(field("GB")?)?,
        time,
        time_minutes,
        day_night: field("D/N")?.to_string(),
        attendance,
        year: season.to_string(),
        wins,
        losses,
        win_pct: if gm > 0 {
            round_to(wins as f64 / gm as f64, 2)
        } else {
            0.0
        },
        game_day,
    })
}

/// `Thursday, Mar 28` or `Saturday, Apr 27 (2)` → (`2024-04-27`, `Saturday`).
pub fn parse_game_date(text: &str, season: u16) -> Result<(String, String)> {
    let date = parse_schedule_date(text, season)?;
    Ok((
        date.format("%Y-%m-%d").to_string(),
        date.format("%A").to_string(),
    ))
}

/// The calendar date of a schedule `Date` cell; doubleheader markers are dropped.
pub fn parse_schedule_date(text: &str, season: u16) -> Result<NaiveDate> {
    let day_month = text.split_once(", ").map(|(_, rest)| rest).unwrap_or(text);
    let day_month = match day_month.find(" (") {
        Some(idx) => &day_month[..idx],
        None => day_month,
    };

    NaiveDate::parse_from_str(&format!("{} {}", day_month.trim(), season), "%b %d %Y")
        .map_err(|e| DataError::schema(format!("{}: bad date '{}': {}", SOURCE, text, e)))
}

/// The `home`/`away` marker in the unlabelled column before the opponent.
pub fn home_away(table: &HtmlTable, row: &[String]) -> Result<&'static str> {
    table
        .column("Opp")
        .and_then(|idx| idx.checked_sub(1))
        .and_then(|idx| row.get(idx))
        .map(|marker| if marker == "@" { "away" } else { "home" })
        .ok_or_else(|| DataError::missing_field(SOURCE, "Opp"))
}

/// `Tied` → 0, `up 2.5` → +2.5, `3.0` → −3.0.
pub fn parse_games_back(text: &str) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("tied") {
        return Ok(0.0);
    }
    let (ahead, number) = match text.strip_prefix("up") {
        Some(rest) => (true, rest.trim()),
        None => (false, text),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| DataError::schema(format!("{}: bad games back '{}'", SOURCE, text)))?;
    Ok(if ahead || value == 0.0 { value } else { -value })
}

/// `3:05` → (`3:05:00`, 185).
pub fn parse_duration(text: &str) -> Result<(String, i64)> {
    let bad = || DataError::schema(format!("{}: bad game time '{}'", SOURCE, text));
    let (hours, minutes) = text.trim().split_once(':').ok_or_else(bad)?;
    let hours: i64 = hours.parse().map_err(|_| bad())?;
    let minutes: i64 = minutes.parse().map_err(|_| bad())?;
    Ok((format!("{}:{:02}:00", hours, minutes), hours * 60 + minutes))
}

/// `45-30` → (45, 30).
pub fn parse_record(text: &str) -> Result<(i64, i64)> {
    let (w, l) = text
        .split_once('-')
        .ok_or_else(|| DataError::schema(format!("{}: bad record '{}'", SOURCE, text)))?;
    Ok((parse_int(w, SOURCE, "W-L")?, parse_int(l, SOURCE, "W-L")?))
}
