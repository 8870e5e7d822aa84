//! Season summary stats read by the dashboard and the daily posts
//!
//! Each row pairs a current value with something to compare it to: the same
//! point last season, the last decade, or the team's MLB rank. Inputs are
//! the published standings, batting and pitching tables. League standings,
//! league ranks and the win projection are optional; without them the
//! matching context reads `N/A`.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::cli::types::{home_date, HOME_TZ};
use crate::pipeline::{Artifact, RunContext, JSON_DOCUMENT};
use crate::projection::{self, ProjectionStatus, WinProjection, SEASON_LENGTH};
use crate::sink::{Format, SinkReport};
use crate::store::BlobStore;
use crate::sources::batting::TEAM_ARCHIVE_KEY;
use crate::sources::league_ranks::LeagueRanksSource;
use crate::sources::league_standings::{LeagueStandingsSource, TeamStanding};
use crate::sources::pitching::{PitchingSource, TeamPitching};
use crate::sources::{round_to, standings};
use crate::table::{ColumnType, Record, Schema, Table, Value};
use crate::{DataError, Result};

pub const ARTIFACT_NAME: &str = "season_summary_latest";
const MISSING: &str = "N/A";
const DECADE: usize = 10;

const STANDINGS: &str = "standings";
const BATTING: &str = "batting";
const PITCHING: &str = "pitching";
const SUMMARY: &str = "summary";

const LAST_SEASON: &str = "This point last season";
const LEAGUE_RANK: &str = "League rank";
const DECADE_AVERAGE: &str = "Last decade average";

/// One published summary stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topline {
    pub stat_label: String,
    pub stat: String,
    pub value: JsonValue,
    pub category: String,
    pub context_value: JsonValue,
    pub context_value_label: String,
}

impl Topline {
    fn new(
        stat_label: &str,
        stat: &str,
        category: &str,
        value: impl Into<JsonValue>,
        context_value: impl Into<JsonValue>,
        context_value_label: &str,
    ) -> Self {
        Self {
            stat_label: stat_label.to_string(),
            stat: stat.to_string(),
            value: value.into(),
            category: category.to_string(),
            context_value: context_value.into(),
            context_value_label: context_value_label.to_string(),
        }
    }
}

/// The standings archive columns used here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLine {
    pub gm: i64,
    pub game_date: String,
    pub home_away: String,
    pub result: String,
    pub r: i64,
    pub ra: i64,
    pub record: String,
    pub rank: Option<i64>,
    pub gb: Option<f64>,
    pub attendance: Option<i64>,
    pub year: String,
    pub wins: i64,
    pub losses: i64,
    pub win_pct: f64,
}

impl Record for GameLine {
    fn schema() -> Schema {
        Schema::of(&[
            ("gm", ColumnType::Int),
            ("game_date", ColumnType::Text),
            ("home_away", ColumnType::Text),
            ("result", ColumnType::Text),
            ("r", ColumnType::Int),
            ("ra", ColumnType::Int),
            ("record", ColumnType::Text),
            ("rank", ColumnType::Int),
            ("gb", ColumnType::Float),
            ("attendance", ColumnType::Int),
            ("year", ColumnType::Text),
            ("wins", ColumnType::Int),
            ("losses", ColumnType::Int),
            ("win_pct", ColumnType::Float),
        ])
    }
}

/// The team batting archive columns used here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonBatting {
    pub season: String,
    pub g: i64,
    pub hr: i64,
    pub sb: i64,
    pub ba: f64,
    pub obp: f64,
}

impl Record for SeasonBatting {
    fn schema() -> Schema {
        Schema::of(&[
            ("season", ColumnType::Text),
            ("g", ColumnType::Int),
            ("hr", ColumnType::Int),
            ("sb", ColumnType::Int),
            ("ba", ColumnType::Float),
            ("obp", ColumnType::Float),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToplineInputs {
    pub season: u16,
    pub team_name: String,
    /// Games of this season
    pub games: Vec<GameLine>,
    /// Games of the previous season
    pub last_season: Vec<GameLine>,
    /// Every season in the team batting archive
    pub batting: Vec<SeasonBatting>,
    pub pitching: Option<TeamPitching>,
    pub league: Vec<TeamStanding>,
    /// `{group}_{stat}` → MLB rank
    pub ranks: HashMap<String, i64>,
    pub projection: Option<WinProjection>,
}

pub fn artifact() -> Artifact {
    Artifact::new(standings::SUBJECT, ARTIFACT_NAME, JSON_DOCUMENT)
}

/// Load the published inputs, build the summary and publish it.
pub async fn summarize_toplines(
    ctx: &RunContext<'_>,
    now: DateTime<Utc>,
) -> Result<(Vec<Topline>, SinkReport)> {
    let inputs = load_inputs(ctx).await?;
    let toplines = build_toplines(&inputs, now)?;
    info!(
        stats = toplines.len(),
        games = inputs.games.len(),
        "season summary built"
    );
    let report = ctx.sink.publish_document(&toplines, &artifact()).await;
    Ok((toplines, report))
}

pub async fn load_inputs(ctx: &RunContext<'_>) -> Result<ToplineInputs> {
    let season = ctx.config.season.as_u16();
    let this_year = season.to_string();
    let last_year = season.saturating_sub(1).to_string();

    let archive = required_table(ctx, standings::ARCHIVE_KEY)
        .await?
        .conform(&GameLine::schema());
    let games: Vec<GameLine> = archive
        .clone()
        .filter("year", |v| v.as_str() == Some(this_year.as_str()))?
        .to_records()?;
    let last_season: Vec<GameLine> = archive
        .filter("year", |v| v.as_str() == Some(last_year.as_str()))?
        .to_records()?;

    let batting = required_table(ctx, TEAM_ARCHIVE_KEY)
        .await?
        .conform(&SeasonBatting::schema())
        .to_records()?;

    let pitching_key = PitchingSource::artifact().path(Format::Parquet);
    let pitching = required_table(ctx, &pitching_key)
        .await?
        .conform(&TeamPitching::schema())
        .to_records::<TeamPitching>()?
        .into_iter()
        .next();

    let league_key = LeagueStandingsSource::artifact(season).path(Format::JsonPretty);
    let league = match optional_table(ctx, &league_key).await {
        Some(table) => table
            .conform(&TeamStanding::schema())
            .to_records()
            .unwrap_or_else(|e| {
                warn!(key = %league_key, error = %e, "league standings unusable");
                Vec::new()
            }),
        None => Vec::new(),
    };

    let ranks = optional_table(ctx, &LeagueRanksSource::object_path(season))
        .await
        .map(|table| ranks_by_stat(&table))
        .unwrap_or_default();

    Ok(ToplineInputs {
        season,
        team_name: ctx.config.team.name.clone(),
        games,
        last_season,
        batting,
        pitching,
        league,
        ranks,
        projection: load_projection(ctx).await,
    })
}

async fn required_table(ctx: &RunContext<'_>, relative: &str) -> Result<Table> {
    ctx.load_table(relative)
        .await?
        .ok_or_else(|| DataError::no_data(format!("published {}", relative)))
}

async fn optional_table(ctx: &RunContext<'_>, relative: &str) -> Option<Table> {
    match ctx.load_table(relative).await {
        Ok(Some(table)) => Some(table),
        Ok(None) => {
            warn!(key = relative, "not published, its stats read N/A");
            None
        }
        Err(e) => {
            warn!(key = relative, error = %e, "unreadable, its stats read N/A");
            None
        }
    }
}

async fn load_projection(ctx: &RunContext<'_>) -> Option<WinProjection> {
    let key = ctx
        .config
        .prefixed_key(&projection::artifact().path(Format::JsonPretty));
    let body = match ctx.store.get(&key).await {
        Ok(Some(body)) => body,
        Ok(None) => return None,
        Err(e) => {
            warn!(key = %key, error = %e, "projection unreadable");
            return None;
        }
    };
    serde_json::from_slice(&body)
        .map_err(|e| warn!(key = %key, error = %e, "projection unparseable"))
        .ok()
}

/// `stat` → `rank` from the published league ranks; missing ranks are left out.
pub fn ranks_by_stat(table: &Table) -> HashMap<String, i64> {
    (0..table.len())
        .filter_map(|row| {
            let stat = table.get(row, "stat").and_then(Value::as_str)?;
            let rank = table.get(row, "rank").and_then(Value::as_i64)?;
            Some((stat.to_string(), rank))
        })
        .collect()
}

/// Every summary row, in display order.
pub fn build_toplines(inputs: &ToplineInputs, now: DateTime<Utc>) -> Result<Vec<Topline>> {
    let mut games: Vec<&GameLine> = inputs.games.iter().collect();
    games.sort_by_key(|g| g.gm);
    let latest = *games
        .last()
        .ok_or_else(|| DataError::no_data(format!("standings for {}", inputs.season)))?;

    let this_season = inputs.season.to_string();
    let batting_now = inputs
        .batting
        .iter()
        .find(|b| b.season == this_season)
        .ok_or_else(|| DataError::no_data(format!("team batting for {}", inputs.season)))?;
    let pitching = inputs
        .pitching
        .as_ref()
        .ok_or_else(|| DataError::no_data("team pitching totals"))?;

    let mut past: Vec<&SeasonBatting> = inputs
        .batting
        .iter()
        .filter(|b| b.season != this_season)
        .collect();
    past.sort_by_key(|b| std::cmp::Reverse(b.season.parse::<u16>().unwrap_or(0)));
    let decade = &past[..past.len().min(DECADE)];

    let gm = latest.gm;
    let same_point = inputs.last_season.iter().find(|g| g.gm == gm);
    let through_gm: Vec<&GameLine> = inputs.last_season.iter().filter(|g| g.gm <= gm).collect();
    let own = inputs.league.iter().find(|t| t.team_name == inputs.team_name);
    let rank = |key: &str| {
        inputs
            .ranks
            .get(key)
            .map(|r| ordinal(*r))
            .unwrap_or_else(|| MISSING.to_string())
    };
    let last = |f: fn(&GameLine) -> JsonValue| {
        same_point.map(f).unwrap_or_else(|| json!(MISSING))
    };

    let mut rows = Vec::new();

    // standings
    rows.push(Topline::new(
        "Wins",
        "wins",
        STANDINGS,
        latest.wins,
        last(|g| json!(g.wins)),
        LAST_SEASON,
    ));
    rows.push(Topline::new(
        "Losses",
        "losses",
        STANDINGS,
        latest.losses,
        last(|g| json!(g.losses)),
        LAST_SEASON,
    ));
    rows.push(Topline::new(
        "Record",
        "record",
        STANDINGS,
        latest.record.clone(),
        last(|g| json!(g.record)),
        LAST_SEASON,
    ));
    rows.push(Topline::new(
        "Win percentage",
        "win_pct",
        STANDINGS,
        percent(latest.win_pct),
        last(|g| json!(percent(g.win_pct))),
        LAST_SEASON,
    ));

    let up_back = games_up_back(&inputs.league, &inputs.team_name)
        .unwrap_or_else(|| latest.gb.unwrap_or(0.0).abs());
    let division_rank = own.map(|t| t.division_rank).or(latest.rank);
    rows.push(Topline::new(
        "Games up/back",
        "games_up_back",
        STANDINGS,
        number(up_back),
        division_rank.map(ordinal).unwrap_or_else(|| MISSING.to_string()),
        "Division rank",
    ));

    let home: Vec<i64> = games
        .iter()
        .filter(|g| g.home_away == "home")
        .filter_map(|g| g.attendance)
        .collect();
    let mean_attendance = if home.is_empty() {
        MISSING.to_string()
    } else {
        with_commas((home.iter().sum::<i64>() as f64 / home.len() as f64).round() as i64)
    };
    rows.push(Topline::new(
        "Avg. home attendance",
        "mean_attendance",
        STANDINGS,
        mean_attendance,
        games.iter().filter(|g| g.home_away == "home").count(),
        "Home games this season",
    ));

    let runs: i64 = games.iter().map(|g| g.r).sum();
    let runs_against: i64 = games.iter().map(|g| g.ra).sum();
    let runs_last: i64 = through_gm.iter().map(|g| g.r).sum();
    let runs_against_last: i64 = through_gm.iter().map(|g| g.ra).sum();
    rows.push(Topline::new(
        "Runs",
        "runs",
        STANDINGS,
        runs,
        rank("hitting_runs"),
        LEAGUE_RANK,
    ));
    rows.push(Topline::new(
        "Runs against",
        "runs_against",
        STANDINGS,
        runs_against,
        runs_against_last,
        LAST_SEASON,
    ));
    rows.push(Topline::new(
        "Run differential",
        "run_differential",
        STANDINGS,
        runs - runs_against,
        runs_last - runs_against_last,
        LAST_SEASON,
    ));

    let projected = in_progress_final(inputs.projection.as_ref())
        .map(|mean| json!(mean.round() as i64))
        .unwrap_or_else(|| json!(MISSING));
    rows.push(Topline::new(
        "Projected wins",
        "projected_wins",
        STANDINGS,
        projected,
        pace(latest.wins, gm),
        "Current pace",
    ));

    // batting
    rows.push(Topline::new(
        "Batting average",
        "batting_average",
        BATTING,
        rate(batting_now.ba),
        decade_rate(decade, |b| b.ba),
        DECADE_AVERAGE,
    ));
    rows.push(Topline::new(
        "Home runs",
        "home_runs",
        BATTING,
        batting_now.hr,
        rank("hitting_homeRuns"),
        LEAGUE_RANK,
    ));
    let decade_games: i64 = decade.iter().map(|b| b.g).sum();
    let decade_hr_game = if decade_games > 0 {
        json!(round_to(decade.iter().map(|b| b.hr).sum::<i64>() as f64 / decade_games as f64, 2))
    } else {
        json!(MISSING)
    };
    rows.push(Topline::new(
        "Home runs/game",
        "home_runs_game",
        BATTING,
        per_game(batting_now.hr, batting_now.g),
        decade_hr_game,
        DECADE_AVERAGE,
    ));
    rows.push(Topline::new(
        "On-base percentage",
        "on_base_pct",
        BATTING,
        rate(batting_now.obp),
        decade_rate(decade, |b| b.obp),
        DECADE_AVERAGE,
    ));
    rows.push(Topline::new(
        "Stolen bases",
        "stolen_bases",
        BATTING,
        batting_now.sb,
        rank("hitting_stolenBases"),
        LEAGUE_RANK,
    ));
    let last_rate = past
        .first()
        .filter(|b| b.g > 0)
        .map(|b| per_game(b.sb, b.g))
        .unwrap_or_else(|| json!(MISSING));
    rows.push(Topline::new(
        "Stolen bases/game",
        "stolen_bases_game",
        BATTING,
        per_game(batting_now.sb, gm),
        last_rate,
        "Rate all last season",
    ));

    // pitching
    rows.push(Topline::new(
        "Strikeouts",
        "strikeouts",
        PITCHING,
        with_commas(pitching.so),
        rank("pitching_strikeouts"),
        LEAGUE_RANK,
    ));
    rows.push(Topline::new(
        "Walks",
        "walks",
        PITCHING,
        pitching.bb,
        rank("pitching_walks"),
        LEAGUE_RANK,
    ));
    rows.push(Topline::new(
        "ERA",
        "era",
        PITCHING,
        number(pitching.era),
        rank("pitching_earnedRunAverage"),
        LEAGUE_RANK,
    ));

    // summary
    rows.push(Topline::new(
        "Last updated",
        "update_time",
        SUMMARY,
        now.with_timezone(&HOME_TZ)
            .format("%B %-d, %Y, %-I:%M %p PT")
            .to_string(),
        "",
        "",
    ));
    rows.push(Topline::new(
        "Team summary",
        "summary",
        SUMMARY,
        narrative(inputs, latest, own, now),
        "",
        "",
    ));
    if let Some(result) = last_game_result(own, latest) {
        rows.push(Topline::new(
            "Last game result",
            "last_game_result",
            SUMMARY,
            result,
            "",
            "",
        ));
    }

    Ok(rows)
}

/// Distance from first place in the team's division, always positive. A
/// division leader gets its lead over second place (0 when tied).
pub fn games_up_back(league: &[TeamStanding], team: &str) -> Option<f64> {
    let own = league.iter().find(|t| t.team_name == team)?;
    let gap = if own.division_rank == 1 {
        let mut division: Vec<&TeamStanding> = league
            .iter()
            .filter(|t| t.division_name == own.division_name)
            .collect();
        division.sort_by(|a, b| {
            a.division_rank
                .cmp(&b.division_rank)
                .then(a.games_back.total_cmp(&b.games_back))
        });
        let leaders = division.iter().filter(|t| t.games_back == 0.0).count();
        if leaders > 1 {
            0.0
        } else {
            division.get(1).map(|t| t.games_back).unwrap_or(0.0)
        }
    } else {
        own.games_back
    };
    Some(gap.abs())
}

fn narrative(
    inputs: &ToplineInputs,
    latest: &GameLine,
    own: Option<&TeamStanding>,
    now: DateTime<Utc>,
) -> String {
    let (city, nickname) = inputs
        .team_name
        .rsplit_once(' ')
        .unwrap_or(("", inputs.team_name.as_str()));
    let day = NaiveDate::parse_from_str(&latest.game_date, "%Y-%m-%d")
        .unwrap_or_else(|_| home_date(now));
    let (wins, losses, pct) = own
        .map(|t| (t.wins, t.losses, t.winning_percentage))
        .unwrap_or((latest.wins, latest.losses, latest.win_pct));

    let mut text = format!(
        "<span class='highlight'>{}</span> <span class='updated'>({})</span>: \
         The {} have a <span class='highlight'>{}-{}</span> record in the {} season, \
         a <span class='highlight'>{:.0}%</span> winning percentage.",
        city.to_uppercase(),
        day.format("%B %-d"),
        nickname,
        wins,
        losses,
        inputs.season,
        pct * 100.0
    );
    if let Some(t) = own {
        text.push_str(&format!(
            " They are {} in the {}.",
            ordinal(t.division_rank),
            t.division_name
        ));
    }
    if let Some(result) = result_word(&latest.result) {
        text.push_str(&format!(
            " The last game was a <span class='highlight'>{}-{}</span> {} <span class='highlight'>{}</span>.",
            latest.r, latest.ra, latest.home_away, result
        ));
    }
    if let Some(mean) = in_progress_final(inputs.projection.as_ref()) {
        text.push_str(&format!(
            " The projection has them finishing with about <span class='highlight'>{:.0}</span> wins.",
            mean
        ));
    }
    text
}

/// The live streak when league standings are available, else the latest game.
fn last_game_result(own: Option<&TeamStanding>, latest: &GameLine) -> Option<&'static str> {
    match own.map(|t| t.streak_type.as_str()) {
        Some("wins") => Some("win"),
        Some("losses") => Some("loss"),
        _ => result_word(&latest.result),
    }
}

fn result_word(result: &str) -> Option<&'static str> {
    match result.chars().next() {
        Some('W') => Some("win"),
        Some('L') => Some("loss"),
        _ => None,
    }
}

/// Mean final wins of a projection that is still in progress.
fn in_progress_final(projection: Option<&WinProjection>) -> Option<f64> {
    let projection = projection.filter(|p| p.status == ProjectionStatus::InProgress)?;
    projection.final_point().map(|p| p.mean_projected_wins)
}

/// `wins` over a full season at the current rate.
fn pace(wins: i64, games: i64) -> i64 {
    if games <= 0 {
        return 0;
    }
    (wins as f64 / games as f64 * SEASON_LENGTH as f64).round() as i64
}

fn per_game(count: i64, games: i64) -> JsonValue {
    if games <= 0 {
        return json!(0);
    }
    number(round_to(count as f64 / games as f64, 2))
}

fn decade_rate(decade: &[&SeasonBatting], stat: fn(&SeasonBatting) -> f64) -> String {
    if decade.is_empty() {
        return MISSING.to_string();
    }
    rate(decade.iter().map(|b| stat(b)).sum::<f64>() / decade.len() as f64)
}

/// `0.262` → `.262`
pub fn rate(value: f64) -> String {
    let text = format!("{:.3}", value);
    match text.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// `0.574` → `57%`
pub fn percent(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}

/// Whole numbers as JSON integers, anything else as a float.
fn number(value: f64) -> JsonValue {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

pub fn ordinal(n: i64) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// `3941251` → `3,941,251`
pub fn with_commas(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}
