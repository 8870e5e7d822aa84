//! Called-strike accuracy from the season's pitch table

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pipeline::{Artifact, RunContext, JSON_DOCUMENT};
use crate::sink::SinkReport;
use crate::sources::pitches::{PitchRow, PitchesSource};
use crate::table::Record;
use crate::{DataError, Result};

const CALLED_STRIKE: &str = "called_strike";
const WORST_CALLS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSummary {
    pub correct_strikes_pct: f64,
    pub incorrect_strikes_pct: f64,
    pub total_called_strikes: usize,
    pub bad_calls_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCallSummary {
    /// `April 1, 2024`
    pub date: String,
    #[serde(flatten)]
    pub calls: CallSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstCall {
    pub distance_inches: f64,
    pub batter: Option<String>,
    pub pitcher: Option<String>,
    pub pitch_type: Option<String>,
    pub velocity_mph: Option<f64>,
    pub date: String,
    pub date_formatted: String,
    pub video_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmpireSummary {
    pub season_summary: CallSummary,
    pub last_game_summary: GameCallSummary,
    pub worst_calls_of_season: Vec<WorstCall>,
}

pub fn artifact() -> Artifact {
    Artifact::new("summary", "umpire_summary", JSON_DOCUMENT)
}

/// Load the season's published pitches, summarise them and publish the result.
pub async fn summarize_umpires(ctx: &RunContext<'_>) -> Result<(UmpireSummary, SinkReport)> {
    let key = PitchesSource::archive_key(ctx.config.season.as_u16());
    let table = ctx
        .load_table(&key)
        .await?
        .ok_or_else(|| DataError::no_data(format!("published pitches ({})", key)))?;

    let pitches: Vec<PitchRow> = table.conform(&PitchRow::schema()).to_records()?;
    let summary = summarize(&pitches)?;
    info!(
        called_strikes = summary.season_summary.total_called_strikes,
        bad_calls = summary.season_summary.bad_calls_count,
        "umpire summary computed"
    );

    let report = ctx.sink.publish_document(&summary, &artifact()).await;
    Ok((summary, report))
}

/// Season and latest-game accuracy plus the worst missed calls.
pub fn summarize(pitches: &[PitchRow]) -> Result<UmpireSummary> {
    let dated: Vec<(NaiveDate, &PitchRow)> = pitches
        .iter()
        .filter_map(|p| Some((parse_date(p.game_date.as_deref()?)?, p)))
        .collect();
    let latest = dated
        .iter()
        .map(|(date, _)| *date)
        .max()
        .ok_or_else(|| DataError::no_data("pitch table"))?;

    let season = call_summary(dated.iter().map(|(_, p)| *p));
    let last_game = call_summary(
        dated
            .iter()
            .filter(|(date, _)| *date == latest)
            .map(|(_, p)| *p),
    );

    let mut bad_calls: Vec<(NaiveDate, &PitchRow, f64)> = dated
        .iter()
        .filter(|(_, p)| is_bad_call(p))
        .filter_map(|(date, p)| Some((*date, *p, p.dist_from_sz_edge_inches?)))
        .collect();
    bad_calls.sort_by(|a, b| b.2.total_cmp(&a.2));

    let worst_calls_of_season = bad_calls
        .into_iter()
        .take(WORST_CALLS)
        .map(|(date, p, distance)| WorstCall {
            distance_inches: distance,
            batter: p.batter.clone(),
            pitcher: p.pitcher.clone(),
            pitch_type: p.pitch_name.clone(),
            velocity_mph: p.pitch_velocity,
            date: date.format("%Y-%m-%d").to_string(),
            date_formatted: long_date(date),
            video_link: format!(
                "https://baseballsavant.mlb.com/sporty-videos?playId={}",
                p.pitch_id.as_deref().unwrap_or_default()
            ),
        })
        .collect();

    Ok(UmpireSummary {
        season_summary: season,
        last_game_summary: GameCallSummary {
            date: long_date(latest),
            calls: last_game,
        },
        worst_calls_of_season,
    })
}

fn is_called_strike(pitch: &PitchRow) -> bool {
    pitch.pitch_call.as_deref() == Some(CALLED_STRIKE)
}

/// A called strike on a pitch outside the zone.
fn is_bad_call(pitch: &PitchRow) -> bool {
    is_called_strike(pitch) && !pitch.pitch_in_zone
}

fn call_summary<'a>(pitches: impl Iterator<Item = &'a PitchRow>) -> CallSummary {
    let (mut total, mut bad) = (0usize, 0usize);
    for pitch in pitches.filter(|p| is_called_strike(p)) {
        total += 1;
        if !pitch.pitch_in_zone {
            bad += 1;
        }
    }

    let (correct_pct, incorrect_pct) = if total > 0 {
        let correct = (total - bad) as f64 / total as f64 * 100.0;
        (correct, 100.0 - correct)
    } else {
        (0.0, 0.0)
    };

    CallSummary {
        correct_strikes_pct: correct_pct,
        incorrect_strikes_pct: incorrect_pct,
        total_called_strikes: total,
        bad_calls_count: bad,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}
