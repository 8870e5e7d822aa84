//! Bootstrap projection of the season's final win total.
//!
//! Played games are copied into the timeseries as-is. Each unplayed game is
//! simulated by resampling past outcomes with replacement; the projection at
//! a game number is the distribution of cumulative wins across simulations.

use std::fmt;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::pipeline::{Artifact, RunContext, JSON_DOCUMENT};
use crate::sink::{decode, Format, SinkReport};
use crate::sources::{standings, wins_losses};
use crate::table::{Table, Value};
use crate::{DataError, Result};

pub const SEASON_LENGTH: usize = 162;
pub const MIN_GAMES: usize = 10;
pub const DEFAULT_SIMULATIONS: usize = 10_000;
/// Fewer samples than this leave the percentile bounds too noisy.
pub const MIN_SIMULATIONS: usize = 10_000;
const LOWER_PERCENTILE: f64 = 2.5;
const UPPER_PERCENTILE: f64 = 97.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionParams {
    pub season_length: usize,
    pub min_games: usize,
    pub simulations: usize,
    /// Fixed seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            season_length: SEASON_LENGTH,
            min_games: MIN_GAMES,
            simulations: DEFAULT_SIMULATIONS,
            seed: None,
        }
    }
}

/// Which branch the projection took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionStatus {
    #[serde(rename = "insufficient data")]
    InsufficientData,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "season complete")]
    SeasonComplete,
    /// The input could not be loaded.
    #[serde(rename = "unavailable")]
    Unavailable,
}

impl fmt::Display for ProjectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProjectionStatus::InsufficientData => "insufficient data",
            ProjectionStatus::InProgress => "in progress",
            ProjectionStatus::SeasonComplete => "season complete",
            ProjectionStatus::Unavailable => "unavailable",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub game_number: usize,
    pub mean_projected_wins: f64,
    pub lower_ci_wins: f64,
    pub upper_ci_wins: f64,
}

impl ProjectionPoint {
    fn exact(game_number: usize, wins: usize) -> Self {
        let wins = wins as f64;
        Self {
            game_number,
            mean_projected_wins: wins,
            lower_ci_wins: wins,
            upper_ci_wins: wins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinProjection {
    pub games_played: usize,
    pub current_wins: usize,
    pub current_losses: usize,
    pub timeseries: Vec<ProjectionPoint>,
    pub status: ProjectionStatus,
    pub message: String,
}

impl WinProjection {
    /// Empty projection explaining why no input was available.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            games_played: 0,
            current_wins: 0,
            current_losses: 0,
            timeseries: Vec::new(),
            status: ProjectionStatus::Unavailable,
            message: message.into(),
        }
    }

    /// The point at the final game of the season, if projected.
    pub fn final_point(&self) -> Option<&ProjectionPoint> {
        self.timeseries.last()
    }
}

/// Project the final win total from the outcomes played so far (`true` = win).
pub fn project_wins(outcomes: &[bool], params: &ProjectionParams) -> WinProjection {
    let games_played = outcomes.len();
    let mut timeseries = Vec::with_capacity(params.season_length.max(games_played));
    let mut wins = 0usize;
    for (idx, won) in outcomes.iter().enumerate() {
        wins += usize::from(*won);
        timeseries.push(ProjectionPoint::exact(idx + 1, wins));
    }

    let mut projection = WinProjection {
        games_played,
        current_wins: wins,
        current_losses: games_played - wins,
        timeseries,
        status: ProjectionStatus::InProgress,
        message: String::new(),
    };

    if games_played < params.min_games {
        projection.status = ProjectionStatus::InsufficientData;
        projection.message = format!(
            "Not enough games played for a meaningful projection (minimum {} games required).",
            params.min_games
        );
        return projection;
    }
    if games_played >= params.season_length {
        projection.status = ProjectionStatus::SeasonComplete;
        projection.message = format!(
            "Season complete. All {} games have been played.",
            params.season_length
        );
        return projection;
    }

    let remaining = params.season_length - games_played;
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let simulations = params.simulations.max(MIN_SIMULATIONS);
    let totals = simulate(outcomes, wins, remaining, simulations, &mut rng);

    for (offset, mut at_game) in totals.into_iter().enumerate() {
        at_game.sort_unstable();
        projection
            .timeseries
            .push(summarize_point(games_played + 1 + offset, &at_game));
    }

    projection.message = format!(
        "Projection based on bootstrapping {} past game outcomes for {} remaining games.",
        games_played, remaining
    );
    projection
}

/// Cumulative win totals: `result[g][s]` is the total after future game `g`
/// in simulation `s`.
fn simulate(
    outcomes: &[bool],
    current_wins: usize,
    remaining: usize,
    simulations: usize,
    rng: &mut StdRng,
) -> Vec<Vec<u32>> {
    let mut totals = vec![Vec::with_capacity(simulations); remaining];
    for _ in 0..simulations {
        let mut wins = current_wins as u32;
        for at_game in totals.iter_mut() {
            if outcomes[rng.gen_range(0..outcomes.len())] {
                wins += 1;
            }
            at_game.push(wins);
        }
    }
    totals
}

/// Mean and 95% interval of one game's sorted simulated totals.
fn summarize_point(game_number: usize, sorted: &[u32]) -> ProjectionPoint {
    let mean = sorted.iter().map(|&w| f64::from(w)).sum::<f64>() / sorted.len() as f64;
    let mean = (mean * 10.0).round() / 10.0;

    let mut lower = percentile(sorted, LOWER_PERCENTILE).round_ties_even();
    let mut upper = percentile(sorted, UPPER_PERCENTILE).round_ties_even();
    // Rounding may move a bound past the rounded mean.
    if lower > mean {
        lower = mean.floor();
    }
    if upper < mean {
        upper = mean.ceil();
    }

    ProjectionPoint {
        game_number,
        mean_projected_wins: mean,
        lower_ci_wins: lower,
        upper_ci_wins: upper,
    }
}

/// Linear interpolation between closest ranks; `sorted` must be ascending and
/// non-empty.
pub fn percentile(sorted: &[u32], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let (a, b) = (f64::from(sorted[lo]), f64::from(sorted[hi]));
    a + (b - a) * (rank - lo as f64)
}

/// Win/loss sequence from the published wins/losses table, ordered by `gm`.
///
/// A `win` column (0/1 or boolean) is used when present, else `result`.
pub fn outcomes_from_table(mut table: Table) -> Result<Vec<bool>> {
    if table.is_empty() {
        return Err(DataError::no_data("wins/losses"));
    }
    if table.schema().index_of("gm").is_none() {
        return Err(DataError::missing_field("wins/losses", "gm"));
    }
    table.sort_by("gm", false)?;

    let win_column = if table.schema().index_of("win").is_some() {
        "win"
    } else if table.schema().index_of("result").is_some() {
        "result"
    } else {
        return Err(DataError::missing_field("wins/losses", "result"));
    };

    (0..table.len())
        .map(|row| match table.get(row, win_column) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Int(i)) => Ok(*i == 1),
            Some(Value::Text(t)) => Ok(t.starts_with('W')),
            other => Err(DataError::schema(format!(
                "wins/losses row {}: unusable {} value {:?}",
                row, win_column, other
            ))),
        })
        .collect()
}

pub fn artifact() -> Artifact {
    Artifact::new(
        standings::SUBJECT,
        "dodgers_wins_projection_timeseries",
        JSON_DOCUMENT,
    )
}

/// Read the wins/losses JSON from the local data directory, falling back to
/// the object store.
pub async fn load_outcomes(ctx: &RunContext<'_>) -> Result<Vec<bool>> {
    let file_name = format!("{}.json", wins_losses::ARTIFACT_NAME);
    let local = ctx.config.local_path(standings::SUBJECT, &file_name);

    let table = match std::fs::read(&local) {
        Ok(bytes) => {
            info!(path = %local.display(), "loading wins/losses from local file");
            decode(Bytes::from(bytes), Format::JsonPretty)?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let relative = format!("{}/{}", standings::SUBJECT, file_name);
            info!(key = %relative, "local wins/losses missing, reading the published copy");
            ctx.load_table(&relative).await?.ok_or_else(|| {
                DataError::no_data(format!(
                    "wins/losses (checked {} and {})",
                    local.display(),
                    relative
                ))
            })?
        }
        Err(e) => return Err(e.into()),
    };
    outcomes_from_table(table)
}

/// Load, project and publish. A projection is always published; when the
/// input cannot be loaded its message says why.
pub async fn run_projection(
    ctx: &RunContext<'_>,
    params: &ProjectionParams,
) -> (WinProjection, SinkReport) {
    let projection = match load_outcomes(ctx).await {
        Ok(outcomes) => project_wins(&outcomes, params),
        Err(e) => {
            error!(error = %e, "projection input unavailable");
            WinProjection::unavailable(format!("Projection input unavailable: {}", e))
        }
    };

    match projection.final_point() {
        Some(last) if projection.status == ProjectionStatus::InProgress => info!(
            record = %format!("{}-{}", projection.current_wins, projection.current_losses),
            mean = last.mean_projected_wins,
            lower = last.lower_ci_wins,
            upper = last.upper_ci_wins,
            "projected final wins"
        ),
        _ => warn!(status = %projection.status, message = %projection.message, "no projection"),
    }

    let report = ctx.sink.publish_document(&projection, &artifact()).await;
    (projection, report)
}
