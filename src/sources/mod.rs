//! Dataset sources
//!
//! Each module owns one upstream page or API: its URL, its record types and
//! the reshaping from raw cells to typed rows. Everything after that is the
//! shared pipeline.

pub mod attendance;
pub mod batting;
pub mod league_ranks;
pub mod league_standings;
pub mod pitches;
pub mod pitching;
pub mod roster;
pub mod schedule;
pub mod standings;
pub mod transactions;
pub mod wins_losses;

use tracing::warn;

use crate::cli::types::Dataset;
use crate::pipeline::{run_source, RunContext, RunOutcome};
use crate::{DataError, Result};

/// Run the pipeline for one dataset.
pub async fn run_dataset(dataset: Dataset, ctx: &RunContext<'_>) -> RunOutcome {
    match dataset {
        Dataset::Standings => run_source(&standings::StandingsSource, ctx).await,
        Dataset::WinsLosses => run_source(&wins_losses::WinsLossesSource, ctx).await,
        Dataset::LeagueStandings => {
            run_source(&league_standings::LeagueStandingsSource, ctx).await
        }
        Dataset::LeagueRanks => run_source(&league_ranks::LeagueRanksSource, ctx).await,
        Dataset::Attendance => run_source(&attendance::AttendanceSource, ctx).await,
        Dataset::Schedule => run_source(&schedule::ScheduleSource, ctx).await,
        Dataset::Batting => run_source(&batting::BattingSource, ctx).await,
        Dataset::Pitching => run_source(&pitching::PitchingSource, ctx).await,
        Dataset::Roster => run_source(&roster::RosterSource, ctx).await,
        Dataset::Transactions => run_source(&transactions::TransactionsSource, ctx).await,
        Dataset::Pitches => run_source(&pitches::PitchesSource, ctx).await,
    }
}

/// Parse a required integer cell (thousands separators allowed).
pub(crate) fn parse_int(text: &str, source: &str, field: &str) -> Result<i64> {
    let cleaned = text.trim().replace(',', "");
    cleaned.parse::<i64>().map_err(|_| {
        DataError::schema(format!("{}: '{}' is not an integer in {}", source, text, field))
    })
}

/// Parse a required decimal cell. Leading-dot rates like `.287` are accepted.
pub(crate) fn parse_float(text: &str, source: &str, field: &str) -> Result<f64> {
    let cleaned = text.trim().replace(',', "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| {
            DataError::schema(format!("{}: '{}' is not a number in {}", source, text, field))
        })
}

/// Integer statistic that may be absent for the period; blank becomes 0.
pub(crate) fn int_or_zero(text: Option<&str>, field: &str) -> i64 {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.replace(',', "").parse().unwrap_or_else(|_| {
            warn!(field, value = t, "unparseable integer, using 0");
            0
        }),
        None => {
            warn!(field, "missing integer, using 0");
            0
        }
    }
}

/// Decimal statistic that may be absent for the period; blank becomes 0.0.
pub(crate) fn float_or_zero(text: Option<&str>, field: &str) -> f64 {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or_else(|| {
                warn!(field, value = t, "unparseable number, using 0.0");
                0.0
            }),
        None => {
            warn!(field, "missing number, using 0.0");
            0.0
        }
    }
}

/// Round to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
