//! Season attendance for every MLB team from the league misc pages

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::first_table;
use crate::pipeline::{Artifact, Extract, RunContext, Source, JSON_DOCUMENT};
use crate::sources::parse_int;
use crate::table::{ColumnType, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "attendance";
pub const LEAGUES: &[&str] = &["AL", "NL"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAttendance {
    pub team: String,
    pub attendance: i64,
    pub attend_game: i64,
    pub league: String,
}

impl Record for TeamAttendance {
    fn schema() -> Schema {
        Schema::of(&[
            ("team", ColumnType::Text),
            ("attendance", ColumnType::Int),
            ("attend_game", ColumnType::Int),
            ("league", ColumnType::Text),
        ])
    }
}

pub struct AttendanceSource;

impl AttendanceSource {
    pub fn url(ctx: &RunContext<'_>, league: &str) -> String {
        format!(
            "{}/leagues/{}/{}-misc.shtml",
            ctx.config.endpoints.baseball_reference, league, ctx.config.season
        )
    }

    pub fn artifact() -> Artifact {
        Artifact::new("standings", "mlb_team_attendance", JSON_DOCUMENT)
    }
}

impl Source for AttendanceSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let mut teams = Vec::new();
        for league in LEAGUES {
            let html = ctx.fetcher.get_text(&Self::url(ctx, league)).await?;
            teams.extend(parse_attendance(&html, league)?);
        }
        sort_by_attendance(&mut teams);
        Ok(vec![Extract {
            artifact: Self::artifact(),
            table: Table::from_records(&teams)?,
        }])
    }
}

/// Team rows of the first table on a league misc page.
pub fn parse_attendance(html: &str, league: &str) -> Result<Vec<TeamAttendance>> {
    let table = first_table(html, "table", SOURCE)?;
    let mut teams = Vec::new();

    for row in &table.rows {
        let team = table.require(row, "Tm", SOURCE)?.trim();
        if team.is_empty() || team == "Tm" || team.contains("Average") {
            debug!(team, "skipping non-team row");
            continue;
        }
        teams.push(TeamAttendance {
            team: team.to_string(),
            attendance: parse_int(table.require(row, "Attendance", SOURCE)?, SOURCE, "Attendance")?,
            attend_game: parse_int(table.require(row, "Attend/G", SOURCE)?, SOURCE, "Attend/G")?,
            league: league.to_string(),
        });
    }

    if teams.is_empty() {
        return Err(DataError::no_data(format!("{} {}", SOURCE, league)));
    }
    Ok(teams)
}

/// Highest per-game attendance first.
pub fn sort_by_attendance(teams: &mut [TeamAttendance]) {
    teams.sort_by(|a, b| b.attend_game.cmp(&a.attend_game));
}
