//! Team pitching totals for the current season

use serde::{Deserialize, Serialize};

use crate::core::{first_table, HtmlTable};
use crate::pipeline::{Artifact, Extract, RunContext, Source, TABULAR};
use crate::sources::{float_or_zero, int_or_zero};
use crate::table::{ColumnType, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "pitching";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPitching {
    pub w: i64,
    pub l: i64,
    pub w_l_pct: f64,
    pub era: f64,
    pub g: i64,
    pub gs: i64,
    pub gf: i64,
    pub cg: i64,
    pub sho: i64,
    pub sv: i64,
    /// Innings in baseball notation: `.1` and `.2` are thirds
    pub ip: f64,
    pub h: i64,
    pub r: i64,
    pub er: i64,
    pub hr: i64,
    pub bb: i64,
    pub ibb: i64,
    pub so: i64,
    pub hbp: i64,
    pub bk: i64,
    pub wp: i64,
    pub bf: i64,
    pub era_plus: f64,
    pub fip: f64,
    pub whip: f64,
    pub h9: f64,
    pub hr9: f64,
    pub bb9: f64,
    pub so9: f64,
    pub so_w: f64,
    pub season: String,
}

impl Record for TeamPitching {
    fn schema() -> Schema {
        Schema::of(&[
            ("w", ColumnType::Int),
            ("l", ColumnType::Int),
            ("w_l_pct", ColumnType::Float),
            ("era", ColumnType::Float),
            ("g", ColumnType::Int),
            ("gs", ColumnType::Int),
            ("gf", ColumnType::Int),
            ("cg", ColumnType::Int),
            ("sho", ColumnType::Int),
            ("sv", ColumnType::Int),
            ("ip", ColumnType::Float),
            ("h", ColumnType::Int),
            ("r", ColumnType::Int),
            ("er", ColumnType::Int),
            ("hr", ColumnType::Int),
            ("bb", ColumnType::Int),
            ("ibb", ColumnType::Int),
            ("so", ColumnType::Int),
            ("hbp", ColumnType::Int),
            ("bk", ColumnType::Int),
            ("wp", ColumnType::Int),
            ("bf", ColumnType::Int),
            ("era_plus", ColumnType::Float),
            ("fip", ColumnType::Float),
            ("whip", ColumnType::Float),
            ("h9", ColumnType::Float),
            ("hr9", ColumnType::Float),
            ("bb9", ColumnType::Float),
            ("so9", ColumnType::Float),
            ("so_w", ColumnType::Float),
            ("season", ColumnType::Text),
        ])
    }
}

pub struct PitchingSource;

impl PitchingSource {
    pub fn url(ctx: &RunContext<'_>) -> String {
        format!(
            "{}/teams/{}/{}-pitching.shtml",
            ctx.config.endpoints.baseball_reference, ctx.config.team.abbr, ctx.config.season
        )
    }

    pub fn artifact() -> Artifact {
        Artifact::new("pitching", "dodgers_pitching_totals_current", TABULAR)
    }
}

impl Source for PitchingSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let html = ctx.fetcher.get_text(&Self::url(ctx)).await?;
        let totals = parse_team_totals(&html, ctx.config.season.as_u16())?;
        Ok(vec![Extract {
            artifact: Self::artifact(),
            table: Table::from_records(&[totals])?,
        }])
    }
}

/// The `Team Totals` line of the first pitching table.
pub fn parse_team_totals(html: &str, season: u16) -> Result<TeamPitching> {
    let table = first_table(html, "table", SOURCE)?;
    let name_col = table
        .column("Name")
        .or_else(|| table.column("Player"))
        .ok_or_else(|| DataError::missing_field(SOURCE, "Name"))?;

    let row = table
        .rows
        .iter()
        .find(|row| row.get(name_col).map(String::as_str) == Some("Team Totals"))
        .ok_or_else(|| DataError::no_data("pitching team totals"))?;

    Ok(totals_from_row(&table, row, season))
}

fn totals_from_row(table: &HtmlTable, row: &[String], season: u16) -> TeamPitching {
    let int = |name: &str| int_or_zero(table.cell(row, name), name);
    let float = |name: &str| float_or_zero(table.cell(row, name), name);

    TeamPitching {
        w: int("W"),
        l: int("L"),
        w_l_pct: float("W-L%"),
        era: float("ERA"),
        g: int("G"),
        gs: int("GS"),
        gf: int("GF"),
        cg: int("CG"),
        sho: int("SHO"),
        sv: int("SV"),
        ip: float("IP"),
        h: int("H"),
        r: int("R"),
        er: int("ER"),
        hr: int("HR"),
        bb: int("BB"),
        ibb: int("IBB"),
        so: int("SO"),
        hbp: int("HBP"),
        bk: int("BK"),
        wp: int("WP"),
        bf: int("BF"),
        era_plus: float("ERA+"),
        fip: float("FIP"),
        whip: float("WHIP"),
        h9: float("H9"),
        hr9: float("HR9"),
        bb9: float("BB9"),
        so9: float("SO9"),
        so_w: float("SO/W"),
        season: season.to_string(),
    }
}
