//! Current-season wins and losses, derived from the published standings

use serde::{Deserialize, Serialize};

use crate::pipeline::{Artifact, Extract, RunContext, Source, TABULAR_PRETTY};
use crate::sources::standings;
use crate::table::{ColumnType, Record, Schema, Table, Value};
use crate::{DataError, Result};

const SOURCE: &str = "wins-losses";
pub const ARTIFACT_NAME: &str = "dodgers_wins_losses_current";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinLoss {
    pub gm: i64,
    pub game_date: String,
    /// `W` or `L`
    pub result: String,
    pub r: i64,
    pub ra: i64,
    pub run_diff: i64,
}

impl Record for WinLoss {
    fn schema() -> Schema {
        Schema::of(&[
            ("gm", ColumnType::Int),
            ("game_date", ColumnType::Text),
            ("result", ColumnType::Text),
            ("r", ColumnType::Int),
            ("ra", ColumnType::Int),
            ("run_diff", ColumnType::Int),
        ])
    }
}

pub struct WinsLossesSource;

impl WinsLossesSource {
    pub fn artifact() -> Artifact {
        Artifact::new(standings::SUBJECT, ARTIFACT_NAME, TABULAR_PRETTY)
    }
}

impl Source for WinsLossesSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let published = ctx
            .load_table(standings::ARCHIVE_KEY)
            .await?
            .ok_or_else(|| DataError::no_data("published standings"))?;

        let rows = season_results(published, ctx.config.season.as_u16())?;
        if rows.is_empty() {
            return Err(DataError::no_data(format!(
                "standings for {}",
                ctx.config.season
            )));
        }

        Ok(vec![Extract {
            artifact: Self::artifact(),
            table: Table::from_records(&rows)?,
        }])
    }
}

/// Games of `season` from the full standings table, ordered by game number.
///
/// Only the columns used here are read, so gaps elsewhere in older seasons
/// of the archive do not matter.
pub fn season_results(standings: Table, season: u16) -> Result<Vec<WinLoss>> {
    let year = season.to_string();
    let needed = Schema::of(&[
        ("gm", ColumnType::Int),
        ("game_date", ColumnType::Text),
        ("result", ColumnType::Text),
        ("r", ColumnType::Int),
        ("ra", ColumnType::Int),
        ("year", ColumnType::Text),
    ]);
    let current = standings
        .conform(&needed)
        .filter("year", |v| v.as_str() == Some(year.as_str()))?;

    let int = |row: usize, name: &str| {
        current
            .get(row, name)
            .and_then(Value::as_i64)
            .ok_or_else(|| DataError::missing_field(SOURCE, name))
    };
    let text = |row: usize, name: &str| {
        current
            .get(row, name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DataError::missing_field(SOURCE, name))
    };

    let mut rows = Vec::with_capacity(current.len());
    for i in 0..current.len() {
        let (r, ra) = (int(i, "r")?, int(i, "ra")?);
        rows.push(WinLoss {
            gm: int(i, "gm")?,
            game_date: text(i, "game_date")?,
            result: strip_walk_off(&text(i, "result")?).to_string(),
            r,
            ra,
            run_diff: r - ra,
        });
    }
    rows.sort_by_key(|r| r.gm);
    Ok(rows)
}

/// `W-wo` → `W`
pub fn strip_walk_off(result: &str) -> &str {
    result.split('-').next().unwrap_or(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::standings::GameResult;

    fn standings_row(gm: i64, year: &str, result: &str, r: i64, ra: i64) -> Vec<Value> {
        let schema = GameResult::schema();
        schema
            .fields()
            .iter()
            .map(|f| match f.name.as_str() {
                "gm" => Value::Int(gm),
                "year" => Value::from(year),
                "result" => Value::from(result),
                "r" => Value::Int(r),
                "ra" => Value::Int(ra),
                "game_date" => Value::from(format!("{}-04-{:02}", year, gm)),
                _ => match f.kind {
                    ColumnType::Int => Value::Int(0),
                    ColumnType::Float => Value::Float(0.0),
                    ColumnType::Text => Value::from(""),
                    ColumnType::Bool => Value::Bool(false),
                },
            })
            .collect()
    }

    #[test]
    fn test_season_results_filters_year_and_sorts_by_game() {
        let table = Table::from_rows(
            GameResult::schema(),
            vec![
                standings_row(2, "2024", "L", 3, 6),
                standings_row(1, "2023", "W", 8, 2),
                standings_row(1, "2024", "W-wo", 5, 4),
            ],
        )
        .unwrap();

        let rows = season_results(table, 2024).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].gm, 1);
        assert_eq!(rows[0].result, "W");
        assert_eq!(rows[0].run_diff, 1);
        assert_eq!(rows[1].run_diff, -3);
    }

    #[test]
    fn test_archive_with_integer_years_still_matches() {
        // Older archives stored the year as an integer.
        let schema = Schema::of(&[
            ("gm", ColumnType::Int),
            ("year", ColumnType::Int),
            ("result", ColumnType::Text),
            ("r", ColumnType::Int),
            ("ra", ColumnType::Int),
            ("game_date", ColumnType::Text),
        ]);
        let table = Table::from_rows(
            schema,
            vec![vec![
                Value::Int(1),
                Value::Int(2024),
                Value::from("L"),
                Value::Int(1),
                Value::Int(2),
                Value::from("2024-03-20"),
            ]],
        )
        .unwrap();

        let rows = season_results(table, 2024).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].run_diff, -1);
    }

    #[test]
    fn test_strip_walk_off() {
        assert_eq!(strip_walk_off("W-wo"), "W");
        assert_eq!(strip_walk_off("L"), "L");
    }
}
