//! The 40-man roster from mlb.com

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::core::{element_text, selector};
use crate::pipeline::{Artifact, Extract, RunContext, Source, CSV_AND_JSON};
use crate::table::{ColumnType, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "roster";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub player_id: Option<String>,
    pub thumb_url: Option<String>,
    pub name: String,
    pub player_url: Option<String>,
    pub slug: String,
    pub jersey: Option<String>,
    pub position_group: String,
    pub bat_throw: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub dob: Option<String>,
    /// `ACTIVE`, `MINORS` or an injured-list code such as `IL-60`
    pub status: String,
    pub is_minors: bool,
    pub is_il: bool,
    pub is_active_roster: bool,
    pub is_40_man: bool,
}

impl Record for RosterPlayer {
    fn schema() -> Schema {
        Schema::of(&[
            ("player_id", ColumnType::Text),
            ("thumb_url", ColumnType::Text),
            ("name", ColumnType::Text),
            ("player_url", ColumnType::Text),
            ("slug", ColumnType::Text),
            ("jersey", ColumnType::Text),
            ("position_group", ColumnType::Text),
            ("bat_throw", ColumnType::Text),
            ("height", ColumnType::Text),
            ("weight", ColumnType::Text),
            ("dob", ColumnType::Text),
            ("status", ColumnType::Text),
            ("is_minors", ColumnType::Bool),
            ("is_il", ColumnType::Bool),
            ("is_active_roster", ColumnType::Bool),
            ("is_40_man", ColumnType::Bool),
        ])
    }
}

pub struct RosterSource;

impl RosterSource {
    pub fn url(ctx: &RunContext<'_>) -> String {
        format!("{}/dodgers/roster/40-man", ctx.config.endpoints.mlb_web)
    }

    pub fn artifact() -> Artifact {
        Artifact::new("roster", "dodgers_roster_current", CSV_AND_JSON)
    }
}

impl Source for RosterSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let html = ctx.fetcher.get_text(&Self::url(ctx)).await?;
        let players = parse_roster(&html)?;
        Ok(vec![Extract {
            artifact: Self::artifact(),
            table: Table::from_records(&players)?,
        }])
    }
}

/// Every player across the position-group tables of the roster page.
pub fn parse_roster(html: &str) -> Result<Vec<RosterPlayer>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.roster__table")?;
    let group_sel = selector("thead td")?;
    let row_sel = selector("tbody tr")?;

    let mut players = Vec::new();
    for table in document.select(&table_sel) {
        let Some(group) = table.select(&group_sel).next() else {
            debug!("roster table without a heading, skipping");
            continue;
        };
        let position_group = position_group(&element_text(&group));

        for row in table.select(&row_sel) {
            match parse_player(&row, &position_group)? {
                Some(player) => players.push(player),
                None => warn!(group = %position_group, "roster row without a player name"),
            }
        }
    }

    if players.is_empty() {
        return Err(DataError::no_data(SOURCE));
    }
    Ok(players)
}

fn parse_player(row: &ElementRef<'_>, position_group: &str) -> Result<Option<RosterPlayer>> {
    let td_sel = selector("td")?;
    let img_sel = selector("img")?;
    let link_sel = selector("a")?;
    let jersey_sel = selector("span.jersey")?;
    let minor_sel = selector("span.status-minor")?;
    let il_sel = selector("span.status-il")?;

    let cells: Vec<ElementRef<'_>> = row.select(&td_sel).collect();
    let Some(info) = cells.get(1) else {
        return Ok(None);
    };
    let Some(link) = info.select(&link_sel).next() else {
        return Ok(None);
    };
    let name = element_text(&link);
    if name.is_empty() {
        return Ok(None);
    }

    let thumb_url = cells
        .first()
        .and_then(|cell| cell.select(&img_sel).next())
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.replace("w_180,", ""));
    let player_id = thumb_url.as_deref().and_then(player_id_from_thumb);

    let status = info
        .select(&minor_sel)
        .next()
        .or_else(|| info.select(&il_sel).next())
        .map(|span| element_text(&span).to_uppercase())
        .unwrap_or_else(|| "ACTIVE".to_string());
    let is_minors = status == "MINORS";
    let is_il = status.starts_with("IL-");

    let text_at = |idx: usize| cells.get(idx).map(element_text).filter(|t| !t.is_empty());

    Ok(Some(RosterPlayer {
        player_id,
        thumb_url,
        slug: slugify(&name),
        player_url: link.value().attr("href").map(str::to_string),
        jersey: info
            .select(&jersey_sel)
            .next()
            .map(|span| element_text(&span)),
        name,
        position_group: position_group.to_string(),
        bat_throw: text_at(2),
        height: text_at(3),
        weight: text_at(4),
        dob: text_at(5),
        is_minors,
        is_il,
        is_active_roster: !(is_minors || is_il),
        is_40_man: true,
        status,
    }))
}

/// `PITCHERS` → `Pitchers`; two-way players are grouped as `Unicorns`.
pub fn position_group(heading: &str) -> String {
    let mut chars = heading.trim().chars();
    let capitalized: String = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => return "Unknown".to_string(),
    };
    if capitalized == "Two-way players" {
        "Unicorns".to_string()
    } else {
        capitalized
    }
}

/// Id between `/people/` and `/headshot` in an img.mlbstatic.com URL.
pub fn player_id_from_thumb(url: &str) -> Option<String> {
    let rest = url.split("/people/").nth(1)?;
    let id = rest.split('/').next()?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then(|| id.to_string())
}

/// ASCII-folded, lowercase, hyphenated: `Kiké Hernández` → `kike-hernandez`.
pub fn slugify(name: &str) -> String {
    name.nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}
