//! Daily summary, batting and pitching posts from the season summary table

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::info;

use super::{last_post_date, record_post_date, PostReport, Poster};
use crate::cli::types::PostKind;
use crate::pipeline::RunContext;
use crate::store::BlobStore;
use crate::{DataError, Result};

pub const SUMMARY_KEY: &str = "standings/season_summary_latest.json";
const SITE_LINK: &str = "More: https://DodgersData.bot";
const MISSING: &str = "N/A";

static GAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\w+\s\d+)\)").expect("game date pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("tag pattern"));

/// One row of the season summary table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryStat {
    pub stat: String,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default)]
    pub context_value: JsonValue,
}

/// Summary rows by stat name.
#[derive(Debug, Clone, Default)]
pub struct SeasonSummary {
    stats: HashMap<String, SummaryStat>,
}

impl SeasonSummary {
    pub fn new(rows: Vec<SummaryStat>) -> Self {
        Self {
            stats: rows.into_iter().map(|r| (r.stat.clone(), r)).collect(),
        }
    }

    pub fn value(&self, stat: &str) -> String {
        self.stats
            .get(stat)
            .map(|s| render(&s.value))
            .unwrap_or_else(|| MISSING.to_string())
    }

    /// The MLB rank shown next to a value.
    pub fn rank(&self, stat: &str) -> String {
        self.stats
            .get(stat)
            .map(|s| render(&s.context_value))
            .unwrap_or_else(|| MISSING.to_string())
    }

    fn ranked(&self, label: &str, stat: &str) -> String {
        format!("• {}: {} ({} in MLB)", label, self.value(stat), self.rank(stat))
    }
}

fn render(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => MISSING.to_string(),
        JsonValue::String(s) if s.trim().is_empty() => MISSING.to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The narrative summary post, or `None` when it describes a game that was
/// not played on `today`.
pub fn compose_summary(summary: &SeasonSummary, today: NaiveDate) -> Option<String> {
    let html = match summary.stats.get("summary") {
        Some(s) => render(&s.value),
        None => "No summary available.".to_string(),
    };

    if let Some(game_date) = game_date(&html, today.year()) {
        if game_date != today {
            info!(%game_date, %today, "summary describes another day");
            return None;
        }
    }

    let text = strip_tags(&html).replace("\\/", "/");
    Some(format!(
        "⚾️ Dodgers daily summary ⚾️\n\n{}\n\n{}",
        text, SITE_LINK
    ))
}

pub fn compose_batting(summary: &SeasonSummary) -> String {
    format!(
        "📊 Dodgers batting report ⚾️\n\n• BA: {}\n• OBP: {}\n{}\n{}\n\n{}",
        summary.value("batting_average"),
        summary.value("on_base_pct"),
        summary.ranked("Home Runs", "home_runs"),
        summary.ranked("Stolen Bases", "stolen_bases"),
        SITE_LINK
    )
}

pub fn compose_pitching(summary: &SeasonSummary) -> String {
    format!(
        "📊 Dodgers pitching report ⚾️\n\n{}\n{}\n{}\n\n{}",
        summary.ranked("ERA", "era"),
        summary.ranked("Strikeouts", "strikeouts"),
        summary.ranked("Walks", "walks"),
        SITE_LINK
    )
}

/// The first `(Month D)` in `text`, dated in `year`.
pub fn game_date(text: &str, year: i32) -> Option<NaiveDate> {
    let caps = GAME_DATE.captures(text)?;
    NaiveDate::parse_from_str(&format!("{} {}", &caps[1], year), "%B %d %Y").ok()
}

/// Drop `<...>` tags; a `<` with no closing `>` is kept.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

pub async fn load_summary(ctx: &RunContext<'_>) -> Result<SeasonSummary> {
    let key = ctx.config.prefixed_key(SUMMARY_KEY);
    let body = ctx
        .store
        .get(&key)
        .await?
        .ok_or_else(|| DataError::no_data(format!("season summary ({})", key)))?;
    let rows: Vec<SummaryStat> = serde_json::from_slice(&body)?;
    Ok(SeasonSummary::new(rows))
}

pub(super) async fn post_daily<P: Poster>(
    ctx: &RunContext<'_>,
    kind: PostKind,
    poster: &P,
    today: NaiveDate,
) -> Result<PostReport> {
    if last_post_date(ctx, kind).await? == Some(today) {
        return Ok(PostReport::skipped(kind, format!("already posted {} today", kind)));
    }

    let summary = load_summary(ctx).await?;
    let text = match kind {
        PostKind::Summary => match compose_summary(&summary, today) {
            Some(text) => text,
            None => return Ok(PostReport::skipped(kind, "latest game was not today")),
        },
        PostKind::Batting => compose_batting(&summary),
        PostKind::Pitching => compose_pitching(&summary),
        other => {
            return Err(DataError::schema(format!(
                "'{}' is not a daily summary post",
                other
            )))
        }
    };

    poster.post(&text).await?;
    let posted = if poster.is_live() {
        record_post_date(ctx, kind, today).await?;
        info!(kind = %kind, "posted");
        1
    } else {
        0
    };

    Ok(PostReport {
        kind,
        composed: vec![text],
        posted,
        skipped: None,
    })
}
