//! Posts for roster transactions nobody has posted yet

use std::collections::HashSet;

use bytes::Bytes;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{PostReport, Poster, MARKER_SUBJECT};
use crate::cli::types::{PostKind, HOME_TZ};
use crate::pipeline::RunContext;
use crate::sink::to_pretty_json;
use crate::sources::transactions::{TransactionRecord, ARCHIVE_KEY};
use crate::store::BlobStore;
use crate::table::Table;
use crate::Result;

pub const POSTED_FILE: &str = "posted_transactions.json";
pub const MAX_REMEMBERED: usize = 1000;
pub const LOOKBACK_DAYS: i64 = 7;
pub const MAX_POST_CHARS: usize = 280;
const ID_TEXT_CHARS: usize = 50;
/// First and last home-time hours in which posting is allowed.
const WINDOW_HOURS: (u32, u32) = (7, 22);

/// Ids of transactions already posted, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedTransactions {
    pub transaction_ids: Vec<String>,
}

impl PostedTransactions {
    pub fn contains(&self, id: &str) -> bool {
        self.transaction_ids.iter().any(|t| t == id)
    }

    /// Record `id`, forgetting the oldest beyond the last [`MAX_REMEMBERED`].
    pub fn remember(&mut self, id: String) {
        if !self.contains(&id) {
            self.transaction_ids.push(id);
        }
        let excess = self.transaction_ids.len().saturating_sub(MAX_REMEMBERED);
        self.transaction_ids.drain(..excess);
    }
}

/// `{date}_{first 50 chars of the text}` with spaces as `_` and `,` `.` removed.
pub fn transaction_id(record: &TransactionRecord) -> String {
    let text: String = record
        .transaction
        .chars()
        .take(ID_TEXT_CHARS)
        .filter(|c| *c != ',' && *c != '.')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    format!("{}_{}", record.date, text)
}

pub fn within_posting_window(now: DateTime<Utc>) -> bool {
    let hour = now.with_timezone(&HOME_TZ).hour();
    (WINDOW_HOURS.0..=WINDOW_HOURS.1).contains(&hour)
}

pub fn compose_transaction(record: &TransactionRecord) -> String {
    let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d")
        .map(|d| d.format("%B %d, %Y").to_string())
        .unwrap_or_else(|_| record.date.clone());
    truncate(
        &format!("🏟️ Dodgers transaction ({}):\n\n{}", date, record.transaction),
        MAX_POST_CHARS,
    )
}

/// Cut `text` to at most `max` characters, ending in `...` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Unposted transactions dated within the lookback window, newest first.
pub fn pending<'a>(
    records: &'a [TransactionRecord],
    posted: &PostedTransactions,
    today: NaiveDate,
) -> Vec<&'a TransactionRecord> {
    let cutoff = today - Duration::days(LOOKBACK_DAYS);
    let mut seen = HashSet::new();
    let mut pending: Vec<&TransactionRecord> = records
        .iter()
        .filter(|r| {
            NaiveDate::parse_from_str(&r.date, "%Y-%m-%d")
                .map(|d| d >= cutoff)
                .unwrap_or(false)
        })
        .filter(|r| {
            let id = transaction_id(r);
            !posted.contains(&id) && seen.insert(id)
        })
        .collect();
    pending.sort_by(|a, b| b.date.cmp(&a.date));
    pending
}

/// Archive rows with a date and text; blank player lists come back as null.
fn archived_records(table: &Table) -> Vec<TransactionRecord> {
    table
        .to_json_records()
        .into_iter()
        .filter_map(|row| {
            let text = |name: &str| row.get(name).and_then(|v| v.as_str()).map(str::to_string);
            Some(TransactionRecord {
                date: text("date")?,
                transaction: text("transaction")?,
                players: text("players").unwrap_or_default(),
            })
        })
        .collect()
}

async fn load_posted(ctx: &RunContext<'_>) -> Result<PostedTransactions> {
    let key = ctx.config.object_key(MARKER_SUBJECT, POSTED_FILE);
    match ctx.store.get(&key).await? {
        Some(body) => match serde_json::from_slice(&body) {
            Ok(posted) => Ok(posted),
            Err(e) => {
                warn!(key = %key, error = %e, "unreadable posted-transactions list, starting fresh");
                Ok(PostedTransactions::default())
            }
        },
        None => Ok(PostedTransactions::default()),
    }
}

async fn save_posted(ctx: &RunContext<'_>, posted: &PostedTransactions) -> Result<()> {
    let key = ctx.config.object_key(MARKER_SUBJECT, POSTED_FILE);
    ctx.store
        .put(&key, Bytes::from(to_pretty_json(posted)?), "application/json")
        .await
}

pub(super) async fn post_transactions<P: Poster>(
    ctx: &RunContext<'_>,
    poster: &P,
    force: bool,
    now: DateTime<Utc>,
) -> Result<PostReport> {
    let kind = PostKind::Transactions;
    if !force && !within_posting_window(now) {
        return Ok(PostReport::skipped(kind, "outside the posting window"));
    }

    let Some(table) = ctx.load_table(ARCHIVE_KEY).await? else {
        return Ok(PostReport::skipped(kind, "no transactions archive yet"));
    };
    let records = archived_records(&table);
    let mut posted = load_posted(ctx).await?;
    let today = now.with_timezone(&HOME_TZ).date_naive();

    let queue = pending(&records, &posted, today);
    if queue.is_empty() {
        return Ok(PostReport::skipped(kind, "no new transactions"));
    }

    let mut report = PostReport {
        kind,
        composed: Vec::with_capacity(queue.len()),
        posted: 0,
        skipped: None,
    };
    for record in queue {
        let text = compose_transaction(record);
        match poster.post(&text).await {
            Ok(()) if poster.is_live() => {
                posted.remember(transaction_id(record));
                save_posted(ctx, &posted).await?;
                report.posted += 1;
            }
            Ok(()) => {}
            Err(e) => warn!(date = %record.date, error = %e, "transaction post failed"),
        }
        report.composed.push(text);
    }
    info!(composed = report.composed.len(), posted = report.posted, "transactions done");
    Ok(report)
}
