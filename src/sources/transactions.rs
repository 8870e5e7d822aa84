//! Club transactions from the MLB stats API, folded into a running archive

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cli::types::home_today;
use crate::merge::{ArchivePolicy, MergeSpec};
use crate::pipeline::{Artifact, Extract, RunContext, Source, CSV_AND_JSON};
use crate::table::{ColumnType, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "transactions";
pub const ARTIFACT_NAME: &str = "dodgers_transactions_archive";
pub const ARCHIVE_KEY: &str = "roster/dodgers_transactions_archive.json";

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub transactions: Vec<ApiTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTransaction {
    pub date: Option<String>,
    #[serde(rename = "effectiveDate")]
    pub effective_date: Option<String>,
    pub description: Option<String>,
    pub person: Option<Person>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// `YYYY-MM-DD`
    pub date: String,
    pub transaction: String,
    /// Everyone named in the transaction, `; `-joined
    pub players: String,
}

impl Record for TransactionRecord {
    fn schema() -> Schema {
        Schema::of(&[
            ("date", ColumnType::Text),
            ("transaction", ColumnType::Text),
            ("players", ColumnType::Text),
        ])
    }
}

pub struct TransactionsSource;

impl TransactionsSource {
    pub fn url(ctx: &RunContext<'_>, today: NaiveDate) -> String {
        format!(
            "{}/api/v1/transactions?teamId={}&startDate={}-01-01&endDate={}",
            ctx.config.endpoints.statsapi,
            ctx.config.team.id,
            ctx.config.season,
            today.format("%Y-%m-%d")
        )
    }

    pub fn artifact() -> Artifact {
        Artifact::new("roster", ARTIFACT_NAME, CSV_AND_JSON).with_merge(MergeSpec {
            archive_key: ARCHIVE_KEY.to_string(),
            natural_key: &["date", "transaction"],
            sort_by: &["date"],
            descending: true,
            policy: ArchivePolicy::Optional,
        })
    }
}

impl Source for TransactionsSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let url = Self::url(ctx, home_today());
        let response: TransactionsResponse = ctx.fetcher.get_json(&url).await?;
        let records = group_transactions(response.transactions);
        if records.is_empty() {
            return Err(DataError::no_data(SOURCE));
        }
        Ok(vec![Extract {
            artifact: Self::artifact(),
            table: Table::from_records(&records)?,
        }])
    }
}

/// One record per distinct `(date, description)`, in first-seen order.
///
/// The API lists a transaction once per person involved.
pub fn group_transactions(transactions: Vec<ApiTransaction>) -> Vec<TransactionRecord> {
    let mut records: Vec<TransactionRecord> = Vec::new();

    for t in transactions {
        let Some(description) = t.description.filter(|d| !d.trim().is_empty()) else {
            continue;
        };
        let Some(date) = t.date.or(t.effective_date) else {
            continue;
        };
        // Dates may carry a time component.
        let date = date.get(..10).unwrap_or(&date).to_string();
        let name = t.person.and_then(|p| p.full_name);

        let existing = records
            .iter()
            .position(|r| r.date == date && r.transaction == description);
        match (existing, name) {
            (Some(idx), Some(name)) => {
                let record = &mut records[idx];
                if !record.players.split("; ").any(|p| p == name) {
                    if !record.players.is_empty() {
                        record.players.push_str("; ");
                    }
                    record.players.push_str(&name);
                }
            }
            (Some(_), None) => {}
            (None, name) => records.push(TransactionRecord {
                date,
                transaction: description,
                players: name.unwrap_or_default(),
            }),
        }
    }
    records
}
