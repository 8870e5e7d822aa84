//! Command handlers for the dodgers-data CLI
//!
//! Every handler prints its result for the operator and records dataset runs
//! in the ledger. Upstream and sink failures are reported, not returned: only
//! configuration problems make a command fail.

pub mod fetch;
pub mod history;
pub mod post;
pub mod project;
pub mod summarize;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::core::Fetcher;
use crate::pipeline::{RunContext, RunOutcome, RunStatus, Stage};
use crate::sink::SinkReport;
use crate::storage::RunLedger;
use crate::store::Store;
use crate::{DataError, Result};

/// Resources shared by every command for one invocation
pub struct CommandContext {
    pub config: RunConfig,
    pub fetcher: Fetcher,
    pub store: Store,
    pub ledger: Option<RunLedger>,
}

impl CommandContext {
    /// Build the fetcher and store and open the ledger. A ledger that cannot
    /// be opened is logged and skipped.
    pub fn new(config: RunConfig) -> Result<Self> {
        let ledger = match RunLedger::open(config.ledger_path.as_deref()) {
            Ok(ledger) => Some(ledger),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "run ledger unavailable, runs will not be recorded");
                None
            }
        };
        Self::with_ledger(config, ledger)
    }

    pub fn with_ledger(config: RunConfig, ledger: Option<RunLedger>) -> Result<Self> {
        let fetcher = Fetcher::new()?;
        let store = Store::from_config(&config, fetcher.client().clone());
        info!(
            season = %config.season,
            team = %config.team.abbr,
            store = %store.describe(),
            "configured"
        );
        Ok(Self {
            config,
            fetcher,
            store,
            ledger,
        })
    }

    pub fn run_context(&self) -> RunContext<'_> {
        RunContext::new(&self.config, &self.fetcher, &self.store)
    }

    /// Append `outcome` to the ledger; failures are only logged.
    pub fn record(&mut self, outcome: &RunOutcome) {
        let Some(ledger) = self.ledger.as_mut() else {
            return;
        };
        if let Err(e) = ledger.record(outcome) {
            warn!(dataset = %outcome.dataset, error = %format!("{:#}", e), "could not record run");
        }
    }
}

/// Outcome of a command that publishes a single document.
pub fn document_outcome(
    dataset: &str,
    started_at: DateTime<Utc>,
    artifact: &str,
    rows: usize,
    report: SinkReport,
) -> RunOutcome {
    let status = if report.any_written() {
        RunStatus::Succeeded {
            rows: vec![(artifact.to_string(), rows)],
            report,
        }
    } else {
        RunStatus::Failed {
            stage: Stage::Sink,
            reason: report.failures().join("; "),
        }
    };
    RunOutcome {
        dataset: dataset.to_string(),
        started_at,
        finished_at: Utc::now(),
        status,
    }
}

pub fn failed_outcome(
    dataset: &str,
    started_at: DateTime<Utc>,
    stage: Stage,
    error: &DataError,
) -> RunOutcome {
    RunOutcome {
        dataset: dataset.to_string(),
        started_at,
        finished_at: Utc::now(),
        status: RunStatus::Failed {
            stage,
            reason: error.to_string(),
        },
    }
}

/// One line per outcome.
pub fn format_outcomes(outcomes: &[RunOutcome]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<18} {:<8} {:>8} {:>7}  {}",
        "DATASET", "STATUS", "ROWS", "SECS", "DETAIL"
    )];
    for outcome in outcomes {
        let secs = (outcome.finished_at - outcome.started_at).num_milliseconds() as f64 / 1000.0;
        let (status, detail) = match &outcome.status {
            RunStatus::Succeeded { rows, report } => {
                let failures = report.failures();
                let detail = if failures.is_empty() {
                    rows.iter()
                        .map(|(name, _)| name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                } else {
                    format!("partial: {}", failures.join("; "))
                };
                ("ok", detail)
            }
            RunStatus::Failed { stage, reason } => ("FAILED", format!("{}: {}", stage, reason)),
        };
        lines.push(format!(
            "{:<18} {:<8} {:>8} {:>7.1}  {}",
            outcome.dataset,
            status,
            outcome.rows_written(),
            secs,
            detail
        ));
    }
    lines
}

pub fn print_outcomes(outcomes: &[RunOutcome]) {
    for line in format_outcomes(outcomes) {
        println!("{}", line);
    }
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        println!("\n{} of {} runs failed", failed, outcomes.len());
    }
}
