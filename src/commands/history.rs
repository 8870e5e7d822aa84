//! `history`

use crate::cli::types::Dataset;
use crate::storage::LedgerEntry;
use crate::Result;

use super::CommandContext;

pub fn format_entries(entries: &[LedgerEntry]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<20} {:<18} {:<8} {:>8}  {}",
        "STARTED (UTC)", "DATASET", "STATUS", "ROWS", "DETAIL"
    )];
    for entry in entries {
        let detail = match (&entry.stage, &entry.reason) {
            (Some(stage), Some(reason)) => format!("{}: {}", stage, reason),
            (None, Some(reason)) => reason.clone(),
            _ => String::new(),
        };
        lines.push(format!(
            "{:<20} {:<18} {:<8} {:>8}  {}",
            entry.started_at.format("%Y-%m-%d %H:%M:%S"),
            entry.dataset,
            entry.status,
            entry.rows,
            detail
        ));
    }
    lines
}

pub fn handle_history(
    ctx: &CommandContext,
    dataset: Option<Dataset>,
    limit: usize,
) -> Result<Vec<LedgerEntry>> {
    let Some(ledger) = ctx.ledger.as_ref() else {
        println!("No run ledger available.");
        return Ok(Vec::new());
    };
    let entries = ledger.recent(dataset.map(|d| d.as_str()), limit)?;
    if entries.is_empty() {
        println!("No runs recorded yet.");
    } else {
        for line in format_entries(&entries) {
            println!("{}", line);
        }
    }
    Ok(entries)
}
