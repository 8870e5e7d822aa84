//! `summarize umpires` and `summarize toplines`

use chrono::Utc;

use crate::pipeline::Stage;
use crate::summary::toplines::{self, summarize_toplines, Topline};
use crate::summary::umpires::{artifact, summarize_umpires, UmpireSummary};

use super::{document_outcome, failed_outcome, print_outcomes, CommandContext};

pub const DATASET: &str = "umpire-summary";
pub const TOPLINES_DATASET: &str = "season-summary";

pub async fn handle_summarize_umpires(ctx: &mut CommandContext) -> Option<UmpireSummary> {
    let started_at = Utc::now();
    let (outcome, summary) = match summarize_umpires(&ctx.run_context()).await {
        Ok((summary, report)) => {
            let rows = summary.worst_calls_of_season.len();
            (
                document_outcome(DATASET, started_at, &artifact().name, rows, report),
                Some(summary),
            )
        }
        Err(e) => (failed_outcome(DATASET, started_at, Stage::Extract, &e), None),
    };
    ctx.record(&outcome);

    if let Some(s) = &summary {
        println!(
            "Season: {} called strikes, {:.1}% correct; last game ({}): {:.1}% correct",
            s.season_summary.total_called_strikes,
            s.season_summary.correct_strikes_pct,
            s.last_game_summary.date,
            s.last_game_summary.calls.correct_strikes_pct
        );
    }
    print_outcomes(&[outcome]);
    summary
}

pub async fn handle_summarize_toplines(ctx: &mut CommandContext) -> Option<Vec<Topline>> {
    let started_at = Utc::now();
    let (outcome, rows) = match summarize_toplines(&ctx.run_context(), started_at).await {
        Ok((rows, report)) => (
            document_outcome(
                TOPLINES_DATASET,
                started_at,
                &toplines::artifact().name,
                rows.len(),
                report,
            ),
            Some(rows),
        ),
        Err(e) => (
            failed_outcome(TOPLINES_DATASET, started_at, Stage::Extract, &e),
            None,
        ),
    };
    ctx.record(&outcome);

    if let Some(rows) = &rows {
        for row in rows.iter().filter(|r| r.category != "summary") {
            println!(
                "{:<22} {:>10}  ({}: {})",
                row.stat_label, row.value, row.context_value_label, row.context_value
            );
        }
    }
    print_outcomes(&[outcome]);
    rows
}
