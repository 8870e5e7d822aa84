//! `fetch` and `fetch-all`

use crate::cli::types::Dataset;
use crate::pipeline::RunOutcome;
use crate::sources::run_dataset;

use super::{print_outcomes, CommandContext};

/// Run each dataset once, in the order given, and print the outcome table.
pub async fn handle_fetch(ctx: &mut CommandContext, datasets: &[Dataset]) -> Vec<RunOutcome> {
    let mut unique: Vec<Dataset> = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        if !unique.contains(dataset) {
            unique.push(*dataset);
        }
    }

    let mut outcomes = Vec::with_capacity(unique.len());
    for dataset in unique {
        let outcome = run_dataset(dataset, &ctx.run_context()).await;
        ctx.record(&outcome);
        outcomes.push(outcome);
    }
    print_outcomes(&outcomes);
    outcomes
}

pub async fn handle_fetch_all(ctx: &mut CommandContext) -> Vec<RunOutcome> {
    handle_fetch(ctx, &Dataset::ALL).await
}
