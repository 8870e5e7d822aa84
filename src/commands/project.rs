//! `project`

use chrono::Utc;

use crate::projection::{artifact, run_projection, ProjectionParams, ProjectionStatus, WinProjection};

use super::{document_outcome, print_outcomes, CommandContext};

pub const DATASET: &str = "projection";

pub async fn handle_project(ctx: &mut CommandContext, params: &ProjectionParams) -> WinProjection {
    let started_at = Utc::now();
    let (projection, report) = run_projection(&ctx.run_context(), params).await;

    let outcome = document_outcome(
        DATASET,
        started_at,
        &artifact().name,
        projection.timeseries.len(),
        report,
    );
    ctx.record(&outcome);

    println!(
        "{}-{} after {} games: {}",
        projection.current_wins,
        projection.current_losses,
        projection.games_played,
        projection.message
    );
    if let (ProjectionStatus::InProgress, Some(last)) = (projection.status, projection.final_point())
    {
        println!(
            "Projected final wins: {:.1} (95% interval {:.0}-{:.0})",
            last.mean_projected_wins, last.lower_ci_wins, last.upper_ci_wins
        );
    }
    print_outcomes(&[outcome]);
    projection
}
