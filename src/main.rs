//! Entry point: parse CLI and dispatch to command handlers.

use clap::Parser;
use dodgers_data::{
    cli::{Commands, DodgersData, SummarizeCmd},
    commands::{
        fetch::{handle_fetch, handle_fetch_all},
        history::handle_history,
        post::handle_post,
        project::handle_project,
        summarize::{handle_summarize_toplines, handle_summarize_umpires},
        CommandContext,
    },
    config::{RunConfig, RunMode},
    projection::ProjectionParams,
    Result,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(mode: RunMode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(mode == RunMode::Local)
        .with_target(false)
        .init();
}

/// Run the CLI.
#[tokio::main]
async fn main() -> Result<()> {
    let app = DodgersData::parse();

    let mut config = RunConfig::from_env()?;
    app.global.apply(&mut config);
    init_tracing(config.mode);

    let mut ctx = CommandContext::new(config)?;

    match app.command {
        Commands::Fetch { datasets } => {
            handle_fetch(&mut ctx, &datasets).await;
        }
        Commands::FetchAll => {
            handle_fetch_all(&mut ctx).await;
        }
        Commands::Project { simulations, seed } => {
            let params = ProjectionParams {
                simulations,
                seed,
                ..ProjectionParams::default()
            };
            handle_project(&mut ctx, &params).await;
        }
        Commands::Summarize { cmd } => match cmd {
            SummarizeCmd::Umpires => {
                handle_summarize_umpires(&mut ctx).await;
            }
            SummarizeCmd::Toplines => {
                handle_summarize_toplines(&mut ctx).await;
            }
        },
        Commands::Post { kind, post, force } => {
            handle_post(&ctx, kind, post, force).await?;
        }
        Commands::History { dataset, limit } => {
            handle_history(&ctx, dataset, limit)?;
        }
    }

    Ok(())
}
