//! CLI argument definitions and parsing.

pub mod types;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use types::{Dataset, PostKind, Season};

use crate::config::{RunConfig, StoreTarget};
use crate::projection::{DEFAULT_SIMULATIONS, MIN_SIMULATIONS};

/// Flags accepted by every command; they override the environment.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Season year (or set `DODGERS_SEASON`); defaults to the current year.
    #[clap(long, global = true)]
    pub season: Option<Season>,

    /// Local output directory (or set `DODGERS_DATA_DIR`).
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(season) = self.season {
            config.season = season;
        }
        if let Some(dir) = &self.data_dir {
            // A mirror that defaulted to the old data dir moves with it.
            if let StoreTarget::Local { dir: mirror } = &mut config.store {
                if *mirror == config.data_dir.join("mirror") {
                    *mirror = dir.join("mirror");
                }
            }
            config.data_dir = dir.clone();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum SummarizeCmd {
    /// Called-strike accuracy from the season's pitch table
    Umpires,
    /// Season summary stats read by the daily posts
    Toplines,
}

fn parse_simulations(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("'{}': {}", s, e))?;
    if n < MIN_SIMULATIONS {
        return Err(format!("need at least {} simulations, got {}", MIN_SIMULATIONS, n));
    }
    Ok(n)
}

#[derive(Debug, Parser)]
#[clap(
    name = "dodgers-data",
    version,
    about = "Fetch, archive and publish Los Angeles Dodgers data"
)]
pub struct DodgersData {
    #[clap(flatten)]
    pub global: GlobalArgs,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one or more dataset pipelines
    Fetch {
        #[clap(required = true, value_enum)]
        datasets: Vec<Dataset>,
    },

    /// Run every dataset pipeline in dependency order
    FetchAll,

    /// Project the season's final win total from the wins/losses table
    Project {
        /// Number of bootstrap simulations (at least 10000).
        #[clap(long, default_value_t = DEFAULT_SIMULATIONS, value_parser = parse_simulations)]
        simulations: usize,

        /// Fix the random seed for a reproducible projection.
        #[clap(long)]
        seed: Option<u64>,
    },

    /// Build a summary from already-published tables
    Summarize {
        #[clap(subcommand)]
        cmd: SummarizeCmd,
    },

    /// Compose a social post; prints it unless `--post` is given
    Post {
        #[clap(value_enum)]
        kind: PostKind,

        /// Actually send the post through the configured webhook.
        #[clap(long)]
        post: bool,

        /// Ignore the posting window for transactions.
        #[clap(long)]
        force: bool,
    },

    /// Show recorded runs, newest first
    History {
        #[clap(long, value_enum)]
        dataset: Option<Dataset>,

        #[clap(long, default_value_t = 20)]
        limit: usize,
    },
}
