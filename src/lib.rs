//! Dodgers data pipelines
//!
//! Fetches Los Angeles Dodgers and league data from baseball-reference, the
//! MLB stats API and Baseball Savant, folds each dataset into its historical
//! archive and publishes CSV, JSON and Parquet artifacts to a local directory
//! and an object store.
//!
//! ## Layout
//!
//! - [`sources`]: one [`pipeline::Source`] per dataset
//! - [`pipeline`]: the extract, merge and sink stages and their outcome
//! - [`merge`], [`table`], [`sink`], [`store`]: archive merging, the typed
//!   table model, encoders and object storage
//! - [`projection`], [`summary`]: derived outputs built from published tables
//! - [`social`]: post composition and delivery
//! - [`storage`]: the SQLite run ledger
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dodgers_data::{config::RunConfig, core::Fetcher, pipeline::RunContext, store::Store};
//! use dodgers_data::{sources::run_dataset, Dataset};
//!
//! # async fn example() -> dodgers_data::Result<()> {
//! let config = RunConfig::from_env()?;
//! let fetcher = Fetcher::new()?;
//! let store = Store::from_config(&config, fetcher.client().clone());
//! let ctx = RunContext::new(&config, &fetcher, &store);
//!
//! let outcome = run_dataset(Dataset::Roster, &ctx).await;
//! println!("{} rows", outcome.rows_written());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod projection;
pub mod sink;
pub mod social;
pub mod sources;
pub mod storage;
pub mod store;
pub mod summary;
pub mod table;

pub use cli::types::{Dataset, GamePk, PostKind, Season, TeamId};
pub use error::{DataError, Result};
