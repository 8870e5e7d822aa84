//! Type-safe wrappers and enums for the pipeline CLI.

pub mod datasets;
pub mod ids;
pub mod time;

pub use datasets::{Dataset, PostKind};
pub use ids::{GamePk, TeamId};
pub use time::{home_date, home_today, Season, HOME_TZ};
