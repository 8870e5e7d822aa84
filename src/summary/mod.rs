//! Derived summaries built from already-published tables

pub mod toplines;
pub mod umpires;

pub use toplines::{summarize_toplines, Topline};
pub use umpires::{summarize_umpires, UmpireSummary};
