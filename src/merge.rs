//! Merging freshly fetched rows into a previously published archive.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{DataError, Result};
use crate::table::Table;

/// What to do when the archive artifact does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivePolicy {
    /// Abort the run rather than publish a table without its history.
    Required,
    /// Start from an empty archive.
    Optional,
}

/// How a current table is folded into its archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    /// Object-store key of the archive artifact.
    pub archive_key: String,
    pub natural_key: &'static [&'static str],
    pub sort_by: &'static [&'static str],
    pub descending: bool,
    pub policy: ArchivePolicy,
}

/// Concatenate `current` and `archive`, keeping one row per natural key.
///
/// Current rows come first so they win over archived rows with the same key.
/// The archive is conformed to the current schema before comparison, so key
/// matching is exact on typed values.
pub fn merge_with_archive(archive: Table, current: Table, natural_key: &[&str]) -> Result<Table> {
    if natural_key.is_empty() {
        return Err(DataError::schema("natural key must name at least one column"));
    }

    let schema = current.schema().clone();
    let key_idx = current.indexes_of(natural_key)?;
    let archive = archive.conform(&schema);

    let archived = archive.len();
    let fresh = current.len();

    let mut seen = HashSet::with_capacity(archived + fresh);
    let mut merged = Table::new(schema);
    let mut dropped = 0usize;

    for row in current.into_rows().into_iter().chain(archive.into_rows()) {
        let key = merged.key_of(&row, &key_idx);
        if seen.insert(key) {
            merged.push_row(row)?;
        } else {
            dropped += 1;
        }
    }

    debug!(dropped, "duplicate natural keys dropped during merge");
    info!(
        archived,
        fresh,
        merged = merged.len(),
        "merged current rows into archive"
    );
    Ok(merged)
}

/// Merge and sort according to `spec`.
pub fn apply_merge(archive: Table, current: Table, spec: &MergeSpec) -> Result<Table> {
    let mut merged = merge_with_archive(archive, current, spec.natural_key)?;
    merged.sort_by_columns(spec.sort_by, spec.descending)?;
    Ok(merged)
}
