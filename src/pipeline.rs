//! The fetch → reshape → merge → sink cycle shared by every dataset
//!
//! A [`Source`] only knows how to fetch and reshape its upstream data into
//! one or more [`Extract`]s. [`run_source`] does the rest: it loads each
//! artifact's archive, merges, sorts and publishes, and turns the first
//! failure into a [`RunStatus::Failed`] naming the stage that failed.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::core::Fetcher;
use crate::merge::{apply_merge, ArchivePolicy, MergeSpec};
use crate::sink::{decode, Format, Sink, SinkReport};
use crate::store::{BlobStore, Store};
use crate::table::Table;
use crate::{DataError, Result};

/// CSV, compact JSON and Parquet.
pub const TABULAR: &[Format] = &[Format::Csv, Format::Json, Format::Parquet];
/// CSV, indented JSON and Parquet.
pub const TABULAR_PRETTY: &[Format] = &[Format::Csv, Format::JsonPretty, Format::Parquet];
pub const CSV_AND_JSON: &[Format] = &[Format::Csv, Format::JsonPretty];
pub const JSON_DOCUMENT: &[Format] = &[Format::JsonPretty];

/// A named output: `{subject}/{name}.{ext}` for each format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub subject: &'static str,
    pub name: String,
    pub formats: &'static [Format],
    pub merge: Option<MergeSpec>,
}

impl Artifact {
    pub fn new(subject: &'static str, name: impl Into<String>, formats: &'static [Format]) -> Self {
        Self {
            subject,
            name: name.into(),
            formats,
            merge: None,
        }
    }

    pub fn with_merge(mut self, spec: MergeSpec) -> Self {
        self.merge = Some(spec);
        self
    }

    pub fn file_name(&self, format: Format) -> String {
        format!("{}.{}", self.name, format.extension())
    }

    /// `{subject}/{name}.{ext}`
    pub fn path(&self, format: Format) -> String {
        format!("{}/{}", self.subject, self.file_name(format))
    }
}

/// One reshaped table and where it goes.
#[derive(Debug, Clone)]
pub struct Extract {
    pub artifact: Artifact,
    pub table: Table,
}

/// Per-run collaborators handed to every stage.
pub struct RunContext<'a> {
    pub config: &'a RunConfig,
    pub fetcher: &'a Fetcher,
    pub store: &'a Store,
    pub sink: Sink<'a>,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &'a RunConfig, fetcher: &'a Fetcher, store: &'a Store) -> Self {
        Self {
            config,
            fetcher,
            store,
            sink: Sink::new(config, store),
        }
    }

    /// Read and decode a previously published table by `{subject}/{file}`
    /// path. `Ok(None)` when the object does not exist.
    pub async fn load_table(&self, relative: &str) -> Result<Option<Table>> {
        let format = Format::from_key(relative).ok_or_else(|| {
            DataError::schema(format!("cannot tell the format of '{}'", relative))
        })?;
        let key = self.config.prefixed_key(relative);
        match self.store.get(&key).await? {
            Some(bytes) => Ok(Some(decode(bytes, format)?)),
            None => Ok(None),
        }
    }
}

/// A dataset pipeline.
#[allow(async_fn_in_trait)]
pub trait Source {
    fn name(&self) -> &'static str;

    /// Fetch upstream data and reshape it into tables.
    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Merge,
    Sink,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Merge => "merge",
            Stage::Sink => "sink",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Succeeded {
        /// Rows published per artifact name
        rows: Vec<(String, usize)>,
        report: SinkReport,
    },
    Failed {
        stage: Stage,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub dataset: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded { .. })
    }

    pub fn rows_written(&self) -> usize {
        match &self.status {
            RunStatus::Succeeded { rows, .. } => rows.iter().map(|(_, n)| n).sum(),
            RunStatus::Failed { .. } => 0,
        }
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match &self.status {
            RunStatus::Failed { stage, .. } => Some(*stage),
            RunStatus::Succeeded { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Failed { reason, .. } => Some(reason),
            RunStatus::Succeeded { .. } => None,
        }
    }
}

/// Load the archive named by `spec`, honouring its policy.
async fn load_archive(ctx: &RunContext<'_>, spec: &MergeSpec, current: &Table) -> Result<Table> {
    match ctx.load_table(&spec.archive_key).await? {
        Some(archive) => Ok(archive),
        None => match spec.policy {
            ArchivePolicy::Required => Err(DataError::Store {
                key: ctx.config.prefixed_key(&spec.archive_key),
                message: "archive not found; refusing to publish without history".to_string(),
            }),
            ArchivePolicy::Optional => {
                warn!(archive = %spec.archive_key, "no archive yet, starting a new one");
                Ok(Table::new(current.schema().clone()))
            }
        },
    }
}

/// Merge one extract with its archive if it has one.
async fn merge_stage(ctx: &RunContext<'_>, extract: Extract) -> Result<Extract> {
    let Extract { artifact, table } = extract;
    let table = match &artifact.merge {
        Some(spec) => {
            let archive = load_archive(ctx, spec, &table).await?;
            apply_merge(archive, table, spec)?
        }
        None => table,
    };
    Ok(Extract { artifact, table })
}

/// Run one dataset end to end. Never panics on upstream failure: the first
/// failing stage is reported in the outcome.
pub async fn run_source<S: Source>(source: &S, ctx: &RunContext<'_>) -> RunOutcome {
    let dataset = source.name().to_string();
    let started_at = Utc::now();
    info!(dataset = %dataset, "run started");

    let status = run_stages(source, ctx).await;
    match &status {
        RunStatus::Succeeded { rows, .. } => {
            info!(dataset = %dataset, artifacts = rows.len(), "run finished");
        }
        RunStatus::Failed { stage, reason } => {
            error!(dataset = %dataset, stage = %stage, reason = %reason, "run failed");
        }
    }

    RunOutcome {
        dataset,
        started_at,
        finished_at: Utc::now(),
        status,
    }
}

async fn run_stages<S: Source>(source: &S, ctx: &RunContext<'_>) -> RunStatus {
    let failed = |stage: Stage, e: DataError| RunStatus::Failed {
        stage,
        reason: e.to_string(),
    };

    let extracts = match source.extract(ctx).await {
        Ok(extracts) if extracts.is_empty() => {
            return failed(Stage::Extract, DataError::no_data(source.name()))
        }
        Ok(extracts) => extracts,
        Err(e) => return failed(Stage::Extract, e),
    };
    for extract in &extracts {
        info!(
            artifact = %extract.artifact.name,
            rows = extract.table.len(),
            "extracted"
        );
    }

    let mut merged = Vec::with_capacity(extracts.len());
    for extract in extracts {
        match merge_stage(ctx, extract).await {
            Ok(m) => merged.push(m),
            Err(e) => return failed(Stage::Merge, e),
        }
    }

    let mut rows = Vec::with_capacity(merged.len());
    let mut report = SinkReport::default();
    for extract in &merged {
        let artifact_report = ctx.sink.publish(&extract.table, &extract.artifact).await;
        if !artifact_report.any_written() {
            return RunStatus::Failed {
                stage: Stage::Sink,
                reason: artifact_report.failures().join("; "),
            };
        }
        for failure in artifact_report.failures() {
            warn!(artifact = %extract.artifact.name, failure = %failure, "partial sink failure");
        }
        rows.push((extract.artifact.name.clone(), extract.table.len()));
        report.extend(artifact_report);
    }

    RunStatus::Succeeded { rows, report }
}
