// ── Restore and sync reports ──
//
// Restore and sync share the same per-record bookkeeping: every record is
// attempted, a failure is recorded and the run carries on.

use std::path::PathBuf;

use serde::Serialize;
use strum::Display;
use tracing::{info, warn};

use crate::model::Record;
use crate::source::{Provider, SourceKind, Upsert};

/// Whether a restore touches the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RestoreMode {
    /// Verify and report only. No external calls.
    #[default]
    DryRun,
    /// Verify, take a pre-restore snapshot, then apply every record.
    Live,
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum ApplyStatus {
    /// Dry run: would have been applied.
    Planned,
    Created,
    Updated,
    Deleted,
    /// A delete found no record with that type, name and value.
    Absent,
    Failed(String),
}

impl From<Upsert> for ApplyStatus {
    fn from(upsert: Upsert) -> Self {
        match upsert {
            Upsert::Created => Self::Created,
            Upsert::Updated => Self::Updated,
        }
    }
}

impl ApplyStatus {
    /// The provider's records changed.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub record: Record,
    #[serde(flatten)]
    pub status: ApplyStatus,
}

impl RecordOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, ApplyStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub snapshot: PathBuf,
    pub mode: RestoreMode,
    pub destination: SourceKind,
    /// Checksum of the verified snapshot.
    pub checksum: String,
    /// Set for live runs: where the current state was saved first.
    pub pre_restore: Option<PathBuf>,
    pub outcomes: Vec<RecordOutcome>,
}

impl RestoreReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_write())
            .count()
    }
}

/// Mark every record as planned without touching anything.
pub fn plan(records: Vec<Record>) -> Vec<RecordOutcome> {
    records
        .into_iter()
        .map(|record| RecordOutcome {
            record,
            status: ApplyStatus::Planned,
        })
        .collect()
}

/// Best-effort apply: one `update_or_create` per record, failures collected.
pub async fn apply(provider: &dyn Provider, records: Vec<Record>) -> Vec<RecordOutcome> {
    let destination = provider.kind();
    let mut outcomes = Vec::with_capacity(records.len());
    for record in records {
        let status = match provider.update_or_create(&record).await {
            Ok(upsert) => {
                info!(%destination, record = %record.key(), ?upsert, "applied record");
                ApplyStatus::from(upsert)
            }
            Err(e) => {
                warn!(%destination, record = %record.key(), error = %e, "failed to apply record");
                ApplyStatus::Failed(e.to_string())
            }
        };
        outcomes.push(RecordOutcome { record, status });
    }
    outcomes
}
