// ── Domain model ──

mod record;
mod snapshot;

pub use record::{DEFAULT_TTL, Record, RecordKey};
pub use snapshot::{
    BACKUP_TOOL, PRE_RESTORE_LABEL, Snapshot, SnapshotDocument, SnapshotMetadata, SourcePayload,
    UNIFIED_LABEL, parse_timestamp,
};
