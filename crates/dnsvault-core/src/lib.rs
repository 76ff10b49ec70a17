//! Backup, restore, and diff engine for a domain's DNS records.
//!
//! Sits between `dnsvault-api` and the CLI:
//!
//! - **Sources** ([`source`]) wrap each provider client behind the
//!   [`Provider`] trait and normalize what it returns into canonical
//!   [`Record`]s. Cloudflare and the Canspace cPanel host are writable; the
//!   public-resolver lookup is read-only.
//!
//! - **[`Engine`]** is the facade every CLI command goes through. A unified
//!   backup fetches each configured source, [`unify`]s the results by
//!   `(type, name, value)`, and saves a checksummed [`Snapshot`].
//!
//! - **[`SnapshotStore`]** owns the backup directory: timestamped files,
//!   `latest_*` aliases, listing, archiving, and duplicate cleanup.
//!
//! - **Integrity** ([`checksum`]) is SHA-256 over a sorted-key serialization
//!   of the snapshot minus its `checksum` field. Restore and compare refuse a
//!   snapshot that fails verification.
//!
//! - **Changes** go out through [`bulk`] updates files (create or delete by
//!   exact `(type, name, value)`), and [`propagation`] checks whether each
//!   public resolver already serves a value.

pub mod bulk;
pub mod checksum;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod model;
pub mod propagation;
pub mod restore;
pub mod source;
pub mod store;
pub mod sync;
pub mod unify;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bulk::{BulkAction, BulkOutcome, BulkReport, BulkTarget, BulkUpdate, Preset};
pub use checksum::Verification;
pub use config::{CanspaceCredentials, CloudflareCredentials, EngineConfig};
pub use diff::{RecordDiff, diff};
pub use dnsvault_api::LookupAnswer;
pub use engine::{BackupOutcome, BackupTarget, Comparison, Engine, SkippedSource, VerifyReport};
pub use error::CoreError;
pub use model::{Record, RecordKey, Snapshot, SnapshotDocument};
pub use propagation::{PropagationReport, Resolve, ResolverCheck, ResolverLookup};
pub use restore::{ApplyStatus, RecordOutcome, RestoreMode, RestoreReport};
pub use source::{Provider, SourceFetch, SourceKind, Upsert};
pub use store::{CleanupReport, SnapshotInfo, SnapshotStore};
pub use sync::{DriftEntry, DriftReport, DriftStatus, SyncReport, SyncTarget};
pub use unify::unify;
