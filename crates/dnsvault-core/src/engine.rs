// ── Engine ──
//
// Facade tying sources, snapshots, and storage together. One engine serves
// one domain; every CLI command is a single call on it.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use dnsvault_api::resolver::{DEFAULT_RESOLVERS, LOOKUP_TIMEOUT};
use dnsvault_api::{CloudflareClient, PublicResolver, TransportConfig};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::bulk::{self, BulkReport, BulkTarget, BulkUpdate};
use crate::config::EngineConfig;
use crate::diff::{RecordDiff, diff};
use crate::error::CoreError;
use crate::model::{PRE_RESTORE_LABEL, Snapshot, SnapshotDocument, SourcePayload, UNIFIED_LABEL};
use crate::propagation::{self, PropagationReport, Resolve, ResolverLookup};
use crate::restore::{self, RestoreMode, RestoreReport};
use crate::source::{
    CanspaceSource, CloudflareSource, Provider, PublicSource, SourceFetch, SourceKind, normalize,
};
use crate::store::{CleanupReport, SnapshotInfo, SnapshotStore};
use crate::sync::{self, DriftReport, SyncReport, SyncTarget};
use crate::unify::unify;

/// What `backup` captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackupTarget {
    /// Every source, merged.
    #[default]
    Unified,
    /// One source on its own. Failure is fatal.
    Source(SourceKind),
}

impl FromStr for BackupTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "unified" => Ok(Self::Unified),
            other => other
                .parse::<SourceKind>()
                .map(Self::Source)
                .map_err(|_| CoreError::UnknownProvider { name: s.to_owned() }),
        }
    }
}

/// A source left out of a unified backup, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub source: SourceKind,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub snapshot: Snapshot,
    pub path: PathBuf,
    pub skipped: Vec<SkippedSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub path: PathBuf,
    pub intact: bool,
    pub stored: String,
    pub computed: String,
    pub label: String,
    pub domain: String,
    pub timestamp: String,
    pub total_records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub file1: String,
    pub file2: String,
    pub date1: String,
    pub date2: String,
    #[serde(flatten)]
    pub diff: RecordDiff,
}

pub struct Engine {
    config: EngineConfig,
    store: SnapshotStore,
    providers: BTreeMap<SourceKind, Arc<dyn Provider>>,
    resolve: Arc<dyn Resolve>,
}

impl Engine {
    // ── Construction ─────────────────────────────────────────────────

    /// Build the sources the config has credentials for. The public source
    /// needs none and is always present.
    pub fn new(config: EngineConfig) -> Result<Self, CoreError> {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

        if let Some(creds) = &config.cloudflare {
            let client = CloudflareClient::new(
                &creds.api_token,
                config.domain.clone(),
                creds.zone_id.clone(),
                &TransportConfig::new(config.timeout),
            )
            .map_err(|e| CoreError::provider(SourceKind::Cloudflare.as_str(), e))?;
            providers.push(Arc::new(CloudflareSource::new(client)));
        }

        if let Some(creds) = &config.canspace {
            let transport = TransportConfig::new(config.timeout).insecure(config.insecure);
            providers.push(Arc::new(CanspaceSource::new(
                config.domain.clone(),
                creds.clone(),
                transport,
            )));
        }

        providers.push(Arc::new(PublicSource::new(
            config.domain.clone(),
            PublicResolver::new(&resolvers(&config), LOOKUP_TIMEOUT),
        )));

        Ok(Self::with_providers(config, providers))
    }

    /// Use exactly these providers.
    pub fn with_providers(
        config: EngineConfig,
        providers: impl IntoIterator<Item = Arc<dyn Provider>>,
    ) -> Self {
        let store = SnapshotStore::from_config(&config);
        let providers = providers.into_iter().map(|p| (p.kind(), p)).collect();
        Self {
            config,
            store,
            providers,
            resolve: Arc::new(ResolverLookup::default()),
        }
    }

    /// Replace the per-resolver lookups used by `propagation`.
    #[must_use]
    pub fn with_resolve(mut self, resolve: Arc<dyn Resolve>) -> Self {
        self.resolve = resolve;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Sources that have a provider configured, in unify order.
    pub fn configured(&self) -> Vec<SourceKind> {
        self.providers.keys().copied().collect()
    }

    fn provider(&self, kind: SourceKind) -> Result<&Arc<dyn Provider>, CoreError> {
        self.providers
            .get(&kind)
            .ok_or_else(|| CoreError::MissingCredentials {
                provider: kind.to_string(),
            })
    }

    fn writable(&self, kind: SourceKind) -> Result<&Arc<dyn Provider>, CoreError> {
        if !kind.is_writable() {
            return Err(CoreError::Unsupported {
                provider: kind.to_string(),
                operation: "accept writes".into(),
            });
        }
        self.provider(kind)
    }

    // ── Backup ───────────────────────────────────────────────────────

    /// Collect a snapshot without saving it.
    pub async fn snapshot(&self, target: BackupTarget) -> Result<(Snapshot, Vec<SkippedSource>), CoreError> {
        match target {
            BackupTarget::Unified => self.collect(UNIFIED_LABEL, SourceKind::iter(), None).await,
            BackupTarget::Source(kind) => self.collect(kind.as_str(), [kind], Some(kind)).await,
        }
    }

    /// Collect and save a snapshot.
    pub async fn backup(&self, target: BackupTarget) -> Result<BackupOutcome, CoreError> {
        let (snapshot, skipped) = self.snapshot(target).await?;
        let path = self.store.save(&snapshot)?;
        Ok(BackupOutcome {
            snapshot,
            path,
            skipped,
        })
    }

    /// Fetch `sources` in order. A failure of the `required` source aborts;
    /// any other failing or unconfigured source is skipped.
    async fn collect(
        &self,
        label: &str,
        sources: impl IntoIterator<Item = SourceKind>,
        required: Option<SourceKind>,
    ) -> Result<(Snapshot, Vec<SkippedSource>), CoreError> {
        let mut fetched: Vec<SourceFetch> = Vec::new();
        let mut skipped = Vec::new();

        for kind in sources {
            let result = match self.provider(kind) {
                Ok(provider) => provider.fetch().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(fetch) => {
                    info!(source = %kind, records = fetch.records.len(), "collected source");
                    fetched.push(fetch);
                }
                Err(e) if required == Some(kind) => return Err(e),
                Err(e) => {
                    warn!(source = %kind, error = %e, "skipping source");
                    skipped.push(SkippedSource {
                        source: kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut sources = BTreeMap::new();
        let mut all_records = Vec::new();
        for fetch in fetched {
            sources.insert(
                fetch.kind.to_string(),
                SourcePayload {
                    provider: fetch.kind.to_string(),
                    total_records: fetch.payload.len(),
                    records: fetch.payload,
                    quarantined: fetch.quarantined,
                },
            );
            all_records.extend(fetch.records);
        }

        let snapshot = Snapshot::new(
            self.config.domain.clone(),
            label,
            Utc::now(),
            sources,
            unify(all_records),
        )?;
        Ok((snapshot, skipped))
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn list(&self, days: u32) -> Result<Vec<SnapshotInfo>, CoreError> {
        self.store.list(days)
    }

    pub fn load(&self, reference: &str) -> Result<SnapshotDocument, CoreError> {
        SnapshotDocument::load(self.store.resolve(reference))
    }

    pub fn verify(&self, reference: &str) -> Result<VerifyReport, CoreError> {
        let doc = self.load(reference)?;
        let verification = doc.verify();
        Ok(VerifyReport {
            intact: verification.is_intact(),
            stored: verification.stored,
            computed: verification.computed,
            label: doc.label().to_owned(),
            domain: doc.domain().to_owned(),
            timestamp: doc.timestamp().to_owned(),
            total_records: doc.total_records(),
            path: doc.path,
        })
    }

    /// Diff two snapshots. Both must pass verification.
    pub fn compare(&self, before: &str, after: &str) -> Result<Comparison, CoreError> {
        let first = self.load(before)?;
        let second = self.load(after)?;
        first.ensure_intact()?;
        second.ensure_intact()?;

        Ok(Comparison {
            file1: file_name(&first.path),
            file2: file_name(&second.path),
            date1: first.timestamp().to_owned(),
            date2: second.timestamp().to_owned(),
            diff: diff(&first.records()?, &second.records()?),
        })
    }

    // ── Restore ──────────────────────────────────────────────────────

    /// Apply a snapshot back to a provider.
    ///
    /// The snapshot is verified first; a mismatch aborts before any provider
    /// is touched. A live run resolves the destination, saves a pre-restore
    /// snapshot of the current state, then applies every record
    /// best-effort. If the destination cannot be read, nothing is saved or
    /// written.
    pub async fn restore(
        &self,
        reference: &str,
        destination: Option<SourceKind>,
        mode: RestoreMode,
    ) -> Result<RestoreReport, CoreError> {
        let doc = self.load(reference)?;
        let verification = doc.ensure_intact()?;
        let records = doc.records()?;
        let destination = restore_destination(&doc, destination)?;
        info!(snapshot = %doc.path.display(), %destination, %mode, records = records.len(), "restoring");

        let mut report = RestoreReport {
            snapshot: doc.path.clone(),
            mode,
            destination,
            checksum: verification.computed,
            pre_restore: None,
            outcomes: Vec::new(),
        };

        if mode == RestoreMode::DryRun {
            report.outcomes = restore::plan(records);
            return Ok(report);
        }

        let provider = self.writable(destination)?;

        // The destination's current state must be captured before any write.
        let (current, _) = self
            .collect(PRE_RESTORE_LABEL, SourceKind::iter(), Some(destination))
            .await?;
        let pre_restore = self.store.save(&current)?;
        info!(path = %pre_restore.display(), "saved pre-restore snapshot");
        report.pre_restore = Some(pre_restore);

        report.outcomes = restore::apply(provider.as_ref(), records).await;
        if report.failures() > 0 {
            warn!(failed = report.failures(), applied = report.applied(), "restore finished with failures");
        }
        Ok(report)
    }

    // ── Retention ────────────────────────────────────────────────────

    /// Archive snapshots older than `days`, or the configured retention window.
    pub fn archive(&self, days: Option<u32>) -> Result<Vec<PathBuf>, CoreError> {
        self.store.archive(days.unwrap_or(self.config.retention_days))
    }

    pub fn cleanup(&self) -> Result<CleanupReport, CoreError> {
        self.store.cleanup()
    }

    // ── Cross-provider ───────────────────────────────────────────────

    /// Copy records from one provider onto others, skipping NS and SOA.
    pub async fn sync(
        &self,
        from: Option<SourceKind>,
        to: Option<SourceKind>,
        dry_run: bool,
    ) -> Result<SyncReport, CoreError> {
        let from = from.unwrap_or(SourceKind::Cloudflare);
        let source = self.provider(from)?;

        let targets: Vec<SourceKind> = match to {
            Some(to) if to == from => {
                return Err(CoreError::Config {
                    message: format!("cannot sync {from} onto itself"),
                });
            }
            Some(to) => {
                self.writable(to)?;
                vec![to]
            }
            None => self
                .configured()
                .into_iter()
                .filter(|kind| kind.is_writable() && *kind != from)
                .collect(),
        };
        if targets.is_empty() {
            return Err(CoreError::Config {
                message: format!("no provider other than {from} is configured to sync to"),
            });
        }

        let fetch = source.fetch().await?;
        let fetched = fetch.records.len();
        let (records, skipped) = sync::syncable(fetch.records);
        info!(%from, records = records.len(), skipped, dry_run, "syncing");

        let mut report = SyncReport {
            from,
            dry_run,
            fetched,
            skipped,
            targets: Vec::with_capacity(targets.len()),
        };
        for kind in targets {
            let outcomes = if dry_run {
                restore::plan(records.clone())
            } else {
                restore::apply(self.writable(kind)?.as_ref(), records.clone()).await
            };
            report.targets.push(SyncTarget {
                provider: kind,
                outcomes,
            });
        }
        Ok(report)
    }

    /// Compare what every configured writable provider currently serves.
    pub async fn drift(&self) -> Result<DriftReport, CoreError> {
        let providers: Vec<&Arc<dyn Provider>> = self
            .providers
            .values()
            .filter(|p| p.kind().is_writable())
            .collect();
        if providers.len() < 2 {
            return Err(CoreError::Config {
                message: "drift needs at least two configured providers".into(),
            });
        }

        let mut sets = Vec::with_capacity(providers.len());
        for provider in providers {
            let fetch = provider.fetch().await?;
            sets.push((fetch.kind, fetch.records));
        }
        Ok(sync::drift(&sets))
    }

    /// Apply an updates file to one writable provider, or to every
    /// configured one. Every entry is validated before anything is written.
    pub async fn bulk(
        &self,
        updates: &[BulkUpdate],
        to: Option<SourceKind>,
        dry_run: bool,
    ) -> Result<BulkReport, CoreError> {
        if updates.is_empty() {
            return Err(CoreError::Config {
                message: "the updates file has no entries".into(),
            });
        }
        let changes = updates
            .iter()
            .map(|u| Ok((u.action, u.to_record(&self.config.domain)?)))
            .collect::<Result<Vec<_>, CoreError>>()?;

        let targets: Vec<SourceKind> = match to {
            Some(to) => {
                self.writable(to)?;
                vec![to]
            }
            None => self
                .configured()
                .into_iter()
                .filter(|kind| kind.is_writable())
                .collect(),
        };
        if targets.is_empty() {
            return Err(CoreError::Config {
                message: "no writable provider is configured".into(),
            });
        }
        info!(updates = changes.len(), targets = targets.len(), dry_run, "applying bulk updates");

        let mut report = BulkReport {
            dry_run,
            updates: updates.len(),
            targets: Vec::with_capacity(targets.len()),
        };
        for kind in targets {
            let outcomes = if dry_run {
                bulk::plan(&changes)
            } else {
                bulk::apply(self.writable(kind)?.as_ref(), &changes).await
            };
            report.targets.push(BulkTarget {
                provider: kind,
                outcomes,
            });
        }
        Ok(report)
    }

    // ── Propagation ──────────────────────────────────────────────────

    /// Ask each public resolver whether it serves `expected` for
    /// `record_type` at `name` (the apex by default).
    pub async fn propagation(
        &self,
        record_type: &str,
        name: Option<&str>,
        expected: Option<&str>,
    ) -> Result<PropagationReport, CoreError> {
        if record_type.trim().is_empty() {
            return Err(CoreError::Config {
                message: "a record type is required".into(),
            });
        }
        let name = normalize::qualify_name(name.unwrap_or("@"), &self.config.domain);
        let servers = resolvers(&self.config);
        info!(%name, record_type, resolvers = servers.len(), "checking propagation");
        Ok(propagation::check(self.resolve.as_ref(), &servers, record_type, &name, expected).await)
    }
}

/// Explicit choice, else the snapshot's own label or provider if writable,
/// else Cloudflare.
fn restore_destination(
    doc: &SnapshotDocument,
    explicit: Option<SourceKind>,
) -> Result<SourceKind, CoreError> {
    if let Some(kind) = explicit {
        if !kind.is_writable() {
            return Err(CoreError::Unsupported {
                provider: kind.to_string(),
                operation: "be a restore destination".into(),
            });
        }
        return Ok(kind);
    }

    Ok([Some(doc.label()), doc.provider()]
        .into_iter()
        .flatten()
        .filter_map(|name| name.parse::<SourceKind>().ok())
        .find(|kind| kind.is_writable())
        .unwrap_or(SourceKind::Cloudflare))
}

/// Resolvers from the profile, else the built-in public set.
fn resolvers(config: &EngineConfig) -> Vec<IpAddr> {
    if config.resolvers.is_empty() {
        DEFAULT_RESOLVERS.to_vec()
    } else {
        config.resolvers.clone()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn backup_targets_parse() {
        assert_eq!("all".parse::<BackupTarget>().unwrap(), BackupTarget::Unified);
        assert_eq!("UNIFIED".parse::<BackupTarget>().unwrap(), BackupTarget::Unified);
        assert_eq!(
            "dig".parse::<BackupTarget>().unwrap(),
            BackupTarget::Source(SourceKind::Public)
        );
        assert!(matches!(
            "route53".parse::<BackupTarget>(),
            Err(CoreError::UnknownProvider { name }) if name == "route53"
        ));
    }
}
