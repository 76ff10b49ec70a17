#![allow(clippy::unwrap_used)]
// Engine orchestration tests against in-memory providers.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dnsvault_core::{
    ApplyStatus, BackupTarget, BulkAction, BulkUpdate, CoreError, Engine, EngineConfig, LookupAnswer,
    Provider, Record, Resolve, RestoreMode, SourceFetch, SourceKind, Upsert,
};
use pretty_assertions::assert_eq;

// ── Fake provider ───────────────────────────────────────────────────

struct FakeProvider {
    kind: SourceKind,
    records: Vec<Record>,
    fail_fetch: bool,
    fail_writes: bool,
    fetches: AtomicUsize,
    writes: Mutex<Vec<Record>>,
    deletes: Mutex<Vec<Record>>,
    /// Backup directory to inspect on every write.
    watch_dir: Option<PathBuf>,
    /// Pre-restore files present at each write, in write order.
    pre_restore_seen: Mutex<Vec<usize>>,
}

impl FakeProvider {
    fn new(kind: SourceKind, records: Vec<Record>) -> Arc<Self> {
        Arc::new(Self::plain(kind, records))
    }

    fn failing_fetch(kind: SourceKind) -> Arc<Self> {
        Arc::new(Self {
            fail_fetch: true,
            ..Self::plain(kind, Vec::new())
        })
    }

    fn failing_writes(kind: SourceKind, records: Vec<Record>) -> Arc<Self> {
        Arc::new(Self {
            fail_writes: true,
            ..Self::plain(kind, records)
        })
    }

    fn watching(kind: SourceKind, records: Vec<Record>, dir: &Path) -> Arc<Self> {
        Arc::new(Self {
            watch_dir: Some(dir.to_path_buf()),
            ..Self::plain(kind, records)
        })
    }

    fn plain(kind: SourceKind, records: Vec<Record>) -> Self {
        Self {
            kind,
            records,
            fail_fetch: false,
            fail_writes: false,
            fetches: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            watch_dir: None,
            pre_restore_seen: Mutex::new(Vec::new()),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn written(&self) -> Vec<Record> {
        self.writes.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<Record> {
        self.deletes.lock().unwrap().clone()
    }

    fn pre_restore_seen(&self) -> Vec<usize> {
        self.pre_restore_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<SourceFetch, CoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(CoreError::Provider {
                provider: self.kind.to_string(),
                message: "connection refused".into(),
            });
        }
        Ok(SourceFetch {
            kind: self.kind,
            payload: self
                .records
                .iter()
                .map(|r| serde_json::to_value(r).unwrap())
                .collect(),
            records: self.records.clone(),
            quarantined: 0,
        })
    }

    async fn update_or_create(&self, record: &Record) -> Result<Upsert, CoreError> {
        if let Some(dir) = &self.watch_dir {
            let seen = files_with_label(dir, "pre-restore").len();
            self.pre_restore_seen.lock().unwrap().push(seen);
        }
        self.writes.lock().unwrap().push(record.clone());
        if self.fail_writes {
            return Err(CoreError::Provider {
                provider: self.kind.to_string(),
                message: "HTTP 500".into(),
            });
        }
        Ok(Upsert::Created)
    }

    async fn delete(&self, record: &Record) -> Result<bool, CoreError> {
        self.deletes.lock().unwrap().push(record.clone());
        if self.fail_writes {
            return Err(CoreError::Provider {
                provider: self.kind.to_string(),
                message: "HTTP 500".into(),
            });
        }
        Ok(self.records.iter().any(|r| r.key() == record.key()))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn engine(dir: &Path, providers: &[&Arc<FakeProvider>]) -> Engine {
    Engine::with_providers(
        EngineConfig::new("example.com", dir),
        providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn Provider>),
    )
}

fn a(value: &str, source: &str) -> Record {
    Record::new("A", "example.com", value, source)
}

fn zone() -> Vec<Record> {
    vec![
        a("192.0.2.1", "cloudflare").with_ttl(300),
        Record::new("MX", "example.com", "mail.example.com", "cloudflare").with_priority(Some(10)),
        Record::new("NS", "example.com", "ns1.example.net", "cloudflare"),
    ]
}

fn files_with_label(dir: &Path, label: &str) -> Vec<PathBuf> {
    let prefix = format!("dns_backup_{label}_");
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect()
}

fn tamper(path: &Path) {
    let mut doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    doc["unified_records"][0]["value"] = serde_json::json!("203.0.113.66");
    std::fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

// ── Backup ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unified_backup_merges_sources_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let public = FakeProvider::new(
        SourceKind::Public,
        vec![a("192.0.2.1", "public").with_ttl(60), a("192.0.2.2", "public")],
    );
    let engine = engine(dir.path(), &[&cloudflare, &public]);

    let outcome = engine.backup(BackupTarget::Unified).await.unwrap();

    assert_eq!(outcome.snapshot.total_records, 4);
    let first = &outcome.snapshot.unified_records[0];
    assert_eq!(first.source, "cloudflare");
    assert_eq!(first.ttl, 300);
    assert!(outcome.path.exists());
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].source, SourceKind::Canspace);

    let report = engine.verify("latest").unwrap();
    assert!(report.intact);
    assert_eq!(report.total_records, 4);
}

#[tokio::test]
async fn test_unified_backup_skips_failing_source() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::failing_fetch(SourceKind::Cloudflare);
    let public = FakeProvider::new(SourceKind::Public, vec![a("192.0.2.2", "public")]);
    let engine = engine(dir.path(), &[&cloudflare, &public]);

    let outcome = engine.backup(BackupTarget::Unified).await.unwrap();

    let skipped: Vec<SourceKind> = outcome.skipped.iter().map(|s| s.source).collect();
    assert_eq!(skipped, vec![SourceKind::Cloudflare, SourceKind::Canspace]);
    assert_eq!(outcome.snapshot.sources.keys().collect::<Vec<_>>(), vec!["public"]);
    assert_eq!(outcome.snapshot.total_records, 1);
}

#[tokio::test]
async fn test_single_source_backup_fails_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::failing_fetch(SourceKind::Cloudflare);
    let engine = engine(dir.path(), &[&cloudflare]);

    let err = engine
        .backup(BackupTarget::Source(SourceKind::Cloudflare))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Provider { .. }));

    let err = engine
        .backup(BackupTarget::Source(SourceKind::Canspace))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::MissingCredentials { .. }));
    assert!(files_with_label(dir.path(), "cloudflare").is_empty());
}

#[tokio::test]
async fn test_single_source_backup_is_labelled() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);

    let outcome = engine
        .backup(BackupTarget::Source(SourceKind::Cloudflare))
        .await
        .unwrap();

    assert_eq!(outcome.snapshot.label, "cloudflare");
    assert_eq!(files_with_label(dir.path(), "cloudflare"), vec![outcome.path]);
    assert!(engine.verify("latest_cloudflare").unwrap().intact);
}

// ── Verify and compare ──────────────────────────────────────────────

#[tokio::test]
async fn test_verify_reports_tampering() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);
    let outcome = engine.backup(BackupTarget::Unified).await.unwrap();

    tamper(&outcome.path);

    let report = engine.verify(outcome.path.to_str().unwrap()).unwrap();
    assert!(!report.intact);
    assert_eq!(report.stored, outcome.snapshot.checksum);
    assert_ne!(report.computed, report.stored);
}

#[tokio::test]
async fn test_compare_reports_added_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let before = FakeProvider::new(
        SourceKind::Cloudflare,
        vec![a("1.1.1.1", "cloudflare"), a("2.2.2.2", "cloudflare")],
    );
    let after = FakeProvider::new(
        SourceKind::Cloudflare,
        vec![a("2.2.2.2", "cloudflare"), a("3.3.3.3", "cloudflare")],
    );
    let first = engine(dir.path(), &[&before])
        .backup(BackupTarget::Unified)
        .await
        .unwrap();
    let second_engine = engine(dir.path(), &[&after]);
    let second = second_engine.backup(BackupTarget::Unified).await.unwrap();

    let comparison = second_engine
        .compare(first.path.to_str().unwrap(), second.path.to_str().unwrap())
        .unwrap();

    assert_eq!(
        comparison.diff.added.iter().collect::<Vec<_>>(),
        vec!["A:example.com:3.3.3.3"]
    );
    assert_eq!(
        comparison.diff.removed.iter().collect::<Vec<_>>(),
        vec!["A:example.com:1.1.1.1"]
    );
    assert_eq!(comparison.diff.unchanged.len(), 1);
    assert_eq!(comparison.diff.total_changes, 2);
}

#[tokio::test]
async fn test_compare_refuses_tampered_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);
    let first = engine.backup(BackupTarget::Unified).await.unwrap();
    let second = engine.backup(BackupTarget::Unified).await.unwrap();
    tamper(&second.path);

    let err = engine
        .compare(first.path.to_str().unwrap(), second.path.to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, CoreError::Integrity { .. }));
}

// ── Restore ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_restore_refuses_tampered_snapshot_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);
    let outcome = engine.backup(BackupTarget::Unified).await.unwrap();
    tamper(&outcome.path);
    let fetches = cloudflare.fetch_count();

    let err = engine
        .restore(outcome.path.to_str().unwrap(), None, RestoreMode::Live)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Integrity { .. }));
    assert_eq!(cloudflare.fetch_count(), fetches);
    assert!(cloudflare.written().is_empty());
    assert!(files_with_label(dir.path(), "pre-restore").is_empty());
}

#[tokio::test]
async fn test_dry_run_restore_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);
    engine.backup(BackupTarget::Unified).await.unwrap();
    let fetches = cloudflare.fetch_count();

    let report = engine
        .restore("latest", None, RestoreMode::default())
        .await
        .unwrap();

    assert_eq!(report.mode, RestoreMode::DryRun);
    assert_eq!(report.destination, SourceKind::Cloudflare);
    assert_eq!(report.outcomes.len(), 3);
    assert!(report.outcomes.iter().all(|o| o.status == ApplyStatus::Planned));
    assert!(report.pre_restore.is_none());
    assert_eq!(cloudflare.fetch_count(), fetches);
    assert!(cloudflare.written().is_empty());
}

#[tokio::test]
async fn test_live_restore_snapshots_current_state_first() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::watching(SourceKind::Cloudflare, zone(), dir.path());
    let engine = engine(dir.path(), &[&cloudflare]);
    engine.backup(BackupTarget::Unified).await.unwrap();

    let report = engine
        .restore("latest", None, RestoreMode::Live)
        .await
        .unwrap();

    let pre_restore = report.pre_restore.clone().unwrap();
    assert_eq!(files_with_label(dir.path(), "pre-restore"), vec![pre_restore]);
    assert_eq!(report.applied(), 3);
    assert_eq!(report.failures(), 0);
    assert_eq!(cloudflare.written().len(), 3);
    // The pre-restore file was already on disk at the very first write.
    assert_eq!(cloudflare.pre_restore_seen(), vec![1, 1, 1]);
}

#[tokio::test]
async fn test_live_restore_aborts_when_destination_cannot_be_read() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = engine(dir.path(), &[&FakeProvider::new(SourceKind::Cloudflare, zone())])
        .backup(BackupTarget::Unified)
        .await
        .unwrap();

    let unreachable = FakeProvider::failing_fetch(SourceKind::Cloudflare);
    let public = FakeProvider::new(SourceKind::Public, vec![a("192.0.2.1", "public")]);
    let engine = engine(dir.path(), &[&unreachable, &public]);

    let err = engine
        .restore(
            snapshot.path.to_str().unwrap(),
            Some(SourceKind::Cloudflare),
            RestoreMode::Live,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Provider { provider, .. } if provider == "cloudflare"));
    assert!(unreachable.written().is_empty());
    assert!(files_with_label(dir.path(), "pre-restore").is_empty());
}

#[tokio::test]
async fn test_live_restore_skips_other_unreadable_sources() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let public = FakeProvider::failing_fetch(SourceKind::Public);
    let engine = engine(dir.path(), &[&cloudflare, &public]);
    let snapshot = engine
        .backup(BackupTarget::Source(SourceKind::Cloudflare))
        .await
        .unwrap();

    let report = engine
        .restore(snapshot.path.to_str().unwrap(), None, RestoreMode::Live)
        .await
        .unwrap();

    assert!(report.pre_restore.is_some());
    assert_eq!(cloudflare.written().len(), 3);
}

#[tokio::test]
async fn test_live_restore_keeps_going_when_every_record_fails() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeProvider::new(SourceKind::Cloudflare, zone());
    let snapshot = engine(dir.path(), &[&source])
        .backup(BackupTarget::Unified)
        .await
        .unwrap();

    let broken = FakeProvider::failing_writes(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&broken]);
    let report = engine
        .restore(snapshot.path.to_str().unwrap(), None, RestoreMode::Live)
        .await
        .unwrap();

    assert_eq!(report.failures(), 3);
    assert_eq!(broken.written().len(), 3);
    assert_eq!(files_with_label(dir.path(), "pre-restore").len(), 1);
}

#[tokio::test]
async fn test_live_restore_without_destination_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let public = FakeProvider::new(SourceKind::Public, vec![a("192.0.2.2", "public")]);
    let engine = engine(dir.path(), &[&public]);
    engine.backup(BackupTarget::Unified).await.unwrap();

    let err = engine
        .restore("latest", None, RestoreMode::Live)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::MissingCredentials { provider } if provider == "cloudflare"));
    assert!(files_with_label(dir.path(), "pre-restore").is_empty());
}

#[tokio::test]
async fn test_restore_to_public_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);
    engine.backup(BackupTarget::Unified).await.unwrap();

    let err = engine
        .restore("latest", Some(SourceKind::Public), RestoreMode::DryRun)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unsupported { .. }));
}

#[tokio::test]
async fn test_restore_defaults_to_the_snapshot_provider() {
    let dir = tempfile::tempdir().unwrap();
    let canspace = FakeProvider::new(SourceKind::Canspace, zone());
    let engine = engine(dir.path(), &[&canspace]);
    engine
        .backup(BackupTarget::Source(SourceKind::Canspace))
        .await
        .unwrap();

    let report = engine
        .restore("latest_canspace", None, RestoreMode::DryRun)
        .await
        .unwrap();
    assert_eq!(report.destination, SourceKind::Canspace);
}

// ── Sync and drift ──────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_copies_everything_but_ns_and_soa() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let canspace = FakeProvider::new(SourceKind::Canspace, Vec::new());
    let engine = engine(dir.path(), &[&cloudflare, &canspace]);

    let report = engine.sync(None, None, false).await.unwrap();

    assert_eq!(report.from, SourceKind::Cloudflare);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].provider, SourceKind::Canspace);
    assert_eq!(canspace.written().len(), 2);
    assert!(cloudflare.written().is_empty());
}

#[tokio::test]
async fn test_sync_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let canspace = FakeProvider::new(SourceKind::Canspace, Vec::new());
    let engine = engine(dir.path(), &[&cloudflare, &canspace]);

    let report = engine
        .sync(Some(SourceKind::Cloudflare), Some(SourceKind::Canspace), true)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.targets[0].outcomes.len(), 2);
    assert!(canspace.written().is_empty());
}

#[tokio::test]
async fn test_sync_onto_itself_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);

    let err = engine
        .sync(Some(SourceKind::Cloudflare), Some(SourceKind::Cloudflare), true)
        .await
        .unwrap_err();
    assert!(err.is_config());

    let err = engine.sync(None, None, true).await.unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn test_drift_needs_two_providers() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let public = FakeProvider::new(SourceKind::Public, Vec::new());
    let engine = engine(dir.path(), &[&cloudflare, &public]);

    assert!(engine.drift().await.unwrap_err().is_config());
}

#[tokio::test]
async fn test_drift_classifies_entries() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let canspace = FakeProvider::new(
        SourceKind::Canspace,
        vec![a("192.0.2.99", "canspace")],
    );
    let engine = engine(dir.path(), &[&cloudflare, &canspace]);

    let report = engine.drift().await.unwrap();

    assert_eq!(report.providers, vec![SourceKind::Cloudflare, SourceKind::Canspace]);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.differences(), 2);
}

// ── Bulk updates ────────────────────────────────────────────────────

fn updates() -> Vec<BulkUpdate> {
    vec![
        BulkUpdate::create("A", "@", "76.76.21.21"),
        BulkUpdate::create("CNAME", "www", "cname.vercel-dns.com"),
        BulkUpdate::delete("A", "@", "192.0.2.1"),
        BulkUpdate::delete("TXT", "@", "never-existed"),
    ]
}

#[tokio::test]
async fn test_bulk_applies_to_every_writable_provider() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let canspace = FakeProvider::new(SourceKind::Canspace, zone());
    let public = FakeProvider::new(SourceKind::Public, zone());
    let engine = engine(dir.path(), &[&cloudflare, &canspace, &public]);

    let report = engine.bulk(&updates(), None, false).await.unwrap();

    let providers: Vec<SourceKind> = report.targets.iter().map(|t| t.provider).collect();
    assert_eq!(providers, [SourceKind::Cloudflare, SourceKind::Canspace]);
    assert_eq!(report.updates, 4);
    assert_eq!(report.failures(), 0);

    for fake in [&cloudflare, &canspace] {
        let written: Vec<String> = fake.written().iter().map(|r| r.name.clone()).collect();
        assert_eq!(written, ["example.com", "www.example.com"]);
        assert_eq!(fake.deleted().len(), 2);
    }
    assert!(public.written().is_empty());

    let statuses: Vec<(BulkAction, ApplyStatus)> = report.targets[0]
        .outcomes
        .iter()
        .map(|o| (o.action, o.outcome.status.clone()))
        .collect();
    assert_eq!(
        statuses,
        [
            (BulkAction::Create, ApplyStatus::Created),
            (BulkAction::Create, ApplyStatus::Created),
            (BulkAction::Delete, ApplyStatus::Deleted),
            (BulkAction::Delete, ApplyStatus::Absent),
        ]
    );
    assert_eq!(report.applied(), 6);
}

#[tokio::test]
async fn test_bulk_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);

    let report = engine
        .bulk(&updates(), Some(SourceKind::Cloudflare), true)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.attempted(), 4);
    assert!(report.targets[0]
        .outcomes
        .iter()
        .all(|o| o.outcome.status == ApplyStatus::Planned));
    assert!(cloudflare.written().is_empty());
    assert!(cloudflare.deleted().is_empty());
}

#[tokio::test]
async fn test_bulk_rejects_a_bad_entry_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let cloudflare = FakeProvider::new(SourceKind::Cloudflare, zone());
    let engine = engine(dir.path(), &[&cloudflare]);
    let mut entries = updates();
    entries.push(BulkUpdate::create("A", "api", ""));

    let err = engine.bulk(&entries, None, false).await.unwrap_err();

    assert!(matches!(err, CoreError::Config { .. }));
    assert!(cloudflare.written().is_empty());
    assert!(cloudflare.deleted().is_empty());
}

#[tokio::test]
async fn test_bulk_keeps_going_after_failures() {
    let dir = tempfile::tempdir().unwrap();
    let broken = FakeProvider::failing_writes(SourceKind::Canspace, zone());
    let engine = engine(dir.path(), &[&broken]);

    let report = engine.bulk(&updates(), None, false).await.unwrap();

    assert_eq!(report.failures(), 4);
    assert_eq!(broken.written().len(), 2);
    assert_eq!(broken.deleted().len(), 2);
}

#[tokio::test]
async fn test_bulk_to_public_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let public = FakeProvider::new(SourceKind::Public, Vec::new());
    let engine = engine(dir.path(), &[&public]);

    let err = engine
        .bulk(&updates(), Some(SourceKind::Public), false)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unsupported { .. }));

    let err = engine.bulk(&updates(), None, false).await.unwrap_err();
    assert!(matches!(err, CoreError::Config { .. }));
}

// ── Propagation ─────────────────────────────────────────────────────

/// Every resolver but the last answers with `value`.
struct Lagging {
    value: &'static str,
    lagging: IpAddr,
    asked: Mutex<Vec<(IpAddr, String, String)>>,
}

#[async_trait]
impl Resolve for Lagging {
    async fn resolve(
        &self,
        server: IpAddr,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<LookupAnswer>, CoreError> {
        self.asked
            .lock()
            .unwrap()
            .push((server, name.to_owned(), record_type.to_owned()));
        let value = if server == self.lagging { "192.0.2.1" } else { self.value };
        Ok(vec![LookupAnswer {
            record_type: record_type.to_owned(),
            name: format!("{name}."),
            value: value.to_owned(),
            ttl: 60,
        }])
    }
}

#[tokio::test]
async fn test_propagation_asks_each_configured_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let servers: Vec<IpAddr> = ["198.51.100.1", "198.51.100.2", "198.51.100.3"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    let mut config = EngineConfig::new("example.com", dir.path());
    config.resolvers = servers.clone();
    let resolve = Arc::new(Lagging {
        value: "76.76.21.21",
        lagging: servers[2],
        asked: Mutex::new(Vec::new()),
    });
    let engine = Engine::with_providers(config, Vec::<Arc<dyn Provider>>::new())
        .with_resolve(Arc::clone(&resolve) as Arc<dyn Resolve>);

    let report = engine
        .propagation("a", Some("www"), Some("76.76.21.21"))
        .await
        .unwrap();

    let asked = resolve.asked.lock().unwrap().clone();
    assert_eq!(asked.len(), 3);
    assert!(asked.iter().all(|(_, name, rtype)| name == "www.example.com" && rtype == "A"));
    assert_eq!(report.name, "www.example.com");
    assert_eq!(report.propagated(), 2);
    assert_eq!(report.total(), 3);
    assert!(!report.resolvers[2].matches);
}

#[tokio::test]
async fn test_propagation_requires_a_record_type() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), &[]);
    let err = engine.propagation(" ", None, None).await.unwrap_err();
    assert!(matches!(err, CoreError::Config { .. }));
}
