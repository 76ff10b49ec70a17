// ── Snapshot storage ──
//
// Snapshots are immutable JSON files named
// `<prefix>_<label>_<YYYYMMDD_HHMMSS>.json`. `latest_<label>.json` points
// at the newest file for each label (a symlink on unix, a copy elsewhere).
// Age is taken from the embedded timestamp, falling back to mtime.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::checksum;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::{Snapshot, SnapshotDocument, UNIFIED_LABEL};

/// One stored snapshot, as shown by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub taken_at: DateTime<Utc>,
    pub label: String,
    pub domain: String,
    pub records: usize,
    pub checksum: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub kept: usize,
}

pub struct SnapshotStore {
    dir: PathBuf,
    archive_dir: PathBuf,
    prefix: String,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            archive_dir: archive_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.backup_dir, &config.archive_dir, &config.file_prefix)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn latest_path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("latest_{}.json", file_label(label)))
    }

    /// Turn a user-supplied snapshot reference into a path.
    ///
    /// Existing paths are used as given. `latest` and `latest_<label>` name
    /// the aliases; any other bare name is looked up in the backup dir.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        let given = PathBuf::from(reference);
        if given.exists() {
            return given;
        }
        match reference {
            "latest" => self.latest_path(UNIFIED_LABEL),
            other if other.starts_with("latest_") && !other.ends_with(".json") => {
                self.dir.join(format!("{other}.json"))
            }
            _ => self.dir.join(reference),
        }
    }

    // ── Writing ──────────────────────────────────────────────────────

    /// Write `snapshot` to a new file and point its latest alias at it.
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, CoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::io(&self.dir, e))?;

        let mut body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CoreError::Internal(format!("snapshot serialization failed: {e}")))?;
        body.push(b'\n');

        let stamp = snapshot
            .taken_at()
            .unwrap_or_else(Utc::now)
            .format("%Y%m%d_%H%M%S")
            .to_string();
        let stem = format!("{}_{}_{stamp}", self.prefix, file_label(&snapshot.label));

        let path = self.write_new(&stem, &body)?;
        info!(path = %path.display(), records = snapshot.total_records, "saved snapshot");

        self.point_latest(&snapshot.label, &path)?;
        Ok(path)
    }

    /// Create `<stem>.json`, or `<stem>_<n>.json` if that name is taken.
    fn write_new(&self, stem: &str, body: &[u8]) -> Result<PathBuf, CoreError> {
        for attempt in 0..100_u32 {
            let name = if attempt == 0 {
                format!("{stem}.json")
            } else {
                format!("{stem}_{attempt}.json")
            };
            let path = self.dir.join(name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(body).map_err(|e| CoreError::io(&path, e))?;
                    file.sync_all().map_err(|e| CoreError::io(&path, e))?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(CoreError::io(&path, e)),
            }
        }
        Err(CoreError::Internal(format!("no free snapshot file name for {stem}")))
    }

    fn point_latest(&self, label: &str, target: &Path) -> Result<(), CoreError> {
        let alias = self.latest_path(label);
        if alias.symlink_metadata().is_ok() {
            fs::remove_file(&alias).map_err(|e| CoreError::io(&alias, e))?;
        }

        #[cfg(unix)]
        {
            let relative = target.file_name().map_or_else(|| target.to_path_buf(), PathBuf::from);
            std::os::unix::fs::symlink(relative, &alias).map_err(|e| CoreError::io(&alias, e))?;
        }
        #[cfg(not(unix))]
        {
            fs::copy(target, &alias).map_err(|e| CoreError::io(&alias, e))?;
        }

        debug!(alias = %alias.display(), target = %target.display(), "updated latest alias");
        Ok(())
    }

    // ── Reading ──────────────────────────────────────────────────────

    /// Snapshots taken within the last `days` days, newest first.
    pub fn list(&self, days: u32) -> Result<Vec<SnapshotInfo>, CoreError> {
        self.list_since(Utc::now() - Duration::days(i64::from(days)))
    }

    pub fn list_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SnapshotInfo>, CoreError> {
        let mut infos: Vec<SnapshotInfo> = self
            .scan()?
            .into_iter()
            .map(|(info, _)| info)
            .filter(|info| info.taken_at >= cutoff)
            .collect();
        infos.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then_with(|| b.file_name.cmp(&a.file_name)));
        Ok(infos)
    }

    /// Every readable snapshot file in the backup dir. Unreadable files are skipped.
    fn scan(&self) -> Result<Vec<(SnapshotInfo, SnapshotDocument)>, CoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CoreError::io(&self.dir, e)),
        };

        let wanted_prefix = format!("{}_", self.prefix);
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::io(&self.dir, e))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.starts_with(&wanted_prefix) || !file_name.ends_with(".json") {
                continue;
            }
            let path = entry.path();
            let Ok(meta) = fs::symlink_metadata(&path) else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }

            let doc = match SnapshotDocument::load(&path) {
                Ok(doc) => doc,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable snapshot");
                    continue;
                }
            };

            let taken_at = doc
                .taken_at()
                .or_else(|| meta.modified().ok().map(DateTime::<Utc>::from))
                .unwrap_or_default();

            let info = SnapshotInfo {
                file_name,
                path,
                size: meta.len(),
                taken_at,
                label: doc.label().to_owned(),
                domain: doc.domain().to_owned(),
                records: doc.total_records(),
                checksum: doc.stored_checksum().to_owned(),
            };
            found.push((info, doc));
        }
        Ok(found)
    }

    // ── Retention ────────────────────────────────────────────────────

    /// Move snapshots older than `days` days into the archive dir.
    pub fn archive(&self, days: u32) -> Result<Vec<PathBuf>, CoreError> {
        self.archive_before(Utc::now() - Duration::days(i64::from(days)))
    }

    pub fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<PathBuf>, CoreError> {
        let stale: Vec<SnapshotInfo> = self
            .scan()?
            .into_iter()
            .map(|(info, _)| info)
            .filter(|info| info.taken_at < cutoff)
            .collect();
        if stale.is_empty() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(&self.archive_dir).map_err(|e| CoreError::io(&self.archive_dir, e))?;

        let mut moved = Vec::with_capacity(stale.len());
        let mut labels = BTreeSet::new();
        for info in stale {
            let destination = self.archive_dir.join(&info.file_name);
            move_file(&info.path, &destination)?;
            debug!(from = %info.path.display(), to = %destination.display(), "archived snapshot");
            labels.insert(info.label);
            moved.push(destination);
        }

        info!(count = moved.len(), "archived old snapshots");
        self.repoint_latest(&labels)?;
        Ok(moved)
    }

    /// Delete snapshots whose content duplicates an older one.
    ///
    /// Content is the domain, label and record set; the timestamp and the
    /// stored checksum (which covers the timestamp) are ignored. The copy
    /// kept from each group is the oldest one that still verifies; a group
    /// with no intact copy is left alone.
    pub fn cleanup(&self) -> Result<CleanupReport, CoreError> {
        let mut snapshots = self.scan()?;
        snapshots.sort_by(|a, b| {
            a.0.taken_at
                .cmp(&b.0.taken_at)
                .then_with(|| a.0.file_name.cmp(&b.0.file_name))
        });

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<(SnapshotInfo, bool)>> = Vec::new();
        for (info, doc) in snapshots {
            let intact = doc.verify().is_intact();
            let slot = *index.entry(content_digest(&doc)).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push((info, intact));
        }

        let mut report = CleanupReport::default();
        let mut labels = BTreeSet::new();
        for group in groups {
            let Some(keeper) = group.iter().position(|(_, intact)| *intact) else {
                if group.len() > 1 {
                    warn!(
                        copies = group.len(),
                        file = %group[0].0.file_name,
                        "no intact copy among duplicates, keeping all"
                    );
                }
                report.kept += group.len();
                continue;
            };
            report.kept += 1;
            for (i, (info, _)) in group.into_iter().enumerate() {
                if i == keeper {
                    continue;
                }
                fs::remove_file(&info.path).map_err(|e| CoreError::io(&info.path, e))?;
                debug!(path = %info.path.display(), "removed duplicate snapshot");
                labels.insert(info.label);
                report.removed.push(info.path);
            }
        }

        if !report.removed.is_empty() {
            info!(count = report.removed.len(), "removed duplicate snapshots");
            self.repoint_latest(&labels)?;
        }
        Ok(report)
    }

    /// Re-aim aliases for `labels` whose target no longer exists.
    fn repoint_latest(&self, labels: &BTreeSet<String>) -> Result<(), CoreError> {
        if labels.is_empty() {
            return Ok(());
        }
        let remaining = self.list_since(DateTime::<Utc>::MIN_UTC)?;

        for label in labels {
            let alias = self.latest_path(label);
            let dangling = alias.symlink_metadata().is_ok() && fs::metadata(&alias).is_err();
            if !dangling {
                continue;
            }
            match remaining.iter().find(|info| &info.label == label) {
                Some(newest) => self.point_latest(label, &newest.path)?,
                None => {
                    warn!(alias = %alias.display(), "no snapshots left for alias, removing it");
                    fs::remove_file(&alias).map_err(|e| CoreError::io(&alias, e))?;
                }
            }
        }
        Ok(())
    }
}

fn content_digest(doc: &SnapshotDocument) -> String {
    let records = doc
        .raw
        .get("unified_records")
        .or_else(|| doc.raw.get("records"))
        .cloned()
        .unwrap_or(Value::Null);
    checksum::checksum(&json!({
        "domain": doc.domain(),
        "label": doc.label(),
        "records": records,
    }))
}

fn move_file(from: &Path, to: &Path) -> Result<(), CoreError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Cross-device: copy then remove.
    fs::copy(from, to).map_err(|e| CoreError::io(to, e))?;
    fs::remove_file(from).map_err(|e| CoreError::io(from, e))
}

/// Labels end up in file names; keep them to a safe alphabet.
fn file_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Record;

    fn store(dir: &Path) -> SnapshotStore {
        SnapshotStore::new(dir, dir.join("archive"), "dns_backup")
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn snapshot(label: &str, taken_at: DateTime<Utc>, values: &[&str]) -> Snapshot {
        let records = values
            .iter()
            .map(|v| Record::new("A", "example.com", *v, "cloudflare"))
            .collect();
        Snapshot::new("example.com", label, taken_at, BTreeMap::new(), records).unwrap()
    }

    #[test]
    fn save_names_file_and_points_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let path = store
            .save(&snapshot("unified", at("2026-10-16T08:05:09Z"), &["1.1.1.1"]))
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "dns_backup_unified_20261016_080509.json"
        );
        let latest = store.latest_path("unified");
        assert_eq!(fs::read(&latest).unwrap(), fs::read(&path).unwrap());
        assert_eq!(store.resolve("latest"), latest);
    }

    #[test]
    fn same_second_saves_do_not_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let ts = at("2026-10-16T08:05:09Z");

        let first = store.save(&snapshot("unified", ts, &["1.1.1.1"])).unwrap();
        let second = store.save(&snapshot("unified", ts, &["2.2.2.2"])).unwrap();

        assert_ne!(first, second);
        assert!(second.to_str().unwrap().ends_with("_080509_1.json"));
        assert!(first.exists());
    }

    #[test]
    fn saved_snapshot_verifies() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let path = store
            .save(&snapshot("cloudflare", Utc::now(), &["1.1.1.1"]))
            .unwrap();
        assert!(SnapshotDocument::load(path).unwrap().verify().is_intact());
    }

    #[test]
    fn list_filters_by_embedded_age() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let now = Utc::now();

        store.save(&snapshot("unified", now - Duration::days(45), &["1.1.1.1"])).unwrap();
        store.save(&snapshot("unified", now - Duration::days(2), &["2.2.2.2"])).unwrap();
        store.save(&snapshot("public", now - Duration::hours(1), &["3.3.3.3"])).unwrap();
        fs::write(tmp.path().join("dns_backup_broken.json"), "{").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let recent = store.list(30).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].label, "public");
        assert_eq!(recent[1].label, "unified");
        assert_eq!(recent[1].records, 1);

        assert_eq!(store.list(60).unwrap().len(), 3);
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp.path().join("does-not-exist"));
        assert!(store.list(30).unwrap().is_empty());
    }

    #[test]
    fn archive_moves_old_files_and_repoints_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let now = Utc::now();

        let kept = store.save(&snapshot("unified", now - Duration::days(1), &["1.1.1.1"])).unwrap();
        let old = store.save(&snapshot("unified", now - Duration::days(90), &["2.2.2.2"])).unwrap();
        // The old save happened last, so the alias points at it.
        assert_eq!(fs::read(store.latest_path("unified")).unwrap(), fs::read(&old).unwrap());

        let moved = store.archive(30).unwrap();

        assert_eq!(moved.len(), 1);
        assert!(!old.exists());
        assert!(moved[0].starts_with(store.archive_dir()));
        assert!(moved[0].exists());
        assert!(kept.exists());
        assert_eq!(fs::read(store.latest_path("unified")).unwrap(), fs::read(&kept).unwrap());
    }

    #[test]
    fn cleanup_keeps_oldest_of_identical_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let first = store.save(&snapshot("unified", at("2026-10-01T00:00:00Z"), &["1.1.1.1"])).unwrap();
        let dup = store.save(&snapshot("unified", at("2026-10-02T00:00:00Z"), &["1.1.1.1"])).unwrap();
        let changed = store.save(&snapshot("unified", at("2026-10-03T00:00:00Z"), &["2.2.2.2"])).unwrap();
        let other_label = store.save(&snapshot("public", at("2026-10-04T00:00:00Z"), &["1.1.1.1"])).unwrap();

        let report = store.cleanup().unwrap();

        assert_eq!(report.removed, vec![dup.clone()]);
        assert_eq!(report.kept, 3);
        assert!(first.exists());
        assert!(!dup.exists());
        assert!(changed.exists());
        assert!(other_label.exists());
    }

    #[test]
    fn cleanup_never_keeps_a_corrupted_copy_over_an_intact_one() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let older = store.save(&snapshot("unified", at("2026-10-01T00:00:00Z"), &["1.1.1.1"])).unwrap();
        let newer = store.save(&snapshot("unified", at("2026-10-02T00:00:00Z"), &["1.1.1.1"])).unwrap();
        let mut doc: Value = serde_json::from_str(&fs::read_to_string(&older).unwrap()).unwrap();
        doc["checksum"] = json!("deadbeef");
        fs::write(&older, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let report = store.cleanup().unwrap();

        assert_eq!(report.removed, vec![older.clone()]);
        assert_eq!(report.kept, 1);
        assert!(!older.exists());
        assert!(SnapshotDocument::load(&newer).unwrap().verify().is_intact());
    }

    #[test]
    fn cleanup_leaves_duplicates_alone_when_none_verify() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let paths: Vec<PathBuf> = ["2026-10-01T00:00:00Z", "2026-10-02T00:00:00Z"]
            .iter()
            .map(|ts| store.save(&snapshot("unified", at(ts), &["1.1.1.1"])).unwrap())
            .collect();
        for path in &paths {
            let mut doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
            doc["checksum"] = json!("deadbeef");
            fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        }

        let report = store.cleanup().unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(report.kept, 2);
        assert!(paths.iter().all(|p| p.exists()));
    }

    #[test]
    fn cleanup_repoints_alias_of_removed_duplicate() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let first = store.save(&snapshot("canspace", at("2026-10-01T00:00:00Z"), &["1.1.1.1"])).unwrap();
        store.save(&snapshot("canspace", at("2026-10-02T00:00:00Z"), &["1.1.1.1"])).unwrap();

        store.cleanup().unwrap();

        assert_eq!(fs::read(store.latest_path("canspace")).unwrap(), fs::read(&first).unwrap());
    }
}
