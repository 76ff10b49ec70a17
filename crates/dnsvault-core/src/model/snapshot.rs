// ── Snapshots ──
//
// `Snapshot` is what the engine writes; `SnapshotDocument` is what it reads
// back. Reading keeps the raw JSON so verification covers every field,
// including ones this version does not know about.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::Record;
use crate::checksum::{self, Verification};
use crate::error::CoreError;
use crate::source::normalize;

/// Label of a snapshot merged from every source.
pub const UNIFIED_LABEL: &str = "unified";

/// Label of the safety snapshot taken before a live restore.
pub const PRE_RESTORE_LABEL: &str = "pre-restore";

pub const BACKUP_TOOL: &str = "dnsvault";

/// Raw payload captured from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePayload {
    pub provider: String,
    /// Records exactly as the provider returned them.
    pub records: Vec<Value>,
    pub total_records: usize,
    /// Entries dropped at the adapter boundary.
    #[serde(default)]
    pub quarantined: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub backup_tool: String,
    pub version: String,
}

impl Default for SnapshotMetadata {
    fn default() -> Self {
        Self {
            backup_tool: BACKUP_TOOL.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// A checksummed point-in-time capture of a record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub domain: String,
    pub label: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub sources: BTreeMap<String, SourcePayload>,
    pub unified_records: Vec<Record>,
    pub total_records: usize,
    pub metadata: SnapshotMetadata,
    pub checksum: String,
}

impl Snapshot {
    /// Assemble a snapshot and stamp its checksum.
    pub fn new(
        domain: impl Into<String>,
        label: impl Into<String>,
        taken_at: DateTime<Utc>,
        sources: BTreeMap<String, SourcePayload>,
        unified_records: Vec<Record>,
    ) -> Result<Self, CoreError> {
        let mut snapshot = Self {
            domain: domain.into(),
            label: label.into(),
            timestamp: taken_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            sources,
            total_records: unified_records.len(),
            unified_records,
            metadata: SnapshotMetadata::default(),
            checksum: String::new(),
        };
        snapshot.checksum = snapshot.compute_checksum()?;
        Ok(snapshot)
    }

    /// Checksum over everything except the `checksum` field.
    pub fn compute_checksum(&self) -> Result<String, CoreError> {
        checksum::checksum_of(self)
            .map_err(|e| CoreError::Internal(format!("snapshot serialization failed: {e}")))
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Accepts RFC 3339 and the naive `YYYY-MM-DDTHH:MM:SS[.ffffff]` form
/// (read as UTC) that older snapshots carry.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ── Reading ──────────────────────────────────────────────────────────

/// A snapshot file as loaded from disk.
#[derive(Debug, Clone)]
pub struct SnapshotDocument {
    pub path: PathBuf,
    pub raw: Value,
}

impl SnapshotDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| CoreError::io(path, e))?;
        let raw: Value = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::snapshot(path, format!("invalid JSON: {e}")))?;
        if !raw.is_object() {
            return Err(CoreError::snapshot(path, "top level is not an object"));
        }
        Ok(Self {
            path: path.to_path_buf(),
            raw,
        })
    }

    pub fn verify(&self) -> Verification {
        checksum::verify(&self.raw)
    }

    /// Fail with `CoreError::Integrity` unless the stored checksum matches.
    pub fn ensure_intact(&self) -> Result<Verification, CoreError> {
        let verification = self.verify();
        if verification.is_intact() {
            Ok(verification)
        } else {
            Err(CoreError::Integrity {
                path: self.path.clone(),
                stored: if verification.stored.is_empty() {
                    "<none>".into()
                } else {
                    verification.stored
                },
                computed: verification.computed,
            })
        }
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    pub fn domain(&self) -> &str {
        self.text("domain").unwrap_or_default()
    }

    pub fn timestamp(&self) -> &str {
        self.text("timestamp").unwrap_or_default()
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.timestamp())
    }

    pub fn stored_checksum(&self) -> &str {
        self.text(checksum::CHECKSUM_FIELD).unwrap_or_default()
    }

    /// `label`, or `provider` for single-provider documents, else `unified`.
    pub fn label(&self) -> &str {
        self.text("label")
            .or_else(|| self.text("provider"))
            .unwrap_or(UNIFIED_LABEL)
    }

    /// The provider a legacy single-provider document came from.
    pub fn provider(&self) -> Option<&str> {
        self.text("provider")
    }

    pub fn total_records(&self) -> usize {
        self.raw
            .get("total_records")
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default()
    }

    /// The record set this snapshot describes.
    ///
    /// Uses `unified_records` when present, else the `records` list of a
    /// single-provider document. Malformed entries are logged and skipped.
    pub fn records(&self) -> Result<Vec<Record>, CoreError> {
        let (entries, default_source) = if let Some(unified) = self.raw.get("unified_records") {
            (unified, UNIFIED_LABEL)
        } else if let Some(records) = self.raw.get("records") {
            (records, self.provider().unwrap_or(UNIFIED_LABEL))
        } else {
            return Err(CoreError::snapshot(&self.path, "no unified_records or records field"));
        };

        let Value::Array(entries) = entries else {
            return Err(CoreError::snapshot(&self.path, "record list is not an array"));
        };

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match normalize::stored(entry, default_source) {
                Ok(record) => records.push(record),
                Err(reason) => warn!(path = %self.path.display(), %reason, "skipping malformed record"),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write as _;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn sample() -> Snapshot {
        let ts = DateTime::parse_from_rfc3339("2026-10-16T09:30:00Z").unwrap().with_timezone(&Utc);
        Snapshot::new(
            "example.com",
            UNIFIED_LABEL,
            ts,
            BTreeMap::new(),
            vec![Record::new("A", "example.com", "1.1.1.1", "cloudflare")],
        )
        .unwrap()
    }

    fn write_doc(value: &Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string_pretty(value).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[test]
    fn new_snapshot_verifies_after_round_trip() {
        let snapshot = sample();
        assert_eq!(snapshot.total_records, 1);
        assert_eq!(snapshot.timestamp, "2026-10-16T09:30:00.000000Z");

        let file = write_doc(&serde_json::to_value(&snapshot).unwrap());
        let doc = SnapshotDocument::load(file.path()).unwrap();
        assert!(doc.verify().is_intact());
        assert_eq!(doc.label(), "unified");
        assert_eq!(doc.records().unwrap(), snapshot.unified_records);
    }

    #[test]
    fn tampered_checksum_fails_integrity() {
        let mut raw = serde_json::to_value(sample()).unwrap();
        raw["checksum"] = json!("deadbeef");
        let file = write_doc(&raw);

        let doc = SnapshotDocument::load(file.path()).unwrap();
        let err = doc.ensure_intact().unwrap_err();
        assert!(matches!(err, CoreError::Integrity { ref stored, .. } if stored == "deadbeef"));
    }

    #[test]
    fn legacy_single_provider_document_is_readable() {
        let mut raw = json!({
            "provider": "cloudflare",
            "domain": "example.com",
            "timestamp": "2025-08-14T10:22:33.123456",
            "records": [
                {"id": "1", "type": "A", "name": "example.com", "content": "1.1.1.1", "ttl": 1},
                {"id": "2", "type": "TXT", "name": "example.com"}
            ],
            "total_records": 2
        });
        raw["checksum"] = json!(checksum::checksum(&raw));
        let file = write_doc(&raw);

        let doc = SnapshotDocument::load(file.path()).unwrap();
        assert!(doc.verify().is_intact());
        assert_eq!(doc.label(), "cloudflare");
        assert!(doc.taken_at().is_some());

        let records = doc.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "cloudflare");
        assert_eq!(records[0].ttl, 1);
    }

    #[test]
    fn non_json_is_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ truncated").unwrap();
        assert!(matches!(
            SnapshotDocument::load(file.path()),
            Err(CoreError::Snapshot { .. })
        ));
    }
}
