// ── Cross-provider sync and drift ──
//
// Sync copies one provider's records onto others; drift compares what the
// providers currently serve, keyed by `TYPE:name` so a changed value shows
// up as a difference instead of an add plus a remove. NS and SOA belong to
// whoever hosts the zone and are left out of both.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::Record;
use crate::restore::RecordOutcome;
use crate::source::SourceKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncTarget {
    pub provider: SourceKind,
    pub outcomes: Vec<RecordOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub from: SourceKind,
    pub dry_run: bool,
    /// Records read from the source provider.
    pub fetched: usize,
    /// NS/SOA records left alone.
    pub skipped: usize,
    pub targets: Vec<SyncTarget>,
}

impl SyncReport {
    pub fn failures(&self) -> usize {
        self.targets
            .iter()
            .flat_map(|t| &t.outcomes)
            .filter(|o| o.is_failure())
            .count()
    }
}

/// Split `records` into the ones sync copies and a count of the rest.
pub fn syncable(records: Vec<Record>) -> (Vec<Record>, usize) {
    let total = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| !r.is_zone_infrastructure())
        .collect();
    let skipped = total - kept.len();
    (kept, skipped)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "providers", rename_all = "kebab-case")]
pub enum DriftStatus {
    InSync,
    /// Absent from these providers.
    Missing(Vec<SourceKind>),
    Different,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftEntry {
    /// `TYPE:name`
    pub key: String,
    /// Values per provider; providers without the key are absent.
    pub values: BTreeMap<SourceKind, BTreeSet<String>>,
    #[serde(flatten)]
    pub status: DriftStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub providers: Vec<SourceKind>,
    pub entries: Vec<DriftEntry>,
}

impl DriftReport {
    pub fn differences(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status != DriftStatus::InSync)
            .count()
    }
}

/// Classify every `TYPE:name` key across the given provider record sets.
pub fn drift(sets: &[(SourceKind, Vec<Record>)]) -> DriftReport {
    let mut by_provider: BTreeMap<SourceKind, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();
    let mut keys = BTreeSet::new();

    for (provider, records) in sets {
        let values = by_provider.entry(*provider).or_default();
        for record in records.iter().filter(|r| !r.is_zone_infrastructure()) {
            let key = format!("{}:{}", record.record_type, record.name);
            values.entry(key.clone()).or_default().insert(record.value.clone());
            keys.insert(key);
        }
    }

    let providers: Vec<SourceKind> = by_provider.keys().copied().collect();
    let entries = keys
        .into_iter()
        .map(|key| {
            let values: BTreeMap<SourceKind, BTreeSet<String>> = by_provider
                .iter()
                .filter_map(|(provider, map)| map.get(&key).map(|v| (*provider, v.clone())))
                .collect();

            let missing: Vec<SourceKind> = providers
                .iter()
                .copied()
                .filter(|p| !values.contains_key(p))
                .collect();
            let status = if !missing.is_empty() {
                DriftStatus::Missing(missing)
            } else if values.values().collect::<BTreeSet<_>>().len() == 1 {
                DriftStatus::InSync
            } else {
                DriftStatus::Different
            };

            DriftEntry { key, values, status }
        })
        .collect();

    DriftReport { providers, entries }
}
