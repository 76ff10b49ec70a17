// ── Snapshot diff ──
//
// Set difference over `TYPE:name:value` keys. A TTL- or priority-only change
// shows up as "unchanged"; identity deliberately ignores both.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::Record;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordDiff {
    /// In `after` but not in `before`.
    pub added: BTreeSet<String>,
    /// In `before` but not in `after`.
    pub removed: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
    pub total_changes: usize,
}

impl RecordDiff {
    pub fn is_empty(&self) -> bool {
        self.total_changes == 0
    }
}

pub fn diff(before: &[Record], after: &[Record]) -> RecordDiff {
    let keys = |records: &[Record]| -> BTreeSet<String> {
        records.iter().map(|r| r.key().to_string()).collect()
    };
    let before = keys(before);
    let after = keys(after);

    let added: BTreeSet<String> = after.difference(&before).cloned().collect();
    let removed: BTreeSet<String> = before.difference(&after).cloned().collect();
    let unchanged = before.intersection(&after).cloned().collect();

    RecordDiff {
        total_changes: added.len() + removed.len(),
        added,
        removed,
        unchanged,
    }
}
