// ── Unification ──
//
// Merge per-source record lists into one deduplicated sequence keyed by
// `(type, name, value)`. The first occurrence of a key wins, so callers
// pass sources in `SourceKind` order.

use std::collections::HashSet;

use crate::model::Record;

pub fn unify<I>(records: I) -> Vec<Record>
where
    I: IntoIterator<Item = Record>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.key()))
        .collect()
}
