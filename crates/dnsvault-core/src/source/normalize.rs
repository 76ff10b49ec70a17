// ── Adapter-boundary normalization ──
//
// Every source maps its own wire shape onto `Record` through these helpers,
// so unify/diff/checksum only ever see one canonical form. Entries that
// cannot produce a type, name and value are quarantined here and never
// travel further.

use std::fmt;

use serde_json::Value;

use crate::model::{DEFAULT_TTL, Record};

use dnsvault_api::rdata::normalize_value;

/// Why an entry was kept out of the record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quarantine {
    pub reason: String,
}

impl Quarantine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Quarantine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Lowercase, trimmed, no trailing dot.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// A user-written owner name made absolute against `domain`.
///
/// `@` or empty is the apex, a trailing dot marks an absolute name, a name
/// already at or under the apex is kept, anything else is relative to it.
pub fn qualify_name(name: &str, domain: &str) -> String {
    let domain = normalize_name(domain);
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "@" {
        return domain;
    }
    if trimmed.ends_with('.') {
        return normalize_name(trimmed);
    }
    let name = normalize_name(trimmed);
    if name == domain || name.ends_with(&format!(".{domain}")) {
        name
    } else {
        format!("{name}.{domain}")
    }
}

/// Split a leading numeric field off presentation text: `"10 mail.example.com."`
/// gives `(Some(10), "mail.example.com.")`.
pub fn split_priority(value: &str) -> (Option<u16>, &str) {
    let trimmed = value.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => match first.parse::<u16>() {
            Ok(priority) => (Some(priority), rest.trim_start()),
            Err(_) => (None, trimmed),
        },
        None => (None, trimmed),
    }
}

/// Assemble a record after each adapter has pulled out its raw fields.
pub fn build(
    record_type: &str,
    name: &str,
    value: &str,
    ttl: Option<u32>,
    priority: Option<u16>,
    source: &str,
) -> Result<Record, Quarantine> {
    let record_type = record_type.trim().to_ascii_uppercase();
    if record_type.is_empty() {
        return Err(Quarantine::new("entry has no record type"));
    }
    let name = normalize_name(name);
    if name.is_empty() {
        return Err(Quarantine::new(format!("{record_type} entry has no name")));
    }
    let value = normalize_value(&record_type, value);
    if value.is_empty() {
        return Err(Quarantine::new(format!("{record_type} {name} has no value")));
    }

    Ok(Record {
        record_type,
        name,
        value,
        ttl: ttl.unwrap_or(DEFAULT_TTL),
        priority,
        proxied: None,
        source: source.to_owned(),
    })
}

/// Parse a record already stored in a snapshot document.
///
/// Handles both `unified_records` entries and the per-provider `records`
/// lists of older single-provider documents, where the value may sit in
/// `value`, `content`, or `data`.
pub fn stored(entry: &Value, default_source: &str) -> Result<Record, Quarantine> {
    let Value::Object(map) = entry else {
        return Err(Quarantine::new("entry is not an object"));
    };

    let text = |key: &str| map.get(key).and_then(value_text);
    let record_type = text("type").unwrap_or_default();
    let name = text("name").unwrap_or_default();
    let value = ["value", "content", "data"]
        .iter()
        .find_map(|key| text(key))
        .unwrap_or_default();
    let ttl = map.get("ttl").and_then(value_u32);
    let priority = map
        .get("priority")
        .and_then(value_u32)
        .and_then(|p| u16::try_from(p).ok());
    let source = text("source").unwrap_or_else(|| default_source.to_owned());

    let mut record = build(&record_type, &name, &value, ttl, priority, &source)?;
    record.proxied = map.get("proxied").and_then(Value::as_bool);
    Ok(record)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}

fn value_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
