// ── Snapshot checksums ──
//
// SHA-256 over a canonical JSON rendering: object keys sorted at every
// level, `", "` and `": "` separators, non-ASCII escaped as `\uXXXX`.
// Existing snapshot files were hashed over exactly this form, so any
// change here breaks their verification.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Field holding the stored digest; always excluded from the computation.
pub const CHECKSUM_FIELD: &str = "checksum";

/// Render `value` canonically.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Lowercase hex SHA-256 of the canonical rendering of `value`, ignoring a
/// top-level `checksum` field if present.
pub fn checksum(value: &Value) -> String {
    let digest = match value {
        Value::Object(map) if map.contains_key(CHECKSUM_FIELD) => {
            let mut without = map.clone();
            without.remove(CHECKSUM_FIELD);
            Sha256::digest(canonical_json(&Value::Object(without)).as_bytes())
        }
        other => Sha256::digest(canonical_json(other).as_bytes()),
    };
    hex::encode(digest)
}

/// Checksum of any serializable value.
pub fn checksum_of<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    Ok(checksum(&serde_json::to_value(data)?))
}

/// Result of recomputing a document's checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// Empty when the document carries no checksum.
    pub stored: String,
    pub computed: String,
}

impl Verification {
    pub fn is_intact(&self) -> bool {
        !self.stored.is_empty() && self.stored == self.computed
    }
}

/// Recompute the checksum of a raw document and compare it to the stored one.
pub fn verify(document: &Value) -> Verification {
    let stored = document
        .get(CHECKSUM_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Verification {
        stored,
        computed: checksum(document),
    }
}

// ── Canonical writer ─────────────────────────────────────────────────

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(out, key);
                out.push_str(": ");
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0_u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}
