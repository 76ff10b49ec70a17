// cPanel UAPI wire types.
//
// `DNS/parse_zone` has shipped two shapes over the years: the current one
// (`type: "record"`, `record_type`, `dname_b64`, `data_b64[]`) and the older
// flat one (`type: "A"`, `name`, `address` / `cname` / `txtdata` / `exchange`).
// `ZoneEntry` accepts both and keeps every field for the snapshot payload.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// UAPI response envelope: `status == 1` means success.
#[derive(Debug, Deserialize)]
pub(crate) struct UapiEnvelope<T> {
    #[serde(default)]
    pub status: i64,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// What kind of line a zone entry represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A resource record of the given (upper-cased) type.
    Record(String),
    Comment,
    Control,
    /// No usable type information at all.
    Unknown,
}

/// One line of a parsed zone file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneEntry {
    #[serde(default, alias = "line_index", skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dname_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_b64: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ZoneEntry {
    pub fn kind(&self) -> EntryKind {
        if let Some(rtype) = self.record_type.as_deref().filter(|t| !t.is_empty()) {
            return EntryKind::Record(rtype.to_uppercase());
        }
        match self.entry_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("comment") => EntryKind::Comment,
            Some(t) if t.eq_ignore_ascii_case("control") => EntryKind::Control,
            Some(t) if t.eq_ignore_ascii_case("record") || t.is_empty() => EntryKind::Unknown,
            Some(t) => EntryKind::Record(t.to_uppercase()),
            None => EntryKind::Unknown,
        }
    }

    /// The owner name as written in the zone (may be relative, `@`, or end in a dot).
    pub fn owner(&self) -> Option<String> {
        if let Some(encoded) = &self.dname_b64 {
            if let Some(decoded) = decode(encoded) {
                return Some(decoded);
            }
        }
        self.name.clone().filter(|n| !n.is_empty())
    }

    /// The record data fields, decoded. Multi-part TXT data is concatenated.
    pub fn data(&self) -> Vec<String> {
        if let Some(parts) = &self.data_b64 {
            let decoded: Vec<String> = parts.iter().filter_map(|p| decode(p)).collect();
            if !decoded.is_empty() {
                return decoded;
            }
        }

        for key in ["address", "cname", "txtdata", "exchange", "target", "record"] {
            if let Some(value) = self.extra.get(key).and_then(value_as_string) {
                return vec![value];
            }
        }
        Vec::new()
    }

    /// Numeric field from the legacy shape (`priority`, `preference`, `weight`, `port`).
    pub fn number(&self, key: &str) -> Option<u32> {
        self.extra.get(key).and_then(value_as_u32)
    }

    /// Record value in presentation order plus the MX/SRV priority, for an
    /// entry of `record_type`. MX and SRV carry the priority outside the value.
    pub fn value_and_priority(&self, record_type: &str) -> (String, Option<u16>) {
        let data = self.data();
        match (record_type, data.as_slice()) {
            // Current shape: [preference, exchange] / [priority, weight, port, target].
            ("MX" | "SRV", [first, rest @ ..]) if !rest.is_empty() => {
                (rest.join(" "), first.trim().parse::<u16>().ok())
            }
            ("MX", [exchange]) => (exchange.clone(), self.priority(&["preference", "priority"])),
            ("SRV", [target]) => {
                let mut fields: Vec<String> = ["weight", "port"]
                    .iter()
                    .filter_map(|key| self.number(key).map(|n| n.to_string()))
                    .collect();
                fields.push(target.clone());
                (fields.join(" "), self.priority(&["priority"]))
            }
            ("TXT", parts) => (parts.concat(), None),
            (_, parts) => (parts.join(" "), None),
        }
    }

    fn priority(&self, keys: &[&str]) -> Option<u16> {
        keys.iter()
            .find_map(|key| self.number(key))
            .and_then(|n| u16::try_from(n).ok())
    }

    pub fn ttl_secs(&self) -> Option<u32> {
        self.ttl.as_ref().and_then(value_as_u32)
    }
}

fn decode(encoded: &str) -> Option<String> {
    STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A record to write through `DNS/add_zone_record` or `DNS/edit_zone_record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    pub record_type: String,
    pub name: String,
    pub value: String,
    pub ttl: u32,
    pub priority: Option<u16>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn modern_entry_decodes_base64_fields() {
        let entry: ZoneEntry = serde_json::from_value(json!({
            "line_index": 12,
            "type": "record",
            "record_type": "txt",
            "dname_b64": STANDARD.encode("leo.pvthostel.com."),
            "data_b64": [STANDARD.encode("v=spf1 "), STANDARD.encode("-all")],
            "ttl": 14400
        }))
        .unwrap();

        assert_eq!(entry.line, Some(12));
        assert_eq!(entry.kind(), EntryKind::Record("TXT".into()));
        assert_eq!(entry.owner().as_deref(), Some("leo.pvthostel.com."));
        assert_eq!(entry.data(), vec!["v=spf1 ".to_owned(), "-all".to_owned()]);
        assert_eq!(entry.ttl_secs(), Some(14400));
    }

    #[test]
    fn legacy_entry_uses_flat_fields() {
        let entry: ZoneEntry = serde_json::from_value(json!({
            "line": 7,
            "type": "MX",
            "name": "leo.pvthostel.com.",
            "exchange": "mail.pvthostel.com",
            "preference": "10",
            "ttl": "3600"
        }))
        .unwrap();

        assert_eq!(entry.kind(), EntryKind::Record("MX".into()));
        assert_eq!(entry.data(), vec!["mail.pvthostel.com".to_owned()]);
        assert_eq!(entry.number("preference"), Some(10));
        assert_eq!(entry.ttl_secs(), Some(3600));
    }

    #[test]
    fn value_and_priority_splits_mx_in_both_shapes() {
        let modern: ZoneEntry = serde_json::from_value(json!({
            "type": "record",
            "record_type": "MX",
            "dname_b64": STANDARD.encode("leo.pvthostel.com."),
            "data_b64": [STANDARD.encode("10"), STANDARD.encode("mail.pvthostel.com.")]
        }))
        .unwrap();
        let legacy: ZoneEntry = serde_json::from_value(json!({
            "type": "MX",
            "name": "leo.pvthostel.com.",
            "exchange": "mail.pvthostel.com.",
            "preference": 10
        }))
        .unwrap();

        let expected = ("mail.pvthostel.com.".to_owned(), Some(10));
        assert_eq!(modern.value_and_priority("MX"), expected);
        assert_eq!(legacy.value_and_priority("MX"), expected);
    }

    #[test]
    fn comment_and_control_lines_are_classified() {
        let comment = ZoneEntry {
            entry_type: Some("comment".into()),
            ..ZoneEntry::default()
        };
        let control = ZoneEntry {
            entry_type: Some("control".into()),
            ..ZoneEntry::default()
        };
        assert_eq!(comment.kind(), EntryKind::Comment);
        assert_eq!(control.kind(), EntryKind::Control);
        assert_eq!(ZoneEntry::default().kind(), EntryKind::Unknown);
    }

    #[test]
    fn entry_round_trips_unknown_fields() {
        let raw = json!({"line": 1, "type": "A", "name": "a.", "address": "1.2.3.4", "class": "IN"});
        let entry: ZoneEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }
}
