use std::fmt;

use serde::{Deserialize, Serialize};

/// TTL assumed when a source does not report one.
pub const DEFAULT_TTL: u32 = 3600;

/// A normalized DNS record.
///
/// Identity for unify and diff is `(type, name, value)` only; TTL,
/// priority and the proxied flag ride along but never make two records
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub value: String,
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    /// Which source contributed this record.
    pub source: String,
}

impl Record {
    pub fn new(
        record_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            name: name.into(),
            value: value.into(),
            ttl: DEFAULT_TTL,
            priority: None,
            proxied: None,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Option<u16>) -> Self {
        self.priority = priority;
        self
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            record_type: self.record_type.clone(),
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }

    /// NS and SOA belong to whoever hosts the zone and are never copied.
    pub fn is_zone_infrastructure(&self) -> bool {
        matches!(self.record_type.as_str(), "NS" | "SOA")
    }
}

/// `(type, name, value)`; displays as `TYPE:name:value`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub record_type: String,
    pub name: String,
    pub value: String,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.record_type, self.name, self.value)
    }
}
