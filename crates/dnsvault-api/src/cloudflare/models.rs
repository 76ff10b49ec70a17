// Cloudflare v4 wire types.
//
// Every response is wrapped in `{ success, errors, messages, result }`.
// `DnsRecord` keeps unknown fields in `extra` so a snapshot stores the
// record exactly as the API returned it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Standard v4 response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Pagination block on list endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ResultInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// A DNS record as returned by `GET /zones/{id}/dns_records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    /// `1` means "automatic".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body for `POST /zones/{id}/dns_records`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl NewRecord {
    pub fn new(record_type: &str, name: &str, content: &str) -> Self {
        Self {
            record_type: record_type.to_uppercase(),
            name: name.to_owned(),
            content: content.to_owned(),
            ttl: 1,
            proxied: false,
            priority: None,
        }
    }

    /// The PATCH body that brings an existing record with the same value in
    /// line with this one. Content is never rewritten.
    pub fn as_patch(&self) -> RecordPatch {
        RecordPatch {
            content: None,
            ttl: Some(self.ttl),
            proxied: Some(self.proxied),
            priority: self.priority,
        }
    }
}

/// Body for `PATCH /zones/{id}/dns_records/{record_id}`. Absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}
