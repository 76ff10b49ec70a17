// Canspace adapter over the cPanel zone editor.
//
// Zone entries carry their data either base64-encoded (`data_b64`, one
// element per rdata field) or in the older flat fields. Owner names may be
// relative to the zone. Comment and control lines are quarantined.

use async_trait::async_trait;
use dnsvault_api::cpanel::{self, EntryKind, ZoneEntry, ZoneRecord};
use dnsvault_api::{CpanelClient, TransportConfig};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::normalize::{self, Quarantine};
use super::{Provider, SourceFetch, SourceKind, Upsert};
use crate::config::CanspaceCredentials;
use crate::error::CoreError;
use crate::model::Record;

/// cPanel's zone editor default.
const CPANEL_DEFAULT_TTL: u32 = 14400;

pub struct CanspaceSource {
    domain: String,
    settings: Option<(CanspaceCredentials, TransportConfig)>,
    client: OnceCell<CpanelClient>,
}

impl CanspaceSource {
    /// Connects on first use, probing for the endpoint if none is configured.
    pub fn new(domain: impl Into<String>, credentials: CanspaceCredentials, transport: TransportConfig) -> Self {
        Self {
            domain: domain.into(),
            settings: Some((credentials, transport)),
            client: OnceCell::new(),
        }
    }

    /// Use an already-built client.
    pub fn from_client(client: CpanelClient) -> Self {
        Self {
            domain: client.domain().to_owned(),
            settings: None,
            client: OnceCell::new_with(Some(client)),
        }
    }

    async fn client(&self) -> Result<&CpanelClient, CoreError> {
        self.client.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<CpanelClient, CoreError> {
        let Some((credentials, transport)) = &self.settings else {
            return Err(CoreError::Internal("cPanel source has no connection settings".into()));
        };
        let endpoint = match &credentials.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => CpanelClient::detect_endpoint(&self.domain, transport).await,
        };
        debug!(endpoint, "connecting to cPanel");
        CpanelClient::new(
            &endpoint,
            self.domain.clone(),
            credentials.username.clone(),
            credentials.password.clone(),
            transport,
        )
        .map_err(|e| CoreError::provider(SourceKind::Canspace.as_str(), e))
    }
}

/// Map one zone entry onto the canonical shape.
pub fn normalize_entry(entry: &ZoneEntry, domain: &str) -> Result<Record, Quarantine> {
    let record_type = match entry.kind() {
        EntryKind::Record(rtype) => rtype,
        EntryKind::Comment => return Err(Quarantine::new("comment line")),
        EntryKind::Control => return Err(Quarantine::new("control line")),
        EntryKind::Unknown => return Err(Quarantine::new("entry has no record type")),
    };
    let owner = entry
        .owner()
        .ok_or_else(|| Quarantine::new(format!("{record_type} entry has no name")))?;
    let name = cpanel::qualify(&owner, domain);
    let (value, priority) = entry.value_and_priority(&record_type);

    normalize::build(
        &record_type,
        &name,
        &value,
        Some(entry.ttl_secs().unwrap_or(CPANEL_DEFAULT_TTL)),
        priority,
        SourceKind::Canspace.as_str(),
    )
}

/// The zone-editor request that recreates `record`.
pub fn to_zone_record(record: &Record) -> ZoneRecord {
    ZoneRecord {
        record_type: record.record_type.clone(),
        name: record.name.clone(),
        value: record.value.clone(),
        ttl: record.ttl,
        priority: record.priority,
    }
}

#[async_trait]
impl Provider for CanspaceSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Canspace
    }

    async fn fetch(&self) -> Result<SourceFetch, CoreError> {
        let client = self.client().await?;
        let entries = client
            .parse_zone()
            .await
            .map_err(|e| CoreError::provider(SourceKind::Canspace.as_str(), e))?;

        let mut records = Vec::with_capacity(entries.len());
        let mut quarantined = 0;
        for entry in &entries {
            match normalize_entry(entry, &self.domain) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    quarantined += 1;
                    debug!(line = ?entry.line, %reason, "quarantined zone entry");
                }
            }
        }
        if quarantined > 0 {
            warn!(quarantined, "skipped cPanel zone entries that are not records");
        }

        let payload = entries
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Internal(format!("re-encoding zone entries: {e}")))?;

        Ok(SourceFetch {
            kind: SourceKind::Canspace,
            payload,
            records,
            quarantined,
        })
    }

    async fn update_or_create(&self, record: &Record) -> Result<Upsert, CoreError> {
        self.client()
            .await?
            .update_or_create(&to_zone_record(record))
            .await
            .map_err(|e| CoreError::provider(SourceKind::Canspace.as_str(), e))
    }

    async fn delete(&self, record: &Record) -> Result<bool, CoreError> {
        self.client()
            .await?
            .delete_matching(&to_zone_record(record))
            .await
            .map_err(|e| CoreError::provider(SourceKind::Canspace.as_str(), e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const DOMAIN: &str = "leo.pvthostel.com";

    fn entry(value: serde_json::Value) -> ZoneEntry {
        serde_json::from_value(value).unwrap()
    }

    // base64("leo.pvthostel.com.")
    const APEX_B64: &str = "bGVvLnB2dGhvc3RlbC5jb20u";

    #[test]
    fn modern_mx_splits_preference() {
        let record = normalize_entry(
            &entry(json!({
                "line_index": 20, "type": "record", "record_type": "MX",
                "dname_b64": APEX_B64,
                "data_b64": ["MTA=", "bWFpbC5wdnRob3N0ZWwuY29tLg=="],
                "ttl": 3600
            })),
            DOMAIN,
        )
        .unwrap();

        assert_eq!(record.name, "leo.pvthostel.com");
        assert_eq!(record.value, "mail.pvthostel.com");
        assert_eq!(record.priority, Some(10));
        assert_eq!(record.ttl, 3600);
        assert_eq!(record.source, "canspace");
    }

    #[test]
    fn relative_legacy_names_are_qualified() {
        let record = normalize_entry(
            &entry(json!({"line": 5, "type": "CNAME", "name": "www", "cname": "cname.vercel-dns.com."})),
            DOMAIN,
        )
        .unwrap();

        assert_eq!(record.name, "www.leo.pvthostel.com");
        assert_eq!(record.value, "cname.vercel-dns.com");
        assert_eq!(record.ttl, CPANEL_DEFAULT_TTL);
    }

    #[test]
    fn legacy_mx_reads_preference_field() {
        let record = normalize_entry(
            &entry(json!({
                "line": 9, "type": "MX", "name": "@",
                "exchange": "mail.pvthostel.com", "preference": 5
            })),
            DOMAIN,
        )
        .unwrap();
        assert_eq!(record.name, DOMAIN);
        assert_eq!(record.priority, Some(5));
    }

    #[test]
    fn multi_part_txt_is_concatenated() {
        let record = normalize_entry(
            &entry(json!({
                "line_index": 30, "type": "record", "record_type": "TXT",
                "dname_b64": APEX_B64,
                "data_b64": ["dj1zcGYxIA==", "LWFsbA=="]
            })),
            DOMAIN,
        )
        .unwrap();
        assert_eq!(record.value, "v=spf1 -all");
    }

    #[test]
    fn comment_and_control_lines_are_quarantined() {
        let comment = entry(json!({"line_index": 1, "type": "comment", "text_b64": "OyBoaQ=="}));
        let control = entry(json!({"line_index": 2, "type": "control", "text_b64": "JFRUTCA2MA=="}));
        assert_eq!(normalize_entry(&comment, DOMAIN).unwrap_err().reason, "comment line");
        assert_eq!(normalize_entry(&control, DOMAIN).unwrap_err().reason, "control line");
    }
}
