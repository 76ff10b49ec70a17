// Cloudflare adapter: `content` carries the value, `priority` and
// `proxied` are separate fields, `ttl: 1` means "automatic".

use async_trait::async_trait;
use dnsvault_api::CloudflareClient;
use dnsvault_api::cloudflare::{DnsRecord, NewRecord};
use tracing::{debug, warn};

use super::normalize::{self, Quarantine};
use super::{Provider, SourceFetch, SourceKind, Upsert};
use crate::error::CoreError;
use crate::model::Record;

pub struct CloudflareSource {
    client: CloudflareClient,
}

impl CloudflareSource {
    pub fn new(client: CloudflareClient) -> Self {
        Self { client }
    }
}

/// Map one Cloudflare record onto the canonical shape.
pub fn normalize_record(raw: &DnsRecord) -> Result<Record, Quarantine> {
    let mut record = normalize::build(
        &raw.record_type,
        &raw.name,
        &raw.content,
        raw.ttl,
        raw.priority,
        SourceKind::Cloudflare.as_str(),
    )?;
    record.proxied = raw.proxied;
    Ok(record)
}

/// The Cloudflare request body that recreates `record`.
pub fn to_new_record(record: &Record) -> NewRecord {
    let mut new = NewRecord::new(&record.record_type, &record.name, &record.value);
    new.ttl = record.ttl;
    new.proxied = record.proxied.unwrap_or(false);
    new.priority = record.priority;
    new
}

#[async_trait]
impl Provider for CloudflareSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Cloudflare
    }

    async fn fetch(&self) -> Result<SourceFetch, CoreError> {
        let raw = self
            .client
            .list_records(None)
            .await
            .map_err(|e| CoreError::provider(SourceKind::Cloudflare.as_str(), e))?;

        let mut records = Vec::with_capacity(raw.len());
        let mut quarantined = 0;
        for entry in &raw {
            match normalize_record(entry) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    quarantined += 1;
                    warn!(id = %entry.id, %reason, "quarantined Cloudflare record");
                }
            }
        }

        let payload = raw
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Internal(format!("re-encoding Cloudflare records: {e}")))?;

        debug!(count = records.len(), quarantined, "normalized Cloudflare records");
        Ok(SourceFetch {
            kind: SourceKind::Cloudflare,
            payload,
            records,
            quarantined,
        })
    }

    async fn update_or_create(&self, record: &Record) -> Result<Upsert, CoreError> {
        self.client
            .update_or_create(&to_new_record(record))
            .await
            .map_err(|e| CoreError::provider(SourceKind::Cloudflare.as_str(), e))
    }

    async fn delete(&self, record: &Record) -> Result<bool, CoreError> {
        self.client
            .delete_matching(&to_new_record(record))
            .await
            .map_err(|e| CoreError::provider(SourceKind::Cloudflare.as_str(), e))
    }
}
