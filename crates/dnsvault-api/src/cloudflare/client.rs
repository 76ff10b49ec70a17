// Async HTTP client for the Cloudflare v4 DNS API.
//
// Base path: https://api.cloudflare.com/client/v4
// Auth: `Authorization: Bearer <token>` injected as a default header.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, trace};
use url::Url;

use super::models::{DnsRecord, Envelope, NewRecord, RecordPatch, ResultInfo, Zone};
use crate::Upsert;
use crate::rdata;
use crate::error::{Error, body_preview};
use crate::transport::TransportConfig;

/// Production API root.
pub const CLOUDFLARE_API: &str = "https://api.cloudflare.com/client/v4";

const PAGE_SIZE: u32 = 100;

/// Async client for one Cloudflare zone.
///
/// The zone id is either supplied up front or looked up lazily from the
/// registrable domain on first use, then cached for the client's lifetime.
pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    domain: String,
    zone_id: OnceCell<String>,
}

impl CloudflareClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `domain` authenticated with an API token.
    pub fn new(
        api_token: &SecretString,
        domain: impl Into<String>,
        zone_id: Option<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_token.expose_secret()))
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self::from_reqwest(http, CLOUDFLARE_API, domain, zone_id))
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        http: reqwest::Client,
        base_url: &str,
        domain: impl Into<String>,
        zone_id: Option<String>,
    ) -> Self {
        let cell = OnceCell::new();
        if let Some(id) = zone_id {
            // A fresh cell cannot already be initialised.
            let _ = cell.set(id);
        }
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            domain: domain.into(),
            zone_id: cell,
        }
    }

    /// Point the client at a different API root (tests, API gateways).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.trim_end_matches('/').clone_into(&mut self.base_url);
        self
    }

    /// The domain this client was built for.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(Url::parse(&format!("{}/{path}", self.base_url))?)
    }

    // ── Zones ────────────────────────────────────────────────────────

    /// Resolve (and cache) the zone id for this client's domain.
    ///
    /// Subdomains are looked up by their registrable base
    /// (`leo.pvthostel.com` → `pvthostel.com`).
    pub async fn zone_id(&self) -> Result<&str, Error> {
        let id = self
            .zone_id
            .get_or_try_init(|| self.lookup_zone_id())
            .await?;
        Ok(id.as_str())
    }

    async fn lookup_zone_id(&self) -> Result<String, Error> {
        let zone_name = base_domain(&self.domain);
        debug!(zone = zone_name, "looking up Cloudflare zone id");

        let mut url = self.url("zones")?;
        url.query_pairs_mut().append_pair("name", zone_name);

        let (zones, _): (Vec<Zone>, _) = self.get(url).await?;
        let zone = zones.into_iter().next().ok_or_else(|| Error::ZoneNotFound {
            zone: zone_name.to_owned(),
        })?;

        debug!(zone = %zone.name, id = %zone.id, "found zone");
        Ok(zone.id)
    }

    fn records_url(&self, zone_id: &str, record_id: Option<&str>) -> Result<Url, Error> {
        match record_id {
            Some(id) => self.url(&format!("zones/{zone_id}/dns_records/{id}")),
            None => self.url(&format!("zones/{zone_id}/dns_records")),
        }
    }

    // ── Records ──────────────────────────────────────────────────────

    /// List every record in the zone, optionally filtered by type.
    ///
    /// Follows `result_info.total_pages` until all pages are read.
    pub async fn list_records(&self, record_type: Option<&str>) -> Result<Vec<DnsRecord>, Error> {
        let zone_id = self.zone_id().await?.to_owned();
        let mut records = Vec::new();
        let mut page = 1_u32;

        loop {
            let mut url = self.records_url(&zone_id, None)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("page", &page.to_string());
                query.append_pair("per_page", &PAGE_SIZE.to_string());
                if let Some(rtype) = record_type {
                    query.append_pair("type", &rtype.to_uppercase());
                }
            }

            let (batch, info): (Vec<DnsRecord>, _) = self.get(url).await?;
            trace!(page, count = batch.len(), "fetched record page");
            records.extend(batch);

            match info {
                Some(info) if info.page < info.total_pages => page = info.page + 1,
                _ => break,
            }
        }

        debug!(count = records.len(), "listed Cloudflare records");
        Ok(records)
    }

    /// The record with this exact type, name and value, if any.
    ///
    /// Other records at the same name are siblings in the RRset and are
    /// never returned here.
    pub async fn find_record(&self, record: &NewRecord) -> Result<Option<DnsRecord>, Error> {
        let records = self.list_records(Some(&record.record_type)).await?;
        Ok(records.into_iter().find(|r| {
            r.name.eq_ignore_ascii_case(&record.name)
                && rdata::same_value(&record.record_type, &r.content, &record.content)
        }))
    }

    /// `POST /zones/{id}/dns_records`
    pub async fn create_record(&self, record: &NewRecord) -> Result<DnsRecord, Error> {
        let zone_id = self.zone_id().await?.to_owned();
        let url = self.records_url(&zone_id, None)?;
        debug!(record_type = %record.record_type, name = %record.name, "creating Cloudflare record");
        self.send_json(self.http.post(url), record).await
    }

    /// `PATCH /zones/{id}/dns_records/{record_id}`
    pub async fn update_record(&self, record_id: &str, patch: &RecordPatch) -> Result<DnsRecord, Error> {
        let zone_id = self.zone_id().await?.to_owned();
        let url = self.records_url(&zone_id, Some(record_id))?;
        debug!(record_id, "updating Cloudflare record");
        self.send_json(self.http.patch(url), patch).await
    }

    /// `DELETE /zones/{id}/dns_records/{record_id}`
    pub async fn delete_record(&self, record_id: &str) -> Result<(), Error> {
        let zone_id = self.zone_id().await?.to_owned();
        let url = self.records_url(&zone_id, Some(record_id))?;
        debug!(record_id, "deleting Cloudflare record");
        let resp = self.http.delete(url).send().await?;
        let _: (serde_json::Value, _) = self.handle_response(resp).await?;
        Ok(())
    }

    /// Patch the record with the same type, name and value, or create it.
    pub async fn update_or_create(&self, record: &NewRecord) -> Result<Upsert, Error> {
        match self.find_record(record).await? {
            Some(existing) => {
                self.update_record(&existing.id, &record.as_patch()).await?;
                Ok(Upsert::Updated)
            }
            None => {
                self.create_record(record).await?;
                Ok(Upsert::Created)
            }
        }
    }

    /// Delete the record with the same type, name and value. `false` if
    /// there was none.
    pub async fn delete_matching(&self, record: &NewRecord) -> Result<bool, Error> {
        let Some(existing) = self.find_record(record).await? else {
            return Ok(false);
        };
        self.delete_record(&existing.id).await?;
        Ok(true)
    }

    // ── HTTP plumbing ────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<(T, Option<ResultInfo>), Error> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        builder: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<DnsRecord, Error> {
        let resp = builder.json(body).send().await?;
        let (record, _) = self.handle_response(resp).await?;
        Ok(record)
    }

    /// Unwrap the v4 envelope, mapping `success: false` into `Error::Cloudflare`.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<(T, Option<ResultInfo>), Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "API token rejected (HTTP 401)".into(),
            });
        }

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(e) if status.is_success() => {
                return Err(Error::Deserialization {
                    message: format!("{e} (body preview: {:?})", body_preview(&body)),
                    body,
                });
            }
            Err(_) => {
                return Err(Error::Cloudflare {
                    status: status.as_u16(),
                    message: body_preview(&body).to_owned(),
                });
            }
        };

        if !envelope.success || !status.is_success() {
            let message = if envelope.errors.is_empty() {
                format!("request failed with HTTP {status}")
            } else {
                envelope
                    .errors
                    .iter()
                    .map(|e| format!("{} ({})", e.message, e.code))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(Error::Cloudflare {
                status: status.as_u16(),
                message,
            });
        }

        let result = envelope.result.ok_or_else(|| Error::Deserialization {
            message: "envelope has no result".into(),
            body: body.clone(),
        })?;
        Ok((result, envelope.result_info))
    }
}

/// The registrable part of a domain: its last two labels.
pub fn base_domain(domain: &str) -> &str {
    let trimmed = domain.trim_end_matches('.');
    let mut dots = trimmed.rmatch_indices('.');
    dots.next();
    match dots.next() {
        Some((idx, _)) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_domain_strips_subdomains() {
        assert_eq!(base_domain("leo.pvthostel.com"), "pvthostel.com");
        assert_eq!(base_domain("a.b.example.org."), "example.org");
    }

    #[test]
    fn base_domain_keeps_apex() {
        assert_eq!(base_domain("example.com"), "example.com");
        assert_eq!(base_domain("localhost"), "localhost");
    }
}
