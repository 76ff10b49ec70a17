// Async HTTP client for the cPanel UAPI DNS surface.
//
// Base path: https://<host>:2083/execute/<Module>/<function>
// Auth: HTTP basic auth on every request (no session token).

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use super::models::{EntryKind, UapiEnvelope, ZoneEntry, ZoneRecord};
use crate::Upsert;
use crate::rdata;
use crate::error::{Error, body_preview};
use crate::transport::TransportConfig;

/// Hosts tried, in order, when no endpoint is configured.
const CANDIDATE_HOSTS: &[&str] = &["cpanel.canspace.ca", "server.canspace.ca", "", "canspace.ca"];

const CPANEL_PORT: u16 = 2083;
const DETECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MX_PRIORITY: u16 = 10;

/// Async client for one domain hosted on a cPanel server.
pub struct CpanelClient {
    http: reqwest::Client,
    base_url: Url,
    domain: String,
    username: String,
    password: SecretString,
}

impl CpanelClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client against a known endpoint such as `https://host:2083`.
    pub fn new(
        endpoint: &str,
        domain: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(http, endpoint, domain, username, password)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        http: reqwest::Client,
        endpoint: &str,
        domain: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Result<Self, Error> {
        let mut base_url = Url::parse(endpoint)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            domain: domain.into(),
            username: username.into(),
            password,
        })
    }

    /// Find a reachable cPanel endpoint for `domain`.
    ///
    /// Each candidate's `/login` page is requested; a 200 or 401 means a
    /// cPanel instance answered. Falls back to the first candidate.
    pub async fn detect_endpoint(domain: &str, transport: &TransportConfig) -> String {
        let candidates = candidate_endpoints(domain);
        let detect = TransportConfig {
            timeout: DETECT_TIMEOUT,
            ..transport.clone()
        };

        if let Ok(http) = detect.build_client() {
            for endpoint in &candidates {
                debug!(endpoint, "probing cPanel endpoint");
                match http.get(format!("{endpoint}/login")).send().await {
                    Ok(resp) if matches!(resp.status().as_u16(), 200 | 401) => {
                        info!(endpoint, "found cPanel endpoint");
                        return endpoint.clone();
                    }
                    Ok(resp) => debug!(endpoint, status = %resp.status(), "endpoint rejected"),
                    Err(e) => debug!(endpoint, error = %e, "endpoint unreachable"),
                }
            }
        }

        let fallback = candidates.into_iter().next().unwrap_or_default();
        warn!(endpoint = %fallback, "no cPanel endpoint answered, using default");
        fallback
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn endpoint(&self) -> &str {
        self.base_url.as_str()
    }

    // ── Zone reads ───────────────────────────────────────────────────

    /// `GET /execute/DNS/parse_zone?zone=<domain>`
    pub async fn parse_zone(&self) -> Result<Vec<ZoneEntry>, Error> {
        let mut url = self.execute_url("DNS/parse_zone")?;
        url.query_pairs_mut()
            .append_pair("zone", &self.domain)
            .append_pair("api.version", "1");

        debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await?;
        let entries: Option<Vec<ZoneEntry>> = self.handle_response(resp).await?;
        let entries = entries.unwrap_or_default();
        debug!(count = entries.len(), "parsed cPanel zone");
        Ok(entries)
    }

    /// The zone entry holding exactly `record`: same type, fully qualified
    /// name, and value. Siblings sharing the name are never matched.
    pub async fn find_record(&self, record: &ZoneRecord) -> Result<Option<ZoneEntry>, Error> {
        let wanted = record.name.trim_end_matches('.');
        let wanted_type = record.record_type.to_uppercase();
        Ok(self.parse_zone().await?.into_iter().find(|entry| {
            entry.kind() == EntryKind::Record(wanted_type.clone())
                && entry
                    .owner()
                    .is_some_and(|owner| qualify(&owner, &self.domain).eq_ignore_ascii_case(wanted))
                && rdata::same_value(
                    &wanted_type,
                    &entry.value_and_priority(&wanted_type).0,
                    &record.value,
                )
        }))
    }

    // ── Zone writes ──────────────────────────────────────────────────

    /// `POST /execute/DNS/add_zone_record`, or `Email/add_mx` for MX.
    pub async fn add_zone_record(&self, record: &ZoneRecord) -> Result<(), Error> {
        let rtype = record.record_type.to_uppercase();
        if rtype == "MX" {
            let priority = record.priority.unwrap_or(DEFAULT_MX_PRIORITY);
            return self.add_mx(&record.value, priority).await;
        }

        let mut form = vec![
            ("domain", self.domain.clone()),
            ("type", rtype.clone()),
            ("name", record.name.clone()),
            ("ttl", record.ttl.to_string()),
        ];
        form.extend(data_fields(&rtype, record)?);
        debug!(record_type = %rtype, name = %record.name, "adding cPanel zone record");
        self.post("DNS/add_zone_record", form).await
    }

    /// `POST /execute/Email/add_mx`
    pub async fn add_mx(&self, exchanger: &str, priority: u16) -> Result<(), Error> {
        let form = vec![
            ("domain", self.domain.clone()),
            ("exchanger", exchanger.to_owned()),
            ("priority", priority.to_string()),
        ];
        debug!(exchanger, priority, "adding cPanel MX");
        self.post("Email/add_mx", form).await
    }

    /// `POST /execute/DNS/edit_zone_record` for the entry on `line`.
    pub async fn edit_zone_record(&self, line: u32, record: &ZoneRecord) -> Result<(), Error> {
        let rtype = record.record_type.to_uppercase();
        let mut form = vec![
            ("domain", self.domain.clone()),
            ("line", line.to_string()),
            ("type", rtype.clone()),
            ("name", record.name.clone()),
            ("ttl", record.ttl.to_string()),
        ];
        if rtype == "MX" {
            form.push(("exchange", record.value.clone()));
            form.push((
                "preference",
                record.priority.unwrap_or(DEFAULT_MX_PRIORITY).to_string(),
            ));
        } else {
            form.extend(data_fields(&rtype, record)?);
        }
        debug!(line, record_type = %rtype, "editing cPanel zone record");
        self.post("DNS/edit_zone_record", form).await
    }

    /// `POST /execute/DNS/remove_zone_record`
    pub async fn remove_zone_record(&self, line: u32) -> Result<(), Error> {
        let form = vec![("domain", self.domain.clone()), ("line", line.to_string())];
        debug!(line, "removing cPanel zone record");
        self.post("DNS/remove_zone_record", form).await
    }

    /// Edit the zone line holding the same type, name and value, or add a new one.
    pub async fn update_or_create(&self, record: &ZoneRecord) -> Result<Upsert, Error> {
        // Reject before touching the zone at all.
        data_fields(&record.record_type.to_uppercase(), record)?;

        let existing = self.find_record(record).await?;
        match existing.and_then(|entry| entry.line) {
            Some(line) => {
                self.edit_zone_record(line, record).await?;
                Ok(Upsert::Updated)
            }
            None => {
                self.add_zone_record(record).await?;
                Ok(Upsert::Created)
            }
        }
    }

    /// Remove the zone line holding the same type, name and value. `false`
    /// if there was none.
    pub async fn delete_matching(&self, record: &ZoneRecord) -> Result<bool, Error> {
        let Some(line) = self.find_record(record).await?.and_then(|entry| entry.line) else {
            return Ok(false);
        };
        self.remove_zone_record(line).await?;
        Ok(true)
    }

    // ── HTTP plumbing ────────────────────────────────────────────────

    fn execute_url(&self, function: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("execute/{function}"))?)
    }

    async fn post(&self, function: &str, mut form: Vec<(&str, String)>) -> Result<(), Error> {
        form.push(("api.version", "1".to_owned()));
        let url = self.execute_url(function)?;
        debug!("POST {url}");
        let resp = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .form(&form)
            .send()
            .await?;
        let _: Option<serde_json::Value> = self.handle_response(resp).await?;
        Ok(())
    }

    /// Unwrap the UAPI envelope, mapping `status != 1` into `Error::Cpanel`.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<Option<T>, Error> {
        let status = resp.status();
        if matches!(status.as_u16(), 401 | 403) {
            return Err(Error::Authentication {
                message: format!("cPanel rejected the credentials (HTTP {status})"),
            });
        }

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Cpanel {
                message: format!("HTTP {status}: {}", body_preview(&body)),
            });
        }

        let envelope: UapiEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("{e} (body preview: {:?})", body_preview(&body)),
                body: body.clone(),
            })?;

        if envelope.status != 1 {
            let message = envelope
                .errors
                .filter(|errors| !errors.is_empty())
                .map_or_else(|| "request failed".to_owned(), |errors| errors.join("; "));
            return Err(Error::Cpanel { message });
        }

        Ok(envelope.data)
    }
}

/// The endpoints `detect_endpoint` tries, in order.
pub fn candidate_endpoints(domain: &str) -> Vec<String> {
    CANDIDATE_HOSTS
        .iter()
        .map(|host| {
            let host = if host.is_empty() { domain } else { host };
            format!("https://{host}:{CPANEL_PORT}")
        })
        .collect()
}

/// Type-specific form fields for `add_zone_record` / `edit_zone_record`.
fn data_fields(rtype: &str, record: &ZoneRecord) -> Result<Vec<(&'static str, String)>, Error> {
    let value = record.value.clone();
    match rtype {
        "A" | "AAAA" => Ok(vec![("address", value)]),
        "CNAME" => Ok(vec![("cname", value)]),
        "TXT" => Ok(vec![("txtdata", value)]),
        "MX" => Ok(vec![("exchange", value)]),
        "SRV" => {
            let mut fields = vec![("target", value)];
            if let Some(priority) = record.priority {
                fields.push(("priority", priority.to_string()));
            }
            Ok(fields)
        }
        other => Err(Error::UnsupportedRecordType(other.to_owned())),
    }
}

/// Resolve a zone owner name against the zone apex.
///
/// `@` and the empty name are the apex; names ending in a dot are absolute;
/// anything else is relative to `domain`.
pub fn qualify(owner: &str, domain: &str) -> String {
    let domain = domain.trim_end_matches('.');
    if owner.is_empty() || owner == "@" {
        return domain.to_owned();
    }
    if let Some(absolute) = owner.strip_suffix('.') {
        return absolute.to_owned();
    }

    let lower = owner.to_ascii_lowercase();
    let apex = domain.to_ascii_lowercase();
    if lower == apex || lower.ends_with(&format!(".{apex}")) {
        owner.to_owned()
    } else {
        format!("{owner}.{domain}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn candidates_include_domain_host() {
        let endpoints = candidate_endpoints("leo.pvthostel.com");
        assert_eq!(endpoints[0], "https://cpanel.canspace.ca:2083");
        assert_eq!(endpoints[2], "https://leo.pvthostel.com:2083");
        assert_eq!(endpoints.len(), 4);
    }

    #[test]
    fn qualify_handles_apex_relative_and_absolute() {
        assert_eq!(qualify("@", "example.com"), "example.com");
        assert_eq!(qualify("www", "example.com"), "www.example.com");
        assert_eq!(qualify("www.example.com.", "example.com"), "www.example.com");
        assert_eq!(qualify("mail.example.com", "example.com"), "mail.example.com");
    }

    #[test]
    fn unsupported_types_are_rejected() {
        let record = ZoneRecord {
            record_type: "CAA".into(),
            name: "example.com".into(),
            value: "0 issue \"letsencrypt.org\"".into(),
            ttl: 3600,
            priority: None,
        };
        assert!(matches!(
            data_fields("CAA", &record),
            Err(Error::UnsupportedRecordType(t)) if t == "CAA"
        ));
    }
}
