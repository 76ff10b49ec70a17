// Shared transport configuration for building reqwest::Client instances.
//
// The Cloudflare and cPanel clients share timeout, user agent, and TLS
// settings through this module instead of duplicating builder logic.

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::Error;

/// Default per-call timeout for outbound provider requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("dnsvault/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the bundled webpki root store.
    #[default]
    System,
    /// Accept any certificate (shared cPanel hosts on :2083 are often self-signed).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Switch to accepting self-signed certificates.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.tls = if insecure {
            TlsMode::DangerAcceptInvalid
        } else {
            TlsMode::System
        };
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.build_client_with_headers(HeaderMap::new())
    }

    /// Build a `reqwest::Client` with additional default headers.
    ///
    /// Used by the Cloudflare client to inject the bearer token.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        if self.tls == TlsMode::DangerAcceptInvalid {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
