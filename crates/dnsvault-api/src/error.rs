use thiserror::Error;

/// Top-level error type for the `dnsvault-api` crate.
///
/// Covers every failure mode across the provider surfaces: transport,
/// Cloudflare envelope errors, cPanel UAPI errors, and resolver lookups.
/// `dnsvault-core` maps these into source-scoped diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected (HTTP 401/403 or an auth error in the envelope).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Credential material could not be turned into a request header.
    #[error("Invalid credential header: {0}")]
    InvalidHeader(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Building the HTTP client failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Cloudflare ──────────────────────────────────────────────────
    /// `success: false` in the Cloudflare v4 envelope, or a non-2xx status.
    #[error("Cloudflare API error (HTTP {status}): {message}")]
    Cloudflare { status: u16, message: String },

    /// Zone lookup returned no result.
    #[error("Zone not found: {zone}")]
    ZoneNotFound { zone: String },

    // ── cPanel ──────────────────────────────────────────────────────
    /// `status: 0` in the UAPI envelope, or a non-2xx status.
    #[error("cPanel API error: {message}")]
    Cpanel { message: String },

    /// The record type has no mapping onto a UAPI call.
    #[error("Unsupported record type for cPanel: {0}")]
    UnsupportedRecordType(String),

    // ── Resolver ────────────────────────────────────────────────────
    /// Public resolver lookup failed for a reason other than "no records".
    #[error("Resolver error: {0}")]
    Resolver(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the credentials were rejected.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::Cloudflare { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ZoneNotFound { .. } => true,
            Self::Cloudflare { status: 404, .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` for connection-level failures and timeouts.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Resolver(_))
    }
}

/// Trim a response body down to something printable in an error message.
pub(crate) fn body_preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
