// ── Engine configuration ──
//
// Everything the engine needs to know, passed in at construction. The
// engine never reads environment variables or config files itself; the
// CLI resolves profiles, env, and keyring into an `EngineConfig`.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Snapshot file prefix: `<prefix>_<label>_<YYYYMMDD_HHMMSS>.json`.
pub const DEFAULT_FILE_PREFIX: &str = "dns_backup";

/// Window for `list` and `archive` when none is given.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Cloudflare API token plus an optional pinned zone id.
#[derive(Debug, Clone)]
pub struct CloudflareCredentials {
    pub api_token: SecretString,
    /// Skips the zone lookup when set.
    pub zone_id: Option<String>,
}

/// cPanel login for the Canspace-hosted zone.
#[derive(Debug, Clone)]
pub struct CanspaceCredentials {
    /// `https://host:2083`. Detected from a candidate list when absent.
    pub endpoint: Option<String>,
    pub username: String,
    pub password: SecretString,
}

/// Configuration for one managed domain.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub domain: String,
    pub backup_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub file_prefix: String,
    pub retention_days: u32,
    pub cloudflare: Option<CloudflareCredentials>,
    pub canspace: Option<CanspaceCredentials>,
    /// Resolvers for the public source. Empty means the built-in set.
    pub resolvers: Vec<IpAddr>,
    /// Per-call timeout for provider HTTP requests.
    pub timeout: Duration,
    /// Accept self-signed certificates from the cPanel host.
    pub insecure: bool,
}

impl EngineConfig {
    /// A config with no provider credentials and default storage layout
    /// (`<backup_dir>/archive` for archived snapshots).
    pub fn new(domain: impl Into<String>, backup_dir: impl Into<PathBuf>) -> Self {
        let backup_dir = backup_dir.into();
        Self {
            domain: domain.into(),
            archive_dir: backup_dir.join("archive"),
            backup_dir,
            file_prefix: DEFAULT_FILE_PREFIX.to_owned(),
            retention_days: DEFAULT_RETENTION_DAYS,
            cloudflare: None,
            canspace: None,
            resolvers: Vec::new(),
            timeout: dnsvault_api::transport::DEFAULT_TIMEOUT,
            insecure: false,
        }
    }
}
