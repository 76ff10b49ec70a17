//! Configuration for dnsvault.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `dnsvault_core::EngineConfig`. The CLI layers its
//! global flags on top through [`Overrides`].

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use dnsvault_core::config::{DEFAULT_FILE_PREFIX, DEFAULT_RETENTION_DAYS};
use dnsvault_core::{CanspaceCredentials, CloudflareCredentials, EngineConfig};

/// Keyring service name; entries are keyed `<profile>/<secret>`.
pub const KEYRING_SERVICE: &str = "dnsvault";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named domain profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_owned(),
                available: self.profile_names(),
            })
    }

    /// Comma-separated profile names, for error help text.
    pub fn profile_names(&self) -> String {
        if self.profiles.is_empty() {
            return "(none)".into();
        }
        self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retention")]
    pub retention_days: u32,

    /// Where snapshots go when a profile does not say.
    pub backup_dir: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            retention_days: default_retention(),
            backup_dir: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_retention() -> u32 {
    DEFAULT_RETENTION_DAYS
}

/// A named domain profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Profile {
    /// The managed domain (e.g., "pvthostel.com").
    pub domain: String,

    /// Snapshot directory.
    pub backup_dir: Option<PathBuf>,

    /// Archive directory (default: `<backup_dir>/archive`).
    pub archive_dir: Option<PathBuf>,

    /// Snapshot file prefix (default: "dns_backup").
    pub file_prefix: Option<String>,

    /// Window for `list` and `archive`.
    pub retention_days: Option<u32>,

    /// Cloudflare API token (plaintext; prefer keyring or env var).
    pub cloudflare_api_token: Option<String>,

    /// Environment variable name containing the Cloudflare token.
    pub cloudflare_api_token_env: Option<String>,

    /// Pinned zone id; skips the zone lookup.
    pub cloudflare_zone_id: Option<String>,

    /// cPanel base URL (e.g., "https://cpanel.canspace.ca:2083").
    pub canspace_endpoint: Option<String>,

    pub canspace_username: Option<String>,

    /// cPanel password (plaintext; prefer keyring).
    pub canspace_password: Option<String>,

    /// Environment variable name containing the cPanel password.
    pub canspace_password_env: Option<String>,

    /// Accept self-signed certificates from the cPanel host.
    pub insecure: Option<bool>,

    /// Resolvers for the public source.
    pub resolvers: Option<Vec<IpAddr>>,

    /// Per-call timeout in seconds.
    pub timeout: Option<u64>,
}

// ── Secrets ─────────────────────────────────────────────────────────

/// A secret that can live in the system keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Secret {
    CloudflareToken,
    CanspacePassword,
}

impl Secret {
    /// The conventional environment variable for this secret.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::CloudflareToken => "CLOUDFLARE_API_TOKEN",
            Self::CanspacePassword => "CANSPACE_PASSWORD",
        }
    }

    fn keyring_entry(self, profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
        keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{self}"))
    }
}

/// Store a secret in the system keyring for `profile_name`.
pub fn store_secret(profile_name: &str, secret: Secret, value: &str) -> Result<(), ConfigError> {
    secret.keyring_entry(profile_name)?.set_password(value)?;
    Ok(())
}

/// Remove a secret from the system keyring. Missing entries are not an error.
pub fn delete_secret(profile_name: &str, secret: Secret) -> Result<(), ConfigError> {
    match secret.keyring_entry(profile_name)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ── Config file path ────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "dnsvault", "dnsvault")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || {
            let mut p = home_fallback();
            p.push(".config");
            p.push("dnsvault");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Snapshot directory used when neither the profile nor the defaults set one.
pub fn default_backup_dir() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("dns_backups"),
        |dirs| dirs.data_dir().join("backups"),
    )
}

fn home_fallback() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from `path` + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DNSVAULT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Credential resolution ───────────────────────────────────────────

/// Where secrets come from besides the profile itself.
pub struct Lookup<'a> {
    env: &'a dyn Fn(&str) -> Option<String>,
    keyring: bool,
}

impl Lookup<'static> {
    /// Process environment plus the system keyring.
    pub fn system() -> Self {
        Self {
            env: &process_env,
            keyring: true,
        }
    }

    /// Process environment only.
    pub fn env_only() -> Self {
        Self {
            env: &process_env,
            keyring: false,
        }
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl<'a> Lookup<'a> {
    /// Only the given environment; the keyring is never consulted.
    pub fn with_env(env: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            env,
            keyring: false,
        }
    }

    fn env(&self, name: &str) -> Option<String> {
        (self.env)(name)
    }

    /// Profile-named env var → conventional env var → keyring → plaintext.
    fn secret(
        &self,
        profile_name: &str,
        secret: Secret,
        env_name: Option<&str>,
        plaintext: Option<&String>,
    ) -> Option<SecretString> {
        // 1. Profile's *_env → env var lookup
        if let Some(value) = env_name.and_then(|name| self.env(name)) {
            return Some(SecretString::from(value));
        }

        // 2. Conventional env var
        if let Some(value) = self.env(secret.env_var()) {
            return Some(SecretString::from(value));
        }

        // 3. System keyring
        let stored = self
            .keyring
            .then(|| {
                secret
                    .keyring_entry(profile_name)
                    .and_then(|entry| entry.get_password())
                    .ok()
            })
            .flatten();
        if let Some(value) = stored {
            return Some(SecretString::from(value));
        }

        // 4. Plaintext in config
        plaintext.map(|value| SecretString::from(value.clone()))
    }

    /// Cloudflare token and zone id, or `None` when no token is found.
    pub fn cloudflare(&self, profile: &Profile, profile_name: &str) -> Option<CloudflareCredentials> {
        let api_token = self.secret(
            profile_name,
            Secret::CloudflareToken,
            profile.cloudflare_api_token_env.as_deref(),
            profile.cloudflare_api_token.as_ref(),
        )?;
        let zone_id = self
            .env("CLOUDFLARE_ZONE_ID")
            .or_else(|| profile.cloudflare_zone_id.clone());
        Some(CloudflareCredentials { api_token, zone_id })
    }

    /// cPanel login, or `None` unless both username and password are found.
    pub fn canspace(&self, profile: &Profile, profile_name: &str) -> Option<CanspaceCredentials> {
        let username = self
            .env("CANSPACE_USERNAME")
            .or_else(|| profile.canspace_username.clone())?;
        let password = self.secret(
            profile_name,
            Secret::CanspacePassword,
            profile.canspace_password_env.as_deref(),
            profile.canspace_password.as_ref(),
        )?;
        Some(CanspaceCredentials {
            endpoint: profile.canspace_endpoint.clone(),
            username,
            password,
        })
    }
}

// ── Profile → EngineConfig ──────────────────────────────────────────

/// Values that take priority over the profile (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub domain: Option<String>,
    pub backup_dir: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub insecure: bool,
}

/// Build an `EngineConfig` from a profile, the global defaults, and overrides.
///
/// Missing provider credentials are not an error here: the engine skips
/// unconfigured sources and rejects operations that need them.
pub fn engine_config(
    config: &Config,
    profile: &Profile,
    profile_name: &str,
    overrides: &Overrides,
    lookup: &Lookup<'_>,
) -> Result<EngineConfig, ConfigError> {
    let domain = overrides
        .domain
        .as_deref()
        .unwrap_or(&profile.domain)
        .trim()
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if domain.is_empty() || !domain.contains('.') {
        return Err(ConfigError::Validation {
            field: "domain".into(),
            reason: if domain.is_empty() {
                format!("profile '{profile_name}' has no domain")
            } else {
                format!("'{domain}' is not a fully qualified domain")
            },
        });
    }

    let backup_dir = overrides
        .backup_dir
        .clone()
        .or_else(|| profile.backup_dir.clone())
        .or_else(|| config.defaults.backup_dir.clone())
        .unwrap_or_else(default_backup_dir);
    let archive_dir = profile
        .archive_dir
        .clone()
        .unwrap_or_else(|| backup_dir.join("archive"));

    let timeout = overrides
        .timeout
        .or(profile.timeout)
        .unwrap_or(config.defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least one second".into(),
        });
    }

    Ok(EngineConfig {
        cloudflare: lookup.cloudflare(profile, profile_name),
        canspace: lookup.canspace(profile, profile_name),
        domain,
        backup_dir,
        archive_dir,
        file_prefix: profile
            .file_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_owned()),
        retention_days: profile
            .retention_days
            .unwrap_or(config.defaults.retention_days),
        resolvers: profile.resolvers.clone().unwrap_or_default(),
        timeout: Duration::from_secs(timeout),
        insecure: overrides.insecure || profile.insecure.unwrap_or(false),
    })
}
