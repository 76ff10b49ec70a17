//! CLI configuration -- thin wrapper around `dnsvault_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--profile,
//! --domain, --backup-dir, ...) on top of the shared loader.

use std::path::PathBuf;

use dnsvault_config::{ConfigError, Lookup, Overrides};
use dnsvault_core::EngineConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use dnsvault_config::{Config, Profile};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file in effect: `--config`, else the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(dnsvault_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(dnsvault_config::load_config_from(&config_path(global))?)
}

pub fn save_config(global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    Ok(dnsvault_config::save_config_to(cfg, &config_path(global))?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Translate the active profile + global flags into an `EngineConfig`.
///
/// An explicitly requested profile must exist. Without one, flags and
/// conventional environment variables alone can drive the engine.
pub fn resolve_engine_config(global: &GlobalOpts) -> Result<EngineConfig, CliError> {
    let cfg = load_config(global)?;
    let profile_name = active_profile_name(global, &cfg);

    let overrides = Overrides {
        domain: global.domain.clone(),
        backup_dir: global.backup_dir.clone(),
        timeout: global.timeout,
        insecure: global.insecure,
    };

    let result = match cfg.profile(&profile_name) {
        Ok(profile) => dnsvault_config::engine_config(
            &cfg,
            profile,
            &profile_name,
            &overrides,
            &Lookup::system(),
        ),
        Err(err) if global.profile.is_some() => return Err(err.into()),
        // Keyring entries are per profile, so only the environment applies.
        Err(_) => dnsvault_config::engine_config(
            &cfg,
            &Profile::default(),
            &profile_name,
            &overrides,
            &Lookup::env_only(),
        ),
    };

    result.map_err(|err| match err {
        ConfigError::Validation { ref field, .. } if field == "domain" && global.domain.is_none() => {
            CliError::NoDomain {
                path: config_path(global).display().to_string(),
            }
        }
        other => other.into(),
    })
}
