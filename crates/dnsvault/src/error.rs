//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text. Every failure exits with status 1.

use miette::Diagnostic;
use thiserror::Error;

use dnsvault_config::ConfigError;
use dnsvault_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Providers ────────────────────────────────────────────────────
    #[error("{provider} rejected the configured credentials")]
    #[diagnostic(
        code(dnsvault::auth_failed),
        help(
            "Check the token or password for {provider}.\n\
             Store a new one with: dnsvault config set-secret {secret}"
        )
    )]
    AuthFailed {
        provider: String,
        secret: String,
        #[source]
        source: CoreError,
    },

    #[error("No credentials configured for {provider}")]
    #[diagnostic(
        code(dnsvault::no_credentials),
        help(
            "Set {env_var}, add it to your profile, or run:\n\
             dnsvault config set-secret {secret}"
        )
    )]
    NoCredentials {
        provider: String,
        env_var: String,
        secret: String,
    },

    #[error("{message}")]
    #[diagnostic(code(dnsvault::provider))]
    Provider { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(dnsvault::unsupported),
        help("Only cloudflare and canspace accept writes; public resolvers are read-only.")
    )]
    Unsupported { message: String },

    // ── Snapshots ────────────────────────────────────────────────────
    #[error("Integrity check failed for {path}")]
    #[diagnostic(
        code(dnsvault::integrity),
        help(
            "Stored checksum:   {stored}\n\
             Computed checksum: {computed}\n\
             The file was modified after it was written. Use another snapshot."
        )
    )]
    Integrity {
        path: String,
        stored: String,
        computed: String,
    },

    #[error("Could not read snapshot")]
    #[diagnostic(
        code(dnsvault::snapshot),
        help("Run: dnsvault list to see available snapshots")
    )]
    Snapshot {
        #[source]
        source: CoreError,
    },

    #[error("{failed} of {total} records could not be applied")]
    #[diagnostic(
        code(dnsvault::partial_failure),
        help("The failed records are listed above. Re-run once the cause is fixed.")
    )]
    PartialFailure { failed: usize, total: usize },

    #[error("{pending} of {total} resolvers do not serve the expected value yet")]
    #[diagnostic(
        code(dnsvault::not_propagated),
        help("Resolvers cache answers for up to the record's TTL. Check again later.")
    )]
    NotPropagated { pending: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dnsvault::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(dnsvault::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: dnsvault config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No domain configured")]
    #[diagnostic(
        code(dnsvault::no_domain),
        help(
            "Create a profile with: dnsvault config init\n\
             Or pass --domain. Config expected at: {path}"
        )
    )]
    NoDomain { path: String },

    #[error(transparent)]
    #[diagnostic(code(dnsvault::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dnsvault::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Aborted")]
    #[diagnostic(code(dnsvault::aborted))]
    Aborted,

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(dnsvault::render))]
    Render(String),

    #[error(transparent)]
    #[diagnostic(code(dnsvault::internal))]
    Internal(CoreError),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    #[allow(clippy::unused_self)]
    pub fn exit_code(&self) -> i32 {
        exit_code::FAILURE
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

/// Keyring secret name and conventional env var for a provider.
fn secret_hints(provider: &str) -> (&'static str, &'static str) {
    match provider {
        "canspace" => ("canspace-password", "CANSPACE_USERNAME and CANSPACE_PASSWORD"),
        _ => ("cloudflare-token", "CLOUDFLARE_API_TOKEN"),
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingCredentials { provider } => {
                let (secret, env_var) = secret_hints(&provider);
                CliError::NoCredentials {
                    provider,
                    env_var: env_var.into(),
                    secret: secret.into(),
                }
            }

            CoreError::Authentication { ref provider, .. } => {
                let provider = provider.clone();
                let (secret, _) = secret_hints(&provider);
                CliError::AuthFailed {
                    provider,
                    secret: secret.into(),
                    source: err,
                }
            }

            CoreError::Provider { .. } => CliError::Provider {
                message: err.to_string(),
            },

            CoreError::Unsupported { .. } => CliError::Unsupported {
                message: err.to_string(),
            },

            CoreError::Integrity {
                path,
                stored,
                computed,
            } => CliError::Integrity {
                path: path.display().to_string(),
                stored,
                computed,
            },

            CoreError::Snapshot { .. } | CoreError::Io { .. } => CliError::Snapshot { source: err },

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },

            CoreError::UnknownProvider { name } => CliError::Validation {
                field: "provider".into(),
                reason: format!("unknown provider '{name}'"),
            },

            CoreError::Internal(_) => CliError::Internal(err),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_point_at_the_right_secret() {
        let err = CliError::from(CoreError::MissingCredentials {
            provider: "canspace".into(),
        });
        match err {
            CliError::NoCredentials { secret, .. } => assert_eq!(secret, "canspace-password"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn integrity_errors_keep_both_checksums() {
        let err = CliError::from(CoreError::Integrity {
            path: "snap.json".into(),
            stored: "aaa".into(),
            computed: "bbb".into(),
        });
        assert!(matches!(
            err,
            CliError::Integrity { ref stored, ref computed, .. } if stored == "aaa" && computed == "bbb"
        ));
        assert_eq!(err.exit_code(), exit_code::FAILURE);
    }
}
