// ── Core error types ──
//
// User-facing errors from dnsvault-core. Provider failures carry the name
// of the source they came from so a partial backup can report which one
// was skipped. The CLI maps these onto diagnostics.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("No credentials configured for {provider}")]
    MissingCredentials { provider: String },

    #[error("Unknown provider or source: {name}")]
    UnknownProvider { name: String },

    // ── Provider errors ──────────────────────────────────────────────
    #[error("{provider} authentication failed: {message}")]
    Authentication { provider: String, message: String },

    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    #[error("{provider} cannot {operation}")]
    Unsupported { provider: String, operation: String },

    // ── Snapshot errors ──────────────────────────────────────────────
    #[error("Integrity check failed for {}: stored checksum {stored}, computed {computed}", path.display())]
    Integrity {
        path: PathBuf,
        stored: String,
        computed: String,
    },

    #[error("Malformed snapshot {}: {message}", path.display())]
    Snapshot { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Attach a provider name to a transport-layer error.
    pub fn provider(provider: impl Into<String>, err: dnsvault_api::Error) -> Self {
        let provider = provider.into();
        match err {
            dnsvault_api::Error::Authentication { message } => Self::Authentication { provider, message },
            dnsvault_api::Error::UnsupportedRecordType(rtype) => Self::Unsupported {
                provider,
                operation: format!("write {rtype} records"),
            },
            other if other.is_auth() => Self::Authentication {
                provider,
                message: other.to_string(),
            },
            other => Self::Provider {
                provider,
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn snapshot(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Configuration problems abort before any network call.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::MissingCredentials { .. } | Self::UnknownProvider { .. }
        )
    }
}
