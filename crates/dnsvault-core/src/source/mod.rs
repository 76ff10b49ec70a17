// ── Record sources ──
//
// A source is anything that can report the current record set for the
// domain: the two hosting providers, and the public-resolver lookup. Each
// adapter normalizes its own wire shape at this boundary.

pub mod canspace;
pub mod cloudflare;
pub mod normalize;
pub mod public;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

pub use canspace::CanspaceSource;
pub use cloudflare::CloudflareSource;
pub use dnsvault_api::Upsert;
pub use public::PublicSource;

use crate::error::CoreError;
use crate::model::Record;

/// The sources dnsvault knows about.
///
/// Declaration order is the unify order: when two sources report the same
/// `(type, name, value)`, the earlier one's TTL and priority survive.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Cloudflare,
    Canspace,
    /// Public resolvers. Older snapshots call this source `dig`.
    #[strum(to_string = "public", serialize = "dig")]
    #[serde(alias = "dig")]
    Public,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Whether records can be written back to this source.
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::Public)
    }
}

/// What one source returned.
#[derive(Debug, Clone)]
pub struct SourceFetch {
    pub kind: SourceKind,
    /// Provider records exactly as returned.
    pub payload: Vec<Value>,
    pub records: Vec<Record>,
    pub quarantined: usize,
}

/// A source of DNS records, optionally writable.
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch and normalize the current record set.
    async fn fetch(&self) -> Result<SourceFetch, CoreError>;

    /// Make `record` exist: update the record with the same type, name and
    /// value, or create it. Other values at the same name are left alone.
    async fn update_or_create(&self, record: &Record) -> Result<Upsert, CoreError>;

    /// Remove the record with the same type, name and value. `false` if
    /// there was none.
    async fn delete(&self, record: &Record) -> Result<bool, CoreError>;
}
