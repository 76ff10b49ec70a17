// dnsvault-api: Async clients for the DNS providers dnsvault backs up
// (Cloudflare v4, cPanel UAPI) and the public-resolver lookup.

pub mod cloudflare;
pub mod cpanel;
pub mod error;
pub mod rdata;
pub mod resolver;
pub mod transport;

pub use cloudflare::CloudflareClient;
pub use cpanel::CpanelClient;
pub use error::Error;
pub use resolver::{LookupAnswer, PublicResolver};
pub use transport::{TlsMode, TransportConfig};

/// Outcome of an idempotent write against a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The record with the same type, name and value was modified in place.
    Updated,
    /// No matching record existed, so one was added.
    Created,
}
