// Cloudflare v4 DNS surface: zone lookup and record CRUD.

mod client;
pub mod models;

pub use client::{CLOUDFLARE_API, CloudflareClient, base_domain};
pub use models::{DnsRecord, NewRecord, RecordPatch, Zone};
