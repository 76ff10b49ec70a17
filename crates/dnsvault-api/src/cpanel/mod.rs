// cPanel UAPI DNS surface (the `canspace` provider).

mod client;
pub mod models;

pub use client::{CpanelClient, candidate_endpoints, qualify};
pub use models::{EntryKind, ZoneEntry, ZoneRecord};
