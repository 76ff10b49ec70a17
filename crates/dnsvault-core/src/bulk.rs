// ── Bulk updates ──
//
// An updates file is a JSON array of record changes applied to each
// writable provider in turn. Presets render the same shape, so a template
// can be edited and fed straight back to `bulk`.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::model::Record;
use crate::restore::{ApplyStatus, RecordOutcome};
use crate::source::normalize;
use crate::source::{Provider, SourceKind};

/// `source` recorded on records built from an updates file.
pub const BULK_SOURCE: &str = "bulk";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BulkAction {
    /// Update the record with the same type, name and value, or add it.
    #[default]
    #[serde(alias = "upsert", alias = "update")]
    Create,
    /// Remove the record with the same type, name and value.
    Delete,
}

/// One entry of an updates file.
///
/// `name` is zone-file style: `@` is the apex and bare labels are relative
/// to the domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdate {
    #[serde(default)]
    pub action: BulkAction,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl BulkUpdate {
    pub fn create(record_type: &str, name: &str, value: &str) -> Self {
        Self {
            action: BulkAction::Create,
            record_type: record_type.to_owned(),
            name: name.to_owned(),
            value: value.to_owned(),
            ttl: None,
            proxied: None,
            priority: None,
        }
    }

    pub fn delete(record_type: &str, name: &str, value: &str) -> Self {
        Self {
            action: BulkAction::Delete,
            ..Self::create(record_type, name, value)
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// The canonical record this entry refers to, named under `domain`.
    pub fn to_record(&self, domain: &str) -> Result<Record, CoreError> {
        let name = normalize::qualify_name(&self.name, domain);
        let mut record = normalize::build(
            &self.record_type,
            &name,
            &self.value,
            self.ttl,
            self.priority,
            BULK_SOURCE,
        )
        .map_err(|reason| CoreError::Config {
            message: format!("invalid update: {reason}"),
        })?;
        record.proxied = self.proxied;
        Ok(record)
    }
}

// ── Reports ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub action: BulkAction,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkTarget {
    pub provider: SourceKind,
    pub outcomes: Vec<BulkOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub dry_run: bool,
    /// Entries in the updates file.
    pub updates: usize,
    pub targets: Vec<BulkTarget>,
}

impl BulkReport {
    pub fn failures(&self) -> usize {
        self.outcomes().filter(|o| o.outcome.is_failure()).count()
    }

    pub fn applied(&self) -> usize {
        self.outcomes().filter(|o| o.outcome.status.is_write()).count()
    }

    pub fn attempted(&self) -> usize {
        self.outcomes().count()
    }

    fn outcomes(&self) -> impl Iterator<Item = &BulkOutcome> {
        self.targets.iter().flat_map(|t| &t.outcomes)
    }
}

// ── Apply ───────────────────────────────────────────────────────────

pub fn plan(changes: &[(BulkAction, Record)]) -> Vec<BulkOutcome> {
    changes
        .iter()
        .map(|(action, record)| BulkOutcome {
            action: *action,
            outcome: RecordOutcome {
                record: record.clone(),
                status: ApplyStatus::Planned,
            },
        })
        .collect()
}

/// Best-effort: every change is attempted, failures are collected.
pub async fn apply(provider: &dyn Provider, changes: &[(BulkAction, Record)]) -> Vec<BulkOutcome> {
    let destination = provider.kind();
    let mut outcomes = Vec::with_capacity(changes.len());
    for (action, record) in changes {
        let result = match action {
            BulkAction::Create => provider.update_or_create(record).await.map(ApplyStatus::from),
            BulkAction::Delete => provider.delete(record).await.map(|found| {
                if found {
                    ApplyStatus::Deleted
                } else {
                    ApplyStatus::Absent
                }
            }),
        };
        let status = match result {
            Ok(status) => {
                info!(%destination, %action, record = %record.key(), ?status, "applied update");
                status
            }
            Err(e) => {
                warn!(%destination, %action, record = %record.key(), error = %e, "update failed");
                ApplyStatus::Failed(e.to_string())
            }
        };
        outcomes.push(BulkOutcome {
            action: *action,
            outcome: RecordOutcome {
                record: record.clone(),
                status,
            },
        });
    }
    outcomes
}

// ── Templates ───────────────────────────────────────────────────────

/// Ready-made updates files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Preset {
    /// One of each kind of entry, to edit by hand.
    #[default]
    Sample,
    Vercel,
    GithubPages,
    GoogleWorkspace,
    Office365,
}

const GITHUB_PAGES_IPS: [&str; 4] = [
    "185.199.108.153",
    "185.199.109.153",
    "185.199.110.153",
    "185.199.111.153",
];

/// Render `preset` for `domain`. GitHub Pages needs the account name.
pub fn template(
    preset: Preset,
    domain: &str,
    github_user: Option<&str>,
) -> Result<Vec<BulkUpdate>, CoreError> {
    let updates = match preset {
        Preset::Sample => vec![
            BulkUpdate::create("A", "@", "192.0.2.10").with_ttl(3600),
            BulkUpdate::create("CNAME", "www", &format!("{domain}.")),
            BulkUpdate::create("MX", "@", &format!("mail.{domain}")).with_priority(10),
            BulkUpdate::create("TXT", "@", "v=spf1 mx -all"),
            BulkUpdate::delete("TXT", "@", "old-site-verification=replace-me"),
        ],
        Preset::Vercel => vec![
            BulkUpdate::create("A", "@", "76.76.21.21"),
            BulkUpdate::create("CNAME", "www", "cname.vercel-dns.com"),
        ],
        Preset::GithubPages => {
            let user = github_user
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| CoreError::Config {
                    message: "the github-pages template needs a GitHub user name".into(),
                })?;
            GITHUB_PAGES_IPS
                .iter()
                .map(|ip| BulkUpdate::create("A", "@", ip))
                .chain(std::iter::once(BulkUpdate::create(
                    "CNAME",
                    "www",
                    &format!("{user}.github.io"),
                )))
                .collect()
        }
        Preset::GoogleWorkspace => vec![
            BulkUpdate::create("MX", "@", "aspmx.l.google.com").with_priority(1),
            BulkUpdate::create("MX", "@", "alt1.aspmx.l.google.com").with_priority(5),
            BulkUpdate::create("MX", "@", "alt2.aspmx.l.google.com").with_priority(5),
            BulkUpdate::create("MX", "@", "alt3.aspmx.l.google.com").with_priority(10),
            BulkUpdate::create("MX", "@", "alt4.aspmx.l.google.com").with_priority(10),
            BulkUpdate::create("TXT", "@", "v=spf1 include:_spf.google.com ~all"),
        ],
        Preset::Office365 => vec![
            BulkUpdate::create(
                "MX",
                "@",
                &format!("{}.mail.protection.outlook.com", domain.replace('.', "-")),
            )
            .with_priority(0),
            BulkUpdate::create("TXT", "@", "v=spf1 include:spf.protection.outlook.com -all"),
        ],
    };
    Ok(updates)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn updates_file_defaults_to_create() {
        let updates: Vec<BulkUpdate> = serde_json::from_value(json!([
            {"type": "A", "name": "@", "value": "76.76.21.21"},
            {"action": "delete", "type": "TXT", "name": "@", "value": "old"},
            {"action": "upsert", "type": "MX", "name": "@", "value": "mail.example.com", "priority": 10}
        ]))
        .unwrap();

        assert_eq!(updates[0].action, BulkAction::Create);
        assert_eq!(updates[1].action, BulkAction::Delete);
        assert_eq!(updates[2].action, BulkAction::Create);
        assert_eq!(updates[2].priority, Some(10));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result: Result<Vec<BulkUpdate>, _> = serde_json::from_value(json!([
            {"action": "rename", "type": "A", "name": "@", "value": "192.0.2.1"}
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn records_are_named_under_the_domain() {
        let record = BulkUpdate::create("cname", "www", "Cname.Vercel-DNS.com.")
            .to_record("example.com")
            .unwrap();
        assert_eq!(record.record_type, "CNAME");
        assert_eq!(record.name, "www.example.com");
        assert_eq!(record.value, "cname.vercel-dns.com");
        assert_eq!(record.source, BULK_SOURCE);
    }

    #[test]
    fn empty_value_is_a_config_error() {
        let err = BulkUpdate::create("A", "@", " ").to_record("example.com").unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn office365_template_dashes_the_domain() {
        let updates = template(Preset::Office365, "leo.pvthostel.com", None).unwrap();
        assert_eq!(updates[0].value, "leo-pvthostel-com.mail.protection.outlook.com");
        assert_eq!(updates[0].priority, Some(0));
    }

    #[test]
    fn github_pages_template_needs_a_user() {
        assert!(template(Preset::GithubPages, "example.com", None).is_err());
        let updates = template(Preset::GithubPages, "example.com", Some("octocat")).unwrap();
        assert_eq!(updates.len(), 5);
        assert_eq!(updates[4].value, "octocat.github.io");
    }

    #[test]
    fn sample_template_reads_back_as_an_updates_file() {
        let sample = template(Preset::Sample, "example.com", None).unwrap();
        let text = serde_json::to_string_pretty(&sample).unwrap();
        let parsed: Vec<BulkUpdate> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, sample);
        assert!(parsed.iter().all(|u| u.to_record("example.com").is_ok()));
    }
}
