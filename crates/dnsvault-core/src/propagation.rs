// ── Propagation check ──
//
// Asks each public resolver on its own whether it already serves an
// expected value, so a change can be watched as it spreads.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use dnsvault_api::resolver::LOOKUP_TIMEOUT;
use dnsvault_api::{LookupAnswer, PublicResolver, rdata};
use serde::Serialize;

use crate::error::CoreError;
use crate::model::Record;
use crate::source::SourceKind;
use crate::source::normalize::split_priority;
use crate::source::public::normalize_answer;

/// Per-resolver lookups.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Answers of `record_type` for `name`, asking `server` alone.
    async fn resolve(
        &self,
        server: IpAddr,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<LookupAnswer>, CoreError>;
}

/// Live lookups over UDP, one resolver at a time.
pub struct ResolverLookup {
    timeout: Duration,
}

impl ResolverLookup {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ResolverLookup {
    fn default() -> Self {
        Self::new(LOOKUP_TIMEOUT)
    }
}

#[async_trait]
impl Resolve for ResolverLookup {
    async fn resolve(
        &self,
        server: IpAddr,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<LookupAnswer>, CoreError> {
        PublicResolver::new(&[server], self.timeout)
            .lookup(name, record_type)
            .await
            .map_err(|e| CoreError::provider(SourceKind::Public.as_str(), e))
    }
}

/// What one resolver returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverCheck {
    pub resolver: IpAddr,
    /// Normalized answers; MX and SRV lead with their priority.
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub matches: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    /// `None` when no value was given and no resolver answered.
    pub expected: Option<String>,
    pub resolvers: Vec<ResolverCheck>,
}

impl PropagationReport {
    pub fn propagated(&self) -> usize {
        self.resolvers.iter().filter(|r| r.matches).count()
    }

    pub fn total(&self) -> usize {
        self.resolvers.len()
    }

    /// Every resolver serves the expected value.
    pub fn is_complete(&self) -> bool {
        self.total() > 0 && self.propagated() == self.total()
    }
}

/// Ask every server in `servers` for `record_type`/`name`.
///
/// Without `expected`, the first value any resolver returns is taken as
/// the reference.
pub async fn check(
    resolve: &dyn Resolve,
    servers: &[IpAddr],
    record_type: &str,
    name: &str,
    expected: Option<&str>,
) -> PropagationReport {
    let record_type = record_type.trim().to_ascii_uppercase();

    let mut answered: Vec<(IpAddr, Vec<Record>, Option<String>)> = Vec::with_capacity(servers.len());
    for server in servers {
        match resolve.resolve(*server, name, &record_type).await {
            Ok(answers) => {
                let records = answers.iter().filter_map(|a| normalize_answer(a).ok()).collect();
                answered.push((*server, records, None));
            }
            Err(e) => answered.push((*server, Vec::new(), Some(e.to_string()))),
        }
    }

    let expected = expected.map(str::to_owned).or_else(|| {
        answered
            .iter()
            .find_map(|(_, records, _)| records.first().map(display_value))
    });

    let resolvers = answered
        .into_iter()
        .map(|(resolver, records, error)| ResolverCheck {
            resolver,
            matches: expected
                .as_deref()
                .is_some_and(|want| serves(&record_type, want, &records)),
            values: records.iter().map(display_value).collect(),
            error,
        })
        .collect();

    PropagationReport {
        record_type,
        name: name.to_owned(),
        expected,
        resolvers,
    }
}

fn display_value(record: &Record) -> String {
    match record.priority {
        Some(priority) => format!("{priority} {}", record.value),
        None => record.value.clone(),
    }
}

/// Whether `records` include `expected`. A leading priority on an MX or
/// SRV value must match too; without one any priority does.
fn serves(record_type: &str, expected: &str, records: &[Record]) -> bool {
    let (priority, value) = match record_type {
        "MX" | "SRV" => split_priority(expected),
        _ => (None, expected),
    };
    records.iter().any(|r| {
        rdata::same_value(record_type, &r.value, value) && priority.is_none_or(|p| r.priority == Some(p))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::net::Ipv4Addr;

    use pretty_assertions::assert_eq;

    use super::*;

    /// Canned answers per resolver; a missing resolver times out.
    struct Canned(HashMap<IpAddr, Vec<&'static str>>);

    #[async_trait]
    impl Resolve for Canned {
        async fn resolve(
            &self,
            server: IpAddr,
            name: &str,
            record_type: &str,
        ) -> Result<Vec<LookupAnswer>, CoreError> {
            let values = self.0.get(&server).ok_or_else(|| CoreError::Provider {
                provider: "public".into(),
                message: "request timed out".into(),
            })?;
            Ok(values
                .iter()
                .map(|v| LookupAnswer {
                    record_type: record_type.to_owned(),
                    name: format!("{name}."),
                    value: (*v).to_owned(),
                    ttl: 300,
                })
                .collect())
        }
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
    }

    #[tokio::test]
    async fn each_resolver_is_judged_on_its_own() {
        let resolve = Canned(HashMap::from([
            (ip(1), vec!["76.76.21.21"]),
            (ip(2), vec!["192.0.2.99"]),
            (ip(3), vec![]),
        ]));
        let servers = [ip(1), ip(2), ip(3), ip(4)];

        let report = check(&resolve, &servers, "a", "example.com", Some("76.76.21.21")).await;

        assert_eq!(report.record_type, "A");
        let matches: Vec<bool> = report.resolvers.iter().map(|r| r.matches).collect();
        assert_eq!(matches, [true, false, false, false]);
        assert_eq!(report.resolvers[1].values, ["192.0.2.99"]);
        assert!(report.resolvers[3].error.is_some());
        assert_eq!(report.propagated(), 1);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn first_answer_is_the_reference_when_none_is_given() {
        let resolve = Canned(HashMap::from([(ip(1), vec!["10 Mail.Example.com."]), (ip(2), vec!["10 mail.example.com."])]));

        let report = check(&resolve, &[ip(1), ip(2)], "MX", "example.com", None).await;

        assert_eq!(report.expected.as_deref(), Some("10 mail.example.com"));
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn mx_priority_must_match_when_given() {
        let resolve = Canned(HashMap::from([(ip(1), vec!["20 mail.example.com."])]));

        let strict = check(&resolve, &[ip(1)], "MX", "example.com", Some("10 mail.example.com")).await;
        let loose = check(&resolve, &[ip(1)], "MX", "example.com", Some("mail.example.com.")).await;

        assert!(!strict.is_complete());
        assert!(loose.is_complete());
    }

    #[tokio::test]
    async fn txt_quotes_do_not_matter() {
        let resolve = Canned(HashMap::from([(ip(1), vec!["\"v=spf1 -all\""])]));
        let report = check(&resolve, &[ip(1)], "TXT", "example.com", Some("v=spf1 -all")).await;
        assert!(report.is_complete());
    }
}
