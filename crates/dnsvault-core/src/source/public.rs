// Public-resolver adapter. Answers arrive as presentation text, so MX and
// SRV carry their priority inline and TXT may still be quoted.

use async_trait::async_trait;
use dnsvault_api::{LookupAnswer, PublicResolver};
use tracing::debug;

use super::normalize::{self, Quarantine};
use super::{Provider, SourceFetch, SourceKind, Upsert};
use crate::error::CoreError;
use crate::model::Record;

pub struct PublicSource {
    domain: String,
    resolver: PublicResolver,
}

impl PublicSource {
    pub fn new(domain: impl Into<String>, resolver: PublicResolver) -> Self {
        Self {
            domain: domain.into(),
            resolver,
        }
    }
}

/// Map one resolver answer onto the canonical shape.
pub fn normalize_answer(answer: &LookupAnswer) -> Result<Record, Quarantine> {
    let record_type = answer.record_type.to_ascii_uppercase();
    let (priority, value) = match record_type.as_str() {
        "MX" | "SRV" => normalize::split_priority(&answer.value),
        _ => (None, answer.value.as_str()),
    };
    normalize::build(
        &record_type,
        &answer.name,
        value,
        Some(answer.ttl),
        priority,
        SourceKind::Public.as_str(),
    )
}

#[async_trait]
impl Provider for PublicSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Public
    }

    /// Never fails: lookups that error or find nothing contribute nothing.
    async fn fetch(&self) -> Result<SourceFetch, CoreError> {
        let answers = self.resolver.lookup_domain(&self.domain).await;

        let mut records = Vec::with_capacity(answers.len());
        let mut quarantined = 0;
        for answer in &answers {
            match normalize_answer(answer) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    quarantined += 1;
                    debug!(%reason, "quarantined resolver answer");
                }
            }
        }

        let payload = answers
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Internal(format!("re-encoding resolver answers: {e}")))?;

        Ok(SourceFetch {
            kind: SourceKind::Public,
            payload,
            records,
            quarantined,
        })
    }

    async fn update_or_create(&self, _record: &Record) -> Result<Upsert, CoreError> {
        Err(read_only())
    }

    async fn delete(&self, _record: &Record) -> Result<bool, CoreError> {
        Err(read_only())
    }
}

fn read_only() -> CoreError {
    CoreError::Unsupported {
        provider: SourceKind::Public.to_string(),
        operation: "write records (public resolvers are read-only)".into(),
    }
}
