// Public-resolver lookups.
//
// Queries a fixed set of record types for a domain directly against public
// recursive resolvers. Needs no provider credentials, so it acts as a
// provider-independent view of what the world currently sees.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::rr::RecordType;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Error;

/// Google, Cloudflare, Quad9, OpenDNS.
pub const DEFAULT_RESOLVERS: [IpAddr; 4] = [
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
    IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)),
    IpAddr::V4(Ipv4Addr::new(208, 67, 222, 222)),
];

/// Record types queried on the apex.
pub const QUERY_TYPES: [&str; 7] = ["A", "AAAA", "CNAME", "MX", "TXT", "SRV", "CAA"];

pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// One answer as presentation-format text, e.g. `10 mail.example.com.` for MX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupAnswer {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub value: String,
    pub ttl: u32,
}

pub struct PublicResolver {
    resolver: TokioAsyncResolver,
}

impl PublicResolver {
    /// Build a resolver that only talks to `servers` over UDP port 53.
    pub fn new(servers: &[IpAddr], timeout: Duration) -> Self {
        let mut config = ResolverConfig::new();
        for ip in servers {
            config.add_name_server(NameServerConfig::new(SocketAddr::new(*ip, 53), Protocol::Udp));
        }

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }

    /// Answers of exactly `record_type` for `name`. "No records" is an empty list.
    pub async fn lookup(&self, name: &str, record_type: &str) -> Result<Vec<LookupAnswer>, Error> {
        let rtype: RecordType = record_type
            .to_uppercase()
            .parse()
            .map_err(|e| Error::Resolver(format!("unknown record type {record_type}: {e}")))?;

        debug!(name, record_type = %rtype, "querying public resolvers");
        let lookup = match self.resolver.lookup(name, rtype).await {
            Ok(lookup) => lookup,
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::Resolver(e.to_string())),
        };

        Ok(lookup
            .record_iter()
            .filter(|record| record.record_type() == rtype)
            .filter_map(|record| {
                record.data().map(|rdata| LookupAnswer {
                    record_type: rtype.to_string(),
                    name: record.name().to_string(),
                    value: rdata.to_string(),
                    ttl: record.ttl(),
                })
            })
            .collect())
    }

    /// Query every type in `QUERY_TYPES` on `domain`, plus CNAME on `www.<domain>`.
    ///
    /// Never fails: a lookup error is logged and contributes nothing.
    pub async fn lookup_domain(&self, domain: &str) -> Vec<LookupAnswer> {
        let www = format!("www.{domain}");
        let queries = QUERY_TYPES
            .iter()
            .map(|rtype| (domain, *rtype))
            .chain(std::iter::once((www.as_str(), "CNAME")));

        let mut answers = Vec::new();
        for (name, rtype) in queries {
            match self.lookup(name, rtype).await {
                Ok(found) => answers.extend(found),
                Err(e) => warn!(name, record_type = rtype, error = %e, "public lookup failed"),
            }
        }
        debug!(domain, count = answers.len(), "public lookup complete");
        answers
    }
}

impl Default for PublicResolver {
    fn default() -> Self {
        Self::new(&DEFAULT_RESOLVERS, LOOKUP_TIMEOUT)
    }
}
