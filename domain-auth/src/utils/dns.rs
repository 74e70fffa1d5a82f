//! DNS TXT lookups
//!
//! The checkers only see the [`TxtResolver`] trait, so tests can substitute a
//! fake and the production resolver is built once and passed in explicitly.
//!
//! # Failure mapping
//! - no TXT data at the name, or the name does not exist: [`DnsErrorKind::NotFound`]
//! - resolver or hard deadline timed out: [`DnsErrorKind::Timeout`]
//! - anything else: [`DnsErrorKind::ResolutionFailure`]

use crate::config::ResolverSettings;
use crate::error::{DomainAuthError, Result};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use trust_dns_resolver::config::{
    NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts,
};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::error::ProtoErrorKind;
use trust_dns_resolver::TokioAsyncResolver;

const DNS_PORT: u16 = 53;

/// Closed set of TXT lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsErrorKind {
    #[error("no TXT records found")]
    NotFound,

    #[error("DNS query timed out")]
    Timeout,

    #[error("DNS resolution failed: {0}")]
    ResolutionFailure(String),
}

/// TXT record source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TxtResolver: Send + Sync {
    /// Return every TXT record at `hostname`, each with its character-strings
    /// concatenated in the order the server returned them.
    async fn resolve_txt(&self, hostname: &str) -> std::result::Result<Vec<String>, DnsErrorKind>;
}

/// [`TxtResolver`] backed by trust-dns
pub struct DnsTxtResolver {
    resolver: TokioAsyncResolver,
    deadline: Duration,
}

impl DnsTxtResolver {
    /// Build a resolver from settings.
    ///
    /// Uses the configured nameservers when given, otherwise the system
    /// configuration, otherwise the library defaults. The response cache is
    /// disabled so every check queries DNS again.
    pub fn new(settings: &ResolverSettings) -> Result<Self> {
        if settings.timeout_secs == 0 || settings.attempts == 0 {
            return Err(DomainAuthError::ResolverSetup(
                "timeout and attempts must be greater than zero".to_string(),
            ));
        }

        let config = if settings.nameservers.is_empty() {
            match trust_dns_resolver::system_conf::read_system_conf() {
                Ok((config, _)) => config,
                Err(e) => {
                    warn!("Could not read system resolver configuration, using defaults: {}", e);
                    ResolverConfig::default()
                }
            }
        } else {
            let group = if settings.use_tcp {
                tcp_nameservers(&settings.nameservers)
            } else {
                NameServerConfigGroup::from_ips_clear(&settings.nameservers, DNS_PORT, true)
            };
            ResolverConfig::from_parts(None, vec![], group)
        };

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(settings.timeout_secs);
        opts.attempts = settings.attempts;
        opts.ndots = 0;
        opts.cache_size = 0;

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            deadline: Self::deadline_for(settings),
        })
    }

    /// Upper bound on a whole lookup, retries included
    pub fn deadline_for(settings: &ResolverSettings) -> Duration {
        let attempts = u64::try_from(settings.attempts).unwrap_or(u64::MAX);
        Duration::from_secs(
            settings
                .timeout_secs
                .saturating_mul(attempts)
                .saturating_add(1),
        )
    }
}

/// TCP-only nameserver group for the given addresses
fn tcp_nameservers(ips: &[IpAddr]) -> NameServerConfigGroup {
    let mut group = NameServerConfigGroup::with_capacity(ips.len());
    for ip in ips {
        let mut nameserver = NameServerConfig::new(SocketAddr::new(*ip, DNS_PORT), Protocol::Tcp);
        nameserver.trust_negative_responses = true;
        group.push(nameserver);
    }
    group
}

#[async_trait]
impl TxtResolver for DnsTxtResolver {
    async fn resolve_txt(&self, hostname: &str) -> std::result::Result<Vec<String>, DnsErrorKind> {
        let fqdn = to_fqdn(hostname);
        debug!("TXT lookup for {}", fqdn);

        let lookup = match tokio::time::timeout(self.deadline, self.resolver.txt_lookup(fqdn.as_str())).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => return Err(classify_error(&e)),
            Err(_) => {
                warn!("TXT lookup for {} exceeded {:?}", fqdn, self.deadline);
                return Err(DnsErrorKind::Timeout);
            }
        };

        let records: Vec<String> = lookup
            .iter()
            .map(|txt| {
                txt.iter()
                    .map(|data| String::from_utf8_lossy(data).to_string())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .collect();

        if records.is_empty() {
            debug!("No TXT records at {}", fqdn);
            return Err(DnsErrorKind::NotFound);
        }

        debug!("Found {} TXT record(s) at {}", records.len(), fqdn);
        Ok(records)
    }
}

/// Map a resolver error onto [`DnsErrorKind`]
fn classify_error(err: &ResolveError) -> DnsErrorKind {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            debug!("No records found ({})", response_code);
            DnsErrorKind::NotFound
        }
        ResolveErrorKind::Timeout => DnsErrorKind::Timeout,
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            DnsErrorKind::Timeout
        }
        _ => {
            warn!("TXT lookup failed: {}", err);
            DnsErrorKind::ResolutionFailure(err.to_string())
        }
    }
}

/// Append the root dot so search domains never apply
fn to_fqdn(hostname: &str) -> String {
    if hostname.ends_with('.') {
        hostname.to_string()
    } else {
        format!("{}.", hostname)
    }
}
