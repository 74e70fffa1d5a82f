//! DMARC policy record check (RFC 7489)
//!
//! The policy is published as a TXT record at `_dmarc.{domain}`. The checker
//! picks the record whose first tag is `v=DMARC1` among whatever TXT data
//! lives at that name, then validates the policy tags.

use super::parser::{leading_tag, parse_record, parse_tags, TagList, VersionTag};
use super::suggestion::{suggest, SuggestionContext};
use super::types::{FailureKind, RecordCheckResult, RecordKind};
use crate::utils::dns::{DnsErrorKind, TxtResolver};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// DMARC policy actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DmarcPolicy {
    /// No action (monitoring mode)
    None,
    /// Mark as spam but deliver
    Quarantine,
    /// Reject the message
    Reject,
}

impl DmarcPolicy {
    /// Parse a `p=`/`sp=` value, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Some(DmarcPolicy::None),
            "quarantine" => Some(DmarcPolicy::Quarantine),
            "reject" => Some(DmarcPolicy::Reject),
            _ => None,
        }
    }
}

impl std::fmt::Display for DmarcPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DmarcPolicy::None => write!(f, "none"),
            DmarcPolicy::Quarantine => write!(f, "quarantine"),
            DmarcPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// DMARC alignment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DmarcAlignment {
    /// Organizational domains must match
    Relaxed,
    /// Exact match required
    Strict,
}

impl DmarcAlignment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "r" => Some(DmarcAlignment::Relaxed),
            "s" => Some(DmarcAlignment::Strict),
            _ => None,
        }
    }
}

/// Validated view of a DMARC record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DmarcPolicyRecord {
    /// `p=`
    pub policy: DmarcPolicy,
    /// `sp=`, inherits `p=` when absent
    pub subdomain_policy: Option<DmarcPolicy>,
    /// `pct=`, 100 when absent
    pub percentage: u8,
    /// `adkim=`
    pub dkim_alignment: DmarcAlignment,
    /// `aspf=`
    pub spf_alignment: DmarcAlignment,
    /// `rua=`
    pub aggregate_report_uris: Vec<String>,
    /// `ruf=`
    pub forensic_report_uris: Vec<String>,
}

impl DmarcPolicyRecord {
    /// Validate parsed tags. The error names the offending tag.
    pub fn from_tags(tags: &TagList) -> Result<Self, String> {
        let policy = match tags.get("p") {
            Some(value) => DmarcPolicy::parse(value).ok_or_else(|| {
                format!(
                    "Invalid DMARC p tag value '{}': expected none, quarantine or reject",
                    value
                )
            })?,
            None => return Err("DMARC record is missing the required p tag".to_string()),
        };

        let subdomain_policy = match tags.get("sp") {
            Some(value) => Some(DmarcPolicy::parse(value).ok_or_else(|| {
                format!(
                    "Invalid DMARC sp tag value '{}': expected none, quarantine or reject",
                    value
                )
            })?),
            None => None,
        };

        let percentage = match tags.get("pct") {
            Some(value) => value
                .parse::<u8>()
                .ok()
                .filter(|pct| *pct <= 100)
                .ok_or_else(|| {
                    format!(
                        "Invalid DMARC pct tag value '{}': expected an integer from 0 to 100",
                        value
                    )
                })?,
            None => 100,
        };

        let dkim_alignment = parse_alignment(tags, "adkim")?;
        let spf_alignment = parse_alignment(tags, "aspf")?;
        let aggregate_report_uris = parse_report_uris(tags, "rua")?;
        let forensic_report_uris = parse_report_uris(tags, "ruf")?;

        Ok(Self {
            policy,
            subdomain_policy,
            percentage,
            dkim_alignment,
            spf_alignment,
            aggregate_report_uris,
            forensic_report_uris,
        })
    }
}

fn parse_alignment(tags: &TagList, tag: &str) -> Result<DmarcAlignment, String> {
    match tags.get(tag) {
        Some(value) => DmarcAlignment::parse(value).ok_or_else(|| {
            format!("Invalid DMARC {} tag value '{}': expected r or s", tag, value)
        }),
        None => Ok(DmarcAlignment::Relaxed),
    }
}

fn parse_report_uris(tags: &TagList, tag: &str) -> Result<Vec<String>, String> {
    let value = match tags.get(tag) {
        Some(value) => value,
        None => return Ok(Vec::new()),
    };

    let mut uris = Vec::new();
    for uri in value.split(',').map(str::trim) {
        let lower = uri.to_ascii_lowercase();
        let supported = ["mailto:", "https://", "http://"]
            .iter()
            .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len());
        if !supported {
            return Err(format!(
                "Invalid DMARC {} tag value '{}': expected mailto: or http(s) URIs",
                tag, value
            ));
        }
        uris.push(uri.to_string());
    }
    Ok(uris)
}

/// DMARC record checker
pub struct DmarcChecker {
    resolver: Arc<dyn TxtResolver>,
    report_mailbox: String,
}

impl DmarcChecker {
    pub fn new(resolver: Arc<dyn TxtResolver>, report_mailbox: impl Into<String>) -> Self {
        Self {
            resolver,
            report_mailbox: report_mailbox.into(),
        }
    }

    /// DMARC records are published at: _dmarc.{domain}
    pub fn lookup_hostname(domain: &str) -> String {
        format!("_dmarc.{}", domain)
    }

    /// Check the DMARC record of an already validated domain
    pub async fn check(&self, domain: &str) -> RecordCheckResult {
        let hostname = Self::lookup_hostname(domain);
        debug!("Looking up DMARC policy at: {}", hostname);

        let records = match self.resolver.resolve_txt(&hostname).await {
            Ok(records) if !records.is_empty() => records,
            Ok(_) | Err(DnsErrorKind::NotFound) => {
                info!("No DMARC record at {}", hostname);
                return self.not_found(
                    domain,
                    hostname.clone(),
                    FailureKind::RecordAbsent,
                    format!("No DMARC record found at {}", hostname),
                );
            }
            Err(DnsErrorKind::Timeout) => {
                warn!("DMARC lookup timed out for {}", hostname);
                return self.not_found(
                    domain,
                    hostname.clone(),
                    FailureKind::DnsTimeout,
                    format!("DNS query for {} timed out", hostname),
                );
            }
            Err(DnsErrorKind::ResolutionFailure(reason)) => {
                warn!("DMARC lookup failed for {}: {}", hostname, reason);
                return self.not_found(
                    domain,
                    hostname.clone(),
                    FailureKind::DnsResolutionFailure,
                    format!("DNS lookup for {} failed: {}", hostname, reason),
                );
            }
        };

        let candidates: Vec<&String> = records
            .iter()
            .filter(|record| {
                leading_tag(record).map_or(false, |(tag, value)| {
                    tag == VersionTag::DMARC.tag && value == VersionTag::DMARC.value
                })
            })
            .collect();

        let record = match candidates.as_slice() {
            [] => {
                let first = records[0].clone();
                warn!("No v=DMARC1 record among {} TXT record(s) at {}", records.len(), hostname);
                return self.rejected(
                    domain,
                    hostname.clone(),
                    first.clone(),
                    parse_tags(&first).ok(),
                    FailureKind::RecordMalformed,
                    format!(
                        "No TXT record at {} starts with {}",
                        hostname,
                        VersionTag::DMARC.prefix()
                    ),
                );
            }
            [single] => (*single).clone(),
            [first, ..] => {
                warn!("{} DMARC records published at {}", candidates.len(), hostname);
                return self.rejected(
                    domain,
                    hostname.clone(),
                    (*first).clone(),
                    parse_tags(first).ok(),
                    FailureKind::MultipleRecords,
                    format!(
                        "Multiple DMARC records found at {} ({}); exactly one is allowed",
                        hostname,
                        candidates.len()
                    ),
                );
            }
        };

        let tags = match parse_record(&record, &VersionTag::DMARC) {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Failed to parse DMARC record at {}: {}", hostname, e);
                return self.rejected(
                    domain,
                    hostname.clone(),
                    record,
                    None,
                    FailureKind::RecordMalformed,
                    format!("Malformed DMARC record at {}: {}", hostname, e),
                );
            }
        };

        match DmarcPolicyRecord::from_tags(&tags) {
            Ok(policy) => {
                info!("DMARC policy for {}: p={} pct={}", domain, policy.policy, policy.percentage);
                RecordCheckResult::valid(hostname, record, tags)
            }
            Err(reason) => {
                warn!("Invalid DMARC record at {}: {}", hostname, reason);
                self.rejected(
                    domain,
                    hostname,
                    record,
                    Some(tags),
                    FailureKind::RecordMalformed,
                    reason,
                )
            }
        }
    }

    fn suggestion(&self, domain: &str, hostname: &str, failure: FailureKind) -> Option<String> {
        suggest(
            RecordKind::Dmarc,
            &SuggestionContext {
                domain,
                lookup_hostname: hostname,
                failure,
                report_mailbox: &self.report_mailbox,
            },
        )
    }

    fn not_found(
        &self,
        domain: &str,
        hostname: String,
        failure: FailureKind,
        error: String,
    ) -> RecordCheckResult {
        let suggestion = self.suggestion(domain, &hostname, failure);
        RecordCheckResult::not_found(hostname, failure, error, suggestion)
    }

    fn rejected(
        &self,
        domain: &str,
        hostname: String,
        record: String,
        parsed: Option<TagList>,
        failure: FailureKind,
        error: String,
    ) -> RecordCheckResult {
        let suggestion = self.suggestion(domain, &hostname, failure).unwrap_or_default();
        RecordCheckResult::rejected(hostname, record, parsed, failure, error, suggestion)
    }
}
