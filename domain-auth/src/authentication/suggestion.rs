//! Remediation text for failed checks
//!
//! Output depends only on the inputs, so identical failures always produce
//! identical text.

use super::types::{FailureKind, RecordKind};

/// What the suggestion is about
#[derive(Debug, Clone, Copy)]
pub struct SuggestionContext<'a> {
    /// Normalized domain being checked
    pub domain: &'a str,
    /// Exact name the record belongs at
    pub lookup_hostname: &'a str,
    pub failure: FailureKind,
    /// Local part for the suggested `rua=` address
    pub report_mailbox: &'a str,
}

/// Minimal monitoring-mode DMARC record for `domain`
pub fn recommended_dmarc_record(domain: &str, report_mailbox: &str) -> String {
    format!("v=DMARC1; p=none; rua=mailto:{}@{}", report_mailbox, domain)
}

/// Remediation text, or `None` when nothing DNS-side would help
pub fn suggest(kind: RecordKind, ctx: &SuggestionContext<'_>) -> Option<String> {
    match ctx.failure {
        FailureKind::InvalidDomainFormat | FailureKind::InvalidSelector => None,
        _ => Some(match kind {
            RecordKind::Dmarc => suggest_dmarc(ctx),
            RecordKind::Dkim => suggest_dkim(ctx),
        }),
    }
}

fn suggest_dmarc(ctx: &SuggestionContext<'_>) -> String {
    let record = recommended_dmarc_record(ctx.domain, ctx.report_mailbox);
    let rationale = "Start in monitoring mode (p=none), review the aggregate reports, then move to p=quarantine or p=reject.";

    match ctx.failure {
        FailureKind::MultipleRecords => format!(
            "Keep exactly one TXT record starting with v=DMARC1 at {} and delete the others; receivers ignore DMARC when several are published. If unsure, keep: {}",
            ctx.lookup_hostname, record
        ),
        FailureKind::RecordMalformed => format!(
            "Replace the TXT record at {} with a valid DMARC policy such as: {}. {}",
            ctx.lookup_hostname, record, rationale
        ),
        FailureKind::DnsTimeout | FailureKind::DnsResolutionFailure => format!(
            "The DNS query for {} did not complete; check that the authoritative nameservers for {} respond. If no DMARC policy is published yet, add a TXT record at {} with value: {}",
            ctx.lookup_hostname, ctx.domain, ctx.lookup_hostname, record
        ),
        _ => format!(
            "Publish a TXT record at {} with value: {}. {}",
            ctx.lookup_hostname, record, rationale
        ),
    }
}

fn suggest_dkim(ctx: &SuggestionContext<'_>) -> String {
    match ctx.failure {
        FailureKind::RecordRevoked => format!(
            "The DKIM key at {} is revoked (empty p=). Generate a new DKIM key pair with your mail provider and publish the provider-issued TXT record at {}, or sign with a different selector.",
            ctx.lookup_hostname, ctx.lookup_hostname
        ),
        FailureKind::RecordMalformed => format!(
            "The DKIM TXT record at {} is not a valid key record. Copy the exact TXT record issued by your mail provider (v=DKIM1; k=rsa; p=<public key>) and publish it at {}.",
            ctx.lookup_hostname, ctx.lookup_hostname
        ),
        FailureKind::DnsTimeout | FailureKind::DnsResolutionFailure => format!(
            "The DNS query for {} did not complete; check that the authoritative nameservers for {} respond. If DKIM is not set up yet, generate a key pair with your mail provider and publish its TXT record at {}.",
            ctx.lookup_hostname, ctx.domain, ctx.lookup_hostname
        ),
        _ => format!(
            "Generate a DKIM key pair with your mail provider and publish the provider-issued TXT record at {}. The value looks like: v=DKIM1; k=rsa; p=<public key>.",
            ctx.lookup_hostname
        ),
    }
}
