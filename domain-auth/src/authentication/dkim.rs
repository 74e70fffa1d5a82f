//! DKIM key record check (RFC 6376)
//!
//! Keys are published as TXT records at `{selector}._domainkey.{domain}`.
//! Only presence and syntax of the key record are checked; no signature is
//! verified.

use super::parser::{parse_record, parse_tags, TagList, VersionTag};
use super::suggestion::{suggest, SuggestionContext};
use super::types::{FailureKind, RecordCheckResult, RecordKind, INVALID_SELECTOR_MESSAGE};
use crate::utils::dns::{DnsErrorKind, TxtResolver};
use crate::utils::domain::validate_selector;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// DKIM key algorithms (`k=`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DkimKeyType {
    Rsa,
    Ed25519,
}

impl DkimKeyType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "rsa" => Some(DkimKeyType::Rsa),
            "ed25519" => Some(DkimKeyType::Ed25519),
            _ => None,
        }
    }
}

impl std::fmt::Display for DkimKeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DkimKeyType::Rsa => write!(f, "rsa"),
            DkimKeyType::Ed25519 => write!(f, "ed25519"),
        }
    }
}

/// Why a key record was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DkimKeyError {
    MissingKey,
    /// `p=` present but empty
    Revoked,
    InvalidKey(String),
    UnsupportedKeyType(String),
}

/// Validated view of a DKIM key record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimKeyRecord {
    /// `k=`, rsa when absent
    pub key_type: DkimKeyType,
    /// `h=`, colon-separated; empty means any
    pub hash_algorithms: Vec<String>,
    /// `t=y`
    pub testing: bool,
    /// Decoded length of `p=` in bytes
    pub public_key_len: usize,
}

impl DkimKeyRecord {
    pub fn from_tags(tags: &TagList) -> Result<Self, DkimKeyError> {
        let key_type = match tags.get("k") {
            Some(value) => DkimKeyType::parse(value)
                .ok_or_else(|| DkimKeyError::UnsupportedKeyType(value.to_string()))?,
            None => DkimKeyType::Rsa,
        };

        let public_key = tags.get("p").ok_or(DkimKeyError::MissingKey)?;
        // Long keys are often split with whitespace across TXT strings
        let public_key: String = public_key.chars().filter(|c| !c.is_whitespace()).collect();
        if public_key.is_empty() {
            return Err(DkimKeyError::Revoked);
        }

        let decoded = STANDARD
            .decode(public_key.as_bytes())
            .map_err(|e| DkimKeyError::InvalidKey(e.to_string()))?;

        let hash_algorithms = tags
            .get("h")
            .map(|value| {
                value
                    .split(':')
                    .map(str::trim)
                    .filter(|alg| !alg.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let testing = tags
            .get("t")
            .map(|flags| flags.split(':').any(|flag| flag.trim().eq_ignore_ascii_case("y")))
            .unwrap_or(false);

        Ok(Self {
            key_type,
            hash_algorithms,
            testing,
            public_key_len: decoded.len(),
        })
    }
}

/// DKIM record checker
pub struct DkimChecker {
    resolver: Arc<dyn TxtResolver>,
}

impl DkimChecker {
    pub fn new(resolver: Arc<dyn TxtResolver>) -> Self {
        Self { resolver }
    }

    /// DKIM keys are published at: {selector}._domainkey.{domain}
    pub fn lookup_hostname(domain: &str, selector: &str) -> String {
        format!("{}._domainkey.{}", selector, domain)
    }

    /// Check the DKIM key record of an already validated domain.
    ///
    /// An empty or malformed selector is reported as
    /// [`FailureKind::InvalidSelector`] without querying DNS.
    pub async fn check(&self, domain: &str, selector: &str) -> RecordCheckResult {
        let hostname = Self::lookup_hostname(domain, selector);

        if !validate_selector(selector) {
            warn!("Invalid DKIM selector '{}' for {}", selector, domain);
            return RecordCheckResult::not_found(
                hostname,
                FailureKind::InvalidSelector,
                INVALID_SELECTOR_MESSAGE.to_string(),
                None,
            );
        }

        debug!("Looking up DKIM key at: {}", hostname);

        let records = match self.resolver.resolve_txt(&hostname).await {
            Ok(records) if !records.is_empty() => records,
            Ok(_) | Err(DnsErrorKind::NotFound) => {
                info!("No DKIM record at {}", hostname);
                return self.not_found(
                    domain,
                    hostname.clone(),
                    FailureKind::RecordAbsent,
                    format!("No DKIM record found at {}", hostname),
                );
            }
            Err(DnsErrorKind::Timeout) => {
                warn!("DKIM lookup timed out for {}", hostname);
                return self.not_found(
                    domain,
                    hostname.clone(),
                    FailureKind::DnsTimeout,
                    format!("DNS query for {} timed out", hostname),
                );
            }
            Err(DnsErrorKind::ResolutionFailure(reason)) => {
                warn!("DKIM lookup failed for {}: {}", hostname, reason);
                return self.not_found(
                    domain,
                    hostname.clone(),
                    FailureKind::DnsResolutionFailure,
                    format!("DNS lookup for {} failed: {}", hostname, reason),
                );
            }
        };

        let record = match select_key_record(&records) {
            Some(record) => record.clone(),
            None => {
                warn!("No DKIM key record among {} TXT record(s) at {}", records.len(), hostname);
                let first = records[0].clone();
                let parsed = parse_tags(&first).ok();
                return self.rejected(
                    domain,
                    hostname.clone(),
                    first,
                    parsed,
                    FailureKind::RecordMalformed,
                    format!(
                        "No DKIM key record at {}: expected {} and a p tag",
                        hostname,
                        VersionTag::DKIM.prefix()
                    ),
                );
            }
        };

        let tags = match parse_record(&record, &VersionTag::DKIM) {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Failed to parse DKIM record at {}: {}", hostname, e);
                return self.rejected(
                    domain,
                    hostname.clone(),
                    record,
                    None,
                    FailureKind::RecordMalformed,
                    format!("Malformed DKIM record at {}: {}", hostname, e),
                );
            }
        };

        match DkimKeyRecord::from_tags(&tags) {
            Ok(key) => {
                info!(
                    "DKIM key for {} at {}: k={} ({} bytes)",
                    domain, hostname, key.key_type, key.public_key_len
                );
                RecordCheckResult::valid(hostname, record, tags)
            }
            Err(err) => {
                let (failure, error) = match err {
                    DkimKeyError::Revoked => (
                        FailureKind::RecordRevoked,
                        format!("DKIM key revoked at {} (empty p tag)", hostname),
                    ),
                    DkimKeyError::MissingKey => (
                        FailureKind::RecordMalformed,
                        format!("DKIM record at {} is missing the required p tag", hostname),
                    ),
                    DkimKeyError::InvalidKey(reason) => (
                        FailureKind::RecordMalformed,
                        format!(
                            "DKIM p tag at {} is not a valid base64 public key: {}",
                            hostname, reason
                        ),
                    ),
                    DkimKeyError::UnsupportedKeyType(value) => (
                        FailureKind::RecordMalformed,
                        format!(
                            "Unsupported DKIM k tag value '{}' at {}: expected rsa or ed25519",
                            value, hostname
                        ),
                    ),
                };
                warn!("{}", error);
                self.rejected(domain, hostname, record, Some(tags), failure, error)
            }
        }
    }

    fn not_found(
        &self,
        domain: &str,
        hostname: String,
        failure: FailureKind,
        error: String,
    ) -> RecordCheckResult {
        let suggestion = suggest(
            RecordKind::Dkim,
            &SuggestionContext {
                domain,
                lookup_hostname: &hostname,
                failure,
                report_mailbox: "",
            },
        );
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
        let suggestion = suggest(
            RecordKind::Dkim,
            &SuggestionContext {
                domain,
                lookup_hostname: &hostname,
                failure,
                report_mailbox: "",
            },
        )
        .unwrap_or_default();
        RecordCheckResult::rejected(hostname, record, parsed, failure, error, suggestion)
    }
}

/// Prefer a record carrying `v=DKIM1`, then any record that parses and has `p=`
fn select_key_record(records: &[String]) -> Option<&String> {
    let parsed: Vec<TagList> = records
        .iter()
        .map(|record| parse_tags(record).unwrap_or_default())
        .collect();

    parsed
        .iter()
        .position(|tags| tags.get(VersionTag::DKIM.tag) == Some(VersionTag::DKIM.value))
        .or_else(|| parsed.iter().position(|tags| tags.contains("p")))
        .map(|index| &records[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::dns::MockTxtResolver;

    const KEY: &str = "bjQLnP+zepicpUTmu3gKLHiQHT+zNzh2hRGjBhevoB1L9RIvNEVUxTveLruM0rfj0WAK1jHDhaXXzOI8d4VFmtvBtMkA/+SNV1tdpcY4BAEl9l2w/j4kSUt26phkV9mGCE/tCLl4r019GWp0RqhrWACeY2thHbFiEbZamq3/KcXlLZxQjFAjRzRNjAc=";

    fn checker_with(
        hostname: &'static str,
        answer: std::result::Result<Vec<String>, DnsErrorKind>,
    ) -> DkimChecker {
        let mut mock = MockTxtResolver::new();
        mock.expect_resolve_txt()
            .withf(move |h: &str| h == hostname)
            .times(1)
            .returning(move |_| answer.clone());
        DkimChecker::new(Arc::new(mock))
    }

    fn txt(records: &[String]) -> std::result::Result<Vec<String>, DnsErrorKind> {
        Ok(records.to_vec())
    }

    #[test]
    fn test_key_record_defaults() {
        let tags = parse_tags(&format!("v=DKIM1; p={}", KEY)).unwrap();
        let key = DkimKeyRecord::from_tags(&tags).unwrap();
        assert_eq!(key.key_type, DkimKeyType::Rsa);
        assert!(key.hash_algorithms.is_empty());
        assert!(!key.testing);
        assert_eq!(key.public_key_len, 140);
    }

    #[test]
    fn test_key_record_optional_tags() {
        let tags = parse_tags(&format!("v=DKIM1; k=ed25519; h=sha256:sha1; t=y; p={}", KEY)).unwrap();
        let key = DkimKeyRecord::from_tags(&tags).unwrap();
        assert_eq!(key.key_type, DkimKeyType::Ed25519);
        assert_eq!(key.hash_algorithms, vec!["sha256", "sha1"]);
        assert!(key.testing);
    }

    #[test]
    fn test_key_with_embedded_whitespace() {
        let split = format!("{} {}", &KEY[..40], &KEY[40..]);
        let tags = parse_tags(&format!("v=DKIM1; p={}", split)).unwrap();
        assert!(DkimKeyRecord::from_tags(&tags).is_ok());
    }

    #[test]
    fn test_key_record_errors() {
        let missing = parse_tags("v=DKIM1; k=rsa").unwrap();
        assert_eq!(DkimKeyRecord::from_tags(&missing), Err(DkimKeyError::MissingKey));

        let revoked = parse_tags("v=DKIM1; p=").unwrap();
        assert_eq!(DkimKeyRecord::from_tags(&revoked), Err(DkimKeyError::Revoked));

        let garbage = parse_tags("v=DKIM1; p=not*base64!").unwrap();
        assert!(matches!(
            DkimKeyRecord::from_tags(&garbage),
            Err(DkimKeyError::InvalidKey(_))
        ));

        let dsa = parse_tags(&format!("v=DKIM1; k=dsa; p={}", KEY)).unwrap();
        assert_eq!(
            DkimKeyRecord::from_tags(&dsa),
            Err(DkimKeyError::UnsupportedKeyType("dsa".to_string()))
        );
    }

    #[tokio::test]
    async fn test_check_valid_key() {
        let record = format!("v=DKIM1; k=rsa; p={}", KEY);
        let checker = checker_with("mail._domainkey.example.com", txt(&[record.clone()]));
        let result = checker.check("example.com", "mail").await;

        assert!(result.present);
        assert!(result.valid);
        assert_eq!(result.record, Some(record));
        assert_eq!(result.parsed.as_ref().unwrap().get("k"), Some("rsa"));
        assert!(result.suggestion.is_none());
    }

    #[tokio::test]
    async fn test_check_without_version_tag() {
        let checker = checker_with(
            "google._domainkey.example.com",
            txt(&[format!("k=rsa; p={}", KEY)]),
        );
        let result = checker.check("example.com", "google").await;
        assert!(result.valid);
    }

    #[tokio::test]
    async fn test_check_version_tag_not_first() {
        let record = format!("k=rsa; v=DKIM1; p={}", KEY);
        let checker = checker_with("mail._domainkey.example.com", txt(&[record.clone()]));
        let result = checker.check("example.com", "mail").await;

        assert!(result.valid);
        assert_eq!(result.record, Some(record));
        assert_eq!(result.parsed.as_ref().unwrap().get("v"), Some("DKIM1"));
    }

    #[tokio::test]
    async fn test_check_absent() {
        let checker = checker_with("mail._domainkey.example.com", Err(DnsErrorKind::NotFound));
        let result = checker.check("example.com", "mail").await;

        assert!(!result.present);
        assert!(!result.valid);
        assert_eq!(result.lookup_hostname, "mail._domainkey.example.com");
        assert!(result.error.unwrap().contains("mail._domainkey.example.com"));
        let suggestion = result.suggestion.unwrap();
        assert!(suggestion.contains("TXT record"));
        assert!(suggestion.contains("DKIM"));
    }

    #[tokio::test]
    async fn test_check_revoked_key() {
        let checker = checker_with(
            "old._domainkey.example.com",
            txt(&["v=DKIM1; k=rsa; p=".to_string()]),
        );
        let result = checker.check("example.com", "old").await;

        assert!(result.present);
        assert!(!result.valid);
        assert_eq!(result.failure, Some(FailureKind::RecordRevoked));
        assert!(result.error.unwrap().contains("key revoked"));
        assert!(result.suggestion.unwrap().contains("revoked"));
    }

    #[tokio::test]
    async fn test_check_wrong_version() {
        let checker = checker_with(
            "mail._domainkey.example.com",
            txt(&[format!("v=DKIM2; p={}", KEY)]),
        );
        let result = checker.check("example.com", "mail").await;

        assert!(result.present);
        assert!(!result.valid);
        assert_eq!(result.failure, Some(FailureKind::RecordMalformed));
    }

    #[tokio::test]
    async fn test_check_timeout() {
        let checker = checker_with("mail._domainkey.example.com", Err(DnsErrorKind::Timeout));
        let result = checker.check("example.com", "mail").await;

        assert!(!result.present);
        assert_eq!(result.failure, Some(FailureKind::DnsTimeout));
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_selector_skips_dns() {
        let mut mock = MockTxtResolver::new();
        mock.expect_resolve_txt().never();
        let checker = DkimChecker::new(Arc::new(mock));

        let result = checker.check("example.com", "").await;
        assert_eq!(result.lookup_hostname, "._domainkey.example.com");
        assert_eq!(result.failure, Some(FailureKind::InvalidSelector));
        assert_eq!(result.error.as_deref(), Some("Invalid DKIM selector."));
        assert!(result.suggestion.is_none());
        assert!(!result.present);
    }

    #[test]
    fn test_select_prefers_versioned_record() {
        let records = vec![
            "some-verification=xyz".to_string(),
            format!("k=rsa; p={}", KEY),
            format!("v=DKIM1; p={}", KEY),
        ];
        assert_eq!(select_key_record(&records), Some(&records[2]));

        let unversioned = vec!["site=abc".to_string(), format!("k=rsa; p={}", KEY)];
        assert_eq!(select_key_record(&unversioned), Some(&unversioned[1]));

        let late_version = vec![format!("k=rsa; p={}", KEY), format!("k=rsa; v=DKIM1; p={}", KEY)];
        assert_eq!(select_key_record(&late_version), Some(&late_version[1]));

        let none = vec!["hello world".to_string()];
        assert_eq!(select_key_record(&none), None);
    }
}
