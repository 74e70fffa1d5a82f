use super::parser::TagList;
use serde::Serialize;

/// Error text shared by both checks when the domain itself is rejected
pub const INVALID_DOMAIN_MESSAGE: &str = "Invalid domain format.";

/// Error text for a DKIM check with an unusable selector
pub const INVALID_SELECTOR_MESSAGE: &str = "Invalid DKIM selector.";

/// Record kinds this crate checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    Dmarc,
    Dkim,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Dmarc => write!(f, "DMARC"),
            RecordKind::Dkim => write!(f, "DKIM"),
        }
    }
}

/// Why a record check did not pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Domain failed the syntax check, no DNS query issued
    InvalidDomainFormat,
    /// DKIM selector is empty or malformed, no DKIM query issued
    InvalidSelector,
    /// DNS answered without TXT data at the lookup name
    RecordAbsent,
    DnsTimeout,
    DnsResolutionFailure,
    /// TXT present but failed the grammar or semantic checks
    RecordMalformed,
    /// DKIM key published with an empty `p=`
    RecordRevoked,
    /// More than one qualifying DMARC record at the same name
    MultipleRecords,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::InvalidDomainFormat => write!(f, "invalid domain format"),
            FailureKind::InvalidSelector => write!(f, "invalid selector"),
            FailureKind::RecordAbsent => write!(f, "record absent"),
            FailureKind::DnsTimeout => write!(f, "DNS timeout"),
            FailureKind::DnsResolutionFailure => write!(f, "DNS resolution failure"),
            FailureKind::RecordMalformed => write!(f, "record malformed"),
            FailureKind::RecordRevoked => write!(f, "record revoked"),
            FailureKind::MultipleRecords => write!(f, "multiple records"),
        }
    }
}

/// Outcome of checking one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCheckResult {
    /// At least one TXT record was found at the lookup name
    pub present: bool,
    /// Present and passed validation for its type
    pub valid: bool,
    /// Raw TXT value that was evaluated
    pub record: Option<String>,
    /// Tags of `record`, when it parsed
    pub parsed: Option<TagList>,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    /// Name that was (or would have been) queried
    pub lookup_hostname: String,
    pub suggestion: Option<String>,
}

impl RecordCheckResult {
    /// Result for a domain rejected before any DNS query
    pub fn invalid_domain() -> Self {
        Self {
            present: false,
            valid: false,
            record: None,
            parsed: None,
            error: Some(INVALID_DOMAIN_MESSAGE.to_string()),
            failure: Some(FailureKind::InvalidDomainFormat),
            lookup_hostname: String::new(),
            suggestion: None,
        }
    }

    /// Passing result
    pub fn valid(lookup_hostname: String, record: String, parsed: TagList) -> Self {
        Self {
            present: true,
            valid: true,
            record: Some(record),
            parsed: Some(parsed),
            error: None,
            failure: None,
            lookup_hostname,
            suggestion: None,
        }
    }

    /// Nothing usable at the lookup name (absence, DNS failure, bad selector)
    pub fn not_found(
        lookup_hostname: String,
        failure: FailureKind,
        error: String,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            present: false,
            valid: false,
            record: None,
            parsed: None,
            error: Some(error),
            failure: Some(failure),
            lookup_hostname,
            suggestion,
        }
    }

    /// TXT data found but rejected
    pub fn rejected(
        lookup_hostname: String,
        record: String,
        parsed: Option<TagList>,
        failure: FailureKind,
        error: String,
        suggestion: String,
    ) -> Self {
        Self {
            present: true,
            valid: false,
            record: Some(record),
            parsed,
            error: Some(error),
            failure: Some(failure),
            lookup_hostname,
            suggestion: Some(suggestion),
        }
    }
}

/// Aggregate report for one domain/selector pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainAuthReport {
    /// Domain as supplied by the caller
    pub domain: String,
    /// Selector as supplied by the caller
    pub selector: String,
    pub dmarc: RecordCheckResult,
    pub dkim: RecordCheckResult,
}

impl DomainAuthReport {
    pub fn is_fully_valid(&self) -> bool {
        self.dmarc.valid && self.dkim.valid
    }

    pub fn result(&self, kind: RecordKind) -> &RecordCheckResult {
        match kind {
            RecordKind::Dmarc => &self.dmarc,
            RecordKind::Dkim => &self.dkim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::parser::parse_tags;

    #[test]
    fn test_invalid_domain_result() {
        let result = RecordCheckResult::invalid_domain();
        assert!(!result.present);
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Invalid domain format."));
        assert_eq!(result.lookup_hostname, "");
        assert!(result.suggestion.is_none());
    }

    #[test]
    fn test_valid_result_invariants() {
        let parsed = parse_tags("v=DMARC1; p=none").unwrap();
        let result = RecordCheckResult::valid(
            "_dmarc.example.com".to_string(),
            "v=DMARC1; p=none".to_string(),
            parsed,
        );
        assert!(result.present);
        assert!(result.parsed.is_some());
        assert!(result.error.is_none());
        assert!(result.failure.is_none());
        assert!(result.suggestion.is_none());
    }

    #[test]
    fn test_serialize_camel_case() {
        let result = RecordCheckResult::not_found(
            "_dmarc.example.com".to_string(),
            FailureKind::RecordAbsent,
            "No DMARC record found at _dmarc.example.com".to_string(),
            Some("publish one".to_string()),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["lookupHostname"], "_dmarc.example.com");
        assert_eq!(json["failure"], "recordAbsent");
        assert!(json["record"].is_null());
        assert!(json["parsed"].is_null());
    }

    #[test]
    fn test_record_kind_display() {
        assert_eq!(RecordKind::Dmarc.to_string(), "DMARC");
        assert_eq!(RecordKind::Dkim.to_string(), "DKIM");
    }
}
