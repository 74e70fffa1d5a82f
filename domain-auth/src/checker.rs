//! Domain-level DMARC + DKIM verification
//!
//! # Example
//! ```no_run
//! use domain_auth::{Config, DomainAuthChecker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let checker = DomainAuthChecker::from_config(&Config::default())?;
//!
//! let report = checker.check_domain_auth("example.com", "default").await;
//! if !report.dkim.valid {
//!     println!("{}", report.dkim.suggestion.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

use crate::authentication::{DkimChecker, DmarcChecker, DomainAuthReport, RecordCheckResult};
use crate::config::{CheckSettings, Config};
use crate::error::Result;
use crate::utils::dns::{DnsTxtResolver, TxtResolver};
use crate::utils::domain::validate_domain;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// Concurrent checks run by [`DomainAuthChecker::check_many`]
pub const MAX_CONCURRENT_CHECKS: usize = 8;

/// Runs the DMARC and DKIM checks for a domain and assembles the report.
///
/// Holds no mutable state; one instance can serve concurrent calls for
/// different domains.
pub struct DomainAuthChecker {
    dmarc: DmarcChecker,
    dkim: DkimChecker,
}

impl DomainAuthChecker {
    pub fn new(resolver: Arc<dyn TxtResolver>, settings: &CheckSettings) -> Self {
        Self {
            dmarc: DmarcChecker::new(Arc::clone(&resolver), settings.report_mailbox.clone()),
            dkim: DkimChecker::new(resolver),
        }
    }

    /// Build a checker backed by a real DNS resolver
    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver = DnsTxtResolver::new(&config.resolver)?;
        Ok(Self::new(Arc::new(resolver), &config.check))
    }

    /// Check DMARC and DKIM records for `domain`.
    ///
    /// Never fails: a malformed domain yields the invalid-domain report with
    /// no DNS traffic, and every DNS or record problem is carried inside the
    /// per-record results. Both lookups run concurrently and the report waits
    /// for both.
    ///
    /// `domain` and `selector` are used verbatim; surrounding whitespace or a
    /// trailing root dot makes the domain invalid.
    pub async fn check_domain_auth(&self, domain: &str, selector: &str) -> DomainAuthReport {
        if !validate_domain(domain) {
            warn!("Rejecting invalid domain {:?}", domain);
            return DomainAuthReport {
                domain: domain.to_string(),
                selector: selector.to_string(),
                dmarc: RecordCheckResult::invalid_domain(),
                dkim: RecordCheckResult::invalid_domain(),
            };
        }

        info!("Checking DMARC and DKIM for {} (selector {:?})", domain, selector);

        let (dmarc, dkim) = tokio::join!(
            self.dmarc.check(domain),
            self.dkim.check(domain, selector)
        );

        info!(
            "Finished {}: dmarc valid={} dkim valid={}",
            domain, dmarc.valid, dkim.valid
        );

        DomainAuthReport {
            domain: domain.to_string(),
            selector: selector.to_string(),
            dmarc,
            dkim,
        }
    }

    /// Check several domain/selector pairs, reports in input order
    pub async fn check_many(&self, requests: &[(String, String)]) -> Vec<DomainAuthReport> {
        stream::iter(requests)
            .map(|(domain, selector)| self.check_domain_auth(domain, selector))
            .buffered(MAX_CONCURRENT_CHECKS)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::FailureKind;
    use crate::utils::dns::{DnsErrorKind, MockTxtResolver};

    fn checker(mock: MockTxtResolver) -> DomainAuthChecker {
        DomainAuthChecker::new(Arc::new(mock), &CheckSettings::default())
    }

    #[tokio::test]
    async fn test_invalid_domains_issue_no_queries() {
        for domain in ["", ".example.com", "localhost", "exa mple.com", "-bad.example"] {
            let mut mock = MockTxtResolver::new();
            mock.expect_resolve_txt().never();
            let report = checker(mock).check_domain_auth(domain, "mail").await;

            for result in [&report.dmarc, &report.dkim] {
                assert!(!result.present);
                assert!(!result.valid);
                assert_eq!(result.error.as_deref(), Some("Invalid domain format."));
                assert_eq!(result.lookup_hostname, "");
                assert!(result.suggestion.is_none());
                assert_eq!(result.failure, Some(FailureKind::InvalidDomainFormat));
            }
        }
    }

    #[tokio::test]
    async fn test_both_checks_run() {
        let mut mock = MockTxtResolver::new();
        mock.expect_resolve_txt()
            .withf(|h: &str| h == "_dmarc.example.com")
            .times(1)
            .returning(|_| Ok(vec!["v=DMARC1; p=quarantine".to_string()]));
        mock.expect_resolve_txt()
            .withf(|h: &str| h == "mail._domainkey.example.com")
            .times(1)
            .returning(|_| Err(DnsErrorKind::NotFound));

        let report = checker(mock).check_domain_auth("example.com", "mail").await;

        assert!(report.dmarc.valid);
        assert!(!report.dkim.present);
        assert_eq!(report.dkim.lookup_hostname, "mail._domainkey.example.com");
        assert!(!report.is_fully_valid());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_other() {
        let mut mock = MockTxtResolver::new();
        mock.expect_resolve_txt()
            .withf(|h: &str| h == "_dmarc.example.org")
            .times(1)
            .returning(|_| Err(DnsErrorKind::Timeout));
        mock.expect_resolve_txt()
            .withf(|h: &str| h == "s1._domainkey.example.org")
            .times(1)
            .returning(|_| Ok(vec!["v=DKIM1; p=MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQ==".to_string()]));

        let report = checker(mock).check_domain_auth("example.org", "s1").await;

        assert_eq!(report.dmarc.failure, Some(FailureKind::DnsTimeout));
        assert!(report.dkim.valid);
    }

    #[tokio::test]
    async fn test_untrimmed_domains_are_invalid() {
        for domain in ["example.com.", " example.com", "example.com\n"] {
            let mut mock = MockTxtResolver::new();
            mock.expect_resolve_txt().never();
            let report = checker(mock).check_domain_auth(domain, "mail").await;

            assert_eq!(report.domain, domain);
            assert_eq!(report.dmarc.error.as_deref(), Some("Invalid domain format."));
            assert_eq!(report.dkim.error.as_deref(), Some("Invalid domain format."));
            assert_eq!(report.dmarc.lookup_hostname, "");
        }
    }

    #[tokio::test]
    async fn test_hostnames_use_input_verbatim() {
        let mut mock = MockTxtResolver::new();
        mock.expect_resolve_txt()
            .withf(|h: &str| h == "_dmarc.Example.COM")
            .times(1)
            .returning(|_| Err(DnsErrorKind::NotFound));
        mock.expect_resolve_txt()
            .withf(|h: &str| h == "Mail._domainkey.Example.COM")
            .times(1)
            .returning(|_| Err(DnsErrorKind::NotFound));

        let report = checker(mock).check_domain_auth("Example.COM", "Mail").await;

        assert_eq!(report.dmarc.lookup_hostname, "_dmarc.Example.COM");
        assert_eq!(report.dkim.lookup_hostname, "Mail._domainkey.Example.COM");
    }

    #[tokio::test]
    async fn test_empty_selector_only_affects_dkim() {
        let mut mock = MockTxtResolver::new();
        mock.expect_resolve_txt()
            .withf(|h: &str| h == "_dmarc.example.com")
            .times(1)
            .returning(|_| Ok(vec!["v=DMARC1; p=reject".to_string()]));

        let report = checker(mock).check_domain_auth("example.com", "").await;

        assert!(report.dmarc.valid);
        assert_eq!(report.dkim.failure, Some(FailureKind::InvalidSelector));
        assert_eq!(report.dkim.lookup_hostname, "._domainkey.example.com");
    }

    #[tokio::test]
    async fn test_check_many_preserves_order() {
        let mut mock = MockTxtResolver::new();
        mock.expect_resolve_txt()
            .returning(|_| Err(DnsErrorKind::NotFound));

        let requests = vec![
            ("a.example".to_string(), "x".to_string()),
            ("not valid".to_string(), "x".to_string()),
            ("b.example".to_string(), "y".to_string()),
        ];
        let reports = checker(mock).check_many(&requests).await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].dmarc.lookup_hostname, "_dmarc.a.example");
        assert_eq!(reports[1].dmarc.failure, Some(FailureKind::InvalidDomainFormat));
        assert_eq!(reports[2].dkim.lookup_hostname, "y._domainkey.b.example");
    }
}
