//! domain-auth: DMARC and DKIM DNS record verifier
//!
//! Given a domain and a DKIM selector, looks up the published DMARC policy
//! and DKIM key records over DNS, checks that they are well-formed, and
//! returns a report with remediation hints for whatever is missing or broken.
//!
//! # Features
//!
//! - **Domain checks**: syntax validation before any DNS traffic
//! - **DMARC**: `_dmarc.{domain}` policy parsing and validation (RFC 7489)
//! - **DKIM**: `{selector}._domainkey.{domain}` key record validation (RFC 6376)
//! - **Suggestions**: the TXT record to publish, and where
//! - **Concurrency**: both lookups run in parallel with bounded timeouts
//!
//! Signatures on live mail are not verified and SPF is not checked.
//!
//! # Example
//!
//! ```no_run
//! use domain_auth::{Config, DomainAuthChecker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = DomainAuthChecker::from_config(&Config::default())?;
//!     let report = checker.check_domain_auth("example.com", "google").await;
//!
//!     println!("{}", domain_auth::report::render_text(&report));
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`authentication`]: DMARC/DKIM checkers, record parser, suggestions
//! - [`checker`]: Orchestration of both checks into one report
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`report`]: Text and JSON rendering
//! - [`utils`]: DNS resolver and domain syntax helpers

pub mod authentication;
pub mod checker;
pub mod config;
pub mod error;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use authentication::{DomainAuthReport, FailureKind, RecordCheckResult};
pub use checker::DomainAuthChecker;
pub use config::Config;
pub use error::{DomainAuthError, Result};
pub use utils::dns::{DnsErrorKind, DnsTxtResolver, TxtResolver};
