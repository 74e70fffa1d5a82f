//! Utility modules
//!
//! - [`dns`]: TXT lookups behind the [`TxtResolver`](dns::TxtResolver) trait
//! - [`domain`]: Domain name and DKIM selector syntax checks

pub mod dns;
pub mod domain;

pub use dns::{DnsErrorKind, DnsTxtResolver, TxtResolver};
pub use domain::{validate_domain, validate_selector};
