use thiserror::Error;

/// Operational errors of the crate.
///
/// Check outcomes (missing records, timeouts, malformed policies) are never
/// reported through this type; they are data inside
/// [`RecordCheckResult`](crate::authentication::RecordCheckResult).
#[derive(Error, Debug)]
pub enum DomainAuthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("DNS resolver setup failed: {0}")]
    ResolverSetup(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for DomainAuthError {
    fn from(err: config::ConfigError) -> Self {
        DomainAuthError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DomainAuthError>;
