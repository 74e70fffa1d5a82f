use crate::error::{DomainAuthError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

/// Environment variable prefix for overrides, e.g. `DOMAIN_AUTH__RESOLVER__TIMEOUT_SECS=3`
pub const ENV_PREFIX: &str = "DOMAIN_AUTH";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub check: CheckSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// DNS resolver settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResolverSettings {
    /// Per-query timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per query, handled by the resolver itself
    #[serde(default = "default_attempts")]
    pub attempts: usize,
    /// Upstream nameservers; empty means system configuration
    #[serde(default)]
    pub nameservers: Vec<IpAddr>,
    /// Query the configured nameservers over TCP instead of UDP
    #[serde(default)]
    pub use_tcp: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CheckSettings {
    /// Selector used by the CLI when none is given
    #[serde(default = "default_selector")]
    pub default_selector: String,
    /// Local part of the aggregate report address suggested for DMARC
    #[serde(default = "default_report_mailbox")]
    pub report_mailbox: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// One of `pretty`, `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_attempts() -> usize {
    2
}

fn default_selector() -> String {
    "default".to_string()
}

fn default_report_mailbox() -> String {
    "postmaster".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            attempts: default_attempts(),
            nameservers: Vec::new(),
            use_tcp: false,
        }
    }
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            default_selector: default_selector(),
            report_mailbox: default_report_mailbox(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolver: ResolverSettings::default(),
            check: CheckSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Read a TOML file as-is, without environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| DomainAuthError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Layer defaults, an optional TOML file and `DOMAIN_AUTH__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let layered = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("resolver.nameservers"),
            )
            .build()?;

        let config: Config = layered.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolver.timeout_secs == 0 {
            return Err(DomainAuthError::Config(
                "resolver.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.resolver.attempts == 0 {
            return Err(DomainAuthError::Config(
                "resolver.attempts must be greater than zero".to_string(),
            ));
        }
        if self.check.default_selector.trim().is_empty() {
            return Err(DomainAuthError::Config(
                "check.default_selector cannot be empty".to_string(),
            ));
        }
        if self.check.report_mailbox.trim().is_empty() {
            return Err(DomainAuthError::Config(
                "check.report_mailbox cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DomainAuthError::Config(format!("Failed to serialize config: {}", e)))
    }
}
