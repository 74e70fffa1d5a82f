//! CLI for checking a domain's DMARC and DKIM records
//!
//! # Usage
//!
//! ```bash
//! # Check one domain
//! domain-auth check example.com --selector google
//!
//! # Same, as JSON
//! domain-auth check example.com --selector google --json
//!
//! # Check every "domain[,selector]" line of a file
//! domain-auth batch domains.txt
//!
//! # Show the effective configuration
//! domain-auth --config domain-auth.toml config
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use domain_auth::config::LoggingConfig;
use domain_auth::report::{render_json, render_json_batch, render_text};
use domain_auth::{Config, DomainAuthChecker};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit code when at least one record is missing or invalid
const EXIT_CHECK_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "domain-auth")]
#[command(about = "Check DMARC and DKIM DNS records for a domain", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check one domain
    Check {
        /// Domain to check (e.g. example.com)
        domain: String,
        /// DKIM selector; defaults to check.default_selector
        #[arg(short, long)]
        selector: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check every "domain[,selector]" line of a file
    Batch {
        /// Input file, one domain per line
        file: PathBuf,
        /// Print the reports as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Check {
            domain,
            selector,
            json,
        } => {
            let checker = DomainAuthChecker::from_config(&config)?;
            let selector = selector.unwrap_or_else(|| config.check.default_selector.clone());

            let report = checker.check_domain_auth(&domain, &selector).await;

            if json {
                println!("{}", render_json(&report)?);
            } else {
                print!("{}", render_text(&report));
            }

            if !report.is_fully_valid() {
                std::process::exit(EXIT_CHECK_FAILED);
            }
        }
        Commands::Batch { file, json } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let requests = parse_batch(&content, &config.check.default_selector);
            info!("Checking {} domain(s) from {}", requests.len(), file.display());

            let checker = DomainAuthChecker::from_config(&config)?;
            let reports = checker.check_many(&requests).await;

            if json {
                println!("{}", render_json_batch(&reports)?);
            } else {
                for report in &reports {
                    println!("{}", render_text(report));
                }
                let passed = reports.iter().filter(|r| r.is_fully_valid()).count();
                println!("{}/{} domain(s) fully valid", passed, reports.len());
            }

            if reports.iter().any(|r| !r.is_fully_valid()) {
                std::process::exit(EXIT_CHECK_FAILED);
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays parseable
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.pretty().init(),
    }
}

/// Parse `domain[,selector]` lines; blank lines and `#` comments are skipped
fn parse_batch(content: &str, default_selector: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once(',') {
            Some((domain, selector)) => (domain.trim().to_string(), selector.trim().to_string()),
            None => (line.to_string(), default_selector.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch() {
        let content = "\
# domains to audit
example.com
example.org, google

  mail.example.net,s1
";
        let requests = parse_batch(content, "default");
        assert_eq!(
            requests,
            vec![
                ("example.com".to_string(), "default".to_string()),
                ("example.org".to_string(), "google".to_string()),
                ("mail.example.net".to_string(), "s1".to_string()),
            ]
        );
    }

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from(["domain-auth", "check", "example.com", "-s", "mail", "--json"]).unwrap();
        match cli.command {
            Commands::Check {
                domain,
                selector,
                json,
            } => {
                assert_eq!(domain, "example.com");
                assert_eq!(selector.as_deref(), Some("mail"));
                assert!(json);
            }
            _ => panic!("expected check command"),
        }
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli = Cli::try_parse_from(["domain-auth", "config", "--config", "a.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
        assert!(matches!(cli.command, Commands::Config));
    }
}
