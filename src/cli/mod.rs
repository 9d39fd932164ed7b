//! # Command line
//!
//! `petstore-probe` runs the scenario catalog against a live base URL or the
//! in-memory fake, prints a report and exits non-zero when anything failed.
//!
//! Settings resolve in layers: built-in defaults, then `--config` (JSON),
//! then environment variables and flags.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::scenario::Family;

fn parse_positive_usize(value: &str) -> std::result::Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> std::result::Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "petstore-probe",
    about = "Conformance and concurrency-stress harness for Petstore-style REST APIs",
    version
)]
pub struct Cli {
    #[arg(long, env = "PETSTORE_BASE_URL", help = "Base URL of the API under test.")]
    pub base_url: Option<String>,

    #[arg(
        long,
        env = "PETSTORE_TIMEOUT_MS",
        value_parser = parse_positive_u64,
        help = "Per-request timeout in milliseconds."
    )]
    pub timeout_ms: Option<u64>,

    #[arg(
        long,
        env = "PETSTORE_MAX_WORKERS",
        value_parser = parse_positive_usize,
        help = "Upper bound on concurrent dispatches in stress scenarios."
    )]
    pub max_workers: Option<usize>,

    #[arg(
        long,
        env = "PETSTORE_CONFIRM_RETRIES",
        help = "Extra attempts for read-after-write confirmation reads."
    )]
    pub confirm_retries: Option<u32>,

    #[arg(long, help = "Delay between confirmation attempts in milliseconds.")]
    pub confirm_delay_ms: Option<u64>,

    #[arg(long, action = ArgAction::SetTrue, help = "Stop after the first failing scenario.")]
    pub fail_fast: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Accept invalid TLS certificates.")]
    pub insecure: bool,

    #[arg(long, help = "JSON config file applied before flags and environment.")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        help = "Only run scenarios from these families."
    )]
    pub family: Vec<Family>,

    #[arg(long, help = "Only run scenarios whose family/name contains this text.")]
    pub filter: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Run against the built-in in-memory Petstore instead of a live server."
    )]
    pub in_memory: bool,

    #[arg(long, short, action = ArgAction::SetTrue, help = "Enable debug logging.")]
    pub verbose: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "List matching scenarios and exit.")]
    pub list: bool,
}

impl Cli {
    /// Resolve the effective configuration.
    pub fn to_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_workers) = self.max_workers {
            config.max_workers = max_workers;
        }
        if let Some(retries) = self.confirm_retries {
            config.confirm_retries = retries;
        }
        if let Some(delay) = self.confirm_delay_ms {
            config.confirm_delay_ms = delay;
        }
        config.fail_fast |= self.fail_fast;
        if self.insecure {
            config.verify_ssl = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "petstore-probe",
            "--base-url",
            "http://localhost:8080/v2",
            "--max-workers",
            "4",
            "--confirm-retries",
            "2",
            "--family",
            "pet,store",
            "--format",
            "json",
            "--insecure",
        ])
        .unwrap();

        let config = cli.to_config().unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v2");
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.confirm_retries, 2);
        assert!(!config.verify_ssl);
        assert_eq!(cli.family, vec![Family::Pet, Family::Store]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn zero_workers_is_rejected_at_parse_time() {
        let parsed = Cli::try_parse_from(["petstore-probe", "--max-workers", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn reports_only_go_to_stdout() {
        let parsed = Cli::try_parse_from(["petstore-probe", "--report", "run.json"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn config_file_sits_below_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeoutMs": 2500, "maxWorkers": 3}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli =
            Cli::try_parse_from(["petstore-probe", "--config", &path, "--max-workers", "7"])
                .unwrap();
        let config = cli.to_config().unwrap();

        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.max_workers, 7);
    }
}
