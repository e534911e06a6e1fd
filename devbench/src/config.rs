//! Command line arguments and benchmark settings.
//!
//! The workload shape is given as four positional arguments. Everything else has a default and
//! can be overridden in a YAML settings file passed via `-c`:
//!
//! ```yaml
//! remote: http://127.0.0.1:9966
//! batch_size: 2000
//! page_limit: 1000
//! progress_interval: 500000
//! poll_interval: 100ms
//! request_timeout: 30s
//! accounting: nominal
//! ```
//!
//! The `--remote` flag takes precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use logstore_client::{DEFAULT_PAGE_LIMIT, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use serde::Deserialize;

use crate::records::DEFAULT_BATCH_SIZE;

/// Default remote of the log storage service.
pub const DEFAULT_REMOTE: &str = "http://127.0.0.1:9966";

/// Number of records between two progress log lines of a worker.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 500_000;

/// Measure write and read throughput of a log storage service.
#[derive(Debug, FromArgs)]
pub struct Args {
    /// path to the yaml settings file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    /// remote service url, or `memory:` for an in-process store
    #[argh(option, short = 'r')]
    pub remote: Option<String>,

    /// number of client connections
    #[argh(positional, from_str_fn(parse_positive))]
    pub clients: u32,

    /// number of workers per client
    #[argh(positional, from_str_fn(parse_positive))]
    pub threads: u32,

    /// payload size of a record in bytes
    #[argh(positional, from_str_fn(parse_positive))]
    pub record_size: u32,

    /// number of records each worker writes and reads
    #[argh(positional, from_str_fn(parse_positive))]
    pub records: u32,
}

impl Args {
    /// Parses `args`, not including the command name.
    ///
    /// On failure, the returned [`EarlyExit`] carries the message to print. Its status is `Ok` only
    /// when help was requested.
    pub fn parse(command: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[command], args)
    }
}

fn parse_positive(value: &str) -> Result<u32, String> {
    let parsed: i64 = value
        .parse()
        .map_err(|err| format!("Could not parse `{value}` as integer: {err}"))?;

    if parsed < 1 {
        return Err(format!("Expecting positive value, got {parsed}"));
    }

    u32::try_from(parsed).map_err(|err| format!("Value {parsed} is out of range: {err}"))
}

/// How the bytes of a phase are counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accounting {
    /// Count the configured totals, whether or not workers failed.
    #[default]
    Nominal,
    /// Count only the records that were actually written or read.
    Delivered,
}

/// Tunables of a benchmark run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remote of the log storage service.
    pub remote: String,
    /// Number of records per written batch.
    pub batch_size: usize,
    /// Maximum number of events per query page.
    pub page_limit: usize,
    /// Number of records between two progress log lines. Zero disables progress logs.
    pub progress_interval: u64,
    /// Delay between polls while a reader waits for new events.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Timeout of a single request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How phase totals are computed.
    pub accounting: Accounting,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
            page_limit: DEFAULT_PAGE_LIMIT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_TIMEOUT,
            accounting: Accounting::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the optional file in `args` and applies command line overrides.
    pub fn load(args: &Args) -> Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(remote) = &args.remote {
            settings.remote = remote.clone();
        }

        Ok(settings)
    }

    /// Reads settings from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open settings file `{}`", path.display()))?;
        serde_yaml::from_reader(file).context("failed to parse settings YAML")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_positional_arguments() {
        let args = Args::parse("devbench", &["2", "3", "50", "1000"]).unwrap();

        assert_eq!(args.clients, 2);
        assert_eq!(args.threads, 3);
        assert_eq!(args.record_size, 50);
        assert_eq!(args.records, 1000);
        assert!(args.config.is_none());
    }

    #[test]
    fn rejects_zero() {
        let exit = Args::parse("devbench", &["0", "1", "100", "2000"]).unwrap_err();

        assert!(exit.status.is_err());
        assert!(exit.output.contains("Expecting positive value"));
    }

    #[test]
    fn rejects_non_numeric() {
        let exit = Args::parse("devbench", &["1", "two", "100", "2000"]).unwrap_err();

        assert!(exit.status.is_err());
        assert!(exit.output.contains("Could not parse `two`"));
    }

    #[test]
    fn rejects_wrong_arity() {
        let exit = Args::parse("devbench", &["1", "1", "100"]).unwrap_err();
        assert!(exit.status.is_err());

        let exit = Args::parse("devbench", &["1", "1", "100", "2000", "5"]).unwrap_err();
        assert!(exit.status.is_err());
    }

    #[test]
    fn remote_flag_overrides_default() {
        let args = Args::parse("devbench", &["-r", "memory:", "1", "1", "1", "1"]).unwrap();
        let settings = Settings::load(&args).unwrap();

        assert_eq!(settings.remote, "memory:");
        assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn reads_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "batch_size: 500\npoll_interval: 10ms\naccounting: delivered\nremote: http://logs:9966"
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let args = Args::parse("devbench", &["-c", path, "1", "1", "1", "1"]).unwrap();
        let settings = Settings::load(&args).unwrap();

        assert_eq!(
            settings,
            Settings {
                remote: "http://logs:9966".to_owned(),
                batch_size: 500,
                poll_interval: Duration::from_millis(10),
                accounting: Accounting::Delivered,
                ..Default::default()
            }
        );
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let path = "/nonexistent/devbench.yaml";
        let args = Args::parse("devbench", &["-c", path, "1", "1", "1", "1"]).unwrap();
        assert!(Settings::load(&args).is_err());
    }
}
