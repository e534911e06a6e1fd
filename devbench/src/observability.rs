use std::env;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Installs the global tracing subscriber, logging to stderr.
///
/// Stdout is reserved for the benchmark report.
pub fn initialize_tracing() {
    let (level, env_filter) = parse_rust_log();
    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(format.with_filter(LevelFilter::from(level)))
        .with(env_filter)
        .init();
}

/// Reads `RUST_LOG` as a plain level if possible, as a full filter directive otherwise.
pub fn parse_rust_log() -> (Level, EnvFilter) {
    parse_log_filter(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

fn parse_log_filter(value: Option<&str>) -> (Level, EnvFilter) {
    let level = match value {
        Some(value) => match value.parse::<Level>() {
            Ok(level) => level,
            Err(_) => return (Level::TRACE, EnvFilter::new(value)),
        },
        None => Level::INFO,
    };

    // Upper bound for our own crates. The fmt layer narrows it down to `level`.
    let env_filter = EnvFilter::new("WARN,devbench=TRACE,logstore_client=TRACE");

    (level, env_filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info() {
        let (level, _) = parse_log_filter(None);
        assert_eq!(level, Level::INFO);
    }

    #[test]
    fn plain_level() {
        let (level, filter) = parse_log_filter(Some("debug"));
        assert_eq!(level, Level::DEBUG);
        let filter = filter.to_string().to_lowercase();
        assert!(filter.contains("devbench=trace"));
        assert!(filter.contains("logstore_client=trace"));
        assert!(!filter.contains("hyper"));
    }

    #[test]
    fn directives_are_used_literally() {
        let (level, filter) = parse_log_filter(Some("devbench::reader=debug"));
        assert_eq!(level, Level::TRACE);
        assert_eq!(filter.to_string().to_lowercase(), "devbench::reader=debug");
    }
}
