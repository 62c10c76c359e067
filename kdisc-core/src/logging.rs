//! Subscriber setup for the `kdisc` binary and hosts that want the same output

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Crates whose events follow the configured level
const KDISC_TARGETS: [&str; 3] = ["kdisc", "kdisc_core", "kdisc_kubernetes"];

/// Install the global subscriber.
///
/// `RUST_LOG` replaces the configured filter entirely. Without it, discovery
/// crates log at `config.level` and everything else (HTTP stack included)
/// at `warn`.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(&config.level)?)?,
    };
    let writer = make_writer(config.file_path.as_deref())?;

    let (json_layer, pretty_layer) = if config.format.eq_ignore_ascii_case("json") {
        let layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .pretty()
            .with_file(false)
            .with_writer(writer);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")
}

/// `warn,kdisc=<level>,kdisc_core=<level>,kdisc_kubernetes=<level>`
fn default_directives(level: &str) -> anyhow::Result<String> {
    let level: LevelFilter = level
        .trim()
        .parse()
        .with_context(|| format!("Invalid log level: {level}"))?;

    let mut directives = vec![LevelFilter::WARN.to_string()];
    directives.extend(KDISC_TARGETS.iter().map(|target| format!("{target}={level}")));
    Ok(directives.join(",").to_lowercase())
}

/// Append to `file_path` when given, stdout otherwise
fn make_writer(file_path: Option<&str>) -> anyhow::Result<BoxMakeWriter> {
    let Some(path) = file_path else {
        return Ok(BoxMakeWriter::new(std::io::stdout));
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{path}'"))?;
    Ok(BoxMakeWriter::new(Arc::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives("debug").unwrap(),
            "warn,kdisc=debug,kdisc_core=debug,kdisc_kubernetes=debug"
        );
        assert_eq!(
            default_directives(" INFO ").unwrap(),
            "warn,kdisc=info,kdisc_core=info,kdisc_kubernetes=info"
        );
        assert!(EnvFilter::try_new(default_directives("trace").unwrap()).is_ok());
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let err = default_directives("loud").unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_file_writer_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kdisc.log");

        make_writer(path.to_str()).unwrap();
        assert!(path.exists());
        assert!(make_writer(None).is_ok());
        assert!(make_writer(dir.path().join("missing/kdisc.log").to_str()).is_err());
    }
}
