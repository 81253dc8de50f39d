//! Diagnostic logging for the CLI.
//!
//! Events go to stderr so stdout carries only progress lines and the report.
//! The event format follows the configured [`modhunt_config::LogFormat`],
//! which by default matches the `--output` format.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

use modhunt_config::Config;

use crate::cli::OutputFormat;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring diagnostic logging.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter `{expression}`: {message}")]
    Filter {
        /// Expression as configured.
        expression: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another global subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(#[source] TryInitError),
}

/// Installs the stderr subscriber on first use; later calls keep the first
/// configuration.
pub(crate) fn initialise(config: &Config, output: OutputFormat) -> Result<(), TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            let filter = parse_filter(config.log_filter())?;
            let json = config
                .log_format()
                .emits_json(output == OutputFormat::Json);
            install(filter, json)
        })
        .map(|_| ())
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        expression: expression.to_owned(),
        message: error.to_string(),
    })
}

fn install(filter: EnvFilter, json: bool) -> Result<(), TelemetryError> {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(!json && io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_target(true);
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(layer.json().flatten_event(true)).try_init()
    } else {
        registry.with(layer.compact()).try_init()
    };
    installed.map_err(TelemetryError::Install)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("info")]
    #[case("warn,modhunt::process=debug")]
    fn accepts_filter_expressions(#[case] expression: &str) {
        assert!(parse_filter(expression).is_ok());
    }

    #[rstest]
    fn rejects_unknown_levels() {
        let err = parse_filter("modhunt=loud").expect_err("level should be rejected");
        assert!(err.to_string().starts_with("invalid log filter `modhunt=loud`"));
    }
}
