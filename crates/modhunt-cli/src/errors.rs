//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use modhunt_core::HuntError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to install signal handlers: {0}")]
    Signals(io::Error),
    #[error("{0}")]
    Hunt(#[from] HuntError),
    #[error("failed to serialise report: {0}")]
    SerialiseReport(serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
