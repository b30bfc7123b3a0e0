//! Error types for the dry-run binary.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::scenario::ScenarioError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("failed to serialise setup report: {0}")]
    SerialiseReport(serde_json::Error),
    #[error("failed to emit setup report: {0}")]
    EmitReport(io::Error),
}
