//! Error types emitted by the geostitch CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use geostitch::{RunError, SourceBuildError};
use geostitch_core::ParseDatasetKindError;
use thiserror::Error;

/// Errors emitted by the geostitch CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without the leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// An option holds a value the pipeline cannot use.
    #[error("invalid {field}: {reason}")]
    InvalidSetting {
        /// Flag name without the leading dashes.
        field: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
    /// The kinds list names something other than a dataset kind.
    #[error(transparent)]
    UnknownKind(#[from] ParseDatasetKindError),
    /// The async runtime could not be started.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Wiring the source connectors failed.
    #[error("failed to configure data sources: {0}")]
    BuildSources(#[from] SourceBuildError),
    /// The run finished without a harmonized result.
    #[error("run failed: {0}")]
    Run(#[from] RunError),
    /// Serializing the result failed.
    #[error("failed to serialize result: {0}")]
    SerializeResult(#[source] serde_json::Error),
    /// Writing the result to stdout failed.
    #[error("failed to write result: {0}")]
    WriteResult(#[source] std::io::Error),
    /// Writing the result file failed.
    #[error("failed to write result to {path:?}: {source}")]
    WriteOutputFile {
        /// Requested result path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}
