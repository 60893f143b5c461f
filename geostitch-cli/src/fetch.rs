//! `fetch` command: acquire and harmonize the datasets of one area.

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use geostitch::{
    AcquisitionRequest, DatasetKind, HarmonizeConfig, Harmonizer, OrchestratorConfig, Pipeline,
    RunReport, SourceSettings, build_orchestrator,
};
use geostitch_data::http::RetryPolicy;
use geostitch_data::overpass::{DEFAULT_OVERPASS_RPS, DEFAULT_OVERPASS_URL};
use geostitch_data::wfs::DEFAULT_WFS_BASE_URL;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::logging::{DEFAULT_LOG_LEVEL, init_logging};
use crate::output::{write_output_file, write_report};
use crate::{
    ARG_AREA, ARG_KINDS, ARG_LOG_LEVEL, ARG_MAX_ATTEMPTS, ARG_OUTPUT, ARG_OVERPASS_RPS,
    ARG_OVERPASS_URL, ARG_TIMEOUT_SECS, ARG_WFS_BASE_URL, CliError, ENV_AREA,
};

/// Outer budget for a whole run.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// HTTP attempts per logical request.
pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// CLI arguments for the `fetch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch the boundary of an area and the requested dataset \
                 kinds, harmonize them into EPSG:25833 and write the result \
                 with its quality report as JSON. Settings can come from CLI \
                 flags, configuration files, or environment variables.",
    about = "Fetch and harmonize the datasets of one area"
)]
#[ortho_config(prefix = "GEOSTITCH")]
pub(crate) struct FetchArgs {
    /// Area name, e.g. a Berlin district such as "Pankow".
    #[arg(long = ARG_AREA, value_name = "name")]
    #[serde(default)]
    pub(crate) area: Option<String>,
    /// Comma-separated dataset kinds, e.g. "buildings,transit_stops".
    #[arg(long = ARG_KINDS, value_name = "list")]
    #[serde(default)]
    pub(crate) kinds: Option<String>,
    /// Write the result here instead of stdout.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Budget for the whole acquisition, in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// HTTP attempts per request, including the first.
    #[arg(long = ARG_MAX_ATTEMPTS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
    /// Request ceiling for the Overpass API, per second.
    #[arg(long = ARG_OVERPASS_RPS, value_name = "rate")]
    #[serde(default)]
    pub(crate) overpass_rps: Option<f64>,
    /// Root of the Geoportal WFS services.
    #[arg(long = ARG_WFS_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) wfs_base_url: Option<String>,
    /// Overpass interpreter endpoint.
    #[arg(long = ARG_OVERPASS_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_url: Option<String>,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long = ARG_LOG_LEVEL, value_name = "filter")]
    #[serde(default)]
    pub(crate) log_level: Option<String>,
}

impl FetchArgs {
    pub(crate) fn into_config(self) -> Result<FetchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FetchConfig::try_from(merged)
    }
}

/// Resolved `fetch` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FetchConfig {
    pub(crate) area: String,
    pub(crate) kinds: Vec<DatasetKind>,
    pub(crate) output: Option<Utf8PathBuf>,
    pub(crate) timeout: Duration,
    pub(crate) max_attempts: u32,
    pub(crate) overpass_rps: f64,
    pub(crate) wfs_base_url: String,
    pub(crate) overpass_url: String,
    pub(crate) log_level: String,
}

impl FetchConfig {
    pub(crate) fn request(&self) -> AcquisitionRequest {
        AcquisitionRequest::new(self.area.clone(), self.kinds.iter().copied())
    }

    pub(crate) fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            wfs_base_url: self.wfs_base_url.clone(),
            overpass_url: self.overpass_url.clone(),
            overpass_rps: self.overpass_rps,
            retry: RetryPolicy::default().with_max_attempts(self.max_attempts),
            orchestrator: OrchestratorConfig::default().with_run_timeout(self.timeout),
            ..SourceSettings::default()
        }
    }
}

impl TryFrom<FetchArgs> for FetchConfig {
    type Error = CliError;

    fn try_from(args: FetchArgs) -> Result<Self, Self::Error> {
        let area = args
            .area
            .map(|area| area.trim().to_owned())
            .filter(|area| !area.is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_AREA,
                env: ENV_AREA,
            })?;
        let kinds = parse_kinds(args.kinds.as_deref().unwrap_or_default())?;

        let timeout_secs = args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(CliError::InvalidSetting {
                field: ARG_TIMEOUT_SECS,
                reason: "must be at least one second",
            });
        }
        let max_attempts = args.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(CliError::InvalidSetting {
                field: ARG_MAX_ATTEMPTS,
                reason: "must allow at least one attempt",
            });
        }

        Ok(Self {
            area,
            kinds,
            output: args.output,
            timeout: Duration::from_secs(timeout_secs),
            max_attempts,
            overpass_rps: args.overpass_rps.unwrap_or(DEFAULT_OVERPASS_RPS),
            wfs_base_url: args
                .wfs_base_url
                .unwrap_or_else(|| DEFAULT_WFS_BASE_URL.to_owned()),
            overpass_url: args
                .overpass_url
                .unwrap_or_else(|| DEFAULT_OVERPASS_URL.to_owned()),
            log_level: args
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
        })
    }
}

/// Parse a comma-separated list of kind tags; blank entries are ignored.
pub(crate) fn parse_kinds(list: &str) -> Result<Vec<DatasetKind>, CliError> {
    list.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.parse().map_err(CliError::UnknownKind))
        .collect()
}

/// Builds the pipeline for the current fetch invocation.
pub(crate) trait PipelineBuilder {
    fn build(&self, config: &FetchConfig) -> Result<Pipeline, CliError>;
}

/// Production connectors against the configured endpoints.
pub(crate) struct DefaultPipelineBuilder;

impl PipelineBuilder for DefaultPipelineBuilder {
    fn build(&self, config: &FetchConfig) -> Result<Pipeline, CliError> {
        let orchestrator = build_orchestrator(&config.source_settings())?;
        Ok(Pipeline::new(
            orchestrator,
            Harmonizer::new(HarmonizeConfig::default()),
        ))
    }
}

pub(crate) fn run_fetch(args: FetchArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    init_logging(&config.log_level);
    let builder = DefaultPipelineBuilder;
    match &config.output {
        Some(path) => {
            let mut buffer = Vec::new();
            let outcome = run_fetch_with(&config, &builder, &mut buffer);
            if !buffer.is_empty() {
                write_output_file(path, &buffer)?;
                info!("wrote result to {path}");
            }
            outcome
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            run_fetch_with(&config, &builder, &mut stdout)
        }
    }
}

/// Run the pipeline, write the result and fail if the run produced none.
///
/// The result is written for failed runs too, so callers see the status and
/// skipped kinds alongside the error.
pub(crate) fn run_fetch_with(
    config: &FetchConfig,
    builder: &dyn PipelineBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let report = execute_fetch(config, builder)?;
    write_report(writer, &report)?;
    report.error.map_or(Ok(()), |err| Err(err.into()))
}

fn execute_fetch(
    config: &FetchConfig,
    builder: &dyn PipelineBuilder,
) -> Result<RunReport, CliError> {
    let pipeline = builder.build(config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let request = config.request();
    info!(
        "fetching {} kind(s) for {}",
        request.kinds.len(),
        request.area_name
    );
    Ok(runtime.block_on(pipeline.run(&request)))
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<FetchConfig, CliError> {
    let merged = FetchArgs::merge_from_layers(layers).map_err(CliError::from)?;
    FetchConfig::try_from(merged)
}
