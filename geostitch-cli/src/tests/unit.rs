//! Focused unit tests covering fetch CLI configuration.

use super::*;
use crate::fetch::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS, FetchArgs, FetchConfig,
    config_from_layers_for_test, parse_kinds,
};
use crate::logging::DEFAULT_LOG_LEVEL;
use geostitch::DatasetKind;
use geostitch_data::overpass::{DEFAULT_OVERPASS_RPS, DEFAULT_OVERPASS_URL};
use geostitch_data::wfs::DEFAULT_WFS_BASE_URL;
use ortho_config::MergeComposer;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

#[rstest]
#[case(None)]
#[case(Some(String::new()))]
#[case(Some("   ".to_owned()))]
fn converting_without_area_errors(#[case] area: Option<String>) {
    let args = FetchArgs {
        area,
        kinds: Some("buildings".to_owned()),
        ..FetchArgs::default()
    };
    let err = FetchConfig::try_from(args).expect_err("missing area should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_AREA);
            assert_eq!(env, ENV_AREA);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn fetch_config_applies_defaults() {
    let args = FetchArgs {
        area: Some(" Pankow ".to_owned()),
        ..FetchArgs::default()
    };
    let config = FetchConfig::try_from(args).expect("config should build");
    assert_eq!(config.area, "Pankow");
    assert!(config.kinds.is_empty());
    assert_eq!(config.output, None);
    assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    assert_eq!(config.timeout, Duration::from_secs(300));
    assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert!((config.overpass_rps - DEFAULT_OVERPASS_RPS).abs() < f64::EPSILON);
    assert_eq!(config.wfs_base_url, DEFAULT_WFS_BASE_URL);
    assert_eq!(config.overpass_url, DEFAULT_OVERPASS_URL);
    assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
}

#[rstest]
#[case("", vec![])]
#[case("buildings", vec![DatasetKind::Buildings])]
#[case(
    " buildings, transit-stops,,",
    vec![DatasetKind::Buildings, DatasetKind::TransitStops]
)]
#[case(
    "cycling_network,BOUNDARY",
    vec![DatasetKind::CyclingNetwork, DatasetKind::Boundary]
)]
fn parse_kinds_accepts_tags(#[case] list: &str, #[case] expected: Vec<DatasetKind>) {
    assert_eq!(parse_kinds(list).expect("kinds should parse"), expected);
}

#[rstest]
fn parse_kinds_rejects_unknown_tags() {
    let err = parse_kinds("buildings,parks").expect_err("parks is not a kind");
    match err {
        CliError::UnknownKind(source) => assert_eq!(source.value, "parks"),
        other => panic!("expected UnknownKind, found {other:?}"),
    }
}

#[rstest]
#[case(FetchArgs { timeout_secs: Some(0), ..FetchArgs::default() }, ARG_TIMEOUT_SECS)]
#[case(FetchArgs { max_attempts: Some(0), ..FetchArgs::default() }, ARG_MAX_ATTEMPTS)]
fn converting_rejects_zero_limits(#[case] args: FetchArgs, #[case] expected: &'static str) {
    let with_area = FetchArgs {
        area: Some("Pankow".to_owned()),
        ..args
    };
    let err = FetchConfig::try_from(with_area).expect_err("zero limit should error");
    match err {
        CliError::InvalidSetting { field, .. } => assert_eq!(field, expected),
        other => panic!("expected InvalidSetting, found {other:?}"),
    }
}

#[rstest]
fn source_settings_carry_the_resolved_limits() {
    let config = FetchConfig::try_from(FetchArgs {
        area: Some("Pankow".to_owned()),
        timeout_secs: Some(60),
        max_attempts: Some(5),
        overpass_rps: Some(0.5),
        overpass_url: Some("http://localhost:9000/api/interpreter".to_owned()),
        ..FetchArgs::default()
    })
    .expect("config should build");
    let settings = config.source_settings();
    assert_eq!(settings.retry.max_attempts, 5);
    assert_eq!(
        settings.orchestrator.run_timeout,
        Some(Duration::from_secs(60))
    );
    assert!((settings.overpass_rps - 0.5).abs() < f64::EPSILON);
    assert_eq!(settings.overpass_url, "http://localhost:9000/api/interpreter");
    assert_eq!(settings.wfs_base_url, DEFAULT_WFS_BASE_URL);
}

#[rstest]
fn request_lists_each_kind_once() {
    let config = FetchConfig::try_from(FetchArgs {
        area: Some("Pankow".to_owned()),
        kinds: Some("transit_stops,buildings,buildings".to_owned()),
        ..FetchArgs::default()
    })
    .expect("config should build");
    let request = config.request();
    assert_eq!(request.area_name, "Pankow");
    assert_eq!(
        request.kinds.into_iter().collect::<Vec<_>>(),
        vec![DatasetKind::Buildings, DatasetKind::TransitStops]
    );
}

#[rstest]
fn cli_flags_parse_into_fetch_args() {
    let cli = Cli::try_parse_from([
        "geostitch",
        "fetch",
        "--area",
        "Pankow",
        "--kinds",
        "buildings,transit_stops",
        "--output",
        "result.json",
        "--timeout-secs",
        "60",
    ])
    .expect("arguments should parse");
    let Command::Fetch(args) = cli.command else {
        panic!("expected the fetch command");
    };
    assert_eq!(args.area.as_deref(), Some("Pankow"));
    assert_eq!(args.kinds.as_deref(), Some("buildings,transit_stops"));
    assert_eq!(args.output.as_ref().map(|path| path.as_str()), Some("result.json"));
    assert_eq!(args.timeout_secs, Some(60));
}

#[rstest]
fn kinds_subcommand_parses() {
    let cli = Cli::try_parse_from(["geostitch", "kinds"]).expect("arguments should parse");
    assert!(matches!(cli.command, Command::Kinds));
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "timeout_secs": "soon" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "area": "Mitte",
            "kinds": "buildings",
            "overpass_rps": 1.0,
            "max_attempts": 4,
        }),
        None,
    );
    composer.push_environment(json!({
        "area": "Pankow",
        "max_attempts": 2,
    }));
    composer.push_cli(json!({
        "kinds": "transit_stops",
    }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.area, "Pankow");
    assert_eq!(config.kinds, vec![DatasetKind::TransitStops]);
    assert_eq!(config.max_attempts, 2);
    assert!((config.overpass_rps - 1.0).abs() < f64::EPSILON);
    assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
}
