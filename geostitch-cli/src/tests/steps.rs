//! Behaviour-driven step definitions driving the fetch CLI scenarios.

use super::helpers::{StubPipelineBuilder, feature_count, parse_output};
use super::*;
use crate::fetch::{FetchConfig, config_from_layers_for_test, parse_kinds, run_fetch_with};
use ortho_config::MergeComposer;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};
use std::cell::RefCell;

/// Aggregates fetch scenario state so each step only needs a single world
/// argument.
struct FetchWorld {
    builder: RefCell<Option<StubPipelineBuilder>>,
    outcome: RefCell<Option<Result<(), CliError>>>,
    written: RefCell<Vec<u8>>,
    file_layer: RefCell<Option<Value>>,
    env_layer: RefCell<Option<Value>>,
    cli_layer: RefCell<Option<Value>>,
    merged: RefCell<Option<Result<FetchConfig, CliError>>>,
}

impl FetchWorld {
    fn new() -> Self {
        Self {
            builder: RefCell::new(None),
            outcome: RefCell::new(None),
            written: RefCell::new(Vec::new()),
            file_layer: RefCell::new(None),
            env_layer: RefCell::new(None),
            cli_layer: RefCell::new(None),
            merged: RefCell::new(None),
        }
    }

    fn update_builder(&self, update: impl FnOnce(StubPipelineBuilder) -> StubPipelineBuilder) {
        let mut slot = self.builder.borrow_mut();
        let current = slot.take().expect("boundary service configured first");
        *slot = Some(update(current));
    }

    fn output(&self) -> Value {
        parse_output(&self.written.borrow())
    }

    fn merged_config(&self) -> FetchConfig {
        match self.merged.borrow().as_ref() {
            Some(Ok(config)) => config.clone(),
            other => panic!("expected a merged configuration, found {other:?}"),
        }
    }
}

#[fixture]
fn world() -> FetchWorld {
    FetchWorld::new()
}

#[given("a boundary service returning one polygon for Pankow")]
fn boundary_ok(#[from(world)] world: &FetchWorld) {
    *world.builder.borrow_mut() = Some(StubPipelineBuilder::with_boundary());
}

#[given("a buildings service returning {count} features")]
fn buildings_ok(#[from(world)] world: &FetchWorld, count: usize) {
    world.update_builder(|builder| builder.with_buildings(count));
}

#[given("a transit service that is unavailable")]
fn transit_unavailable(#[from(world)] world: &FetchWorld) {
    world.update_builder(StubPipelineBuilder::with_unavailable_transit);
}

#[when("I fetch {list} for Pankow")]
fn fetch(#[from(world)] world: &FetchWorld, list: String) {
    let builder = world
        .builder
        .borrow()
        .clone()
        .expect("boundary service configured");
    let invocation = ["geostitch", "fetch", "--area", "Pankow", "--kinds", list.as_str()];
    let outcome = Cli::try_parse_from(invocation)
        .map_err(CliError::ArgumentParsing)
        .and_then(|cli| match cli.command {
            Command::Fetch(args) => FetchConfig::try_from(args),
            Command::Kinds => panic!("expected the fetch command"),
        })
        .and_then(|config| run_fetch_with(&config, &builder, &mut *world.written.borrow_mut()));
    *world.outcome.borrow_mut() = Some(outcome);
}

#[then("the command succeeds")]
fn command_succeeds(#[from(world)] world: &FetchWorld) {
    let outcome = world.outcome.borrow();
    assert!(
        matches!(outcome.as_ref(), Some(Ok(()))),
        "unexpected outcome {outcome:?}"
    );
}

#[then("the result status is {status:word}")]
fn result_status(#[from(world)] world: &FetchWorld, status: String) {
    assert_eq!(world.output()["status"], status.as_str());
}

#[then("the result holds {count} features")]
fn result_features(#[from(world)] world: &FetchWorld, count: usize) {
    assert_eq!(feature_count(&world.output()), count);
}

#[then("the result lists {kind:word} as skipped")]
fn result_skipped(#[from(world)] world: &FetchWorld, kind: String) {
    let output = world.output();
    let skipped: Vec<&str> = output["skipped"]
        .as_array()
        .map(|entries| entries.iter().filter_map(|entry| entry["kind"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(skipped, vec![kind.as_str()]);
}

#[then("the command reports {kind:word} as an unknown kind")]
fn reports_unknown_kind(#[from(world)] world: &FetchWorld, kind: String) {
    let outcome = world.outcome.borrow();
    match outcome.as_ref() {
        Some(Err(CliError::UnknownKind(source))) => assert_eq!(source.value, kind),
        other => panic!("expected UnknownKind, found {other:?}"),
    }
}

#[then("nothing is written")]
fn nothing_written(#[from(world)] world: &FetchWorld) {
    assert!(world.written.borrow().is_empty());
}

#[given("the config file sets the area to {area:word} and the kinds to {kinds:word}")]
fn config_file_layer(#[from(world)] world: &FetchWorld, area: String, kinds: String) {
    *world.file_layer.borrow_mut() = Some(json!({ "area": area, "kinds": kinds }));
}

#[given("the environment sets the area to {area:word}")]
fn environment_layer(#[from(world)] world: &FetchWorld, area: String) {
    *world.env_layer.borrow_mut() = Some(json!({ "area": area }));
}

#[given("the command line sets the kinds to {kinds:word}")]
fn cli_layer(#[from(world)] world: &FetchWorld, kinds: String) {
    *world.cli_layer.borrow_mut() = Some(json!({ "kinds": kinds }));
}

#[when("the fetch configuration is merged")]
fn merge_configuration(#[from(world)] world: &FetchWorld) {
    let mut composer = MergeComposer::new();
    if let Some(layer) = world.file_layer.borrow().clone() {
        composer.push_file(layer, None);
    }
    if let Some(layer) = world.env_layer.borrow().clone() {
        composer.push_environment(layer);
    }
    if let Some(layer) = world.cli_layer.borrow().clone() {
        composer.push_cli(layer);
    }
    *world.merged.borrow_mut() = Some(config_from_layers_for_test(composer.layers()));
}

#[then("the fetch targets {area:word}")]
fn fetch_targets(#[from(world)] world: &FetchWorld, area: String) {
    assert_eq!(world.merged_config().area, area);
}

#[then("the requested kinds are {list}")]
fn requested_kinds(#[from(world)] world: &FetchWorld, list: String) {
    let expected = parse_kinds(&list).expect("expected kinds parse");
    assert_eq!(world.merged_config().kinds, expected);
}

macro_rules! register_fetch_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/fetch_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: FetchWorld) {
            let _ = world;
        }
    };
}

register_fetch_scenario!(
    degrading_on_transit_failure,
    "fetching with an unavailable transit service"
);
register_fetch_scenario!(rejecting_unknown_kind, "rejecting an unknown dataset kind");
register_fetch_scenario!(
    layering_cli_config_env,
    "layering CLI, config file, and environment values"
);
