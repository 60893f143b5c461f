//! Fetch runs over stub pipelines, result files and the kinds catalogue.

use super::helpers::{StubPipelineBuilder, feature_count, pankow_config, parse_output};
use super::*;
use crate::fetch::run_fetch_with;
use crate::kinds::run_kinds;
use crate::output::write_output_file;
use camino::Utf8PathBuf;
use geostitch::{AcquisitionError, RunError};
use rstest::rstest;
use tempfile::TempDir;

#[rstest]
fn fetch_writes_partial_result_when_transit_is_unavailable() {
    let builder = StubPipelineBuilder::with_boundary()
        .with_buildings(3)
        .with_unavailable_transit();
    let mut buffer = Vec::new();
    run_fetch_with(
        &pankow_config("buildings,transit_stops"),
        &builder,
        &mut buffer,
    )
    .expect("degraded run should still succeed");

    let output = parse_output(&buffer);
    assert_eq!(output["area"], "Pankow");
    assert_eq!(output["status"], "partial_success");
    assert!(output.get("error").is_none());
    assert_eq!(output["skipped"][0]["kind"], "transit_stops");
    assert_eq!(output["quality"]["total_features"], 4);
    assert_eq!(feature_count(&output), 4);
    let metadata = output["metadata"].as_object().expect("metadata object");
    assert_eq!(
        metadata.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["boundary", "buildings"]
    );
    assert_eq!(output["metadata"]["buildings"]["update_frequency"], "quarterly");
}

#[rstest]
fn fetch_reports_failure_after_writing_the_result() {
    let builder = StubPipelineBuilder::with_rejected_boundary().with_buildings(3);
    let mut buffer = Vec::new();
    let err = run_fetch_with(&pankow_config("buildings"), &builder, &mut buffer)
        .expect_err("rejected boundary should fail the command");
    match err {
        CliError::Run(RunError::Acquisition(AcquisitionError::BoundaryUnavailable { .. })) => {}
        other => panic!("expected a boundary failure, found {other:?}"),
    }

    let output = parse_output(&buffer);
    assert_eq!(output["status"], "failed");
    assert!(output["quality"].is_null());
    assert_eq!(feature_count(&output), 0);
    assert!(
        output["error"]
            .as_str()
            .is_some_and(|message| !message.is_empty())
    );
}

#[rstest]
fn fetch_without_kinds_returns_the_boundary_only() {
    let builder = StubPipelineBuilder::with_boundary();
    let mut buffer = Vec::new();
    run_fetch_with(&pankow_config(""), &builder, &mut buffer).expect("boundary-only run");

    let output = parse_output(&buffer);
    assert_eq!(output["status"], "succeeded");
    assert_eq!(feature_count(&output), 1);
    assert_eq!(
        output["features"]["features"][0]["properties"]["kind"],
        "boundary"
    );
}

#[rstest]
fn output_file_is_written_below_missing_directories() {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    let path = root.join("runs").join("pankow").join("result.json");

    write_output_file(&path, b"{}\n").expect("result file should be written");
    assert_eq!(
        std::fs::read_to_string(path.as_std_path()).expect("read result"),
        "{}\n"
    );
}

#[rstest]
fn output_file_requires_a_file_name() {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    let path = root.join("..");

    let err = write_output_file(&path, b"{}").expect_err("no file name to write");
    match err {
        CliError::WriteOutputFile { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected WriteOutputFile, found {other:?}"),
    }
}

#[rstest]
fn kinds_lists_every_kind_with_metadata() {
    let mut buffer = Vec::new();
    run_kinds(&mut buffer).expect("catalogue should render");

    let output = parse_output(&buffer);
    let entries = output.as_array().expect("catalogue array");
    assert_eq!(entries.len(), 8);
    assert_eq!(entries[0]["kind"], "boundary");
    assert_eq!(entries[0]["source_system"], "geoportal");
    let transit = entries
        .iter()
        .find(|entry| entry["kind"] == "transit_stops")
        .expect("transit stops listed");
    assert_eq!(transit["source_system"], "osm");
    assert_eq!(transit["license"], "Open Database License (ODbL)");
}
