//! JSON rendering of run reports and result file handling.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use geostitch::{
    DatasetKind, DatasetMetadata, HarmonizedCollection, QualityReport, RunReport, RunStatus,
    SkippedDataset, TARGET_CRS,
};
use serde::Serialize;
use serde_json::Value;

use crate::CliError;

/// Document written by `fetch`.
#[derive(Debug, Serialize)]
pub(crate) struct FetchResult<'a> {
    pub(crate) area: &'a str,
    pub(crate) status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    pub(crate) skipped: &'a [SkippedDataset],
    pub(crate) quality: Option<&'a QualityReport>,
    pub(crate) metadata: BTreeMap<DatasetKind, DatasetMetadata>,
    pub(crate) features: Value,
}

impl<'a> FetchResult<'a> {
    pub(crate) fn from_report(report: &'a RunReport) -> Self {
        let harmonization = report.harmonization.as_ref();
        let metadata = harmonization
            .map(|harmonization| {
                harmonization
                    .collection
                    .grouped_by_kind()
                    .into_keys()
                    .map(|kind| (kind, kind.metadata()))
                    .collect()
            })
            .unwrap_or_default();
        let features = harmonization.map_or_else(
            || {
                HarmonizedCollection {
                    features: Vec::new(),
                    crs: TARGET_CRS,
                }
                .to_geojson_value()
            },
            |harmonization| harmonization.collection.to_geojson_value(),
        );
        Self {
            area: &report.area_name,
            status: report.status,
            error: report.error.as_ref().map(ToString::to_string),
            skipped: &report.skipped,
            quality: harmonization.map(|harmonization| &harmonization.report),
            metadata,
            features,
        }
    }
}

pub(crate) fn write_report(writer: &mut dyn Write, report: &RunReport) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(&FetchResult::from_report(report))
        .map_err(CliError::SerializeResult)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteResult)?;
    writer.write_all(b"\n").map_err(CliError::WriteResult)?;
    Ok(())
}

/// Write `contents` to `path`, creating missing parent directories.
pub(crate) fn write_output_file(path: &Utf8Path, contents: &[u8]) -> Result<(), CliError> {
    let write = || -> io::Result<()> {
        ensure_parent_dir(path)?;
        let (dir, file_name) = open_dir_and_file(path)?;
        dir.write(file_name, contents)
    };
    write().map_err(|source| CliError::WriteOutputFile {
        path: path.to_path_buf(),
        source,
    })
}

fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("output path should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Split `parent` into an ambient base directory and the path below it.
fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();
    let (base, relative) = match std_parent.components().next() {
        // Windows drive or UNC prefix.
        Some(Component::Prefix(component)) => {
            let prefix = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix).join(std::path::MAIN_SEPARATOR_STR);
            let relative = parent
                .strip_prefix(&base)
                .or_else(|_| parent.strip_prefix(prefix))
                .map_err(|_| io::Error::other("failed to strip prefix from output path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR_STR);
            let relative = parent
                .strip_prefix(&base)
                .map_err(|_| io::Error::other("failed to strip root from output path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), parent.to_path_buf()),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, relative))
}
