//! `kinds` command: the dataset catalogue.

use std::io::Write;

use geostitch::{DatasetKind, DatasetMetadata, SourceSystem};
use serde::Serialize;

use crate::CliError;

#[derive(Debug, Serialize)]
pub(crate) struct KindEntry {
    pub(crate) kind: DatasetKind,
    pub(crate) source_system: SourceSystem,
    #[serde(flatten)]
    pub(crate) metadata: DatasetMetadata,
}

pub(crate) fn catalogue() -> Vec<KindEntry> {
    DatasetKind::ALL
        .into_iter()
        .map(|kind| KindEntry {
            kind,
            source_system: kind.source_system(),
            metadata: kind.metadata(),
        })
        .collect()
}

pub(crate) fn run_kinds(writer: &mut dyn Write) -> Result<(), CliError> {
    let payload =
        serde_json::to_string_pretty(&catalogue()).map_err(CliError::SerializeResult)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteResult)?;
    writer.write_all(b"\n").map_err(CliError::WriteResult)?;
    Ok(())
}
