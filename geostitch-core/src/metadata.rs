//! Predefined descriptive metadata for every dataset kind.

use serde::Serialize;

use crate::kind::DatasetKind;

/// Human-readable description of a dataset for downstream reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetMetadata {
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Licence the upstream data is published under.
    pub license: &'static str,
    /// How often the upstream source is refreshed.
    pub update_frequency: &'static str,
}

const GEOPORTAL_LICENSE: &str = "CC BY 3.0 DE";
const DL_DE_LICENSE: &str = "Datenlizenz Deutschland - Namensnennung - Version 2.0";

impl DatasetKind {
    /// Metadata describing this kind.
    #[must_use]
    pub const fn metadata(self) -> DatasetMetadata {
        match self {
            Self::Boundary => DatasetMetadata {
                name: "Bezirksgrenzen Berlin",
                description: "Administrative district boundaries",
                license: GEOPORTAL_LICENSE,
                update_frequency: "monthly",
            },
            Self::Buildings => DatasetMetadata {
                name: "Gebäudedaten Berlin",
                description: "Building footprints and usage data",
                license: GEOPORTAL_LICENSE,
                update_frequency: "quarterly",
            },
            Self::TransitStops => DatasetMetadata {
                name: "ÖPNV-Haltestellen Berlin",
                description: "Public transport stops from OpenStreetMap",
                license: "Open Database License (ODbL)",
                update_frequency: "daily",
            },
            Self::CyclingNetwork => DatasetMetadata {
                name: "Radverkehrsnetz Berlin",
                description: "Cycling network including main and long-distance routes",
                license: DL_DE_LICENSE,
                update_frequency: "yearly",
            },
            Self::StreetNetwork => DatasetMetadata {
                name: "Detailnetz Berlin",
                description: "Street segments of the detailed road network",
                license: DL_DE_LICENSE,
                update_frequency: "yearly",
            },
            Self::Localities => DatasetMetadata {
                name: "Ortsteile Berlin",
                description: "Sub-district (Ortsteil) boundaries",
                license: GEOPORTAL_LICENSE,
                update_frequency: "monthly",
            },
            Self::PopulationDensity => DatasetMetadata {
                name: "Einwohnerdichte Berlin 2024",
                description: "Residential population density per block",
                license: DL_DE_LICENSE,
                update_frequency: "yearly",
            },
            Self::BuildingFloors => DatasetMetadata {
                name: "Gebäude nach Geschosszahl Berlin",
                description: "Buildings grouped by number of floors",
                license: DL_DE_LICENSE,
                update_frequency: "yearly",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn every_kind_has_metadata() {
        for kind in DatasetKind::ALL {
            let metadata = kind.metadata();
            assert!(!metadata.name.is_empty(), "{kind} has no name");
            assert!(!metadata.license.is_empty(), "{kind} has no licence");
        }
    }

    #[rstest]
    fn transit_stops_are_odbl_licensed() {
        let metadata = DatasetKind::TransitStops.metadata();
        assert_eq!(metadata.license, "Open Database License (ODbL)");
        assert_eq!(metadata.update_frequency, "daily");
    }
}
