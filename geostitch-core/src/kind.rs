//! Dataset kinds and the systems that publish them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A category of geodata that can be requested for an area.
///
/// Ordering places [`DatasetKind::Boundary`] first so that ordered
/// collections of kinds naturally process the boundary before anything else.
///
/// # Examples
///
/// ```
/// use geostitch_core::DatasetKind;
///
/// let kind: DatasetKind = "transit_stops".parse()?;
/// assert_eq!(kind, DatasetKind::TransitStops);
/// assert!(DatasetKind::Boundary < kind);
/// # Ok::<(), geostitch_core::ParseDatasetKindError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Administrative boundary of the area itself.
    Boundary,
    /// Building footprints.
    Buildings,
    /// Public transport stops.
    TransitStops,
    /// Cycling infrastructure network.
    CyclingNetwork,
    /// Street segments.
    StreetNetwork,
    /// Sub-district (locality) boundaries.
    Localities,
    /// Residential population density blocks.
    PopulationDensity,
    /// Buildings grouped by number of floors.
    BuildingFloors,
}

impl DatasetKind {
    /// Every kind, boundary first.
    pub const ALL: [Self; 8] = [
        Self::Boundary,
        Self::Buildings,
        Self::TransitStops,
        Self::CyclingNetwork,
        Self::StreetNetwork,
        Self::Localities,
        Self::PopulationDensity,
        Self::BuildingFloors,
    ];

    /// Stable snake_case tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boundary => "boundary",
            Self::Buildings => "buildings",
            Self::TransitStops => "transit_stops",
            Self::CyclingNetwork => "cycling_network",
            Self::StreetNetwork => "street_network",
            Self::Localities => "localities",
            Self::PopulationDensity => "population_density",
            Self::BuildingFloors => "building_floors",
        }
    }

    /// Whether this is the mandatory boundary kind.
    #[must_use]
    pub const fn is_boundary(self) -> bool {
        matches!(self, Self::Boundary)
    }

    /// System that publishes this kind.
    #[must_use]
    pub const fn source_system(self) -> SourceSystem {
        match self {
            Self::TransitStops => SourceSystem::Osm,
            _ => SourceSystem::Geoportal,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no [`DatasetKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown dataset kind {value:?}")]
pub struct ParseDatasetKindError {
    /// Offending input.
    pub value: String,
}

impl FromStr for DatasetKind {
    type Err = ParseDatasetKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalised)
            .ok_or_else(|| ParseDatasetKindError {
                value: s.to_owned(),
            })
    }
}

/// Upstream system a dataset was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    /// The municipal geodata portal (OGC WFS).
    Geoportal,
    /// OpenStreetMap via the Overpass API.
    Osm,
}

impl SourceSystem {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Geoportal => "geoportal",
            Self::Osm => "osm",
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on setup errors")]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("boundary", DatasetKind::Boundary)]
    #[case(" Buildings ", DatasetKind::Buildings)]
    #[case("transit-stops", DatasetKind::TransitStops)]
    #[case("building_floors", DatasetKind::BuildingFloors)]
    fn parses_kind_tags(#[case] input: &str, #[case] expected: DatasetKind) {
        assert_eq!(input.parse::<DatasetKind>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_tags() {
        let err = "parks".parse::<DatasetKind>().expect_err("unknown");
        assert_eq!(err.value, "parks");
    }

    #[rstest]
    fn tags_round_trip_through_display() {
        for kind in DatasetKind::ALL {
            assert_eq!(kind.to_string().parse::<DatasetKind>(), Ok(kind));
        }
    }

    #[rstest]
    fn boundary_sorts_first() {
        let mut kinds = DatasetKind::ALL;
        kinds.reverse();
        kinds.sort();
        assert_eq!(kinds.first(), Some(&DatasetKind::Boundary));
    }

    #[rstest]
    fn serialises_as_snake_case() {
        let json = serde_json::to_string(&DatasetKind::TransitStops).expect("serialise");
        assert_eq!(json, "\"transit_stops\"");
        assert_eq!(
            serde_json::to_string(&SourceSystem::Osm).expect("serialise"),
            "\"osm\""
        );
    }
}
