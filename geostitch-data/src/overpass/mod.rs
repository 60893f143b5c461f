//! Public transport stops from the OpenStreetMap Overpass API.

mod connector;
mod response;

pub use connector::{
    BBOX_BUFFER_DEGREES, DEFAULT_OVERPASS_RPS, DEFAULT_OVERPASS_URL, OverpassConnector,
};
