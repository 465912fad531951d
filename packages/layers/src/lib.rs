#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Vector layer I/O for the population pipeline.
//!
//! Reads polygon datasets from `GeoJSON` `FeatureCollection` files into
//! [`PolygonLayer`] values (geometry plus attribute table), removes
//! duplicate geometries, and writes point or polygon layers back out as
//! `GeoJSON` or `GeoJSONSeq`.

pub mod attributes;
pub mod crs;
pub mod dedup;
pub mod read;
pub mod write;

use geo::MultiPolygon;
use popcloud_population_models::Attributes;
use thiserror::Error;

pub use read::{parse_polygon_layer, read_polygon_layer};
pub use write::{point_feature, polygon_feature, write_features};

/// Errors that can occur while reading or writing layers.
#[derive(Debug, Error)]
pub enum LayerError {
    /// File could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// File content is not valid `GeoJSON`.
    #[error("GeoJSON parse error in {path}: {source}")]
    GeoJson {
        /// File involved.
        path: String,
        /// Underlying error.
        source: Box<geojson::Error>,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is valid `GeoJSON` but not a feature collection.
    #[error("{path} is not a GeoJSON FeatureCollection")]
    NotFeatureCollection {
        /// File involved.
        path: String,
    },
}

/// A polygon feature: geometry plus attribute table.
#[derive(Debug, Clone)]
pub struct PolygonFeature {
    /// Polygon geometry (single polygons are wrapped).
    pub geometry: MultiPolygon<f64>,
    /// Feature properties.
    pub properties: Attributes,
}

/// A polygon dataset as read from disk.
#[derive(Debug, Clone, Default)]
pub struct PolygonLayer {
    /// Polygon features in file order.
    pub features: Vec<PolygonFeature>,
    /// Normalized CRS identifier declared by the file, if any.
    pub crs: Option<String>,
    /// Features dropped because their geometry was missing or not a
    /// polygon.
    pub skipped: usize,
}

impl PolygonLayer {
    /// Number of polygon features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the layer has no polygon features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
