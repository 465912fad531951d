//! Scripted [`SpatialOps`] and fixture builders shared by unit tests.

use geo::{MultiPolygon, Point, polygon};
use popcloud_layers::PolygonFeature;
use popcloud_population_models::Attributes;
use popcloud_spatial::SpatialOps;
use rand::RngCore;

/// Returns canned join results and a fixed footprint area.
pub struct ScriptedOps {
    pub area: f64,
    pub overlap: Vec<Option<usize>>,
    pub within: Vec<Option<usize>>,
}

impl SpatialOps for ScriptedOps {
    fn area(&self, _geometry: &MultiPolygon<f64>) -> f64 {
        self.area
    }

    fn random_points(
        &self,
        _geometry: &MultiPolygon<f64>,
        count: usize,
        _rng: &mut dyn RngCore,
    ) -> Vec<Point<f64>> {
        vec![Point::new(0.0, 0.0); count]
    }

    fn join_largest_overlap(
        &self,
        features: &[&MultiPolygon<f64>],
        _targets: &[&MultiPolygon<f64>],
    ) -> Vec<Option<usize>> {
        assert_eq!(features.len(), self.overlap.len());
        self.overlap.clone()
    }

    fn join_within(
        &self,
        points: &[Point<f64>],
        _targets: &[&MultiPolygon<f64>],
    ) -> Vec<Option<usize>> {
        assert_eq!(points.len(), self.within.len());
        self.within.clone()
    }
}

/// Axis-aligned square with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x + size, y: y + size),
        (x: x, y: y + size),
        (x: x, y: y),
    ]])
}

/// A feature with the given geometry and properties.
pub fn feature(geometry: MultiPolygon<f64>, properties: serde_json::Value) -> PolygonFeature {
    let properties: Attributes = match properties {
        serde_json::Value::Object(map) => map,
        _ => Attributes::new(),
    };
    PolygonFeature {
        geometry,
        properties,
    }
}
