#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geospatial operations used by the population pipeline.
//!
//! The pipeline never touches geometry algorithms directly. It calls the
//! four operations of [`SpatialOps`] (polygon area, random points inside a
//! polygon, largest-overlap polygon join, point-within-polygon join), so
//! tests can substitute a scripted implementation. [`GeoEngine`] is the
//! real one, built on `geo` and R-tree indexes from `rstar`.

mod index;
mod sampling;

use geo::{Area, BooleanOps, Contains, MultiPolygon, Point};
use rand::RngCore;
use rstar::AABB;

pub use index::{PolygonIndex, compute_envelope};

/// The geometry operations the population pipeline depends on.
pub trait SpatialOps {
    /// Planar area of a polygon set in squared CRS units.
    fn area(&self, geometry: &MultiPolygon<f64>) -> f64;

    /// Places `count` points uniformly at random inside `geometry`.
    ///
    /// Returns fewer points only when the geometry has no interior area.
    fn random_points(
        &self,
        geometry: &MultiPolygon<f64>,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Point<f64>>;

    /// For each feature, the index of the target it overlaps most, or
    /// `None` if it overlaps no target with positive area.
    ///
    /// Targets that only touch a feature (shared edge or corner) never
    /// match, unlike QGIS's largest-overlap join, which accepts any
    /// intersecting target. Ties go to the lowest target index.
    fn join_largest_overlap(
        &self,
        features: &[&MultiPolygon<f64>],
        targets: &[&MultiPolygon<f64>],
    ) -> Vec<Option<usize>>;

    /// For each point, the index of the first target (lowest index) that
    /// contains it, or `None` if none does.
    fn join_within(
        &self,
        points: &[Point<f64>],
        targets: &[&MultiPolygon<f64>],
    ) -> Vec<Option<usize>>;
}

/// [`SpatialOps`] implemented with `geo` algorithms and `rstar` indexes.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoEngine;

impl SpatialOps for GeoEngine {
    fn area(&self, geometry: &MultiPolygon<f64>) -> f64 {
        geometry.unsigned_area()
    }

    fn random_points(
        &self,
        geometry: &MultiPolygon<f64>,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Point<f64>> {
        if count == 0 {
            return Vec::new();
        }

        let Some(sampler) = sampling::TriangleSampler::new(geometry) else {
            log::warn!("Cannot place {count} points in a polygon without interior area");
            return Vec::new();
        };

        (0..count).map(|_| sampler.sample(rng)).collect()
    }

    fn join_largest_overlap(
        &self,
        features: &[&MultiPolygon<f64>],
        targets: &[&MultiPolygon<f64>],
    ) -> Vec<Option<usize>> {
        let index = PolygonIndex::build(targets);
        log::debug!("Indexed {} join targets", index.size());

        features
            .iter()
            .map(|feature| {
                let envelope = compute_envelope(feature)?;
                let mut best: Option<(usize, f64)> = None;

                for candidate in index.candidates(&envelope) {
                    let overlap = feature.intersection(targets[candidate]).unsigned_area();
                    if overlap <= 0.0 {
                        continue;
                    }
                    match best {
                        Some((best_index, best_area))
                            if overlap < best_area
                                || (overlap.total_cmp(&best_area).is_eq()
                                    && candidate > best_index) => {}
                        _ => best = Some((candidate, overlap)),
                    }
                }

                best.map(|(i, _)| i)
            })
            .collect()
    }

    fn join_within(
        &self,
        points: &[Point<f64>],
        targets: &[&MultiPolygon<f64>],
    ) -> Vec<Option<usize>> {
        let index = PolygonIndex::build(targets);
        log::debug!("Indexed {} join targets", index.size());

        points
            .iter()
            .map(|point| {
                let query_env = AABB::from_point([point.x(), point.y()]);
                index
                    .candidates(&query_env)
                    .filter(|&candidate| targets[candidate].contains(point))
                    .min()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use geo::{Intersects, polygon};
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]])
    }

    #[test]
    fn computes_area() {
        let engine = GeoEngine;
        assert!((engine.area(&square(0.0, 0.0, 10.0)) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn random_points_stay_inside() {
        let engine = GeoEngine;
        let mut rng = StdRng::seed_from_u64(42);
        let footprint = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 5.0, y: 4.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ]]);

        let points = engine.random_points(&footprint, 500, &mut rng);

        assert_eq!(points.len(), 500);
        assert!(points.iter().all(|p| footprint.intersects(p)));
    }

    #[test]
    fn random_points_in_degenerate_polygon_are_empty() {
        let engine = GeoEngine;
        let mut rng = StdRng::seed_from_u64(1);
        let sliver = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ]]);

        assert!(engine.random_points(&sliver, 3, &mut rng).is_empty());
        assert!(
            engine
                .random_points(&square(0.0, 0.0, 1.0), 0, &mut rng)
                .is_empty()
        );
    }

    #[test]
    fn joins_to_largest_overlap() {
        let engine = GeoEngine;
        let left = square(0.0, 0.0, 10.0);
        let right = square(10.0, 0.0, 10.0);
        let far = square(100.0, 100.0, 1.0);

        // 7 units of width in `right`, 3 in `left`.
        let building = square(7.0, 2.0, 10.0);
        let inside_left = square(1.0, 1.0, 2.0);

        let joined = engine.join_largest_overlap(
            &[&building, &inside_left, &far],
            &[&left, &right],
        );

        assert_eq!(joined, vec![Some(1), Some(0), None]);
    }

    #[test]
    fn touching_only_is_not_an_overlap() {
        let engine = GeoEngine;
        let block = square(0.0, 0.0, 10.0);
        let neighbor = square(10.0, 0.0, 5.0);

        assert_eq!(
            engine.join_largest_overlap(&[&neighbor], &[&block]),
            vec![None]
        );
    }

    #[test]
    fn joins_points_within() {
        let engine = GeoEngine;
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 0.0, 10.0);

        let joined = engine.join_within(
            &[
                Point::new(2.0, 2.0),
                Point::new(7.0, 2.0),
                Point::new(12.0, 2.0),
                Point::new(50.0, 50.0),
            ],
            &[&a, &b],
        );

        assert_eq!(joined, vec![Some(0), Some(0), Some(1), None]);
    }
}
