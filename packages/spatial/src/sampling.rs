//! Uniform point sampling inside polygons.
//!
//! Polygons are triangulated once; each sample picks a triangle weighted by
//! area and then a uniform point inside it, so every requested point is
//! produced without rejection loops.

use geo::{Area, Coord, MultiPolygon, Point, TriangulateEarcut, Triangle};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};

pub struct TriangleSampler {
    triangles: Vec<Triangle<f64>>,
    weights: WeightedIndex<f64>,
}

impl TriangleSampler {
    /// Returns `None` when the geometry has no triangle of positive area.
    pub fn new(geometry: &MultiPolygon<f64>) -> Option<Self> {
        let triangles: Vec<Triangle<f64>> = geometry
            .0
            .iter()
            .flat_map(|polygon| polygon.earcut_triangles())
            .filter(|triangle| triangle.unsigned_area() > 0.0)
            .collect();

        let weights = WeightedIndex::new(triangles.iter().map(Area::unsigned_area)).ok()?;

        Some(Self { triangles, weights })
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> Point<f64> {
        let triangle = &self.triangles[self.weights.sample(rng)];

        let mut u: f64 = rng.gen_range(0.0..1.0);
        let mut v: f64 = rng.gen_range(0.0..1.0);
        // Fold the far half of the parallelogram back into the triangle.
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }

        let Triangle(a, b, c) = *triangle;
        Point::from(Coord {
            x: (c.x - a.x).mul_add(v, (b.x - a.x).mul_add(u, a.x)),
            y: (c.y - a.y).mul_add(v, (b.y - a.y).mul_add(u, a.y)),
        })
    }
}
