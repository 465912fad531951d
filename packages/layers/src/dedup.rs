//! Duplicate geometry removal.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash as _, Hasher as _};

use geo::{CoordsIter as _, MultiPolygon};

use crate::PolygonFeature;

/// Drops every feature whose geometry exactly equals that of an earlier
/// feature. Returns the kept features (in order) and the number removed.
#[must_use]
pub fn remove_duplicate_geometries(features: Vec<PolygonFeature>) -> (Vec<PolygonFeature>, usize) {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut kept: Vec<PolygonFeature> = Vec::with_capacity(features.len());
    let mut removed = 0;

    for feature in features {
        let bucket = buckets.entry(geometry_hash(&feature.geometry)).or_default();

        if bucket.iter().any(|&i| kept[i].geometry == feature.geometry) {
            removed += 1;
            continue;
        }

        bucket.push(kept.len());
        kept.push(feature);
    }

    (kept, removed)
}

fn geometry_hash(geometry: &MultiPolygon<f64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    geometry.0.len().hash(&mut hasher);
    for coord in geometry.coords_iter() {
        coord.x.to_bits().hash(&mut hasher);
        coord.y.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
