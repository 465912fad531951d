//! Resident point generation.
//!
//! Every building yields `round(estimated_residents)` points inside its
//! footprint. Each point gets a single uniform draw that is reused by all
//! statistic assignments later on.

use std::sync::Arc;

use popcloud_population_models::{
    AllocatedBuilding, Attributes, BUILDING_RESIDENTS_FIELD, RESIDENTIAL_LEVELS_FIELD,
    ResidentPoint,
};
use popcloud_spatial::SpatialOps;
use rand::{Rng as _, RngCore};

use crate::progress::ProgressCallback;

/// Number of distinct draw values: three decimals over `[0, 100)`.
const DRAW_STEPS: u32 = 100_000;

/// A uniform draw in `[0, 100)` with three decimal places.
pub fn draw_random(rng: &mut dyn RngCore) -> f64 {
    f64::from(rng.gen_range(0..DRAW_STEPS)) / 1000.0
}

/// Generates the resident points of all buildings, in building order.
pub fn generate_resident_points<O: SpatialOps + ?Sized>(
    buildings: &[AllocatedBuilding],
    ops: &O,
    rng: &mut dyn RngCore,
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<ResidentPoint> {
    let expected: u64 = buildings.iter().map(AllocatedBuilding::resident_count).sum();
    log::info!(
        "Placing {expected} resident points in {} buildings",
        buildings.len()
    );

    progress.set_total(buildings.len() as u64);
    progress.set_message("Generating points".to_string());

    let mut points = Vec::with_capacity(usize::try_from(expected).unwrap_or_default());
    for (index, allocated) in buildings.iter().enumerate() {
        let count = usize::try_from(allocated.resident_count()).unwrap_or(usize::MAX);
        if count > 0 {
            let template = point_attributes(allocated);
            for location in ops.random_points(&allocated.building.geometry, count, rng) {
                points.push(ResidentPoint {
                    location,
                    building: index,
                    random_draw: draw_random(rng),
                    attributes: template.clone(),
                });
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if points.len() as u64 != expected {
        log::warn!(
            "Generated {} points, expected {expected}; some footprints have no interior area",
            points.len()
        );
    }

    points
}

fn point_attributes(allocated: &AllocatedBuilding) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(
        BUILDING_RESIDENTS_FIELD.to_string(),
        serde_json::json!(allocated.allocation.estimated_residents),
    );
    attributes.insert(
        RESIDENTIAL_LEVELS_FIELD.to_string(),
        serde_json::json!(allocated.building.residential_floors),
    );
    attributes
}
