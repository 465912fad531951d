//! Block population allocation.
//!
//! Each building is joined to the block it overlaps most. Within a block,
//! population is split in proportion to residential floor area:
//!
//! ```text
//! estimated_residents = population * area / block_total_area
//! ```
//!
//! Unmatched buildings, null populations, and blocks without residential
//! floor area all yield zero residents rather than NaN.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use popcloud_layers::PolygonFeature;
use popcloud_layers::attributes::{AttributeNumber, read_number, read_text};
use popcloud_population_models::config::PopulationSourceConfig;
use popcloud_population_models::{AllocatedBuilding, Block, BlockAllocation, Building};
use popcloud_spatial::SpatialOps;

/// Diagnostics collected while allocating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationSummary {
    /// Buildings that overlap no block.
    pub unmatched_buildings: usize,
    /// Block features whose population could not be placed because no
    /// building with residential floor area was joined to them.
    pub stranded_blocks: usize,
    /// Total population of the stranded blocks.
    pub stranded_population: f64,
    /// Sum of all building estimates.
    pub estimated_residents: f64,
}

/// Builds [`Block`]s from population density features.
///
/// Blocks without an identifier are keyed by their feature position so
/// they never share a group with another block.
#[must_use]
pub fn blocks_from_features(
    features: Vec<PolygonFeature>,
    config: &PopulationSourceConfig,
) -> Vec<Block> {
    let mut missing_ids = 0usize;
    let mut invalid_population = 0usize;

    let blocks: Vec<Block> = features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let block_id = read_text(&feature.properties, &config.block_id_attribute)
                .unwrap_or_else(|| {
                    missing_ids += 1;
                    format!("#{index}")
                });
            let population =
                match read_number(&feature.properties, &config.population_attribute) {
                    AttributeNumber::Number(n) => Some(n),
                    AttributeNumber::Missing => None,
                    AttributeNumber::NotNumeric => {
                        invalid_population += 1;
                        None
                    }
                };
            Block {
                block_id,
                population,
                geometry: feature.geometry,
            }
        })
        .collect();

    if missing_ids > 0 {
        log::warn!(
            "{missing_ids} population blocks have no \"{}\" value",
            config.block_id_attribute
        );
    }
    if invalid_population > 0 {
        log::warn!(
            "{invalid_population} population blocks have a non-numeric \"{}\" value",
            config.population_attribute
        );
    }

    blocks
}

/// Share of `population` for a building with `area` out of `block_total`.
///
/// Never negative, NaN, or infinite.
#[must_use]
pub fn estimate_residents(population: Option<f64>, area: f64, block_total: f64) -> f64 {
    let Some(population) = population else {
        return 0.0;
    };
    let estimate = population * (area / block_total);
    if estimate.is_finite() {
        estimate.max(0.0)
    } else {
        0.0
    }
}

/// Joins buildings to blocks and distributes block populations.
#[must_use]
pub fn allocate_population<O: SpatialOps + ?Sized>(
    buildings: Vec<Building>,
    blocks: &[Block],
    ops: &O,
) -> (Vec<AllocatedBuilding>, AllocationSummary) {
    let matches = {
        let footprints: Vec<&MultiPolygon<f64>> = buildings.iter().map(|b| &b.geometry).collect();
        let targets: Vec<&MultiPolygon<f64>> = blocks.iter().map(|b| &b.geometry).collect();
        ops.join_largest_overlap(&footprints, &targets)
    };

    let mut block_totals: BTreeMap<&str, f64> = BTreeMap::new();
    for (building, matched) in buildings.iter().zip(&matches) {
        if let Some(i) = *matched {
            *block_totals.entry(blocks[i].block_id.as_str()).or_default() +=
                building.residential_floor_area;
        }
    }

    let mut summary = AllocationSummary::default();

    let allocated: Vec<AllocatedBuilding> = buildings
        .into_iter()
        .zip(matches)
        .map(|(building, matched)| {
            let allocation = matched.map_or_else(BlockAllocation::unmatched, |i| {
                let block = &blocks[i];
                let total = block_totals
                    .get(block.block_id.as_str())
                    .copied()
                    .unwrap_or_default();
                BlockAllocation {
                    block_id: Some(block.block_id.clone()),
                    block_population: block.population,
                    block_residential_floor_area: Some(total),
                    estimated_residents: estimate_residents(
                        block.population,
                        building.residential_floor_area,
                        total,
                    ),
                }
            });

            if !allocation.is_matched() {
                summary.unmatched_buildings += 1;
            }
            summary.estimated_residents += allocation.estimated_residents;

            AllocatedBuilding {
                building,
                allocation,
            }
        })
        .collect();

    for block in blocks {
        let total = block_totals
            .get(block.block_id.as_str())
            .copied()
            .unwrap_or_default();
        let population = block.population.unwrap_or_default();
        if total <= 0.0 && population > 0.0 {
            summary.stranded_blocks += 1;
            summary.stranded_population += population;
        }
    }

    (allocated, summary)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::{ScriptedOps, feature, square};

    fn building(residential_floor_area: f64) -> Building {
        Building {
            geometry: square(0.0, 0.0, 1.0),
            properties: serde_json::Map::new(),
            function_class: Some("Wohnhaus".to_string()),
            floor_count: Some(1),
            residential_floors: 1,
            footprint_area: residential_floor_area,
            residential_floor_area,
        }
    }

    fn block(id: &str, population: Option<f64>) -> Block {
        Block {
            block_id: id.to_string(),
            population,
            geometry: square(0.0, 0.0, 100.0),
        }
    }

    fn ops(overlap: Vec<Option<usize>>) -> ScriptedOps {
        ScriptedOps {
            area: 1.0,
            overlap,
            within: Vec::new(),
        }
    }

    #[test]
    fn conserves_block_population() {
        let buildings = vec![building(100.0), building(300.0), building(600.0), building(0.0)];
        let blocks = vec![block("A", Some(50.0))];

        let (allocated, summary) =
            allocate_population(buildings, &blocks, &ops(vec![Some(0); 4]));

        let estimates: Vec<f64> = allocated
            .iter()
            .map(|b| b.allocation.estimated_residents)
            .collect();
        assert!((estimates[0] - 5.0).abs() < 1e-9);
        assert!((estimates[1] - 15.0).abs() < 1e-9);
        assert!((estimates[2] - 30.0).abs() < 1e-9);
        assert!(estimates[3].abs() < 1e-9);
        assert!((estimates.iter().sum::<f64>() - 50.0).abs() < 1e-9);
        assert!((summary.estimated_residents - 50.0).abs() < 1e-9);
        assert_eq!(
            allocated[0].allocation.block_residential_floor_area,
            Some(1000.0)
        );
    }

    #[test]
    fn worked_example() {
        let buildings = vec![building(500.0), building(500.0)];
        let blocks = vec![block("011", Some(50.0))];

        let (allocated, _) = allocate_population(buildings, &blocks, &ops(vec![Some(0); 2]));

        assert!((allocated[0].allocation.estimated_residents - 25.0).abs() < 1e-9);
        assert_eq!(allocated[0].resident_count(), 25);
        assert_eq!(allocated[0].allocation.block_id.as_deref(), Some("011"));
    }

    #[test]
    fn blocks_sharing_an_id_share_a_total() {
        let buildings = vec![building(100.0), building(300.0)];
        let blocks = vec![block("A", Some(40.0)), block("A", Some(40.0))];

        let (allocated, _) =
            allocate_population(buildings, &blocks, &ops(vec![Some(0), Some(1)]));

        assert!((allocated[0].allocation.estimated_residents - 10.0).abs() < 1e-9);
        assert!((allocated[1].allocation.estimated_residents - 30.0).abs() < 1e-9);
    }

    #[test]
    fn never_negative_or_nan() {
        let buildings = vec![
            building(100.0),
            building(0.0),
            building(50.0),
            building(10.0),
        ];
        let blocks = vec![
            block("zero", Some(20.0)),
            block("null", None),
            block("negative", Some(-5.0)),
        ];

        let (allocated, summary) = allocate_population(
            buildings,
            &blocks,
            &ops(vec![None, Some(0), Some(1), Some(2)]),
        );

        for b in &allocated {
            let estimate = b.allocation.estimated_residents;
            assert!(estimate.is_finite());
            assert!(estimate >= 0.0);
        }
        assert!(allocated.iter().all(|b| b.resident_count() == 0));
        assert_eq!(summary.unmatched_buildings, 1);
        assert!(!allocated[0].allocation.is_matched());
        assert_eq!(summary.stranded_blocks, 1);
        assert!((summary.stranded_population - 20.0).abs() < 1e-9);
    }

    #[test]
    fn estimate_guards() {
        assert!((estimate_residents(Some(50.0), 500.0, 1000.0) - 25.0).abs() < 1e-9);
        assert!(estimate_residents(Some(50.0), 0.0, 0.0).abs() < f64::EPSILON);
        assert!(estimate_residents(Some(50.0), 10.0, 0.0).abs() < f64::EPSILON);
        assert!(estimate_residents(None, 10.0, 100.0).abs() < f64::EPSILON);
        assert!(estimate_residents(Some(-50.0), 10.0, 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn builds_blocks_from_features() {
        let config = PopulationSourceConfig {
            path: "blocks.geojson".into(),
            population_attribute: "ew2021".to_string(),
            block_id_attribute: "schl5".to_string(),
        };
        let features = vec![
            feature(square(0.0, 0.0, 1.0), json!({"schl5": "0011", "ew2021": 120})),
            feature(square(0.0, 0.0, 1.0), json!({"schl5": 12, "ew2021": "80"})),
            feature(square(0.0, 0.0, 1.0), json!({"ew2021": null})),
        ];

        let blocks = blocks_from_features(features, &config);

        assert_eq!(blocks[0].block_id, "0011");
        assert_eq!(blocks[0].population, Some(120.0));
        assert_eq!(blocks[1].block_id, "12");
        assert_eq!(blocks[1].population, Some(80.0));
        assert_eq!(blocks[2].block_id, "#2");
        assert_eq!(blocks[2].population, None);
    }
}
