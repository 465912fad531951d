//! End-to-end pipeline: read datasets, run every stage, write outputs.
//!
//! Stages run one after another and each fully materializes its result
//! before the next starts. A missing buildings or population dataset
//! stops the run before anything is written; a missing statistics
//! dataset only skips the statistics stage.

use std::path::Path;
use std::sync::Arc;

use popcloud_layers::crs::same_crs;
use popcloud_layers::dedup::remove_duplicate_geometries;
use popcloud_layers::{PolygonFeature, PolygonLayer, point_feature, polygon_feature};
use popcloud_population_models::config::PipelineConfig;
use popcloud_population_models::{
    AllocatedBuilding, AnnotatedResidentPoint, Attributes, BLOCK_RESIDENTIAL_LEVEL_AREA_FIELD,
    BUILDING_AREA_FIELD, BUILDING_RESIDENTS_FIELD, RESIDENTIAL_LEVEL_AREA_FIELD,
    RESIDENTIAL_LEVELS_FIELD,
};
use popcloud_spatial::SpatialOps;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng as _};

use crate::PipelineError;
use crate::allocate::{AllocationSummary, allocate_population, blocks_from_features};
use crate::classify::classify_buildings;
use crate::generate::generate_resident_points;
use crate::progress::ProgressCallback;
use crate::project::{keep_list, project_attributes};
use crate::statistics::{
    StatisticsSummary, assign_statistics, resolve_bindings, statistic_areas,
};

/// The datasets of one run, as read from disk.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Building footprints.
    pub buildings: PolygonLayer,
    /// Population blocks.
    pub population: PolygonLayer,
    /// Statistic areas; `None` when the stage is disabled or the dataset
    /// is unavailable.
    pub statistics: Option<PolygonLayer>,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Resident points reduced to their output attributes.
    pub points: Vec<AnnotatedResidentPoint>,
    /// Buildings with their derived fields and allocations.
    pub buildings: Vec<AllocatedBuilding>,
    /// Run diagnostics.
    pub summary: RunSummary,
}

/// Counts collected over a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Building features read.
    pub buildings_read: usize,
    /// Building features rejected by the configured filter.
    pub buildings_filtered: usize,
    /// Duplicate building geometries removed.
    pub duplicate_buildings: usize,
    /// Duplicate block geometries removed.
    pub duplicate_blocks: usize,
    /// Non-polygon features ignored across all inputs.
    pub skipped_features: usize,
    /// Buildings that went through classification.
    pub buildings: usize,
    /// Buildings with at least one residential floor.
    pub residential_buildings: usize,
    /// Allocation diagnostics.
    pub allocation: AllocationSummary,
    /// Resident points generated.
    pub points: usize,
    /// Statistics diagnostics; `None` when the stage was skipped.
    pub statistics: Option<StatisticsSummary>,
    /// Attribute names of the output points.
    pub output_attributes: Vec<String>,
}

impl RunSummary {
    /// Logs the summary at info level.
    pub fn report(&self) {
        log::info!(
            "Buildings: {} read, {} filtered out, {} duplicates removed, {} classified ({} residential)",
            self.buildings_read,
            self.buildings_filtered,
            self.duplicate_buildings,
            self.buildings,
            self.residential_buildings
        );
        log::info!(
            "Blocks: {} duplicates removed, {} buildings unmatched, {} blocks without residential floor area ({:.1} residents not placed)",
            self.duplicate_blocks,
            self.allocation.unmatched_buildings,
            self.allocation.stranded_blocks,
            self.allocation.stranded_population
        );
        log::info!(
            "Residents: {:.1} estimated, {} points generated",
            self.allocation.estimated_residents,
            self.points
        );
        if let Some(statistics) = &self.statistics {
            log::info!(
                "Statistics: {} points outside every area, flagged per attribute: {:?}",
                statistics.unmatched_points,
                statistics.flagged
            );
        }
        if self.skipped_features > 0 {
            log::info!("Ignored {} non-polygon features", self.skipped_features);
        }
        log::info!("Output attributes: {}", self.output_attributes.join(", "));
    }
}

/// Creates the run's random number generator.
///
/// Seeded runs are reproducible; unseeded runs draw from OS entropy.
#[must_use]
pub fn build_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Reads all input datasets.
///
/// # Errors
///
/// Returns [`PipelineError::MissingInput`] if the buildings or population
/// file does not exist, or [`PipelineError::Layer`] if either cannot be
/// parsed.
pub fn read_inputs(config: &PipelineConfig) -> Result<PipelineInputs, PipelineError> {
    require_file("buildings", &config.buildings.path)?;
    require_file("population density", &config.population.path)?;

    log::info!("Reading datasets...");
    let buildings = popcloud_layers::read_polygon_layer(&config.buildings.path)?;
    let population = popcloud_layers::read_polygon_layer(&config.population.path)?;

    let statistics = config.enabled_statistics().and_then(|statistics| {
        let path = &statistics.path;
        if !path.is_file() {
            log::warn!(
                "Found no valid statistics dataset at \"{}\". No statistical attributes will be adopted.",
                path.display()
            );
            return None;
        }
        match popcloud_layers::read_polygon_layer(path) {
            Ok(layer) => Some(layer),
            Err(e) => {
                log::warn!("{e}. No statistical attributes will be adopted.");
                None
            }
        }
    });

    let mut named = vec![("buildings", &buildings), ("population density", &population)];
    if let Some(layer) = &statistics {
        named.push(("statistics", layer));
    }
    for (kind, layer) in named {
        if let Some(crs) = &layer.crs {
            if !same_crs(crs, &config.output.crs) {
                log::warn!(
                    "The {kind} dataset declares {crs} but output is written as {}; coordinates are not transformed",
                    config.output.crs
                );
            }
        }
    }

    Ok(PipelineInputs {
        buildings,
        population,
        statistics,
    })
}

fn require_file(kind: &'static str, path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingInput {
            kind,
            path: path.display().to_string(),
        })
    }
}

/// Runs every stage on already loaded datasets.
///
/// # Errors
///
/// Returns [`PipelineError::Classify`] if a building cannot be classified.
pub fn interpolate<O: SpatialOps + ?Sized>(
    config: &PipelineConfig,
    inputs: PipelineInputs,
    ops: &O,
    rng: &mut dyn RngCore,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineOutput, PipelineError> {
    let mut summary = RunSummary {
        buildings_read: inputs.buildings.len(),
        skipped_features: inputs.buildings.skipped
            + inputs.population.skipped
            + inputs.statistics.as_ref().map_or(0, |l| l.skipped),
        ..RunSummary::default()
    };

    log::info!("Preparing datasets...");
    let (deduplicated, duplicates) = remove_duplicate_geometries(inputs.buildings.features);
    summary.duplicate_buildings = duplicates;

    let deduplicated_count = deduplicated.len();
    let building_features: Vec<PolygonFeature> = deduplicated
        .into_iter()
        .filter(|f| {
            config
                .buildings
                .filter
                .iter()
                .all(|condition| condition.matches(&f.properties))
        })
        .collect();
    summary.buildings_filtered = deduplicated_count - building_features.len();

    let (block_features, duplicates) = remove_duplicate_geometries(inputs.population.features);
    summary.duplicate_blocks = duplicates;
    log::debug!(
        "{} buildings and {} blocks after cleanup",
        building_features.len(),
        block_features.len()
    );

    log::info!("Interpolating building population...");
    let buildings = classify_buildings(building_features, &config.buildings, ops)?;
    summary.buildings = buildings.len();
    summary.residential_buildings = buildings.iter().filter(|b| b.is_residential()).count();

    let blocks = blocks_from_features(block_features, &config.population);
    let (allocated, allocation) = allocate_population(buildings, &blocks, ops);
    if allocation.stranded_blocks > 0 {
        log::warn!(
            "{} blocks have no residential floor area; {:.1} residents were not placed",
            allocation.stranded_blocks,
            allocation.stranded_population
        );
    }
    summary.allocation = allocation;

    log::info!("Generating point cloud...");
    let mut points = generate_resident_points(&allocated, ops, rng, progress);
    summary.points = points.len();

    log::info!("Adopting statistics...");
    let bindings = match (config.enabled_statistics(), inputs.statistics) {
        (Some(statistics), Some(layer)) => {
            let bindings = resolve_bindings(&statistics.attributes, &statistics.output_attributes);
            let areas = statistic_areas(layer.features, &bindings);
            let assigned = assign_statistics(&mut points, &areas, &bindings, statistics.norm, ops);
            if assigned.unmatched_points > 0 {
                log::warn!(
                    "{} points lie outside every statistic area and get 0 for all statistics",
                    assigned.unmatched_points
                );
            }
            summary.statistics = Some(assigned);
            bindings
        }
        _ => {
            log::info!("Statistics stage skipped");
            Vec::new()
        }
    };

    log::info!("Cleaning up dataset...");
    let keep = keep_list(&bindings);
    let points = project_attributes(points, &keep);
    summary.output_attributes = keep;

    Ok(PipelineOutput {
        points,
        buildings: allocated,
        summary,
    })
}

/// Writes the resident points and, if configured, the building layer.
///
/// # Errors
///
/// Returns [`PipelineError::Layer`] if a file cannot be written.
pub fn write_outputs(config: &PipelineConfig, output: &PipelineOutput) -> Result<(), PipelineError> {
    log::info!("Saving output...");

    let features = output
        .points
        .iter()
        .map(|p| point_feature(&p.location, p.attributes.clone()))
        .collect();
    popcloud_layers::write_features(
        &config.output.path,
        features,
        config.output.format,
        &config.output.crs,
    )?;
    log::info!(
        "Wrote {} resident points to {}",
        output.points.len(),
        config.output.path.display()
    );

    if let Some(path) = &config.output.buildings_path {
        let features = output
            .buildings
            .iter()
            .map(|b| polygon_feature(&b.building.geometry, building_attributes(config, b)))
            .collect();
        popcloud_layers::write_features(path, features, config.output.format, &config.output.crs)?;
        log::info!(
            "Wrote {} buildings to {}",
            output.buildings.len(),
            path.display()
        );
    }

    Ok(())
}

fn building_attributes(config: &PipelineConfig, allocated: &AllocatedBuilding) -> Attributes {
    let building = &allocated.building;
    let allocation = &allocated.allocation;

    let mut attributes = building.properties.clone();
    let derived = [
        (
            RESIDENTIAL_LEVELS_FIELD,
            serde_json::json!(building.residential_floors),
        ),
        (BUILDING_AREA_FIELD, serde_json::json!(building.footprint_area)),
        (
            RESIDENTIAL_LEVEL_AREA_FIELD,
            serde_json::json!(building.residential_floor_area),
        ),
        (
            config.population.population_attribute.as_str(),
            serde_json::json!(allocation.block_population),
        ),
        (
            config.population.block_id_attribute.as_str(),
            serde_json::json!(allocation.block_id),
        ),
        (
            BLOCK_RESIDENTIAL_LEVEL_AREA_FIELD,
            serde_json::json!(allocation.block_residential_floor_area),
        ),
        (
            BUILDING_RESIDENTS_FIELD,
            serde_json::json!(allocation.estimated_residents),
        ),
    ];
    for (name, value) in derived {
        attributes.insert(name.to_string(), value);
    }
    attributes
}

/// Reads inputs, runs every stage, and writes the outputs.
///
/// # Errors
///
/// Returns [`PipelineError`] if a required input is missing or
/// unreadable, classification fails, or an output cannot be written.
/// Nothing is written unless every stage succeeded.
pub fn run<O: SpatialOps + ?Sized>(
    config: &PipelineConfig,
    ops: &O,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<RunSummary, PipelineError> {
    let inputs = read_inputs(config)?;

    let mut rng = build_rng(config.seed);
    let output = interpolate(config, inputs, ops, &mut rng, progress)?;
    write_outputs(config, &output)?;

    output.summary.report();
    log::info!("Completed.");
    Ok(output.summary)
}
