//! Statistical attribute assignment.
//!
//! Area-level frequency rates become per-point booleans: a point gets
//! `1` for a statistic when `rate / (norm / 100) >= random_draw`. All
//! statistics of a point compare against the same draw, so statistics
//! with similar rates end up correlated across points.

use std::collections::BTreeSet;

use geo::MultiPolygon;
use popcloud_layers::PolygonFeature;
use popcloud_layers::attributes::read_number;
use popcloud_population_models::{
    RANDOM_DRAW_FIELD, ResidentPoint, StatisticArea, StatisticBinding,
};
use popcloud_spatial::SpatialOps;

/// Diagnostics collected while assigning statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsSummary {
    /// Points outside every statistic area.
    pub unmatched_points: usize,
    /// Points flagged `1`, per binding in binding order.
    pub flagged: Vec<usize>,
}

/// Pairs each input attribute with its output attribute name.
///
/// An input without a configured output name at the same position, or
/// whose output name equals the input name, is written as
/// `input + "_"`. Names colliding with `random_draw` or an earlier output
/// get `_` appended until unique.
#[must_use]
pub fn resolve_bindings(inputs: &[String], outputs: &[String]) -> Vec<StatisticBinding> {
    let mut taken: BTreeSet<String> = BTreeSet::from([RANDOM_DRAW_FIELD.to_string()]);

    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let mut output = match outputs.get(i) {
                Some(name) if name != input && !name.trim().is_empty() => name.clone(),
                _ => format!("{input}_"),
            };
            while taken.contains(&output) {
                output.push('_');
            }
            taken.insert(output.clone());

            StatisticBinding {
                input: input.clone(),
                output,
            }
        })
        .collect()
}

/// Reads the configured rates of every statistic feature.
#[must_use]
pub fn statistic_areas(
    features: Vec<PolygonFeature>,
    bindings: &[StatisticBinding],
) -> Vec<StatisticArea> {
    features
        .into_iter()
        .map(|feature| StatisticArea {
            rates: bindings
                .iter()
                .map(|b| read_number(&feature.properties, &b.input).value())
                .collect(),
            geometry: feature.geometry,
        })
        .collect()
}

/// The draw value at or below which a statistic applies.
#[must_use]
pub fn statistic_threshold(rate: f64, norm: f64) -> f64 {
    rate / (norm / 100.0)
}

/// `1` if the statistic applies to a point with the given draw, else `0`.
///
/// A missing rate never applies.
#[must_use]
pub fn attribute_flag(rate: Option<f64>, norm: f64, draw: f64) -> u8 {
    match rate {
        Some(rate) if statistic_threshold(rate, norm) >= draw => 1,
        _ => 0,
    }
}

/// Joins each point to the statistic area containing it and writes the
/// joined rates and the derived flags onto the point.
pub fn assign_statistics<O: SpatialOps + ?Sized>(
    points: &mut [ResidentPoint],
    areas: &[StatisticArea],
    bindings: &[StatisticBinding],
    norm: f64,
    ops: &O,
) -> StatisticsSummary {
    let matches = {
        let locations: Vec<_> = points.iter().map(|p| p.location).collect();
        let targets: Vec<&MultiPolygon<f64>> = areas.iter().map(|a| &a.geometry).collect();
        ops.join_within(&locations, &targets)
    };

    let mut summary = StatisticsSummary {
        unmatched_points: 0,
        flagged: vec![0; bindings.len()],
    };

    for (point, matched) in points.iter_mut().zip(matches) {
        let rates: Vec<Option<f64>> = matched.map_or_else(
            || vec![None; bindings.len()],
            |i| areas[i].rates.clone(),
        );
        if matched.is_none() {
            summary.unmatched_points += 1;
        }

        // Joined values first so a flag always wins over a raw value of the
        // same name.
        for (binding, rate) in bindings.iter().zip(&rates) {
            point
                .attributes
                .insert(binding.input.clone(), serde_json::json!(rate));
        }
        for (j, (binding, rate)) in bindings.iter().zip(&rates).enumerate() {
            let flag = attribute_flag(*rate, norm, point.random_draw);
            summary.flagged[j] += usize::from(flag);
            point
                .attributes
                .insert(binding.output.clone(), serde_json::json!(flag));
        }
    }

    summary
}
