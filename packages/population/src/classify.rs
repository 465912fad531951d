//! Residential capacity classification.
//!
//! Maps each building's (function class, floor count) pair to a number of
//! residential floors using the ordered classification table, then weighs
//! it by footprint area. The result, the residential floor area, is the
//! proxy for living space used by the allocator.

use popcloud_layers::PolygonFeature;
use popcloud_layers::attributes::{AttributeNumber, read_number, read_text};
use popcloud_population_models::config::BuildingSourceConfig;
use popcloud_population_models::{Building, ResidentialClass};
use popcloud_spatial::SpatialOps;
use thiserror::Error;

/// Errors from classifying buildings.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The floor count attribute holds something other than a number.
    #[error("Building {feature} has a non-numeric floor count in \"{attribute}\": {value}")]
    InvalidFloorCount {
        /// Position of the feature in the filtered building layer.
        feature: usize,
        /// Configured floor count attribute.
        attribute: String,
        /// The offending value.
        value: String,
    },
}

/// Number of residential floors for one building.
///
/// Buildings without floors, or whose class is not in `classes`, have
/// none. A single-storey building of a residential class always has one.
#[must_use]
pub fn residential_floors(
    function_class: Option<&str>,
    floor_count: Option<i64>,
    classes: &[ResidentialClass],
) -> u32 {
    let Some(floors) = floor_count.filter(|&f| f != 0) else {
        return 0;
    };
    let Some(class) = function_class.and_then(|label| classes.iter().find(|c| c.label == label))
    else {
        return 0;
    };

    if floors == 1 {
        return 1;
    }

    u32::try_from(class.rule.apply(floors).max(0)).unwrap_or(u32::MAX)
}

/// Classifies every building feature.
///
/// Either all buildings are returned with their derived fields, or the
/// first error is returned and none are.
///
/// # Errors
///
/// Returns [`ClassifyError::InvalidFloorCount`] if a floor count is
/// neither null nor numeric.
pub fn classify_buildings<O: SpatialOps + ?Sized>(
    features: Vec<PolygonFeature>,
    config: &BuildingSourceConfig,
    ops: &O,
) -> Result<Vec<Building>, ClassifyError> {
    features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| classify_feature(index, feature, config, ops))
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn classify_feature<O: SpatialOps + ?Sized>(
    index: usize,
    feature: PolygonFeature,
    config: &BuildingSourceConfig,
    ops: &O,
) -> Result<Building, ClassifyError> {
    let floor_count = match read_number(&feature.properties, &config.levels_attribute) {
        AttributeNumber::Missing => None,
        AttributeNumber::Number(n) => Some(n.trunc() as i64),
        AttributeNumber::NotNumeric => {
            return Err(ClassifyError::InvalidFloorCount {
                feature: index,
                attribute: config.levels_attribute.clone(),
                value: feature
                    .properties
                    .get(&config.levels_attribute)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            });
        }
    };

    let function_class = read_text(&feature.properties, &config.function_attribute);
    let floors = residential_floors(
        function_class.as_deref(),
        floor_count,
        &config.residential_classes,
    );
    let footprint_area = ops.area(&feature.geometry);

    Ok(Building {
        geometry: feature.geometry,
        properties: feature.properties,
        function_class,
        floor_count,
        residential_floors: floors,
        footprint_area,
        residential_floor_area: f64::from(floors) * footprint_area,
    })
}

#[cfg(test)]
mod tests {
    use popcloud_population_models::ResidentialRule;
    use serde_json::json;

    use super::*;
    use crate::test_support::{ScriptedOps, feature, square};

    fn classes() -> Vec<ResidentialClass> {
        vec![
            ResidentialClass {
                label: "Gemischt genutztes Gebäude mit Wohnen".to_string(),
                rule: ResidentialRule::Halve,
            },
            ResidentialClass {
                label: "Wohngebäude mit Gewerbe und Industrie".to_string(),
                rule: ResidentialRule::DecrementOne,
            },
            ResidentialClass {
                label: "Wohnhaus".to_string(),
                rule: ResidentialRule::Identity,
            },
        ]
    }

    fn config() -> BuildingSourceConfig {
        BuildingSourceConfig {
            path: "buildings.geojson".into(),
            levels_attribute: "aog".to_string(),
            function_attribute: "bezgfk".to_string(),
            filter: Vec::new(),
            residential_classes: classes(),
        }
    }

    fn ops() -> ScriptedOps {
        ScriptedOps {
            area: 100.0,
            overlap: Vec::new(),
            within: Vec::new(),
        }
    }

    #[test]
    fn applies_class_rules() {
        let classes = classes();
        assert_eq!(residential_floors(Some("Wohnhaus"), Some(5), &classes), 5);
        assert_eq!(
            residential_floors(Some("Wohngebäude mit Gewerbe und Industrie"), Some(5), &classes),
            4
        );
        assert_eq!(
            residential_floors(Some("Gemischt genutztes Gebäude mit Wohnen"), Some(5), &classes),
            2
        );
    }

    #[test]
    fn single_storey_residential_counts_one_floor() {
        let classes = classes();
        for label in [
            "Wohnhaus",
            "Wohngebäude mit Gewerbe und Industrie",
            "Gemischt genutztes Gebäude mit Wohnen",
        ] {
            assert_eq!(residential_floors(Some(label), Some(1), &classes), 1);
        }
    }

    #[test]
    fn missing_floors_or_unknown_class_yield_zero() {
        let classes = classes();
        assert_eq!(residential_floors(Some("Wohnhaus"), None, &classes), 0);
        assert_eq!(residential_floors(Some("Wohnhaus"), Some(0), &classes), 0);
        assert_eq!(residential_floors(Some("Garage"), Some(3), &classes), 0);
        assert_eq!(residential_floors(Some("Garage"), Some(1), &classes), 0);
        assert_eq!(residential_floors(None, Some(3), &classes), 0);
    }

    #[test]
    fn negative_floor_counts_clamp_to_zero() {
        let classes = classes();
        assert_eq!(
            residential_floors(Some("Wohngebäude mit Gewerbe und Industrie"), Some(-2), &classes),
            0
        );
    }

    #[test]
    fn first_matching_class_wins() {
        let mut classes = classes();
        classes.push(ResidentialClass {
            label: "Wohnhaus".to_string(),
            rule: ResidentialRule::Halve,
        });
        assert_eq!(residential_floors(Some("Wohnhaus"), Some(6), &classes), 6);
    }

    #[test]
    fn classifies_features() {
        let features = vec![
            feature(square(0.0, 0.0, 10.0), json!({"aog": 5, "bezgfk": "Wohnhaus"})),
            feature(square(0.0, 0.0, 10.0), json!({"aog": "3", "bezgfk": "Wohnhaus"})),
            feature(square(0.0, 0.0, 10.0), json!({"aog": null, "bezgfk": "Wohnhaus"})),
            feature(square(0.0, 0.0, 10.0), json!({"aog": 4, "bezgfk": "Bürogebäude"})),
        ];

        let buildings = classify_buildings(features, &config(), &ops()).unwrap();

        let floors: Vec<u32> = buildings.iter().map(|b| b.residential_floors).collect();
        assert_eq!(floors, vec![5, 3, 0, 0]);
        assert!((buildings[0].footprint_area - 100.0).abs() < 1e-9);
        assert!((buildings[0].residential_floor_area - 500.0).abs() < 1e-9);
        assert!(buildings[2].floor_count.is_none());
        assert!(buildings[3].residential_floor_area.abs() < 1e-9);
        assert!(!buildings[3].is_residential());
        assert_eq!(buildings[0].properties["bezgfk"], "Wohnhaus");
    }

    #[test]
    fn invalid_floor_count_aborts_everything() {
        let features = vec![
            feature(square(0.0, 0.0, 10.0), json!({"aog": 5, "bezgfk": "Wohnhaus"})),
            feature(square(0.0, 0.0, 10.0), json!({"aog": "viele", "bezgfk": "Wohnhaus"})),
        ];

        let err = classify_buildings(features, &config(), &ops()).unwrap_err();

        let ClassifyError::InvalidFloorCount {
            feature: position,
            value,
            ..
        } = err;
        assert_eq!(position, 1);
        assert_eq!(value, "\"viele\"");
    }
}
