#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building, population block, and resident point types.
//!
//! These types carry data between the stages of the population pipeline:
//! buildings are classified into residential capacity, joined onto
//! population blocks, expanded into resident points, and finally annotated
//! with statistically assigned attributes.

pub mod config;

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Attribute table of a single feature, keyed by attribute name.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Number of residential floors derived by the classifier.
pub const RESIDENTIAL_LEVELS_FIELD: &str = "residential_levels";

/// Footprint area of a building polygon.
pub const BUILDING_AREA_FIELD: &str = "building_area";

/// Residential floors multiplied by footprint area.
pub const RESIDENTIAL_LEVEL_AREA_FIELD: &str = "residential_level_area";

/// Sum of residential floor area over all buildings of a block.
pub const BLOCK_RESIDENTIAL_LEVEL_AREA_FIELD: &str = "block_residential_level_area";

/// Real-valued resident estimate of a building.
pub const BUILDING_RESIDENTS_FIELD: &str = "building_residents";

/// Per-point uniform draw in `[0, 100)` used to realize statistic rates.
pub const RANDOM_DRAW_FIELD: &str = "random_draw";

/// How the raw floor count of a building class translates into residential
/// floors.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResidentialRule {
    /// Mixed-use buildings: half of the floors (integer division).
    #[serde(alias = "/2")]
    Halve,
    /// Residential buildings with a commercial ground floor.
    #[serde(alias = "-1")]
    DecrementOne,
    /// Purely residential buildings: every floor counts.
    #[serde(alias = "-0")]
    Identity,
}

impl ResidentialRule {
    /// Applies the adjustment to a raw floor count.
    ///
    /// The result may be negative for degenerate input; callers clamp it.
    #[must_use]
    pub const fn apply(self, floors: i64) -> i64 {
        match self {
            Self::Halve => floors / 2,
            Self::DecrementOne => floors - 1,
            Self::Identity => floors,
        }
    }
}

/// One row of the ordered classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentialClass {
    /// Value of the building function attribute (e.g. `"Wohnhaus"`).
    pub label: String,
    /// Floor adjustment applied to buildings of this class.
    pub rule: ResidentialRule,
}

/// A building footprint enriched with its residential capacity.
#[derive(Debug, Clone)]
pub struct Building {
    /// Footprint polygon(s).
    pub geometry: MultiPolygon<f64>,
    /// Source attributes, untouched.
    pub properties: Attributes,
    /// Function class label read from the configured attribute.
    pub function_class: Option<String>,
    /// Raw floor count; `None` when absent or null.
    pub floor_count: Option<i64>,
    /// Floors counted as residential (0 for non-residential buildings).
    pub residential_floors: u32,
    /// Polygon area in squared CRS units.
    pub footprint_area: f64,
    /// `residential_floors * footprint_area`.
    pub residential_floor_area: f64,
}

impl Building {
    /// Whether any floor of this building counts as residential.
    #[must_use]
    pub const fn is_residential(&self) -> bool {
        self.residential_floors > 0
    }
}

/// A population block: a spatial unit carrying an aggregate head count.
#[derive(Debug, Clone)]
pub struct Block {
    /// Unique block identifier.
    pub block_id: String,
    /// Residents of the block; `None` when the attribute is null.
    pub population: Option<f64>,
    /// Block polygon(s).
    pub geometry: MultiPolygon<f64>,
}

/// Result of distributing block population onto one building.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAllocation {
    /// Identifier of the block the building was joined to.
    pub block_id: Option<String>,
    /// Population of that block.
    pub block_population: Option<f64>,
    /// Residential floor area summed over every building of the block.
    pub block_residential_floor_area: Option<f64>,
    /// Share of the block population, never negative or NaN.
    pub estimated_residents: f64,
}

impl BlockAllocation {
    /// Allocation for a building that matched no block.
    #[must_use]
    pub const fn unmatched() -> Self {
        Self {
            block_id: None,
            block_population: None,
            block_residential_floor_area: None,
            estimated_residents: 0.0,
        }
    }

    /// Whether the building was joined to a block.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.block_id.is_some()
    }
}

/// A building together with its population allocation.
#[derive(Debug, Clone)]
pub struct AllocatedBuilding {
    /// The classified building.
    pub building: Building,
    /// Its share of the block population.
    pub allocation: BlockAllocation,
}

impl AllocatedBuilding {
    /// Number of resident points to generate for this building.
    #[must_use]
    pub fn resident_count(&self) -> u64 {
        round_resident_count(self.allocation.estimated_residents)
    }
}

/// Rounds a real-valued estimate to the nearest whole resident.
///
/// Non-finite and non-positive estimates produce zero residents.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_const_for_fn
)]
pub fn round_resident_count(estimate: f64) -> u64 {
    if !estimate.is_finite() || estimate <= 0.0 {
        return 0;
    }
    estimate.round() as u64
}

/// A polygon of the statistics dataset with its frequency rates.
#[derive(Debug, Clone)]
pub struct StatisticArea {
    /// Area polygon(s).
    pub geometry: MultiPolygon<f64>,
    /// One rate per configured statistic, in configuration order. `None`
    /// when the attribute is missing, null, or non-numeric.
    pub rates: Vec<Option<f64>>,
}

/// Pairs a statistic attribute of the input dataset with the boolean
/// attribute written to the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticBinding {
    /// Attribute name in the statistics dataset.
    pub input: String,
    /// Attribute name on the output points.
    pub output: String,
}

/// One synthetic resident.
#[derive(Debug, Clone)]
pub struct ResidentPoint {
    /// Location inside the footprint of the originating building.
    pub location: Point<f64>,
    /// Index of the originating building.
    pub building: usize,
    /// Uniform draw in `[0, 100)` with three decimals.
    pub random_draw: f64,
    /// Attributes carried over from joins and assignments.
    pub attributes: Attributes,
}

/// A resident point reduced to its output attributes.
#[derive(Debug, Clone)]
pub struct AnnotatedResidentPoint {
    /// Point location.
    pub location: Point<f64>,
    /// `random_draw` followed by the statistic output attributes.
    pub attributes: Attributes,
}
