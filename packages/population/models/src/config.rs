//! TOML schema for a pipeline run.
//!
//! A single [`PipelineConfig`] names the three input datasets, the
//! attribute mappings for each, the ordered residential classification
//! table, and where and how to write the resident point cloud.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{Attributes, ResidentialClass};

/// Complete configuration of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Building footprint dataset.
    pub buildings: BuildingSourceConfig,
    /// Block-level population density dataset.
    pub population: PopulationSourceConfig,
    /// Optional dataset of per-area frequency statistics.
    #[serde(default)]
    pub statistics: Option<StatisticsConfig>,
    /// Output destination.
    pub output: OutputConfig,
    /// Seed for the random number generator. Runs are not reproducible
    /// when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PipelineConfig {
    /// Returns the statistics section if the stage is enabled.
    #[must_use]
    pub fn enabled_statistics(&self) -> Option<&StatisticsConfig> {
        self.statistics.as_ref().filter(|s| s.enabled)
    }
}

/// Where to read buildings from and how to interpret their attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSourceConfig {
    /// `GeoJSON` file with building polygons.
    pub path: PathBuf,
    /// Attribute holding the number of above-ground floors.
    pub levels_attribute: String,
    /// Attribute holding the building function label.
    pub function_attribute: String,
    /// Conditions a feature must satisfy to count as a building. All
    /// conditions are combined with AND.
    #[serde(default)]
    pub filter: Vec<AttributeFilter>,
    /// Ordered classification table; the first matching label wins.
    pub residential_classes: Vec<ResidentialClass>,
}

/// Where to read population blocks from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationSourceConfig {
    /// `GeoJSON` file with block polygons.
    pub path: PathBuf,
    /// Attribute holding the block population.
    pub population_attribute: String,
    /// Attribute holding the unique block identifier.
    pub block_id_attribute: String,
}

/// Statistics stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Whether the stage runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// `GeoJSON` file with statistic area polygons.
    pub path: PathBuf,
    /// Frequency attributes to transfer, in order.
    pub attributes: Vec<String>,
    /// Output names, positionally matched to `attributes`.
    #[serde(default)]
    pub output_attributes: Vec<String>,
    /// Value of a rate that corresponds to 100% (e.g. 1000 for "per 1000
    /// residents").
    #[serde(default = "default_norm")]
    pub norm: f64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_norm() -> f64 {
    100.0
}

/// Output destination and encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Resident point file.
    pub path: PathBuf,
    /// Coordinate reference system identifier written to the output.
    #[serde(default = "default_crs")]
    pub crs: String,
    /// File format of every written layer.
    #[serde(default)]
    pub format: OutputFormat,
    /// Optional file for the enriched building layer.
    #[serde(default)]
    pub buildings_path: Option<PathBuf>,
}

fn default_crs() -> String {
    "EPSG:4326".to_string()
}

/// Supported vector output encodings.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// A single `GeoJSON` `FeatureCollection`.
    #[default]
    #[serde(alias = "GeoJSON")]
    GeoJson,
    /// Newline-delimited `GeoJSON` features.
    #[serde(alias = "GeoJSONSeq")]
    GeoJsonSeq,
}

/// A single attribute condition used to select building features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeFilter {
    /// Attribute equals `value`.
    Equals {
        /// Attribute name.
        attribute: String,
        /// Expected value.
        value: serde_json::Value,
    },
    /// Attribute is present, non-null, and differs from `value`.
    NotEquals {
        /// Attribute name.
        attribute: String,
        /// Rejected value.
        value: serde_json::Value,
    },
    /// Attribute is missing or null.
    IsNull {
        /// Attribute name.
        attribute: String,
    },
    /// Attribute is present and not null.
    IsNotNull {
        /// Attribute name.
        attribute: String,
    },
}

impl AttributeFilter {
    /// Evaluates the condition against a feature's attributes.
    #[must_use]
    pub fn matches(&self, properties: &Attributes) -> bool {
        match self {
            Self::Equals { attribute, value } => properties
                .get(attribute)
                .is_some_and(|actual| values_equal(actual, value)),
            Self::NotEquals { attribute, value } => properties
                .get(attribute)
                .filter(|actual| !actual.is_null())
                .is_some_and(|actual| !values_equal(actual, value)),
            Self::IsNull { attribute } => properties
                .get(attribute)
                .is_none_or(serde_json::Value::is_null),
            Self::IsNotNull { attribute } => properties
                .get(attribute)
                .is_some_and(|actual| !actual.is_null()),
        }
    }
}

/// Numbers compare by value so that `5` matches `5.0`.
fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}
