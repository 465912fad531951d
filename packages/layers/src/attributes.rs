//! Coercion of attribute values into numbers and keys.
//!
//! Source datasets are inconsistent about types: floor counts and
//! population figures arrive as numbers in one export and as strings in
//! the next. These helpers accept both.

use popcloud_population_models::Attributes;

/// A numeric attribute read from a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeNumber {
    /// Attribute missing, null, or an empty string.
    Missing,
    /// A finite number.
    Number(f64),
    /// Present but not interpretable as a number.
    NotNumeric,
}

impl AttributeNumber {
    /// The number, treating non-numeric values as missing.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n),
            Self::Missing | Self::NotNumeric => None,
        }
    }
}

/// Reads `name` from `properties` as a number.
#[must_use]
pub fn read_number(properties: &Attributes, name: &str) -> AttributeNumber {
    properties
        .get(name)
        .map_or(AttributeNumber::Missing, number_from_value)
}

/// Interprets a single JSON value as a number.
#[must_use]
pub fn number_from_value(value: &serde_json::Value) -> AttributeNumber {
    match value {
        serde_json::Value::Null => AttributeNumber::Missing,
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|n| n.is_finite())
            .map_or(AttributeNumber::NotNumeric, AttributeNumber::Number),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return AttributeNumber::Missing;
            }
            s.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map_or(AttributeNumber::NotNumeric, AttributeNumber::Number)
        }
        _ => AttributeNumber::NotNumeric,
    }
}

/// Reads `name` as a text label. Numbers are rendered in their JSON form.
#[must_use]
pub fn read_text(properties: &Attributes, name: &str) -> Option<String> {
    properties.get(name).and_then(value_key)
}

/// Renders a value as a grouping key: strings as-is, numbers and booleans
/// in their JSON form, everything else as `None`.
#[must_use]
pub fn value_key(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
