//! Reduction of resident points to their output attributes.

use popcloud_population_models::{
    AnnotatedResidentPoint, Attributes, RANDOM_DRAW_FIELD, ResidentPoint, StatisticBinding,
};

/// Attribute names that survive projection: `random_draw` followed by the
/// statistic outputs in binding order.
#[must_use]
pub fn keep_list(bindings: &[StatisticBinding]) -> Vec<String> {
    std::iter::once(RANDOM_DRAW_FIELD.to_string())
        .chain(bindings.iter().map(|b| b.output.clone()))
        .collect()
}

/// Drops every attribute not in `keep`. Geometry is untouched.
///
/// `random_draw` comes from the point itself; other kept attributes that
/// are absent on a point are written as `0`.
#[must_use]
pub fn project_attributes(
    points: Vec<ResidentPoint>,
    keep: &[String],
) -> Vec<AnnotatedResidentPoint> {
    points
        .into_iter()
        .map(|mut point| {
            let mut attributes = Attributes::new();
            for name in keep {
                let value = if name == RANDOM_DRAW_FIELD {
                    serde_json::json!(point.random_draw)
                } else {
                    point
                        .attributes
                        .remove(name)
                        .unwrap_or_else(|| serde_json::json!(0))
                };
                attributes.insert(name.clone(), value);
            }
            AnnotatedResidentPoint {
                location: point.location,
                attributes,
            }
        })
        .collect()
}
