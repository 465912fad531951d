//! Reads polygon layers from `GeoJSON` files.
//!
//! Only polygon and multipolygon features are kept. Features with a
//! missing or non-polygon geometry are counted in
//! [`PolygonLayer::skipped`] and otherwise ignored.

use std::path::Path;

use geo::MultiPolygon;
use geojson::GeoJson;

use crate::crs::crs_from_member;
use crate::{LayerError, PolygonFeature, PolygonLayer};

/// Reads a `GeoJSON` `FeatureCollection` file as a polygon layer.
///
/// # Errors
///
/// Returns [`LayerError`] if the file cannot be read, is not valid
/// `GeoJSON`, or is not a `FeatureCollection`.
pub fn read_polygon_layer(path: &Path) -> Result<PolygonLayer, LayerError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LayerError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let layer = parse_polygon_layer(&contents, &path.display().to_string())?;
    log::debug!(
        "Read {} polygon features from {} ({} skipped)",
        layer.len(),
        path.display(),
        layer.skipped
    );
    Ok(layer)
}

/// Parses `GeoJSON` text as a polygon layer. `origin` names the source in
/// error messages.
///
/// # Errors
///
/// Returns [`LayerError`] if the text is not a `GeoJSON`
/// `FeatureCollection`.
pub fn parse_polygon_layer(contents: &str, origin: &str) -> Result<PolygonLayer, LayerError> {
    let geojson: GeoJson = contents.parse().map_err(|e| LayerError::GeoJson {
        path: origin.to_string(),
        source: Box::new(e),
    })?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(LayerError::NotFeatureCollection {
            path: origin.to_string(),
        });
    };

    let crs = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(crs_from_member);

    let mut layer = PolygonLayer {
        features: Vec::with_capacity(collection.features.len()),
        crs,
        skipped: 0,
    };

    for feature in collection.features {
        let Some(geometry) = feature.geometry.and_then(to_multipolygon) else {
            layer.skipped += 1;
            continue;
        };
        layer.features.push(PolygonFeature {
            geometry,
            properties: feature.properties.unwrap_or_default(),
        });
    }

    Ok(layer)
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
