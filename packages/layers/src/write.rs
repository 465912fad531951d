//! Writes features as `GeoJSON` or `GeoJSONSeq`.
//!
//! `GeoJSON` output is a single `FeatureCollection` carrying a named `crs`
//! member. `GeoJSONSeq` output is one feature per line and has nowhere to
//! put the CRS.

use std::io::{BufWriter, Write as _};
use std::path::Path;

use geo::{MultiPolygon, Point};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use popcloud_population_models::Attributes;
use popcloud_population_models::config::OutputFormat;

use crate::LayerError;
use crate::crs::crs_member;

/// Builds a point feature.
#[must_use]
pub fn point_feature(point: &Point<f64>, attributes: Attributes) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(point))),
        id: None,
        properties: Some(attributes),
        foreign_members: None,
    }
}

/// Builds a (multi)polygon feature.
#[must_use]
pub fn polygon_feature(geometry: &MultiPolygon<f64>, attributes: Attributes) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(attributes),
        foreign_members: None,
    }
}

/// Writes `features` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`LayerError`] if the file cannot be created or serialization
/// fails.
pub fn write_features(
    path: &Path,
    features: Vec<Feature>,
    format: OutputFormat,
    crs: &str,
) -> Result<(), LayerError> {
    let io_err = |source| LayerError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    let count = features.len();

    match format {
        OutputFormat::GeoJson => {
            let mut foreign_members = JsonObject::new();
            foreign_members.insert("crs".to_string(), crs_member(crs));

            let collection = FeatureCollection {
                bbox: None,
                features,
                foreign_members: Some(foreign_members),
            };
            serde_json::to_writer(&mut writer, &collection)?;
        }
        OutputFormat::GeoJsonSeq => {
            log::debug!("GeoJSONSeq output has no CRS member; {crs} is implied");
            for feature in &features {
                serde_json::to_writer(&mut writer, feature)?;
                writer.write_all(b"\n").map_err(io_err)?;
            }
        }
    }

    writer.flush().map_err(io_err)?;
    log::debug!("Wrote {count} features to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use serde_json::json;

    use super::*;
    use crate::read::read_polygon_layer;

    #[test]
    fn writes_collection_with_crs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/points.geojson");

        let mut attrs = Attributes::new();
        attrs.insert("random_draw".to_string(), json!(12.5));
        let features = vec![
            point_feature(&Point::new(1.0, 2.0), attrs.clone()),
            point_feature(&Point::new(3.0, 4.0), attrs),
        ];

        write_features(&path, features, OutputFormat::GeoJson, "EPSG:25833").unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["type"], "FeatureCollection");
        assert_eq!(
            written["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::25833"
        );
        assert_eq!(written["features"].as_array().unwrap().len(), 2);
        assert_eq!(written["features"][1]["geometry"]["coordinates"], json!([3.0, 4.0]));
        assert_eq!(written["features"][0]["properties"]["random_draw"], 12.5);
    }

    #[test]
    fn writes_one_feature_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.geojsonseq");

        let features = (0..3)
            .map(|i| point_feature(&Point::new(f64::from(i), 0.0), Attributes::new()))
            .collect();
        write_features(&path, features, OutputFormat::GeoJsonSeq, "EPSG:4326").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "Feature");
    }

    #[test]
    fn polygon_layers_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildings.geojson");

        let geometry = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 0.0),
        ]]);
        let mut attrs = Attributes::new();
        attrs.insert("building_residents".to_string(), json!(3.5));

        write_features(
            &path,
            vec![polygon_feature(&geometry, attrs)],
            OutputFormat::GeoJson,
            "EPSG:25833",
        )
        .unwrap();

        let layer = read_polygon_layer(&path).unwrap();
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.crs.as_deref(), Some("EPSG:25833"));
        assert_eq!(layer.features[0].geometry, geometry);
    }
}
