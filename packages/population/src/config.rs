//! Loading and validation of [`PipelineConfig`] files.
//!
//! Relative paths inside a config file are resolved against the directory
//! that contains it, so a config and its datasets can move together.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use popcloud_population_models::config::PipelineConfig;
use thiserror::Error;

/// Built-in configuration, embedded at compile time.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Cannot read config {path}: {source}")]
    Io {
        /// Config path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`PipelineConfig`].
    #[error("Invalid config {path}: {source}")]
    Toml {
        /// Config path.
        path: String,
        /// Underlying error.
        source: Box<toml::de::Error>,
    },

    /// The config parsed but its values are unusable.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Reads, resolves, and validates a config file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, does not parse, or
/// fails validation.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_config_toml(&contents, base_dir).map_err(|e| match e {
        ConfigError::Toml { source, .. } => ConfigError::Toml {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Parses config TOML and resolves relative paths against `base_dir`.
///
/// # Errors
///
/// Returns [`ConfigError`] if the TOML does not parse or fails
/// validation.
pub fn parse_config_toml(toml_str: &str, base_dir: &Path) -> Result<PipelineConfig, ConfigError> {
    let mut config: PipelineConfig =
        toml::from_str(toml_str).map_err(|source| ConfigError::Toml {
            path: "<inline>".to_string(),
            source: Box::new(source),
        })?;

    resolve_paths(&mut config, base_dir);
    validate(&config)?;
    Ok(config)
}

/// Returns the built-in configuration with paths relative to the working
/// directory.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the config is embedded).
#[must_use]
pub fn default_config() -> PipelineConfig {
    parse_config_toml(DEFAULT_CONFIG_TOML, Path::new(""))
        .unwrap_or_else(|e| panic!("Failed to parse default.toml: {e}"))
}

fn resolve_paths(config: &mut PipelineConfig, base_dir: &Path) {
    resolve(&mut config.buildings.path, base_dir);
    resolve(&mut config.population.path, base_dir);
    if let Some(statistics) = &mut config.statistics {
        resolve(&mut statistics.path, base_dir);
    }
    resolve(&mut config.output.path, base_dir);
    if let Some(path) = &mut config.output.buildings_path {
        resolve(path, base_dir);
    }
}

fn resolve(path: &mut PathBuf, base_dir: &Path) {
    if path.is_relative() {
        *path = base_dir.join(&*path);
    }
}

/// Checks the values serde cannot.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] describing the first problem found.
pub fn validate(config: &PipelineConfig) -> Result<(), ConfigError> {
    let required = [
        ("buildings.levels_attribute", &config.buildings.levels_attribute),
        (
            "buildings.function_attribute",
            &config.buildings.function_attribute,
        ),
        (
            "population.population_attribute",
            &config.population.population_attribute,
        ),
        (
            "population.block_id_attribute",
            &config.population.block_id_attribute,
        ),
        ("output.crs", &config.output.crs),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(invalid(format!("{key} must not be empty")));
        }
    }

    let mut labels = BTreeSet::new();
    for class in &config.buildings.residential_classes {
        if !labels.insert(class.label.as_str()) {
            return Err(invalid(format!(
                "residential class \"{}\" is listed more than once",
                class.label
            )));
        }
    }
    if labels.is_empty() {
        log::warn!("No residential classes configured; every building will be non-residential");
    }

    if let Some(statistics) = config.enabled_statistics() {
        if statistics.attributes.is_empty() {
            return Err(invalid(
                "statistics.attributes must list at least one attribute".to_string(),
            ));
        }
        if statistics.attributes.iter().any(|a| a.trim().is_empty()) {
            return Err(invalid(
                "statistics.attributes must not contain empty names".to_string(),
            ));
        }
        if !statistics.norm.is_finite() || statistics.norm <= 0.0 {
            return Err(invalid(format!(
                "statistics.norm must be a positive number, got {}",
                statistics.norm
            )));
        }
    }

    Ok(())
}

const fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid { message }
}

#[cfg(test)]
mod tests {
    use popcloud_population_models::ResidentialRule;

    use super::*;

    const MINIMAL: &str = r#"
        [buildings]
        path = "buildings.geojson"
        levels_attribute = "levels"
        function_attribute = "function"
        residential_classes = [{ label = "house", rule = "identity" }]

        [population]
        path = "/abs/blocks.geojson"
        population_attribute = "pop"
        block_id_attribute = "id"

        [output]
        path = "out/points.geojson"
    "#;

    #[test]
    fn default_config_mirrors_berlin_setup() {
        let config = default_config();

        assert_eq!(config.buildings.residential_classes.len(), 12);
        assert_eq!(
            config.buildings.residential_classes[0].rule,
            ResidentialRule::Halve
        );
        assert_eq!(config.population.population_attribute, "ew2021");
        assert_eq!(config.output.crs, "EPSG:25833");
        let stats = config.enabled_statistics().unwrap();
        assert_eq!(stats.output_attributes, vec!["Kfz", "Pkw"]);
    }

    #[test]
    fn resolves_relative_paths() {
        let config = parse_config_toml(MINIMAL, Path::new("/runs/berlin")).unwrap();

        assert_eq!(
            config.buildings.path,
            PathBuf::from("/runs/berlin/buildings.geojson")
        );
        assert_eq!(config.population.path, PathBuf::from("/abs/blocks.geojson"));
        assert_eq!(
            config.output.path,
            PathBuf::from("/runs/berlin/out/points.geojson")
        );
        assert_eq!(config.output.crs, "EPSG:4326");
        assert!(config.statistics.is_none());
        assert!(config.seed.is_none());
    }

    #[test]
    fn rejects_duplicate_class_labels() {
        let toml_str = MINIMAL.replace(
            r#"[{ label = "house", rule = "identity" }]"#,
            r#"[{ label = "house", rule = "identity" }, { label = "house", rule = "halve" }]"#,
        );
        let err = parse_config_toml(&toml_str, Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_non_positive_norm() {
        let toml_str = format!(
            "{MINIMAL}\n[statistics]\npath = \"s.geojson\"\nattributes = [\"a\"]\nnorm = 0\n"
        );
        let err = parse_config_toml(&toml_str, Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn disabled_statistics_skip_validation() {
        let toml_str = format!(
            "{MINIMAL}\n[statistics]\nenabled = false\npath = \"s.geojson\"\nattributes = []\n"
        );
        assert!(parse_config_toml(&toml_str, Path::new("")).is_ok());
    }

    #[test]
    fn reports_toml_errors() {
        let err = parse_config_toml("[buildings]\npath = 3", Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/popcloud.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
