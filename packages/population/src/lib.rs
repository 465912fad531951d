#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building-scale population interpolation.
//!
//! Derives a synthetic resident count per building from block-level
//! population figures and generates one point per resident:
//!
//! 1. [`classify`] turns building function and floor count into a
//!    residential floor area.
//! 2. [`allocate`] distributes each block's population over its buildings
//!    in proportion to that area.
//! 3. [`generate`] places one random point per estimated resident inside
//!    the building footprint, each with a fixed random draw.
//! 4. [`statistics`] turns per-area frequency rates into per-point
//!    boolean attributes by comparing against that draw.
//! 5. [`project`] strips everything but the output attributes.
//!
//! [`pipeline`] wires the stages to dataset reading and writing.

pub mod allocate;
pub mod classify;
pub mod config;
pub mod generate;
pub mod pipeline;
pub mod progress;
pub mod project;
pub mod statistics;

#[cfg(test)]
pub(crate) mod test_support;

use popcloud_layers::LayerError;
use thiserror::Error;

use crate::classify::ClassifyError;
use crate::config::ConfigError;

/// Errors that halt a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input dataset does not exist.
    #[error("Found no valid {kind} dataset at \"{path}\"")]
    MissingInput {
        /// Which dataset is missing.
        kind: &'static str,
        /// Configured path.
        path: String,
    },

    /// Reading or writing a layer failed.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Building classification failed; no building was annotated.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
