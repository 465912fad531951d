#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line for building-scale population point clouds.
//!
//! ```text
//! popcloud run [--config popcloud.toml] [--seed 42] [--output residents.geojson]
//! popcloud check [--config popcloud.toml]
//! popcloud default-config > popcloud.toml
//! ```
//!
//! Without `--config` the built-in Berlin configuration is used, with
//! dataset paths relative to the working directory.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use popcloud_cli_utils::{IndicatifProgress, MultiProgress};
use popcloud_population::config::{DEFAULT_CONFIG_TOML, default_config, load_config};
use popcloud_population::statistics::resolve_bindings;
use popcloud_population_models::config::PipelineConfig;
use popcloud_spatial::GeoEngine;

#[derive(Parser)]
#[command(
    name = "popcloud",
    about = "Estimate residents per building and generate one point per resident"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the resident point layer
    Run {
        /// Pipeline config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seed for reproducible point placement and draws
        #[arg(long)]
        seed: Option<u64>,
        /// Override the output path of the point layer
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a config and print what a run would use
    Check {
        /// Pipeline config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the built-in config
    DefaultConfig,
}

fn main() {
    let multi = popcloud_cli_utils::init_logger();
    let cli = Cli::parse();

    if let Err(e) = execute(cli.command, &multi) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn execute(command: Commands, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            config,
            seed,
            output,
        } => {
            let mut config = resolve_config(config.as_deref())?;
            if seed.is_some() {
                config.seed = seed;
            }
            if let Some(output) = output {
                config.output.path = output;
            }

            let progress = IndicatifProgress::buildings_bar(multi, "Generating points");
            popcloud_population::pipeline::run(&config, &GeoEngine, &progress)?;
        }
        Commands::Check { config } => {
            let config = resolve_config(config.as_deref())?;
            print_config(&config);
        }
        Commands::DefaultConfig => {
            print!("{DEFAULT_CONFIG_TOML}");
        }
    }

    Ok(())
}

fn resolve_config(path: Option<&Path>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        log::info!("Loading config from {}", path.display());
        Ok(load_config(path)?)
    } else {
        log::info!("No --config given, using the built-in config");
        Ok(default_config())
    }
}

fn print_config(config: &PipelineConfig) {
    let status = |path: &Path| if path.is_file() { "found" } else { "MISSING" };

    println!(
        "Buildings:  {} ({})",
        config.buildings.path.display(),
        status(&config.buildings.path)
    );
    println!(
        "  floors \"{}\", function \"{}\", {} filter condition(s)",
        config.buildings.levels_attribute,
        config.buildings.function_attribute,
        config.buildings.filter.len()
    );
    println!(
        "Population: {} ({})",
        config.population.path.display(),
        status(&config.population.path)
    );
    println!(
        "  population \"{}\", block id \"{}\"",
        config.population.population_attribute, config.population.block_id_attribute
    );

    println!();
    println!("{:<4} {:<50} RULE", "#", "CLASS");
    println!("{}", "-".repeat(70));
    for (i, class) in config.buildings.residential_classes.iter().enumerate() {
        println!("{:<4} {:<50} {}", i + 1, class.label, class.rule);
    }
    println!();

    match config.enabled_statistics() {
        Some(statistics) => {
            println!(
                "Statistics: {} ({}), norm {}",
                statistics.path.display(),
                status(&statistics.path),
                statistics.norm
            );
            for binding in resolve_bindings(&statistics.attributes, &statistics.output_attributes) {
                println!("  \"{}\" -> \"{}\"", binding.input, binding.output);
            }
        }
        None => println!("Statistics: disabled"),
    }

    println!(
        "Output:     {} ({}, {})",
        config.output.path.display(),
        config.output.format,
        config.output.crs
    );
    if let Some(path) = &config.output.buildings_path {
        println!("Buildings output: {}", path.display());
    }
    match config.seed {
        Some(seed) => println!("Seed:       {seed}"),
        None => println!("Seed:       random"),
    }
}
