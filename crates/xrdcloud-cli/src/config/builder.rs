use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{AppConfig, Overrides};
use crate::error::{CliError, Result};
use std::time::Duration;
use xrdcloud::core::xrd::wavelength::Wavelength;
use xrdcloud::engine::config::{ConfigError, PipelineConfigBuilder, SliceCount};

/// Merges, from lowest to highest precedence: built-in defaults, the config file,
/// `-S` pairs, command-line flags.
pub fn build_config(overrides: &Overrides) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = match &overrides.config_file {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let file_config = file_config.apply_set_values(&overrides.set_values)?;

    let catalog_file = file_config.catalog.unwrap_or_default();
    let simulation_file = file_config.simulation.unwrap_or_default();
    let encoding_file = file_config.encoding.unwrap_or_default();
    let dispatch_file = file_config.dispatch.unwrap_or_default();
    let output_file = file_config.output.unwrap_or_default();

    let mut builder = PipelineConfigBuilder::new();

    if let Some(text) = overrides
        .wavelength
        .as_deref()
        .or(simulation_file.wavelength.as_deref())
    {
        let wavelength: Wavelength = text.parse().map_err(ConfigError::from)?;
        builder = builder.wavelength(wavelength);
    }
    if let Some(points) = overrides.points.or(encoding_file.points) {
        builder = builder.point_budget(points);
    }
    if let Some(policy) = encoding_file.policy {
        builder = builder.budget_policy(policy.into());
    }
    if let Some(cap) = simulation_file.max_reflections {
        builder = builder.max_reflections(Some(cap));
    }
    if let Some(floor) = simulation_file.intensity_floor {
        builder = builder.intensity_floor(floor);
    }
    if let Some(secs) = simulation_file.timeout_secs {
        let timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
            CliError::Config(format!("Invalid value for simulation.timeout-secs: {}", secs))
        })?;
        builder = builder.record_timeout(timeout);
    }
    if let Some(workers) = overrides.workers.or(dispatch_file.workers) {
        builder = builder.worker_count(workers);
    }
    if let Some(slices) = overrides.slices.or(dispatch_file.slices) {
        builder = builder.slice_count(SliceCount::Fixed(slices));
    }

    if let Some(delimiter) = catalog_file.delimiter.as_deref() {
        builder = builder.delimiter(parse_delimiter(delimiter)?);
    }
    if let Some(column) = catalog_file.id_column {
        builder = builder.id_column(column);
    }
    if let Some(column) = catalog_file.structure_column {
        builder = builder.structure_column(column);
    }
    if let Some(targets) = catalog_file.targets {
        builder = builder.target_properties(targets);
    }

    let pipeline = builder.build()?;

    Ok(AppConfig {
        catalog_path: overrides
            .catalog
            .clone()
            .or(catalog_file.path)
            .unwrap_or(defaults.catalog),
        intermediate_path: overrides
            .intermediate
            .clone()
            .or(output_file.intermediate)
            .unwrap_or(defaults.intermediate),
        output_root: overrides
            .output_root
            .clone()
            .or(output_file.root)
            .unwrap_or(defaults.output_root),
        pipeline,
    })
}

fn parse_delimiter(text: &str) -> Result<u8> {
    match text.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(CliError::Config(format!(
            "catalog.delimiter must be a single ASCII character, got '{}'",
            text
        ))),
    }
}
