use std::path::PathBuf;
use xrdcloud::engine::config::PipelineConfig;

/// Everything a command needs, after file values, `-S` pairs and flags are merged.
#[derive(Debug)]
pub struct AppConfig {
    pub catalog_path: PathBuf,
    pub intermediate_path: PathBuf,
    pub output_root: PathBuf,
    pub pipeline: PipelineConfig,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub set_values: Vec<String>,
    pub workers: Option<usize>,
    pub catalog: Option<PathBuf>,
    pub intermediate: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub wavelength: Option<String>,
    pub points: Option<usize>,
    pub slices: Option<usize>,
}
