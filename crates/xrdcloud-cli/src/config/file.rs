use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use xrdcloud::core::encoding::encoder::PointBudgetPolicy;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCatalogConfig {
    pub path: Option<PathBuf>,
    pub delimiter: Option<String>,
    pub id_column: Option<String>,
    pub structure_column: Option<String>,
    pub targets: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSimulationConfig {
    pub wavelength: Option<String>,
    pub max_reflections: Option<usize>,
    pub intensity_floor: Option<f64>,
    pub timeout_secs: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileBudgetPolicy {
    Exact,
    TopIntensity,
}

impl From<FileBudgetPolicy> for PointBudgetPolicy {
    fn from(p: FileBudgetPolicy) -> Self {
        match p {
            FileBudgetPolicy::Exact => PointBudgetPolicy::Exact,
            FileBudgetPolicy::TopIntensity => PointBudgetPolicy::TopIntensity,
        }
    }
}

impl FromStr for FileBudgetPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "top-intensity" => Ok(Self::TopIntensity),
            other => Err(format!(
                "unknown point-budget policy '{}', expected 'exact' or 'top-intensity'",
                other
            )),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEncodingConfig {
    pub points: Option<usize>,
    pub policy: Option<FileBudgetPolicy>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileDispatchConfig {
    pub workers: Option<usize>,
    pub slices: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOutputConfig {
    pub root: Option<PathBuf>,
    pub intermediate: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub catalog: Option<FileCatalogConfig>,
    pub simulation: Option<FileSimulationConfig>,
    pub encoding: Option<FileEncodingConfig>,
    pub dispatch: Option<FileDispatchConfig>,
    pub output: Option<FileOutputConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Applies `KEY=VALUE` pairs on top of the values read from the file.
    pub fn apply_set_values(mut self, set_values: &[String]) -> Result<Self> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "catalog.path" => {
                    self.catalog.get_or_insert_with(Default::default).path = Some(value.into());
                }
                "catalog.delimiter" => {
                    self.catalog.get_or_insert_with(Default::default).delimiter =
                        Some(value.to_string());
                }
                "catalog.id-column" => {
                    self.catalog.get_or_insert_with(Default::default).id_column =
                        Some(value.to_string());
                }
                "catalog.structure-column" => {
                    self.catalog
                        .get_or_insert_with(Default::default)
                        .structure_column = Some(value.to_string());
                }
                "catalog.targets" => {
                    self.catalog.get_or_insert_with(Default::default).targets = Some(
                        value
                            .split(',')
                            .map(|name| name.trim().to_string())
                            .filter(|name| !name.is_empty())
                            .collect(),
                    );
                }
                "simulation.wavelength" => {
                    self.simulation
                        .get_or_insert_with(Default::default)
                        .wavelength = Some(value.to_string());
                }
                "simulation.max-reflections" => {
                    self.simulation
                        .get_or_insert_with(Default::default)
                        .max_reflections = Some(parse_value(key, value, "integer")?);
                }
                "simulation.intensity-floor" => {
                    self.simulation
                        .get_or_insert_with(Default::default)
                        .intensity_floor = Some(parse_value(key, value, "float")?);
                }
                "simulation.timeout-secs" => {
                    self.simulation
                        .get_or_insert_with(Default::default)
                        .timeout_secs = Some(parse_value(key, value, "float")?);
                }
                "encoding.points" => {
                    self.encoding.get_or_insert_with(Default::default).points =
                        Some(parse_value(key, value, "integer")?);
                }
                "encoding.policy" => {
                    self.encoding.get_or_insert_with(Default::default).policy =
                        Some(value.parse().map_err(CliError::Config)?);
                }
                "dispatch.workers" => {
                    self.dispatch.get_or_insert_with(Default::default).workers =
                        Some(parse_value(key, value, "integer")?);
                }
                "dispatch.slices" => {
                    self.dispatch.get_or_insert_with(Default::default).slices =
                        Some(parse_value(key, value, "integer")?);
                }
                "output.root" => {
                    self.output.get_or_insert_with(Default::default).root = Some(value.into());
                }
                "output.intermediate" => {
                    self.output.get_or_insert_with(Default::default).intermediate =
                        Some(value.into());
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(self)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[catalog]
path = "raw_data/custom_MPdata.csv"
delimiter = ";"
id-column = "material_id"
structure-column = "cif"
targets = ["band_gap", "formation_energy_per_atom"]

[simulation]
wavelength = "MoKa"
max-reflections = 1024
intensity-floor = 0.0
timeout-secs = 30

[encoding]
points = 256
policy = "top-intensity"

[dispatch]
workers = 6
slices = 10

[output]
root = "data"
intermediate = "raw_data/compute_xrd.csv"
"#;

    #[test]
    fn full_file_is_parsed() {
        let config = FileConfig::from_toml(FULL).unwrap();

        let catalog = config.catalog.unwrap();
        assert_eq!(catalog.targets.unwrap().len(), 2);
        assert_eq!(catalog.delimiter.as_deref(), Some(";"));
        let simulation = config.simulation.unwrap();
        assert_eq!(simulation.wavelength.as_deref(), Some("MoKa"));
        assert_eq!(simulation.timeout_secs, Some(30.0));
        let encoding = config.encoding.unwrap();
        assert_eq!(encoding.points, Some(256));
        assert_eq!(encoding.policy, Some(FileBudgetPolicy::TopIntensity));
        assert_eq!(config.dispatch.unwrap().slices, Some(10));
        assert_eq!(config.output.unwrap().root, Some(PathBuf::from("data")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::from_toml("[encoding]\npoint-budget = 512\n").is_err());
        assert!(FileConfig::from_toml("[training]\nepochs = 10\n").is_err());
    }

    #[test]
    fn set_values_override_file_values() {
        let config = FileConfig::from_toml(FULL)
            .unwrap()
            .apply_set_values(&[
                "encoding.points=128".to_string(),
                "catalog.targets=band_gap, energy_per_atom".to_string(),
                "encoding.policy=exact".to_string(),
            ])
            .unwrap();

        let encoding = config.encoding.unwrap();
        assert_eq!(encoding.points, Some(128));
        assert_eq!(encoding.policy, Some(FileBudgetPolicy::Exact));
        assert_eq!(
            config.catalog.unwrap().targets.unwrap(),
            vec!["band_gap", "energy_per_atom"]
        );
    }

    #[test]
    fn malformed_set_values_are_config_errors() {
        let base = FileConfig::default;
        assert!(matches!(
            base().apply_set_values(&["encoding.points".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            base().apply_set_values(&["encoding.points=many".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            base().apply_set_values(&["encoding.policy=pad".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            base().apply_set_values(&["model.depth=3".to_string()]),
            Err(CliError::Config(_))
        ));
    }
}
