use crate::core::encoding::encoder::{EncoderConfig, PointBudgetPolicy};
use crate::core::io::catalog::CatalogSchema;
use crate::core::xrd::kinematic::DEFAULT_INTENSITY_FLOOR;
use crate::core::xrd::wavelength::{Wavelength, WavelengthError};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("At least one target property is required")]
    EmptyTargetList,
    #[error("Target property '{0}' is listed more than once")]
    DuplicateTarget(String),
    #[error("Unknown target property '{name}' (available: {available})")]
    UnknownTargetProperty { name: String, available: String },
    #[error("Point budget must be at least 1")]
    ZeroPointBudget,
    #[error("Reflection cap must be at least 1")]
    ZeroReflectionCap,
    #[error("Worker count must be at least 1")]
    ZeroWorkers,
    #[error("Slice count must be at least 1")]
    ZeroSlices,
    #[error("Per-record timeout must be greater than zero")]
    ZeroTimeout,
    #[error("Intensity floor must lie in [0, 1] (value: {0})")]
    InvalidIntensityFloor(f64),
    #[error("Invalid wavelength: {0}")]
    InvalidWavelength(#[from] WavelengthError),
    #[error("Catalog is missing required column '{0}'")]
    MissingColumn(String),
    #[error("Column names must be non-empty")]
    EmptyColumnName,
}

/// How many macro-chunks a run is cut into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SliceCount {
    /// About twenty records per worker per chunk: `max(records / (20 * workers), 1)`.
    #[default]
    Auto,
    Fixed(usize),
}

impl SliceCount {
    pub fn resolve(&self, records: usize, workers: usize) -> usize {
        match *self {
            Self::Auto => (records / (20 * workers.max(1))).max(1),
            Self::Fixed(n) => n.max(1),
        }
    }
}

/// All but two of the available cores, and at least one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub wavelength: Wavelength,
    pub max_reflections: Option<usize>,
    pub intensity_floor: f64,
    pub record_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub worker_count: usize,
    pub slice_count: SliceCount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub simulation: SimulationConfig,
    pub encoder: EncoderConfig,
    pub dispatch: DispatchConfig,
    pub catalog: CatalogSchema,
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    wavelength: Option<Wavelength>,
    max_reflections: Option<Option<usize>>,
    intensity_floor: Option<f64>,
    record_timeout: Option<Duration>,
    point_budget: Option<usize>,
    budget_policy: Option<PointBudgetPolicy>,
    worker_count: Option<usize>,
    slice_count: Option<SliceCount>,
    delimiter: Option<u8>,
    id_column: Option<String>,
    structure_column: Option<String>,
    target_properties: Option<Vec<String>>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wavelength(mut self, wavelength: Wavelength) -> Self {
        self.wavelength = Some(wavelength);
        self
    }
    /// `None` disables the cap. Defaults to the point budget.
    pub fn max_reflections(mut self, cap: Option<usize>) -> Self {
        self.max_reflections = Some(cap);
        self
    }
    pub fn intensity_floor(mut self, floor: f64) -> Self {
        self.intensity_floor = Some(floor);
        self
    }
    pub fn record_timeout(mut self, timeout: Duration) -> Self {
        self.record_timeout = Some(timeout);
        self
    }
    pub fn point_budget(mut self, points: usize) -> Self {
        self.point_budget = Some(points);
        self
    }
    pub fn budget_policy(mut self, policy: PointBudgetPolicy) -> Self {
        self.budget_policy = Some(policy);
        self
    }
    pub fn worker_count(mut self, n: usize) -> Self {
        self.worker_count = Some(n);
        self
    }
    pub fn slice_count(mut self, slices: SliceCount) -> Self {
        self.slice_count = Some(slices);
        self
    }
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
    pub fn id_column(mut self, name: impl Into<String>) -> Self {
        self.id_column = Some(name.into());
        self
    }
    pub fn structure_column(mut self, name: impl Into<String>) -> Self {
        self.structure_column = Some(name.into());
        self
    }
    pub fn target_properties(mut self, names: Vec<String>) -> Self {
        self.target_properties = Some(names);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let wavelength = self.wavelength.unwrap_or_default();
        let lambda = wavelength.value();
        if !(lambda.is_finite() && lambda > 0.0) {
            return Err(WavelengthError::NonPositive(lambda).into());
        }

        let encoder_defaults = EncoderConfig::default();
        let point_budget = self.point_budget.unwrap_or(encoder_defaults.point_budget);
        if point_budget == 0 {
            return Err(ConfigError::ZeroPointBudget);
        }

        let max_reflections = self.max_reflections.unwrap_or(Some(point_budget));
        if max_reflections == Some(0) {
            return Err(ConfigError::ZeroReflectionCap);
        }

        let intensity_floor = self.intensity_floor.unwrap_or(DEFAULT_INTENSITY_FLOOR);
        if !(0.0..=1.0).contains(&intensity_floor) {
            return Err(ConfigError::InvalidIntensityFloor(intensity_floor));
        }

        if self.record_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }

        let worker_count = self.worker_count.unwrap_or_else(default_worker_count);
        if worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        let slice_count = self.slice_count.unwrap_or_default();
        if slice_count == SliceCount::Fixed(0) {
            return Err(ConfigError::ZeroSlices);
        }

        let defaults = CatalogSchema::default();
        let target_columns = self.target_properties.unwrap_or(defaults.target_columns);
        if target_columns.is_empty() {
            return Err(ConfigError::EmptyTargetList);
        }
        let mut unique = HashSet::new();
        for name in &target_columns {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyColumnName);
            }
            if !unique.insert(name.as_str()) {
                return Err(ConfigError::DuplicateTarget(name.clone()));
            }
        }
        let id_column = self.id_column.unwrap_or(defaults.id_column);
        let structure_column = self.structure_column.unwrap_or(defaults.structure_column);
        if id_column.trim().is_empty() || structure_column.trim().is_empty() {
            return Err(ConfigError::EmptyColumnName);
        }

        Ok(PipelineConfig {
            simulation: SimulationConfig {
                wavelength,
                max_reflections,
                intensity_floor,
                record_timeout: self.record_timeout,
            },
            encoder: EncoderConfig {
                point_budget,
                policy: self.budget_policy.unwrap_or(encoder_defaults.policy),
            },
            dispatch: DispatchConfig {
                worker_count,
                slice_count,
            },
            catalog: CatalogSchema {
                delimiter: self.delimiter.unwrap_or(defaults.delimiter),
                id_column,
                structure_column,
                target_columns,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_pipeline() {
        let config = PipelineConfigBuilder::new().build().unwrap();
        assert_eq!(config.simulation.wavelength, Wavelength::Preset("CuKa"));
        assert_eq!(config.simulation.max_reflections, Some(512));
        assert_eq!(config.encoder.point_budget, 512);
        assert_eq!(config.encoder.policy, PointBudgetPolicy::Exact);
        assert_eq!(config.dispatch.slice_count, SliceCount::Auto);
        assert!(config.dispatch.worker_count >= 1);
        assert_eq!(config.catalog.delimiter, b';');
        assert_eq!(
            config.catalog.target_columns,
            vec!["band_gap", "energy_per_atom", "formation_energy_per_atom"]
        );
    }

    #[test]
    fn reflection_cap_follows_point_budget_unless_set() {
        let config = PipelineConfigBuilder::new().point_budget(64).build().unwrap();
        assert_eq!(config.simulation.max_reflections, Some(64));

        let uncapped = PipelineConfigBuilder::new()
            .point_budget(64)
            .max_reflections(None)
            .build()
            .unwrap();
        assert_eq!(uncapped.simulation.max_reflections, None);
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let cases = [
            (PipelineConfigBuilder::new().worker_count(0), ConfigError::ZeroWorkers),
            (
                PipelineConfigBuilder::new().slice_count(SliceCount::Fixed(0)),
                ConfigError::ZeroSlices,
            ),
            (PipelineConfigBuilder::new().point_budget(0), ConfigError::ZeroPointBudget),
            (
                PipelineConfigBuilder::new().record_timeout(Duration::ZERO),
                ConfigError::ZeroTimeout,
            ),
            (
                PipelineConfigBuilder::new().intensity_floor(-0.1),
                ConfigError::InvalidIntensityFloor(-0.1),
            ),
            (
                PipelineConfigBuilder::new().target_properties(vec![]),
                ConfigError::EmptyTargetList,
            ),
            (
                PipelineConfigBuilder::new()
                    .target_properties(vec!["band_gap".into(), "band_gap".into()]),
                ConfigError::DuplicateTarget("band_gap".into()),
            ),
            (
                PipelineConfigBuilder::new().wavelength(Wavelength::Angstrom(-1.0)),
                ConfigError::InvalidWavelength(WavelengthError::NonPositive(-1.0)),
            ),
        ];
        for (builder, expected) in cases {
            assert_eq!(builder.build().unwrap_err(), expected);
        }
    }

    #[test]
    fn auto_slices_scale_with_records_and_workers() {
        assert_eq!(SliceCount::Auto.resolve(10, 4), 1);
        assert_eq!(SliceCount::Auto.resolve(1000, 5), 10);
        assert_eq!(SliceCount::Auto.resolve(0, 0), 1);
        assert_eq!(SliceCount::Fixed(0).resolve(100, 4), 1);
        assert_eq!(SliceCount::Fixed(3).resolve(100, 4), 3);
    }

    #[test]
    fn default_worker_count_is_positive() {
        assert!(default_worker_count() >= 1);
    }
}
