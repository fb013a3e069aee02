use thiserror::Error;

use super::config::ConfigError;
use super::report::SkipKind;
use crate::core::crystal::structure::StructureError;
use crate::core::encoding::encoder::EncodeError;
use crate::core::io::artifact::ArtifactError;
use crate::core::io::catalog::CatalogError;
use crate::core::io::intermediate::IntermediateError;
use crate::core::models::ids::MaterialId;
use crate::core::xrd::simulator::SimulationError;

/// Failure of a single record. Unless [`RecordError::is_fatal`], it only costs that record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("structure parsing failed: {0}")]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("pattern serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("worker panicked: {0}")]
    Panicked(String),
    #[error("cancelled after a fatal error")]
    Cancelled,
}

impl RecordError {
    pub fn kind(&self) -> SkipKind {
        match self {
            Self::Structure(_) | Self::Serialize(_) => SkipKind::Parse,
            Self::Simulation(SimulationError::Timeout(_)) => SkipKind::Timeout,
            Self::Simulation(_) => SkipKind::Simulation,
            Self::Encode(EncodeError::Shape(_) | EncodeError::Degenerate(_)) => SkipKind::Shape,
            Self::Encode(EncodeError::Parse(_) | EncodeError::InvalidValue { .. }) => {
                SkipKind::Parse
            }
            Self::Panicked(_) => SkipKind::Panic,
            Self::Cancelled => SkipKind::Cancelled,
        }
    }

    /// A broken simulator backend makes every further record pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Simulation(SimulationError::Backend(_)))
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Required input not found: '{path}'")]
    InputMissing { path: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(CatalogError),

    #[error("Intermediate table error: {0}")]
    Intermediate(IntermediateError),

    #[error("Artifact for material '{id}' already exists at '{path}'")]
    DuplicateArtifact { id: MaterialId, path: String },

    #[error("Failed to persist artifacts of '{id}': {source}")]
    Artifact { id: MaterialId, source: ArtifactError },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Reset of the output space was declined")]
    ResetDeclined,

    #[error("Record '{id}' failed fatally: {source}")]
    RecordFailed { id: MaterialId, source: RecordError },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InputMissing { path } => Self::InputMissing { path },
            CatalogError::UnknownTargetProperty { name, available } => {
                Self::Configuration(ConfigError::UnknownTargetProperty { name, available })
            }
            CatalogError::MissingColumn(name) => Self::Configuration(ConfigError::MissingColumn(name)),
            other => Self::Catalog(other),
        }
    }
}

impl From<IntermediateError> for EngineError {
    fn from(err: IntermediateError) -> Self {
        match err {
            IntermediateError::InputMissing { path } => Self::InputMissing { path },
            other => Self::Intermediate(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::sample::ShapeError;
    use std::time::Duration;

    #[test]
    fn record_errors_map_to_skip_kinds() {
        let shape = ShapeError {
            expected_channels: 97,
            expected_points: 512,
            channels: 97,
            points: 300,
        };
        let cases = [
            (RecordError::from(StructureError::NoSites), SkipKind::Parse),
            (
                RecordError::from(SimulationError::Timeout(Duration::from_secs(1))),
                SkipKind::Timeout,
            ),
            (
                RecordError::from(SimulationError::Record("x".into())),
                SkipKind::Simulation,
            ),
            (RecordError::from(EncodeError::Shape(shape)), SkipKind::Shape),
            (RecordError::from(EncodeError::Parse("x".into())), SkipKind::Parse),
            (RecordError::Panicked("boom".into()), SkipKind::Panic),
            (RecordError::Cancelled, SkipKind::Cancelled),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind, "{error}");
            assert!(!error.is_fatal());
        }
        assert!(RecordError::from(SimulationError::Backend("gone".into())).is_fatal());
    }

    #[test]
    fn missing_inputs_collapse_to_one_variant() {
        let from_catalog = EngineError::from(CatalogError::InputMissing { path: "a.csv".into() });
        let from_table = EngineError::from(IntermediateError::InputMissing { path: "b.csv".into() });
        assert!(matches!(from_catalog, EngineError::InputMissing { path } if path == "a.csv"));
        assert!(matches!(from_table, EngineError::InputMissing { path } if path == "b.csv"));
    }

    #[test]
    fn unknown_target_is_a_configuration_error() {
        let err = EngineError::from(CatalogError::UnknownTargetProperty {
            name: "bulk".into(),
            available: "band_gap".into(),
        });
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigError::UnknownTargetProperty { .. })
        ));
    }
}
