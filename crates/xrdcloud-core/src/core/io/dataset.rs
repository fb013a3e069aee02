use super::artifact::{ArtifactError, FEATURES_DIR, TARGETS_DIR, read_features, read_targets};
use super::display_path;
use crate::core::models::ids::{InvalidMaterialId, MaterialId};
use crate::core::models::sample::FEATURE_CHANNELS;
use nalgebra::DMatrix;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("Material '{id}' has no {missing} artifact")]
    Unpaired { id: MaterialId, missing: &'static str },
    #[error("Artifact file name '{file}' is not a valid material id: {source}")]
    InvalidId {
        file: String,
        source: InvalidMaterialId,
    },
    #[error("Target property '{name}' is not present in the artifacts of '{id}'")]
    UnknownTarget { id: MaterialId, name: String },
    #[error("Features of '{id}' are {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        id: MaterialId,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("Index {index} is out of range for a dataset of {len} samples")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Which scalar a dataset yields per sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    Property(String),
    /// `1.0` for a positive band gap (insulator), `0.0` otherwise (metal).
    MetalInsulator,
}

impl TargetSelector {
    pub const BAND_GAP: &'static str = "band_gap";
}

/// Read access to a materialized output space for downstream consumers.
#[derive(Debug, Clone)]
pub struct PointCloudDataset {
    features_dir: PathBuf,
    targets_dir: PathBuf,
    ids: Vec<MaterialId>,
    selector: TargetSelector,
}

fn list_ids(dir: &Path) -> Result<BTreeSet<MaterialId>, DatasetError> {
    let io_error = |source| DatasetError::Io {
        path: display_path(dir),
        source,
    };
    let mut ids = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // Staged writes are dot-prefixed and never complete artifacts.
        if name.starts_with('.') || !path.is_file() {
            continue;
        }
        let Some(stem) = name.strip_suffix(".csv") else {
            continue;
        };
        let id = MaterialId::new(stem).map_err(|source| DatasetError::InvalidId {
            file: name.to_string(),
            source,
        })?;
        ids.insert(id);
    }
    Ok(ids)
}

impl PointCloudDataset {
    /// Opens `<root>/features` and `<root>/target`.
    pub fn open(root: &Path, selector: TargetSelector) -> Result<Self, DatasetError> {
        Self::open_dirs(&root.join(FEATURES_DIR), &root.join(TARGETS_DIR), selector)
    }

    /// Every features file must have a targets file of the same id and vice versa.
    #[instrument(skip_all, name = "dataset_open")]
    pub fn open_dirs(
        features_dir: &Path,
        targets_dir: &Path,
        selector: TargetSelector,
    ) -> Result<Self, DatasetError> {
        let features = list_ids(features_dir)?;
        let targets = list_ids(targets_dir)?;

        if let Some(id) = features.difference(&targets).next() {
            return Err(DatasetError::Unpaired {
                id: id.clone(),
                missing: "targets",
            });
        }
        if let Some(id) = targets.difference(&features).next() {
            return Err(DatasetError::Unpaired {
                id: id.clone(),
                missing: "features",
            });
        }

        debug!(samples = features.len(), "Dataset indexed.");
        Ok(Self {
            features_dir: features_dir.to_path_buf(),
            targets_dir: targets_dir.to_path_buf(),
            ids: features.into_iter().collect(),
            selector,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in ascending order; the index space of [`Self::get`].
    pub fn ids(&self) -> &[MaterialId] {
        &self.ids
    }

    pub fn get(&self, index: usize) -> Result<(DMatrix<f64>, f64), DatasetError> {
        let id = self.ids.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.ids.len(),
        })?;
        let features = read_features(&self.features_dir.join(id.file_name()))?;
        Ok((features, self.target(id)?))
    }

    pub fn target(&self, id: &MaterialId) -> Result<f64, DatasetError> {
        let targets = read_targets(&self.targets_dir.join(id.file_name()))?;
        let name = match &self.selector {
            TargetSelector::Property(name) => name.as_str(),
            TargetSelector::MetalInsulator => TargetSelector::BAND_GAP,
        };
        let value = targets.get(name).ok_or_else(|| DatasetError::UnknownTarget {
            id: id.clone(),
            name: name.to_string(),
        })?;
        Ok(match self.selector {
            TargetSelector::Property(_) => value,
            TargetSelector::MetalInsulator => f64::from(u8::from(value > 0.0)),
        })
    }

    /// Selected target of every sample, in index order.
    pub fn targets(&self) -> Result<Vec<f64>, DatasetError> {
        self.ids.iter().map(|id| self.target(id)).collect()
    }

    /// Reads every artifact back and checks the feature shape. Returns the sample count.
    pub fn verify(&self, expected_points: usize) -> Result<usize, DatasetError> {
        for id in &self.ids {
            let features = read_features(&self.features_dir.join(id.file_name()))?;
            if features.nrows() != FEATURE_CHANNELS || features.ncols() != expected_points {
                return Err(DatasetError::ShapeMismatch {
                    id: id.clone(),
                    rows: features.nrows(),
                    cols: features.ncols(),
                    expected_rows: FEATURE_CHANNELS,
                    expected_cols: expected_points,
                });
            }
            self.target(id)?;
        }
        Ok(self.ids.len())
    }
}

/// Standardizes target values with the mean and standard deviation of a reference set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetNormalizer {
    pub mean: f64,
    pub std: f64,
}

impl TargetNormalizer {
    /// Sample statistics (n - 1 denominator). A zero or undefined spread becomes 1 so the
    /// transform stays invertible. `None` for an empty set.
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let std = if std.is_finite() && std > 0.0 { std } else { 1.0 };
        Some(Self { mean, std })
    }

    pub fn norm(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    pub fn denorm(&self, value: f64) -> f64 {
        value * self.std + self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_pair(root: &Path, id: &str, points: usize, band_gap: f64) {
        let features = root.join(FEATURES_DIR);
        let targets = root.join(TARGETS_DIR);
        fs::create_dir_all(&features).unwrap();
        fs::create_dir_all(&targets).unwrap();

        let line = vec!["0.5"; points].join(";");
        let body = vec![line; FEATURE_CHANNELS].join("\n") + "\n";
        fs::write(features.join(format!("{id}.csv")), body).unwrap();
        fs::write(
            targets.join(format!("{id}.csv")),
            format!("band_gap;energy_per_atom\n{band_gap};-2.5\n"),
        )
        .unwrap();
    }

    #[test]
    fn lists_sorted_pairs_and_loads_samples() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "mp-2", 4, 1.5);
        write_pair(dir.path(), "mp-1", 4, 0.0);
        fs::write(dir.path().join(FEATURES_DIR).join(".mp-3.csv.partial"), "junk").unwrap();

        let dataset =
            PointCloudDataset::open(dir.path(), TargetSelector::Property("band_gap".into())).unwrap();
        let ids: Vec<_> = dataset.ids().iter().map(MaterialId::as_str).collect();
        assert_eq!(ids, vec!["mp-1", "mp-2"]);

        let (features, target) = dataset.get(1).unwrap();
        assert_eq!((features.nrows(), features.ncols()), (FEATURE_CHANNELS, 4));
        assert_eq!(target, 1.5);
        assert_eq!(dataset.verify(4).unwrap(), 2);
        assert!(matches!(dataset.get(2), Err(DatasetError::IndexOutOfRange { .. })));
    }

    #[test]
    fn metal_insulator_selector_thresholds_band_gap() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "mp-1", 2, 0.0);
        write_pair(dir.path(), "mp-2", 2, 0.7);
        let dataset = PointCloudDataset::open(dir.path(), TargetSelector::MetalInsulator).unwrap();
        assert_eq!(dataset.targets().unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn unpaired_artifacts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "mp-1", 2, 0.0);
        fs::remove_file(dir.path().join(TARGETS_DIR).join("mp-1.csv")).unwrap();
        let err = PointCloudDataset::open(dir.path(), TargetSelector::MetalInsulator).unwrap_err();
        assert!(matches!(err, DatasetError::Unpaired { missing: "targets", .. }));
    }

    #[test]
    fn verify_catches_wrong_point_count() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "mp-1", 3, 0.0);
        let dataset = PointCloudDataset::open(dir.path(), TargetSelector::MetalInsulator).unwrap();
        assert!(matches!(
            dataset.verify(512),
            Err(DatasetError::ShapeMismatch { cols: 3, .. })
        ));
    }

    #[test]
    fn unknown_property_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "mp-1", 2, 0.0);
        let dataset =
            PointCloudDataset::open(dir.path(), TargetSelector::Property("bulk_modulus".into()))
                .unwrap();
        assert!(matches!(dataset.get(0), Err(DatasetError::UnknownTarget { .. })));
    }

    #[test]
    fn denorm_inverts_norm() {
        let normalizer = TargetNormalizer::fit(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((normalizer.mean - 2.5).abs() < 1e-12);
        for value in [-3.0, 0.0, 2.5, 10.0] {
            let round = normalizer.denorm(normalizer.norm(value));
            assert!((round - value).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_targets_keep_unit_spread() {
        let normalizer = TargetNormalizer::fit(&[3.0, 3.0]).unwrap();
        assert_eq!(normalizer.std, 1.0);
        assert_eq!(normalizer.norm(3.0), 0.0);
        assert!(TargetNormalizer::fit(&[]).is_none());
    }
}
