use super::element::ELEMENT_COUNT;
use super::ids::MaterialId;
use super::record::TargetProperties;
use nalgebra::DMatrix;
use thiserror::Error;

/// Spherical channels (radius, polar, azimuth) leading every feature column.
pub const SPHERICAL_CHANNELS: usize = 3;
/// Channel count of every feature tensor: spherical channels followed by form factors.
pub const FEATURE_CHANNELS: usize = SPHERICAL_CHANNELS + ELEMENT_COUNT;
/// Number of reflections (points) encoded per material unless configured otherwise.
pub const DEFAULT_POINT_BUDGET: usize = 512;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error(
    "feature tensor shape mismatch: expected {expected_channels} channels x {expected_points} points, got {channels} x {points}"
)]
pub struct ShapeError {
    pub expected_channels: usize,
    pub expected_points: usize,
    pub channels: usize,
    pub points: usize,
}

/// Channels-first `C x P` feature matrix whose shape has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    data: DMatrix<f64>,
}

impl FeatureTensor {
    pub fn new(data: DMatrix<f64>, expected_points: usize) -> Result<Self, ShapeError> {
        if data.nrows() != FEATURE_CHANNELS || data.ncols() != expected_points {
            return Err(ShapeError {
                expected_channels: FEATURE_CHANNELS,
                expected_points,
                channels: data.nrows(),
                points: data.ncols(),
            });
        }
        Ok(Self { data })
    }

    pub fn channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn points(&self) -> usize {
        self.data.ncols()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn channel(&self, index: usize) -> Vec<f64> {
        self.data.row(index).iter().copied().collect()
    }
}

/// One material's encoded features and targets, persisted exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudSample {
    id: MaterialId,
    features: FeatureTensor,
    targets: TargetProperties,
}

impl PointCloudSample {
    pub fn new(id: MaterialId, features: FeatureTensor, targets: TargetProperties) -> Self {
        Self {
            id,
            features,
            targets,
        }
    }

    pub fn id(&self) -> &MaterialId {
        &self.id
    }

    pub fn features(&self) -> &FeatureTensor {
        &self.features
    }

    pub fn targets(&self) -> &TargetProperties {
        &self.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_shape() {
        let tensor = FeatureTensor::new(DMatrix::zeros(FEATURE_CHANNELS, 4), 4).unwrap();
        assert_eq!(tensor.channels(), 97);
        assert_eq!(tensor.points(), 4);
        assert_eq!(tensor.channel(0).len(), 4);
    }

    #[test]
    fn rejects_wrong_point_count_instead_of_reshaping() {
        let err = FeatureTensor::new(DMatrix::zeros(FEATURE_CHANNELS, 511), 512).unwrap_err();
        assert_eq!(err.points, 511);
        assert_eq!(err.expected_points, 512);
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let err = FeatureTensor::new(DMatrix::zeros(96, 512), 512).unwrap_err();
        assert_eq!(err.channels, 96);
        assert_eq!(err.expected_channels, 97);
    }
}
