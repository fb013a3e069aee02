use crate::core::models::element::ELEMENT_COUNT;
use crate::core::models::ids::MaterialId;
use crate::core::models::pattern::{DiffractionPattern, Reflection};
use crate::core::models::record::{MaterialRecord, TargetProperties};
use crate::core::models::sample::{
    DEFAULT_POINT_BUDGET, FEATURE_CHANNELS, FeatureTensor, PointCloudSample, SPHERICAL_CHANNELS,
    ShapeError,
};
use nalgebra::DMatrix;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    #[error("cannot decode reflection data: {0}")]
    Parse(String),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("reflection {index} has invalid {field} ({value})")]
    InvalidValue {
        index: usize,
        field: &'static str,
        value: f64,
    },
    #[error("degenerate pattern: {0}")]
    Degenerate(&'static str),
}

/// What to do when a pattern does not carry exactly the point budget of reflections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointBudgetPolicy {
    /// Any count other than the budget is a [`ShapeError`].
    #[default]
    Exact,
    /// Keep the most intense reflections when there are too many, preserving their
    /// original order. Too few reflections are still a [`ShapeError`]; nothing is padded.
    TopIntensity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    pub point_budget: usize,
    pub policy: PointBudgetPolicy,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            point_budget: DEFAULT_POINT_BUDGET,
            policy: PointBudgetPolicy::default(),
        }
    }
}

/// Turns a diffraction pattern into a `97 x P` channels-first tensor.
///
/// Channel layout per point: radius, polar angle, azimuth, then one form factor entry per
/// tracked element. The radius is divided by the largest radius among the encoded
/// reflections, every form factor entry by the single largest form factor value of the
/// pattern. Angles are stored as-is. Reflections are never reordered.
#[derive(Debug, Clone, Default)]
pub struct PointCloudEncoder {
    config: EncoderConfig,
}

impl PointCloudEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn encode(
        &self,
        record: &MaterialRecord,
        pattern: &DiffractionPattern,
    ) -> Result<PointCloudSample, EncodeError> {
        self.encode_with(record.id(), record.targets(), pattern)
    }

    /// Same as [`Self::encode`] for callers that hold the id and targets separately,
    /// e.g. rows of an intermediate pattern table.
    pub fn encode_with(
        &self,
        id: &MaterialId,
        targets: &TargetProperties,
        pattern: &DiffractionPattern,
    ) -> Result<PointCloudSample, EncodeError> {
        let budget = self.config.point_budget;
        let selected = self.select(&pattern.reflections)?;
        validate(&selected)?;

        let max_r = selected
            .iter()
            .map(|r| r.spherical_position.radius)
            .fold(0.0_f64, f64::max);
        if max_r <= 0.0 {
            return Err(EncodeError::Degenerate("maximum reflection radius is zero"));
        }
        let max_ff = selected
            .iter()
            .flat_map(|r| r.atomic_form_factor.iter().copied())
            .fold(0.0_f64, f64::max);
        if max_ff <= 0.0 {
            return Err(EncodeError::Degenerate("maximum atomic form factor is zero"));
        }

        let data = DMatrix::from_fn(FEATURE_CHANNELS, selected.len(), |channel, point| {
            let reflection = selected[point];
            match channel {
                0 => reflection.spherical_position.radius / max_r,
                1 => reflection.spherical_position.polar,
                2 => reflection.spherical_position.azimuth,
                c => reflection.atomic_form_factor[c - SPHERICAL_CHANNELS] / max_ff,
            }
        });
        let features = FeatureTensor::new(data, budget)?;

        trace!(id = %id, max_r, max_ff, "Encoded point cloud.");
        Ok(PointCloudSample::new(id.clone(), features, targets.clone()))
    }

    fn select<'a>(&self, reflections: &'a [Reflection]) -> Result<Vec<&'a Reflection>, EncodeError> {
        let budget = self.config.point_budget;
        let count = reflections.len();
        let shape_error = || ShapeError {
            expected_channels: FEATURE_CHANNELS,
            expected_points: budget,
            channels: FEATURE_CHANNELS,
            points: count,
        };

        match self.config.policy {
            PointBudgetPolicy::Exact if count != budget => Err(shape_error().into()),
            PointBudgetPolicy::TopIntensity if count < budget => Err(shape_error().into()),
            PointBudgetPolicy::TopIntensity if count > budget => {
                if let Some((index, r)) = reflections
                    .iter()
                    .enumerate()
                    .find(|(_, r)| !(r.intensity.is_finite() && r.intensity >= 0.0))
                {
                    return Err(EncodeError::InvalidValue {
                        index,
                        field: "intensity",
                        value: r.intensity,
                    });
                }
                let mut ranked: Vec<usize> = (0..count).collect();
                ranked.sort_by(|&a, &b| reflections[b].intensity.total_cmp(&reflections[a].intensity));
                let mut kept: Vec<usize> = ranked.into_iter().take(budget).collect();
                kept.sort_unstable();
                Ok(kept.into_iter().map(|i| &reflections[i]).collect())
            }
            _ => Ok(reflections.iter().collect()),
        }
    }
}

fn validate(reflections: &[&Reflection]) -> Result<(), EncodeError> {
    for (index, reflection) in reflections.iter().enumerate() {
        let aff = &reflection.atomic_form_factor;
        if aff.len() != ELEMENT_COUNT {
            return Err(ShapeError {
                expected_channels: FEATURE_CHANNELS,
                expected_points: reflections.len(),
                channels: SPHERICAL_CHANNELS + aff.len(),
                points: reflections.len(),
            }
            .into());
        }

        let sph = &reflection.spherical_position;
        if !(sph.radius.is_finite() && sph.radius > 0.0) {
            return Err(EncodeError::InvalidValue {
                index,
                field: "radius",
                value: sph.radius,
            });
        }
        for (field, value) in [("polar angle", sph.polar), ("azimuth", sph.azimuth)] {
            if !value.is_finite() {
                return Err(EncodeError::InvalidValue { index, field, value });
            }
        }
        if let Some(&value) = aff.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(EncodeError::InvalidValue {
                index,
                field: "atomic form factor",
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Vector3};
    use std::sync::Arc;

    fn targets() -> TargetProperties {
        TargetProperties::new(
            Arc::from(vec!["band_gap".to_string(), "energy_per_atom".to_string()]),
            vec![1.25, -3.5],
        )
        .unwrap()
    }

    fn id() -> MaterialId {
        MaterialId::new("mp-149").unwrap()
    }

    fn reflection(i: usize) -> Reflection {
        let position = Vector3::new(0.1 + i as f64 * 0.05, 0.2, 0.3 - i as f64 * 0.01);
        let mut aff = vec![0.0; ELEMENT_COUNT];
        aff[13] = 14.0 / (1.0 + i as f64);
        aff[7] = 8.0;
        Reflection::new([i as i32, 0, 1], position, 100.0 + i as f64, aff)
    }

    fn pattern(count: usize) -> DiffractionPattern {
        DiffractionPattern::new(Matrix3::identity(), (0..count).map(reflection).collect())
    }

    fn encoder(point_budget: usize, policy: PointBudgetPolicy) -> PointCloudEncoder {
        PointCloudEncoder::new(EncoderConfig {
            point_budget,
            policy,
        })
    }

    #[test]
    fn default_budget_yields_97_by_512() {
        let sample = PointCloudEncoder::default()
            .encode_with(&id(), &targets(), &pattern(512))
            .unwrap();
        assert_eq!(sample.features().channels(), 97);
        assert_eq!(sample.features().points(), 512);
        assert_eq!(sample.id(), &id());
    }

    #[test]
    fn count_mismatch_is_shape_error_under_exact_policy() {
        let encoder = PointCloudEncoder::default();
        for count in [0, 511, 513] {
            let err = encoder
                .encode_with(&id(), &targets(), &pattern(count))
                .unwrap_err();
            assert_eq!(
                err,
                EncodeError::Shape(ShapeError {
                    expected_channels: 97,
                    expected_points: 512,
                    channels: 97,
                    points: count,
                })
            );
        }
    }

    #[test]
    fn normalization_bounds_hold() {
        let sample = encoder(8, PointBudgetPolicy::Exact)
            .encode_with(&id(), &targets(), &pattern(8))
            .unwrap();
        let features = sample.features();

        let radial = features.channel(0);
        assert!(radial.iter().all(|r| *r > 0.0 && *r <= 1.0));
        assert!(radial.iter().any(|r| (*r - 1.0).abs() < 1e-12));

        for c in SPHERICAL_CHANNELS..FEATURE_CHANNELS {
            assert!(features.channel(c).iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn form_factors_share_one_global_divisor() {
        let sample = encoder(8, PointBudgetPolicy::Exact)
            .encode_with(&id(), &targets(), &pattern(8))
            .unwrap();
        let oxygen = sample.features().channel(SPHERICAL_CHANNELS + 7);
        // Silicon peaks at 14.0, so oxygen's constant 8.0 is not rescaled to 1.
        assert!(oxygen.iter().all(|v| (*v - 8.0 / 14.0).abs() < 1e-12));
        let silicon = sample.features().channel(SPHERICAL_CHANNELS + 13);
        assert!((silicon[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn angles_are_stored_raw_and_order_is_kept() {
        let mut p = pattern(4);
        p.reflections.reverse();
        let sample = encoder(4, PointBudgetPolicy::Exact)
            .encode_with(&id(), &targets(), &p)
            .unwrap();
        let polar = sample.features().channel(1);
        let azimuth = sample.features().channel(2);
        for (point, reflection) in p.reflections.iter().enumerate() {
            assert_eq!(polar[point], reflection.spherical_position.polar);
            assert_eq!(azimuth[point], reflection.spherical_position.azimuth);
        }
        // Radii were reversed, so the first point is the farthest one.
        assert_eq!(sample.features().channel(0)[0], 1.0);
    }

    #[test]
    fn top_intensity_keeps_strongest_in_original_order() {
        let mut p = pattern(6);
        let intensities = [5.0, 1.0, 9.0, 3.0, 7.0, 2.0];
        for (r, i) in p.reflections.iter_mut().zip(intensities) {
            r.intensity = i;
        }
        let sample = encoder(3, PointBudgetPolicy::TopIntensity)
            .encode_with(&id(), &targets(), &p)
            .unwrap();

        let kept = [0usize, 2, 4];
        let max_r = kept
            .iter()
            .map(|&i| p.reflections[i].spherical_position.radius)
            .fold(0.0, f64::max);
        let radial = sample.features().channel(0);
        for (point, &index) in kept.iter().enumerate() {
            let expected = p.reflections[index].spherical_position.radius / max_r;
            assert!((radial[point] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn top_intensity_never_pads() {
        let err = encoder(8, PointBudgetPolicy::TopIntensity)
            .encode_with(&id(), &targets(), &pattern(5))
            .unwrap_err();
        assert!(matches!(err, EncodeError::Shape(ShapeError { points: 5, .. })));
    }

    #[test]
    fn short_form_factor_vector_is_shape_error() {
        let mut p = pattern(4);
        p.reflections[2].atomic_form_factor.pop();
        let err = encoder(4, PointBudgetPolicy::Exact)
            .encode_with(&id(), &targets(), &p)
            .unwrap_err();
        assert!(matches!(err, EncodeError::Shape(ShapeError { channels: 96, .. })));
    }

    #[test]
    fn zero_radius_is_rejected() {
        let mut p = pattern(4);
        p.reflections[1] = Reflection::new([0, 0, 0], Vector3::zeros(), 1.0, vec![1.0; ELEMENT_COUNT]);
        let err = encoder(4, PointBudgetPolicy::Exact)
            .encode_with(&id(), &targets(), &p)
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::InvalidValue { index: 1, field: "radius", .. }
        ));
    }

    #[test]
    fn all_zero_form_factors_are_degenerate() {
        let mut p = pattern(4);
        for r in &mut p.reflections {
            r.atomic_form_factor = vec![0.0; ELEMENT_COUNT];
        }
        let err = encoder(4, PointBudgetPolicy::Exact)
            .encode_with(&id(), &targets(), &p)
            .unwrap_err();
        assert!(matches!(err, EncodeError::Degenerate(_)));
    }

    #[test]
    fn targets_are_copied_verbatim() {
        let record = MaterialRecord::new(id(), "data_x", targets());
        let sample = encoder(4, PointBudgetPolicy::Exact)
            .encode(&record, &pattern(4))
            .unwrap();
        assert_eq!(sample.targets(), &targets());
        assert_eq!(sample.targets().get("energy_per_atom"), Some(-3.5));
    }
}
