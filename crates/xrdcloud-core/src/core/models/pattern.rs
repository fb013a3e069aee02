use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Reciprocal-space position in spherical coordinates.
///
/// `polar` is measured from the +z axis in `[0, π]`, `azimuth` from +x in `(-π, π]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalPosition {
    pub radius: f64,
    pub polar: f64,
    pub azimuth: f64,
}

impl SphericalPosition {
    pub fn from_cartesian(v: &Vector3<f64>) -> Self {
        let radius = v.norm();
        if radius == 0.0 {
            return Self {
                radius: 0.0,
                polar: 0.0,
                azimuth: 0.0,
            };
        }
        Self {
            radius,
            polar: (v.z / radius).clamp(-1.0, 1.0).acos(),
            azimuth: v.y.atan2(v.x),
        }
    }
}

/// One diffraction peak as returned by a simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub hkl: [i32; 3],
    #[serde(rename = "xyz")]
    pub reciprocal_position: [f64; 3],
    #[serde(rename = "sph")]
    pub spherical_position: SphericalPosition,
    /// Lorentz-polarization corrected intensity.
    #[serde(rename = "i")]
    pub intensity: f64,
    /// One entry per tracked element, indexed by [`super::element::Element::index`].
    #[serde(rename = "aff")]
    pub atomic_form_factor: Vec<f64>,
}

impl Reflection {
    pub fn new(
        hkl: [i32; 3],
        reciprocal_position: Vector3<f64>,
        intensity: f64,
        atomic_form_factor: Vec<f64>,
    ) -> Self {
        Self {
            hkl,
            reciprocal_position: [
                reciprocal_position.x,
                reciprocal_position.y,
                reciprocal_position.z,
            ],
            spherical_position: SphericalPosition::from_cartesian(&reciprocal_position),
            intensity,
            atomic_form_factor,
        }
    }
}

/// Simulator output for one material. Reflections keep simulator-native order.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffractionPattern {
    pub reciprocal_lattice: Matrix3<f64>,
    pub reflections: Vec<Reflection>,
}

impl DiffractionPattern {
    pub fn new(reciprocal_lattice: Matrix3<f64>, reflections: Vec<Reflection>) -> Self {
        Self {
            reciprocal_lattice,
            reflections,
        }
    }

    /// Rows of the reciprocal basis, the layout used in serialized tables.
    pub fn lattice_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.reciprocal_lattice;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn lattice_from_rows(rows: [[f64; 3]; 3]) -> Matrix3<f64> {
        Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ])
    }

    pub fn len(&self) -> usize {
        self.reflections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflections.is_empty()
    }
}
