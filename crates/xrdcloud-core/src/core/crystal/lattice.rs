use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatticeError {
    #[error("lattice parameter '{name}' must be positive and finite (value: {value})")]
    InvalidLength { name: &'static str, value: f64 },
    #[error("lattice angle '{name}' must lie strictly between 0 and 180 degrees (value: {value})")]
    InvalidAngle { name: &'static str, value: f64 },
    #[error("lattice parameters describe a degenerate cell")]
    Degenerate,
}

/// Real-space unit cell. Rows of the matrix are the lattice vectors a, b, c in Å.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    matrix: Matrix3<f64>,
}

impl Lattice {
    pub fn from_matrix(matrix: Matrix3<f64>) -> Result<Self, LatticeError> {
        if matrix.determinant().abs() < 1e-10 {
            return Err(LatticeError::Degenerate);
        }
        Ok(Self { matrix })
    }

    /// Builds the cell with a along x and b in the xy plane. Angles are in degrees.
    pub fn from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, LatticeError> {
        for (name, value) in [("a", a), ("b", b), ("c", c)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(LatticeError::InvalidLength { name, value });
            }
        }
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !(value.is_finite() && value > 0.0 && value < 180.0) {
                return Err(LatticeError::InvalidAngle { name, value });
            }
        }

        let (cos_a, cos_b) = (alpha.to_radians().cos(), beta.to_radians().cos());
        let (sin_g, cos_g) = gamma.to_radians().sin_cos();

        let cx = c * cos_b;
        let cy = c * (cos_a - cos_b * cos_g) / sin_g;
        let cz_sq = c * c - cx * cx - cy * cy;
        if cz_sq <= 1e-10 {
            return Err(LatticeError::Degenerate);
        }

        Self::from_matrix(Matrix3::new(
            a,
            0.0,
            0.0,
            b * cos_g,
            b * sin_g,
            0.0,
            cx,
            cy,
            cz_sq.sqrt(),
        ))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn vector(&self, index: usize) -> Vector3<f64> {
        self.matrix.row(index).transpose()
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Reciprocal basis without the 2π factor (rows b1, b2, b3 with a_i · b_j = δ_ij).
    pub fn reciprocal_crystallographic(&self) -> Matrix3<f64> {
        // Non-singular by construction.
        self.matrix
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or_else(Matrix3::zeros)
    }

    pub fn to_cartesian(&self, fractional: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.transpose() * fractional
    }
}

/// Cartesian position of the reciprocal lattice point `hkl` for a basis with rows b1..b3.
pub fn reciprocal_point(reciprocal: &Matrix3<f64>, hkl: [i32; 3]) -> Vector3<f64> {
    reciprocal.transpose() * Vector3::new(hkl[0] as f64, hkl[1] as f64, hkl[2] as f64)
}
