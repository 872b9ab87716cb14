//! Geometric primitives: 2D/3D vectors and the explicit 2x2 matrix algebra
//! the MLP evaluators depend on.
//!
//! Distances and angles throughout the reconstruction core are double
//! precision; only the accumulated projection/volume samples use `f32`
//! (see [`crate::volume`], [`crate::projection`]).

mod mat4;
mod quadric;

pub use mat4::Mat4;
pub use quadric::QuadricShape;

/// A 3-component double-precision vector, thin wrapper over [`glam::DVec3`].
pub type Vec3 = glam::DVec3;

/// A 2-component double-precision vector, thin wrapper over [`glam::DVec2`].
pub type Vec2 = glam::DVec2;

/// An explicit 2x2 matrix, stored row-major as `[m00, m01, m10, m11]`.
///
/// Inversion is the direct adjugate formula `1/(ad-bc) * [[d,-b],[-c,a]]`
/// with no pivoting, matching the original Schulte MLP's `InverseMatrix`.
/// Near-singular matrices are a caller precondition, not handled here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat2 {
    pub m00: f64,
    pub m01: f64,
    pub m10: f64,
    pub m11: f64,
}

impl Mat2 {
    pub const ZERO: Mat2 = Mat2 { m00: 0.0, m01: 0.0, m10: 0.0, m11: 0.0 };
    pub const IDENTITY: Mat2 = Mat2 { m00: 1.0, m01: 0.0, m10: 0.0, m11: 1.0 };

    pub fn new(m00: f64, m01: f64, m10: f64, m11: f64) -> Self {
        Mat2 { m00, m01, m10, m11 }
    }

    pub fn diag(a: f64, d: f64) -> Self {
        Mat2::new(a, 0.0, 0.0, d)
    }

    pub fn determinant(&self) -> f64 {
        self.m00 * self.m11 - self.m01 * self.m10
    }

    pub fn transpose(&self) -> Mat2 {
        Mat2::new(self.m00, self.m10, self.m01, self.m11)
    }

    /// Inverse via the explicit adjugate formula. Undefined (produces `inf`/`nan`)
    /// if the matrix is singular; callers are responsible for well-posedness.
    pub fn inverse(&self) -> Mat2 {
        let inv_det = 1.0 / self.determinant();
        Mat2::new(
            self.m11 * inv_det,
            -self.m01 * inv_det,
            -self.m10 * inv_det,
            self.m00 * inv_det,
        )
    }

    pub fn add(&self, other: &Mat2) -> Mat2 {
        Mat2::new(
            self.m00 + other.m00,
            self.m01 + other.m01,
            self.m10 + other.m10,
            self.m11 + other.m11,
        )
    }

    pub fn sub(&self, other: &Mat2) -> Mat2 {
        Mat2::new(
            self.m00 - other.m00,
            self.m01 - other.m01,
            self.m10 - other.m10,
            self.m11 - other.m11,
        )
    }

    pub fn scale(&self, s: f64) -> Mat2 {
        Mat2::new(self.m00 * s, self.m01 * s, self.m10 * s, self.m11 * s)
    }

    pub fn mul_mat(&self, other: &Mat2) -> Mat2 {
        Mat2::new(
            self.m00 * other.m00 + self.m01 * other.m10,
            self.m00 * other.m01 + self.m01 * other.m11,
            self.m10 * other.m00 + self.m11 * other.m10,
            self.m10 * other.m01 + self.m11 * other.m11,
        )
    }

    pub fn mul_vec(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.m00 * v.x + self.m01 * v.y, self.m10 * v.x + self.m11 * v.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_round_trips_identity() {
        let m = Mat2::new(2.0, 1.0, 1.0, 3.0);
        let id = m.mul_mat(&m.inverse());
        assert!((id.m00 - 1.0).abs() < 1e-12);
        assert!((id.m11 - 1.0).abs() < 1e-12);
        assert!(id.m01.abs() < 1e-12);
        assert!(id.m10.abs() < 1e-12);
    }

    #[test]
    fn determinant_matches_adjugate_definition() {
        let m = Mat2::new(4.0, 7.0, 2.0, 6.0);
        assert_eq!(m.determinant(), 4.0 * 6.0 - 7.0 * 2.0);
    }
}
