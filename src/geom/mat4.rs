use super::Vec3;

/// An explicit 4x4 matrix, stored row-major. Used only by the DDBP
/// index-to-index projection-matrix composition; everywhere
/// else in this crate a 2x2 [`super::Mat2`] suffices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub rows: [[f64; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Mat4 { rows }
    }

    pub fn translation(t: Vec3) -> Self {
        let mut m = Mat4::IDENTITY;
        m.rows[0][3] = t.x;
        m.rows[1][3] = t.y;
        m.rows[2][3] = t.z;
        m
    }

    pub fn scale(s: Vec3) -> Self {
        Mat4::from_rows([
            [s.x, 0.0, 0.0, 0.0],
            [0.0, s.y, 0.0, 0.0],
            [0.0, 0.0, s.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation about the z axis, matching the `(x,y)` gantry-rotation
    /// convention already used by `GeometryView::theta` and PPBP's
    /// per-view rotation.
    pub fn rotation_z(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Mat4::from_rows([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn mul_mat(&self, other: &Mat4) -> Mat4 {
        let mut out = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                out[i][j] = (0..4).map(|k| self.rows[i][k] * other.rows[k][j]).sum();
            }
        }
        Mat4::from_rows(out)
    }

    /// Applies the matrix to the homogeneous point `(p.x, p.y, p.z, 1)`,
    /// returning the four un-normalized output components.
    pub fn mul_point(&self, p: Vec3) -> (f64, f64, f64, f64) {
        let v = [p.x, p.y, p.z, 1.0];
        let mut out = [0.0; 4];
        for (i, row) in self.rows.iter().enumerate() {
            out[i] = (0..4).map(|k| row[k] * v[k]).sum();
        }
        (out[0], out[1], out[2], out[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_then_scale_composes_correctly() {
        let m = Mat4::translation(Vec3::new(1.0, 2.0, 3.0)).mul_mat(&Mat4::scale(Vec3::new(2.0, 2.0, 2.0)));
        let (x, y, z, w) = m.mul_point(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!((x, y, z, w), (3.0, 4.0, 5.0, 1.0));
    }

    #[test]
    fn rotation_z_is_identity_at_zero_angle() {
        let m = Mat4::rotation_z(0.0);
        let (x, y, z, _) = m.mul_point(Vec3::new(3.0, -2.0, 7.0));
        assert!((x - 3.0).abs() < 1e-12);
        assert!((y + 2.0).abs() < 1e-12);
        assert!((z - 7.0).abs() < 1e-12);
    }
}
