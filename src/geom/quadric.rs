use super::Vec3;

/// An implicit second-degree surface `A*x^2 + B*y^2 + C*z^2 + D*x*y + E*y*z
/// + F*x*z + G*x + H*y + I*z + J = 0`, used to bound the imaged object for
/// PPBin/PPBP (the `QuadricIn`/`QuadricOut` surfaces each config carries).
///
/// The general form covers the common cases directly: an axis-aligned
/// ellipsoid centered at `c` with semi-axes `(rx, ry, rz)` is
/// `A=1/rx^2, B=1/ry^2, C=1/rz^2, G=-2c.x/rx^2, ...`, but any other centered
/// quadric is representable by filling the coefficients directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadricShape {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub g: f64,
    pub h: f64,
    pub i: f64,
    pub j: f64,
}

impl QuadricShape {
    #[allow(clippy::too_many_arguments)]
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64, g: f64, h: f64, i: f64, j: f64) -> Self {
        QuadricShape { a, b, c, d, e, f, g, h, i, j }
    }

    /// An axis-aligned ellipsoid centered at `center` with semi-axes `radii`.
    pub fn ellipsoid(center: Vec3, radii: Vec3) -> Self {
        let (rx2, ry2, rz2) = (radii.x * radii.x, radii.y * radii.y, radii.z * radii.z);
        QuadricShape::new(
            1.0 / rx2,
            1.0 / ry2,
            1.0 / rz2,
            0.0,
            0.0,
            0.0,
            -2.0 * center.x / rx2,
            -2.0 * center.y / ry2,
            -2.0 * center.z / rz2,
            center.x * center.x / rx2 + center.y * center.y / ry2 + center.z * center.z / rz2 - 1.0,
        )
    }

    /// Intersects the ray `p + t*d` with this quadric, returning `(near_t, far_t)`
    /// with `near_t <= far_t`, or `None` if the ray misses (discriminant < 0)
    /// or is degenerate (quadratic coefficient ~ 0, i.e. the ray is tangent to
    /// the quadric's asymptotic direction).
    pub fn intersect_ray(&self, p: Vec3, d: Vec3) -> Option<(f64, f64)> {
        let qa = self.a * d.x * d.x
            + self.b * d.y * d.y
            + self.c * d.z * d.z
            + self.d * d.x * d.y
            + self.e * d.y * d.z
            + self.f * d.x * d.z;

        let qb = 2.0 * self.a * p.x * d.x
            + 2.0 * self.b * p.y * d.y
            + 2.0 * self.c * p.z * d.z
            + self.d * (p.x * d.y + p.y * d.x)
            + self.e * (p.y * d.z + p.z * d.y)
            + self.f * (p.x * d.z + p.z * d.x)
            + self.g * d.x
            + self.h * d.y
            + self.i * d.z;

        let qc = self.a * p.x * p.x
            + self.b * p.y * p.y
            + self.c * p.z * p.z
            + self.d * p.x * p.y
            + self.e * p.y * p.z
            + self.f * p.x * p.z
            + self.g * p.x
            + self.h * p.y
            + self.i * p.z
            + self.j;

        if qa.abs() < 1e-12 {
            if qb.abs() < 1e-12 {
                return None;
            }
            let t = -qc / qb;
            return Some((t, t));
        }

        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let t1 = (-qb - sq) / (2.0 * qa);
        let t2 = (-qb + sq) / (2.0 * qa);
        if t1 <= t2 {
            Some((t1, t2))
        } else {
            Some((t2, t1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_through_sphere_center_hits_both_poles() {
        let q = QuadricShape::ellipsoid(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0));
        let (near, far) = q.intersect_ray(Vec3::new(0.0, 0.0, -50.0), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        assert!((near - 40.0).abs() < 1e-9);
        assert!((far - 60.0).abs() < 1e-9);
    }

    #[test]
    fn ray_missing_sphere_returns_none() {
        let q = QuadricShape::ellipsoid(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0));
        assert!(q.intersect_ray(Vec3::new(50.0, 0.0, -50.0), Vec3::new(0.0, 0.0, 1.0)).is_none());
    }
}
