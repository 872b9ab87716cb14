//! Third-order polynomial MLP: two independent cubic Hermite curves fit to
//! endpoint position and tangent.

use super::{MlpModel, MlpSample, ProtonEndpoints, ProtonEnergies};
use crate::error::{ReconError, Result};
use crate::geom::Mat2;

#[derive(Debug, Clone, Copy, Default)]
struct CubicHermite {
    p0: f64,
    m0: f64,
    p1: f64,
    m1: f64,
    /// length of the u-interval the tangents (`m0`, `m1`) are expressed per-unit-u over.
    span: f64,
}

impl CubicHermite {
    /// Evaluates position and `d/du` at local parameter `u_local in [0, span]`.
    fn eval(&self, u_local: f64) -> (f64, f64) {
        if self.span.abs() < 1e-12 {
            return (self.p0, self.m0);
        }
        let t = u_local / self.span;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        let pos = h00 * self.p0 + h10 * self.span * self.m0 + h01 * self.p1 + h11 * self.span * self.m1;

        let dh00 = 6.0 * t2 - 6.0 * t;
        let dh10 = 3.0 * t2 - 4.0 * t + 1.0;
        let dh01 = -6.0 * t2 + 6.0 * t;
        let dh11 = 3.0 * t2 - 2.0 * t;

        let dpos_dt = dh00 * self.p0 + dh10 * self.span * self.m0 + dh01 * self.p1 + dh11 * self.span * self.m1;
        let deriv = dpos_dt / self.span;

        (pos, deriv)
    }
}

/// Third-order polynomial MLP model. No error estimate, not vectorised.
#[derive(Debug, Clone, Default)]
pub struct ThirdOrderPolynomialMlp {
    u_origin: f64,
    x: CubicHermite,
    y: CubicHermite,
}

impl ThirdOrderPolynomialMlp {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MlpModel for ThirdOrderPolynomialMlp {
    fn init(&mut self, endpoints: ProtonEndpoints, _energies: Option<ProtonEnergies>) -> Result<()> {
        let ProtonEndpoints { p_in, p_out, d_in, d_out } = endpoints;
        if p_in.z >= p_out.z {
            return Err(ReconError::data_contract("p_in.z must be strictly less than p_out.z"));
        }
        self.u_origin = p_in.z;
        let span = p_out.z - p_in.z;

        // d[2] is implicitly 1 per the original convention; slopes are dx/dz, dy/dz.
        let m0x = d_in.x / d_in.z;
        let m1x = d_out.x / d_out.z;
        let m0y = d_in.y / d_in.z;
        let m1y = d_out.y / d_out.z;

        self.x = CubicHermite { p0: p_in.x, m0: m0x, p1: p_out.x, m1: m1x, span };
        self.y = CubicHermite { p0: p_in.y, m0: m0y, p1: p_out.y, m1: m1y, span };
        Ok(())
    }

    fn evaluate(&self, u: f64) -> MlpSample {
        let u_local = u - self.u_origin;
        let (x, dx) = self.x.eval(u_local);
        let (y, dy) = self.y.eval(u_local);
        MlpSample { x, y, dx, dy }
    }

    fn can_be_vectorised(&self) -> bool {
        false
    }

    fn evaluate_error(&self, _u: f64) -> Result<Mat2> {
        Err(ReconError::numerical("ThirdOrderPolynomialMlp does not support EvaluateError"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;

    fn sample_endpoints() -> ProtonEndpoints {
        ProtonEndpoints {
            p_in: Vec3::new(-2.0, 3.0, 0.0),
            p_out: Vec3::new(4.0, -1.0, 150.0),
            d_in: Vec3::new(0.05, -0.02, 1.0),
            d_out: Vec3::new(-0.03, 0.04, 1.0),
        }
    }

    #[test]
    fn endpoint_conditions_hold() {
        let mut mlp = ThirdOrderPolynomialMlp::new();
        let e = sample_endpoints();
        mlp.init(e, None).unwrap();

        let span = e.p_out.z - e.p_in.z;
        let tol = 1e-6 * span;

        let at_in = mlp.evaluate(e.p_in.z);
        assert!((at_in.x - e.p_in.x).abs() < tol);
        assert!((at_in.y - e.p_in.y).abs() < tol);
        assert!((at_in.dx - e.d_in.x / e.d_in.z).abs() < 1e-6);
        assert!((at_in.dy - e.d_in.y / e.d_in.z).abs() < 1e-6);

        let at_out = mlp.evaluate(e.p_out.z);
        assert!((at_out.x - e.p_out.x).abs() < tol);
        assert!((at_out.y - e.p_out.y).abs() < tol);
        assert!((at_out.dx - e.d_out.x / e.d_out.z).abs() < 1e-6);
        assert!((at_out.dy - e.d_out.y / e.d_out.z).abs() < 1e-6);
    }

    #[test]
    fn straight_line_reduces_to_linear_interpolation() {
        let mut mlp = ThirdOrderPolynomialMlp::new();
        let e = ProtonEndpoints {
            p_in: Vec3::new(0.0, 0.0, 0.0),
            p_out: Vec3::new(10.0, -5.0, 100.0),
            d_in: Vec3::new(0.1, -0.05, 1.0),
            d_out: Vec3::new(0.1, -0.05, 1.0),
        };
        mlp.init(e, None).unwrap();
        let mid = mlp.evaluate(50.0);
        assert!((mid.x - 5.0).abs() < 1e-9);
        assert!((mid.y - (-2.5)).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_increasing_z() {
        let mut mlp = ThirdOrderPolynomialMlp::new();
        let mut e = sample_endpoints();
        e.p_out.z = e.p_in.z;
        assert!(mlp.init(e, None).is_err());
    }
}
