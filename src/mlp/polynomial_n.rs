//! Arbitrary-degree (0-5) tabulated polynomial MLP, "krah" in the original
//! CLI's `--mlp` flag.
//!
//! The curve is driven by a second-order linear ODE `x''(u) = (c0 + c1*u) *
//! bm(u)` where `bm(u) = sum_i bm[i] u^i` tabulates `1/(beta^2 p^2)(u)` for a
//! fixed beam energy; `c0, c1` are found per-axis from the boundary
//! conditions at `u2 = pOut.z - pIn.z` using the single/double-integral
//! helpers `A, B, C, D`. The resulting polynomial's coefficients (`dm`) are
//! then evaluated with a descending Horner accumulation, exactly as
//! `PolynomialMLPFunction::Evaluate` does in the original source.

use super::{MlpModel, MlpSample, ProtonEndpoints, ProtonEnergies};
use crate::error::{ReconError, Result};
use crate::geom::Mat2;
use log::warn;

use crate::constants::bm_table;

fn clamp_degree(degree: u32) -> u32 {
    if degree > 5 {
        warn!("polynomial MLP degree {degree} out of range [0,5]; using default (5)");
        5
    } else {
        degree
    }
}

fn factor_a(u: f64, bm: &[f64]) -> f64 {
    bm.iter().enumerate().map(|(i, &b)| b / (i as f64 + 1.0) * u.powi(i as i32 + 1)).sum()
}

fn factor_b(u: f64, bm: &[f64]) -> f64 {
    bm.iter().enumerate().map(|(i, &b)| b / (i as f64 + 2.0) * u.powi(i as i32 + 2)).sum()
}

fn factor_c(u: f64, bm: &[f64]) -> f64 {
    bm.iter()
        .enumerate()
        .map(|(i, &b)| b / ((i as f64 + 1.0) * (i as f64 + 2.0)) * u.powi(i as i32 + 2))
        .sum()
}

fn factor_d(u: f64, bm: &[f64]) -> f64 {
    bm.iter()
        .enumerate()
        .map(|(i, &b)| b / ((i as f64 + 2.0) * (i as f64 + 3.0)) * u.powi(i as i32 + 3))
        .sum()
}

#[derive(Debug, Clone)]
struct AxisCoeffs {
    /// `dm[0..=degree+3]`, highest-degree term last.
    dm: Vec<f64>,
}

impl AxisCoeffs {
    fn build(pos0: f64, slope0: f64, pos2: f64, slope2: f64, u2: f64, bm: &[f64], degree: usize) -> Self {
        let a = factor_a(u2, bm);
        let b = factor_b(u2, bm);
        let c = factor_c(u2, bm);
        let d = factor_d(u2, bm);

        // [A B; C D] * [c0; c1] = [slope2 - slope0; pos2 - pos0 - slope0*u2]
        let m = Mat2::new(a, b, c, d);
        let rhs = crate::geom::Vec2::new(slope2 - slope0, pos2 - pos0 - slope0 * u2);
        let coeffs = m.inverse().mul_vec(rhs);
        let (c0, c1) = (coeffs.x, coeffs.y);

        let mut dm = vec![0.0; degree + 4];
        dm[0] = pos0;
        dm[1] = slope0;
        dm[2] = c0 * bm[0] / 2.0;
        for i in 3..=degree + 2 {
            dm[i] = (c0 * bm[i - 2] + c1 * bm[i - 3]) / (i as f64 * (i as f64 - 1.0));
        }
        dm[degree + 3] = c1 * bm[degree] / ((degree as f64 + 2.0) * (degree as f64 + 3.0));

        AxisCoeffs { dm }
    }

    /// Descending Horner evaluation of position and its `d/du`.
    fn eval(&self, u_local: f64) -> (f64, f64) {
        let n = self.dm.len();
        let mut pos = self.dm[n - 1];
        let mut deriv = 0.0;
        for i in (0..n - 1).rev() {
            deriv = deriv * u_local + pos;
            pos = pos * u_local + self.dm[i];
        }
        (pos, deriv)
    }
}

/// Arbitrary-degree polynomial MLP. Vectorised;
/// `evaluate_error` is unimplemented, matching the original's
/// `itkGenericExceptionMacro` in `PolynomialMLPFunction::EvaluateError`.
#[derive(Debug, Clone)]
pub struct PolynomialMlp {
    degree: u32,
    u_origin: f64,
    x: Option<AxisCoeffs>,
    y: Option<AxisCoeffs>,
}

impl PolynomialMlp {
    pub fn new(degree: u32) -> Self {
        PolynomialMlp { degree: clamp_degree(degree), u_origin: 0.0, x: None, y: None }
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }
}

impl MlpModel for PolynomialMlp {
    fn init(&mut self, endpoints: ProtonEndpoints, _energies: Option<ProtonEnergies>) -> Result<()> {
        let ProtonEndpoints { p_in, p_out, d_in, d_out } = endpoints;
        if p_in.z >= p_out.z {
            return Err(ReconError::data_contract("p_in.z must be strictly less than p_out.z"));
        }
        self.u_origin = p_in.z;
        let u2 = p_out.z - p_in.z;
        let bm = bm_table(self.degree);
        let degree = self.degree as usize;

        let m0x = d_in.x.atan();
        let m1x = d_out.x.atan();
        let m0y = d_in.y.atan();
        let m1y = d_out.y.atan();

        self.x = Some(AxisCoeffs::build(p_in.x, m0x, p_out.x, m1x, u2, bm, degree));
        self.y = Some(AxisCoeffs::build(p_in.y, m0y, p_out.y, m1y, u2, bm, degree));
        Ok(())
    }

    fn evaluate(&self, u: f64) -> MlpSample {
        let u_local = u - self.u_origin;
        let x = self.x.as_ref().expect("init must be called before evaluate");
        let y = self.y.as_ref().expect("init must be called before evaluate");
        let (xv, dx) = x.eval(u_local);
        let (yv, dy) = y.eval(u_local);
        MlpSample { x: xv, y: yv, dx, dy }
    }

    fn can_be_vectorised(&self) -> bool {
        true
    }

    fn evaluate_batch(&self, us: &[f64]) -> Vec<MlpSample> {
        us.iter().map(|&u| self.evaluate(u)).collect()
    }

    fn evaluate_error(&self, _u: f64) -> Result<Mat2> {
        Err(ReconError::numerical("PolynomialMlp does not implement EvaluateError"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;

    fn sample_endpoints() -> ProtonEndpoints {
        ProtonEndpoints {
            p_in: Vec3::new(-1.0, 2.0, 0.0),
            p_out: Vec3::new(3.0, -2.0, 180.0),
            d_in: Vec3::new(0.02, -0.01, 1.0),
            d_out: Vec3::new(-0.015, 0.02, 1.0),
        }
    }

    #[test]
    fn out_of_range_degree_clamps_to_five() {
        let mlp = PolynomialMlp::new(11);
        assert_eq!(mlp.degree(), 5);
    }

    #[test]
    fn endpoint_positions_match_within_tolerance() {
        let mut mlp = PolynomialMlp::new(3);
        let e = sample_endpoints();
        mlp.init(e, None).unwrap();
        let span = e.p_out.z - e.p_in.z;
        let tol = 1e-6 * span;

        let at_in = mlp.evaluate(e.p_in.z);
        assert!((at_in.x - e.p_in.x).abs() < tol);
        assert!((at_in.y - e.p_in.y).abs() < tol);

        let at_out = mlp.evaluate(e.p_out.z);
        assert!((at_out.x - e.p_out.x).abs() < tol);
        assert!((at_out.y - e.p_out.y).abs() < tol);
    }

    #[test]
    fn is_vectorised_and_batch_matches_scalar() {
        let mut mlp = PolynomialMlp::new(2);
        mlp.init(sample_endpoints(), None).unwrap();
        assert!(mlp.can_be_vectorised());
        let us = [0.0, 45.0, 90.0, 180.0];
        let batch = mlp.evaluate_batch(&us);
        for (u, s) in us.iter().zip(batch.iter()) {
            let scalar = mlp.evaluate(*u);
            assert_eq!(*s, scalar);
        }
    }

    #[test]
    fn evaluate_error_is_not_supported() {
        let mlp = PolynomialMlp::new(2);
        assert!(mlp.evaluate_error(10.0).is_err());
    }
}
