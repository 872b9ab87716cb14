//! Most-likely-path (MLP) evaluators.
//!
//! Three interchangeable models of a proton's curved trajectory through
//! matter, all behind one capability trait ([`MlpModel`]) rather than one
//! `enum` of behaviors -- capability absence (e.g. `InitUncertain` on a
//! non-Schulte model) surfaces as a checked [`crate::error::ReconError::Config`]
//! rather than a compile-time distinction, since the proton-pair binner
//! selects the model dynamically from a runtime configuration flag.

mod polynomial3;
mod polynomial_n;
mod schulte;

pub use polynomial3::ThirdOrderPolynomialMlp;
pub use polynomial_n::PolynomialMlp;
pub use schulte::SchulteMlp;

use crate::error::Result;
use crate::geom::{Mat2, Vec3};

/// Entry/exit kinematics handed to every MLP model's `init`.
#[derive(Debug, Clone, Copy)]
pub struct ProtonEndpoints {
    pub p_in: Vec3,
    pub p_out: Vec3,
    pub d_in: Vec3,
    pub d_out: Vec3,
}

/// Optional entry/exit energies, present only when the beam-energy-dependent
/// polynomial table or the Schulte scattering integrals need them.
#[derive(Debug, Clone, Copy)]
pub struct ProtonEnergies {
    pub e_in: f64,
    pub e_out: f64,
}

/// Tracker-uncertainty inputs accepted only by [`SchulteMlp::init_uncertain`].
#[derive(Debug, Clone, Copy)]
pub struct TrackerUncertainty {
    /// Detector (tracker-plane) position resolution, mm.
    pub tracker_resolution: f64,
    /// Spacing between the two planes of a tracker pair, mm.
    pub tracker_pair_spacing: f64,
    /// Upstream material budget expressed as an equivalent water thickness, mm.
    pub material_budget: f64,
    /// Drift distance from the entry tracker pair to the object boundary (`dEntry`), mm.
    pub tracker_entry_offset: f64,
    /// Drift distance from the object boundary to the exit tracker pair (`dExit`), mm.
    pub tracker_exit_offset: f64,
}

/// A sample of the curve at one depth `u`: position and local slope (`dx/du`, `dy/du`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MlpSample {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

/// Shared contract for the three MLP evaluators, selected dynamically at runtime.
pub trait MlpModel {
    /// Stores the entry/exit kinematics (and, when present, energies) needed
    /// for subsequent `evaluate` calls. Must be called before any other method.
    fn init(&mut self, endpoints: ProtonEndpoints, energies: Option<ProtonEnergies>) -> Result<()>;

    /// Evaluates the curve at a single depth `u` (absolute z along the beam axis).
    fn evaluate(&self, u: f64) -> MlpSample;

    /// `true` if this model supports the batched `evaluate_batch` path.
    fn can_be_vectorised(&self) -> bool {
        false
    }

    /// Vectorised evaluation; only meaningful when [`Self::can_be_vectorised`]
    /// returns `true`. The default implementation falls back to repeated
    /// scalar [`Self::evaluate`] calls so every model is usable uniformly.
    fn evaluate_batch(&self, us: &[f64]) -> Vec<MlpSample> {
        us.iter().map(|&u| self.evaluate(u)).collect()
    }

    /// 2x2 position covariance at depth `u`, where supported.
    fn evaluate_error(&self, u: f64) -> Result<Mat2>;

    /// Only the Schulte model implements this; others must reject with
    /// [`crate::error::ReconError::Config`].
    fn init_uncertain(
        &mut self,
        endpoints: ProtonEndpoints,
        energies: ProtonEnergies,
        tracker: TrackerUncertainty,
    ) -> Result<()> {
        let _ = (endpoints, energies, tracker);
        Err(crate::error::ReconError::config(
            "InitUncertain is only supported by the Schulte MLP model",
        ))
    }
}

/// Dynamic selector mirroring the original tool's `--mlp` flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlpKind {
    ThirdOrderPolynomial,
    /// Arbitrary-degree polynomial MLP, called "krah" in the original CLI.
    Polynomial { degree: u32 },
    Schulte,
}

/// Constructs the requested MLP model, clamping an out-of-range polynomial
/// degree to 5 with a logged warning.
pub fn build(kind: MlpKind) -> Box<dyn MlpModel> {
    match kind {
        MlpKind::ThirdOrderPolynomial => Box::new(ThirdOrderPolynomialMlp::new()),
        MlpKind::Polynomial { degree } => Box::new(PolynomialMlp::new(degree)),
        MlpKind::Schulte => Box::new(SchulteMlp::new()),
    }
}
