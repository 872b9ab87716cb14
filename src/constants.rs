//! Physical and numerical constants shared across the reconstruction core.

/// Radiation length of water, in cm, used by the Highland multiple-scattering
/// formula in the Schulte tracker-uncertainty correction (`SchulteMlp::init_uncertain`).
pub const RADIATION_LENGTH_WATER_CM: f64 = 36.1;

/// Highland-formula scale constant, in MeV, paired with [`RADIATION_LENGTH_WATER_CM`]
/// as `(13.6 MeV)^2 / X0` in the tracker-plane scattering variance.
pub const HIGHLAND_SCALE_MEV: f64 = 13.6;

/// Historical thread cap applied to the FDK front-end only (not PPBin/PPBP),
/// to bound memory use of the per-worker shadow accumulators.
pub const FDK_THREAD_CAP: usize = 8;

/// Parker short-scan pass-through threshold: angular gaps below this are
/// treated as effectively full-scan coverage.
pub const PARKER_PASS_THROUGH_GAP_RAD: f64 = std::f64::consts::PI / 9.0;

/// The z-quantile corresponding to the 0.5-sigma point of a half-normal
/// distribution, used by PPBin's robust-scattering angle estimator.
pub const ROBUST_SCATTER_PERCENTILE: f64 = 0.3830;

/// Default sentinel value for [`crate::holefill::fill_holes`].
pub const HOLEFILL_DEFAULT_SENTINEL: f32 = 0.0;

/// 180 MeV tabulated `1/(beta^2 p^2)(u)` coefficients, one array per
/// polynomial degree 0-5 (`bm_N` has `N+1` entries). This is the mandatory
/// table, mandatory at every supported degree. Shared by the
/// degree-N polynomial MLP and, at its top (degree-5) resolution, by the
/// Schulte model's scattering-power integrand.
const BM_0: [f64; 1] = [2.656e-3];
const BM_1: [f64; 2] = [2.656e-3, 1.3e-5];
const BM_2: [f64; 3] = [2.656e-3, 1.3e-5, 7.9e-8];
const BM_3: [f64; 4] = [2.656e-3, 1.3e-5, 7.9e-8, 5.1e-10];
const BM_4: [f64; 5] = [2.656e-3, 1.3e-5, 7.9e-8, 5.1e-10, 3.6e-12];
const BM_5: [f64; 6] = [2.656e-3, 1.3e-5, 7.9e-8, 5.1e-10, 3.6e-12, 2.7e-14];

// A commented-out 200 MeV table is documented in the original source but left
// inactive; preserved here the same way, as dead code rather than deleted,
// so a future build can wire in an alternative beam energy.
#[allow(dead_code)]
const BM_5_200MEV: [f64; 6] = [2.190e-3, 9.8e-6, 5.4e-8, 3.2e-10, 2.1e-12, 1.5e-14];

/// Returns the 180 MeV `bm` coefficient table for `degree` (already clamped to `[0,5]`).
pub(crate) fn bm_table(degree: u32) -> &'static [f64] {
    match degree {
        0 => &BM_0,
        1 => &BM_1,
        2 => &BM_2,
        3 => &BM_3,
        4 => &BM_4,
        5 => &BM_5,
        _ => unreachable!("degree must already be clamped to [0,5]"),
    }
}
