//! Proton-pair ingestion: the record type and WEPL conversion contract shared
//! by [`ppbin`] and [`ppbp`].

mod ppbin;
mod ppbp;

pub use ppbin::{PpBinAccumulator, PpbinConfig, PpbinOutputs};
pub use ppbp::{PpBackProjector, PpbpConfig};

use crate::error::{ReconError, Result};
use crate::geom::Vec3;

/// One proton pair record as ingested from the (external) proton-pair file.
#[derive(Debug, Clone, Copy)]
pub struct ProtonPairRecord {
    pub p_in: Vec3,
    pub p_out: Vec3,
    pub d_in: Vec3,
    pub d_out: Vec3,
    /// Entry energy, MeV. `0.0` signals that `e_out` already holds the
    /// precomputed WEPL in mm.
    pub e_in: f64,
    pub e_out: f64,
    pub nuclear_scattering: bool,
}

impl ProtonPairRecord {
    /// Validates the z-ordering and direction-sign contract.
    pub fn validate(&self) -> Result<()> {
        if self.p_in.z >= self.p_out.z {
            return Err(ReconError::data_contract("p_in.z must be strictly less than p_out.z"));
        }
        if self.d_in.z < 0.0 {
            return Err(ReconError::data_contract("d_in.z must be non-negative"));
        }
        Ok(())
    }
}

/// External black-box energy-to-WEPL converter.
/// Must be a monotone decreasing map in `e_out` for fixed `e_in`.
pub trait EnergyToWeplConverter: Sync {
    fn wepl_mm(&self, e_out: f64, e_in: f64) -> f64;
}

/// Resolves a record's WEPL value: direct pass-through when `e_in == 0`,
/// otherwise delegates to the external converter.
pub fn record_wepl(record: &ProtonPairRecord, converter: &dyn EnergyToWeplConverter) -> f64 {
    if record.e_in == 0.0 {
        record.e_out
    } else {
        converter.wepl_mm(record.e_out, record.e_in)
    }
}

/// Per-axis polar scattering angle between the entry and exit directions'
/// projections onto the (axis, z) plane.
pub fn scattering_angles(d_in: Vec3, d_out: Vec3) -> (f64, f64) {
    let angle = |a: f64, az: f64, b: f64, bz: f64| -> f64 {
        let in_xz = (a * a + az * az).sqrt();
        let out_xz = (b * b + bz * bz).sqrt();
        let cos_theta = (a * b + az * bz) / (in_xz * out_xz);
        cos_theta.min(1.0).max(-1.0).acos()
    };
    let angle_x = angle(d_in.x, d_in.z, d_out.x, d_out.z);
    let angle_y = angle(d_in.y, d_in.z, d_out.y, d_out.z);
    (angle_x, angle_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_increasing_z() {
        let mut r = ProtonPairRecord {
            p_in: Vec3::new(0.0, 0.0, 10.0),
            p_out: Vec3::new(0.0, 0.0, 10.0),
            d_in: Vec3::new(0.0, 0.0, 1.0),
            d_out: Vec3::new(0.0, 0.0, 1.0),
            e_in: 200.0,
            e_out: 150.0,
            nuclear_scattering: false,
        };
        assert!(r.validate().is_err());
        r.p_out.z = 20.0;
        assert!(r.validate().is_ok());
    }

    #[test]
    fn parallel_directions_have_zero_scattering_angle() {
        let (ax, ay) = scattering_angles(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(ax.abs() < 1e-12);
        assert!(ay.abs() < 1e-12);
    }

    #[test]
    fn direct_wepl_pass_through_when_e_in_is_zero() {
        struct NeverCalled;
        impl EnergyToWeplConverter for NeverCalled {
            fn wepl_mm(&self, _e_out: f64, _e_in: f64) -> f64 {
                panic!("should not be called when e_in == 0");
            }
        }
        let r = ProtonPairRecord {
            p_in: Vec3::ZERO,
            p_out: Vec3::new(0.0, 0.0, 1.0),
            d_in: Vec3::new(0.0, 0.0, 1.0),
            d_out: Vec3::new(0.0, 0.0, 1.0),
            e_in: 0.0,
            e_out: 42.0,
            nuclear_scattering: false,
        };
        assert_eq!(record_wepl(&r, &NeverCalled), 42.0);
    }
}
