//! PPBP: proton pairs backprojected directly into a reconstruction volume.

use super::{record_wepl, EnergyToWeplConverter, ProtonPairRecord};
use crate::error::Result;
use crate::geom::{QuadricShape, Vec3};
use crate::mlp::{self, MlpKind, ProtonEndpoints};
use crate::volume::Volume;
use crate::worker::WorkerPool;

/// Static configuration for one PPBP run.
#[derive(Debug, Clone)]
pub struct PpbpConfig {
    pub mlp_kind: MlpKind,
    pub quadric_in: QuadricShape,
    pub quadric_out: Option<QuadricShape>,
    /// Per-record view rotation applied to the sampled `(x, y)` before
    /// voxelization, unless `disable_rotation` is set.
    pub view_theta: f64,
    pub disable_rotation: bool,
}

impl PpbpConfig {
    fn quadric_out(&self) -> QuadricShape {
        self.quadric_out.unwrap_or(self.quadric_in)
    }
}

/// Picks whichever intersection root of `quadric` along the ray `p + t*d`
/// lands within `[z_lo, z_hi]` and is closest to `p` itself, falling back to
/// `p` when the ray misses or neither root qualifies.
fn boundary_point(quadric: &QuadricShape, p: Vec3, d: Vec3, z_lo: f64, z_hi: f64) -> Vec3 {
    match quadric.intersect_ray(p, d) {
        Some((t0, t1)) => [t0, t1]
            .into_iter()
            .map(|t| p + d * t)
            .filter(|c| c.z >= z_lo - 1e-9 && c.z <= z_hi + 1e-9)
            .min_by(|a, b| (*a - p).length_squared().partial_cmp(&(*b - p).length_squared()).unwrap())
            .unwrap_or(p),
        None => p,
    }
}

/// The PPBP direct volume backprojector.
pub struct PpBackProjector;

impl PpBackProjector {
    pub fn run(
        records: &[ProtonPairRecord],
        config: &PpbpConfig,
        converter: &dyn EnergyToWeplConverter,
        volume_template: &Volume,
        pool: &WorkerPool,
    ) -> Result<(Volume, Volume)> {
        let shadows = pool.map_chunks(records, |chunk, _worker_id| {
            let mut value = Volume::new(volume_template.origin(), volume_template.spacing(), volume_template.size());
            let mut count = Volume::new(volume_template.origin(), volume_template.spacing(), volume_template.size());
            for record in chunk {
                process_record(record, config, converter, volume_template, &mut value, &mut count)?;
            }
            Ok((value, count))
        })?;

        let size = volume_template.size();
        let mut value = Volume::new(volume_template.origin(), volume_template.spacing(), size);
        let mut count = Volume::new(volume_template.origin(), volume_template.spacing(), size);
        for (shadow_value, shadow_count) in &shadows {
            for k in 0..size[2] {
                for j in 0..size[1] {
                    for i in 0..size[0] {
                        value.add(i, j, k, shadow_value.get(i, j, k));
                        count.add(i, j, k, shadow_count.get(i, j, k));
                    }
                }
            }
        }
        Ok((value, count))
    }
}

fn process_record(
    record: &ProtonPairRecord,
    config: &PpbpConfig,
    converter: &dyn EnergyToWeplConverter,
    template: &Volume,
    value: &mut Volume,
    count: &mut Volume,
) -> Result<()> {
    record.validate()?;
    let wepl = record_wepl(record, converter) as f32;

    let quadric_out = config.quadric_out();
    let p_s_in = boundary_point(&config.quadric_in, record.p_in, record.d_in, record.p_in.z, record.p_out.z);
    let p_s_out = boundary_point(&quadric_out, record.p_out, record.d_out, record.p_in.z, record.p_out.z);

    let mut mlp = mlp::build(config.mlp_kind);
    mlp.init(
        ProtonEndpoints { p_in: p_s_in, p_out: p_s_out, d_in: record.d_in, d_out: record.d_out },
        None,
    )?;

    let dxdz_in = record.d_in.x / record.d_in.z;
    let dydz_in = record.d_in.y / record.d_in.z;
    let dxdz_out = record.d_out.x / record.d_out.z;
    let dydz_out = record.d_out.y / record.d_out.z;

    let (origin, spacing, size) = (template.origin(), template.spacing(), template.size());
    let (cos_t, sin_t) = (config.view_theta.cos(), config.view_theta.sin());

    for k in 0..size[2] {
        let z = origin.z + spacing.z * k as f64;
        let (x, y) = if z < p_s_in.z {
            (p_s_in.x + (z - p_s_in.z) * dxdz_in, p_s_in.y + (z - p_s_in.z) * dydz_in)
        } else if z > p_s_out.z {
            (p_s_out.x + (z - p_s_out.z) * dxdz_out, p_s_out.y + (z - p_s_out.z) * dydz_out)
        } else {
            let s = mlp.evaluate(z);
            (s.x, s.y)
        };

        let (wx, wy) = if config.disable_rotation { (x, y) } else { (x * cos_t - y * sin_t, x * sin_t + y * cos_t) };

        let index = template.physical_to_index(Vec3::new(wx, wy, z));
        let (i, j) = (index.x.round() as i64, index.y.round() as i64);
        if i < 0 || j < 0 || (i as usize) >= size[0] || (j as usize) >= size[1] {
            continue;
        }
        let (i, j) = (i as usize, j as usize);
        value.add(i, j, k, wepl);
        count.add(i, j, k, 1.0);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::MlpKind;

    struct LinearWepl;
    impl EnergyToWeplConverter for LinearWepl {
        fn wepl_mm(&self, e_out: f64, e_in: f64) -> f64 {
            e_in - e_out
        }
    }

    #[test]
    fn disable_rotation_confines_the_ray_to_its_own_x_column() {
        let config = PpbpConfig {
            mlp_kind: MlpKind::ThirdOrderPolynomial,
            quadric_in: QuadricShape::ellipsoid(Vec3::ZERO, Vec3::new(200.0, 200.0, 200.0)),
            quadric_out: None,
            view_theta: 0.0,
            disable_rotation: true,
        };
        let template = Volume::new(Vec3::new(-32.0, -32.0, -50.0), Vec3::new(1.0, 1.0, 1.0), [64, 64, 100]);
        let record = ProtonPairRecord {
            p_in: Vec3::new(10.0, 0.0, -50.0),
            p_out: Vec3::new(10.0, 0.0, 50.0),
            d_in: Vec3::new(0.0, 0.0, 1.0),
            d_out: Vec3::new(0.0, 0.0, 1.0),
            e_in: 200.0,
            e_out: 150.0,
            nuclear_scattering: false,
        };
        let pool = WorkerPool::new(1);
        let (_, count) = PpBackProjector::run(&[record], &config, &LinearWepl, &template, &pool).unwrap();

        let x_index = template.physical_to_index(Vec3::new(10.0, 0.0, 0.0)).x.round() as usize;
        for k in 0..100 {
            for i in 0..64 {
                let c = count.get(i, 32, k);
                if i == x_index {
                    assert_eq!(c, 1.0, "plane {k}");
                } else {
                    assert_eq!(c, 0.0, "plane {k}, column {i}");
                }
            }
        }
    }
}
