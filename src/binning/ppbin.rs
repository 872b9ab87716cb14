//! PPBin: proton pairs to a distance-driven divergent projection grid.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{record_wepl, scattering_angles, EnergyToWeplConverter, ProtonPairRecord};
use crate::constants::ROBUST_SCATTER_PERCENTILE;
use crate::error::Result;
use crate::geom::{QuadricShape, Vec3};
use crate::mlp::{self, MlpKind, ProtonEndpoints, ProtonEnergies, TrackerUncertainty};
use crate::projection::PanelLayout;
use crate::volume::Volume;
use crate::worker::WorkerPool;

/// Static configuration for one PPBin run.
#[derive(Debug, Clone)]
pub struct PpbinConfig {
    pub mlp_kind: MlpKind,
    pub quadric_in: QuadricShape,
    /// Defaults to `quadric_in` when absent.
    pub quadric_out: Option<QuadricShape>,
    /// `d_src`; `0.0` disables divergence magnification.
    pub source_distance: f64,
    pub ionization_potential: f64,
    pub panel: PanelLayout,
    pub z_origin: f64,
    pub z_spacing: f64,
    pub n_slices: usize,
    pub robust: bool,
    pub compute_scattering: bool,
    pub compute_noise: bool,
    pub tracker: Option<TrackerUncertainty>,
}

impl PpbinConfig {
    fn quadric_out(&self) -> QuadricShape {
        self.quadric_out.unwrap_or(self.quadric_in)
    }
}

/// The accumulated output images of a PPBin run.
#[derive(Debug, Clone)]
pub struct PpbinOutputs {
    pub value: Volume,
    pub count: Volume,
    pub squared: Option<Volume>,
    pub angle: Option<Volume>,
    pub angle_sq: Option<Volume>,
}

#[derive(Clone)]
struct Shadow {
    value: Volume,
    count: Volume,
    squared: Option<Volume>,
    angle: Option<Volume>,
    angle_sq: Option<Volume>,
}

impl Shadow {
    fn new(config: &PpbinConfig) -> Self {
        let size = [config.panel.size[0], config.panel.size[1], config.n_slices];
        let origin = Vec3::ZERO;
        let spacing = Vec3::ONE;
        Shadow {
            value: Volume::new(origin, spacing, size),
            count: Volume::new(origin, spacing, size),
            squared: config.compute_noise.then(|| Volume::new(origin, spacing, size)),
            angle: (config.compute_scattering && !config.robust).then(|| Volume::new(origin, spacing, size)),
            angle_sq: (config.compute_scattering && !config.robust).then(|| Volume::new(origin, spacing, size)),
        }
    }
}

/// Picks whichever intersection root of `quadric` along the ray `p + t*d`
/// lands within `[z_lo, z_hi]` and is closest to `p` itself (the object
/// surface nearest the tracked entry/exit point), falling back to `p` when
/// the ray misses or neither root qualifies.
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

/// The PPBin accumulator: runs the per-record algorithm over a worker pool
/// and merges per-worker shadow images into the final output.
pub struct PpBinAccumulator;

impl PpBinAccumulator {
    pub fn run(
        records: &[ProtonPairRecord],
        config: &PpbinConfig,
        converter: &dyn EnergyToWeplConverter,
        pool: &WorkerPool,
    ) -> Result<PpbinOutputs> {
        let robust_lists: Option<Mutex<HashMap<(usize, usize, usize), Vec<f64>>>> =
            config.robust.then(HashMap::new).map(Mutex::new);

        let shadows = pool.map_chunks(records, |chunk, worker_id| {
            let mut shadow = Shadow::new(config);
            for record in chunk {
                process_record(record, config, converter, &mut shadow, robust_lists.as_ref(), worker_id)?;
            }
            Ok(shadow)
        })?;

        let size = [config.panel.size[0], config.panel.size[1], config.n_slices];
        let mut merged = Shadow::new(config);
        merge_shadows(&mut merged, &shadows, size);

        let robust_angle_sq = robust_lists.map(|lists| {
            let lists = lists.into_inner().expect("mutex never poisoned: no panics while locked");
            robust_variance_image(&lists, size)
        });

        finalize(merged, config, robust_angle_sq)
    }
}

fn process_record(
    record: &ProtonPairRecord,
    config: &PpbinConfig,
    converter: &dyn EnergyToWeplConverter,
    shadow: &mut Shadow,
    robust_lists: Option<&Mutex<HashMap<(usize, usize, usize), Vec<f64>>>>,
    worker_id: usize,
) -> Result<()> {
    record.validate()?;

    let (angle_x, angle_y) =
        if config.compute_scattering { scattering_angles(record.d_in, record.d_out) } else { (0.0, 0.0) };

    let value = record_wepl(record, converter) as f32;

    let quadric_out = config.quadric_out();
    let p_s_in = boundary_point(&config.quadric_in, record.p_in, record.d_in, record.p_in.z, record.p_out.z);
    let p_s_out = boundary_point(&quadric_out, record.p_out, record.d_out, record.p_in.z, record.p_out.z);

    let mut mlp = mlp::build(config.mlp_kind);
    let endpoints = ProtonEndpoints { p_in: p_s_in, p_out: p_s_out, d_in: record.d_in, d_out: record.d_out };
    match config.tracker {
        Some(tracker) => {
            let energies = ProtonEnergies { e_in: record.e_in, e_out: record.e_out };
            mlp.init_uncertain(endpoints, energies, tracker)?;
        }
        None => mlp.init(endpoints, None)?,
    }

    let dxdz_in = record.d_in.x / record.d_in.z;
    let dydz_in = record.d_in.y / record.d_in.z;
    let dxdz_out = record.d_out.x / record.d_out.z;
    let dydz_out = record.d_out.y / record.d_out.z;

    let mut zs = Vec::with_capacity(config.n_slices);
    let mut categories = Vec::with_capacity(config.n_slices);
    for k in 0..config.n_slices {
        let z = config.z_origin + k as f64 * config.z_spacing;
        zs.push(z);
        categories.push(if z < p_s_in.z {
            0u8
        } else if z > p_s_out.z {
            2u8
        } else {
            1u8
        });
    }

    let between_zs: Vec<f64> = zs.iter().zip(&categories).filter(|(_, &c)| c == 1).map(|(&z, _)| z).collect();
    let between_samples = mlp.evaluate_batch(&between_zs);
    let mut between_iter = between_samples.into_iter();

    let do_scattering_write = config.compute_scattering && (!config.robust || worker_id == 0);

    for (&z, &category) in zs.iter().zip(&categories) {
        let (x, y) = match category {
            0 => (p_s_in.x + (z - p_s_in.z) * dxdz_in, p_s_in.y + (z - p_s_in.z) * dydz_in),
            2 => (p_s_out.x + (z - p_s_out.z) * dxdz_out, p_s_out.y + (z - p_s_out.z) * dydz_out),
            _ => {
                let s = between_iter.next().expect("between_zs/between_samples length mismatch");
                (s.x, s.y)
            }
        };

        let zmag = if config.source_distance != 0.0 {
            (p_s_out.z - config.source_distance) / (z - config.source_distance)
        } else {
            1.0
        };

        let (fu, fv) = config.panel.physical_to_index(x * zmag, y * zmag);
        let (iu, iv) = (fu.round() as i64, fv.round() as i64);
        if !config.panel.contains_index(iu, iv) {
            continue;
        }
        let (iu, iv) = (iu as usize, iv as usize);
        let k = ((z - config.z_origin) / config.z_spacing).round() as usize;

        shadow.value.add(iu, iv, k, value);
        shadow.count.add(iu, iv, k, 1.0);
        if let Some(squared) = shadow.squared.as_mut() {
            squared.add(iu, iv, k, value * value);
        }
        if do_scattering_write {
            if config.robust {
                if let Some(lists) = robust_lists {
                    let magnitude = (angle_x * angle_x + angle_y * angle_y).sqrt();
                    let mut guard = lists.lock().expect("robust angle list mutex poisoned");
                    guard.entry((iu, iv, k)).or_default().push(magnitude);
                }
            } else {
                if let Some(angle) = shadow.angle.as_mut() {
                    angle.add(iu, iv, k, (angle_x + angle_y) as f32);
                }
                if let Some(angle_sq) = shadow.angle_sq.as_mut() {
                    angle_sq.add(iu, iv, k, (angle_x * angle_x + angle_y * angle_y) as f32);
                }
            }
        }
    }

    Ok(())
}

fn merge_shadows(merged: &mut Shadow, shadows: &[Shadow], size: [usize; 3]) {
    for shadow in shadows {
        for k in 0..size[2] {
            for j in 0..size[1] {
                for i in 0..size[0] {
                    merged.value.add(i, j, k, shadow.value.get(i, j, k));
                    merged.count.add(i, j, k, shadow.count.get(i, j, k));
                    if let (Some(dst), Some(src)) = (merged.squared.as_mut(), shadow.squared.as_ref()) {
                        dst.add(i, j, k, src.get(i, j, k));
                    }
                    if let (Some(dst), Some(src)) = (merged.angle.as_mut(), shadow.angle.as_ref()) {
                        dst.add(i, j, k, src.get(i, j, k));
                    }
                    if let (Some(dst), Some(src)) = (merged.angle_sq.as_mut(), shadow.angle_sq.as_ref()) {
                        dst.add(i, j, k, src.get(i, j, k));
                    }
                }
            }
        }
    }
}

/// Robust-scattering voxel variance: `(2 * p38.30(|angle|))^2` for voxels
/// with `count >= 2`, `0.0` for `count == 1`, absent entirely for `count == 0`.
fn robust_variance_image(lists: &HashMap<(usize, usize, usize), Vec<f64>>, size: [usize; 3]) -> Volume {
    let mut image = Volume::new(Vec3::ZERO, Vec3::ONE, size);
    for (&(i, j, k), magnitudes) in lists {
        if magnitudes.len() < 2 {
            continue;
        }
        let mut sorted = magnitudes.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let rank = (ROBUST_SCATTER_PERCENTILE * (sorted.len() - 1) as f64).round() as usize;
        let p = sorted[rank.min(sorted.len() - 1)];
        let sigma1 = 2.0 * p;
        image.set(i, j, k, (sigma1 * sigma1) as f32);
    }
    image
}

fn finalize(mut merged: Shadow, config: &PpbinConfig, robust_angle_sq: Option<Volume>) -> Result<PpbinOutputs> {
    let size = [config.panel.size[0], config.panel.size[1], config.n_slices];
    for k in 0..size[2] {
        for j in 0..size[1] {
            for i in 0..size[0] {
                let count = merged.count.get(i, j, k);
                if count <= 0.0 {
                    continue;
                }
                let mean = merged.value.get(i, j, k) / count;

                if let Some(squared) = merged.squared.as_mut() {
                    let raw_mean_sq = squared.get(i, j, k) / count;
                    let variance = raw_mean_sq - mean * mean;
                    squared.set(i, j, k, variance / count);
                }
                if let Some(angle_sq) = merged.angle_sq.as_mut() {
                    let raw = angle_sq.get(i, j, k);
                    angle_sq.set(i, j, k, raw / (2.0 * count));
                }

                merged.value.set(i, j, k, mean);
            }
        }
    }

    let angle_sq = robust_angle_sq.or(merged.angle_sq);

    Ok(PpbinOutputs { value: merged.value, count: merged.count, squared: merged.squared, angle: merged.angle, angle_sq })
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

    fn default_config(n_slices: usize) -> PpbinConfig {
        PpbinConfig {
            mlp_kind: MlpKind::ThirdOrderPolynomial,
            quadric_in: QuadricShape::ellipsoid(Vec3::new(0.0, 0.0, 100.0), Vec3::new(50.0, 50.0, 50.0)),
            quadric_out: None,
            source_distance: 0.0,
            ionization_potential: 75.0,
            panel: PanelLayout::new([64, 64], [1.0, 1.0], [-32.0, -32.0]),
            z_origin: 0.0,
            z_spacing: 10.0,
            n_slices,
            robust: false,
            compute_scattering: true,
            compute_noise: false,
            tracker: None,
        }
    }

    fn straight_record() -> ProtonPairRecord {
        ProtonPairRecord {
            p_in: Vec3::new(0.0, 0.0, 0.0),
            p_out: Vec3::new(0.0, 0.0, 200.0),
            d_in: Vec3::new(0.0, 0.0, 1.0),
            d_out: Vec3::new(0.0, 0.0, 1.0),
            e_in: 200.0,
            e_out: 150.0,
            nuclear_scattering: false,
        }
    }

    #[test]
    fn straight_proton_pair_hits_every_plane_at_the_origin_pixel() {
        let config = default_config(21);
        let pool = WorkerPool::new(2);
        let records = vec![straight_record(), straight_record()];
        let out = PpBinAccumulator::run(&records, &config, &LinearWepl, &pool).unwrap();

        let (iu, _) = config.panel.physical_to_index(0.0, 0.0);
        let iu = iu.round() as usize;
        for k in 0..config.n_slices {
            assert_eq!(out.count.get(iu, iu, k), 2.0, "plane {k}");
            assert!((out.value.get(iu, iu, k) - 50.0).abs() < 1e-3);
        }
    }

    #[test]
    fn parallel_directions_produce_zero_scattering_angle_stats() {
        let config = default_config(5);
        let pool = WorkerPool::new(1);
        let records = vec![straight_record()];
        let out = PpBinAccumulator::run(&records, &config, &LinearWepl, &pool).unwrap();
        let angle_sq = out.angle_sq.unwrap();
        for v in angle_sq.data() {
            assert!(v.abs() < 1e-9);
        }
    }

    #[test]
    fn robust_mode_leaves_single_count_voxels_at_zero_variance() {
        let mut config = default_config(5);
        config.robust = true;
        let pool = WorkerPool::new(1);
        let records = vec![straight_record()];
        let out = PpBinAccumulator::run(&records, &config, &LinearWepl, &pool).unwrap();
        let angle_sq = out.angle_sq.unwrap();
        let (iu, _) = config.panel.physical_to_index(0.0, 0.0);
        assert_eq!(angle_sq.get(iu.round() as usize, iu.round() as usize, 0), 0.0);
    }
}
