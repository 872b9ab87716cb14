//! HoleFill: iterative small-hole filler.
//!
//! Repeatedly replaces sentinel-valued voxels with the mean of their
//! non-sentinel 6-neighbours, until no sentinel remains or an iteration
//! makes no further progress (a hole larger than the filter's reach, or an
//! isolated voxel with every neighbour also a sentinel, stops the loop
//! rather than looping forever).

use crate::volume::Volume;

/// Fills sentinel-valued voxels of `volume` in place, returning the number
/// of iterations run. Origin/spacing/direction are untouched -- only the
/// voxel data changes.
pub fn fill_holes(volume: &mut Volume, sentinel: f32) -> usize {
    let size = volume.size();
    let mut iterations = 0;

    loop {
        let mut next = volume.clone();
        let mut changed = false;

        for k in 0..size[2] {
            for j in 0..size[1] {
                for i in 0..size[0] {
                    if volume.get(i, j, k) != sentinel {
                        continue;
                    }
                    if let Some(mean) = neighbour_mean(volume, [i, j, k], size, sentinel) {
                        next.set(i, j, k, mean);
                        changed = true;
                    }
                }
            }
        }

        *volume = next;
        iterations += 1;
        if !changed {
            break;
        }
    }

    iterations
}

fn neighbour_mean(volume: &Volume, [i, j, k]: [usize; 3], size: [usize; 3], sentinel: f32) -> Option<f32> {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    let offsets: [(i64, i64, i64); 6] = [(-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0), (0, 0, -1), (0, 0, 1)];
    for (di, dj, dk) in offsets {
        let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
        if ni < 0 || nj < 0 || nk < 0 {
            continue;
        }
        let (ni, nj, nk) = (ni as usize, nj as usize, nk as usize);
        if ni >= size[0] || nj >= size[1] || nk >= size[2] {
            continue;
        }
        let value = volume.get(ni, nj, nk);
        if value == sentinel {
            continue;
        }
        sum += value as f64;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some((sum / count as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;

    fn cube(size: usize, value: f32) -> Volume {
        Volume::filled(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0), [size, size, size], value)
    }

    #[test]
    fn single_center_hole_fills_to_surrounding_mean() {
        let mut v = cube(3, 2.0);
        v.set(1, 1, 1, 0.0);
        fill_holes(&mut v, 0.0);
        assert_eq!(v.get(1, 1, 1), 2.0);
    }

    #[test]
    fn idempotent_once_filled() {
        let mut v = cube(3, 2.0);
        v.set(1, 1, 1, 0.0);
        fill_holes(&mut v, 0.0);
        let after_first = v.data().to_vec();
        fill_holes(&mut v, 0.0);
        assert_eq!(v.data(), after_first.as_slice());
    }

    #[test]
    fn isolated_sentinel_with_no_real_neighbours_stays_unfilled() {
        let mut v = Volume::filled(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0), [1, 1, 1], 0.0);
        let iterations = fill_holes(&mut v, 0.0);
        assert_eq!(v.get(0, 0, 0), 0.0);
        assert_eq!(iterations, 1);
    }

    #[test]
    fn preserves_origin_and_spacing() {
        let mut v = Volume::filled(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(0.5, 0.5, 0.5), [3, 3, 3], 1.0);
        v.set(1, 1, 1, 0.0);
        fill_holes(&mut v, 0.0);
        assert_eq!(v.origin(), Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(v.spacing(), Vec3::new(0.5, 0.5, 0.5));
    }
}
