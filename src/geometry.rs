//! Geometry oracle: the per-view acquisition record and its derived queries.
//!
//! Reading the geometry from an on-disk acquisition-parameter file is out of
//! scope here; this module only
//! defines the in-memory record the rest of the reconstruction core consumes,
//! plus the derived queries (`sorted_angles`, `angular_gaps`,
//! `to_untilted_coordinate_at_isocenter`) that PWeight/PParker/DDBP rely on.

use crate::error::{ReconError, Result};
use std::collections::BTreeMap;

/// Acquisition parameters for a single projection view.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryView {
    /// Gantry angle, normalized to `[0, 2*pi)`.
    pub theta: f64,
    /// Source-to-isocenter distance.
    pub sid: f64,
    /// Source-to-detector distance. `0.0` signals parallel (non-divergent) geometry.
    pub sdd: f64,
    /// Source offset, x.
    pub sox: f64,
    /// Source offset, y.
    pub soy: f64,
    /// Projection (detector panel) offset, x.
    pub pox: f64,
    /// Projection (detector panel) offset, y.
    pub poy: f64,
    /// In-plane detector rotation, radians.
    pub in_plane_rot: f64,
    /// Out-of-plane detector tilt, radians.
    pub out_of_plane_rot: f64,
}

impl GeometryView {
    pub fn parallel(theta: f64) -> Self {
        GeometryView {
            theta: normalize_angle(theta),
            sid: 0.0,
            sdd: 0.0,
            sox: 0.0,
            soy: 0.0,
            pox: 0.0,
            poy: 0.0,
            in_plane_rot: 0.0,
            out_of_plane_rot: 0.0,
        }
    }

    pub fn divergent(theta: f64, sid: f64, sdd: f64) -> Self {
        GeometryView {
            theta: normalize_angle(theta),
            sid,
            sdd,
            sox: 0.0,
            soy: 0.0,
            pox: 0.0,
            poy: 0.0,
            in_plane_rot: 0.0,
            out_of_plane_rot: 0.0,
        }
    }
}

fn normalize_angle(theta: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let mut t = theta % two_pi;
    if t < 0.0 {
        t += two_pi;
    }
    t
}

/// An immutable, shared-read-only sequence of [`GeometryView`] records, one
/// per projection view, with the derived queries used by the FDK filters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    views: Vec<GeometryView>,
}

impl Geometry {
    pub fn new(views: Vec<GeometryView>) -> Self {
        Geometry { views }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn view(&self, i: usize) -> &GeometryView {
        &self.views[i]
    }

    /// `true` when every view has `sdd == 0.0` (parallel / non-divergent geometry),
    /// matching the short-scan pass-through condition `SDD[0]==0`,
    /// generalized to "no view is divergent" rather than just the first.
    pub fn is_parallel(&self) -> bool {
        self.views.first().map(|v| v.sdd == 0.0).unwrap_or(true)
    }

    /// View indices sorted by ascending normalized angle, as an ordered map
    /// from angle to view index (duplicate angles keep stable insertion order
    /// via the secondary `usize` key).
    pub fn sorted_angles(&self) -> BTreeMap<(ordered_float::OrderedF64, usize), usize> {
        let mut map = BTreeMap::new();
        for (idx, v) in self.views.iter().enumerate() {
            map.insert((ordered_float::OrderedF64(v.theta), idx), idx);
        }
        map
    }

    /// Angular gap from each view to its next neighbour in sorted order
    /// (circularly, so the gaps sum to `2*pi`), indexed by view index.
    pub fn angular_gaps(&self) -> Vec<f64> {
        let sorted = self.sorted_angles();
        let thetas: Vec<f64> = sorted.keys().map(|(a, _)| a.0).collect();
        let indices: Vec<usize> = sorted.values().copied().collect();
        let n = thetas.len();
        let mut gaps = vec![0.0; n];
        if n == 0 {
            return gaps;
        }
        for k in 0..n {
            let next = (k + 1) % n;
            let mut gap = thetas[next] - thetas[k];
            if next == 0 {
                gap += std::f64::consts::TAU;
            }
            gaps[indices[k]] = gap;
        }
        gaps
    }

    /// Index of the view immediately preceding the widest angular gap, and
    /// the view immediately following it -- the `firstAngle`/`lastAngle`
    /// neighbours Parker weighting derives its short-scan window from.
    pub fn widest_gap_neighbours(&self) -> Result<(usize, usize)> {
        if self.views.is_empty() {
            return Err(ReconError::geometry("no views in geometry"));
        }
        let sorted = self.sorted_angles();
        let ordered_indices: Vec<usize> = sorted.values().copied().collect();
        let n = ordered_indices.len();
        let gaps = self.angular_gaps();
        let mut max_gap = f64::MIN;
        let mut max_pos = 0usize;
        for (pos, &view_idx) in ordered_indices.iter().enumerate() {
            if gaps[view_idx] > max_gap {
                max_gap = gaps[view_idx];
                max_pos = pos;
            }
        }
        let before = ordered_indices[max_pos];
        let after = ordered_indices[(max_pos + 1) % n];
        Ok((before, after))
    }

    /// Converts a detector-panel x-coordinate `l` into the untilted
    /// coordinate at isocenter, accounting for the view's in-plane rotation
    /// and out-of-plane tilt. With no tilt this is the identity.
    pub fn to_untilted_coordinate_at_isocenter(&self, view: usize, l: f64) -> f64 {
        let v = &self.views[view];
        if v.out_of_plane_rot == 0.0 && v.in_plane_rot == 0.0 {
            return l;
        }
        l * v.in_plane_rot.cos() / v.out_of_plane_rot.cos().max(1e-12)
    }
}

/// Minimal total-order wrapper over `f64` for use as a `BTreeMap` key.
/// Assumes no NaNs are present (geometry angles are always finite).
pub mod ordered_float {
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct OrderedF64(pub f64);

    impl Eq for OrderedF64 {}

    impl PartialOrd for OrderedF64 {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for OrderedF64 {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
        }
    }
}
