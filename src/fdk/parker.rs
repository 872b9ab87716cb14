//! PParker: distance-driven Parker short-scan weighting.

use crate::constants::PARKER_PASS_THROUGH_GAP_RAD;
use crate::geometry::Geometry;
use crate::projection::ProjectionStack;
use log::warn;
use std::f64::consts::{PI, TAU};

/// Records whether Parker weighting actually ran, or passed through
/// unchanged because the scan is already a full rotation (or parallel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkerOutcome {
    Applied,
    PassThroughParallel,
    PassThroughFullScan,
}

fn weight(beta: f64, alpha: f64, delta: f64) -> f64 {
    if beta <= 2.0 * delta - 2.0 * alpha {
        let denom = 4.0 * (delta - alpha);
        2.0 * (PI * beta / denom).sin().powi(2)
    } else if beta <= PI - 2.0 * alpha {
        2.0
    } else if beta <= PI + 2.0 * delta {
        let denom = 4.0 * (delta + alpha);
        2.0 * (PI * (PI + 2.0 * delta - beta) / denom).sin().powi(2)
    } else {
        0.0
    }
}

fn reduce_mod_tau(mut x: f64) -> f64 {
    x %= TAU;
    if x < 0.0 {
        x += TAU;
    }
    x
}

/// Applies the short-scan weight in place to every sample of `stack`,
/// unless the geometry is parallel or already a full scan, in which case
/// it is a documented pass-through.
pub fn apply_parker_weights(stack: &mut ProjectionStack, geometry: &Geometry) -> ParkerOutcome {
    if geometry.is_parallel() {
        return ParkerOutcome::PassThroughParallel;
    }
    let gaps = geometry.angular_gaps();
    let max_gap = gaps.iter().cloned().fold(f64::MIN, f64::max);
    if max_gap < PARKER_PASS_THROUGH_GAP_RAD {
        return ParkerOutcome::PassThroughFullScan;
    }

    let (before, after) = match geometry.widest_gap_neighbours() {
        Ok(pair) => pair,
        Err(_) => return ParkerOutcome::PassThroughFullScan,
    };
    let first_angle = geometry.view(after).theta;
    let mut last_angle = geometry.view(before).theta;
    if last_angle < first_angle {
        last_angle += TAU;
    }
    let delta = reduce_mod_tau(0.5 * (last_angle - first_angle - PI));

    let panel = stack.panel();
    let (nu, nv) = (panel.size[0], panel.size[1]);
    let panel_width = nu as f64 * panel.spacing[0];

    for view in 0..geometry.len() {
        let gv = geometry.view(view);
        let inv_sid = 1.0 / (gv.sid * gv.sid + gv.sox * gv.sox).sqrt();
        let mut theta = gv.theta - first_angle;
        if theta < 0.0 {
            theta += TAU;
        }
        let beta = theta;

        if 2.0 * delta < (0.5 * panel_width * inv_sid).atan() {
            warn!("view {view}: short-scan angular coverage may be insufficient for the panel width");
        }

        for u_idx in 0..nu {
            let u_phys = panel.origin[0] + panel.spacing[0] * u_idx as f64;
            let l = geometry.to_untilted_coordinate_at_isocenter(view, u_phys);
            let alpha = (-l * inv_sid).atan();
            let w = weight(beta, alpha, delta);

            for v_idx in 0..nv {
                for slice in 0..stack.n_slices() {
                    let sample = stack.get(u_idx, v_idx, slice, view);
                    stack.set(u_idx, v_idx, slice, view, sample * w as f32);
                }
            }
        }
    }

    ParkerOutcome::Applied
}
