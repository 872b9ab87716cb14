//! PWeight: FDK divergence weighting.

use crate::geometry::Geometry;
use crate::projection::ProjectionStack;

/// Applies the divergence weighting multiplier in place, for every view,
/// slice, and detector pixel of `stack`.
///
/// `angularWeightAndRamp[i] = 0.5 * angularGapSum(i) * (SDD[i]/SID[i])^2`,
/// and each sample is multiplied by
/// `angularWeightAndRamp[i] * SDD[i] / sqrt(SDD[i]^2 + (u_untilted - pox[i])^2 + (v - poy[i])^2)`.
pub fn apply_divergence_weights(stack: &mut ProjectionStack, geometry: &Geometry) {
    let gaps = geometry.angular_gaps();
    let panel = stack.panel();
    let (nu, nv) = (panel.size[0], panel.size[1]);

    for view in 0..geometry.len() {
        let gv = geometry.view(view);
        if gv.sid == 0.0 {
            continue;
        }
        let angular_weight_and_ramp = 0.5 * gaps[view] * (gv.sdd / gv.sid).powi(2);

        for v_idx in 0..nv {
            let v_phys = panel.origin[1] + panel.spacing[1] * v_idx as f64;
            for u_idx in 0..nu {
                let u_phys = panel.origin[0] + panel.spacing[0] * u_idx as f64;
                let u_untilted = geometry.to_untilted_coordinate_at_isocenter(view, u_phys);
                let denom = (gv.sdd * gv.sdd
                    + (u_untilted - gv.pox) * (u_untilted - gv.pox)
                    + (v_phys - gv.poy) * (v_phys - gv.poy))
                    .sqrt();
                let multiplier = angular_weight_and_ramp * gv.sdd / denom;

                for slice in 0..stack.n_slices() {
                    let sample = stack.get(u_idx, v_idx, slice, view);
                    stack.set(u_idx, v_idx, slice, view, sample * multiplier as f32);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryView;
    use crate::projection::PanelLayout;

    #[test]
    fn flat_input_is_attenuated_away_from_the_principal_ray() {
        let panel = PanelLayout::new([5, 1], [10.0, 1.0], [-20.0, 0.0]);
        let mut stack = ProjectionStack::new(panel, 1, 1);
        for u in 0..5 {
            stack.set(u, 0, 0, 0, 1.0);
        }
        let geometry = Geometry::new(vec![GeometryView::divergent(0.0, 500.0, 1000.0)]);
        apply_divergence_weights(&mut stack, &geometry);

        let center = stack.get(2, 0, 0, 0);
        let edge = stack.get(0, 0, 0, 0);
        assert!(center > edge, "center {center} should outweigh edge {edge}");
    }

    #[test]
    fn parallel_geometry_is_left_untouched() {
        let panel = PanelLayout::new([3, 1], [1.0, 1.0], [-1.0, 0.0]);
        let mut stack = ProjectionStack::new(panel, 1, 1);
        stack.set(1, 0, 0, 0, 5.0);
        let geometry = Geometry::new(vec![GeometryView::parallel(0.0)]);
        apply_divergence_weights(&mut stack, &geometry);
        assert_eq!(stack.get(1, 0, 0, 0), 5.0);
    }
}
