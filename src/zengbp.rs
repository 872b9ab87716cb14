//! ZengBP: cosine/sine-weighted combination of a stack of DBP slices.

use crate::geometry::Geometry;
use crate::volume::Volume;

/// Produces the cosine-weighted and sine-weighted sums of `slices[i]`
/// scaled by `cos(theta_i)` / `sin(theta_i)` respectively, where `theta_i`
/// is the corresponding view's gantry angle.
pub fn combine(slices: &[Volume], geometry: &Geometry) -> (Volume, Volume) {
    assert_eq!(slices.len(), geometry.len(), "one DBP slice expected per view");
    let template = &slices[0];
    let size = template.size();
    let mut cosine_sum = Volume::new(template.origin(), template.spacing(), size);
    let mut sine_sum = Volume::new(template.origin(), template.spacing(), size);

    for (view, slice) in slices.iter().enumerate() {
        let theta = geometry.view(view).theta;
        let (sin_t, cos_t) = theta.sin_cos();
        for k in 0..size[2] {
            for j in 0..size[1] {
                for i in 0..size[0] {
                    let value = slice.get(i, j, k);
                    cosine_sum.add(i, j, k, value * cos_t as f32);
                    sine_sum.add(i, j, k, value * sin_t as f32);
                }
            }
        }
    }

    (cosine_sum, sine_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;
    use crate::geometry::GeometryView;

    #[test]
    fn single_view_at_zero_angle_has_zero_sine_component() {
        let slice = Volume::filled(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0), [2, 2, 2], 3.0);
        let geometry = Geometry::new(vec![GeometryView::divergent(0.0, 500.0, 1000.0)]);
        let (cosine_sum, sine_sum) = combine(&[slice], &geometry);
        assert_eq!(cosine_sum.get(0, 0, 0), 3.0);
        assert!(sine_sum.get(0, 0, 0).abs() < 1e-6);
    }

    #[test]
    fn opposite_views_cancel_in_the_cosine_sum() {
        let a = Volume::filled(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0), [1, 1, 1], 1.0);
        let b = Volume::filled(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0), [1, 1, 1], 1.0);
        let geometry =
            Geometry::new(vec![GeometryView::divergent(0.0, 500.0, 1000.0), GeometryView::divergent(std::f64::consts::PI, 500.0, 1000.0)]);
        let (cosine_sum, _) = combine(&[a, b], &geometry);
        assert!(cosine_sum.get(0, 0, 0).abs() < 1e-6);
    }
}
