//! Distance-decay detection kernel and per-sensor probability fields.

/// Half-Gaussian decay: probability that a single sensor at `distance` km
/// detects an event, with sensitivity scale `sigma`. 1 at distance 0,
/// monotonically decreasing, never exactly 0.
pub fn half_normal(distance: f64, sigma: f64) -> f64 {
    (-distance * distance / (2. * sigma * sigma)).exp()
}

/// Per-sensor detection probabilities at a query point, written into `out`
/// (cleared first; reused across grid cells to avoid reallocation).
pub fn sensor_probs_into(xs: &[f64], ys: &[f64], gx: f64, gy: f64, sigma: f64, out: &mut Vec<f64>) {
    out.clear();
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let dx = gx - x;
        let dy = gy - y;
        let dist2 = dx * dx + dy * dy;
        out.push((-dist2 / (2. * sigma * sigma)).exp());
    }
}

/// Allocating convenience wrapper around [`sensor_probs_into`].
pub fn sensor_probs(xs: &[f64], ys: &[f64], gx: f64, gy: f64, sigma: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(xs.len());
    sensor_probs_into(xs, ys, gx, gy, sigma, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_at_zero_distance() {
        for sigma in [0.5, 1., 10., 30.] {
            assert_relative_eq!(half_normal(0., sigma), 1.);
        }
    }

    #[test]
    fn strictly_decreasing_in_distance() {
        let mut prev = half_normal(0., 10.);
        for i in 1..100 {
            let p = half_normal(i as f64 * 0.5, 10.);
            assert!(p < prev, "not decreasing at distance {}", i as f64 * 0.5);
            assert!(p > 0.);
            prev = p;
        }
    }

    #[test]
    fn sensor_probs_matches_kernel() {
        let probs = sensor_probs(&[0., 3.], &[0., 4.], 0., 0., 10.);
        assert_relative_eq!(probs[0], 1.);
        assert_relative_eq!(probs[1], half_normal(5., 10.), epsilon = 1e-12);
    }
}
