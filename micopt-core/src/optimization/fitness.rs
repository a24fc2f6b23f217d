//! GA fitness: generation-dependent blend of high-confidence and
//! any-detection coverage over the in-mask sample grid, minus penalties for
//! under-covered area and clustered recorders.

use itertools::Itertools;
use log::debug;

use crate::detection::coincidence::{effective_level, p_at_least};
use crate::detection::field::sensor_probs_into;
use crate::geometry::r2::R2;
use crate::optimization::layout::SensorLayout;
use crate::optimization::params::{AlphaCurve, OptimizationParams};
use crate::region::grid::DetectionGrid;
use crate::region::mask::RegionMask;

/// Grid points whose high-confidence probability falls below this count as
/// under-covered.
pub const UNDER_COVERED_THRESHOLD: f64 = 0.2;

/// Confidence level of the primary coverage term, clamped to the recorder
/// count at evaluation time.
pub const HIGH_CONFIDENCE_LEVEL: usize = 4;

/// Monotone 0→1 ramp over the run, shifting weight from the lenient
/// any-detection objective to the strict high-confidence objective.
pub fn alpha(generation: usize, total_generations: usize, curve: AlphaCurve) -> f64 {
    let g = generation as f64;
    let t = total_generations as f64;
    match curve {
        AlphaCurve::Linear => g / t,
        AlphaCurve::Expo => 1. - (-4. * g / t).exp(),
    }
}

pub fn evaluate(
    ind: &SensorLayout,
    grid: &DetectionGrid,
    mask: &RegionMask,
    generation: usize,
    params: &OptimizationParams,
) -> f64 {
    let k_high = effective_level(HIGH_CONFIDENCE_LEVEL, ind.len());
    let a = alpha(generation, params.generations, params.alpha_curve);

    let mut sum_high = 0.;
    let mut sum_any = 0.;
    let mut under_covered = 0usize;
    let mut count = 0usize;
    let mut probs = Vec::with_capacity(ind.len());
    for &gy in &grid.ys {
        for &gx in &grid.xs {
            if !mask.contains(&R2 { x: gx, y: gy }) {
                continue;
            }
            sensor_probs_into(&ind.xs, &ind.ys, gx, gy, params.sd, &mut probs);
            let p_high = p_at_least(&probs, k_high);
            sum_high += p_high;
            sum_any += p_at_least(&probs, 1);
            if p_high < UNDER_COVERED_THRESHOLD {
                under_covered += 1;
            }
            count += 1;
        }
    }

    let mut score = 0.;
    if count > 0 {
        let mean_high = sum_high / count as f64;
        let mean_any = sum_any / count as f64;
        score = a * mean_high + (1. - a) * mean_any;
        score -= params.empty_penalty_fraction * (under_covered as f64 / count as f64);
        debug!(
            "gen {}: alpha {:.3}, mean_high {:.4}, mean_any {:.4}, under-covered {}/{}",
            generation, a, mean_high, mean_any, under_covered, count
        );
    }

    let mut too_close = 0usize;
    let mut pairs = 0usize;
    for (p, q) in ind.points().tuple_combinations() {
        if p.distance(&q) < params.min_dist {
            too_close += 1;
        }
        pairs += 1;
    }
    if pairs > 0 {
        score -= params.close_penalty_fraction * (too_close as f64 / pairs as f64);
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_for(mask: &RegionMask) -> DetectionGrid {
        DetectionGrid::over(mask.bounds(), 40, 40)
    }

    #[test]
    fn alpha_ramps_zero_to_one() {
        assert_relative_eq!(alpha(0, 100, AlphaCurve::Linear), 0.);
        assert_relative_eq!(alpha(50, 100, AlphaCurve::Linear), 0.5);
        assert_relative_eq!(alpha(100, 100, AlphaCurve::Linear), 1.);
        assert_relative_eq!(alpha(0, 100, AlphaCurve::Expo), 0.);
        assert_relative_eq!(alpha(100, 100, AlphaCurve::Expo), 1. - (-4.0f64).exp());
        // expo ramps faster than linear mid-run
        assert!(alpha(25, 100, AlphaCurve::Expo) > alpha(25, 100, AlphaCurve::Linear));
    }

    #[test]
    fn empty_mask_scores_pair_penalty_only() {
        let rgba = vec![0u8; 4 * 4 * 4];
        let mask = RegionMask::from_image(&rgba, 4, 4, 10., 10.).unwrap();
        let params = OptimizationParams { num_recorders: 2, ..Default::default() };
        // two coincident recorders: every pair violates min_dist
        let ind = SensorLayout { xs: vec![0., 0.], ys: vec![1., 1.], score: 0. };
        let score = evaluate(&ind, &grid_for(&mask), &mask, 0, &params);
        assert_relative_eq!(score, -params.close_penalty_fraction, epsilon = 1e-12);
    }

    #[test]
    fn clustered_recorders_score_below_spread_recorders() {
        let mask = RegionMask::semicircle(20.);
        let grid = grid_for(&mask);
        let params = OptimizationParams { num_recorders: 4, ..Default::default() };
        let clustered = SensorLayout {
            xs: vec![0., 0.5, -0.5, 0.],
            ys: vec![5., 5., 5., 5.5],
            score: 0.,
        };
        let spread = SensorLayout {
            xs: vec![-10., 10., -5., 5.],
            ys: vec![5., 5., 12., 12.],
            score: 0.,
        };
        // mid-run so both coverage terms and the proximity penalty are live
        let sc = evaluate(&clustered, &grid, &mask, 50, &params);
        let sp = evaluate(&spread, &grid, &mask, 50, &params);
        assert!(sp > sc, "spread {} should beat clustered {}", sp, sc);
    }

    #[test]
    fn single_recorder_uses_any_detection_as_primary() {
        // With R = 1 the high-confidence level clamps to 1, so the blend is
        // alpha-independent: both terms are the same number.
        let mask = RegionMask::semicircle(20.);
        let grid = grid_for(&mask);
        let params = OptimizationParams {
            num_recorders: 1,
            empty_penalty_fraction: 0.,
            ..Default::default()
        };
        let ind = SensorLayout { xs: vec![0.], ys: vec![8.], score: 0. };
        let early = evaluate(&ind, &grid, &mask, 0, &params);
        let late = evaluate(&ind, &grid, &mask, 99, &params);
        assert_relative_eq!(early, late, epsilon = 1e-12);
    }
}
