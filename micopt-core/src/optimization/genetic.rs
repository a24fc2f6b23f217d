//! Genetic solver: evolves a population of recorder layouts with truncation
//! selection, blend crossover, mask-aware repair and bounded mutation, under
//! single-individual elitism.

use log::{debug, info};
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::detection::coincidence::effective_level;
use crate::error::ConfigError;
use crate::geometry::r2::R2;
use crate::optimization::fitness::{self, HIGH_CONFIDENCE_LEVEL};
use crate::optimization::layout::SensorLayout;
use crate::optimization::params::OptimizationParams;
use crate::optimization::progress::CancelToken;
use crate::optimization::result::{probability_map, GeneticResult};
use crate::region::grid::DetectionGrid;
use crate::region::mask::RegionMask;

/// Fitness integration grid resolution (x, y).
pub const FITNESS_RESOLUTION: (usize, usize) = (80, 80);

/// Parent pool size for truncation selection.
const PARENT_POOL: usize = 5;

/// Attempts at a bounded mutation draw before giving up and resampling.
const MUTATION_ATTEMPTS: usize = 20;

/// Cancellation poll interval, in generations.
const YIELD_INTERVAL: usize = 5;

/// Run the genetic solver to completion.
///
/// `seed_coords`, when given, becomes the first individual verbatim (its
/// length may differ from `num_recorders` when re-optimizing an edited
/// layout); the rest of the population is sampled from the mask. `on_progress`
/// receives a monotone percentage once per generation; `cancel` is polled
/// every [`YIELD_INTERVAL`] generations and finalizes the run early.
pub fn run_genetic<R: Rng + ?Sized>(
    params: &OptimizationParams,
    mask: &RegionMask,
    seed_coords: Option<&[R2<f64>]>,
    rng: &mut R,
    mut on_progress: impl FnMut(f64),
    cancel: Option<&CancelToken>,
) -> Result<GeneticResult, ConfigError> {
    params.validate()?;

    let (nx, ny) = FITNESS_RESOLUTION;
    let grid = DetectionGrid::over(mask.bounds(), nx, ny);

    let mut population: Vec<SensorLayout> = Vec::with_capacity(params.pop_size);
    if let Some(seed) = seed_coords {
        population.push(SensorLayout::from_points(seed));
    }
    while population.len() < params.pop_size {
        population.push(random_layout(params.num_recorders, mask, rng));
    }

    let mut history = Vec::with_capacity(params.generations);
    for gen in 0..params.generations {
        for ind in &mut population {
            ind.score = fitness::evaluate(ind, &grid, mask, gen, params);
        }
        population.sort_by_key(|ind| std::cmp::Reverse(OrderedFloat(ind.score)));
        history.push(population[0].score);
        debug!("gen {}: best fitness {:.4}", gen, population[0].score);
        on_progress((gen + 1) as f64 / params.generations as f64 * 100.);

        if gen % YIELD_INTERVAL == 0 && cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
            info!("cancelled at generation {}", gen);
            break;
        }

        let parent_pool = population.len().min(PARENT_POOL);
        let mut next = Vec::with_capacity(params.pop_size);
        // elitism: the best individual survives unchanged
        next.push(population[0].clone());
        while next.len() < params.pop_size {
            let p1 = rng.gen_range(0..parent_pool);
            let p2 = rng.gen_range(0..parent_pool);
            let mut child = crossover(&population[p1], &population[p2], params.num_recorders, mask, rng);
            repair(&mut child, mask, rng);
            mutate(&mut child, params, mask, rng);
            next.push(child);
        }
        population = next;
    }

    for ind in &mut population {
        ind.score = fitness::evaluate(ind, &grid, mask, params.generations - 1, params);
    }
    population.sort_by_key(|ind| std::cmp::Reverse(OrderedFloat(ind.score)));
    let best = population.swap_remove(0);
    info!("genetic run done: best fitness {:.4}", best.score);

    let level = effective_level(HIGH_CONFIDENCE_LEVEL, best.len());
    let map = probability_map(&best, mask, params.sd, level);
    Ok(GeneticResult { best, convergence: history, map })
}

fn random_layout<R: Rng + ?Sized>(n: usize, mask: &RegionMask, rng: &mut R) -> SensorLayout {
    let mut layout = SensorLayout::default();
    for _ in 0..n {
        layout.push(mask.sample_inside(rng));
    }
    layout
}

/// Blend crossover with a single mixing weight shared across all sensors of
/// the child. Seeded parents may be shorter than the configured recorder
/// count; missing coordinates fall back to the other parent, then to a fresh
/// sample.
fn crossover<R: Rng + ?Sized>(
    p1: &SensorLayout,
    p2: &SensorLayout,
    n: usize,
    mask: &RegionMask,
    rng: &mut R,
) -> SensorLayout {
    let w = rng.gen::<f64>();
    let mut child = SensorLayout::default();
    for i in 0..n {
        let p = match (p1.get(i), p2.get(i)) {
            (Some(a), Some(b)) => R2 {
                x: w * a.x + (1. - w) * b.x,
                y: w * a.y + (1. - w) * b.y,
            },
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => mask.sample_inside(rng),
        };
        child.push(p);
    }
    child
}

/// Resample any sensor the crossover left outside the region.
fn repair<R: Rng + ?Sized>(child: &mut SensorLayout, mask: &RegionMask, rng: &mut R) {
    for i in 0..child.len() {
        let p = child.get(i).unwrap();
        if !mask.contains(&p) {
            child.set(i, mask.sample_inside(rng));
        }
    }
}

/// Per-sensor perturbation, gated by `mutation_rate`: up to 20 bounded draws
/// in `±mutation_std` (clamped to the mask bounds) until one lands inside the
/// region, else a fresh sample.
fn mutate<R: Rng + ?Sized>(
    child: &mut SensorLayout,
    params: &OptimizationParams,
    mask: &RegionMask,
    rng: &mut R,
) {
    let bounds = *mask.bounds();
    for i in 0..child.len() {
        if rng.gen::<f64>() >= params.mutation_rate {
            continue;
        }
        let cur = child.get(i).unwrap();
        let mut placed = false;
        for _ in 0..MUTATION_ATTEMPTS {
            let candidate = bounds.clamp(R2 {
                x: cur.x + (rng.gen::<f64>() - 0.5) * 2. * params.mutation_std,
                y: cur.y + (rng.gen::<f64>() - 0.5) * 2. * params.mutation_std,
            });
            if mask.contains(&candidate) {
                child.set(i, candidate);
                placed = true;
                break;
            }
        }
        if !placed {
            child.set(i, mask.sample_inside(rng));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    fn quick_params() -> OptimizationParams {
        OptimizationParams {
            num_recorders: 4,
            sd: 10.,
            radius: 20.,
            generations: 50,
            pop_size: 20,
            ..Default::default()
        }
    }

    #[test]
    fn elitism_keeps_best_fitness_non_decreasing() {
        // The alpha ramp re-weights the objective between generations, so the
        // elitism invariant is only exact where the landscape is stationary:
        // with one recorder both coverage terms sit at the same confidence
        // level and the blend cancels out.
        let params = OptimizationParams {
            num_recorders: 1,
            generations: 50,
            pop_size: 20,
            ..Default::default()
        };
        let mask = RegionMask::semicircle(params.radius);
        let mut rng = StdRng::seed_from_u64(42);
        let result = run_genetic(&params, &mask, None, &mut rng, |_| {}, None).unwrap();
        assert_eq!(result.convergence.len(), 50);
        for w in result.convergence.windows(2) {
            assert!(
                w[1] >= w[0] - 1e-9,
                "best fitness regressed: {} -> {}",
                w[0],
                w[1]
            );
        }
    }

    #[test]
    fn identical_seeds_give_identical_runs() {
        let params = quick_params();
        let mask = RegionMask::semicircle(params.radius);
        let mut rng_a = StdRng::seed_from_u64(1234);
        let mut rng_b = StdRng::seed_from_u64(1234);
        let a = run_genetic(&params, &mask, None, &mut rng_a, |_| {}, None).unwrap();
        let b = run_genetic(&params, &mask, None, &mut rng_b, |_| {}, None).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.convergence, b.convergence);
    }

    #[test]
    fn single_recorder_completes() {
        let params = OptimizationParams {
            num_recorders: 1,
            generations: 10,
            pop_size: 8,
            ..Default::default()
        };
        let mask = RegionMask::semicircle(20.);
        let mut rng = StdRng::seed_from_u64(5);
        let result = run_genetic(&params, &mask, None, &mut rng, |_| {}, None).unwrap();
        assert_eq!(result.best.len(), 1);
        assert_eq!(result.map.level, 1);
        assert!(result.best.score.is_finite());
    }

    #[test]
    fn progress_is_monotone_and_reaches_100() {
        let params = OptimizationParams {
            generations: 20,
            pop_size: 6,
            num_recorders: 2,
            ..Default::default()
        };
        let mask = RegionMask::semicircle(20.);
        let mut rng = StdRng::seed_from_u64(9);
        let mut reported = Vec::new();
        run_genetic(&params, &mask, None, &mut rng, |pct| reported.push(pct), None).unwrap();
        assert_eq!(reported.len(), 20);
        for w in reported.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert_relative_eq!(*reported.last().unwrap(), 100.);
    }

    #[test]
    fn seed_coordinates_occupy_first_individual() {
        // a 2-point seed in a 3-recorder run: the seed individual keeps its
        // own length and everything stays inside the mask
        let params = OptimizationParams {
            num_recorders: 3,
            generations: 5,
            pop_size: 6,
            ..Default::default()
        };
        let mask = RegionMask::semicircle(20.);
        let seed = [R2 { x: -4., y: 3. }, R2 { x: 4., y: 3. }];
        let mut rng = StdRng::seed_from_u64(11);
        let result = run_genetic(&params, &mask, Some(&seed), &mut rng, |_| {}, None).unwrap();
        for p in result.best.points() {
            assert!(mask.contains(&p), "({}, {}) escaped the mask", p.x, p.y);
        }
    }

    #[test]
    fn cancellation_finalizes_early_with_a_result() {
        let params = quick_params();
        let mask = RegionMask::semicircle(params.radius);
        let token = CancelToken::new();
        token.cancel();
        let mut rng = StdRng::seed_from_u64(3);
        let result = run_genetic(&params, &mask, None, &mut rng, |_| {}, Some(&token)).unwrap();
        // cancelled at the first yield point: one generation recorded
        assert_eq!(result.convergence.len(), 1);
        assert!(result.best.score.is_finite());
    }

    #[test]
    fn rejects_invalid_configuration_before_running() {
        let params = OptimizationParams { num_recorders: 0, ..Default::default() };
        let mask = RegionMask::semicircle(20.);
        let mut rng = StdRng::seed_from_u64(0);
        let called = std::cell::Cell::new(false);
        let err = run_genetic(&params, &mask, None, &mut rng, |_| called.set(true), None);
        assert!(err.is_err());
        assert!(!called.get(), "no progress may be reported on config errors");
    }
}
