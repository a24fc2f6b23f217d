//! Final result structures consumed by the (external) visualization layer,
//! plus the rendering-ready probability map builder.

use serde::{Deserialize, Serialize};

use crate::detection::coincidence::p_at_least;
use crate::detection::field::sensor_probs_into;
use crate::geometry::r2::R2;
use crate::optimization::layout::SensorLayout;
use crate::region::grid::DetectionGrid;
use crate::region::mask::{Bounds, RegionMask};

/// Visualization grid resolution (x, y); finer than the solvers' internal
/// optimization grids.
pub const VIS_RESOLUTION: (usize, usize) = (240, 120);

/// 2-D grid of P(at least `level` detections) values for the winning layout.
/// Cells outside the region are 0.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityMap {
    pub grid_x: Vec<f64>,
    pub grid_y: Vec<f64>,
    /// Row-major: `values[yi][xi]` belongs to `(grid_x[xi], grid_y[yi])`.
    pub values: Vec<Vec<f64>>,
    /// Confidence level the map was computed at.
    pub level: usize,
    /// Physical extent of the region the map covers.
    pub bounds: Bounds,
}

impl ProbabilityMap {
    /// Mean probability over in-mask cells; 0 for a degenerate mask.
    pub fn mean_inside(&self, mask: &RegionMask) -> f64 {
        let mut sum = 0.;
        let mut count = 0usize;
        for (yi, &gy) in self.grid_y.iter().enumerate() {
            for (xi, &gx) in self.grid_x.iter().enumerate() {
                if mask.contains(&R2 { x: gx, y: gy }) {
                    sum += self.values[yi][xi];
                    count += 1;
                }
            }
        }
        if count > 0 {
            sum / count as f64
        } else {
            0.
        }
    }
}

/// Build the visualization map for a layout on a fresh grid over the mask
/// bounds.
pub fn probability_map(
    layout: &SensorLayout,
    mask: &RegionMask,
    sigma: f64,
    level: usize,
) -> ProbabilityMap {
    let (nx, ny) = VIS_RESOLUTION;
    let grid = DetectionGrid::over(mask.bounds(), nx, ny);
    let mut probs = Vec::with_capacity(layout.len());
    let values = grid
        .ys
        .iter()
        .map(|&gy| {
            grid.xs
                .iter()
                .map(|&gx| {
                    if !mask.contains(&R2 { x: gx, y: gy }) {
                        return 0.;
                    }
                    sensor_probs_into(&layout.xs, &layout.ys, gx, gy, sigma, &mut probs);
                    p_at_least(&probs, level)
                })
                .collect()
        })
        .collect();
    ProbabilityMap {
        grid_x: grid.xs,
        grid_y: grid.ys,
        values,
        level,
        bounds: *mask.bounds(),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneticResult {
    /// Winning layout; `score` is its GA fitness.
    pub best: SensorLayout,
    /// Best fitness per generation (non-decreasing under elitism).
    pub convergence: Vec<f64>,
    pub map: ProbabilityMap,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientResult {
    /// Final layout; `score` is the mean in-mask probability at the
    /// displayed confidence level.
    pub best: SensorLayout,
    /// Mean in-mask coverage (ascent level) per step.
    pub convergence: Vec<f64>,
    pub map: ProbabilityMap,
}

/// Tagged result union; the tag doubles as the algorithm discriminant in the
/// serialized form.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum OptimizationResult {
    Genetic(GeneticResult),
    Gradient(GradientResult),
}

impl OptimizationResult {
    pub fn best(&self) -> &SensorLayout {
        match self {
            OptimizationResult::Genetic(r) => &r.best,
            OptimizationResult::Gradient(r) => &r.best,
        }
    }

    pub fn convergence(&self) -> &[f64] {
        match self {
            OptimizationResult::Genetic(r) => &r.convergence,
            OptimizationResult::Gradient(r) => &r.convergence,
        }
    }

    pub fn map(&self) -> &ProbabilityMap {
        match self {
            OptimizationResult::Genetic(r) => &r.map,
            OptimizationResult::Gradient(r) => &r.map,
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            OptimizationResult::Genetic(_) => "genetic",
            OptimizationResult::Gradient(_) => "gradient",
        }
    }
}
