//! Sample grids used to integrate coverage over a region. Grid resolution is
//! independent of the mask raster resolution; spans always derive from the
//! mask bounds.

use serde::{Deserialize, Serialize};

use super::mask::Bounds;

/// Axis coordinates of a rectangular sample grid (endpoints inclusive).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionGrid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl DetectionGrid {
    pub fn over(bounds: &Bounds, nx: usize, ny: usize) -> DetectionGrid {
        DetectionGrid {
            xs: linspace(bounds.x_min, bounds.x_max, nx),
            ys: linspace(bounds.y_min, bounds.y_max, ny),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.xs.len() * self.ys.len()
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![lo];
    }
    (0..n).map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64).collect()
}
