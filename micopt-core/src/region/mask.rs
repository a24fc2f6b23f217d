//! Region membership: a rasterized boolean mask over a physical coordinate
//! box, built either from the default semicircle or from an uploaded image's
//! RGBA pixels.

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::MaskError;
use crate::geometry::r2::R2;

/// Internal raster resolution of generated semicircle masks. Independent of
/// the fitness and visualization grid resolutions.
pub const SEMICIRCLE_RESOLUTION: usize = 200;

/// Rejection-sampling attempts before `sample_inside` falls back to a raster scan.
const SAMPLE_ATTEMPTS: usize = 100;

/// Physical extent of a mask's raster, in km.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
    /// Clamp a point into the box (used by GA mutation draws).
    pub fn clamp(&self, p: R2<f64>) -> R2<f64> {
        R2 {
            x: p.x.clamp(self.x_min, self.x_max),
            y: p.y.clamp(self.y_min, self.y_max),
        }
    }
}

/// Boolean membership test over a 2-D physical region, backed by a raster grid.
///
/// Row 0 of the raster corresponds to the bottom of the physical region
/// (`y_min`); image-derived masks are flipped on construction to honor this.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionMask {
    cells: Vec<bool>,
    width: usize,
    height: usize,
    bounds: Bounds,
}

impl RegionMask {
    /// Rasterize the default semicircular region of the given radius:
    /// `sqrt(x² + y²) <= radius` with `y >= 0`, spanning
    /// `[-radius, radius] x [0, radius]`.
    pub fn semicircle(radius: f64) -> RegionMask {
        let width = SEMICIRCLE_RESOLUTION;
        let height = SEMICIRCLE_RESOLUTION;
        let bounds = Bounds {
            x_min: -radius,
            x_max: radius,
            y_min: 0.,
            y_max: radius,
        };
        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height {
            let y = bounds.y_min + (row as f64 / height as f64) * bounds.height();
            for col in 0..width {
                let x = bounds.x_min + (col as f64 / width as f64) * bounds.width();
                cells.push(x.hypot(y) <= radius && y >= 0.);
            }
        }
        RegionMask { cells, width, height, bounds }
    }

    /// Build a mask from an RGBA pixel buffer. A pixel is inside iff its mean
    /// channel brightness exceeds mid-gray. Pixel row 0 (image top) maps to
    /// the top of the physical region, so rows are flipped into raster order.
    pub fn from_image(
        rgba: &[u8],
        width: usize,
        height: usize,
        width_km: f64,
        height_km: f64,
    ) -> Result<RegionMask, MaskError> {
        let expected = width * height * 4;
        if rgba.len() != expected {
            return Err(MaskError::PixelBufferSize { len: rgba.len(), expected, width, height });
        }
        if width_km <= 0. {
            return Err(MaskError::NonPositiveDimension { dim: "width_km", value: width_km });
        }
        if height_km <= 0. {
            return Err(MaskError::NonPositiveDimension { dim: "height_km", value: height_km });
        }
        let mut cells = vec![false; width * height];
        for row in 0..height {
            // Raster row 0 = physical y_min = bottom of the image.
            let src_row = height - 1 - row;
            for col in 0..width {
                let i = (src_row * width + col) * 4;
                let sum = rgba[i] as u32 + rgba[i + 1] as u32 + rgba[i + 2] as u32;
                // mean brightness > 128, integer-exact
                cells[row * width + col] = sum > 3 * 128;
            }
        }
        let bounds = Bounds {
            x_min: -width_km / 2.,
            x_max: width_km / 2.,
            y_min: 0.,
            y_max: height_km,
        };
        Ok(RegionMask { cells, width, height, bounds })
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Number of inside cells; 0 means the mask is degenerate.
    pub fn inside_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Membership test for a physical point. Points outside the raster extent
    /// are outside the region.
    pub fn contains(&self, p: &R2<f64>) -> bool {
        let (w, h) = (self.bounds.width(), self.bounds.height());
        if w <= 0. || h <= 0. {
            return false;
        }
        let ix = ((p.x - self.bounds.x_min) / w * self.width as f64).floor();
        let iy = ((p.y - self.bounds.y_min) / h * self.height as f64).floor();
        if ix < 0. || iy < 0. || ix >= self.width as f64 || iy >= self.height as f64 {
            return false;
        }
        self.cells[iy as usize * self.width + ix as usize]
    }

    /// Draw a point uniformly inside the region.
    ///
    /// Rejection-samples the bounding box up to 100 times, then falls back to
    /// the first inside raster cell, then to a fixed point just above the
    /// baseline. Callers rely on this never failing, whatever the mask.
    pub fn sample_inside<R: Rng + ?Sized>(&self, rng: &mut R) -> R2<f64> {
        for _ in 0..SAMPLE_ATTEMPTS {
            let p = R2 {
                x: self.bounds.x_min + rng.gen::<f64>() * self.bounds.width(),
                y: self.bounds.y_min + rng.gen::<f64>() * self.bounds.height(),
            };
            if self.contains(&p) {
                return p;
            }
        }
        for (i, &inside) in self.cells.iter().enumerate() {
            if inside {
                return self.cell_origin(i);
            }
        }
        warn!("mask has no inside cells; returning fixed fallback point");
        R2 { x: 0., y: 1. }
    }

    /// Physical coordinates of a raster cell's low corner.
    fn cell_origin(&self, idx: usize) -> R2<f64> {
        let col = idx % self.width;
        let row = idx / self.width;
        R2 {
            x: self.bounds.x_min + (col as f64 / self.width as f64) * self.bounds.width(),
            y: self.bounds.y_min + (row as f64 / self.height as f64) * self.bounds.height(),
        }
    }
}
