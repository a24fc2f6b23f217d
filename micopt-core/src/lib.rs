#[cfg_attr(not(test), allow(unused_imports))]
#[macro_use]
extern crate approx;

pub mod detection;
pub mod geometry;
pub mod optimization;
pub mod region;

pub mod error;

// Re-export key types for external use
pub use detection::coincidence::{effective_level, p_at_least, p_exactly};
pub use detection::field::half_normal;
pub use error::{ConfigError, MaskError};
pub use geometry::r2::R2;
pub use optimization::genetic::run_genetic;
pub use optimization::gradient::run_gradient;
pub use optimization::layout::SensorLayout;
pub use optimization::params::{AlphaCurve, OptimizationParams};
pub use optimization::progress::CancelToken;
pub use optimization::result::{GeneticResult, GradientResult, OptimizationResult, ProbabilityMap};
pub use region::grid::DetectionGrid;
pub use region::mask::{Bounds, RegionMask};

/// Parse a log level string into LevelFilter.
pub fn parse_log_level(level: Option<&str>) -> log::LevelFilter {
    match level {
        Some("error") => log::LevelFilter::Error,
        Some("warn") => log::LevelFilter::Warn,
        Some("info") | Some("") | None => log::LevelFilter::Info,
        Some("debug") => log::LevelFilter::Debug,
        Some("trace") => log::LevelFilter::Trace,
        Some(level) => panic!("invalid log level: {}", level),
    }
}
