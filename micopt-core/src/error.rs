#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("num_recorders must be at least 1")]
    NoRecorders,

    #[error("sd must be positive, got {0}")]
    NonPositiveSigma(f64),

    #[error("radius must be positive, got {0}")]
    NonPositiveRadius(f64),

    #[error("pop_size must be at least 2, got {0}")]
    PopulationTooSmall(usize),

    #[error("generations must be at least 1")]
    NoGenerations,

    #[error("gradient_steps must be at least 1")]
    NoGradientSteps,

    #[error("gradient_learning_rate must be positive, got {0}")]
    NonPositiveLearningRate(f64),

    #[error("mutation_rate must be within 0..=1, got {0}")]
    MutationRateOutOfRange(f64),

    #[error("{field} must be non-negative, got {value}")]
    NegativeField { field: &'static str, value: f64 },
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum MaskError {
    #[error("pixel buffer has {len} bytes, expected {expected} for {width}x{height} RGBA")]
    PixelBufferSize {
        len: usize,
        expected: usize,
        width: usize,
        height: usize,
    },

    #[error("physical {dim} must be positive, got {value}")]
    NonPositiveDimension { dim: &'static str, value: f64 },
}
