//! Ray sources and the random samplers feeding them.
//!
//! Every source here implements [`refract::RaySource`], and draws all of it's
//! randomness from the generator it is handed, so that scenes stay reproducible.

use refract_json::JsonError;
use thiserror::Error;

pub use rand;

mod sampler;
mod sources;

pub use sampler::*;
pub use sources::*;

/// Errors raised while building a source, before any simulation runs.
#[derive(Error, Debug)]
pub enum SourceError {
    /// A sampling table could not be loaded.
    #[error("could not load sampling table: {0}")]
    Table(#[from] JsonError),

    /// A sampling table has a different number of values and probabilities.
    #[error("sampling table has {values} values but {probabilities} probabilities")]
    LengthMismatch { values: usize, probabilities: usize },

    /// Probabilities are empty, negative, or all zero.
    #[error("invalid probabilities: {0}")]
    Weights(#[from] rand_distr::WeightedError),

    /// A normal distribution with unusable parameters.
    #[error("invalid distribution: mean {mean}, standard deviation {std_dev}")]
    Distribution { mean: f64, std_dev: f64 },
}
