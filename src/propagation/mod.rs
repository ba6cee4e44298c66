mod error;
mod oracle;
mod sampler;

pub use error::PropagationError;
pub use oracle::{PropagationOracle, Sgp4Oracle, Sgp4Options};
pub use sampler::{
    sample, PositionSample, SampleGrid, DEFAULT_DURATION_HOURS, DEFAULT_INTERVAL_MINUTES,
};

#[cfg(test)]
pub(crate) use oracle::testing;
