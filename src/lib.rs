//! Bayesian discovery of fixed-width motifs with a collapsed Gibbs sampler

pub mod error;
pub mod estimator;
pub mod fasta;
pub mod generator;
pub mod gibbs;
pub mod report;
pub mod sampling;
pub mod types;

pub use error::{MotifError, Result};
pub use gibbs::{estimate_positions, run_chain, SamplerConfig};
pub use sampling::sample_categorical;
