//! Synthetic sequence sets with a planted motif, for evaluating the sampler.

use crate::error::{MotifError, Result};
use crate::sampling::sample_categorical;
use crate::types::{Alphabet, EncodedSequence, MotifPrior, Positions};
use log::debug;
use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::Dirichlet;
use serde::{Deserialize, Serialize};

/// Shape of a generated data set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of sequences `N`
    pub num_sequences: usize,
    /// Length `M` of every sequence
    pub seq_len: usize,
    /// Width `w` of the planted motif
    pub motif_width: usize,
}

impl GeneratorConfig {
    pub fn new(num_sequences: usize, seq_len: usize, motif_width: usize) -> Self {
        Self {
            num_sequences,
            seq_len,
            motif_width,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_sequences == 0 {
            return Err(MotifError::invalid_parameter(
                "num_sequences",
                self.num_sequences,
                "at least one sequence is required",
            ));
        }
        if self.motif_width == 0 || self.motif_width > self.seq_len {
            return Err(MotifError::invalid_parameter(
                "motif_width",
                self.motif_width,
                format!("must be in 1..={}", self.seq_len),
            ));
        }
        Ok(())
    }
}

/// Generated sequences together with the truth they were built from
#[derive(Debug, Clone)]
pub struct GeneratedDataset {
    pub sequences: Vec<String>,
    pub encoded: Vec<EncodedSequence>,
    /// Planted motif start of every sequence
    pub positions: Positions,
    /// Background symbol distribution drawn from Dir(alpha_seq)
    pub background: Vec<f64>,
    /// Symbol distribution of each motif column drawn from Dir(alpha_motif)
    pub motif: Vec<Vec<f64>>,
}

/// Generates `N` sequences of length `M`, each holding one motif occurrence.
///
/// One background distribution is drawn from `Dir(alpha_seq)` and one
/// distribution per motif column from `Dir(alpha_motif)`. Every symbol is
/// first drawn from the background, then the window starting at a uniform
/// position in `0..=M-w` is overwritten with symbols drawn column by column
/// from the motif distributions.
///
/// # Errors
/// * `MotifError::InvalidParameter` for an empty or inconsistent shape
/// * `MotifError::InvalidConfiguration` if a prior does not match the alphabet
pub fn generate_sequences<R>(
    alphabet: &Alphabet,
    alpha_seq: &[f64],
    alpha_motif: &MotifPrior,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<GeneratedDataset>
where
    R: Rng + ?Sized,
{
    config.validate()?;
    if alpha_seq.len() != alphabet.len() {
        return Err(MotifError::invalid_configuration(format!(
            "alpha_seq has {} entries, alphabet has {} symbols",
            alpha_seq.len(),
            alphabet.len()
        )));
    }
    crate::types::check_concentration("alpha_seq", alpha_seq.iter().copied())?;
    alpha_motif.validate(alphabet.len(), config.motif_width)?;

    let background = draw_dirichlet(alpha_seq, rng)?;
    let motif = (0..config.motif_width)
        .map(|t| draw_dirichlet(&alpha_motif.column(t).to_vec(), rng))
        .collect::<Result<Vec<_>>>()?;

    let symbols: Vec<usize> = (0..alphabet.len()).collect();
    let mut encoded = (0..config.num_sequences)
        .map(|_| {
            (0..config.seq_len)
                .map(|_| sample_categorical(&symbols, &background, rng))
                .collect::<Result<EncodedSequence>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let max_start = config.seq_len - config.motif_width;
    let positions: Positions = (0..config.num_sequences)
        .map(|_| rng.gen_range(0..=max_start))
        .collect();

    for (seq, &start) in encoded.iter_mut().zip(&positions) {
        for (t, column) in motif.iter().enumerate() {
            seq[start + t] = sample_categorical(&symbols, column, rng)?;
        }
    }

    let sequences: Vec<String> = encoded.iter().map(|s| alphabet.decode(s)).collect();
    debug!("Planted motif starts: {:?}", positions);

    Ok(GeneratedDataset {
        sequences,
        encoded,
        positions,
        background,
        motif,
    })
}

fn draw_dirichlet<R: Rng + ?Sized>(alpha: &[f64], rng: &mut R) -> Result<Vec<f64>> {
    let dirichlet = Dirichlet::new(alpha)
        .map_err(|e| MotifError::invalid_configuration(format!("Dirichlet prior: {}", e)))?;
    Ok(dirichlet.sample(rng))
}
