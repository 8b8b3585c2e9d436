use crate::error::{MotifError, Result};
use crate::types::{EncodedSequence, MotifPrior};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

/// Which motif starts are scored for a sequence of length `M` and motif width `w`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CandidateRange {
    /// Every valid start, `0..=M-w`
    #[default]
    Full,
    /// `0..M-w`, leaving out the start flush with the sequence end
    ExcludeLast,
}

impl CandidateRange {
    pub fn count(self, seq_len: usize, width: usize) -> usize {
        let span = seq_len.saturating_sub(width);
        match self {
            CandidateRange::Full => span + 1,
            CandidateRange::ExcludeLast => span,
        }
    }
}

/// Dirichlet-multinomial scoring of motif start positions.
///
/// Symbols outside the motif window of every sequence are pooled into one
/// background multiset, and symbols at motif column `t` of every window form
/// the multiset of column `t`. The weight of a candidate start `r` for a
/// target sequence is the product of the background marginal likelihood and
/// the `w` column marginal likelihoods, with the target's window placed at
/// `r` and every other window held at its current position:
///
/// ```text
/// bg(r)    = Γ(Σα) / Γ(K(M-w) + Σα) · Π_k Γ(c_bg[k] + α_k) / Γ(α_k)
/// col_t(r) = Γ(Σβ_t) / Γ(K + Σβ_t) · Π_k Γ(c_t[k] + β_tk) / Γ(β_tk)
/// p(r)     = bg(r) · Π_t col_t(r)
/// ```
///
/// Everything is evaluated as a sum of `ln Γ` terms.
#[derive(Debug, Clone)]
pub struct PositionEstimator<'a> {
    sequences: &'a [EncodedSequence],
    alphabet_len: usize,
    seq_len: usize,
    width: usize,
    alpha_seq: &'a [f64],
    alpha_motif: &'a MotifPrior,
    candidates: CandidateRange,
    // ln Γ(Σα) - ln Γ(K(M-w) + Σα) - Σ_k ln Γ(α_k)
    background_base: f64,
    // same for each motif column, with K in place of K(M-w)
    column_base: Vec<f64>,
}

impl<'a> PositionEstimator<'a> {
    /// Sets up the estimator for one run.
    ///
    /// # Errors
    /// * `MotifError::InvalidConfiguration` if the sequences are empty, differ in
    ///   length, are shorter than `width`, contain indices outside the alphabet,
    ///   or the priors do not match the alphabet size
    pub fn new(
        sequences: &'a [EncodedSequence],
        alphabet_len: usize,
        width: usize,
        alpha_seq: &'a [f64],
        alpha_motif: &'a MotifPrior,
        candidates: CandidateRange,
    ) -> Result<Self> {
        let seq_len = sequences
            .first()
            .map(Vec::len)
            .ok_or_else(|| MotifError::invalid_configuration("no sequences given"))?;

        if let Some(i) = sequences.iter().position(|s| s.len() != seq_len) {
            return Err(MotifError::invalid_configuration(format!(
                "sequence {} has length {}, expected {}",
                i,
                sequences[i].len(),
                seq_len
            )));
        }
        if width == 0 || width > seq_len {
            return Err(MotifError::invalid_configuration(format!(
                "motif width {} must be in 1..={}",
                width, seq_len
            )));
        }
        if candidates.count(seq_len, width) == 0 {
            return Err(MotifError::invalid_configuration(format!(
                "no candidate start for width {} in sequences of length {}",
                width, seq_len
            )));
        }
        if alpha_seq.len() != alphabet_len {
            return Err(MotifError::invalid_configuration(format!(
                "alpha_seq has {} entries, alphabet has {} symbols",
                alpha_seq.len(),
                alphabet_len
            )));
        }
        crate::types::check_concentration("alpha_seq", alpha_seq.iter().copied())?;
        alpha_motif.validate(alphabet_len, width)?;

        for (i, seq) in sequences.iter().enumerate() {
            if let Some(p) = seq.iter().position(|&s| s >= alphabet_len) {
                return Err(MotifError::invalid_configuration(format!(
                    "sequence {} holds symbol index {} at {}, alphabet has {} symbols",
                    i, seq[p], p, alphabet_len
                )));
            }
        }

        let k = alphabet_len as f64;
        let background_base = dirichlet_base(alpha_seq.iter().copied(), k * (seq_len - width) as f64);
        let column_base = (0..width)
            .map(|t| dirichlet_base(alpha_motif.column(t).iter().copied(), k))
            .collect();

        Ok(Self {
            sequences,
            alphabet_len,
            seq_len,
            width,
            alpha_seq,
            alpha_motif,
            candidates,
            background_base,
            column_base,
        })
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of entries returned by the weight functions
    pub fn candidate_count(&self) -> usize {
        self.candidates.count(self.seq_len, self.width)
    }

    /// Largest start a chain state may hold
    pub fn max_start(&self) -> usize {
        self.seq_len - self.width
    }

    /// Checks that `positions` holds one start in `0..=M-w` per sequence.
    ///
    /// # Errors
    /// * `MotifError::InvalidConfiguration` on a length mismatch or a start past `M-w`
    pub fn check_positions(&self, positions: &[usize]) -> Result<()> {
        if positions.len() != self.sequences.len() {
            return Err(MotifError::invalid_configuration(format!(
                "chain state holds {} starts for {} sequences",
                positions.len(),
                self.sequences.len()
            )));
        }
        if let Some(i) = positions.iter().position(|&p| p > self.max_start()) {
            return Err(MotifError::invalid_configuration(format!(
                "start {} of sequence {} is past the last valid start {}",
                positions[i],
                i,
                self.max_start()
            )));
        }
        Ok(())
    }

    /// Log marginal likelihood of a full assignment of motif starts.
    ///
    /// Equals the entry of [`PositionEstimator::log_position_weights`] at
    /// `positions[j]` for any sequence `j`.
    ///
    /// # Errors
    /// * `MotifError::InvalidConfiguration` if `positions` fails [`PositionEstimator::check_positions`]
    pub fn log_joint(&self, positions: &[usize]) -> Result<f64> {
        self.check_positions(positions)?;
        let mut background = vec![0usize; self.alphabet_len];
        let mut columns = Array2::<usize>::zeros((self.width, self.alphabet_len));
        for (seq, &start) in self.sequences.iter().zip(positions) {
            accumulate(seq, start, self.width, &mut background, &mut columns);
        }

        let mut log_p = self.background_base
            + background
                .iter()
                .zip(self.alpha_seq)
                .map(|(&c, &a)| ln_gamma(c as f64 + a))
                .sum::<f64>();
        for (t, column) in columns.rows().into_iter().enumerate() {
            let alpha = self.alpha_motif.column(t);
            log_p += self.column_base[t]
                + column
                    .iter()
                    .zip(alpha.iter())
                    .map(|(&c, &a)| ln_gamma(c as f64 + a))
                    .sum::<f64>();
        }
        Ok(log_p)
    }

    /// Log of the unnormalized weight of every candidate start for `target`.
    ///
    /// `positions[target]` is ignored; every other entry is the current motif
    /// start of that sequence.
    ///
    /// # Panics
    /// If `positions` does not pass [`PositionEstimator::check_positions`].
    pub fn log_position_weights(&self, positions: &[usize], target: usize) -> Vec<f64> {
        let (background, columns) = self.counts_without(positions, target);
        let seq = &self.sequences[target];

        let mut target_counts = vec![0usize; self.alphabet_len];
        for &s in seq {
            target_counts[s] += 1;
        }

        (0..self.candidate_count())
            .into_par_iter()
            .map(|r| {
                let window = &seq[r..r + self.width];

                let mut bg = background.clone();
                for (k, c) in bg.iter_mut().enumerate() {
                    *c += target_counts[k];
                }
                for &s in window {
                    bg[s] -= 1;
                }

                let mut log_p = self.background_base
                    + bg.iter()
                        .zip(self.alpha_seq)
                        .map(|(&c, &a)| ln_gamma(c as f64 + a))
                        .sum::<f64>();

                for (t, &s) in window.iter().enumerate() {
                    let alpha = self.alpha_motif.column(t);
                    let column = columns.row(t);
                    log_p += self.column_base[t]
                        + (0..self.alphabet_len)
                            .map(|k| {
                                let c = column[k] + usize::from(k == s);
                                ln_gamma(c as f64 + alpha[k])
                            })
                            .sum::<f64>();
                }

                log_p
            })
            .collect()
    }

    /// Unnormalized weight of every candidate start for `target`.
    ///
    /// Exponentiates [`PositionEstimator::log_position_weights`]. Entries may
    /// underflow to zero for long sequences; samplers should normalize the
    /// log weights instead.
    pub fn position_weights(&self, positions: &[usize], target: usize) -> Vec<f64> {
        self.log_position_weights(positions, target)
            .into_iter()
            .map(f64::exp)
            .collect()
    }

    /// Background and per-column symbol counts over every sequence but `target`
    fn counts_without(&self, positions: &[usize], target: usize) -> (Vec<usize>, Array2<usize>) {
        let mut background = vec![0usize; self.alphabet_len];
        let mut columns = Array2::<usize>::zeros((self.width, self.alphabet_len));

        for (i, seq) in self.sequences.iter().enumerate() {
            if i == target {
                continue;
            }
            accumulate(seq, positions[i], self.width, &mut background, &mut columns);
        }

        (background, columns)
    }
}

/// Adds one sequence's symbols to the background and motif column counts
fn accumulate(
    seq: &[usize],
    start: usize,
    width: usize,
    background: &mut [usize],
    columns: &mut Array2<usize>,
) {
    for (idx, &s) in seq.iter().enumerate() {
        if idx >= start && idx < start + width {
            columns[[idx - start, s]] += 1;
        } else {
            background[s] += 1;
        }
    }
}

/// `ln Γ(Σα) - ln Γ(extra + Σα) - Σ ln Γ(α_k)`
fn dirichlet_base(alpha: impl Iterator<Item = f64> + Clone, extra: f64) -> f64 {
    let total: f64 = alpha.clone().sum();
    ln_gamma(total) - ln_gamma(extra + total) - alpha.map(ln_gamma).sum::<f64>()
}
