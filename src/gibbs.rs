use crate::error::{MotifError, Result};
use crate::estimator::{CandidateRange, PositionEstimator};
use crate::sampling::sample_index;
use crate::types::{Alphabet, EncodedSequence, MotifPrior, Positions, SampleHistory};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Settings of one Gibbs chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Motif width `w`
    pub motif_width: usize,
    /// Number of sweeps
    pub iterations: usize,
    /// First sweep kept for the estimate (burn-in cutoff)
    pub min_step: usize,
    /// Keep every `step_length`-th sweep after burn-in (thinning)
    pub step_length: usize,
    #[serde(default)]
    pub candidates: CandidateRange,
}

impl SamplerConfig {
    /// Default chain length: 200 sweeps, burn-in of 100, every 10th sweep kept
    pub fn new(motif_width: usize) -> Self {
        Self {
            motif_width,
            iterations: 200,
            min_step: 100,
            step_length: 10,
            candidates: CandidateRange::Full,
        }
    }

    pub fn with_schedule(mut self, iterations: usize, min_step: usize, step_length: usize) -> Self {
        self.iterations = iterations;
        self.min_step = min_step;
        self.step_length = step_length;
        self
    }

    pub fn with_candidates(mut self, candidates: CandidateRange) -> Self {
        self.candidates = candidates;
        self
    }

    /// Checks the sweep schedule.
    ///
    /// # Errors
    /// * `MotifError::InvalidConfiguration` if the width, iteration count, burn-in
    ///   or thinning interval is zero, or burn-in is not below the iteration count
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("motif_width", self.motif_width),
            ("iterations", self.iterations),
            ("min_step", self.min_step),
            ("step_length", self.step_length),
        ] {
            if value == 0 {
                return Err(MotifError::invalid_configuration(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        if self.min_step >= self.iterations {
            return Err(MotifError::invalid_configuration(format!(
                "min_step {} must be below iterations {}",
                self.min_step, self.iterations
            )));
        }
        Ok(())
    }

    /// Sweep indices whose states vote on the estimate
    pub fn retained_sweeps(&self) -> impl Iterator<Item = usize> {
        (self.min_step..self.iterations).step_by(self.step_length.max(1))
    }
}

/// Current motif start of every sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    positions: Positions,
}

impl ChainState {
    /// Draws every start uniformly from `0..=max_start`.
    pub fn random<R: Rng + ?Sized>(num_sequences: usize, max_start: usize, rng: &mut R) -> Self {
        let positions = (0..num_sequences)
            .map(|_| rng.gen_range(0..=max_start))
            .collect();
        Self { positions }
    }

    pub fn from_positions(positions: Positions) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn into_positions(self) -> Positions {
        self.positions
    }

    fn set(&mut self, sequence: usize, start: usize) {
        self.positions[sequence] = start;
    }
}

/// Outcome of a full chain
#[derive(Debug, Clone)]
pub struct ChainRun {
    /// Most frequent retained start per sequence
    pub estimate: Positions,
    /// State after each sweep
    pub history: SampleHistory,
    /// Indices into `history` that voted on `estimate`
    pub retained: Vec<usize>,
}

impl ChainRun {
    pub fn retained_samples(&self) -> impl Iterator<Item = &Positions> {
        self.retained.iter().map(|&i| &self.history[i])
    }
}

/// Collapsed Gibbs sampler over motif start positions
pub struct GibbsSampler<'a> {
    estimator: PositionEstimator<'a>,
    config: &'a SamplerConfig,
}

impl<'a> GibbsSampler<'a> {
    /// Validates every input before any sampling happens.
    pub fn new(
        sequences: &'a [EncodedSequence],
        alphabet_len: usize,
        alpha_seq: &'a [f64],
        alpha_motif: &'a MotifPrior,
        config: &'a SamplerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let estimator = PositionEstimator::new(
            sequences,
            alphabet_len,
            config.motif_width,
            alpha_seq,
            alpha_motif,
            config.candidates,
        )?;
        Ok(Self { estimator, config })
    }

    pub fn estimator(&self) -> &PositionEstimator<'a> {
        &self.estimator
    }

    /// Uniformly random starting state
    pub fn initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> ChainState {
        ChainState::random(
            self.estimator.num_sequences(),
            self.estimator.max_start(),
            rng,
        )
    }

    /// Resamples every sequence's start once, in index order.
    ///
    /// Each update is written to `state` before the next sequence is scored.
    ///
    /// # Errors
    /// * `MotifError::InvalidConfiguration` if `state` does not hold one start
    ///   in `0..=M-w` per sequence
    /// * `MotifError::NumericalInstability` if the weights of a sequence cannot
    ///   be normalized
    pub fn sweep<R: Rng + ?Sized>(
        &self,
        state: &mut ChainState,
        sweep: usize,
        rng: &mut R,
    ) -> Result<()> {
        self.estimator.check_positions(state.positions())?;
        for j in 0..self.estimator.num_sequences() {
            let log_weights = self.estimator.log_position_weights(state.positions(), j);
            let probabilities = normalize_log_weights(&log_weights)
                .map_err(|message| MotifError::numerical_instability(sweep, j, message))?;
            let start = sample_index(&probabilities, rng)?;
            state.set(j, start);
        }
        Ok(())
    }

    /// Runs all sweeps from a random state and extracts the estimate.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ChainRun> {
        let mut state = self.initial_state(rng);
        self.run_from(&mut state, rng)
    }

    /// Runs all sweeps starting from `state`, which is left at the last sweep.
    pub fn run_from<R: Rng + ?Sized>(&self, state: &mut ChainState, rng: &mut R) -> Result<ChainRun> {
        self.estimator.check_positions(state.positions())?;
        let config = self.config;
        info!(
            "Sampling {} sequences of length {} for a width {} motif: {} sweeps, burn-in {}, thinning {}",
            self.estimator.num_sequences(),
            self.estimator.seq_len(),
            config.motif_width,
            config.iterations,
            config.min_step,
            config.step_length
        );

        let mut history: SampleHistory = Vec::with_capacity(config.iterations);
        for sweep in 0..config.iterations {
            self.sweep(state, sweep, rng)?;
            debug!("sweep {}\t{:?}", sweep, state.positions());
            history.push(state.positions().to_vec());
        }

        let retained: Vec<usize> = config.retained_sweeps().collect();
        if retained.len() == 1 {
            warn!("Only one sweep retained; the estimate is a single chain state");
        }

        let estimate = (0..self.estimator.num_sequences())
            .map(|i| {
                most_frequent(retained.iter().map(|&s| history[s][i])).ok_or_else(|| {
                    MotifError::invalid_configuration("no sweep retained for the estimate")
                })
            })
            .collect::<Result<Positions>>()?;

        info!(
            "Estimated starts from {} retained sweeps: {:?}",
            retained.len(),
            estimate
        );

        Ok(ChainRun {
            estimate,
            history,
            retained,
        })
    }
}

/// Runs a chain over plain sequences and returns the full run.
///
/// # Errors
/// * `MotifError::InvalidSequence` if a sequence holds a symbol outside `alphabet`
/// * `MotifError::InvalidConfiguration` for size, prior or schedule mismatches
/// * `MotifError::NumericalInstability` if a sweep cannot normalize its weights
pub fn run_chain<S, R>(
    alphabet: &Alphabet,
    sequences: &[S],
    alpha_seq: &[f64],
    alpha_motif: &MotifPrior,
    config: &SamplerConfig,
    rng: &mut R,
) -> Result<ChainRun>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let encoded = sequences
        .iter()
        .enumerate()
        .map(|(i, s)| alphabet.encode(i, s.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    GibbsSampler::new(&encoded, alphabet.len(), alpha_seq, alpha_motif, config)?.run(rng)
}

/// Most probable motif start in every sequence.
///
/// See [`run_chain`] for the errors.
///
/// # Example
/// ```
/// use gibbs_motif::gibbs::{estimate_positions, SamplerConfig};
/// use gibbs_motif::sampling::seeded_rng;
/// use gibbs_motif::types::{Alphabet, MotifPrior};
///
/// let sequences = ["TTTTGGGGTTTT", "GGGGTTTTTTTT", "TTTTTTTTGGGG"];
/// let config = SamplerConfig::new(4).with_schedule(50, 25, 5);
/// let estimate = estimate_positions(
///     &Alphabet::dna(),
///     &sequences,
///     &[1.0, 1.0, 1.0, 1.0],
///     &MotifPrior::shared(&[1.0, 1.0, 8.0, 1.0]),
///     &config,
///     &mut seeded_rng(1),
/// )
/// .unwrap();
/// assert_eq!(estimate.len(), 3);
/// assert!(estimate.iter().all(|&p| p <= 8));
/// ```
pub fn estimate_positions<S, R>(
    alphabet: &Alphabet,
    sequences: &[S],
    alpha_seq: &[f64],
    alpha_motif: &MotifPrior,
    config: &SamplerConfig,
    rng: &mut R,
) -> Result<Positions>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    run_chain(alphabet, sequences, alpha_seq, alpha_motif, config, rng).map(|run| run.estimate)
}

/// Turns log weights into probabilities by shifting by the maximum.
fn normalize_log_weights(log_weights: &[f64]) -> std::result::Result<Vec<f64>, String> {
    if let Some(bad) = log_weights.iter().find(|w| w.is_nan() || **w == f64::INFINITY) {
        return Err(format!("log weight {} is not usable", bad));
    }
    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Err("every candidate has zero weight".to_string());
    }

    let weights: Vec<f64> = log_weights.iter().map(|w| (w - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(format!("normalizing sum is {}", total));
    }

    Ok(weights.into_iter().map(|w| w / total).collect())
}

/// Value with the highest count; ties go to the value seen first.
fn most_frequent(values: impl IntoIterator<Item = usize>) -> Option<usize> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for v in values {
        match counts.iter_mut().find(|(value, _)| *value == v) {
            Some((_, count)) => *count += 1,
            None => counts.push((v, 1)),
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
