use crate::error::{MotifError, Result};
use crate::generator::{generate_sequences, GeneratorConfig};
use crate::gibbs::{GibbsSampler, SamplerConfig};
use crate::types::{Alphabet, MotifPrior, SampleHistory};
use log::info;
use polars::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fraction of sequences whose estimated start equals the planted one.
///
/// Returns 0 for empty input.
pub fn accuracy(truth: &[usize], estimate: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth
        .iter()
        .zip(estimate)
        .filter(|(t, e)| t == e)
        .count();
    hits as f64 / truth.len() as f64
}

/// Chain trace as a table: a "sweep" column, then one "seq<i>" column per sequence
pub fn trace_frame(history: &SampleHistory) -> Result<DataFrame> {
    let num_sequences = history.first().map_or(0, Vec::len);
    let mut columns = Vec::with_capacity(num_sequences + 1);
    columns.push(Column::new(
        "sweep".into(),
        (0..history.len() as u64).collect::<Vec<u64>>(),
    ));
    for i in 0..num_sequences {
        let starts: Vec<u64> = history.iter().map(|state| state[i] as u64).collect();
        columns.push(Column::new(format!("seq{}", i).into(), starts));
    }

    DataFrame::new(columns).map_err(|e| MotifError::DataError(e.to_string()))
}

/// Mean accuracy of repeated runs on freshly generated data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub num_sequences: usize,
    pub seq_len: usize,
    pub motif_width: usize,
    pub runs: usize,
    pub accuracy: f64,
}

/// Generates `runs` data sets of the given shape, samples each one and
/// averages the accuracy.
///
/// `sampler.motif_width` is overridden by the generator's width.
pub fn benchmark_accuracy<R: Rng + ?Sized>(
    alphabet: &Alphabet,
    alpha_seq: &[f64],
    alpha_motif: &MotifPrior,
    generator: &GeneratorConfig,
    sampler: &SamplerConfig,
    runs: usize,
    rng: &mut R,
) -> Result<BenchmarkRecord> {
    if runs == 0 {
        return Err(MotifError::invalid_parameter("runs", runs, "must be positive"));
    }
    let config = SamplerConfig {
        motif_width: generator.motif_width,
        ..sampler.clone()
    };

    let mut total = 0.0;
    for _ in 0..runs {
        let dataset = generate_sequences(alphabet, alpha_seq, alpha_motif, generator, rng)?;
        let run = GibbsSampler::new(&dataset.encoded, alphabet.len(), alpha_seq, alpha_motif, &config)?
            .run(rng)?;
        total += accuracy(&dataset.positions, &run.estimate);
    }

    let record = BenchmarkRecord {
        num_sequences: generator.num_sequences,
        seq_len: generator.seq_len,
        motif_width: generator.motif_width,
        runs,
        accuracy: total / runs as f64,
    };
    info!(
        "N={} M={} w={}: accuracy {:.3} over {} runs",
        record.num_sequences, record.seq_len, record.motif_width, record.accuracy, runs
    );
    Ok(record)
}

/// Benchmark records as a table sorted by sequence count, then length, then width
pub fn benchmark_frame(records: &[BenchmarkRecord]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new(
            "num_sequences".into(),
            records.iter().map(|r| r.num_sequences as u64).collect::<Vec<u64>>(),
        ),
        Column::new(
            "seq_len".into(),
            records.iter().map(|r| r.seq_len as u64).collect::<Vec<u64>>(),
        ),
        Column::new(
            "motif_width".into(),
            records.iter().map(|r| r.motif_width as u64).collect::<Vec<u64>>(),
        ),
        Column::new(
            "runs".into(),
            records.iter().map(|r| r.runs as u64).collect::<Vec<u64>>(),
        ),
        Column::new(
            "accuracy".into(),
            records.iter().map(|r| r.accuracy).collect::<Vec<f64>>(),
        ),
    ])
    .map_err(|e| MotifError::DataError(e.to_string()))?;

    df.lazy()
        .sort(
            ["num_sequences", "seq_len", "motif_width"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()
        .map_err(|e| MotifError::DataError(e.to_string()))
}
