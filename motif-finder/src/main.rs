use clap::{Args, Parser, Subcommand};
use gibbs_motif::estimator::CandidateRange;
use gibbs_motif::fasta::{dataset_frame, planted_starts, read_fasta, sequences_from_frame, write_fasta};
use gibbs_motif::generator::{generate_sequences, GeneratorConfig};
use gibbs_motif::report::{accuracy, benchmark_accuracy, benchmark_frame, trace_frame};
use gibbs_motif::sampling::seeded_rng;
use gibbs_motif::types::{Alphabet, MotifPrior};
use gibbs_motif::{run_chain, MotifError, SamplerConfig};
use log::info;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Motif(#[from] MotifError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Parser, Debug)]
#[command(
    name = "motif-finder",
    about = "Locates a fixed-width motif in every sequence of a set with a collapsed Gibbs sampler",
    long_about = "Estimates the start of an unknown, fixed-width motif shared by a set of equal-length \
                  sequences. Background and motif symbols follow Dirichlet-multinomial models; a Gibbs \
                  chain resamples each sequence's motif start in turn and the most frequent start after \
                  burn-in and thinning is reported.",
    version,
    after_help = "Example usage:\n    \
                  motif-finder simulate planted.fasta -n 5 -m 30 -w 10 --seed 1\n    \
                  motif-finder find planted.fasta -w 10 --trace trace.csv\n    \
                  motif-finder bench accuracy.csv --seq-len 20 --runs 5",
    color = clap::ColorChoice::Always
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a synthetic FASTA with a planted motif in every sequence
    Simulate {
        /// Output FASTA path; labels carry the planted start as `start=<n>`
        #[arg(value_name = "OUTPUT_FILE")]
        output_file: String,

        /// Number of sequences
        #[arg(short = 'n', long, default_value = "5")]
        num_sequences: usize,

        /// Length of every sequence
        #[arg(short = 'm', long, default_value = "30")]
        seq_len: usize,

        /// Motif width
        #[arg(short = 'w', long, default_value = "10")]
        width: usize,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Estimate motif starts in the sequences of a FASTA file
    Find {
        /// Input FASTA; all sequences must share one length
        #[arg(value_name = "FASTA_FILE")]
        fasta_file: String,

        /// Motif width
        #[arg(short = 'w', long)]
        width: usize,

        /// Write the start of every sequence after each sweep to this CSV
        #[arg(long, value_name = "CSV_FILE")]
        trace: Option<String>,

        #[command(flatten)]
        schedule: ScheduleArgs,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Measure accuracy over a grid of sequence counts and motif widths
    Bench {
        /// Output CSV for the accuracy table
        #[arg(value_name = "OUTPUT_FILE")]
        output_file: String,

        /// Largest number of sequences; counts run from 1
        #[arg(long, default_value = "9")]
        max_sequences: usize,

        /// Length of every sequence
        #[arg(long, default_value = "20")]
        seq_len: usize,

        /// Width increment; widths run from 2 below the sequence length
        #[arg(long)]
        width_step: Option<usize>,

        /// Generated data sets per grid point
        #[arg(long, default_value = "5")]
        runs: usize,

        #[command(flatten)]
        schedule: ScheduleArgs,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Alphabet: dna, rna or protein
    #[arg(long, default_value = "dna")]
    alphabet: String,

    /// Background Dirichlet concentration, one value per symbol
    #[arg(long, value_delimiter = ',', default_values_t = vec![1.0, 1.0, 1.0, 1.0])]
    alpha_seq: Vec<f64>,

    /// Motif column Dirichlet concentration, one value per symbol
    #[arg(long, value_delimiter = ',', default_values_t = vec![1.0, 7.0, 10.0, 2.0])]
    alpha_motif: Vec<f64>,

    /// Seed of the random source
    #[arg(long, default_value = "0")]
    seed: u64,
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    /// Number of sweeps
    #[arg(long, default_value = "200")]
    iterations: usize,

    /// First sweep counted towards the estimate
    #[arg(long, default_value = "100")]
    min_step: usize,

    /// Keep every n-th sweep after burn-in
    #[arg(long, default_value = "10")]
    step_length: usize,

    /// Leave out the start flush with the sequence end
    #[arg(long)]
    exclude_last: bool,
}

impl ScheduleArgs {
    fn config(&self, width: usize) -> SamplerConfig {
        let candidates = if self.exclude_last {
            CandidateRange::ExcludeLast
        } else {
            CandidateRange::Full
        };
        SamplerConfig::new(width)
            .with_schedule(self.iterations, self.min_step, self.step_length)
            .with_candidates(candidates)
    }
}

fn ensure_parent(path: &str) -> Result<(), FinderError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn write_csv(df: &mut DataFrame, path: &str) -> Result<(), FinderError> {
    ensure_parent(path)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

fn simulate(
    output_file: &str,
    shape: GeneratorConfig,
    model: &ModelArgs,
) -> Result<(), FinderError> {
    let alphabet = Alphabet::named(&model.alphabet)?;
    let prior = MotifPrior::shared(&model.alpha_motif);
    let mut rng = seeded_rng(model.seed);

    let dataset = generate_sequences(&alphabet, &model.alpha_seq, &prior, &shape, &mut rng)?;
    ensure_parent(output_file)?;
    write_fasta(&dataset_frame(&dataset)?, output_file)?;

    println!(
        "Wrote {} sequences to {}, planted starts {:?}",
        dataset.sequences.len(),
        output_file,
        dataset.positions
    );
    Ok(())
}

fn find(
    fasta_file: &str,
    config: &SamplerConfig,
    trace: Option<&str>,
    model: &ModelArgs,
) -> Result<(), FinderError> {
    let alphabet = Alphabet::named(&model.alphabet)?;
    let prior = MotifPrior::shared(&model.alpha_motif);
    let mut rng = seeded_rng(model.seed);

    let df = read_fasta(fasta_file)?;
    let sequences = sequences_from_frame(&df)?;
    info!("{} sequences read from {}", sequences.len(), fasta_file);

    let run = run_chain(&alphabet, &sequences, &model.alpha_seq, &prior, config, &mut rng)?;

    for (idx, (sequence, &start)) in sequences.iter().zip(&run.estimate).enumerate() {
        let motif: String = sequence.chars().skip(start).take(config.motif_width).collect();
        println!("{}\t{}\t{}", idx, start, motif);
    }

    if let Some(truth) = planted_starts(&df)? {
        println!("accuracy: {:.3}", accuracy(&truth, &run.estimate));
    }

    if let Some(path) = trace {
        write_csv(&mut trace_frame(&run.history)?, path)?;
        info!("Trace of {} sweeps written to {}", run.history.len(), path);
    }
    Ok(())
}

fn bench(
    output_file: &str,
    max_sequences: usize,
    seq_len: usize,
    width_step: Option<usize>,
    runs: usize,
    schedule: &ScheduleArgs,
    model: &ModelArgs,
) -> Result<(), FinderError> {
    let step = width_step.unwrap_or(seq_len / 5).max(1);
    if seq_len <= 2 {
        return Err(FinderError::InvalidArgument(format!(
            "sequence length {} leaves no motif width to test",
            seq_len
        )));
    }

    let alphabet = Alphabet::named(&model.alphabet)?;
    let prior = MotifPrior::shared(&model.alpha_motif);
    let mut rng = seeded_rng(model.seed);

    let mut records = Vec::new();
    for num_sequences in 1..=max_sequences {
        for width in (2..seq_len).step_by(step) {
            let shape = GeneratorConfig::new(num_sequences, seq_len, width);
            records.push(benchmark_accuracy(
                &alphabet,
                &model.alpha_seq,
                &prior,
                &shape,
                &schedule.config(width),
                runs,
                &mut rng,
            )?);
        }
    }

    let mut df = benchmark_frame(&records)?;
    println!("{}", df);
    write_csv(&mut df, output_file)?;
    Ok(())
}

fn main() -> Result<(), FinderError> {
    let start_time = std::time::Instant::now();
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match &cli.command {
        Command::Simulate {
            output_file,
            num_sequences,
            seq_len,
            width,
            model,
        } => simulate(
            output_file,
            GeneratorConfig::new(*num_sequences, *seq_len, *width),
            model,
        )?,
        Command::Find {
            fasta_file,
            width,
            trace,
            schedule,
            model,
        } => find(fasta_file, &schedule.config(*width), trace.as_deref(), model)?,
        Command::Bench {
            output_file,
            max_sequences,
            seq_len,
            width_step,
            runs,
            schedule,
            model,
        } => bench(
            output_file,
            *max_sequences,
            *seq_len,
            *width_step,
            *runs,
            schedule,
            model,
        )?,
    }

    info!(
        "Total execution time: {:.4} minutes",
        start_time.elapsed().as_secs_f64() / 60.0
    );
    Ok(())
}
