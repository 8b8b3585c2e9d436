use gibbs_motif::estimator::{CandidateRange, PositionEstimator};
use gibbs_motif::generator::{generate_sequences, GeneratorConfig};
use gibbs_motif::gibbs::{ChainState, GibbsSampler};
use gibbs_motif::report::accuracy;
use gibbs_motif::sampling::seeded_rng;
use gibbs_motif::types::{Alphabet, MotifPrior};
use gibbs_motif::{estimate_positions, run_chain, MotifError, SamplerConfig};
use rand::{Rng, RngCore};

const MOTIF: &str = "GCGGCCGCGG";

/// Five A/T backgrounds of length 30 with `MOTIF` planted at `starts`
fn planted_sequences(starts: &[usize]) -> Vec<String> {
    let mut rng = seeded_rng(77);
    starts
        .iter()
        .map(|&start| {
            let mut seq: String = (0..30)
                .map(|_| if rng.gen_bool(0.5) { 'A' } else { 'T' })
                .collect();
            seq.replace_range(start..start + MOTIF.len(), MOTIF);
            seq
        })
        .collect()
}

#[test]
fn test_recovers_planted_motif() {
    let starts = [3, 17, 0, 20, 9];
    let sequences = planted_sequences(&starts);
    let config = SamplerConfig::new(10).with_schedule(200, 100, 10);

    let estimate = estimate_positions(
        &Alphabet::dna(),
        &sequences,
        &[1.0, 1.0, 1.0, 1.0],
        &MotifPrior::shared(&[1.0, 7.0, 10.0, 2.0]),
        &config,
        &mut seeded_rng(11),
    )
    .unwrap();

    let hits = starts.iter().zip(&estimate).filter(|(a, b)| a == b).count();
    assert!(hits >= 4, "planted {:?}, estimated {:?}", starts, estimate);
}

#[test]
fn test_recovers_generated_motifs() {
    let alphabet = Alphabet::dna();
    let alpha_seq = [1.0, 1.0, 1.0, 1.0];
    let alpha_motif = MotifPrior::shared(&[1.0, 7.0, 10.0, 2.0]);
    let config = SamplerConfig::new(10).with_schedule(200, 100, 10);

    let mut total = 0.0;
    let datasets = 6;
    for seed in 0..datasets {
        let mut rng = seeded_rng(seed);
        let dataset = generate_sequences(
            &alphabet,
            &alpha_seq,
            &alpha_motif,
            &GeneratorConfig::new(5, 30, 10),
            &mut rng,
        )
        .unwrap();
        let estimate = estimate_positions(
            &alphabet,
            &dataset.sequences,
            &alpha_seq,
            &alpha_motif,
            &config,
            &mut rng,
        )
        .unwrap();
        total += accuracy(&dataset.positions, &estimate);
    }

    // far above the 1/21 expected from guessing
    assert!(total / datasets as f64 > 0.3, "mean accuracy {}", total / datasets as f64);
}

#[test]
fn test_estimates_are_at_least_as_probable_as_truth() {
    let alphabet = Alphabet::dna();
    let alpha_seq = [1.0, 1.0, 1.0, 1.0];
    let alpha_motif = MotifPrior::shared(&[1.0, 7.0, 10.0, 2.0]);
    let config = SamplerConfig::new(10).with_schedule(200, 100, 10);

    let datasets = 30;
    let mut explained = 0;
    for seed in 0..datasets {
        let mut rng = seeded_rng(seed);
        let dataset = generate_sequences(
            &alphabet,
            &alpha_seq,
            &alpha_motif,
            &GeneratorConfig::new(5, 30, 10),
            &mut rng,
        )
        .unwrap();
        let estimate = estimate_positions(
            &alphabet,
            &dataset.sequences,
            &alpha_seq,
            &alpha_motif,
            &config,
            &mut rng,
        )
        .unwrap();

        let estimator = PositionEstimator::new(
            &dataset.encoded,
            alphabet.len(),
            10,
            &alpha_seq,
            &alpha_motif,
            CandidateRange::Full,
        )
        .unwrap();
        let found = estimator.log_joint(&estimate).unwrap();
        let planted = estimator.log_joint(&dataset.positions).unwrap();
        if found >= planted - 1e-9 {
            explained += 1;
        }
    }

    // a missed start is mostly a configuration the model rates at least as
    // probable as the planted one, not a failure to mix
    assert!(explained >= 20, "{} of {} estimates reach the planted log marginal", explained, datasets);
}

#[test]
fn test_same_seed_same_estimate() {
    let sequences = planted_sequences(&[1, 2, 3, 4, 5]);
    let config = SamplerConfig::new(10).with_schedule(60, 30, 3);
    let prior = MotifPrior::shared(&[1.0, 1.0, 4.0, 4.0]);

    let a = run_chain(&Alphabet::dna(), &sequences, &[1.0; 4], &prior, &config, &mut seeded_rng(3))
        .unwrap();
    let b = run_chain(&Alphabet::dna(), &sequences, &[1.0; 4], &prior, &config, &mut seeded_rng(3))
        .unwrap();
    assert_eq!(a.estimate, b.estimate);
    assert_eq!(a.history, b.history);
}

#[test]
fn test_history_and_retained_samples() {
    let sequences = planted_sequences(&[0, 5, 10, 15, 20]);
    let config = SamplerConfig::new(10).with_schedule(40, 10, 7);
    let run = run_chain(
        &Alphabet::dna(),
        &sequences,
        &[1.0; 4],
        &MotifPrior::shared(&[1.0; 4]),
        &config,
        &mut seeded_rng(8),
    )
    .unwrap();

    assert_eq!(run.history.len(), 40);
    assert_eq!(run.retained, vec![10, 17, 24, 31, 38]);
    assert!(run.history.iter().flatten().all(|&p| p <= 20));

    // every estimate is one of the retained values for that sequence
    for (i, &start) in run.estimate.iter().enumerate() {
        assert!(run.retained_samples().any(|state| state[i] == start));
    }
}

#[test]
fn test_sweep_updates_in_place() {
    let alphabet = Alphabet::dna();
    let sequences: Vec<Vec<usize>> = planted_sequences(&[2, 4, 6, 8, 10])
        .iter()
        .enumerate()
        .map(|(i, s)| alphabet.encode(i, s).unwrap())
        .collect();
    let alpha_seq = [1.0; 4];
    let prior = MotifPrior::shared(&[1.0, 1.0, 10.0, 10.0]);
    let config = SamplerConfig::new(10).with_schedule(10, 5, 1);
    let sampler = GibbsSampler::new(&sequences, 4, &alpha_seq, &prior, &config).unwrap();

    let mut rng = seeded_rng(21);
    let mut state = ChainState::from_positions(vec![0, 0, 0, 0, 0]);
    for sweep in 0..20 {
        sampler.sweep(&mut state, sweep, &mut rng).unwrap();
    }
    assert_eq!(state.positions(), &[2, 4, 6, 8, 10]);
}

#[test]
fn test_full_width_motif() {
    let sequences = ["ATGC", "GGCA", "TTTA"];
    let config = SamplerConfig::new(4).with_schedule(5, 1, 1);
    let estimate = estimate_positions(
        &Alphabet::dna(),
        &sequences,
        &[1.0; 4],
        &MotifPrior::shared(&[1.0; 4]),
        &config,
        &mut seeded_rng(0),
    )
    .unwrap();
    assert_eq!(estimate, vec![0, 0, 0]);
}

#[test]
fn test_exclude_last_never_picks_final_start() {
    let sequences = planted_sequences(&[20, 20, 20, 20, 20]);
    let config = SamplerConfig::new(10)
        .with_schedule(30, 10, 2)
        .with_candidates(CandidateRange::ExcludeLast);
    let run = run_chain(
        &Alphabet::dna(),
        &sequences,
        &[1.0; 4],
        &MotifPrior::shared(&[1.0, 7.0, 10.0, 2.0]),
        &config,
        &mut seeded_rng(4),
    )
    .unwrap();
    assert!(run.history.iter().flatten().all(|&p| p < 20));
}

#[test]
fn test_width_longer_than_sequences_runs_no_sweep() {
    let mut rng = seeded_rng(99);
    let result = estimate_positions(
        &Alphabet::dna(),
        &["ATGC", "GGCA"],
        &[1.0; 4],
        &MotifPrior::shared(&[1.0; 4]),
        &SamplerConfig::new(5).with_schedule(10, 5, 1),
        &mut rng,
    );
    assert!(matches!(result, Err(MotifError::InvalidConfiguration(_))));

    // no randomness was consumed
    assert_eq!(rng.next_u64(), seeded_rng(99).next_u64());
}

#[test]
fn test_invalid_configuration() {
    let alphabet = Alphabet::dna();
    let sequences = ["ATGCAT", "GGCATT"];
    let prior = MotifPrior::shared(&[1.0; 4]);
    let run = |alpha_seq: &[f64], prior: &MotifPrior, config: SamplerConfig| {
        estimate_positions(&alphabet, &sequences, alpha_seq, prior, &config, &mut seeded_rng(0))
    };

    let bad_schedules = [
        SamplerConfig::new(2).with_schedule(0, 0, 1),
        SamplerConfig::new(2).with_schedule(10, 0, 1),
        SamplerConfig::new(2).with_schedule(10, 10, 1),
        SamplerConfig::new(2).with_schedule(10, 5, 0),
        SamplerConfig::new(0),
    ];
    for config in bad_schedules {
        let result = run(&[1.0; 4], &prior, config.clone());
        assert!(
            matches!(result, Err(MotifError::InvalidConfiguration(_))),
            "{:?} accepted",
            config
        );
    }

    let result = run(&[1.0; 3], &prior, SamplerConfig::new(2));
    assert!(matches!(result, Err(MotifError::InvalidConfiguration(_))));

    let result = run(&[1.0; 4], &MotifPrior::shared(&[1.0; 5]), SamplerConfig::new(2));
    assert!(matches!(result, Err(MotifError::InvalidConfiguration(_))));

    let none: [&str; 0] = [];
    let result = estimate_positions(
        &alphabet,
        &none,
        &[1.0; 4],
        &prior,
        &SamplerConfig::new(2),
        &mut seeded_rng(0),
    );
    assert!(matches!(result, Err(MotifError::InvalidConfiguration(_))));
}

#[test]
fn test_foreign_symbol_is_rejected() {
    let result = estimate_positions(
        &Alphabet::dna(),
        &["ATGC", "ATNC"],
        &[1.0; 4],
        &MotifPrior::shared(&[1.0; 4]),
        &SamplerConfig::new(2).with_schedule(4, 1, 1),
        &mut seeded_rng(0),
    );
    match result {
        Err(MotifError::InvalidSequence {
            sequence, position, ..
        }) => {
            assert_eq!(sequence, 1);
            assert_eq!(position, 2);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_sweep_rejects_mismatched_state() {
    let alphabet = Alphabet::dna();
    let sequences: Vec<Vec<usize>> = planted_sequences(&[2, 4, 6, 8, 10])
        .iter()
        .enumerate()
        .map(|(i, s)| alphabet.encode(i, s).unwrap())
        .collect();
    let alpha_seq = [1.0; 4];
    let prior = MotifPrior::shared(&[1.0; 4]);
    let config = SamplerConfig::new(10).with_schedule(10, 5, 1);
    let sampler = GibbsSampler::new(&sequences, 4, &alpha_seq, &prior, &config).unwrap();
    let mut rng = seeded_rng(5);

    let mut short = ChainState::from_positions(vec![0, 0, 0]);
    let result = sampler.sweep(&mut short, 0, &mut rng);
    assert!(matches!(result, Err(MotifError::InvalidConfiguration(_))));
    assert_eq!(short.positions(), &[0, 0, 0]);

    // 21 is one past M - w
    let mut past_end = ChainState::from_positions(vec![0, 0, 21, 0, 0]);
    let result = sampler.run_from(&mut past_end, &mut rng);
    assert!(matches!(result, Err(MotifError::InvalidConfiguration(_))));
    assert_eq!(past_end.positions(), &[0, 0, 21, 0, 0]);

    let mut last = ChainState::from_positions(vec![20; 5]);
    assert!(sampler.sweep(&mut last, 0, &mut rng).is_ok());
}

#[test]
fn test_overflowing_prior_stops_at_first_update() {
    let alphabet = Alphabet::dna();
    let sequences = planted_sequences(&[2, 4, 6, 8, 10]);
    // Σα overflows to +inf, so every log weight is NaN
    let alpha_seq = [1e308; 4];
    let prior = MotifPrior::shared(&[1.0; 4]);
    let config = SamplerConfig::new(10).with_schedule(10, 5, 1);

    let result = run_chain(&alphabet, &sequences, &alpha_seq, &prior, &config, &mut seeded_rng(6));
    match result {
        Err(MotifError::NumericalInstability {
            sweep, sequence, ..
        }) => {
            assert_eq!(sweep, 0);
            assert_eq!(sequence, 0);
        }
        other => panic!("unexpected result {:?}", other.map(|run| run.estimate)),
    }

    let encoded: Vec<Vec<usize>> = sequences
        .iter()
        .enumerate()
        .map(|(i, s)| alphabet.encode(i, s).unwrap())
        .collect();
    let sampler = GibbsSampler::new(&encoded, 4, &alpha_seq, &prior, &config).unwrap();
    let mut state = ChainState::from_positions(vec![1, 1, 1, 1, 1]);
    let result = sampler.sweep(&mut state, 7, &mut seeded_rng(6));
    assert!(matches!(
        result,
        Err(MotifError::NumericalInstability {
            sweep: 7,
            sequence: 0,
            ..
        })
    ));
    assert_eq!(state.positions(), &[1, 1, 1, 1, 1]);
}

#[test]
fn test_numerical_instability_message() {
    let err = MotifError::numerical_instability(3, 1, "normalizing sum is NaN");
    assert_eq!(
        err.to_string(),
        "Numerical instability in sweep 3 for sequence 1: normalizing sum is NaN"
    );
}
