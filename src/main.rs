use gibbs_motif::generator::{generate_sequences, GeneratorConfig};
use gibbs_motif::report::accuracy;
use gibbs_motif::sampling::seeded_rng;
use gibbs_motif::types::{Alphabet, MotifPrior};
use gibbs_motif::{estimate_positions, Result, SamplerConfig};

fn main() -> Result<()> {
    let alphabet = Alphabet::dna();
    let alpha_seq = [1.0, 1.0, 1.0, 1.0];
    let alpha_motif = MotifPrior::shared(&[1.0, 7.0, 10.0, 2.0]);
    let mut rng = seeded_rng(42);

    let dataset = generate_sequences(
        &alphabet,
        &alpha_seq,
        &alpha_motif,
        &GeneratorConfig::new(5, 30, 10),
        &mut rng,
    )?;
    let config = SamplerConfig::new(10).with_schedule(200, 100, 10);
    let estimate = estimate_positions(
        &alphabet,
        &dataset.sequences,
        &alpha_seq,
        &alpha_motif,
        &config,
        &mut rng,
    )?;

    for (planted, found) in dataset.positions.iter().zip(&estimate) {
        let status = if planted == found { "OK" } else { "FALSE" };
        println!("{} -> {} ({})", planted, found, status);
    }
    println!("accuracy: {:.2}", accuracy(&dataset.positions, &estimate));
    Ok(())
}
