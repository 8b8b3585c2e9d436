use crate::error::{MotifError, Result};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Draws one value from a finite set by inverse-CDF sampling.
///
/// A uniform `r` in `[0, 1)` is drawn and the first value whose running
/// probability sum reaches `r` is returned. When rounding leaves the total just
/// short of `r`, the last value is returned.
///
/// # Arguments
/// * `values` - Ordered candidate values
/// * `probabilities` - Non-negative probability of each value, same order
/// * `rng` - Random source, consumed once per call
///
/// # Errors
/// * Returns `MotifError::InvalidArgument` if `values` is empty or the two
///   slices differ in length
///
/// # Example
/// ```
/// use gibbs_motif::sampling::{sample_categorical, seeded_rng};
///
/// let mut rng = seeded_rng(7);
/// let drawn = sample_categorical(&['A', 'B'], &[0.0, 1.0], &mut rng).unwrap();
/// assert_eq!(drawn, 'B');
/// ```
pub fn sample_categorical<T, R>(values: &[T], probabilities: &[f64], rng: &mut R) -> Result<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if values.len() != probabilities.len() {
        return Err(MotifError::invalid_argument(format!(
            "{} values for {} probabilities",
            values.len(),
            probabilities.len()
        )));
    }

    let index = sample_index(probabilities, rng)?;
    Ok(values[index].clone())
}

/// Same as [`sample_categorical`] over the values `0..probabilities.len()`.
pub fn sample_index<R>(probabilities: &[f64], rng: &mut R) -> Result<usize>
where
    R: Rng + ?Sized,
{
    let last = probabilities
        .len()
        .checked_sub(1)
        .ok_or_else(|| MotifError::invalid_argument("cannot sample from an empty distribution"))?;

    let r: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (idx, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if cumulative >= r {
            return Ok(idx);
        }
    }

    Ok(last)
}

/// Reproducible random source for a single chain
pub fn seeded_rng(seed: u64) -> Xoshiro256StarStar {
    Xoshiro256StarStar::seed_from_u64(seed)
}
