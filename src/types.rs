use crate::error::{MotifError, Result};
use ndarray::{Array2, ArrayView1};
use phf::phf_map;
use std::collections::HashMap;

/// Sequence encoded as indices into an [`Alphabet`]
pub type EncodedSequence = Vec<usize>;

/// Motif start offset for every sequence, indexed by sequence
/// This is the state of the Markov chain
pub type Positions = Vec<usize>;

/// Chain state after every completed sweep, in sweep order
pub type SampleHistory = Vec<Positions>;

/// Symbol sets selectable by name
static NAMED_ALPHABETS: phf::Map<&'static str, &'static str> = phf_map! {
    "dna" => "ATGC",
    "rna" => "AUGC",
    "protein" => "ACDEFGHIKLMNPQRSTVWY",
};

/// Ordered set of distinct symbols shared by every sequence of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
    index: HashMap<char, usize>,
}

impl Alphabet {
    /// Builds an alphabet from an ordered list of symbols.
    ///
    /// # Errors
    /// * `MotifError::InvalidConfiguration` if fewer than two symbols are given
    ///   or a symbol is repeated
    pub fn new(symbols: impl IntoIterator<Item = char>) -> Result<Self> {
        let symbols: Vec<char> = symbols.into_iter().collect();
        if symbols.len() < 2 {
            return Err(MotifError::invalid_configuration(format!(
                "alphabet needs at least 2 symbols, got {}",
                symbols.len()
            )));
        }

        let mut index = HashMap::with_capacity(symbols.len());
        for (k, &symbol) in symbols.iter().enumerate() {
            if index.insert(symbol, k).is_some() {
                return Err(MotifError::invalid_configuration(format!(
                    "alphabet symbol '{}' is repeated",
                    symbol
                )));
            }
        }

        Ok(Self { symbols, index })
    }

    /// Looks up one of the built-in alphabets ("dna", "rna", "protein").
    pub fn named(name: &str) -> Result<Self> {
        let symbols = NAMED_ALPHABETS
            .get(name.to_ascii_lowercase().as_str())
            .ok_or_else(|| {
                MotifError::invalid_parameter("alphabet", name, "expected dna, rna or protein")
            })?;
        Self::new(symbols.chars())
    }

    /// The four nucleotides in A, T, G, C order
    pub fn dna() -> Self {
        Self {
            symbols: vec!['A', 'T', 'G', 'C'],
            index: HashMap::from([('A', 0), ('T', 1), ('G', 2), ('C', 3)]),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.index.get(&symbol).copied()
    }

    /// Converts a sequence into symbol indices.
    ///
    /// `sequence_id` is only used to report where a foreign symbol was found.
    ///
    /// # Errors
    /// * `MotifError::InvalidSequence` if a character is not part of the alphabet
    pub fn encode(&self, sequence_id: usize, sequence: &str) -> Result<EncodedSequence> {
        sequence
            .chars()
            .enumerate()
            .map(|(position, c)| {
                self.index_of(c).ok_or_else(|| {
                    MotifError::invalid_sequence(
                        sequence_id,
                        position,
                        format!("'{}' is not in the alphabet", c),
                    )
                })
            })
            .collect()
    }

    /// Inverse of [`Alphabet::encode`]. Indices out of range are skipped.
    pub fn decode(&self, encoded: &[usize]) -> String {
        encoded
            .iter()
            .filter_map(|&k| self.symbols.get(k))
            .collect()
    }
}

/// Dirichlet concentration for motif columns.
///
/// Stored as a `w x K` matrix. A shared prior is a single row that applies to
/// every column.
#[derive(Debug, Clone, PartialEq)]
pub struct MotifPrior {
    alpha: Array2<f64>,
}

impl MotifPrior {
    /// One concentration vector used for every motif column
    pub fn shared(alpha: &[f64]) -> Self {
        Self {
            alpha: Array2::from_shape_fn((1, alpha.len()), |(_, k)| alpha[k]),
        }
    }

    /// One concentration vector per motif column
    ///
    /// # Errors
    /// * `MotifError::InvalidConfiguration` if rows differ in length or no row is given
    pub fn per_column(columns: &[Vec<f64>]) -> Result<Self> {
        let width = columns.first().map(Vec::len).ok_or_else(|| {
            MotifError::invalid_configuration("per-column motif prior has no columns")
        })?;
        if columns.iter().any(|row| row.len() != width) {
            return Err(MotifError::invalid_configuration(
                "per-column motif prior rows differ in length",
            ));
        }
        Ok(Self {
            alpha: Array2::from_shape_fn((columns.len(), width), |(t, k)| columns[t][k]),
        })
    }

    pub fn is_shared(&self) -> bool {
        self.alpha.nrows() == 1
    }

    /// Number of symbols each row covers
    pub fn alphabet_len(&self) -> usize {
        self.alpha.ncols()
    }

    /// Concentration for motif column `t`
    pub fn column(&self, t: usize) -> ArrayView1<'_, f64> {
        if self.is_shared() {
            self.alpha.row(0)
        } else {
            self.alpha.row(t)
        }
    }

    /// Checks the prior against the alphabet size and motif width.
    pub fn validate(&self, alphabet_len: usize, width: usize) -> Result<()> {
        if self.alphabet_len() != alphabet_len {
            return Err(MotifError::invalid_configuration(format!(
                "motif prior has {} entries per column, alphabet has {} symbols",
                self.alphabet_len(),
                alphabet_len
            )));
        }
        if !self.is_shared() && self.alpha.nrows() != width {
            return Err(MotifError::invalid_configuration(format!(
                "motif prior has {} columns, motif width is {}",
                self.alpha.nrows(),
                width
            )));
        }
        check_concentration("alpha_motif", self.alpha.iter().copied())
    }
}

pub(crate) fn check_concentration(name: &str, alpha: impl IntoIterator<Item = f64>) -> Result<()> {
    for (k, a) in alpha.into_iter().enumerate() {
        if !(a.is_finite() && a > 0.0) {
            return Err(MotifError::invalid_configuration(format!(
                "{}[{}] = {} must be positive and finite",
                name, k, a
            )));
        }
    }
    Ok(())
}
