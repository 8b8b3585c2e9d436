use crate::error::{MotifError, Result};
use crate::generator::GeneratedDataset;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

const START_TAG: &str = "start=";

/// Loads a FASTA file into a frame with one row per record.
///
/// Columns are "label" (header text after `>`) and "sequence" (all lines of
/// the record joined and uppercased). Blank lines are skipped.
///
/// # Errors
/// * `MotifError::InvalidFileFormat` if sequence text precedes the first header
///   or the file holds no record
/// * `MotifError::Io` if the file cannot be read
pub fn read_fasta(filename: &str) -> Result<DataFrame> {
    let reader = BufReader::new(File::open(filename)?);
    let mut labels: Vec<String> = Vec::new();
    let mut sequences: Vec<String> = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        match line.trim() {
            "" => {}
            text if text.starts_with('>') => {
                labels.push(text[1..].to_string());
                sequences.push(String::new());
            }
            text => match sequences.last_mut() {
                Some(seq) => seq.push_str(&text.to_uppercase()),
                None => {
                    return Err(MotifError::InvalidFileFormat(format!(
                        "line {} holds sequence text outside any record",
                        lineno + 1
                    )))
                }
            },
        }
    }

    if labels.is_empty() {
        return Err(MotifError::InvalidFileFormat(format!(
            "{} holds no FASTA record",
            filename
        )));
    }

    DataFrame::new(vec![
        Column::new("label".into(), labels),
        Column::new("sequence".into(), sequences),
    ])
    .map_err(|e| MotifError::DataError(e.to_string()))
}

/// Writes sequences from a Polars DataFrame to a FASTA format file.
///
/// # Arguments
/// * `df` - DataFrame containing sequences with "label" and "sequence" columns
/// * `filename` - Path where the FASTA file should be written
///
/// # Errors
/// * Returns `MotifError::DataError` if required columns are missing or hold nulls
/// * Returns `MotifError::Io` for file writing issues
pub fn write_fasta(df: &DataFrame, filename: &str) -> Result<()> {
    let labels = string_column(df, "label")?;
    let sequences = string_column(df, "sequence")?;

    let mut file = File::create(filename)?;
    for (label, sequence) in labels.iter().zip(&sequences) {
        writeln!(file, ">{}", label)?;
        writeln!(file, "{}", sequence)?;
    }

    Ok(())
}

/// Pulls the "sequence" column out of a FASTA DataFrame.
pub fn sequences_from_frame(df: &DataFrame) -> Result<Vec<String>> {
    string_column(df, "sequence")
}

/// Planted motif starts recorded in the labels, if every label carries one.
pub fn planted_starts(df: &DataFrame) -> Result<Option<Vec<usize>>> {
    let labels = string_column(df, "label")?;
    Ok(labels.iter().map(|l| parse_planted_start(l)).collect())
}

/// Reads the `start=<n>` tag from a label written by [`dataset_frame`].
pub fn parse_planted_start(label: &str) -> Option<usize> {
    label
        .split_whitespace()
        .find_map(|field| field.strip_prefix(START_TAG))
        .and_then(|value| value.parse().ok())
}

/// Converts a generated data set into a FASTA DataFrame.
///
/// Labels have the form `seq<i> start=<planted start>`.
pub fn dataset_frame(dataset: &GeneratedDataset) -> Result<DataFrame> {
    let labels: Vec<String> = dataset
        .positions
        .iter()
        .enumerate()
        .map(|(i, start)| format!("seq{} {}{}", i, START_TAG, start))
        .collect();

    DataFrame::new(vec![
        Column::new("label".into(), labels),
        Column::new("sequence".into(), dataset.sequences.clone()),
    ])
    .map_err(|e| MotifError::DataError(e.to_string()))
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|e| MotifError::DataError(e.to_string()))?
        .str()
        .map_err(|e| MotifError::DataError(e.to_string()))?;

    column
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            value
                .map(str::to_string)
                .ok_or_else(|| MotifError::DataError(format!("Null {} at row {}", name, idx)))
        })
        .collect()
}
