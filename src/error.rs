use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotifError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid parameter: {name} = {value}, {message}")]
    InvalidParameter {
        name: String,
        value: String,
        message: String,
    },

    #[error("Invalid symbol in sequence {sequence} at position {position}: {message}")]
    InvalidSequence {
        sequence: usize,
        position: usize,
        message: String,
    },

    #[error("Numerical instability in sweep {sweep} for sequence {sequence}: {message}")]
    NumericalInstability {
        sweep: usize,
        sequence: usize,
        message: String,
    },

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Data error: {0}")]
    DataError(String),
}

/// Type alias for Result with MotifError
pub type Result<T> = std::result::Result<T, MotifError>;

impl MotifError {
    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        MotifError::InvalidArgument(message.into())
    }

    /// Create a new InvalidConfiguration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        MotifError::InvalidConfiguration(message.into())
    }

    /// Create a new InvalidParameter error
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        MotifError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// Create a new InvalidSequence error
    pub fn invalid_sequence(sequence: usize, position: usize, message: impl Into<String>) -> Self {
        MotifError::InvalidSequence {
            sequence,
            position,
            message: message.into(),
        }
    }

    /// Create a new NumericalInstability error
    pub fn numerical_instability(sweep: usize, sequence: usize, message: impl Into<String>) -> Self {
        MotifError::NumericalInstability {
            sweep,
            sequence,
            message: message.into(),
        }
    }

    /// True for the configuration-class errors raised before any sweep runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MotifError::InvalidConfiguration(_) | MotifError::InvalidParameter { .. }
        )
    }
}
