//! Error types for the alignment pipeline

use crate::types::Alphabet;
use thiserror::Error;

/// Errors raised by the clustering and alignment pipeline.
///
/// Every variant is fatal for the call that produced it; nothing is retried.
#[derive(Debug, Error)]
pub enum NucmerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Alphabet mismatch: sequence '{sequence_id}' is {found}, expected {expected}")]
    AlphabetMismatch {
        sequence_id: String,
        expected: Alphabet,
        found: Alphabet,
    },

    #[error("No {0} sequences provided")]
    EmptyInput(String),

    #[error("No sequence is longer than the minimum match length {length_of_mum}")]
    SequenceTooShort { length_of_mum: i64 },

    #[error("Sequence '{0}' is not stored in a single indexable buffer")]
    UnsupportedSequenceRepresentation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NucmerError {
    pub fn invalid_configuration<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn empty_input<S: Into<String>>(what: S) -> Self {
        Self::EmptyInput(what.into())
    }

    pub fn unsupported_representation<S: Into<String>>(sequence_id: S) -> Self {
        Self::UnsupportedSequenceRepresentation(sequence_id.into())
    }
}

pub type NucmerResult<T> = Result<T, NucmerError>;
