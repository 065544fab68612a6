use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Byte placed between references when several are concatenated into one
/// coordinate space.
pub const SEPARATOR: u8 = b'+';

/// Appended to a query id to name its reverse-complement strand.
pub const REVERSE_SUFFIX: &str = " Reverse";

/// Which strand of the query a cluster or alignment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Default for Strand {
    fn default() -> Self {
        Strand::Forward
    }
}

impl From<bool> for Strand {
    fn from(forward: bool) -> Self {
        if forward {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

impl From<Strand> for char {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "FORWARD"),
            Strand::Reverse => write!(f, "REVERSE"),
        }
    }
}

/// Residue alphabet tag carried by every sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alphabet {
    Dna,
    Rna,
    Protein,
}

impl Alphabet {
    pub fn is_nucleotide(self) -> bool {
        matches!(self, Alphabet::Dna | Alphabet::Rna)
    }

    /// Whether `residue` is one of the unambiguous letters of this alphabet.
    pub fn is_core_residue(self, residue: u8) -> bool {
        let residue = residue.to_ascii_uppercase();
        match self {
            Alphabet::Dna => matches!(residue, b'A' | b'C' | b'G' | b'T'),
            Alphabet::Rna => matches!(residue, b'A' | b'C' | b'G' | b'U'),
            Alphabet::Protein => b"ACDEFGHIKLMNPQRSTVWY".contains(&residue),
        }
    }

    pub fn is_compatible(self, other: Alphabet) -> bool {
        self == other
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alphabet::Dna => write!(f, "DNA"),
            Alphabet::Rna => write!(f, "RNA"),
            Alphabet::Protein => write!(f, "Protein"),
        }
    }
}

/// Backing storage of a sequence.
#[derive(Debug, Clone)]
pub enum SequenceData {
    /// One buffer, indexable by position.
    Contiguous(Arc<[u8]>),
    /// Chunked buffers as produced by streaming readers.
    Segmented(Vec<Arc<[u8]>>),
}

/// An identified run of residues.
///
/// Two sequences are equal when their ids are equal; content is not compared.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub id: String,
    pub alphabet: Alphabet,
    pub data: SequenceData,
}

impl Sequence {
    pub fn new(id: impl Into<String>, alphabet: Alphabet, residues: impl Into<Vec<u8>>) -> Self {
        let residues: Vec<u8> = residues.into();
        Self {
            id: id.into(),
            alphabet,
            data: SequenceData::Contiguous(residues.into()),
        }
    }

    pub fn dna(id: impl Into<String>, residues: impl Into<Vec<u8>>) -> Self {
        Self::new(id, Alphabet::Dna, residues)
    }

    pub fn segmented(id: impl Into<String>, alphabet: Alphabet, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            alphabet,
            data: SequenceData::Segmented(chunks.into_iter().map(Arc::from).collect()),
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            SequenceData::Contiguous(residues) => residues.len(),
            SequenceData::Segmented(chunks) => chunks.iter().map(|c| c.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The residues as one slice, if the sequence is stored that way.
    pub fn residues(&self) -> Option<&[u8]> {
        match &self.data {
            SequenceData::Contiguous(residues) => Some(&residues[..]),
            SequenceData::Segmented(_) => None,
        }
    }

    /// Iterate over the stored chunks in order.
    pub fn chunks(&self) -> Box<dyn Iterator<Item = &[u8]> + '_> {
        match &self.data {
            SequenceData::Contiguous(residues) => Box::new(std::iter::once(&residues[..])),
            SequenceData::Segmented(chunks) => Box::new(chunks.iter().map(|c| &c[..])),
        }
    }

}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Sequence {}

/// A raw exact match as reported by a match finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawMatch {
    pub reference_offset: i64,
    pub query_offset: i64,
    pub length: i64,
}

/// An exact match between the (possibly concatenated) reference and a query.
///
/// Offsets are zero-based. The record is never mutated while clustering; all
/// per-pass bookkeeping lives in the builder's own scratch arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub reference_offset: i64,
    pub query_offset: i64,
    pub length: i64,
    pub reference_mum_order: i64,
    pub query_mum_order: i64,
    pub query_id: Arc<str>,
}

impl MatchRecord {
    pub fn new(reference_offset: i64, query_offset: i64, length: i64, query_id: Arc<str>) -> Self {
        Self {
            reference_offset,
            query_offset,
            length,
            reference_mum_order: 0,
            query_mum_order: 0,
            query_id,
        }
    }

    pub fn from_raw(raw: RawMatch, order: i64, query_id: Arc<str>) -> Self {
        Self {
            reference_offset: raw.reference_offset,
            query_offset: raw.query_offset,
            length: raw.length,
            reference_mum_order: order,
            query_mum_order: order,
            query_id,
        }
    }

    /// `query_offset - reference_offset`
    pub fn diagonal(&self) -> i64 {
        self.query_offset - self.reference_offset
    }

    pub fn reference_end(&self) -> i64 {
        self.reference_offset + self.length
    }

    pub fn query_end(&self) -> i64 {
        self.query_offset + self.length
    }
}
