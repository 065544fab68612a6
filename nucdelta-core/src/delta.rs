//! Delta-encoded alignments
//!
//! An alignment block stores its start and end in both sequences plus a list
//! of signed indel positions. A delta `d > 0` stands for `d - 1` aligned
//! columns followed by a reference residue opposite a gap; `d < 0` stands
//! for `|d| - 1` aligned columns followed by a query residue opposite a gap.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::{Alphabet, MatchRecord, Strand};

/// Gap character used in gapped projections.
pub const GAP: u8 = b'-';

/// One contiguous, possibly gapped, alignment block. Coordinates are
/// zero-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaAlignment {
    pub first_sequence_start: i64,
    pub first_sequence_end: i64,
    pub second_sequence_start: i64,
    pub second_sequence_end: i64,
    pub query_direction: Strand,
    pub deltas: Vec<i64>,
    /// Reference residues accounted for by `deltas`, counted from
    /// `first_sequence_start`.
    pub delta_reference_position: i64,
    pub errors: i32,
    pub similarity_errors: i32,
    pub non_alphas: i32,
    pub reference_sequence_id: Arc<str>,
    pub query_sequence_id: Arc<str>,
    pub reference_length: i64,
    pub query_length: i64,
}

/// Explicit gapped rows of a delta alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseAlignedSequence {
    pub first_sequence: Vec<u8>,
    pub second_sequence: Vec<u8>,
    pub first_offset: i64,
    pub second_offset: i64,
    pub first_end: i64,
    pub second_end: i64,
    /// Gaps inserted into the reference row
    pub first_insertions: usize,
    /// Gaps inserted into the query row
    pub second_insertions: usize,
}

/// Residue bookkeeping of an alignment block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignmentTally {
    pub errors: i32,
    pub similarity_errors: i32,
    pub non_alphas: i32,
}

impl DeltaAlignment {
    /// Ungapped alignment covering exactly `record`.
    pub fn new_alignment(
        record: &MatchRecord,
        query_direction: Strand,
        reference_sequence_id: Arc<str>,
        reference_length: i64,
        query_length: i64,
    ) -> Self {
        Self {
            first_sequence_start: record.reference_offset,
            first_sequence_end: record.reference_offset + record.length - 1,
            second_sequence_start: record.query_offset,
            second_sequence_end: record.query_offset + record.length - 1,
            query_direction,
            deltas: Vec::new(),
            delta_reference_position: 0,
            errors: 0,
            similarity_errors: 0,
            non_alphas: 0,
            reference_sequence_id,
            query_sequence_id: Arc::clone(&record.query_id),
            reference_length,
            query_length,
        }
    }

    pub fn reference_span(&self) -> i64 {
        self.first_sequence_end - self.first_sequence_start + 1
    }

    pub fn query_span(&self) -> i64 {
        self.second_sequence_end - self.second_sequence_start + 1
    }

    /// Whether both ranges of this block contain the given ranges.
    pub fn contains(&self, reference_start: i64, reference_end: i64, query_start: i64, query_end: i64) -> bool {
        self.first_sequence_start <= reference_start
            && self.first_sequence_end >= reference_end
            && self.second_sequence_start <= query_start
            && self.second_sequence_end >= query_end
    }

    /// Reference residues consumed by a single delta.
    pub fn reference_advance(delta: i64) -> i64 {
        if delta > 0 {
            delta
        } else {
            delta.abs() - 1
        }
    }

    /// Recompute `delta_reference_position` from the full delta list.
    pub fn recompute_reference_position(&mut self) {
        self.delta_reference_position = self.deltas.iter().copied().map(Self::reference_advance).sum();
    }

    /// Expand the deltas into explicit gapped rows.
    ///
    /// `reference` and `query` are the full sequences the block was built
    /// on; the block's coordinates index into them.
    pub fn convert_delta_to_sequences(&self, reference: &[u8], query: &[u8]) -> PairwiseAlignedSequence {
        let mut first_sequence = slice_inclusive(reference, self.first_sequence_start, self.first_sequence_end);
        let mut second_sequence = slice_inclusive(query, self.second_sequence_start, self.second_sequence_end);
        let mut first_insertions = 0;
        let mut second_insertions = 0;
        let mut column = 0i64;

        for &delta in &self.deltas {
            column += delta.abs();
            let position = (column - 1) as usize;
            if delta < 0 {
                assert!(
                    position <= first_sequence.len(),
                    "delta {} walks past the reference row ({} > {})",
                    delta,
                    position,
                    first_sequence.len()
                );
                first_sequence.insert(position, GAP);
                first_insertions += 1;
            } else {
                assert!(
                    position <= second_sequence.len(),
                    "delta {} walks past the query row ({} > {})",
                    delta,
                    position,
                    second_sequence.len()
                );
                second_sequence.insert(position, GAP);
                second_insertions += 1;
            }
        }

        PairwiseAlignedSequence {
            first_sequence,
            second_sequence,
            first_offset: self.first_sequence_start,
            second_offset: self.second_sequence_start,
            first_end: self.first_sequence_end,
            second_end: self.second_sequence_end,
            first_insertions,
            second_insertions,
        }
    }

    /// Count mismatching, dissimilar and non-alphabet columns.
    pub fn tally(&self, reference: &[u8], query: &[u8], alphabet: Alphabet) -> AlignmentTally {
        let aligned = self.convert_delta_to_sequences(reference, query);
        let mut tally = AlignmentTally::default();

        for (&a, &b) in aligned.first_sequence.iter().zip(&aligned.second_sequence) {
            if a == GAP || b == GAP {
                tally.errors += 1;
                tally.similarity_errors += 1;
                continue;
            }
            if !alphabet.is_core_residue(a) || !alphabet.is_core_residue(b) {
                tally.non_alphas += 1;
            }
            if !a.eq_ignore_ascii_case(&b) {
                tally.errors += 1;
                if alphabet.is_nucleotide() || !similar_residues(a, b) {
                    tally.similarity_errors += 1;
                }
            }
        }

        tally
    }

    /// Store the counters from [`DeltaAlignment::tally`].
    pub fn apply_tally(&mut self, tally: AlignmentTally) {
        self.errors = tally.errors;
        self.similarity_errors = tally.similarity_errors;
        self.non_alphas = tally.non_alphas;
    }
}

fn slice_inclusive(sequence: &[u8], start: i64, end: i64) -> Vec<u8> {
    if end < start {
        return Vec::new();
    }
    let start = start.max(0) as usize;
    let end = ((end + 1) as usize).min(sequence.len());
    sequence.get(start..end).map(|s| s.to_vec()).unwrap_or_default()
}

/// Conservative amino acid substitution groups.
const SIMILARITY_GROUPS: [&[u8]; 6] = [b"ILVM", b"FWY", b"KRH", b"DENQ", b"ST", b"AG"];

fn similar_residues(a: u8, b: u8) -> bool {
    let (a, b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
    SIMILARITY_GROUPS
        .iter()
        .any(|group| group.contains(&a) && group.contains(&b))
}
