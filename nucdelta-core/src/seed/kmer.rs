//! Hash-based k-mer match finder
//!
//! Every reference k-mer is stored in a hash map keyed by its bytes. Query
//! k-mers that hit the map seed a match, which is then extended to the left
//! and right while the residues agree.

use std::collections::HashMap;

use super::{MatchFinder, MatchIndexer};
use crate::types::{RawMatch, SEPARATOR};

/// Indexer producing [`KmerMatchFinder`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct KmerIndexer;

impl KmerIndexer {
    pub fn new() -> Self {
        Self
    }
}

impl MatchIndexer for KmerIndexer {
    fn index<'r>(&self, reference: &'r [u8], min_length: usize) -> Box<dyn MatchFinder + 'r> {
        Box::new(KmerMatchFinder::build(reference, min_length))
    }

    fn name(&self) -> &'static str {
        "kmer"
    }
}

/// K-mer table over one reference buffer.
pub struct KmerMatchFinder<'r> {
    reference: &'r [u8],
    k: usize,
    table: HashMap<&'r [u8], Vec<usize>>,
}

impl<'r> KmerMatchFinder<'r> {
    /// Index every window of `k` residues that holds no separator.
    pub fn build(reference: &'r [u8], k: usize) -> Self {
        let mut table: HashMap<&'r [u8], Vec<usize>> = HashMap::new();

        if k > 0 && reference.len() >= k {
            let mut last_separator: Option<usize> = None;
            for (position, &residue) in reference.iter().enumerate().take(k - 1) {
                if residue == SEPARATOR {
                    last_separator = Some(position);
                }
            }

            for end in k - 1..reference.len() {
                if reference[end] == SEPARATOR {
                    last_separator = Some(end);
                }
                let start = end + 1 - k;
                if last_separator.map_or(true, |s| s < start) {
                    table.entry(&reference[start..=end]).or_default().push(start);
                }
            }
        }

        log::debug!(
            "Indexed {} distinct {}-mers over {} residues",
            table.len(),
            k,
            reference.len()
        );

        Self { reference, k, table }
    }

    /// Number of reference positions holding `kmer`.
    pub fn occurrences(&self, kmer: &[u8]) -> usize {
        self.table.get(kmer).map_or(0, |positions| positions.len())
    }

    fn residues_agree(&self, query: &[u8], reference_position: usize, query_position: usize) -> bool {
        let residue = self.reference[reference_position];
        residue != SEPARATOR && residue == query[query_position]
    }

    /// Extend the seed at `(r, q)` right to its maximal end.
    fn extend_right(&self, query: &[u8], start: (usize, usize), seed_end: (usize, usize)) -> RawMatch {
        let (mut r, mut q) = seed_end;
        while r < self.reference.len() && q < query.len() && self.residues_agree(query, r, q) {
            r += 1;
            q += 1;
        }
        RawMatch {
            reference_offset: start.0 as i64,
            query_offset: start.1 as i64,
            length: (r - start.0) as i64,
        }
    }

    fn all_matches(&self, query: &[u8]) -> Vec<RawMatch> {
        let k = self.k;
        let mut matches = Vec::new();

        for q in 0..=query.len() - k {
            let Some(positions) = self.table.get(&query[q..q + k]) else {
                continue;
            };
            for &r in positions {
                // Reported from the seed one residue to the left.
                if r > 0 && q > 0 && self.residues_agree(query, r - 1, q - 1) {
                    continue;
                }
                matches.push(self.extend_right(query, (r, q), (r + k, q + k)));
            }
        }

        matches
    }

    fn unique_matches(&self, query: &[u8]) -> Vec<RawMatch> {
        let k = self.k;
        let mut matches = Vec::new();

        for q in 0..=query.len() - k {
            let r = match self.table.get(&query[q..q + k]).map(Vec::as_slice) {
                Some([r]) => *r,
                _ => continue,
            };

            if r > 0 && q > 0 && self.residues_agree(query, r - 1, q - 1) {
                // The previous seed continues this match; it is reported
                // from there when that seed is unique as well.
                if self.occurrences(&query[q - 1..q - 1 + k]) == 1 {
                    continue;
                }
            }

            let (mut rs, mut qs) = (r, q);
            while rs > 0 && qs > 0 && self.residues_agree(query, rs - 1, qs - 1) {
                rs -= 1;
                qs -= 1;
            }
            matches.push(self.extend_right(query, (rs, qs), (r + k, q + k)));
        }

        matches
    }
}

impl MatchFinder for KmerMatchFinder<'_> {
    fn find_matches(&self, query: &[u8], unique_in_reference: bool) -> Box<dyn Iterator<Item = RawMatch> + '_> {
        if self.k == 0 || query.len() < self.k || self.table.is_empty() {
            return Box::new(std::iter::empty());
        }

        let mut matches = if unique_in_reference {
            self.unique_matches(query)
        } else {
            self.all_matches(query)
        };

        matches.sort_unstable_by_key(|m| (m.query_offset, m.reference_offset, m.length));
        matches.dedup();

        log::trace!(
            "Found {} matches of at least {} residues",
            matches.len(),
            self.k
        );

        Box::new(matches.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(reference: &[u8], query: &[u8], k: usize, unique: bool) -> Vec<(i64, i64, i64)> {
        let finder = KmerIndexer::new().index(reference, k);
        let found = finder
            .find_matches(query, unique)
            .map(|m| (m.reference_offset, m.query_offset, m.length))
            .collect();
        found
    }

    #[test]
    fn test_indexer_name() {
        assert_eq!(KmerIndexer::new().name(), "kmer");
    }

    #[test]
    fn test_single_maximal_match() {
        let reference = b"TTTTACGTACGGATCCAAAA";
        let query = b"GGACGTACGGATCCGG";
        // ACGTACGGATCC is shared: reference 4..16, query 2..14
        assert_eq!(matches(reference, query, 6, false), vec![(4, 2, 12)]);
    }

    #[test]
    fn test_mismatch_splits_matches() {
        let reference = b"ACGTACGTCATTGGCAGTCA";
        let query = b"ACGTACGTCAGTGGCAGTCA";
        assert_eq!(
            matches(reference, query, 5, false),
            vec![(0, 0, 10), (11, 11, 9)]
        );
    }

    #[test]
    fn test_repeated_seed_reports_every_copy() {
        let reference = b"GATTACAxxxxGATTACA";
        let query = b"GATTACA";
        assert_eq!(
            matches(reference, query, 7, false),
            vec![(0, 0, 7), (11, 0, 7)]
        );
        assert!(matches(reference, query, 7, true).is_empty());
    }

    #[test]
    fn test_unique_mode_walks_back_over_repeated_seeds() {
        // The first 4-mer AAAA is repeated in the reference, the rest of the
        // match is unique.
        let reference = b"AAAAGCCAAAACGTTGCA";
        let query = b"AAAACGTTGC";
        assert_eq!(matches(reference, query, 4, true), vec![(7, 0, 10)]);
    }

    #[test]
    fn test_separator_bounds_matches() {
        let reference = b"ACGTACG+TACGTT";
        let query = b"ACGTACGTACGTT";
        let found = matches(reference, query, 4, false);
        assert!(found.contains(&(0, 0, 7)));
        for (r, _, len) in found {
            let span = &reference[r as usize..(r + len) as usize];
            assert!(!span.contains(&SEPARATOR));
        }
    }

    #[test]
    fn test_short_query_yields_nothing() {
        assert!(matches(b"ACGTACGTAC", b"ACG", 4, false).is_empty());
        assert!(matches(b"ACG", b"ACGTACGT", 4, false).is_empty());
    }

    #[test]
    fn test_results_are_ordered() {
        let reference = b"CCCCGGGGAAAATTTT";
        let query = b"AAAATTTTCCCCGGGG";
        let found = matches(reference, query, 4, false);
        let mut sorted = found.clone();
        sorted.sort_by_key(|&(r, q, _)| (q, r));
        assert_eq!(found, sorted);
        assert_eq!(found, vec![(8, 0, 8), (0, 8, 8)]);
    }
}
