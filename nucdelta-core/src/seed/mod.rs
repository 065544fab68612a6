//! Exact-match finders
//!
//! The pipeline indexes the reference buffer once and then asks the index for
//! the exact matches of every query strand. The index is shared read-only
//! between worker threads.

pub mod kmer;

pub use kmer::{KmerIndexer, KmerMatchFinder};

use crate::types::RawMatch;

/// Builds a reusable match index over a reference buffer.
pub trait MatchIndexer: Send + Sync {
    /// Index `reference` for matches of at least `min_length` residues.
    fn index<'r>(&self, reference: &'r [u8], min_length: usize) -> Box<dyn MatchFinder + 'r>;

    /// Get the name/identifier of this indexer
    fn name(&self) -> &'static str;
}

/// Reports the exact matches of a query against an indexed reference.
pub trait MatchFinder: Sync {
    /// Maximal exact matches of `query`, ordered by query offset and then
    /// reference offset.
    ///
    /// With `unique_in_reference` set only matches anchored on a seed that
    /// occurs once in the reference are reported.
    fn find_matches(&self, query: &[u8], unique_in_reference: bool) -> Box<dyn Iterator<Item = RawMatch> + '_>;
}
