//! NucDelta Core Library
//!
//! Whole-genome alignment in the NUCmer style: exact matches are clustered
//! along near-diagonal paths and the clusters are extended into
//! delta-encoded gapped alignments.

pub mod types;
pub mod error;
pub mod config;
pub mod cluster;
pub mod synteny;
pub mod delta;
pub mod extend;
pub mod seed;
pub mod nucmer;
#[cfg(feature = "io-delta")] pub mod io;

// Re-export commonly used types and functions
pub use types::{Alphabet, MatchRecord, RawMatch, Sequence, SequenceData, Strand};
pub use error::{NucmerError, NucmerResult};
pub use config::{ExtenderConfig, NucmerConfig, StrandSelection};
pub use cluster::{Cluster, ClusterBuilder, ClusterParams};
pub use synteny::{ReferenceSet, Synteny};
pub use delta::{DeltaAlignment, PairwiseAlignedSequence};
pub use extend::{BandedExtender, ExtendMode, PairwiseExtender};
pub use seed::{KmerIndexer, MatchFinder, MatchIndexer};
pub use nucmer::Nucmer;
#[cfg(feature = "io-delta")]
pub use io::DeltaWriter;

/// Version information for the NucDelta core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
