//! Clustering of exact matches
//!
//! Matches are sorted along the query, cleaned of duplicates and overlaps,
//! grouped with a union-find over near-diagonal neighbours and finally split
//! into chains that cover enough of the reference.

pub mod chain;
pub mod filter;
pub mod union_find;

use serde::{Deserialize, Serialize};

use crate::config::NucmerConfig;
use crate::types::{MatchRecord, Strand};
use union_find::UnionFind;

pub use filter::filter_matches;

/// An ordered run of mutually consistent matches from one query strand.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub matches: Vec<MatchRecord>,
    pub query_direction: Strand,
    pub is_fused: bool,
}

impl Cluster {
    pub fn new(matches: Vec<MatchRecord>) -> Self {
        Self::with_direction(matches, Strand::Forward)
    }

    pub fn with_direction(matches: Vec<MatchRecord>, query_direction: Strand) -> Self {
        Self {
            matches,
            query_direction,
            is_fused: false,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn first(&self) -> Option<&MatchRecord> {
        self.matches.first()
    }

    pub fn last(&self) -> Option<&MatchRecord> {
        self.matches.last()
    }
}

/// Parameters for cluster building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Diagonal difference tolerated regardless of distance
    pub fixed_separation: i64,
    /// Query distance beyond which matches are never joined
    pub maximum_separation: i64,
    /// Reference span a chain must cover to be emitted
    pub minimum_score: i64,
    /// Diagonal tolerance per residue of separation
    pub separation_factor: f32,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            fixed_separation: 5,
            maximum_separation: 1000,
            minimum_score: 200,
            separation_factor: 0.05,
        }
    }
}

impl ClusterParams {
    /// Take the configured values, keeping defaults where the
    /// configuration holds a negative value.
    pub fn from_config(config: &NucmerConfig) -> Self {
        let defaults = Self::default();
        Self {
            fixed_separation: if config.fixed_separation > -1 {
                config.fixed_separation
            } else {
                defaults.fixed_separation
            },
            maximum_separation: if config.maximum_separation > -1 {
                config.maximum_separation
            } else {
                defaults.maximum_separation
            },
            minimum_score: if config.minimum_score > -1 {
                config.minimum_score
            } else {
                defaults.minimum_score
            },
            separation_factor: if config.separation_factor > -1.0 {
                config.separation_factor
            } else {
                defaults.separation_factor
            },
        }
    }

    /// Diagonal difference allowed between two matches `separation` apart.
    pub fn diagonal_tolerance(&self, separation: i64) -> f64 {
        (self.fixed_separation as f64).max(self.separation_factor as f64 * separation as f64)
    }
}

/// Builds clusters from the matches of one query.
pub struct ClusterBuilder {
    params: ClusterParams,
}

impl ClusterBuilder {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    /// Cluster `matches`. An empty input yields no clusters.
    ///
    /// All matches are expected to come from the same query strand; the
    /// returned clusters are tagged with [`Strand::Forward`] and callers
    /// retag them for reverse strands.
    pub fn build_clusters(&self, mut matches: Vec<MatchRecord>) -> Vec<Cluster> {
        if matches.is_empty() {
            return Vec::new();
        }

        let input_count = matches.len();
        matches.sort_by_key(|m| m.query_offset);
        let matches = filter_matches(matches);
        log::debug!(
            "Filtering kept {} of {} matches",
            matches.len(),
            input_count
        );

        let cluster_ids = self.group_by_diagonal(&matches);

        let mut labelled: Vec<(usize, MatchRecord)> = cluster_ids.into_iter().zip(matches).collect();
        labelled.sort_by(|(a_id, a), (b_id, b)| {
            a_id.cmp(b_id)
                .then(a.query_offset.cmp(&b.query_offset))
                .then(a.reference_offset.cmp(&b.reference_offset))
        });

        let mut clusters = Vec::new();
        let mut iter = labelled.into_iter().peekable();
        while let Some((id, first)) = iter.next() {
            let mut group = vec![first];
            while let Some((_, record)) = iter.next_if(|(next_id, _)| *next_id == id) {
                group.push(record);
            }

            clusters.extend(
                chain::extract_chains(group, self.params.minimum_score)
                    .into_iter()
                    .map(Cluster::new),
            );
        }

        log::debug!("Built {} clusters", clusters.len());
        clusters
    }

    /// Union-find root of every match, joining pairs that lie within
    /// `maximum_separation` along the query and close enough in diagonal.
    fn group_by_diagonal(&self, matches: &[MatchRecord]) -> Vec<usize> {
        let mut sets = UnionFind::new(matches.len());

        for i in 0..matches.len().saturating_sub(1) {
            let end_index = matches[i].query_end();
            let diagonal = matches[i].diagonal();

            for j in i + 1..matches.len() {
                let separation = matches[j].query_offset - end_index;
                if separation > self.params.maximum_separation {
                    break;
                }

                let difference = (matches[j].diagonal() - diagonal).abs();
                if difference as f64 <= self.params.diagonal_tolerance(separation) {
                    let first = sets.find(i);
                    let second = sets.find(j);
                    if first != second {
                        sets.union(first, second);
                    }
                }
            }
        }

        (0..matches.len()).map(|i| sets.find(i)).collect()
    }
}

impl Default for ClusterBuilder {
    fn default() -> Self {
        Self::new(ClusterParams::default())
    }
}
