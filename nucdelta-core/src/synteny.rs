//! Reference coordinate space and synteny grouping
//!
//! Several references are searched as one concatenated buffer. After
//! clustering, every match is mapped back onto the reference it falls in and
//! the clusters are regrouped per (reference, query strand) pair.

use std::borrow::Cow;
use std::sync::Arc;

use crate::cluster::chain::link_cost;
use crate::cluster::Cluster;
use crate::error::{NucmerError, NucmerResult};
use crate::types::{MatchRecord, Sequence, Strand, SEPARATOR};

/// Where one reference lives inside the concatenated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSpan {
    pub index: usize,
    pub offset: i64,
    pub length: i64,
}

/// The references of one run, addressable as a single buffer.
#[derive(Debug)]
pub struct ReferenceSet<'a> {
    sequences: &'a [Sequence],
    spans: Vec<ReferenceSpan>,
    residues: Cow<'a, [u8]>,
}

impl<'a> ReferenceSet<'a> {
    /// A lone reference is used as is and must be contiguous. Several
    /// references are copied into one buffer, each followed by the
    /// separator byte.
    pub fn new(sequences: &'a [Sequence]) -> NucmerResult<Self> {
        match sequences {
            [] => Err(NucmerError::empty_input("reference")),
            [single] => {
                let residues = single
                    .residues()
                    .ok_or_else(|| NucmerError::unsupported_representation(single.id.clone()))?;
                Ok(Self {
                    sequences,
                    spans: vec![ReferenceSpan {
                        index: 0,
                        offset: 0,
                        length: residues.len() as i64,
                    }],
                    residues: Cow::Borrowed(residues),
                })
            }
            _ => {
                let total: usize = sequences.iter().map(|s| s.len() + 1).sum();
                let mut residues = Vec::with_capacity(total);
                let mut spans = Vec::with_capacity(sequences.len());

                for (index, sequence) in sequences.iter().enumerate() {
                    let offset = residues.len() as i64;
                    for chunk in sequence.chunks() {
                        residues.extend_from_slice(chunk);
                    }
                    spans.push(ReferenceSpan {
                        index,
                        offset,
                        length: residues.len() as i64 - offset,
                    });
                    residues.push(SEPARATOR);
                }

                log::info!(
                    "Concatenated {} references into {} residues",
                    sequences.len(),
                    residues.len()
                );

                Ok(Self {
                    sequences,
                    spans,
                    residues: Cow::Owned(residues),
                })
            }
        }
    }

    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    pub fn sequence(&self, index: usize) -> &'a Sequence {
        &self.sequences[index]
    }

    /// Residues of one reference, borrowed from the shared buffer.
    pub fn reference_residues(&self, index: usize) -> &[u8] {
        let span = self.spans[index];
        &self.residues[span.offset as usize..(span.offset + span.length) as usize]
    }

    /// Map an offset in the shared buffer to `(reference index, local offset)`.
    ///
    /// Offsets that land on a separator belong to no reference.
    pub fn locate(&self, offset: i64) -> Option<(usize, i64)> {
        for span in &self.spans {
            if offset >= span.offset && offset < span.offset + span.length {
                return Some((span.index, offset - span.offset));
            }
        }
        None
    }
}

/// One strand of a query as fed to the pipeline.
#[derive(Debug, Clone)]
pub struct QueryStrand<'a> {
    pub sequence: &'a Sequence,
    pub id: Arc<str>,
    pub residues: Cow<'a, [u8]>,
    pub direction: Strand,
}

/// Clusters between one reference and one query strand, in reference-local
/// coordinates.
#[derive(Debug)]
pub struct Synteny<'s> {
    pub reference_index: usize,
    pub reference: &'s Sequence,
    pub reference_residues: &'s [u8],
    pub query: &'s QueryStrand<'s>,
    pub clusters: Vec<Cluster>,
}

impl<'s> Synteny<'s> {
    fn new(references: &'s ReferenceSet<'_>, reference_index: usize, query: &'s QueryStrand<'s>) -> Self {
        Self {
            reference_index,
            reference: references.sequence(reference_index),
            reference_residues: references.reference_residues(reference_index),
            query,
            clusters: Vec::new(),
        }
    }

    /// Start a new cluster unless the last one is still empty.
    fn open_cluster(&mut self, direction: Strand) {
        if self.clusters.last().map_or(true, |c| !c.is_empty()) {
            self.clusters.push(Cluster::with_direction(Vec::new(), direction));
        }
    }

    /// Append to the open cluster, trimming the part that overlaps the
    /// previously kept match. Matches of length 1 or less are skipped.
    fn push_match(&mut self, mut record: MatchRecord) {
        let Some(cluster) = self.clusters.last_mut() else {
            return;
        };
        if let Some(last) = cluster.matches.last() {
            let (_, overlap) = link_cost(last, &record);
            if overlap > 0 {
                record.reference_offset += overlap;
                record.query_offset += overlap;
                record.length -= overlap;
            }
        }
        if record.length > 1 {
            cluster.matches.push(record);
        }
    }
}

/// Remap clustered matches onto their references and group them.
///
/// The query strand is fixed for one call, so a synteny is keyed by the
/// reference index alone.
pub fn group_syntenies<'s>(
    references: &'s ReferenceSet<'_>,
    query: &'s QueryStrand<'s>,
    clusters: &[Cluster],
) -> Vec<Synteny<'s>> {
    let mut syntenies: Vec<Synteny<'s>> = Vec::new();
    let mut current: Option<usize> = None;
    let mut previous_reference: Option<usize> = None;

    for cluster in clusters {
        if let Some(index) = current {
            syntenies[index].open_cluster(cluster.query_direction);
        }

        for record in &cluster.matches {
            let Some((reference_index, local_offset)) = references.locate(record.reference_offset) else {
                log::warn!(
                    "Match at reference offset {} falls on a separator, skipping",
                    record.reference_offset
                );
                continue;
            };

            if previous_reference != Some(reference_index) {
                previous_reference = Some(reference_index);
                let index = match syntenies.iter().position(|s| s.reference_index == reference_index) {
                    Some(index) => index,
                    None => {
                        syntenies.push(Synteny::new(references, reference_index, query));
                        syntenies.len() - 1
                    }
                };
                syntenies[index].open_cluster(cluster.query_direction);
                current = Some(index);
            }

            if let Some(index) = current {
                syntenies[index].push_match(MatchRecord {
                    reference_offset: local_offset,
                    ..record.clone()
                });
            }
        }
    }

    for synteny in &mut syntenies {
        synteny.clusters.retain(|c| !c.is_empty());
    }
    syntenies.retain(|s| !s.clusters.is_empty());

    log::debug!(
        "Query {} grouped into {} syntenies",
        query.id,
        syntenies.len()
    );
    syntenies
}
