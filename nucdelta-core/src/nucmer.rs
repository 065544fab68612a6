//! NUCmer pipeline
//!
//! Ties the pieces together: the references are indexed once, every query
//! strand is matched against the index and clustered, and for delta output
//! the clusters are remapped per reference and grown into gapped alignments
//! with the pairwise extender.

use std::borrow::Cow;
use std::sync::Arc;

use rayon::prelude::*;

use crate::cluster::{Cluster, ClusterBuilder, ClusterParams};
use crate::config::NucmerConfig;
use crate::delta::DeltaAlignment;
use crate::error::{NucmerError, NucmerResult};
use crate::extend::{BandedExtender, ExtendMode, ExtenderParams, PairwiseExtender, MAXIMUM_ALIGNMENT_LENGTH};
use crate::seed::{KmerIndexer, MatchFinder, MatchIndexer};
use crate::synteny::{group_syntenies, QueryStrand, ReferenceSet, Synteny};
use crate::types::{Alphabet, MatchRecord, Sequence, Strand, REVERSE_SUFFIX};

/// Result of weighing the gap between two alignment endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapFit {
    /// Close enough to take without looking further
    Accept,
    /// Usable, ranked by `2 * gap_high - gap_low` (lower is better)
    Candidate(i64),
}

/// Gap-cost heuristic shared by the predecessor and successor searches.
#[derive(Debug, Clone, Copy)]
pub struct GapHeuristic {
    pub break_length: i64,
    pub valid_score: i64,
    pub substitution_score: i64,
}

impl GapHeuristic {
    pub fn new<E: PairwiseExtender + ?Sized>(break_length: i64, extender: &E) -> Self {
        Self {
            break_length,
            valid_score: extender.valid_score(),
            substitution_score: extender.substitution_score(),
        }
    }

    pub fn fit(&self, reference_gap: i64, query_gap: i64) -> GapFit {
        let (gap_high, gap_low) = if reference_gap > query_gap {
            (reference_gap, query_gap)
        } else {
            (query_gap, reference_gap)
        };

        if gap_high < self.break_length
            || gap_low * self.valid_score + (gap_high - gap_low) * self.substitution_score >= 0
        {
            GapFit::Accept
        } else {
            GapFit::Candidate((gap_high << 1) - gap_low)
        }
    }
}

/// Whether an alignment already emitted for the synteny covers the whole
/// span of `cluster`.
pub fn is_cluster_shadowed(alignments: &[DeltaAlignment], cluster: &Cluster) -> bool {
    let (Some(first), Some(last)) = (cluster.first(), cluster.last()) else {
        return false;
    };
    let reference_end = last.reference_offset + last.length - 1;
    let query_end = last.query_offset + last.length - 1;

    alignments.iter().any(|alignment| {
        alignment.query_direction == cluster.query_direction
            && alignment.contains(first.reference_offset, reference_end, first.query_offset, query_end)
    })
}

/// Pick the alignment in `others` that `current` should be joined to by a
/// backward extension, if any ends before `current` starts.
pub fn previous_alignment(
    others: &[DeltaAlignment],
    current: &DeltaAlignment,
    heuristic: &GapHeuristic,
) -> Option<usize> {
    let reference_start = current.first_sequence_start;
    let query_start = current.second_sequence_start;
    let mut distance = reference_start.min(query_start);
    let mut best = None;

    for (index, alignment) in others.iter().enumerate() {
        if alignment.query_direction != current.query_direction {
            continue;
        }
        if alignment.first_sequence_end > reference_start || alignment.second_sequence_end > query_start {
            continue;
        }

        match heuristic.fit(
            reference_start - alignment.first_sequence_end,
            query_start - alignment.second_sequence_end,
        ) {
            GapFit::Accept => return Some(index),
            GapFit::Candidate(score) if score < distance => {
                best = Some(index);
                distance = score;
            }
            GapFit::Candidate(_) => {}
        }
    }

    best
}

/// Pick the later cluster the alignment ending in `clusters[current]` should
/// be extended into.
///
/// `target` comes in as the sequence ends and is set to the match start to
/// aim for when a cluster is chosen.
pub fn next_cluster(
    clusters: &[Cluster],
    current: usize,
    heuristic: &GapHeuristic,
    target: &mut (i64, i64),
) -> Option<usize> {
    let cluster = &clusters[current];
    let last = cluster.last()?;
    let reference_start = last.reference_offset + last.length - 1;
    let query_start = last.query_offset + last.length - 1;

    let mut distance = (target.0 - reference_start).min(target.1 - query_start);
    let mut best = None;

    for (index, candidate) in clusters.iter().enumerate().skip(current + 1) {
        if candidate.query_direction != cluster.query_direction {
            continue;
        }
        let (Some(head), Some(tail)) = (candidate.first(), candidate.last()) else {
            continue;
        };

        let mut reference_end = head.reference_offset;
        let mut query_end = head.query_offset;

        // A cluster starting behind the current end can still be entered at
        // its first match lying past that end.
        if reference_end < reference_start
            && tail.reference_offset >= reference_start
            && tail.query_offset >= query_start
        {
            for record in &candidate.matches {
                if reference_end < reference_start || query_end < query_start {
                    reference_end = record.reference_offset;
                    query_end = record.query_offset;
                }
            }
        }

        if reference_end < reference_start || query_end < query_start {
            continue;
        }

        match heuristic.fit(reference_end - reference_start, query_end - query_start) {
            GapFit::Accept => {
                *target = (reference_end, query_end);
                return Some(index);
            }
            GapFit::Candidate(score) if score < distance => {
                best = Some(index);
                *target = (reference_end, query_end);
                distance = score;
            }
            GapFit::Candidate(_) => {}
        }
    }

    best
}

/// Whole-genome aligner driving match finding, clustering and extension.
pub struct Nucmer<I = KmerIndexer, E = BandedExtender> {
    config: NucmerConfig,
    indexer: I,
    extender: E,
}

impl Nucmer {
    /// Aligner with the built-in k-mer indexer and banded extender.
    pub fn new(config: NucmerConfig) -> NucmerResult<Self> {
        let extender = BandedExtender::new(ExtenderParams::from_config(&config));
        Self::with_components(config, KmerIndexer::new(), extender)
    }
}

impl<I: MatchIndexer, E: PairwiseExtender> Nucmer<I, E> {
    pub fn with_components(config: NucmerConfig, indexer: I, extender: E) -> NucmerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            indexer,
            extender,
        })
    }

    pub fn config(&self) -> &NucmerConfig {
        &self.config
    }

    /// Cluster the matches of every query strand against the references.
    ///
    /// Cluster coordinates are in the concatenated reference space. A strand
    /// without any match yields `None`.
    pub fn get_clusters(
        &self,
        references: &[Sequence],
        queries: &[Sequence],
        unique_in_reference: bool,
    ) -> NucmerResult<Vec<Option<Vec<Cluster>>>> {
        self.validate_inputs(references, queries)?;
        let reference_set = ReferenceSet::new(references)?;
        let strands = self.prepare_strands(references, queries)?;
        let finder = self
            .indexer
            .index(reference_set.residues(), self.config.length_of_mum as usize);

        log::info!(
            "Clustering {} query strands against {} references with {}",
            strands.len(),
            references.len(),
            self.indexer.name()
        );

        self.run_strands(&strands, |strand| {
            self.cluster_strand(finder.as_ref(), strand, unique_in_reference)
        })
    }

    /// Align every query strand against the references.
    ///
    /// Alignment coordinates are local to the reference named by
    /// `reference_sequence_id`. A strand without any match yields an empty
    /// list.
    pub fn get_delta_alignments(
        &self,
        references: &[Sequence],
        queries: &[Sequence],
        unique_in_reference: bool,
    ) -> NucmerResult<Vec<Vec<DeltaAlignment>>> {
        let alphabet = self.validate_inputs(references, queries)?;
        let reference_set = ReferenceSet::new(references)?;
        let strands = self.prepare_strands(references, queries)?;
        let finder = self
            .indexer
            .index(reference_set.residues(), self.config.length_of_mum as usize);

        log::info!(
            "Aligning {} query strands against {} references with {}",
            strands.len(),
            references.len(),
            self.indexer.name()
        );

        self.run_strands(&strands, |strand| {
            self.align_strand(&reference_set, finder.as_ref(), strand, unique_in_reference, alphabet)
        })
    }

    /// Check the inputs and return the alphabet every sequence shares.
    fn validate_inputs(&self, references: &[Sequence], queries: &[Sequence]) -> NucmerResult<Alphabet> {
        let first = references
            .first()
            .ok_or_else(|| NucmerError::empty_input("reference"))?;
        if queries.is_empty() {
            return Err(NucmerError::empty_input("query"));
        }

        let alphabet = first.alphabet;
        self.validate_sequence_list(references, alphabet)?;
        self.validate_sequence_list(queries, alphabet)?;

        if self.config.strand.includes_reverse() && !alphabet.is_nucleotide() {
            return Err(NucmerError::invalid_configuration(format!(
                "Reverse strand alignment needs a nucleotide alphabet, got {}",
                alphabet
            )));
        }

        Ok(alphabet)
    }

    fn validate_sequence_list(&self, sequences: &[Sequence], alphabet: Alphabet) -> NucmerResult<()> {
        let mut long_enough = false;
        for sequence in sequences {
            if !sequence.alphabet.is_compatible(alphabet) {
                return Err(NucmerError::AlphabetMismatch {
                    sequence_id: sequence.id.clone(),
                    expected: alphabet,
                    found: sequence.alphabet,
                });
            }
            if sequence.len() as i64 > self.config.length_of_mum {
                long_enough = true;
            }
        }

        if long_enough {
            Ok(())
        } else {
            Err(NucmerError::SequenceTooShort {
                length_of_mum: self.config.length_of_mum,
            })
        }
    }

    /// Query strands to process, in query order with the forward strand
    /// before the reverse one.
    fn prepare_strands<'q>(
        &self,
        references: &[Sequence],
        queries: &'q [Sequence],
    ) -> NucmerResult<Vec<QueryStrand<'q>>> {
        let mut strands = Vec::with_capacity(queries.len() * 2);

        for query in queries {
            if references.len() == 1 && *query == references[0] {
                log::debug!("Skipping query {} which is the reference itself", query.id);
                continue;
            }

            let residues = query
                .residues()
                .ok_or_else(|| NucmerError::unsupported_representation(query.id.clone()))?;

            if self.config.strand.includes_forward() {
                strands.push(QueryStrand {
                    sequence: query,
                    id: Arc::from(query.id.as_str()),
                    residues: Cow::Borrowed(residues),
                    direction: Strand::Forward,
                });
            }
            if self.config.strand.includes_reverse() {
                strands.push(QueryStrand {
                    sequence: query,
                    id: Arc::from(format!("{}{}", query.id, REVERSE_SUFFIX)),
                    residues: Cow::Owned(bio::alphabets::dna::revcomp(residues)),
                    direction: Strand::Reverse,
                });
            }
        }

        Ok(strands)
    }

    fn run_strands<'q, T, F>(&self, strands: &[QueryStrand<'q>], work: F) -> NucmerResult<Vec<T>>
    where
        T: Send,
        F: Fn(&QueryStrand<'q>) -> T + Sync + Send,
    {
        if !self.config.parallel {
            return Ok(strands.iter().map(|strand| work(strand)).collect());
        }

        let run = || strands.par_iter().map(|strand| work(strand)).collect::<Vec<_>>();
        if self.config.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
                .map_err(|e| NucmerError::invalid_configuration(format!("Failed to build thread pool: {}", e)))?;
            Ok(pool.install(run))
        } else {
            Ok(run())
        }
    }

    fn collect_matches(
        &self,
        finder: &dyn MatchFinder,
        strand: &QueryStrand<'_>,
        unique_in_reference: bool,
    ) -> Vec<MatchRecord> {
        finder
            .find_matches(&strand.residues, unique_in_reference)
            .enumerate()
            .map(|(order, raw)| MatchRecord::from_raw(raw, order as i64 + 1, Arc::clone(&strand.id)))
            .collect()
    }

    fn cluster_strand(
        &self,
        finder: &dyn MatchFinder,
        strand: &QueryStrand<'_>,
        unique_in_reference: bool,
    ) -> Option<Vec<Cluster>> {
        let matches = self.collect_matches(finder, strand, unique_in_reference);
        log::debug!("Query {} has {} matches", strand.id, matches.len());
        if matches.is_empty() {
            return None;
        }

        let builder = ClusterBuilder::new(ClusterParams::from_config(&self.config));
        let mut clusters = builder.build_clusters(matches);
        for cluster in &mut clusters {
            cluster.query_direction = strand.direction;
        }
        Some(clusters)
    }

    fn align_strand(
        &self,
        references: &ReferenceSet<'_>,
        finder: &dyn MatchFinder,
        strand: &QueryStrand<'_>,
        unique_in_reference: bool,
        alphabet: Alphabet,
    ) -> Vec<DeltaAlignment> {
        let Some(clusters) = self.cluster_strand(finder, strand, unique_in_reference) else {
            return Vec::new();
        };

        let mut syntenies = group_syntenies(references, strand, &clusters);
        let mut alignments = Vec::new();
        for synteny in &mut syntenies {
            let mut extended = self.extend_clusters(synteny);
            for alignment in &mut extended {
                let tally = alignment.tally(synteny.reference_residues, &strand.residues, alphabet);
                alignment.apply_tally(tally);
            }
            alignments.append(&mut extended);
        }

        log::debug!(
            "Query {} produced {} alignments from {} clusters",
            strand.id,
            alignments.len(),
            clusters.len()
        );
        alignments
    }

    /// Grow the clusters of one synteny into delta alignments.
    pub fn extend_clusters(&self, synteny: &mut Synteny<'_>) -> Vec<DeltaAlignment> {
        let reference = synteny.reference_residues;
        let query: &[u8] = &synteny.query.residues;
        let reference_id: Arc<str> = Arc::from(synteny.reference.id.as_str());
        let reference_length = reference.len() as i64;
        let query_length = query.len() as i64;
        let heuristic = GapHeuristic::new(self.config.break_length, &self.extender);

        let clusters = &mut synteny.clusters;
        clusters.sort_by_key(|c| c.first().map_or(0, |m| m.reference_offset));

        let mut alignments: Vec<DeltaAlignment> = Vec::new();
        let mut current: Option<usize> = None;
        let mut extended = false;
        let mut origin = 0;
        let mut index = 0;

        while index < clusters.len() {
            if !extended && (clusters[index].is_fused || is_cluster_shadowed(&alignments, &clusters[index])) {
                clusters[index].is_fused = true;
                origin += 1;
                index = origin;
                continue;
            }

            let direction = clusters[index].query_direction;
            let count = clusters[index].len();
            let mut target_cluster = None;

            for position in 0..count {
                let record = &clusters[index].matches[position];

                if extended {
                    let Some(alignment) = current.and_then(|i| alignments.get_mut(i)) else {
                        continue;
                    };
                    if alignment.first_sequence_end != record.reference_offset
                        || alignment.second_sequence_end != record.query_offset
                    {
                        continue;
                    }
                    alignment.first_sequence_end += record.length - 1;
                    alignment.second_sequence_end += record.length - 1;
                } else {
                    alignments.push(DeltaAlignment::new_alignment(
                        record,
                        direction,
                        Arc::clone(&reference_id),
                        reference_length,
                        query_length,
                    ));
                    let newest = alignments.len() - 1;
                    let target = previous_alignment(&alignments[..newest], &alignments[newest], &heuristic);
                    current = if self.extend_to_previous(reference, query, &mut alignments, target) {
                        target
                    } else {
                        Some(newest)
                    };
                }

                let Some(alignment) = current.and_then(|i| alignments.get_mut(i)) else {
                    continue;
                };

                if position + 1 < count {
                    let next = &clusters[index].matches[position + 1];
                    extended = self.extend_to_next(
                        reference,
                        query,
                        alignment,
                        next.reference_offset,
                        next.query_offset,
                        ExtendMode::FORWARD,
                    );
                } else {
                    let mut target = (reference_length - 1, query_length - 1);
                    target_cluster = next_cluster(clusters, index, &heuristic, &mut target);
                    let mode = if target_cluster.is_some() {
                        ExtendMode::FORWARD
                    } else {
                        ExtendMode::FORWARD.with_optimal().with_seq_end()
                    };
                    extended = self.extend_to_next(reference, query, alignment, target.0, target.1, mode);
                }
            }

            clusters[index].is_fused = true;
            match target_cluster {
                Some(target) if extended => index = target,
                _ => {
                    extended = false;
                    origin += 1;
                    index = origin;
                }
            }
        }

        log::trace!(
            "Synteny {} / {} extended into {} alignments",
            reference_id,
            synteny.query.id,
            alignments.len()
        );
        alignments
    }

    /// Extend `alignment` forward from its end to the target column.
    ///
    /// Returns whether the target was reached without truncation.
    fn extend_to_next(
        &self,
        reference: &[u8],
        query: &[u8],
        alignment: &mut DeltaAlignment,
        mut reference_target: i64,
        mut query_target: i64,
        mut mode: ExtendMode,
    ) -> bool {
        let diagonal = alignment.deltas.len();
        let mut overflow = false;
        let mut double_overflow = false;

        if reference_target - alignment.first_sequence_end + 1 > MAXIMUM_ALIGNMENT_LENGTH {
            reference_target = alignment.first_sequence_end + MAXIMUM_ALIGNMENT_LENGTH - 1;
            overflow = true;
            mode = mode.with_optimal();
        }
        if query_target - alignment.second_sequence_end + 1 > MAXIMUM_ALIGNMENT_LENGTH {
            query_target = alignment.second_sequence_end + MAXIMUM_ALIGNMENT_LENGTH - 1;
            if overflow {
                double_overflow = true;
            }
            overflow = true;
            mode = mode.with_optimal();
        }
        if double_overflow {
            mode = mode.without_seq_end();
        }

        let mut reached = self.extender.extend(
            reference,
            alignment.first_sequence_end,
            &mut reference_target,
            query,
            alignment.second_sequence_end,
            &mut query_target,
            &mut alignment.deltas,
            mode,
        );
        if overflow {
            reached = false;
        }

        if diagonal < alignment.deltas.len() {
            // The first new delta was counted from the old end; add the
            // aligned columns between the previous indel and that end.
            let distance =
                alignment.first_sequence_end - alignment.first_sequence_start - alignment.delta_reference_position;
            let first = &mut alignment.deltas[diagonal];
            *first += if *first > 0 { distance } else { -distance };

            let advance: i64 = alignment.deltas[diagonal..]
                .iter()
                .copied()
                .map(DeltaAlignment::reference_advance)
                .sum();
            alignment.delta_reference_position += advance;
        }

        alignment.first_sequence_end = reference_target;
        alignment.second_sequence_end = query_target;
        reached
    }

    /// Extend the newest alignment backward.
    ///
    /// When the backward search reaches `target`, that alignment is
    /// extended over the gap, takes over the newest alignment's end and the
    /// newest alignment is removed; `true` is returned. Otherwise the newest
    /// alignment's start is moved to the point the search reached.
    fn extend_to_previous(
        &self,
        reference: &[u8],
        query: &[u8],
        alignments: &mut Vec<DeltaAlignment>,
        target: Option<usize>,
    ) -> bool {
        let Some((current, others)) = alignments.split_last_mut() else {
            return false;
        };

        let mut mode = ExtendMode::BACKWARD;
        let (mut reference_target, mut query_target) = match target.and_then(|i| others.get(i)) {
            Some(previous) => (previous.first_sequence_end, previous.second_sequence_end),
            None => {
                mode = mode.with_optimal();
                (0, 0)
            }
        };

        let mut overflow = false;
        if current.first_sequence_start - reference_target + 1 > MAXIMUM_ALIGNMENT_LENGTH {
            reference_target = current.first_sequence_start - MAXIMUM_ALIGNMENT_LENGTH + 1;
            overflow = true;
            mode = mode.with_optimal();
        }
        if current.second_sequence_start - query_target + 1 > MAXIMUM_ALIGNMENT_LENGTH {
            query_target = current.second_sequence_start - MAXIMUM_ALIGNMENT_LENGTH + 1;
            overflow = true;
            mode = mode.with_optimal();
        }

        let mut search = Vec::new();
        let reached = self.extender.extend(
            reference,
            current.first_sequence_start,
            &mut reference_target,
            query,
            current.second_sequence_start,
            &mut query_target,
            &mut search,
            mode,
        );

        if reached && !overflow {
            if let Some(previous) = target.and_then(|i| others.get_mut(i)) {
                self.extend_to_next(
                    reference,
                    query,
                    previous,
                    current.first_sequence_start,
                    current.second_sequence_start,
                    ExtendMode::FORCED_FORWARD,
                );
                previous.first_sequence_end = current.first_sequence_end;
                previous.second_sequence_end = current.second_sequence_end;
                alignments.pop();
                return true;
            }
        }

        let mut reference_start = current.first_sequence_start;
        let mut query_start = current.second_sequence_start;
        if self.extender.extend(
            reference,
            reference_target,
            &mut reference_start,
            query,
            query_target,
            &mut query_start,
            &mut current.deltas,
            ExtendMode::FORCED_FORWARD,
        ) {
            current.first_sequence_start = reference_target;
            current.second_sequence_start = query_target;
            current.recompute_reference_position();
        }

        false
    }
}
