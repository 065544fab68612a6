//! Greedy longest-chain extraction inside one union-find group

use crate::types::MatchRecord;

/// Per-match state of the chaining pass, indexed like the working group.
#[derive(Debug, Default)]
struct ChainScratch {
    score: Vec<i64>,
    from: Vec<Option<usize>>,
    in_chain: Vec<bool>,
}

impl ChainScratch {
    fn reset(&mut self, size: usize) {
        self.score.clear();
        self.from.clear();
        self.in_chain.clear();
        self.score.resize(size, 0);
        self.from.resize(size, None);
        self.in_chain.resize(size, false);
    }
}

/// Cost of chaining `next` after `previous`: the larger overlap on either
/// sequence plus the diagonal drift between them.
pub fn link_cost(previous: &MatchRecord, next: &MatchRecord) -> (i64, i64) {
    let reference_overlap = previous.reference_end() - next.reference_offset;
    let query_overlap = previous.query_end() - next.query_offset;
    let overlap = 0.max(reference_overlap).max(query_overlap);
    let cost = overlap + (next.diagonal() - previous.diagonal()).abs();
    (cost, overlap)
}

/// Reference span covered by a chain.
pub fn chain_span<'a>(chain: impl IntoIterator<Item = &'a MatchRecord>) -> i64 {
    let mut start = i64::MAX;
    let mut end = i64::MIN;
    for record in chain {
        start = start.min(record.reference_offset);
        end = end.max(record.reference_end());
    }
    end - start
}

/// Pull best-scoring chains out of `group` until it is empty.
///
/// Each chain whose reference span reaches `minimum_score` is returned in
/// group order; chains below the threshold are discarded.
pub fn extract_chains(mut group: Vec<MatchRecord>, minimum_score: i64) -> Vec<Vec<MatchRecord>> {
    let mut chains = Vec::new();
    let mut scratch = ChainScratch::default();

    while !group.is_empty() {
        let size = group.len();
        scratch.reset(size);

        for i in 0..size {
            scratch.score[i] = group[i].length;
            for j in 0..i {
                let (cost, _) = link_cost(&group[j], &group[i]);
                let candidate = scratch.score[j] + group[i].length - cost;
                if candidate > scratch.score[i] {
                    scratch.from[i] = Some(j);
                    scratch.score[i] = candidate;
                }
            }
        }

        let mut best = 0;
        for i in 1..size {
            if scratch.score[i] > scratch.score[best] {
                best = i;
            }
        }

        let mut cursor = Some(best);
        while let Some(i) = cursor {
            scratch.in_chain[i] = true;
            cursor = scratch.from[i];
        }

        let span = chain_span(
            group
                .iter()
                .zip(&scratch.in_chain)
                .filter(|(_, in_chain)| **in_chain)
                .map(|(record, _)| record),
        );

        log::trace!(
            "Chain ending at match {} scores {} with span {}",
            best,
            scratch.score[best],
            span
        );

        let (chain, rest): (Vec<_>, Vec<_>) = group
            .into_iter()
            .zip(scratch.in_chain.iter().copied())
            .partition(|(_, in_chain)| *in_chain);

        if span >= minimum_score {
            chains.push(chain.into_iter().map(|(record, _)| record).collect());
        }
        group = rest.into_iter().map(|(record, _)| record).collect();
    }

    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(reference_offset: i64, query_offset: i64, length: i64) -> MatchRecord {
        MatchRecord::new(reference_offset, query_offset, length, Arc::from("q"))
    }

    #[test]
    fn test_link_cost() {
        let (cost, overlap) = link_cost(&record(0, 0, 50), &record(100, 100, 50));
        assert_eq!((cost, overlap), (0, 0));

        // Overlapping on the query by 10, diagonal drift of 5
        let (cost, overlap) = link_cost(&record(0, 0, 50), &record(45, 40, 20));
        assert_eq!(overlap, 10);
        assert_eq!(cost, 15);
    }

    #[test]
    fn test_span_below_threshold_is_dropped() {
        let chains = extract_chains(vec![record(0, 0, 50), record(100, 100, 50)], 200);
        assert!(chains.is_empty());
    }

    #[test]
    fn test_span_at_threshold_is_kept() {
        let chains = extract_chains(vec![record(0, 0, 50), record(100, 100, 200)], 200);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 2);
        assert_eq!(chain_span(&chains[0]), 300);
    }

    #[test]
    fn test_single_match_chain() {
        let chains = extract_chains(vec![record(3, 7, 10)], 5);
        assert_eq!(chains, vec![vec![record(3, 7, 10)]]);
    }

    #[test]
    fn test_off_diagonal_match_gets_its_own_chain() {
        // The middle match drifts far off the diagonal, so it is left out of
        // the first chain and extracted on the second round.
        let group = vec![record(0, 0, 100), record(600, 150, 100), record(300, 300, 100)];
        let chains = extract_chains(group, 100);
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0], vec![record(0, 0, 100), record(300, 300, 100)]);
        assert_eq!(chains[1], vec![record(600, 150, 100)]);
    }

    #[test]
    fn test_first_best_wins_ties() {
        // Two disjoint chains of identical score; the earlier end is picked.
        let group = vec![record(0, 0, 100), record(5000, 10, 100)];
        let chains = extract_chains(group, 0);
        assert_eq!(chains[0], vec![record(0, 0, 100)]);
        assert_eq!(chains[1], vec![record(5000, 10, 100)]);
    }
}
