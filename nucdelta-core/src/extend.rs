//! Pairwise extension between anchored positions
//!
//! The orchestrator grows alignments by asking an extender to align from an
//! anchor (an aligned column already in the alignment) toward a target
//! column. Bounded calls align the region between the two with a banded
//! global alignment; optimal calls walk ungapped as far as the score allows.

use std::cmp::min;

use crate::config::NucmerConfig;

/// Longest stretch a single extension call is asked to cover.
pub const MAXIMUM_ALIGNMENT_LENGTH: i64 = 10000;

/// Default distance an extension tolerates without score improvement.
pub const DEFAULT_BREAK_LENGTH: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// How an extension call behaves.
///
/// * `optimal` - extend to the best score, the target only bounds the walk
/// * `seq_end` - the target is a sequence end, prefer the furthest of equal
///   scores
/// * `forced` - a bounded call must reach the target whatever the score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendMode {
    pub direction: Direction,
    pub optimal: bool,
    pub seq_end: bool,
    pub forced: bool,
}

impl ExtendMode {
    pub const FORWARD: Self = Self {
        direction: Direction::Forward,
        optimal: false,
        seq_end: false,
        forced: false,
    };

    pub const BACKWARD: Self = Self {
        direction: Direction::Backward,
        optimal: false,
        seq_end: false,
        forced: false,
    };

    pub const FORCED_FORWARD: Self = Self {
        direction: Direction::Forward,
        optimal: false,
        seq_end: false,
        forced: true,
    };

    pub fn with_optimal(self) -> Self {
        Self { optimal: true, ..self }
    }

    pub fn with_seq_end(self) -> Self {
        Self { seq_end: true, ..self }
    }

    pub fn without_seq_end(self) -> Self {
        Self { seq_end: false, ..self }
    }
}

/// The alignment primitive used to grow delta alignments.
pub trait PairwiseExtender: Send + Sync {
    /// Score of an aligned identical residue pair.
    fn valid_score(&self) -> i64;

    /// Score charged per residue of gap.
    fn substitution_score(&self) -> i64;

    /// Extend from the anchor column toward the target column.
    ///
    /// Forward calls append the deltas of the new columns to `deltas`,
    /// counted with the anchor as column 1. Backward calls only search and
    /// leave `deltas` alone. On return the targets hold the column actually
    /// reached. Returns whether the requested target was reached.
    #[allow(clippy::too_many_arguments)]
    fn extend(
        &self,
        reference: &[u8],
        reference_anchor: i64,
        reference_target: &mut i64,
        query: &[u8],
        query_anchor: i64,
        query_target: &mut i64,
        deltas: &mut Vec<i64>,
        mode: ExtendMode,
    ) -> bool;
}

/// Parameters for the banded extender
#[derive(Debug, Clone)]
pub struct ExtenderParams {
    pub match_score: i32,
    pub mismatch_score: i32,
    /// Linear gap score per residue
    pub gap_score: i32,
    /// Columns tolerated past the best score before an extension stops
    pub break_length: i64,
    /// Diagonals kept on both sides of the band
    pub band_slack: usize,
    /// Cell budget of one banded alignment
    pub max_band_cells: usize,
}

impl Default for ExtenderParams {
    fn default() -> Self {
        Self {
            match_score: 3,
            mismatch_score: -7,
            gap_score: -7,
            break_length: DEFAULT_BREAK_LENGTH,
            band_slack: 32,
            max_band_cells: 16_000_000,
        }
    }
}

impl ExtenderParams {
    pub fn from_config(config: &NucmerConfig) -> Self {
        Self {
            match_score: config.extender.match_score,
            mismatch_score: config.extender.mismatch_score,
            gap_score: config.extender.gap_score,
            break_length: config.break_length,
            band_slack: config.extender.band_slack,
            max_band_cells: config.extender.max_band_cells,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TracebackOp {
    None,
    /// Reference and query residue in one column
    Match,
    /// Reference residue opposite a gap
    Delete,
    /// Query residue opposite a gap
    Insert,
}

/// Banded dynamic programming extender.
pub struct BandedExtender {
    params: ExtenderParams,
}

impl BandedExtender {
    pub fn new(params: ExtenderParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ExtenderParams {
        &self.params
    }

    fn pair_score(&self, a: u8, b: u8) -> i32 {
        if a.eq_ignore_ascii_case(&b) {
            self.params.match_score
        } else {
            self.params.mismatch_score
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn extend_bounded(
        &self,
        reference: &[u8],
        reference_anchor: i64,
        reference_target: &mut i64,
        query: &[u8],
        query_anchor: i64,
        query_target: &mut i64,
        deltas: &mut Vec<i64>,
        mode: ExtendMode,
    ) -> bool {
        let backward = mode.direction == Direction::Backward;
        let (reference_distance, query_distance) = if backward {
            (reference_anchor - *reference_target, query_anchor - *query_target)
        } else {
            (*reference_target - reference_anchor, *query_target - query_anchor)
        };

        if reference_distance == 0 && query_distance == 0 {
            return true;
        }
        if reference_distance <= 0 || query_distance <= 0 {
            *reference_target = reference_anchor;
            *query_target = query_anchor;
            return false;
        }

        let (interior_reference, interior_query): (Vec<u8>, Vec<u8>) = if backward {
            (
                reference[(*reference_target + 1) as usize..reference_anchor as usize]
                    .iter()
                    .rev()
                    .copied()
                    .collect(),
                query[(*query_target + 1) as usize..query_anchor as usize]
                    .iter()
                    .rev()
                    .copied()
                    .collect(),
            )
        } else {
            (
                reference[(reference_anchor + 1) as usize..*reference_target as usize].to_vec(),
                query[(query_anchor + 1) as usize..*query_target as usize].to_vec(),
            )
        };
        let closing = (
            reference[*reference_target as usize],
            query[*query_target as usize],
        );

        let path = self.global_path(&interior_reference, &interior_query);
        let cut = if mode.forced {
            None
        } else {
            self.break_point(&interior_reference, &interior_query, closing, &path)
        };
        let kept = match cut {
            Some(columns) => &path[..columns],
            None => &path[..],
        };

        let (mut reference_used, mut query_used) = consumed(kept);
        if cut.is_none() {
            reference_used += 1;
            query_used += 1;
        }

        if backward {
            *reference_target = reference_anchor - reference_used;
            *query_target = query_anchor - query_used;
        } else {
            append_deltas(kept, deltas);
            *reference_target = reference_anchor + reference_used;
            *query_target = query_anchor + query_used;
        }

        cut.is_none()
    }

    #[allow(clippy::too_many_arguments)]
    fn extend_optimal(
        &self,
        reference: &[u8],
        reference_anchor: i64,
        reference_target: &mut i64,
        query: &[u8],
        query_anchor: i64,
        query_target: &mut i64,
        mode: ExtendMode,
    ) -> bool {
        let step: i64 = match mode.direction {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };
        let limit = min(
            (*reference_target - reference_anchor) * step,
            (*query_target - query_anchor) * step,
        )
        .max(0);

        let mut score = 0i64;
        let mut best = 0i64;
        let mut best_step = 0i64;
        for position in 1..=limit {
            let r = reference[(reference_anchor + step * position) as usize];
            let q = query[(query_anchor + step * position) as usize];
            score += self.pair_score(r, q) as i64;
            if score > best || (mode.seq_end && score == best) {
                best = score;
                best_step = position;
            } else if position - best_step > self.params.break_length {
                break;
            }
        }

        *reference_target = reference_anchor + step * best_step;
        *query_target = query_anchor + step * best_step;
        best_step == limit
    }

    /// Number of path columns kept when the running score falls behind its
    /// best for more than `break_length` columns, or `None` when the path
    /// holds through the closing column.
    fn break_point(
        &self,
        reference: &[u8],
        query: &[u8],
        closing: (u8, u8),
        path: &[TracebackOp],
    ) -> Option<usize> {
        let (mut i, mut j) = (0usize, 0usize);
        let mut score = 0i64;
        let mut best = 0i64;
        let mut best_columns = 0usize;
        let total = path.len() + 1;

        for column in 1..=total {
            let gain = if column == total {
                self.pair_score(closing.0, closing.1)
            } else {
                match path[column - 1] {
                    TracebackOp::Match => {
                        let gain = self.pair_score(reference[i], query[j]);
                        i += 1;
                        j += 1;
                        gain
                    }
                    TracebackOp::Delete => {
                        i += 1;
                        self.params.gap_score
                    }
                    TracebackOp::Insert => {
                        j += 1;
                        self.params.gap_score
                    }
                    TracebackOp::None => 0,
                }
            };

            score += gain as i64;
            if score > best {
                best = score;
                best_columns = column;
            } else if (column - best_columns) as i64 > self.params.break_length {
                return Some(best_columns);
            }
        }

        None
    }

    /// Banded global alignment of the residues strictly between anchor and
    /// target.
    fn global_path(&self, reference: &[u8], query: &[u8]) -> Vec<TracebackOp> {
        let n = reference.len();
        let m = query.len();
        if n == 0 || m == 0 {
            return fallback_path(n, m);
        }

        let slack = self.params.band_slack as i64;
        let shift = m as i64 - n as i64;
        let lo = shift.min(0) - slack;
        let hi = shift.max(0) + slack;
        let width = (hi - lo + 1) as usize;

        if (n + 1).saturating_mul(width) > self.params.max_band_cells {
            log::debug!(
                "Band of {}x{} over budget, using a direct path for {} x {} residues",
                n + 1,
                width,
                n,
                m
            );
            return fallback_path(n, m);
        }

        let gap = self.params.gap_score;
        let unreachable = i32::MIN / 4;
        let mut previous = vec![unreachable; width];
        let mut current = vec![unreachable; width];
        let mut traceback = vec![TracebackOp::None; (n + 1) * width];

        // Row 0: only gaps in the reference
        for k in 0..width {
            let j = lo + k as i64;
            if (0..=m as i64).contains(&j) {
                previous[k] = gap * j as i32;
                if j > 0 {
                    traceback[k] = TracebackOp::Insert;
                }
            }
        }

        for i in 1..=n {
            current.fill(unreachable);
            for k in 0..width {
                let j = i as i64 + lo + k as i64;
                if j < 0 || j > m as i64 {
                    continue;
                }
                let j = j as usize;

                let mut best_score = unreachable;
                let mut best_op = TracebackOp::None;

                if j > 0 && previous[k] > unreachable {
                    let candidate = previous[k] + self.pair_score(reference[i - 1], query[j - 1]);
                    if candidate > best_score {
                        best_score = candidate;
                        best_op = TracebackOp::Match;
                    }
                }

                if k + 1 < width && previous[k + 1] > unreachable {
                    let candidate = previous[k + 1] + gap;
                    if candidate > best_score {
                        best_score = candidate;
                        best_op = TracebackOp::Delete;
                    }
                }

                if k > 0 && j > 0 && current[k - 1] > unreachable {
                    let candidate = current[k - 1] + gap;
                    if candidate > best_score {
                        best_score = candidate;
                        best_op = TracebackOp::Insert;
                    }
                }

                current[k] = best_score;
                traceback[i * width + k] = best_op;
            }
            std::mem::swap(&mut previous, &mut current);
        }

        let mut ops = Vec::with_capacity(n + m);
        let (mut i, mut j) = (n, m);
        let mut k = (shift - lo) as usize;
        while i > 0 || j > 0 {
            let op = traceback[i * width + k];
            match op {
                TracebackOp::Match => {
                    i -= 1;
                    j -= 1;
                }
                TracebackOp::Delete => {
                    i -= 1;
                    k += 1;
                }
                TracebackOp::Insert => {
                    j -= 1;
                    k -= 1;
                }
                TracebackOp::None => break,
            }
            ops.push(op);
        }

        if i > 0 || j > 0 {
            log::warn!("Incomplete traceback at ({}, {}), using a direct path", i, j);
            return fallback_path(n, m);
        }

        ops.reverse();
        ops
    }
}

impl Default for BandedExtender {
    fn default() -> Self {
        Self::new(ExtenderParams::default())
    }
}

impl PairwiseExtender for BandedExtender {
    fn valid_score(&self) -> i64 {
        self.params.match_score as i64
    }

    fn substitution_score(&self) -> i64 {
        self.params.gap_score as i64
    }

    fn extend(
        &self,
        reference: &[u8],
        reference_anchor: i64,
        reference_target: &mut i64,
        query: &[u8],
        query_anchor: i64,
        query_target: &mut i64,
        deltas: &mut Vec<i64>,
        mode: ExtendMode,
    ) -> bool {
        if reference.is_empty() || query.is_empty() {
            *reference_target = reference_anchor;
            *query_target = query_anchor;
            return false;
        }

        *reference_target = (*reference_target).clamp(0, reference.len() as i64 - 1);
        *query_target = (*query_target).clamp(0, query.len() as i64 - 1);

        if mode.optimal {
            self.extend_optimal(
                reference,
                reference_anchor,
                reference_target,
                query,
                query_anchor,
                query_target,
                mode,
            )
        } else {
            self.extend_bounded(
                reference,
                reference_anchor,
                reference_target,
                query,
                query_anchor,
                query_target,
                deltas,
                mode,
            )
        }
    }
}

/// Diagonal run followed by the leftover gap, for regions too large to band.
fn fallback_path(n: usize, m: usize) -> Vec<TracebackOp> {
    let mut ops = vec![TracebackOp::Match; min(n, m)];
    if n > m {
        ops.extend(std::iter::repeat(TracebackOp::Delete).take(n - m));
    } else {
        ops.extend(std::iter::repeat(TracebackOp::Insert).take(m - n));
    }
    ops
}

/// Reference and query residues covered by `path`.
fn consumed(path: &[TracebackOp]) -> (i64, i64) {
    path.iter().fold((0, 0), |(r, q), op| match op {
        TracebackOp::Match => (r + 1, q + 1),
        TracebackOp::Delete => (r + 1, q),
        TracebackOp::Insert => (r, q + 1),
        TracebackOp::None => (r, q),
    })
}

/// Deltas of `path`, with the anchor counted as the first column.
fn append_deltas(path: &[TracebackOp], deltas: &mut Vec<i64>) {
    let mut since = 1i64;
    for op in path {
        since += 1;
        match op {
            TracebackOp::Delete => {
                deltas.push(since);
                since = 0;
            }
            TracebackOp::Insert => {
                deltas.push(-since);
                since = 0;
            }
            TracebackOp::Match | TracebackOp::None => {}
        }
    }
}
