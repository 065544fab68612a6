//! Removal of duplicate and overlapping matches before clustering

use crate::types::MatchRecord;

/// Drop matches that can never take part in a cluster.
///
/// `matches` must be sorted by query offset. Matches on the same diagonal
/// whose query ranges overlap are merged into the earlier one. Matches that
/// start at the same reference or query offset and overlap by at least half
/// of the shorter one lose the shorter; equal lengths are resolved through a
/// tentative flag, in left-to-right scan order.
pub fn filter_matches(matches: Vec<MatchRecord>) -> Vec<MatchRecord> {
    let count = matches.len();
    let mut lengths: Vec<i64> = matches.iter().map(|m| m.length).collect();
    let mut good = vec![true; count];
    let mut tentative = vec![false; count];

    for first in 0..count.saturating_sub(1) {
        if !good[first] {
            continue;
        }

        let diagonal = matches[first].diagonal();
        let mut end_index = matches[first].query_offset + lengths[first];

        let mut second = first + 1;
        while second < count && matches[second].query_offset <= end_index {
            if !good[second] {
                second += 1;
                continue;
            }

            let (a, b) = (&matches[first], &matches[second]);
            if diagonal == b.diagonal() {
                let extent = lengths[second] + b.query_offset - a.query_offset;
                if extent > lengths[first] {
                    lengths[first] = extent;
                    end_index = a.query_offset + extent;
                }
                good[second] = false;
            } else if a.reference_offset == b.reference_offset || a.query_offset == b.query_offset {
                let overlap = if a.reference_offset == b.reference_offset {
                    a.query_offset + lengths[first] - b.query_offset
                } else {
                    a.reference_offset + lengths[first] - b.reference_offset
                };

                match resolve_perpendicular(lengths[first], lengths[second], overlap) {
                    Resolution::DropFirst => {
                        good[first] = false;
                        break;
                    }
                    Resolution::DropSecond => good[second] = false,
                    Resolution::Tie => {
                        tentative[second] = true;
                        if tentative[first] {
                            good[first] = false;
                            break;
                        }
                    }
                    Resolution::Keep => {}
                }
            }

            second += 1;
        }
    }

    matches
        .into_iter()
        .zip(lengths)
        .zip(good)
        .filter_map(|((record, length), keep)| {
            keep.then(|| MatchRecord { length, ..record })
        })
        .collect()
}

enum Resolution {
    Keep,
    DropFirst,
    DropSecond,
    Tie,
}

fn resolve_perpendicular(first_length: i64, second_length: i64, overlap: i64) -> Resolution {
    if first_length < second_length {
        if overlap >= first_length / 2 {
            return Resolution::DropFirst;
        }
    } else if second_length < first_length {
        if overlap >= second_length / 2 {
            return Resolution::DropSecond;
        }
    } else if overlap >= first_length / 2 {
        return Resolution::Tie;
    }
    Resolution::Keep
}
