//! The two Nexus set encodings, normalized to 0-based half-open intervals.
//!
//! Standard encoding lists 1-based inclusive positions and ranges
//! (`1-3 5 8-12\2 ALL .` plus references to previously named sets of the
//! same kind); vector encoding is a bitstring where every maximal `1`-run
//! becomes one interval. Both produce identical interval shapes, so CHARSET,
//! TAXSET, and TREESET readers share this module.

use crate::error::StreamError;
use std::collections::HashMap;

/// Parses standard-encoding tokens into 0-based half-open intervals.
///
/// # Arguments
/// * `tokens` - whitespace-separated items of the set definition
/// * `last_index` - the 1-based highest valid position (`ALL` and `.` need
///   it; `None` makes those tokens an error)
/// * `named` - previously defined sets of the same kind, for references
///
/// # Errors
/// Returns InvalidObjectData for malformed positions, reversed ranges,
/// zero positions (the encoding is 1-based), unresolvable references, or
/// `ALL`/`.` without a known last index.
pub(crate) fn standard_to_intervals(
    tokens: &[String],
    last_index: Option<u64>,
    named: &HashMap<String, Vec<(u64, u64)>>,
) -> Result<Vec<(u64, u64)>, StreamError> {
    let mut intervals = Vec::new();

    for token in tokens {
        if token.eq_ignore_ascii_case("ALL") {
            let last = require_last_index(last_index, token)?;
            intervals.push((0, last));
            continue;
        }
        if token == "." {
            let last = require_last_index(last_index, token)?;
            intervals.push((last - 1, last));
            continue;
        }
        if let Some(reference) = named.get(&token.to_ascii_uppercase()) {
            intervals.extend(reference.iter().copied());
            continue;
        }

        // Positions and ranges: `a`, `a-b`, `a-.`, `a-b\k`
        let (range, step) = match token.split_once('\\') {
            Some((range, step)) => {
                let step: u64 = step.parse().map_err(|_| {
                    StreamError::invalid_object_data(format!("invalid set step: '{token}'"))
                })?;
                if step == 0 {
                    return Err(StreamError::invalid_object_data(format!(
                        "set step must be positive: '{token}'"
                    )));
                }
                (range, step)
            }
            None => (token.as_str(), 1),
        };

        let (first, last) = match range.split_once('-') {
            Some((first, last)) => {
                let first = parse_position(first, token)?;
                let last = if last == "." {
                    require_last_index(last_index, token)?
                } else {
                    parse_position(last, token)?
                };
                (first, last)
            }
            None => {
                let position = parse_position(range, token)?;
                (position, position)
            }
        };
        if first > last {
            return Err(StreamError::invalid_object_data(format!(
                "reversed set range: '{token}'"
            )));
        }

        if step == 1 {
            intervals.push((first - 1, last));
        } else {
            let mut position = first;
            while position <= last {
                intervals.push((position - 1, position));
                position += step;
            }
        }
    }

    Ok(merge_intervals(intervals))
}

/// Parses vector-encoding bits into 0-based half-open intervals: each
/// maximal `1`-run becomes one interval.
///
/// # Errors
/// Returns InvalidObjectData for characters other than `0` and `1`.
pub(crate) fn vector_to_intervals(bits: &str) -> Result<Vec<(u64, u64)>, StreamError> {
    let mut intervals = Vec::new();
    let mut run_start: Option<u64> = None;

    for (i, c) in bits.chars().enumerate() {
        let i = i as u64;
        match c {
            '1' => {
                if run_start.is_none() {
                    run_start = Some(i);
                }
            }
            '0' => {
                if let Some(start) = run_start.take() {
                    intervals.push((start, i));
                }
            }
            other => {
                return Err(StreamError::invalid_object_data(format!(
                    "invalid vector set character: '{other}'"
                )));
            }
        }
    }
    if let Some(start) = run_start {
        intervals.push((start, bits.chars().count() as u64));
    }

    Ok(intervals)
}

/// Expands intervals over a declaration-ordered element list into IDs.
///
/// # Errors
/// Returns InvalidObjectData if an interval reaches past the list.
pub(crate) fn intervals_to_ids(
    intervals: &[(u64, u64)],
    order: &[String],
) -> Result<Vec<String>, StreamError> {
    let mut ids = Vec::new();
    for &(first, last) in intervals {
        if last as usize > order.len() {
            return Err(StreamError::invalid_object_data(format!(
                "set position {last} exceeds the {} declared elements",
                order.len()
            )));
        }
        for i in first..last {
            ids.push(order[i as usize].clone());
        }
    }
    Ok(ids)
}

fn parse_position(text: &str, token: &str) -> Result<u64, StreamError> {
    let position: u64 = text.trim().parse().map_err(|_| {
        StreamError::invalid_object_data(format!("invalid set position: '{token}'"))
    })?;
    if position == 0 {
        return Err(StreamError::invalid_object_data(format!(
            "set positions are 1-based: '{token}'"
        )));
    }
    Ok(position)
}

fn require_last_index(last_index: Option<u64>, token: &str) -> Result<u64, StreamError> {
    last_index.filter(|&last| last > 0).ok_or_else(|| {
        StreamError::invalid_object_data(format!(
            "'{token}' requires known dimensions, but none were declared"
        ))
    })
}

/// Merges touching and overlapping intervals, preserving first-seen order
/// of disjoint runs.
fn merge_intervals(mut intervals: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    if intervals.len() < 2 {
        return intervals;
    }
    intervals.sort_unstable();
    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(intervals.len());
    for (first, last) in intervals {
        match merged.last_mut() {
            Some((_, end)) if first <= *end => *end = (*end).max(last),
            _ => merged.push((first, last)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_positions_and_ranges() {
        let tokens: Vec<String> = ["1-3", "5"].iter().map(|s| s.to_string()).collect();
        let intervals = standard_to_intervals(&tokens, Some(7), &HashMap::new()).unwrap();
        assert_eq!(intervals, vec![(0, 3), (4, 5)]);
    }

    #[test]
    fn standard_step_all_and_dot() {
        let tokens: Vec<String> = ["2-6\\2"].iter().map(|s| s.to_string()).collect();
        let intervals = standard_to_intervals(&tokens, Some(7), &HashMap::new()).unwrap();
        assert_eq!(intervals, vec![(1, 2), (3, 4), (5, 6)]);

        let all: Vec<String> = vec!["ALL".to_string()];
        assert_eq!(standard_to_intervals(&all, Some(7), &HashMap::new()).unwrap(), vec![(0, 7)]);

        let dot: Vec<String> = vec![".".to_string()];
        assert_eq!(standard_to_intervals(&dot, Some(7), &HashMap::new()).unwrap(), vec![(6, 7)]);
        assert!(standard_to_intervals(&dot, None, &HashMap::new()).is_err());
    }

    #[test]
    fn standard_named_reference() {
        let mut named = HashMap::new();
        named.insert("FIRSTHALF".to_string(), vec![(0, 3)]);
        let tokens: Vec<String> = ["firstHalf", "7"].iter().map(|s| s.to_string()).collect();
        let intervals = standard_to_intervals(&tokens, Some(8), &named).unwrap();
        assert_eq!(intervals, vec![(0, 3), (6, 7)]);
    }

    #[test]
    fn adjacent_positions_merge() {
        let tokens: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
        let intervals = standard_to_intervals(&tokens, None, &HashMap::new()).unwrap();
        assert_eq!(intervals, vec![(0, 3)]);
    }

    #[test]
    fn vector_runs() {
        assert_eq!(vector_to_intervals("0011100").unwrap(), vec![(2, 5)]);
        assert_eq!(vector_to_intervals("1100011").unwrap(), vec![(0, 2), (5, 7)]);
        assert_eq!(vector_to_intervals("0000").unwrap(), vec![]);
        assert!(vector_to_intervals("0012").is_err());
    }

    #[test]
    fn interval_expansion_to_ids() {
        let order: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(intervals_to_ids(&[(0, 2)], &order).unwrap(), vec!["a", "b"]);
        assert!(intervals_to_ids(&[(2, 4)], &order).is_err());
    }
}
