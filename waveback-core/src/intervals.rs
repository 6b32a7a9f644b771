//! Busy-interval merging.
//!
//! Overlapping work intervals must not be double counted: a worker moving
//! two pallets at once was busy once. Sort by start, sweep, extend while the
//! next start is still inside the current interval (boundary touch merges).

use chrono::{DateTime, Utc};

pub type Interval = (DateTime<Utc>, DateTime<Utc>);

/// Merge into a monotone, non-overlapping sequence. Pairs with a
/// non-positive length are dropped.
pub fn merge(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|(s, e)| e > s);
    intervals.sort_by_key(|(s, _)| *s);

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some((_, cur_end)) if start <= *cur_end => {
                if end > *cur_end {
                    *cur_end = end;
                }
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Total length of the union, in seconds.
pub fn merged_seconds(intervals: Vec<Interval>) -> f64 {
    merge(intervals)
        .iter()
        .map(|(s, e)| (*e - *s).num_milliseconds() as f64 / 1000.0)
        .sum()
}
