//! Task-group priority scoring.
//!
//! `priority = 1000·weight − 10·scaledDuration − meanZoneDistance`:
//! heavy pallets first, then short groups, then short routes.

use crate::capacity::PreparedGroup;
use crate::stats::StatsBundle;

pub const WEIGHT_FACTOR: f64 = 1000.0;
pub const DURATION_FACTOR: f64 = 10.0;

/// Average route duration over the group's actions, with the default route
/// duration standing in for unknown zone pairs.
pub fn mean_zone_distance(group: &PreparedGroup, stats: &StatsBundle, default_route_sec: f64) -> f64 {
    if group.actions.is_empty() {
        return default_route_sec;
    }
    let total: f64 = group
        .actions
        .iter()
        .map(|a| {
            stats
                .route(&a.from_zone, &a.to_zone)
                .map(|r| r.avg_duration_sec)
                .unwrap_or(default_route_sec)
        })
        .sum();
    total / group.actions.len() as f64
}

/// Score groups in place.
pub fn score_groups(groups: &mut [PreparedGroup], stats: &StatsBundle, default_route_sec: f64) {
    for g in groups.iter_mut() {
        g.priority = WEIGHT_FACTOR * g.total_weight_kg
            - DURATION_FACTOR * g.scaled_sec
            - mean_zone_distance(g, stats, default_route_sec);
    }
}

/// Stable descending order by priority; equal scores keep wave order.
pub fn sort_by_priority_desc(groups: &mut [PreparedGroup]) {
    groups.sort_by(|a, b| b.priority.total_cmp(&a.priority));
}
