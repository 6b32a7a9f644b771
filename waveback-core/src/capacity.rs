//! Capacity buckets and duration scaling.
//!
//! A worker's simulated workload for a (day, task-kind) bucket must equal
//! what the worker actually did that day. Naive per-action sums double-count
//! overlapping movements, so each bucket's capacity is the merged-interval
//! length of its actions, and group durations are scaled so the bucket sums
//! to exactly that capacity while relative shares stay intact.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::bins::zone_of;
use crate::estimate::{DurationEstimator, DurationSource};
use crate::intervals::merged_seconds;
use crate::time::local_day;
use crate::wave::{TaskKind, Wave, WorkerRole};

/// An action annotated with everything the simulator and the reports need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedAction {
    pub from_bin: String,
    pub to_bin: String,
    pub from_zone: String,
    pub to_zone: String,
    pub product_code: String,
    pub product_name: String,
    pub qty: f64,
    /// Duration resolved from the executed record (0 when unknown).
    pub factual_sec: f64,
    /// Estimator output used by the simulation.
    pub effective_sec: f64,
    pub source: DurationSource,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A task group annotated with its bucket, weight and (after scaling)
/// simulated duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedGroup {
    pub task_ref: String,
    pub prev_task_ref: Option<String>,
    pub kind: TaskKind,
    pub worker_code: String,
    pub worker_name: String,
    pub role: WorkerRole,
    pub day: NaiveDate,
    pub total_weight_kg: f64,
    pub raw_span_sec: f64,
    pub scaled_sec: f64,
    pub priority: f64,
    pub actions: Vec<PreparedAction>,
}

impl PreparedGroup {
    /// Split the scaled duration across actions proportionally to their
    /// effective durations (uniformly when the effective total is zero).
    pub fn scaled_slices(&self) -> Vec<f64> {
        let n = self.actions.len();
        if n == 0 {
            return Vec::new();
        }
        let effective_total: f64 = self.actions.iter().map(|a| a.effective_sec).sum();
        self.actions
            .iter()
            .map(|a| {
                let share = if effective_total > 0.0 {
                    a.effective_sec / effective_total
                } else {
                    1.0 / n as f64
                };
                self.scaled_sec * share
            })
            .collect()
    }
}

/// Annotate every group of the wave: zones, effective durations, calendar
/// day and raw span. Scaling and scoring come after.
pub fn prepare_groups(wave: &Wave, estimator: &DurationEstimator<'_>, tz: Tz) -> Vec<PreparedGroup> {
    let mut prepared = Vec::with_capacity(wave.replenishment.len() + wave.distribution.len());

    for (kind, group) in wave.groups() {
        let mut actions = Vec::with_capacity(group.actions.len());
        let mut factual_total = 0.0;

        for action in &group.actions {
            let from_zone = zone_of(&action.from_bin);
            let to_zone = zone_of(&action.to_bin);
            let factual = action.resolve_duration();
            let (effective, source) = estimator.estimate(
                &group.assignee_code,
                &from_zone,
                &to_zone,
                &action.product_code,
                factual,
            );
            factual_total += factual;

            actions.push(PreparedAction {
                from_bin: action.from_bin.clone(),
                to_bin: action.to_bin.clone(),
                from_zone,
                to_zone,
                product_code: action.product_code.clone(),
                product_name: action.product_name.clone(),
                qty: action.qty(),
                factual_sec: factual,
                effective_sec: effective,
                source,
                started_at: action.started_at,
                completed_at: action.completed_at,
            });
        }

        let day = group
            .first_seen_at()
            .map(|at| local_day(at, tz))
            .unwrap_or(wave.date);

        // Span fallback stays factual: the sum of resolved action durations,
        // not the estimator's effective values.
        let raw_span = group.raw_span_sec().unwrap_or(factual_total);

        prepared.push(PreparedGroup {
            task_ref: group.task_ref.clone(),
            prev_task_ref: group.prev_task_ref.clone(),
            kind,
            worker_code: group.assignee_code.clone(),
            worker_name: group.assignee_name.clone(),
            role: group.role(),
            day,
            total_weight_kg: group.total_weight_kg(),
            raw_span_sec: raw_span,
            scaled_sec: raw_span,
            priority: 0.0,
            actions,
        });
    }

    prepared
}

/// Per-day worker capacities, workers in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayCapacity {
    pub forklifts: Vec<(String, f64)>,
    pub pickers: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityIndex {
    by_day: BTreeMap<NaiveDate, DayCapacity>,
}

impl CapacityIndex {
    pub fn from_days(by_day: BTreeMap<NaiveDate, DayCapacity>) -> Self {
        Self { by_day }
    }

    /// Chronological days that saw any work.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_day.keys().copied()
    }

    pub fn day(&self, day: NaiveDate) -> Option<&DayCapacity> {
        self.by_day.get(&day)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.by_day.keys().next_back().copied()
    }
}

type BucketKey = (String, NaiveDate, TaskKind);

/// Scale every group so each (worker, day, kind) bucket sums to its merged
/// capacity, and return the capacity index the simulator runs against.
pub fn scale_to_capacity(groups: &mut [PreparedGroup]) -> CapacityIndex {
    // First-appearance bucket order keeps the whole pass deterministic.
    let mut order: Vec<BucketKey> = Vec::new();
    let mut members: HashMap<BucketKey, Vec<usize>> = HashMap::new();

    for (idx, g) in groups.iter().enumerate() {
        let key = (g.worker_code.clone(), g.day, g.kind);
        let slot = members.entry(key.clone()).or_default();
        if slot.is_empty() {
            order.push(key);
        }
        slot.push(idx);
    }

    let mut index = CapacityIndex::default();

    for key in order {
        let idxs = &members[&key];
        let (worker, day, kind) = &key;

        let busy: Vec<(DateTime<Utc>, DateTime<Utc>)> = idxs
            .iter()
            .flat_map(|&i| groups[i].actions.iter())
            .filter_map(|a| match (a.started_at, a.completed_at) {
                (Some(s), Some(e)) => Some((s, e)),
                _ => None,
            })
            .collect();
        let capacity = merged_seconds(busy);

        let raw_total: f64 = idxs.iter().map(|&i| groups[i].raw_span_sec).sum();
        let scale = if raw_total > 0.0 { capacity / raw_total } else { 1.0 };

        for &i in idxs {
            groups[i].scaled_sec = groups[i].raw_span_sec * scale;
        }

        let day_cap = index.by_day.entry(*day).or_default();
        let lane = match kind {
            TaskKind::Replenishment => &mut day_cap.forklifts,
            TaskKind::Distribution => &mut day_cap.pickers,
        };
        lane.push((worker.clone(), capacity));
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::DurationEstimator;
    use crate::stats::StatsBundle;
    use crate::wave::{Action, TaskGroup};
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, h, m, 0).unwrap()
    }

    fn timed_action(start: DateTime<Utc>, end: DateTime<Utc>) -> Action {
        Action {
            from_bin: "01A-01-01-1".into(),
            to_bin: "01B-01-01-1".into(),
            product_code: "P1".into(),
            product_name: "P1".into(),
            weight_kg: 5.0,
            qty_plan: 1.0,
            qty_fact: 1.0,
            started_at: Some(start),
            completed_at: Some(end),
            duration_sec: None,
            sort_order: 0,
        }
    }

    fn group(task_ref: &str, actions: Vec<Action>) -> TaskGroup {
        TaskGroup {
            task_ref: task_ref.into(),
            task_number: task_ref.into(),
            prev_task_ref: None,
            assignee_code: "W1".into(),
            assignee_name: "Worker 1".into(),
            template_code: "029".into(),
            execution_status: "done".into(),
            actions,
        }
    }

    fn prepare(wave: &Wave) -> Vec<PreparedGroup> {
        let stats = StatsBundle::default();
        let estimator = DurationEstimator::for_wave(&stats, wave);
        prepare_groups(wave, &estimator, Tz::UTC)
    }

    #[test]
    fn overlap_scales_proportionally() {
        // Two 60-minute groups overlapping by 30 minutes: merged capacity is
        // 90 minutes, so each scales to 45.
        let wave = Wave {
            number: 7,
            date: at(0, 0).date_naive(),
            status: "done".into(),
            replenishment: vec![
                group("g1", vec![timed_action(at(8, 0), at(9, 0))]),
                group("g2", vec![timed_action(at(8, 30), at(9, 30))]),
            ],
            distribution: vec![],
        };

        let mut groups = prepare(&wave);
        let index = scale_to_capacity(&mut groups);

        assert_eq!(groups[0].scaled_sec, 45.0 * 60.0);
        assert_eq!(groups[1].scaled_sec, 45.0 * 60.0);

        let day = index.day(at(0, 0).date_naive()).unwrap();
        assert_eq!(day.forklifts, vec![("W1".to_string(), 90.0 * 60.0)]);
        assert!(day.pickers.is_empty());

        // Bucket sum equals capacity.
        let sum: f64 = groups.iter().map(|g| g.scaled_sec).sum();
        assert!((sum - 90.0 * 60.0).abs() < 1.0);
    }

    #[test]
    fn rescaling_is_idempotent() {
        let wave = Wave {
            number: 7,
            date: at(0, 0).date_naive(),
            status: "done".into(),
            replenishment: vec![
                group("g1", vec![timed_action(at(8, 0), at(9, 0))]),
                group("g2", vec![timed_action(at(8, 30), at(9, 30))]),
            ],
            distribution: vec![],
        };

        let mut groups = prepare(&wave);
        scale_to_capacity(&mut groups);
        let first: Vec<f64> = groups.iter().map(|g| g.scaled_sec).collect();
        scale_to_capacity(&mut groups);
        let second: Vec<f64> = groups.iter().map(|g| g.scaled_sec).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn untimed_bucket_has_zero_capacity_and_zero_scale() {
        let wave = Wave {
            number: 7,
            date: at(0, 0).date_naive(),
            status: "done".into(),
            replenishment: vec![group(
                "g1",
                vec![Action { started_at: None, completed_at: None, ..timed_action(at(8, 0), at(9, 0)) }],
            )],
            distribution: vec![],
        };

        let mut groups = prepare(&wave);
        let index = scale_to_capacity(&mut groups);

        // No timestamps and no recorded durations: the factual span is 0,
        // capacity is 0, and the group carries zero scaled duration.
        assert_eq!(groups[0].raw_span_sec, 0.0);
        assert_eq!(groups[0].scaled_sec, 0.0);
        let day = index.day(wave.date).unwrap();
        assert_eq!(day.forklifts[0].1, 0.0);
    }

    #[test]
    fn span_fallback_sums_factual_durations() {
        // Recorded durations but no timestamps: the raw span is their sum,
        // untouched by the estimator.
        let mut a1 = timed_action(at(8, 0), at(9, 0));
        a1.started_at = None;
        a1.completed_at = None;
        a1.duration_sec = Some(70.0);
        let mut a2 = a1.clone();
        a2.duration_sec = Some(50.0);

        let wave = Wave {
            number: 7,
            date: at(0, 0).date_naive(),
            status: "done".into(),
            replenishment: vec![group("g1", vec![a1, a2])],
            distribution: vec![],
        };

        let groups = prepare(&wave);
        assert_eq!(groups[0].raw_span_sec, 120.0);
    }
}
