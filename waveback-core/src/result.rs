//! Aggregation of a finished simulation into the backtest report.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::decision::{DecisionRecord, DecisionRecorder, ScheduleEvent, TimelineKind};
use crate::estimate::DurationSource;
use crate::intervals::merged_seconds;
use crate::simulator::SimOutcome;
use crate::time::local_day;
use crate::timeline::build_actual_timeline;
use crate::wave::{TaskKind, Wave, WorkerRole};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBreakdown {
    pub date: NaiveDate,
    pub virtual_day: bool,
    pub forklifts_active: u32,
    pub pickers_active: u32,
    /// Merged busy time of the executed schedule on this day.
    pub actual_active_sec: f64,
    pub makespan_sec: f64,
    pub buffer_start: u32,
    pub buffer_end: u32,
    pub original_pallets: u32,
    pub optimized_pallets: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerBreakdown {
    pub code: String,
    pub name: String,
    pub role: WorkerRole,
    pub actual_tasks: u32,
    pub actual_duration_sec: f64,
    pub optimized_tasks: u32,
    pub optimized_duration_sec: f64,
    pub improvement_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task_ref: String,
    pub kind: TaskKind,
    pub from_bin: String,
    pub to_bin: String,
    pub product_code: String,
    pub qty: f64,
    pub actual_worker: String,
    pub optimized_worker: Option<String>,
    pub factual_duration_sec: f64,
    pub optimized_duration_sec: Option<f64>,
    pub source: DurationSource,
}

/// Histogram of estimator sources over simulated actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub actual: u32,
    pub picker_product: u32,
    pub route_stats: u32,
    pub default: u32,
}

impl SourceCounts {
    pub fn bump(&mut self, source: DurationSource) {
        match source {
            DurationSource::Actual => self.actual += 1,
            DurationSource::PickerProduct => self.picker_product += 1,
            DurationSource::RouteStats => self.route_stats += 1,
            DurationSource::Default => self.default += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.actual + self.picker_product + self.route_stats + self.default
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub wave_number: i64,
    pub wave_date: NaiveDate,
    pub buffer_capacity: u32,

    pub actual_active_sec: f64,
    pub optimized_sec: f64,
    pub improvement_percent: f64,
    pub original_days: u32,
    pub optimized_days: u32,
    pub days_saved: i32,

    pub total_groups: u32,
    pub assigned_groups: u32,
    pub leftover_repl: Vec<String>,
    pub leftover_dist: Vec<String>,

    pub days: Vec<DayBreakdown>,
    pub workers: Vec<WorkerBreakdown>,
    pub task_details: Vec<TaskDetail>,
    pub source_counts: SourceCounts,

    pub decisions: Vec<DecisionRecord>,
    pub events: Vec<ScheduleEvent>,
}

fn improvement_percent(actual: f64, optimized: f64) -> f64 {
    if actual > 0.0 {
        (actual - optimized) / actual * 100.0
    } else {
        0.0
    }
}

type PalletKey = (String, String, String);

/// Build the final report from the wave as executed and the simulation
/// outcome. Consumes the recorder's side-output.
pub fn assemble_result(
    wave: &Wave,
    outcome: &SimOutcome,
    recorder: DecisionRecorder,
    config: &BacktestConfig,
    tz: Tz,
) -> BacktestResult {
    let timeline = build_actual_timeline(wave);

    // Per-day view of the executed schedule.
    let mut day_busy: BTreeMap<NaiveDate, Vec<_>> = BTreeMap::new();
    let mut day_pallets: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for (_, group) in wave.groups() {
        for action in &group.actions {
            let d = action
                .started_at
                .or(action.completed_at)
                .map(|at| local_day(at, tz))
                .unwrap_or(wave.date);
            *day_pallets.entry(d).or_default() += 1;
            if let (Some(s), Some(e)) = (action.started_at, action.completed_at) {
                day_busy.entry(d).or_default().push((s, e));
            }
        }
    }
    let day_active: BTreeMap<NaiveDate, f64> = day_busy
        .into_iter()
        .map(|(d, busy)| (d, merged_seconds(busy)))
        .collect();

    let days: Vec<DayBreakdown> = outcome
        .days
        .iter()
        .map(|plan| DayBreakdown {
            date: plan.date,
            virtual_day: plan.virtual_day,
            forklifts_active: plan.forklifts_active,
            pickers_active: plan.pickers_active,
            actual_active_sec: day_active.get(&plan.date).copied().unwrap_or(0.0),
            makespan_sec: plan.makespan_sec,
            buffer_start: plan.buffer_start,
            buffer_end: plan.buffer_end,
            original_pallets: day_pallets.get(&plan.date).copied().unwrap_or(0),
            optimized_pallets: plan.pallets_assigned,
        })
        .collect();

    let actual_active_sec: f64 = day_active.values().sum();
    let optimized_sec: f64 = days.iter().map(|d| d.makespan_sec).sum();

    let original_days = day_pallets.len() as u32;
    let optimized_days = outcome
        .days
        .iter()
        .filter(|d| d.repl_assigned + d.dist_assigned > 0)
        .count() as u32;

    // Per-worker optimized rollups and the estimator-source histogram.
    let mut opt_tasks: HashMap<String, u32> = HashMap::new();
    let mut opt_duration: HashMap<String, f64> = HashMap::new();
    let mut source_counts = SourceCounts::default();
    for assigned in &outcome.assignments {
        *opt_tasks.entry(assigned.worker_code.clone()).or_default() +=
            assigned.group.actions.len() as u32;
        *opt_duration.entry(assigned.worker_code.clone()).or_default() +=
            assigned.transition_sec + assigned.group.scaled_sec;
        for action in &assigned.group.actions {
            source_counts.bump(action.source);
        }
    }

    let workers: Vec<WorkerBreakdown> = timeline
        .workers
        .iter()
        .map(|w| {
            let optimized_duration_sec = opt_duration.get(&w.code).copied().unwrap_or(0.0);
            WorkerBreakdown {
                code: w.code.clone(),
                name: w.name.clone(),
                role: w.role,
                actual_tasks: w.task_count,
                actual_duration_sec: w.duration_sec,
                optimized_tasks: opt_tasks.get(&w.code).copied().unwrap_or(0),
                optimized_duration_sec,
                improvement_percent: improvement_percent(w.duration_sec, optimized_duration_sec),
            }
        })
        .collect();

    let task_details = build_task_details(wave, outcome);

    let (decisions, optimized_events) = recorder.into_parts();
    let events = interleave_events(wave, optimized_events, tz);

    BacktestResult {
        wave_number: wave.number,
        wave_date: wave.date,
        buffer_capacity: config.buffer_capacity,
        actual_active_sec,
        optimized_sec,
        improvement_percent: improvement_percent(actual_active_sec, optimized_sec),
        original_days,
        optimized_days,
        days_saved: original_days as i32 - optimized_days as i32,
        total_groups: (wave.replenishment.len() + wave.distribution.len()) as u32,
        assigned_groups: outcome.assignments.len() as u32,
        leftover_repl: outcome.leftover_repl.iter().map(|g| g.task_ref.clone()).collect(),
        leftover_dist: outcome.leftover_dist.iter().map(|g| g.task_ref.clone()).collect(),
        days,
        workers,
        task_details,
        source_counts,
        decisions,
        events,
    }
}

/// Match each executed pallet movement to the simulated one that moved the
/// same (from, to, product) and report both durations.
fn build_task_details(wave: &Wave, outcome: &SimOutcome) -> Vec<TaskDetail> {
    let mut placed: HashMap<PalletKey, VecDeque<(String, f64, DurationSource)>> = HashMap::new();
    for assigned in &outcome.assignments {
        for (action, slice) in assigned.group.actions.iter().zip(assigned.group.scaled_slices()) {
            placed
                .entry((
                    action.from_bin.clone(),
                    action.to_bin.clone(),
                    action.product_code.clone(),
                ))
                .or_default()
                .push_back((assigned.worker_code.clone(), slice, action.source));
        }
    }

    let mut unplaced: HashMap<PalletKey, VecDeque<DurationSource>> = HashMap::new();
    for group in outcome.leftover_repl.iter().chain(outcome.leftover_dist.iter()) {
        for action in &group.actions {
            unplaced
                .entry((
                    action.from_bin.clone(),
                    action.to_bin.clone(),
                    action.product_code.clone(),
                ))
                .or_default()
                .push_back(action.source);
        }
    }

    let mut details = Vec::with_capacity(wave.action_count());
    for (kind, group) in wave.groups() {
        for action in &group.actions {
            let key = (
                action.from_bin.clone(),
                action.to_bin.clone(),
                action.product_code.clone(),
            );
            let (optimized_worker, optimized_duration_sec, source) =
                match placed.get_mut(&key).and_then(VecDeque::pop_front) {
                    Some((worker, slice, source)) => (Some(worker), Some(slice), source),
                    None => {
                        let source = unplaced
                            .get_mut(&key)
                            .and_then(VecDeque::pop_front)
                            .unwrap_or(DurationSource::Default);
                        (None, None, source)
                    }
                };

            details.push(TaskDetail {
                task_ref: group.task_ref.clone(),
                kind,
                from_bin: action.from_bin.clone(),
                to_bin: action.to_bin.clone(),
                product_code: action.product_code.clone(),
                qty: action.qty(),
                actual_worker: group.assignee_code.clone(),
                optimized_worker,
                factual_duration_sec: action.resolve_duration(),
                optimized_duration_sec,
                source,
            });
        }
    }
    details
}

/// Factual events from raw timestamps plus the recorder's optimized events,
/// ordered for viewer consumption.
fn interleave_events(wave: &Wave, mut events: Vec<ScheduleEvent>, tz: Tz) -> Vec<ScheduleEvent> {
    for (kind, group) in wave.groups() {
        for action in &group.actions {
            let (Some(start), Some(end)) = (action.started_at, action.completed_at) else {
                continue;
            };
            events.push(ScheduleEvent {
                timeline: TimelineKind::Fact,
                day: local_day(start, tz),
                worker_code: group.assignee_code.clone(),
                worker_name: group.assignee_name.clone(),
                task_ref: group.task_ref.clone(),
                kind,
                from_bin: action.from_bin.clone(),
                to_bin: action.to_bin.clone(),
                product_code: action.product_code.clone(),
                start_at: Some(start),
                end_at: Some(end),
                start_offset_sec: None,
                end_offset_sec: None,
                duration_sec: action.resolve_duration(),
                source: None,
            });
        }
    }

    events.sort_by(|a, b| {
        (a.day, a.timeline.as_str(), a.start_at, a.start_offset_sec.map(f64::to_bits))
            .cmp(&(b.day, b.timeline.as_str(), b.start_at, b.start_offset_sec.map(f64::to_bits)))
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionRecorder;

    #[test]
    fn empty_wave_is_all_zeroes() {
        let wave = Wave {
            number: 9,
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            status: "done".into(),
            replenishment: vec![],
            distribution: vec![],
        };
        let outcome = SimOutcome::default();
        let result = assemble_result(
            &wave,
            &outcome,
            DecisionRecorder::disabled(),
            &BacktestConfig::default(),
            Tz::UTC,
        );

        assert_eq!(result.actual_active_sec, 0.0);
        assert_eq!(result.optimized_sec, 0.0);
        assert_eq!(result.improvement_percent, 0.0);
        assert_eq!(result.days_saved, 0);
        assert_eq!(result.total_groups, 0);
        assert!(result.task_details.is_empty());
        assert_eq!(result.source_counts.total(), 0);
    }

    #[test]
    fn improvement_guard_on_zero_actual() {
        assert_eq!(improvement_percent(0.0, 10.0), 0.0);
        assert_eq!(improvement_percent(200.0, 150.0), 25.0);
    }

    #[test]
    fn result_serializes_for_persistence() {
        let wave = Wave {
            number: 9,
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            status: "done".into(),
            replenishment: vec![],
            distribution: vec![],
        };
        let result = assemble_result(
            &wave,
            &SimOutcome::default(),
            DecisionRecorder::disabled(),
            &BacktestConfig::default(),
            Tz::UTC,
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"wave_number\":9"));
    }
}
