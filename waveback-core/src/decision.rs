//! Decision-log and Gantt side-output of a simulation run.
//!
//! Every assignment (and every day-ending skip) becomes one audit row with
//! the runner-up workers and tasks, so a reviewer can replay why the greedy
//! loop did what it did. Gantt events carry the optimized schedule; the
//! factual schedule is emitted from raw timestamps by the assembler and
//! interleaved for viewers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::capacity::PreparedGroup;
use crate::estimate::DurationSource;
use crate::wave::TaskKind;

/// Alternatives kept per decision row.
pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    AssignRepl,
    AssignDist,
    SkipRepl,
    SkipDist,
}

impl DecisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionKind::AssignRepl => "assign_repl",
            DecisionKind::AssignDist => "assign_dist",
            DecisionKind::SkipRepl => "skip_repl",
            DecisionKind::SkipDist => "skip_dist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveConstraint {
    BufferFull,
    NoCapacity,
    BufferEmpty,
    NoReadyDist,
    None,
}

impl ActiveConstraint {
    pub fn as_str(self) -> &'static str {
        match self {
            ActiveConstraint::BufferFull => "buffer_full",
            ActiveConstraint::NoCapacity => "no_capacity",
            ActiveConstraint::BufferEmpty => "buffer_empty",
            ActiveConstraint::NoReadyDist => "no_ready_dist",
            ActiveConstraint::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltWorker {
    pub code: String,
    pub remaining_sec: f64,
    pub load_sec: f64,
    pub task_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltTask {
    pub task_ref: String,
    pub priority: f64,
    pub duration_sec: f64,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub seq: u32,
    pub day: NaiveDate,
    pub virtual_day: bool,
    pub kind: DecisionKind,
    pub worker_code: Option<String>,
    pub worker_remaining_sec: Option<f64>,
    pub task_ref: Option<String>,
    pub task_priority: Option<f64>,
    pub task_duration_sec: Option<f64>,
    pub task_weight_kg: Option<f64>,
    pub buffer_before: u32,
    pub buffer_after: u32,
    pub alt_workers: Vec<AltWorker>,
    pub alt_tasks: Vec<AltTask>,
    pub constraint: ActiveConstraint,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineKind {
    Fact,
    Optimized,
}

impl TimelineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineKind::Fact => "fact",
            TimelineKind::Optimized => "optimized",
        }
    }
}

/// One pallet movement on either timeline. Factual events carry absolute
/// timestamps; optimized events carry offsets from the simulated day start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub timeline: TimelineKind,
    pub day: NaiveDate,
    pub worker_code: String,
    pub worker_name: String,
    pub task_ref: String,
    pub kind: TaskKind,
    pub from_bin: String,
    pub to_bin: String,
    pub product_code: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub start_offset_sec: Option<f64>,
    pub end_offset_sec: Option<f64>,
    pub duration_sec: f64,
    pub source: Option<DurationSource>,
}

/// Collects decision rows and optimized Gantt events during a run.
#[derive(Debug, Default)]
pub struct DecisionRecorder {
    enabled: bool,
    seq: u32,
    pub decisions: Vec<DecisionRecord>,
    pub events: Vec<ScheduleEvent>,
}

impl DecisionRecorder {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, ..Default::default() }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Hand the collected side-output to the assembler.
    pub fn into_parts(self) -> (Vec<DecisionRecord>, Vec<ScheduleEvent>) {
        (self.decisions, self.events)
    }

    fn next_seq(&mut self) -> u32 {
        self.seq += 1;
        self.seq
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_assign(
        &mut self,
        day: NaiveDate,
        virtual_day: bool,
        kind: DecisionKind,
        group: &PreparedGroup,
        worker_code: &str,
        worker_remaining_sec: f64,
        buffer_before: u32,
        buffer_after: u32,
        alt_workers: Vec<AltWorker>,
        alt_tasks: Vec<AltTask>,
    ) {
        if !self.enabled {
            return;
        }
        let seq = self.next_seq();
        let reason = format!(
            "{} {} to {}: priority {:.0}, {:.0}s, {:.1}kg, buffer {}→{}",
            kind.as_str(),
            group.task_ref,
            worker_code,
            group.priority,
            group.scaled_sec,
            group.total_weight_kg,
            buffer_before,
            buffer_after,
        );
        self.decisions.push(DecisionRecord {
            seq,
            day,
            virtual_day,
            kind,
            worker_code: Some(worker_code.to_string()),
            worker_remaining_sec: Some(worker_remaining_sec),
            task_ref: Some(group.task_ref.clone()),
            task_priority: Some(group.priority),
            task_duration_sec: Some(group.scaled_sec),
            task_weight_kg: Some(group.total_weight_kg),
            buffer_before,
            buffer_after,
            alt_workers,
            alt_tasks,
            constraint: ActiveConstraint::None,
            reason,
        });
    }

    pub fn record_skip(
        &mut self,
        day: NaiveDate,
        virtual_day: bool,
        kind: DecisionKind,
        buffer_level: u32,
        constraint: ActiveConstraint,
        alt_tasks: Vec<AltTask>,
    ) {
        if !self.enabled {
            return;
        }
        let seq = self.next_seq();
        let reason = format!("{}: {}", kind.as_str(), constraint.as_str());
        self.decisions.push(DecisionRecord {
            seq,
            day,
            virtual_day,
            kind,
            worker_code: None,
            worker_remaining_sec: None,
            task_ref: None,
            task_priority: None,
            task_duration_sec: None,
            task_weight_kg: None,
            buffer_before: buffer_level,
            buffer_after: buffer_level,
            alt_workers: Vec::new(),
            alt_tasks,
            constraint,
            reason,
        });
    }

    /// Lay the group's actions back-to-back from `start_offset_sec`,
    /// splitting the scaled duration proportionally to effective durations
    /// (uniformly when the effective total is zero).
    pub fn record_optimized_slices(
        &mut self,
        day: NaiveDate,
        group: &PreparedGroup,
        worker_code: &str,
        worker_name: &str,
        start_offset_sec: f64,
    ) {
        if !self.enabled || group.actions.is_empty() {
            return;
        }

        let mut cursor = start_offset_sec;

        for (action, slice) in group.actions.iter().zip(group.scaled_slices()) {
            self.events.push(ScheduleEvent {
                timeline: TimelineKind::Optimized,
                day,
                worker_code: worker_code.to_string(),
                worker_name: worker_name.to_string(),
                task_ref: group.task_ref.clone(),
                kind: group.kind,
                from_bin: action.from_bin.clone(),
                to_bin: action.to_bin.clone(),
                product_code: action.product_code.clone(),
                start_at: None,
                end_at: None,
                start_offset_sec: Some(cursor),
                end_offset_sec: Some(cursor + slice),
                duration_sec: slice,
                source: Some(action.source),
            });
            cursor += slice;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::WorkerRole;

    fn group_with_actions(effective: &[f64], scaled: f64) -> PreparedGroup {
        PreparedGroup {
            task_ref: "g1".into(),
            prev_task_ref: None,
            kind: TaskKind::Replenishment,
            worker_code: "F1".into(),
            worker_name: "F1".into(),
            role: WorkerRole::Forklift,
            day: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            total_weight_kg: 1.0,
            raw_span_sec: scaled,
            scaled_sec: scaled,
            priority: 0.0,
            actions: effective
                .iter()
                .map(|&e| crate::capacity::PreparedAction {
                    from_bin: "01A-01-01-1".into(),
                    to_bin: "01B-01-01-1".into(),
                    from_zone: "A".into(),
                    to_zone: "B".into(),
                    product_code: "P".into(),
                    product_name: "P".into(),
                    qty: 1.0,
                    factual_sec: e,
                    effective_sec: e,
                    source: DurationSource::Actual,
                    started_at: None,
                    completed_at: None,
                })
                .collect(),
        }
    }

    #[test]
    fn slices_are_proportional_and_contiguous() {
        let mut rec = DecisionRecorder::new(true);
        let g = group_with_actions(&[30.0, 90.0], 60.0);
        rec.record_optimized_slices(g.day, &g, "F1", "F1", 10.0);

        assert_eq!(rec.events.len(), 2);
        assert_eq!(rec.events[0].start_offset_sec, Some(10.0));
        assert_eq!(rec.events[0].duration_sec, 15.0);
        assert_eq!(rec.events[1].start_offset_sec, Some(25.0));
        assert_eq!(rec.events[1].duration_sec, 45.0);
        assert_eq!(rec.events[1].end_offset_sec, Some(70.0));
    }

    #[test]
    fn disabled_recorder_collects_nothing() {
        let mut rec = DecisionRecorder::disabled();
        let g = group_with_actions(&[30.0], 30.0);
        rec.record_optimized_slices(g.day, &g, "F1", "F1", 0.0);
        rec.record_skip(
            g.day,
            false,
            DecisionKind::SkipRepl,
            0,
            ActiveConstraint::NoCapacity,
            vec![],
        );
        assert!(rec.events.is_empty());
        assert!(rec.decisions.is_empty());
    }

    #[test]
    fn zero_effective_total_splits_uniformly() {
        let mut rec = DecisionRecorder::new(true);
        let g = group_with_actions(&[0.0, 0.0], 40.0);
        rec.record_optimized_slices(g.day, &g, "F1", "F1", 0.0);
        assert_eq!(rec.events[0].duration_sec, 20.0);
        assert_eq!(rec.events[1].duration_sec, 20.0);
    }
}
