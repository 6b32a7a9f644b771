//! Actual timeline of a wave as it was executed.
//!
//! Per-worker rollups plus the wave-level active duration, which merges all
//! busy intervals so overlapping pallet movements count once.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intervals::merged_seconds;
use crate::wave::{Wave, WorkerRole};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerTimeline {
    pub code: String,
    pub name: String,
    pub role: WorkerRole,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub task_count: u32,
    pub duration_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActualTimeline {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Merged busy time across the whole wave.
    pub active_sec: f64,
    /// Keyed by worker code; insertion-order independent.
    pub workers: Vec<WorkerTimeline>,
}

impl ActualTimeline {
    pub fn worker(&self, code: &str) -> Option<&WorkerTimeline> {
        self.workers.iter().find(|w| w.code == code)
    }
}

pub fn build_actual_timeline(wave: &Wave) -> ActualTimeline {
    let mut per_worker: BTreeMap<String, WorkerTimeline> = BTreeMap::new();
    let mut busy: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();

    for (_, group) in wave.groups() {
        let entry = per_worker
            .entry(group.assignee_code.clone())
            .or_insert_with(|| WorkerTimeline {
                code: group.assignee_code.clone(),
                name: group.assignee_name.clone(),
                role: group.role(),
                start: None,
                end: None,
                task_count: 0,
                duration_sec: 0.0,
            });
        if entry.role == WorkerRole::Unknown {
            entry.role = group.role();
        }

        for action in &group.actions {
            entry.task_count += 1;
            entry.duration_sec += action.resolve_duration();

            if let Some(first) = action.started_at.or(action.completed_at) {
                entry.start = Some(entry.start.map_or(first, |s| s.min(first)));
            }
            if let Some(done) = action.completed_at {
                entry.end = Some(entry.end.map_or(done, |e| e.max(done)));
            }
            if let (Some(s), Some(e)) = (action.started_at, action.completed_at) {
                busy.push((s, e));
            }
        }
    }

    let start = per_worker.values().filter_map(|w| w.start).min();
    let end = per_worker.values().filter_map(|w| w.end).max();

    ActualTimeline {
        start,
        end,
        active_sec: merged_seconds(busy),
        workers: per_worker.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::{Action, TaskGroup};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, h, m, 0).unwrap()
    }

    fn action(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Action {
        Action {
            from_bin: "01A-01-01-1".into(),
            to_bin: "01B-01-01-1".into(),
            product_code: "P1".into(),
            product_name: "P1".into(),
            weight_kg: 1.0,
            qty_plan: 1.0,
            qty_fact: 1.0,
            started_at: start,
            completed_at: end,
            duration_sec: None,
            sort_order: 0,
        }
    }

    fn group(code: &str, template: &str, actions: Vec<Action>) -> TaskGroup {
        TaskGroup {
            task_ref: format!("ref-{code}"),
            task_number: "1".into(),
            prev_task_ref: None,
            assignee_code: code.into(),
            assignee_name: format!("Worker {code}"),
            template_code: template.into(),
            execution_status: "done".into(),
            actions,
        }
    }

    #[test]
    fn overlapping_actions_merge_in_active_time() {
        let wave = Wave {
            number: 1,
            date: at(0, 0).date_naive(),
            status: "done".into(),
            replenishment: vec![group(
                "F1",
                "029",
                vec![
                    action(Some(at(8, 0)), Some(at(9, 0))),
                    action(Some(at(8, 30)), Some(at(9, 30))),
                ],
            )],
            distribution: vec![],
        };

        let tl = build_actual_timeline(&wave);
        assert_eq!(tl.active_sec, 90.0 * 60.0);
        assert_eq!(tl.start, Some(at(8, 0)));
        assert_eq!(tl.end, Some(at(9, 30)));

        let f1 = tl.worker("F1").unwrap();
        assert_eq!(f1.task_count, 2);
        assert_eq!(f1.role, WorkerRole::Forklift);
        // Per-worker duration is the plain sum, not merged.
        assert_eq!(f1.duration_sec, 120.0 * 60.0);
    }

    #[test]
    fn workers_without_timestamps_still_counted() {
        let wave = Wave {
            number: 1,
            date: at(0, 0).date_naive(),
            status: "done".into(),
            replenishment: vec![],
            distribution: vec![group("P9", "031", vec![action(None, None)])],
        };

        let tl = build_actual_timeline(&wave);
        assert_eq!(tl.active_sec, 0.0);
        let w = tl.worker("P9").unwrap();
        assert_eq!(w.task_count, 1);
        assert_eq!(w.start, None);
        assert_eq!(w.role, WorkerRole::Picker);
    }
}
