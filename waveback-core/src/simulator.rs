//! Cross-day buffered greedy simulation.
//!
//! Task groups live in two global pools (replenishment sorted by priority,
//! distribution ordered lazily per pass) and flow through a bounded picking
//! buffer: a replenishment assignment fills one slot, a distribution drains
//! one. Within a day the loop alternates one-repl-then-one-dist attempts
//! until neither side can move, then the buffer level carries into the next
//! day. Days left over after the real capacity runs out are drained on
//! virtual days reusing the final day's capacity profile.
//!
//! All selections use stable orderings, so identical inputs replay into
//! identical schedules.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::capacity::{CapacityIndex, DayCapacity, PreparedGroup};
use crate::decision::{
    ActiveConstraint, AltTask, AltWorker, DecisionKind, DecisionRecorder, MAX_ALTERNATIVES,
};
use crate::error::{BacktestError, Result};
use crate::priority::sort_by_priority_desc;

/// Budget slack when deciding whether a group still fits a worker.
pub const FIT_TOLERANCE_SEC: f64 = 1.0;

/// A task group placed by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedGroup {
    pub group: PreparedGroup,
    pub worker_code: String,
    pub day: NaiveDate,
    pub virtual_day: bool,
    /// Offset from the simulated day start, transition already included.
    pub start_offset_sec: f64,
    pub transition_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub virtual_day: bool,
    pub buffer_start: u32,
    pub buffer_end: u32,
    pub makespan_sec: f64,
    pub repl_assigned: u32,
    pub dist_assigned: u32,
    /// Pallet movements placed this day.
    pub pallets_assigned: u32,
    pub forklifts_active: u32,
    pub pickers_active: u32,
    pub worker_loads: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimOutcome {
    pub days: Vec<DayPlan>,
    pub assignments: Vec<AssignedGroup>,
    pub leftover_repl: Vec<PreparedGroup>,
    pub leftover_dist: Vec<PreparedGroup>,
}

#[derive(Debug, Clone)]
struct SimWorker {
    code: String,
    capacity_sec: f64,
    load_sec: f64,
    tasks: u32,
}

impl SimWorker {
    fn remaining(&self) -> f64 {
        self.capacity_sec - self.load_sec
    }

    fn fits(&self, duration_sec: f64, transition_sec: f64) -> bool {
        self.remaining() + FIT_TOLERANCE_SEC >= duration_sec + transition_sec
    }
}

fn alt_workers(workers: &[SimWorker], feasible: &[usize], chosen: usize) -> Vec<AltWorker> {
    feasible
        .iter()
        .filter(|&&i| i != chosen)
        .take(MAX_ALTERNATIVES)
        .map(|&i| AltWorker {
            code: workers[i].code.clone(),
            remaining_sec: workers[i].remaining(),
            load_sec: workers[i].load_sec,
            task_count: workers[i].tasks,
        })
        .collect()
}

fn alt_tasks(pool: &[PreparedGroup], order: &[usize], chosen: usize) -> Vec<AltTask> {
    order
        .iter()
        .filter(|&&i| i != chosen)
        .take(MAX_ALTERNATIVES)
        .map(|&i| AltTask {
            task_ref: pool[i].task_ref.clone(),
            priority: pool[i].priority,
            duration_sec: pool[i].scaled_sec,
            weight_kg: pool[i].total_weight_kg,
        })
        .collect()
}

struct SimState {
    repl_pool: Vec<PreparedGroup>,
    dist_pool: Vec<PreparedGroup>,
    completed_repl: BTreeSet<String>,
    buffer: u32,
    assignments: Vec<AssignedGroup>,
}

pub struct Simulator {
    pub buffer_capacity: u32,
    pub forklift_transition_sec: f64,
    pub picker_transition_sec: f64,
}

impl Simulator {
    /// Run the simulation. `repl` and `dist` are consumed into assignments
    /// and leftovers; `repl` is (re)sorted by priority here, `dist` keeps
    /// wave order and is ranked lazily each pass.
    pub fn run(
        &self,
        mut repl: Vec<PreparedGroup>,
        dist: Vec<PreparedGroup>,
        capacities: &CapacityIndex,
        recorder: &mut DecisionRecorder,
    ) -> Result<SimOutcome> {
        sort_by_priority_desc(&mut repl);

        let mut state = SimState {
            repl_pool: repl,
            dist_pool: dist,
            completed_repl: BTreeSet::new(),
            buffer: 0,
            assignments: Vec::new(),
        };

        let mut days = Vec::new();
        for date in capacities.days() {
            let day_cap = capacities
                .day(date)
                .ok_or_else(|| BacktestError::Invariant(format!("missing capacity for {date}")))?;
            days.push(self.run_day(date, false, day_cap, &mut state, recorder)?);
        }

        // Drain leftovers on virtual days reusing the final day's profile.
        if !(state.repl_pool.is_empty() && state.dist_pool.is_empty()) {
            if let Some(last) = capacities.last_day() {
                let profile = capacities.day(last).cloned().unwrap_or_default();
                let mut date = last;
                while !(state.repl_pool.is_empty() && state.dist_pool.is_empty()) {
                    date = date.succ_opt().ok_or_else(|| {
                        BacktestError::Invariant("virtual day past calendar range".into())
                    })?;
                    let plan = self.run_day(date, true, &profile, &mut state, recorder)?;
                    if plan.repl_assigned == 0 && plan.dist_assigned == 0 {
                        // Nothing movable with this profile; report leftovers.
                        break;
                    }
                    days.push(plan);
                }
            }
        }

        tracing::debug!(
            assigned = state.assignments.len(),
            leftover_repl = state.repl_pool.len(),
            leftover_dist = state.dist_pool.len(),
            days = days.len(),
            "simulation finished"
        );

        Ok(SimOutcome {
            days,
            assignments: state.assignments,
            leftover_repl: state.repl_pool,
            leftover_dist: state.dist_pool,
        })
    }

    fn run_day(
        &self,
        date: NaiveDate,
        virtual_day: bool,
        day_cap: &DayCapacity,
        state: &mut SimState,
        recorder: &mut DecisionRecorder,
    ) -> Result<DayPlan> {
        let mut forklifts = spawn_workers(&day_cap.forklifts);
        let mut pickers = spawn_workers(&day_cap.pickers);
        let buffer_start = state.buffer;
        let mut repl_assigned = 0u32;
        let mut dist_assigned = 0u32;
        let mut pallets = 0u32;

        loop {
            let mut progress = false;

            if state.buffer < self.buffer_capacity && !state.repl_pool.is_empty() {
                if let Some(done) = self.place_repl(date, virtual_day, &mut forklifts, state, recorder)? {
                    repl_assigned += 1;
                    pallets += done;
                    progress = true;
                }
            }

            if state.buffer > 0 && !state.dist_pool.is_empty() {
                if let Some(done) = self.place_dist(date, virtual_day, &mut pickers, state, recorder)? {
                    dist_assigned += 1;
                    pallets += done;
                    progress = true;
                }
            }

            if !progress {
                self.record_day_end(date, virtual_day, state, recorder);
                break;
            }
        }

        let makespan = forklifts
            .iter()
            .chain(pickers.iter())
            .map(|w| w.load_sec)
            .fold(0.0_f64, f64::max);

        let mut worker_loads: Vec<(String, f64)> = Vec::new();
        for w in forklifts.iter().chain(pickers.iter()) {
            worker_loads.push((w.code.clone(), w.load_sec));
        }

        Ok(DayPlan {
            date,
            virtual_day,
            buffer_start,
            buffer_end: state.buffer,
            makespan_sec: makespan,
            repl_assigned,
            dist_assigned,
            pallets_assigned: pallets,
            forklifts_active: day_cap.forklifts.iter().filter(|(_, c)| *c > 0.0).count() as u32,
            pickers_active: day_cap.pickers.iter().filter(|(_, c)| *c > 0.0).count() as u32,
            worker_loads,
        })
    }

    /// One replenishment attempt: highest-priority group some forklift can
    /// still cover; among those forklifts the one with the largest remaining
    /// budget (ties by insertion order). Returns the pallet count placed.
    fn place_repl(
        &self,
        date: NaiveDate,
        virtual_day: bool,
        forklifts: &mut [SimWorker],
        state: &mut SimState,
        recorder: &mut DecisionRecorder,
    ) -> Result<Option<u32>> {
        let order: Vec<usize> = (0..state.repl_pool.len()).collect();

        for (slot, &gi) in order.iter().enumerate() {
            let group = &state.repl_pool[gi];
            let feasible = feasible_workers(forklifts, group.scaled_sec, self.forklift_transition_sec);
            let Some(&chosen) = feasible
                .iter()
                .reduce(|best, cand| if forklifts[*cand].remaining() > forklifts[*best].remaining() { cand } else { best })
            else {
                continue;
            };

            let buffer_before = state.buffer;
            if state.buffer >= self.buffer_capacity {
                return Err(BacktestError::Invariant(format!(
                    "buffer overflow at {} slots",
                    state.buffer
                )));
            }
            state.buffer += 1;

            let alt_w = alt_workers(forklifts, &feasible, chosen);
            let alt_t = alt_tasks(&state.repl_pool, &order[slot..], gi);

            let group = state.repl_pool.remove(gi);
            let placed = self.charge(
                date,
                virtual_day,
                group,
                &mut forklifts[chosen],
                self.forklift_transition_sec,
            );
            state.completed_repl.insert(placed.group.task_ref.clone());

            recorder.record_assign(
                date,
                virtual_day,
                DecisionKind::AssignRepl,
                &placed.group,
                &placed.worker_code,
                forklifts[chosen].remaining(),
                buffer_before,
                state.buffer,
                alt_w,
                alt_t,
            );
            recorder.record_optimized_slices(
                date,
                &placed.group,
                &placed.worker_code,
                &placed.group.worker_name,
                placed.start_offset_sec,
            );

            let pallets = placed.group.actions.len() as u32;
            state.assignments.push(placed);
            return Ok(Some(pallets));
        }

        Ok(None)
    }

    /// One distribution attempt: ready groups (precedence satisfied) ranked
    /// by priority; first one a picker can cover, picker chosen by earliest
    /// finish time (ties by insertion order).
    fn place_dist(
        &self,
        date: NaiveDate,
        virtual_day: bool,
        pickers: &mut [SimWorker],
        state: &mut SimState,
        recorder: &mut DecisionRecorder,
    ) -> Result<Option<u32>> {
        let ready = ready_dist_order(&state.dist_pool, &state.completed_repl);

        for (slot, &gi) in ready.iter().enumerate() {
            let group = &state.dist_pool[gi];
            let feasible = feasible_workers(pickers, group.scaled_sec, self.picker_transition_sec);
            let Some(&chosen) = feasible.iter().reduce(|best, cand| {
                let finish = |i: usize| {
                    let trans = if pickers[i].tasks > 0 { self.picker_transition_sec } else { 0.0 };
                    pickers[i].load_sec + trans + group.scaled_sec
                };
                if finish(*cand) < finish(*best) { cand } else { best }
            }) else {
                continue;
            };

            let buffer_before = state.buffer;
            if state.buffer == 0 {
                return Err(BacktestError::Invariant("buffer underflow".into()));
            }
            state.buffer -= 1;

            let alt_w = alt_workers(pickers, &feasible, chosen);
            let alt_t = alt_tasks(&state.dist_pool, &ready[slot..], gi);

            let group = state.dist_pool.remove(gi);
            let placed = self.charge(
                date,
                virtual_day,
                group,
                &mut pickers[chosen],
                self.picker_transition_sec,
            );

            recorder.record_assign(
                date,
                virtual_day,
                DecisionKind::AssignDist,
                &placed.group,
                &placed.worker_code,
                pickers[chosen].remaining(),
                buffer_before,
                state.buffer,
                alt_w,
                alt_t,
            );
            recorder.record_optimized_slices(
                date,
                &placed.group,
                &placed.worker_code,
                &placed.group.worker_name,
                placed.start_offset_sec,
            );

            let pallets = placed.group.actions.len() as u32;
            state.assignments.push(placed);
            return Ok(Some(pallets));
        }

        Ok(None)
    }

    fn charge(
        &self,
        date: NaiveDate,
        virtual_day: bool,
        group: PreparedGroup,
        worker: &mut SimWorker,
        base_transition_sec: f64,
    ) -> AssignedGroup {
        let transition = if worker.tasks > 0 { base_transition_sec } else { 0.0 };
        let start = worker.load_sec + transition;
        worker.load_sec = start + group.scaled_sec;
        worker.tasks += 1;

        AssignedGroup {
            worker_code: worker.code.clone(),
            day: date,
            virtual_day,
            start_offset_sec: start,
            transition_sec: transition,
            group,
        }
    }

    /// The terminal no-progress pass: record why each side is stuck.
    fn record_day_end(
        &self,
        date: NaiveDate,
        virtual_day: bool,
        state: &SimState,
        recorder: &mut DecisionRecorder,
    ) {
        if !state.repl_pool.is_empty() {
            let constraint = if state.buffer >= self.buffer_capacity {
                ActiveConstraint::BufferFull
            } else {
                ActiveConstraint::NoCapacity
            };
            let order: Vec<usize> = (0..state.repl_pool.len()).collect();
            recorder.record_skip(
                date,
                virtual_day,
                DecisionKind::SkipRepl,
                state.buffer,
                constraint,
                alt_tasks(&state.repl_pool, &order, usize::MAX),
            );
        }

        if !state.dist_pool.is_empty() {
            let ready = ready_dist_order(&state.dist_pool, &state.completed_repl);
            let constraint = if state.buffer == 0 {
                ActiveConstraint::BufferEmpty
            } else if ready.is_empty() {
                ActiveConstraint::NoReadyDist
            } else {
                ActiveConstraint::NoCapacity
            };
            recorder.record_skip(
                date,
                virtual_day,
                DecisionKind::SkipDist,
                state.buffer,
                constraint,
                alt_tasks(&state.dist_pool, &ready, usize::MAX),
            );
        }
    }
}

fn spawn_workers(capacities: &[(String, f64)]) -> Vec<SimWorker> {
    capacities
        .iter()
        .map(|(code, cap)| SimWorker {
            code: code.clone(),
            capacity_sec: *cap,
            load_sec: 0.0,
            tasks: 0,
        })
        .collect()
}

fn feasible_workers(workers: &[SimWorker], duration_sec: f64, base_transition_sec: f64) -> Vec<usize> {
    workers
        .iter()
        .enumerate()
        .filter(|(_, w)| {
            let trans = if w.tasks > 0 { base_transition_sec } else { 0.0 };
            w.fits(duration_sec, trans)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Indices of assignable distribution groups, highest priority first; equal
/// priorities keep pool order.
fn ready_dist_order(pool: &[PreparedGroup], completed_repl: &BTreeSet<String>) -> Vec<usize> {
    let mut ready: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, g)| match &g.prev_task_ref {
            None => true,
            Some(prev) => completed_repl.contains(prev),
        })
        .map(|(i, _)| i)
        .collect();
    ready.sort_by(|&a, &b| pool[b].priority.total_cmp(&pool[a].priority));
    ready
}

/// Single-day packer: longest group first onto the worker with the most
/// remaining budget. Not part of the cross-day pipeline; kept as a test
/// oracle for worker-selection behavior.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LptPlan {
    pub assignments: Vec<(String, String)>,
    pub loads: Vec<(String, f64)>,
    pub unplaced: Vec<String>,
}

pub(crate) fn lpt_day_plan(
    groups: &[PreparedGroup],
    workers: &[(String, f64)],
    transition_sec: f64,
) -> LptPlan {
    let mut pool = spawn_workers(workers);
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| groups[b].scaled_sec.total_cmp(&groups[a].scaled_sec));

    let mut plan = LptPlan::default();
    for gi in order {
        let g = &groups[gi];
        let feasible = feasible_workers(&pool, g.scaled_sec, transition_sec);
        match feasible
            .iter()
            .reduce(|best, cand| if pool[*cand].remaining() > pool[*best].remaining() { cand } else { best })
        {
            Some(&wi) => {
                let trans = if pool[wi].tasks > 0 { transition_sec } else { 0.0 };
                pool[wi].load_sec += trans + g.scaled_sec;
                pool[wi].tasks += 1;
                plan.assignments.push((g.task_ref.clone(), pool[wi].code.clone()));
            }
            None => plan.unplaced.push(g.task_ref.clone()),
        }
    }
    plan.loads = pool.into_iter().map(|w| (w.code, w.load_sec)).collect();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::{CapacityIndex, PreparedAction};
    use crate::estimate::DurationSource;
    use crate::wave::{TaskKind, WorkerRole};
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn group(
        task_ref: &str,
        kind: TaskKind,
        worker: &str,
        scaled: f64,
        prev: Option<&str>,
    ) -> PreparedGroup {
        PreparedGroup {
            task_ref: task_ref.into(),
            prev_task_ref: prev.map(str::to_string),
            kind,
            worker_code: worker.into(),
            worker_name: worker.into(),
            role: match kind {
                TaskKind::Replenishment => WorkerRole::Forklift,
                TaskKind::Distribution => WorkerRole::Picker,
            },
            day: day(7),
            total_weight_kg: 0.0,
            raw_span_sec: scaled,
            scaled_sec: scaled,
            priority: -10.0 * scaled,
            actions: vec![PreparedAction {
                from_bin: "01A-01-01-1".into(),
                to_bin: "01B-01-01-1".into(),
                from_zone: "A".into(),
                to_zone: "B".into(),
                product_code: format!("P-{task_ref}"),
                product_name: task_ref.into(),
                qty: 1.0,
                factual_sec: scaled,
                effective_sec: scaled,
                source: DurationSource::Actual,
                started_at: None,
                completed_at: None,
            }],
        }
    }

    fn capacity_index(days: &[(NaiveDate, &[(&str, f64)], &[(&str, f64)])]) -> CapacityIndex {
        let mut by_day = BTreeMap::new();
        for (date, forklifts, pickers) in days {
            by_day.insert(
                *date,
                DayCapacity {
                    forklifts: forklifts.iter().map(|(c, s)| (c.to_string(), *s)).collect(),
                    pickers: pickers.iter().map(|(c, s)| (c.to_string(), *s)).collect(),
                },
            );
        }
        CapacityIndex::from_days(by_day)
    }

    fn sim(buffer: u32) -> Simulator {
        Simulator {
            buffer_capacity: buffer,
            forklift_transition_sec: 0.0,
            picker_transition_sec: 0.0,
        }
    }

    #[test]
    fn trivial_pair_runs_in_one_day() {
        // Scenario: one repl (100s) feeding one dependent dist (200s).
        let repl = vec![group("r1", TaskKind::Replenishment, "F1", 100.0, None)];
        let dist = vec![group("d1", TaskKind::Distribution, "P1", 200.0, Some("r1"))];
        let caps = capacity_index(&[(day(7), &[("F1", 100.0)], &[("P1", 200.0)])]);

        let out = sim(1)
            .run(repl, dist, &caps, &mut DecisionRecorder::disabled())
            .unwrap();

        assert_eq!(out.days.len(), 1);
        assert_eq!(out.assignments.len(), 2);
        assert_eq!(out.assignments[0].group.task_ref, "r1");
        assert_eq!(out.assignments[1].group.task_ref, "d1");
        assert_eq!(out.days[0].buffer_end, 0);
        assert_eq!(out.days[0].makespan_sec, 200.0);
        assert!(out.leftover_repl.is_empty() && out.leftover_dist.is_empty());
    }

    #[test]
    fn full_buffer_stalls_until_next_day() {
        // Scenario: buffer of one, two repls, no dists. The second repl must
        // wait for the next day even though the forklift has budget left.
        let repl = vec![
            group("r1", TaskKind::Replenishment, "F1", 50.0, None),
            group("r2", TaskKind::Replenishment, "F1", 50.0, None),
        ];
        let caps = capacity_index(&[
            (day(7), &[("F1", 100.0)], &[]),
            (day(8), &[("F1", 100.0)], &[]),
        ]);

        let out = sim(1)
            .run(repl, vec![], &caps, &mut DecisionRecorder::disabled())
            .unwrap();

        assert_eq!(out.days[0].repl_assigned, 1);
        assert_eq!(out.days[0].buffer_end, 1);
        // Buffer still full next morning: r2 never fits through the buffer.
        assert_eq!(out.days[1].repl_assigned, 0);
        assert_eq!(out.leftover_repl.len(), 1);
        assert_eq!(out.leftover_repl[0].task_ref, "r2");
    }

    #[test]
    fn drained_buffer_admits_next_repl() {
        // Same stall, but a picker drains the buffer so day 2 can refill it.
        let repl = vec![
            group("r1", TaskKind::Replenishment, "F1", 50.0, None),
            group("r2", TaskKind::Replenishment, "F1", 50.0, None),
        ];
        let dist = vec![
            group("d1", TaskKind::Distribution, "P1", 40.0, Some("r1")),
            group("d2", TaskKind::Distribution, "P1", 40.0, Some("r2")),
        ];
        let caps = capacity_index(&[
            (day(7), &[("F1", 50.0)], &[("P1", 40.0)]),
            (day(8), &[("F1", 50.0)], &[("P1", 40.0)]),
        ]);

        let out = sim(1)
            .run(repl, dist, &caps, &mut DecisionRecorder::disabled())
            .unwrap();

        assert_eq!(out.days[0].repl_assigned, 1);
        assert_eq!(out.days[0].dist_assigned, 1);
        assert_eq!(out.days[1].repl_assigned, 1);
        assert_eq!(out.days[1].dist_assigned, 1);
        assert!(out.leftover_repl.is_empty() && out.leftover_dist.is_empty());
    }

    #[test]
    fn unmet_precedence_leaves_dist_in_pool() {
        let repl = vec![group("r1", TaskKind::Replenishment, "F1", 50.0, None)];
        let dist = vec![group("d1", TaskKind::Distribution, "P1", 40.0, Some("ghost"))];
        let caps = capacity_index(&[(day(7), &[("F1", 100.0)], &[("P1", 100.0)])]);

        let out = sim(2)
            .run(repl, dist, &caps, &mut DecisionRecorder::disabled())
            .unwrap();

        assert_eq!(out.assignments.len(), 1);
        assert_eq!(out.assignments[0].group.task_ref, "r1");
        assert_eq!(out.leftover_dist.len(), 1);
        assert_eq!(out.leftover_dist[0].task_ref, "d1");
    }

    #[test]
    fn capacity_one_buffer_alternates() {
        // With one buffer slot and both sides ready, every repl must be
        // followed by a dist before the next repl fits.
        let repl = vec![
            group("r1", TaskKind::Replenishment, "F1", 10.0, None),
            group("r2", TaskKind::Replenishment, "F1", 10.0, None),
            group("r3", TaskKind::Replenishment, "F1", 10.0, None),
        ];
        let dist = vec![
            group("d1", TaskKind::Distribution, "P1", 10.0, None),
            group("d2", TaskKind::Distribution, "P1", 10.0, None),
            group("d3", TaskKind::Distribution, "P1", 10.0, None),
        ];
        let caps = capacity_index(&[(day(7), &[("F1", 100.0)], &[("P1", 100.0)])]);

        let out = sim(1)
            .run(repl, dist, &caps, &mut DecisionRecorder::disabled())
            .unwrap();

        let kinds: Vec<TaskKind> = out.assignments.iter().map(|a| a.group.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TaskKind::Replenishment,
                TaskKind::Distribution,
                TaskKind::Replenishment,
                TaskKind::Distribution,
                TaskKind::Replenishment,
                TaskKind::Distribution,
            ]
        );
    }

    #[test]
    fn transition_penalty_counts_from_second_task() {
        let repl = vec![
            group("r1", TaskKind::Replenishment, "F1", 40.0, None),
            group("r2", TaskKind::Replenishment, "F1", 40.0, None),
        ];
        let caps = capacity_index(&[(day(7), &[("F1", 100.0)], &[])]);

        let mut s = sim(5);
        s.forklift_transition_sec = 15.0;
        let out = s
            .run(repl, vec![], &caps, &mut DecisionRecorder::disabled())
            .unwrap();

        assert_eq!(out.assignments[0].transition_sec, 0.0);
        assert_eq!(out.assignments[0].start_offset_sec, 0.0);
        assert_eq!(out.assignments[1].transition_sec, 15.0);
        assert_eq!(out.assignments[1].start_offset_sec, 55.0);
        assert_eq!(out.days[0].makespan_sec, 95.0);
        assert_eq!(out.days[0].worker_loads, vec![("F1".to_string(), 95.0)]);
    }

    #[test]
    fn virtual_days_drain_leftovers_and_are_flagged() {
        let repl = vec![
            group("r1", TaskKind::Replenishment, "F1", 80.0, None),
            group("r2", TaskKind::Replenishment, "F1", 80.0, None),
        ];
        let dist = vec![
            group("d1", TaskKind::Distribution, "P1", 80.0, Some("r1")),
            group("d2", TaskKind::Distribution, "P1", 80.0, Some("r2")),
        ];
        let caps = capacity_index(&[(day(7), &[("F1", 100.0)], &[("P1", 100.0)])]);

        let out = sim(4)
            .run(repl, dist, &caps, &mut DecisionRecorder::disabled())
            .unwrap();

        assert_eq!(out.days.len(), 2);
        assert!(!out.days[0].virtual_day);
        assert!(out.days[1].virtual_day);
        assert_eq!(out.days[1].date, day(8));
        assert!(out.leftover_repl.is_empty() && out.leftover_dist.is_empty());
    }

    #[test]
    fn repl_scan_falls_through_oversized_head() {
        // Highest-priority repl does not fit anywhere; the next one does.
        let mut big = group("big", TaskKind::Replenishment, "F1", 500.0, None);
        big.priority = 100.0;
        let small = group("small", TaskKind::Replenishment, "F1", 50.0, None);
        let caps = capacity_index(&[(day(7), &[("F1", 100.0)], &[])]);

        let out = sim(5)
            .run(vec![big, small], vec![], &caps, &mut DecisionRecorder::disabled())
            .unwrap();

        assert_eq!(out.assignments.len(), 1);
        assert_eq!(out.assignments[0].group.task_ref, "small");
        assert_eq!(out.leftover_repl[0].task_ref, "big");
    }

    #[test]
    fn decision_log_records_assigns_and_skips() {
        let repl = vec![
            group("r1", TaskKind::Replenishment, "F1", 50.0, None),
            group("r2", TaskKind::Replenishment, "F1", 500.0, None),
        ];
        let caps = capacity_index(&[(day(7), &[("F1", 100.0)], &[])]);

        let mut rec = DecisionRecorder::new(true);
        let out = sim(5).run(repl, vec![], &caps, &mut rec).unwrap();

        assert_eq!(out.assignments.len(), 1);
        assert_eq!(rec.decisions.len(), 2);
        assert_eq!(rec.decisions[0].kind, DecisionKind::AssignRepl);
        assert_eq!(rec.decisions[0].buffer_before, 0);
        assert_eq!(rec.decisions[0].buffer_after, 1);
        assert_eq!(rec.decisions[1].kind, DecisionKind::SkipRepl);
        assert_eq!(rec.decisions[1].constraint, ActiveConstraint::NoCapacity);
        // One Gantt slice for the single assigned action.
        assert_eq!(rec.events.len(), 1);
    }

    #[test]
    fn lpt_oracle_balances_three_groups_on_two_forklifts() {
        // 100/60/40 onto two 120s forklifts: 100 alone, 60+40 together.
        let groups = vec![
            group("g100", TaskKind::Replenishment, "F1", 100.0, None),
            group("g60", TaskKind::Replenishment, "F1", 60.0, None),
            group("g40", TaskKind::Replenishment, "F1", 40.0, None),
        ];
        let plan = lpt_day_plan(
            &groups,
            &[("F1".to_string(), 120.0), ("F2".to_string(), 120.0)],
            0.0,
        );

        assert_eq!(
            plan.assignments,
            vec![
                ("g100".to_string(), "F1".to_string()),
                ("g60".to_string(), "F2".to_string()),
                ("g40".to_string(), "F2".to_string()),
            ]
        );
        assert_eq!(plan.loads, vec![("F1".to_string(), 100.0), ("F2".to_string(), 100.0)]);
        assert!(plan.unplaced.is_empty());
    }
}
