//! Wave data model: what the WMS executed, normalized for the engine.
//!
//! Kept small and serializable; adapters own the wire shapes and convert
//! into these types once, timestamps already resolved to `Option`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    Replenishment,
    Distribution,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Replenishment => "repl",
            TaskKind::Distribution => "dist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerRole {
    Forklift,
    Picker,
    Unknown,
}

impl WorkerRole {
    /// Role from the WMS role-template code.
    pub fn from_template(code: &str) -> Self {
        match code.trim() {
            "029" => WorkerRole::Forklift,
            "031" => WorkerRole::Picker,
            _ => WorkerRole::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerRole::Forklift => "Forklift",
            WorkerRole::Picker => "Picker",
            WorkerRole::Unknown => "Unknown",
        }
    }
}

/// One pallet movement row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub from_bin: String,
    pub to_bin: String,
    pub product_code: String,
    pub product_name: String,
    /// Per-unit weight.
    pub weight_kg: f64,
    pub qty_plan: f64,
    pub qty_fact: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Precomputed by the WMS for some rows; 0/absent means unknown.
    pub duration_sec: Option<f64>,
    pub sort_order: i32,
}

impl Action {
    /// Factual duration: explicit duration, else completed − started, else 0.
    pub fn resolve_duration(&self) -> f64 {
        if let Some(d) = self.duration_sec {
            if d > 0.0 {
                return d;
            }
        }
        match (self.started_at, self.completed_at) {
            (Some(s), Some(e)) if e > s => (e - s).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    /// Moved quantity: factual when positive, planned otherwise.
    pub fn qty(&self) -> f64 {
        if self.qty_fact > 0.0 { self.qty_fact } else { self.qty_plan }
    }

    /// Weight actually moved by this row.
    pub fn total_weight_kg(&self) -> f64 {
        self.weight_kg * self.qty()
    }
}

/// A cohesive bundle of actions executed by one worker as one pallet
/// operation. Transferred whole by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub task_ref: String,
    pub task_number: String,
    /// Set on distribution groups that must wait for a named replenishment.
    pub prev_task_ref: Option<String>,
    pub assignee_code: String,
    pub assignee_name: String,
    pub template_code: String,
    pub execution_status: String,
    pub actions: Vec<Action>,
}

impl TaskGroup {
    pub fn role(&self) -> WorkerRole {
        WorkerRole::from_template(&self.template_code)
    }

    pub fn total_weight_kg(&self) -> f64 {
        self.actions.iter().map(Action::total_weight_kg).sum()
    }

    /// Wall-clock span from earliest start to latest completion, when both
    /// exist.
    pub fn raw_span_sec(&self) -> Option<f64> {
        let start = self.actions.iter().filter_map(|a| a.started_at).min()?;
        let end = self.actions.iter().filter_map(|a| a.completed_at).max()?;
        if end > start {
            Some((end - start).num_milliseconds() as f64 / 1000.0)
        } else {
            Some(0.0)
        }
    }

    /// Earliest observed instant, used to pin the group to a calendar day.
    pub fn first_seen_at(&self) -> Option<DateTime<Utc>> {
        self.actions
            .iter()
            .filter_map(|a| a.started_at.or(a.completed_at))
            .min()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub number: i64,
    pub date: NaiveDate,
    pub status: String,
    pub replenishment: Vec<TaskGroup>,
    pub distribution: Vec<TaskGroup>,
}

impl Wave {
    pub fn groups(&self) -> impl Iterator<Item = (TaskKind, &TaskGroup)> {
        self.replenishment
            .iter()
            .map(|g| (TaskKind::Replenishment, g))
            .chain(self.distribution.iter().map(|g| (TaskKind::Distribution, g)))
    }

    pub fn action_count(&self) -> usize {
        self.groups().map(|(_, g)| g.actions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn action() -> Action {
        Action {
            from_bin: "01A-01-01-1".into(),
            to_bin: "01B-02-02-1".into(),
            product_code: "P1".into(),
            product_name: "Product 1".into(),
            weight_kg: 10.0,
            qty_plan: 4.0,
            qty_fact: 3.0,
            started_at: None,
            completed_at: None,
            duration_sec: None,
            sort_order: 1,
        }
    }

    #[test]
    fn duration_prefers_explicit_value() {
        let mut a = action();
        a.duration_sec = Some(45.0);
        a.started_at = Some(Utc.with_ymd_and_hms(2024, 3, 7, 8, 0, 0).unwrap());
        a.completed_at = Some(Utc.with_ymd_and_hms(2024, 3, 7, 9, 0, 0).unwrap());
        assert_eq!(a.resolve_duration(), 45.0);
    }

    #[test]
    fn duration_falls_back_to_timestamps_then_zero() {
        let mut a = action();
        a.started_at = Some(Utc.with_ymd_and_hms(2024, 3, 7, 8, 0, 0).unwrap());
        a.completed_at = Some(Utc.with_ymd_and_hms(2024, 3, 7, 8, 2, 0).unwrap());
        assert_eq!(a.resolve_duration(), 120.0);

        a.completed_at = None;
        assert_eq!(a.resolve_duration(), 0.0);
    }

    #[test]
    fn zero_explicit_duration_is_unknown() {
        let mut a = action();
        a.duration_sec = Some(0.0);
        assert_eq!(a.resolve_duration(), 0.0);
    }

    #[test]
    fn weight_uses_fact_qty_with_plan_fallback() {
        let mut a = action();
        assert_eq!(a.total_weight_kg(), 30.0);
        a.qty_fact = 0.0;
        assert_eq!(a.total_weight_kg(), 40.0);
    }

    #[test]
    fn role_mapping() {
        assert_eq!(WorkerRole::from_template("029"), WorkerRole::Forklift);
        assert_eq!(WorkerRole::from_template("031"), WorkerRole::Picker);
        assert_eq!(WorkerRole::from_template("007"), WorkerRole::Unknown);
    }
}
