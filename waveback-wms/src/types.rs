//! Wire shapes of the `/wave-tasks` endpoint.
//!
//! The WMS emits camelCase JSON with empty strings and nulls used
//! interchangeably for absent values; conversion into the core model
//! resolves all of that once.

use serde::Deserialize;

use waveback_core::error::{BacktestError, Result};
use waveback_core::time::{parse_wms_date, parse_wms_timestamp};
use waveback_core::{Action, TaskGroup, Wave};

fn none_if_blank(raw: Option<String>) -> Option<String> {
    raw.and_then(|s| {
        let t = s.trim();
        if t.is_empty() { None } else { Some(t.to_string()) }
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionDto {
    pub storage_bin: String,
    pub allocation_bin: String,
    pub product_code: String,
    pub product_name: String,
    pub weight_kg: f64,
    pub qty_plan: f64,
    pub qty_fact: f64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub duration_sec: Option<f64>,
    pub sort_order: i32,
}

impl ActionDto {
    fn into_action(self) -> Action {
        Action {
            from_bin: self.storage_bin,
            to_bin: self.allocation_bin,
            product_code: self.product_code,
            product_name: self.product_name,
            weight_kg: self.weight_kg,
            qty_plan: self.qty_plan,
            qty_fact: self.qty_fact,
            started_at: self.started_at.as_deref().and_then(parse_wms_timestamp),
            completed_at: self.completed_at.as_deref().and_then(parse_wms_timestamp),
            duration_sec: self.duration_sec.filter(|d| *d > 0.0),
            sort_order: self.sort_order,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDto {
    pub task_ref: String,
    pub task_number: String,
    pub prev_task_ref: Option<String>,
    pub assignee_code: String,
    pub assignee_name: String,
    pub template_code: String,
    pub execution_status: String,
    pub execution_date: Option<String>,
    pub actions: Vec<ActionDto>,
}

impl TaskDto {
    fn into_group(self) -> TaskGroup {
        let mut actions: Vec<Action> =
            self.actions.into_iter().map(ActionDto::into_action).collect();
        actions.sort_by_key(|a| a.sort_order);

        TaskGroup {
            task_ref: self.task_ref,
            task_number: self.task_number,
            prev_task_ref: none_if_blank(self.prev_task_ref),
            assignee_code: self.assignee_code,
            assignee_name: self.assignee_name,
            template_code: self.template_code,
            execution_status: self.execution_status,
            actions,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaveTasksResponse {
    pub wave_number: i64,
    pub wave_date: String,
    pub status: String,
    pub replenishment_tasks: Vec<TaskDto>,
    pub distribution_tasks: Vec<TaskDto>,
}

impl WaveTasksResponse {
    pub fn into_wave(self) -> Result<Wave> {
        let date = parse_wms_date(&self.wave_date).ok_or_else(|| {
            BacktestError::InvalidInput(format!("unparseable wave date: {:?}", self.wave_date))
        })?;

        Ok(Wave {
            number: self.wave_number,
            date,
            status: self.status,
            replenishment: self
                .replenishment_tasks
                .into_iter()
                .map(TaskDto::into_group)
                .collect(),
            distribution: self
                .distribution_tasks
                .into_iter()
                .map(TaskDto::into_group)
                .collect(),
        })
    }
}
