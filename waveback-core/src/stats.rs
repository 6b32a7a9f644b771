//! Historical statistics tables consumed by the estimator.
//!
//! All maps are BTreeMaps so a run iterates them in one order regardless of
//! where the tables came from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::wave::WorkerRole;

/// Average travel between two zones, with how many normalized trips back it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteStat {
    pub avg_duration_sec: f64,
    pub normalized_trips: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickerProductStat {
    pub avg_duration_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionStat {
    pub median_transition_sec: f64,
    pub observations: i64,
}

pub type RouteKey = (String, String);
pub type PickerProductKey = (String, String);

/// The three statistics tables, possibly empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsBundle {
    /// (from_zone, to_zone) → route stat.
    pub routes: BTreeMap<RouteKey, RouteStat>,
    /// (worker_code, product_code) → picker/product stat.
    pub picker_products: BTreeMap<PickerProductKey, PickerProductStat>,
    /// worker role-template code → transition stat.
    pub transitions: BTreeMap<String, TransitionStat>,
}

impl StatsBundle {
    pub fn route(&self, from_zone: &str, to_zone: &str) -> Option<&RouteStat> {
        self.routes
            .get(&(from_zone.to_string(), to_zone.to_string()))
    }

    pub fn picker_product(&self, worker: &str, product: &str) -> Option<&PickerProductStat> {
        self.picker_products
            .get(&(worker.to_string(), product.to_string()))
    }

    /// Mean of per-role median transitions for one role, `None` without data.
    pub fn mean_transition_for(&self, role: WorkerRole) -> Option<f64> {
        let medians: Vec<f64> = self
            .transitions
            .iter()
            .filter(|(code, _)| WorkerRole::from_template(code) == role)
            .map(|(_, s)| s.median_transition_sec)
            .collect();
        if medians.is_empty() {
            None
        } else {
            Some(medians.iter().sum::<f64>() / medians.len() as f64)
        }
    }
}
