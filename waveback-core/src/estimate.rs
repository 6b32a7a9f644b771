//! Per-action duration estimation.
//!
//! Four ranked sources, first hit wins:
//! 1. the action's own recorded duration,
//! 2. the (worker, product) picker average,
//! 3. the (from-zone, to-zone) route average, when enough trips back it,
//! 4. the wave mean (fixed fallback when the wave has no timed action).

use serde::{Deserialize, Serialize};

use crate::stats::StatsBundle;
use crate::wave::Wave;

/// Route stats with fewer normalized trips than this are ignored.
pub const MIN_ROUTE_TRIPS: f64 = 3.0;

/// Wave mean fallback when not a single action carries a duration.
pub const FALLBACK_MEAN_SEC: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DurationSource {
    Actual,
    PickerProduct,
    RouteStats,
    Default,
}

impl DurationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DurationSource::Actual => "actual",
            DurationSource::PickerProduct => "picker_product",
            DurationSource::RouteStats => "route_stats",
            DurationSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DurationEstimator<'a> {
    stats: &'a StatsBundle,
    wave_mean_sec: f64,
}

impl<'a> DurationEstimator<'a> {
    pub fn new(stats: &'a StatsBundle, wave_mean_sec: f64) -> Self {
        Self { stats, wave_mean_sec }
    }

    /// Estimator seeded with the wave's own mean action duration.
    pub fn for_wave(stats: &'a StatsBundle, wave: &Wave) -> Self {
        Self::new(stats, wave_mean_duration_sec(wave))
    }

    pub fn wave_mean_sec(&self) -> f64 {
        self.wave_mean_sec
    }

    /// Duration and its source for one action context. `actual_sec` is the
    /// action's resolved factual duration (0 when unknown).
    pub fn estimate(
        &self,
        worker_code: &str,
        from_zone: &str,
        to_zone: &str,
        product_code: &str,
        actual_sec: f64,
    ) -> (f64, DurationSource) {
        if actual_sec > 0.0 {
            return (actual_sec, DurationSource::Actual);
        }

        if let Some(pp) = self.stats.picker_product(worker_code, product_code) {
            return (pp.avg_duration_sec, DurationSource::PickerProduct);
        }

        if let Some(route) = self.stats.route(from_zone, to_zone) {
            if route.normalized_trips >= MIN_ROUTE_TRIPS {
                return (route.avg_duration_sec, DurationSource::RouteStats);
            }
        }

        (self.wave_mean_sec, DurationSource::Default)
    }
}

/// Arithmetic mean of all positive resolved action durations in the wave,
/// or the fixed fallback when there are none.
pub fn wave_mean_duration_sec(wave: &Wave) -> f64 {
    let mut sum = 0.0;
    let mut n = 0u32;
    for (_, group) in wave.groups() {
        for action in &group.actions {
            let d = action.resolve_duration();
            if d > 0.0 {
                sum += d;
                n += 1;
            }
        }
    }
    if n == 0 { FALLBACK_MEAN_SEC } else { sum / n as f64 }
}
