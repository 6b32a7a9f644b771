//! Backtest configuration.
//!
//! One immutable struct; validated once before any computation.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};
use crate::stats::StatsBundle;
use crate::time::parse_timezone;
use crate::wave::WorkerRole;

pub const DEFAULT_ROUTE_DURATION_SEC: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Picking-buffer slots. Required, positive.
    pub buffer_capacity: u32,

    /// Fallback route duration when no route statistic applies.
    pub default_route_duration_sec: f64,

    /// Overrides for the between-task transition penalty. When `None`, the
    /// value is derived from transition statistics (0 without data).
    pub forklift_transition_sec: Option<f64>,
    pub picker_transition_sec: Option<f64>,

    /// Warehouse timezone (IANA name) used to bucket events into days.
    pub timezone: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 12,
            default_route_duration_sec: DEFAULT_ROUTE_DURATION_SEC,
            forklift_transition_sec: None,
            picker_transition_sec: None,
            timezone: "UTC".to_string(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(BacktestError::InvalidInput(
                "buffer capacity must be positive".into(),
            ));
        }
        if !self.default_route_duration_sec.is_finite() || self.default_route_duration_sec <= 0.0 {
            return Err(BacktestError::InvalidInput(
                "default route duration must be positive".into(),
            ));
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    /// Effective (forklift, picker) transition penalties for a run.
    pub fn transitions(&self, stats: &StatsBundle) -> (f64, f64) {
        let forklift = self
            .forklift_transition_sec
            .or_else(|| stats.mean_transition_for(WorkerRole::Forklift))
            .unwrap_or(0.0);
        let picker = self
            .picker_transition_sec
            .or_else(|| stats.mean_transition_for(WorkerRole::Picker))
            .unwrap_or(0.0);
        (forklift, picker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TransitionStat;

    #[test]
    fn zero_buffer_capacity_is_invalid() {
        let cfg = BacktestConfig { buffer_capacity: 0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(BacktestError::InvalidInput(_))));
    }

    #[test]
    fn bad_timezone_is_invalid() {
        let cfg = BacktestConfig { timezone: "Mars/Olympus".into(), ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn transition_overrides_win_over_stats() {
        let mut stats = StatsBundle::default();
        stats.transitions.insert(
            "029".into(),
            TransitionStat { median_transition_sec: 33.0, observations: 5 },
        );

        let cfg = BacktestConfig {
            forklift_transition_sec: Some(10.0),
            ..Default::default()
        };
        assert_eq!(cfg.transitions(&stats), (10.0, 0.0));

        let derived = BacktestConfig::default();
        assert_eq!(derived.transitions(&stats), (33.0, 0.0));
    }
}
