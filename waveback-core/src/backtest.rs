//! Run orchestration: fetch the wave and statistics, prepare, simulate,
//! assemble.
//!
//! The wave fetch and the statistics reads are the run's only suspension
//! points; everything after the data is in memory is synchronous and
//! deterministic.

use tokio_util::sync::CancellationToken;

use crate::capacity::{prepare_groups, scale_to_capacity};
use crate::config::BacktestConfig;
use crate::decision::DecisionRecorder;
use crate::error::{BacktestError, Result};
use crate::estimate::DurationEstimator;
use crate::priority::score_groups;
use crate::result::{assemble_result, BacktestResult};
use crate::simulator::Simulator;
use crate::source::{StatisticsRepo, WaveSource};
use crate::stats::StatsBundle;
use crate::wave::{TaskKind, Wave};

pub struct BacktestRunner<'a> {
    source: &'a dyn WaveSource,
    stats: &'a dyn StatisticsRepo,
    config: BacktestConfig,
    record_decisions: bool,
}

impl<'a> BacktestRunner<'a> {
    pub fn new(
        source: &'a dyn WaveSource,
        stats: &'a dyn StatisticsRepo,
        config: BacktestConfig,
    ) -> Self {
        Self { source, stats, config, record_decisions: true }
    }

    /// Drop the decision-log / Gantt side-output.
    pub fn without_decision_log(mut self) -> Self {
        self.record_decisions = false;
        self
    }

    pub async fn run(&self, wave_number: i64, cancel: CancellationToken) -> Result<BacktestResult> {
        self.config.validate()?;

        let (wave, stats) = tokio::join!(
            self.source.fetch_wave(wave_number, cancel.clone()),
            fetch_statistics(self.stats, cancel.clone()),
        );
        let wave = wave?;
        let stats = stats?;

        if cancel.is_cancelled() {
            return Err(BacktestError::Cancelled);
        }

        run_backtest(&wave, &stats, &self.config, self.record_decisions)
    }
}

/// The three statistics reads overlap. A transport failure degrades that
/// table to empty (the estimator chain tolerates it); anything else aborts.
async fn fetch_statistics(
    repo: &dyn StatisticsRepo,
    cancel: CancellationToken,
) -> Result<StatsBundle> {
    let (routes, picker_products, transitions) = tokio::join!(
        repo.route_stats(cancel.clone()),
        repo.picker_product_stats(cancel.clone()),
        repo.transition_stats(cancel.clone()),
    );

    Ok(StatsBundle {
        routes: degrade_to_empty(routes, "route_stats")?,
        picker_products: degrade_to_empty(picker_products, "picker_product_stats")?,
        transitions: degrade_to_empty(transitions, "worker_transition_stats")?,
    })
}

fn degrade_to_empty<T: Default>(result: Result<T>, table: &'static str) -> Result<T> {
    match result {
        Ok(v) => Ok(v),
        Err(BacktestError::Transport(err)) => {
            tracing::warn!(table, %err, "statistics unavailable, proceeding with empty table");
            Ok(T::default())
        }
        Err(other) => Err(other),
    }
}

/// Synchronous core: everything between resolved inputs and the report.
pub fn run_backtest(
    wave: &Wave,
    stats: &StatsBundle,
    config: &BacktestConfig,
    record_decisions: bool,
) -> Result<BacktestResult> {
    config.validate()?;
    let tz = config.tz()?;

    let estimator = DurationEstimator::for_wave(stats, wave);
    tracing::debug!(
        wave = wave.number,
        mean_sec = estimator.wave_mean_sec(),
        "prepared duration estimator"
    );
    let mut groups = prepare_groups(wave, &estimator, tz);
    let capacities = scale_to_capacity(&mut groups);
    score_groups(&mut groups, stats, config.default_route_duration_sec);

    let (repl, dist): (Vec<_>, Vec<_>) = groups
        .into_iter()
        .partition(|g| g.kind == TaskKind::Replenishment);

    let (forklift_transition_sec, picker_transition_sec) = config.transitions(stats);
    let simulator = Simulator {
        buffer_capacity: config.buffer_capacity,
        forklift_transition_sec,
        picker_transition_sec,
    };

    let mut recorder = DecisionRecorder::new(record_decisions);
    let outcome = simulator.run(repl, dist, &capacities, &mut recorder)?;
    let result = assemble_result(wave, &outcome, recorder, config, tz);

    tracing::info!(
        wave = wave.number,
        improvement_percent = result.improvement_percent,
        days_saved = result.days_saved,
        leftover = result.leftover_repl.len() + result.leftover_dist.len(),
        "backtest complete"
    );
    Ok(result)
}
