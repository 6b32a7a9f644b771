//! waveback-core: backtesting engine for warehouse replenishment waves.

pub mod backtest;
pub mod bins;
pub mod capacity;
pub mod config;
pub mod decision;
pub mod error;
pub mod estimate;
pub mod intervals;
pub mod priority;
pub mod result;
pub mod simulator;
pub mod source;
pub mod stats;
pub mod time;
pub mod timeline;
pub mod wave;

pub use backtest::{run_backtest, BacktestRunner};
pub use bins::{zone_of, BinAddress};
pub use config::BacktestConfig;
pub use decision::{
    ActiveConstraint, AltTask, AltWorker, DecisionKind, DecisionRecord, DecisionRecorder,
    ScheduleEvent, TimelineKind,
};
pub use error::{BacktestError, Result};
pub use estimate::{DurationEstimator, DurationSource};
pub use result::{BacktestResult, DayBreakdown, SourceCounts, TaskDetail, WorkerBreakdown};
pub use simulator::{AssignedGroup, DayPlan, SimOutcome, Simulator};
pub use source::{StatisticsRepo, WaveSource};
pub use stats::{PickerProductStat, RouteStat, StatsBundle, TransitionStat};
pub use timeline::{build_actual_timeline, ActualTimeline, WorkerTimeline};
pub use wave::{Action, TaskGroup, TaskKind, Wave, WorkerRole};
