//! waveback-store: relational statistics reads and write-once persistence
//! of backtest runs (SQLite via sqlx).

pub mod runs;
pub mod stats;

use sqlx::SqlitePool;
use waveback_core::error::{BacktestError, Result};

pub use runs::BacktestRunStore;
pub use stats::SqliteStatisticsRepo;

/// Open a pool for a `sqlite:` URL.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    SqlitePool::connect(database_url)
        .await
        .map_err(BacktestError::transport)
}
