//! Read-only access to the historical statistics views.
//!
//! Only the columns the estimator needs are selected; whatever else the
//! views carry is ignored.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use waveback_core::error::{BacktestError, Result};
use waveback_core::stats::{PickerProductKey, RouteKey};
use waveback_core::{PickerProductStat, RouteStat, StatisticsRepo, TransitionStat};

pub struct SqliteStatisticsRepo {
    pool: SqlitePool,
}

impl SqliteStatisticsRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Row counts of the three views, for operator sanity checks.
    pub async fn table_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut counts = Vec::new();
        for table in ["route_stats", "picker_product_stats", "worker_transition_stats"] {
            let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&self.pool)
                .await
                .map_err(BacktestError::transport)?;
            counts.push((table.to_string(), n));
        }
        Ok(counts)
    }
}

#[async_trait]
impl StatisticsRepo for SqliteStatisticsRepo {
    async fn route_stats(
        &self,
        cancel: CancellationToken,
    ) -> Result<BTreeMap<RouteKey, RouteStat>> {
        let rows: Vec<(String, String, f64, f64)> = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BacktestError::Cancelled),
            res = sqlx::query_as(
                "SELECT from_zone, to_zone, avg_duration_sec, normalized_trips FROM route_stats",
            )
            .fetch_all(&self.pool) => res.map_err(BacktestError::transport)?,
        };

        Ok(rows
            .into_iter()
            .map(|(from, to, avg, trips)| {
                ((from, to), RouteStat { avg_duration_sec: avg, normalized_trips: trips })
            })
            .collect())
    }

    async fn picker_product_stats(
        &self,
        cancel: CancellationToken,
    ) -> Result<BTreeMap<PickerProductKey, PickerProductStat>> {
        let rows: Vec<(String, String, f64)> = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BacktestError::Cancelled),
            res = sqlx::query_as(
                "SELECT worker_code, product_code, avg_duration_sec FROM picker_product_stats",
            )
            .fetch_all(&self.pool) => res.map_err(BacktestError::transport)?,
        };

        Ok(rows
            .into_iter()
            .map(|(worker, product, avg)| {
                ((worker, product), PickerProductStat { avg_duration_sec: avg })
            })
            .collect())
    }

    async fn transition_stats(
        &self,
        cancel: CancellationToken,
    ) -> Result<BTreeMap<String, TransitionStat>> {
        let rows: Vec<(String, f64, i64)> = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BacktestError::Cancelled),
            res = sqlx::query_as(
                "SELECT worker_role, median_transition_sec, transition_count
                 FROM worker_transition_stats",
            )
            .fetch_all(&self.pool) => res.map_err(BacktestError::transport)?,
        };

        Ok(rows
            .into_iter()
            .map(|(role, median, count)| {
                (role, TransitionStat { median_transition_sec: median, observations: count })
            })
            .collect())
    }
}
