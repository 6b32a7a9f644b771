//! Contracts for the external collaborators.
//!
//! The engine only ever sees these two traits; HTTP and SQL live in the
//! adapter crates. Every operation takes a cancellation token and must
//! surface a trip as `BacktestError::Cancelled`.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::stats::{PickerProductKey, PickerProductStat, RouteKey, RouteStat, TransitionStat};
use crate::wave::Wave;

use std::collections::BTreeMap;

#[async_trait]
pub trait WaveSource: Send + Sync {
    /// Fetch one wave with all executed tasks. `WaveNotFound` when the
    /// number is unknown to the WMS.
    async fn fetch_wave(&self, wave_number: i64, cancel: CancellationToken) -> Result<Wave>;
}

#[async_trait]
pub trait StatisticsRepo: Send + Sync {
    async fn route_stats(
        &self,
        cancel: CancellationToken,
    ) -> Result<BTreeMap<RouteKey, RouteStat>>;

    async fn picker_product_stats(
        &self,
        cancel: CancellationToken,
    ) -> Result<BTreeMap<PickerProductKey, PickerProductStat>>;

    async fn transition_stats(
        &self,
        cancel: CancellationToken,
    ) -> Result<BTreeMap<String, TransitionStat>>;
}
