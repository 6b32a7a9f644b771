//! HTTP client for the wave source.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use waveback_core::error::{BacktestError, Result};
use waveback_core::{Wave, WaveSource};

use crate::types::WaveTasksResponse;

#[derive(Debug, Clone)]
pub struct WmsClient {
    http: reqwest::Client,
    base_url: String,
}

impl WmsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_wave_tasks(&self, wave_number: i64) -> Result<WaveTasksResponse> {
        let url = format!("{}/wave-tasks", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("wave", wave_number)])
            .send()
            .await
            .map_err(BacktestError::transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BacktestError::WaveNotFound(wave_number));
        }
        let response = response
            .error_for_status()
            .map_err(BacktestError::transport)?;

        response
            .json::<WaveTasksResponse>()
            .await
            .map_err(BacktestError::transport)
    }
}

#[async_trait]
impl WaveSource for WmsClient {
    async fn fetch_wave(&self, wave_number: i64, cancel: CancellationToken) -> Result<Wave> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BacktestError::Cancelled),
            res = self.get_wave_tasks(wave_number) => res?,
        };

        tracing::debug!(
            wave = wave_number,
            repl = response.replenishment_tasks.len(),
            dist = response.distribution_tasks.len(),
            "fetched wave tasks"
        );
        response.into_wave()
    }
}
