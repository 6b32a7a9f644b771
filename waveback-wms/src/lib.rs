//! waveback-wms: HTTP adapter for the warehouse wave source.

pub mod client;
pub mod types;

pub use client::WmsClient;
pub use types::WaveTasksResponse;
