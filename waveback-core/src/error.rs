//! Error kinds for a backtest run.
//!
//! Adapters map their transport failures into these variants; the core never
//! invents new stringly-typed codes on top.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("wave {0} not found")]
    WaveNotFound(i64),

    #[error("transport: {0}")]
    Transport(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cancelled")]
    Cancelled,

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl BacktestError {
    /// Wrap an adapter-level failure (HTTP, SQL, decode) as a transport error.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BacktestError>;
