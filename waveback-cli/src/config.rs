use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use waveback_core::BacktestConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub wms: WmsSection,
    pub stats: StatsSection,
    pub backtest: BacktestSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WmsSection {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSection {
    pub database_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSection {
    pub buffer_capacity: u32,
    pub default_route_duration_sec: f64,
    pub forklift_transition_sec: Option<f64>,
    pub picker_transition_sec: Option<f64>,
    pub timezone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let core = BacktestConfig::default();
        Self {
            wms: WmsSection { base_url: "http://localhost:8080".to_string() },
            stats: StatsSection {
                database_url: "sqlite://waveback.db?mode=rwc".to_string(),
            },
            backtest: BacktestSection {
                buffer_capacity: core.buffer_capacity,
                default_route_duration_sec: core.default_route_duration_sec,
                forklift_transition_sec: None,
                picker_transition_sec: None,
                timezone: core.timezone,
            },
        }
    }
}

impl BacktestSection {
    pub fn to_core(&self) -> BacktestConfig {
        BacktestConfig {
            buffer_capacity: self.buffer_capacity,
            default_route_duration_sec: self.default_route_duration_sec,
            forklift_transition_sec: self.forklift_transition_sec,
            picker_transition_sec: self.picker_transition_sec,
            timezone: self.timezone.clone(),
        }
    }
}

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home))
}

pub fn default_config_path() -> Result<PathBuf> {
    let dir = home_dir()?.join(".waveback");
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    }
    Ok(dir.join("config.toml"))
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

pub fn init_config(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    let raw = toml::to_string_pretty(&AppConfig::default()).context("serialize config")?;
    fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let raw = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.backtest.buffer_capacity, 12);
        assert_eq!(parsed.backtest.timezone, "UTC");
        assert!(parsed.backtest.to_core().validate().is_ok());
    }
}
