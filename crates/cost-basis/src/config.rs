use crate::error::{CostBasisError, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Days before or after a loss sale in which a purchase is a replacement
    pub wash_sale_window_days: u32,
    /// Share counts closer than this are treated as equal
    pub share_epsilon: f64,
    /// Whether sales with confirmed proceeds are checked for wash sales
    pub wash_sale_enabled: bool,
    /// Emit a lots snapshot after every applied transaction
    pub lot_snapshots: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wash_sale_window_days: 30,
            share_epsilon: 0.001,
            wash_sale_enabled: true,
            lot_snapshots: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            wash_sale_window_days: env_or("WASH_SALE_WINDOW_DAYS", defaults.wash_sale_window_days)?,
            share_epsilon: env_or("SHARE_EPSILON", defaults.share_epsilon)?,
            wash_sale_enabled: env_or("WASH_SALE_ENABLED", defaults.wash_sale_enabled)?,
            lot_snapshots: env_or("LOT_SNAPSHOTS", defaults.lot_snapshots)?,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| CostBasisError::Parse(format!("{}={} is not valid", key, value))),
        Err(_) => Ok(default),
    }
}
