// src/config.rs

//! Run configuration, loaded from JSON.

use crate::agents::agent_type::TraderType;
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMode {
    /// Buy and sell assignments with uniform limit prices.
    Mixed,
    /// Buy assignments only, limits drawn from a normal distribution.
    Demand,
}

/// How an `AssignmentServer` hands out work for one commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentServerConfig {
    pub commodity: String,
    pub mode: ServerMode,
    /// Chance that a trader receives an assignment on a given tick.
    pub probability: f64,
    pub buy_limit_min: f64,
    pub buy_limit_max: f64,
    pub sell_limit_min: f64,
    pub sell_limit_max: f64,
    pub demand_mean: f64,
    pub demand_std_dev: f64,
    pub max_volume: u64,
    /// Ticks from issue to deadline.
    pub deadline_horizon: u64,
}

impl Default for AssignmentServerConfig {
    fn default() -> Self {
        Self {
            commodity: "small".to_string(),
            mode: ServerMode::Mixed,
            probability: 0.1,
            buy_limit_min: 0.05,
            buy_limit_max: 0.15,
            sell_limit_min: 0.03,
            sell_limit_max: 0.12,
            demand_mean: 0.08,
            demand_std_dev: 0.02,
            max_volume: 3,
            deadline_horizon: 50,
        }
    }
}

impl AssignmentServerConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MarketError::InvalidConfig(msg));
        if !(0.0..=1.0).contains(&self.probability) {
            return invalid(format!("probability {} outside [0, 1]", self.probability));
        }
        for (name, lo, hi) in [
            ("buy limit", self.buy_limit_min, self.buy_limit_max),
            ("sell limit", self.sell_limit_min, self.sell_limit_max),
        ] {
            if !lo.is_finite() || !hi.is_finite() || lo <= 0.0 || lo > hi {
                return invalid(format!("{} range [{}, {}] is not a positive interval", name, lo, hi));
            }
        }
        if !self.demand_mean.is_finite() || self.demand_mean <= 0.0 {
            return invalid(format!("demand mean {} must be positive", self.demand_mean));
        }
        if !self.demand_std_dev.is_finite() || self.demand_std_dev < 0.0 {
            return invalid(format!("demand std dev {} must be non-negative", self.demand_std_dev));
        }
        if self.max_volume == 0 {
            return invalid("max volume must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderSpec {
    pub kind: TraderType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub ticks: u64,
    /// Log a report every this many ticks; 0 disables.
    pub report_every: u64,
    pub commodities: Vec<String>,
    pub traders: Vec<TraderSpec>,
    pub servers: Vec<AssignmentServerConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 200,
            report_every: 50,
            commodities: vec!["small".to_string()],
            traders: vec![
                TraderSpec {
                    kind: TraderType::Zip,
                    count: 10,
                },
                TraderSpec {
                    kind: TraderType::Test,
                    count: 2,
                },
            ],
            servers: vec![AssignmentServerConfig::default()],
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.commodities.is_empty() {
            return Err(MarketError::InvalidConfig("no commodities".to_string()));
        }
        if let Some(name) = self.commodities.iter().find(|c| c.trim().is_empty()) {
            return Err(MarketError::InvalidConfig(format!("blank commodity name {:?}", name)));
        }
        for server in &self.servers {
            if !self.commodities.contains(&server.commodity) {
                return Err(MarketError::InvalidConfig(format!(
                    "server for unknown commodity {}",
                    server.commodity
                )));
            }
            server.validate()?;
        }
        Ok(())
    }

    pub fn trader_count(&self) -> usize {
        self.traders.iter().map(|t| t.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trader_count(), 12);
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let config = SimulationConfig::from_json_str(
            r#"{
                "seed": 7,
                "traders": [{ "kind": "market_maker", "count": 1 }, { "kind": "instance", "count": 4 }],
                "servers": [{ "commodity": "small", "mode": "demand", "max_volume": 2 }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.ticks, 200);
        assert_eq!(config.traders[0].kind, TraderType::MarketMaker);
        assert_eq!(config.servers[0].mode, ServerMode::Demand);
        assert_eq!(config.servers[0].max_volume, 2);
        assert_eq!(config.servers[0].deadline_horizon, 50);
    }

    #[test]
    fn unknown_trader_kind_is_a_parse_error() {
        let err = SimulationConfig::from_json_str(r#"{ "traders": [{ "kind": "whale", "count": 1 }] }"#)
            .unwrap_err();
        assert!(matches!(err, MarketError::ConfigParse(_)));
    }

    #[test]
    fn rejects_bad_ranges() {
        let mut config = SimulationConfig::default();
        config.servers[0].buy_limit_min = 1.0;
        config.servers[0].buy_limit_max = 0.5;
        assert!(matches!(config.validate(), Err(MarketError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.servers[0].commodity = "large".into();
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            commodities: vec![],
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
