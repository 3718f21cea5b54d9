//! Configuration management for powledger

use crate::error::{ChainError, Result};
use crate::miner::DEFAULT_DIFFICULTY;
use crate::node::NodeConfig;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// 0 leaves the proof search unbounded.
    #[serde(default)]
    pub max_iterations: u64,
    #[serde(default = "default_reward_amount")]
    pub reward_amount: f64,
    /// Empty means a random identifier is generated at startup.
    #[serde(default)]
    pub node_id: String,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            max_iterations: 0,
            reward_amount: default_reward_amount(),
            node_id: String::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.network.api_port == 0 {
            return Err(ChainError::Config(
                "network.api_port must be non-zero".to_string(),
            ));
        }

        if !(1..=64).contains(&self.miner.difficulty) {
            return Err(ChainError::Config(format!(
                "miner.difficulty must be between 1 and 64, got {}",
                self.miner.difficulty
            )));
        }

        if !self.miner.reward_amount.is_finite() || self.miner.reward_amount < 0.0 {
            return Err(ChainError::Config(format!(
                "miner.reward_amount must be a non-negative number, got {}",
                self.miner.reward_amount
            )));
        }

        Ok(())
    }

    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            difficulty: self.miner.difficulty,
            max_iterations: (self.miner.max_iterations > 0).then_some(self.miner.max_iterations),
            reward_amount: self.miner.reward_amount,
            node_id: (!self.miner.node_id.is_empty()).then(|| self.miner.node_id.clone()),
        }
    }
}

/// Loads `config.toml` from the working directory, falling back to defaults when absent.
pub fn load_config() -> Result<Config> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let config = match fs::read_to_string(path.as_ref()) {
        Ok(config_str) => toml::from_str::<Config>(&config_str)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(e.into()),
    };

    config.validate()?;
    Ok(config)
}

fn default_api_port() -> u16 {
    5000
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_reward_amount() -> f64 {
    1.0
}
