//! Configuration management for powpool

use crate::blockchain::MAX_DIFFICULTY;
use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MiningConfig {
    /// Required leading zero bits of every block hash. Fixed for the process.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Width of each nonce range handed to a worker.
    #[serde(default = "default_increment")]
    pub increment: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GenesisConfig {
    #[serde(default = "default_genesis_payload")]
    pub payload: String,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            increment: default_increment(),
            workers: default_workers(),
        }
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            payload: default_genesis_payload(),
        }
    }
}

fn default_difficulty() -> u32 {
    16
}

fn default_increment() -> u64 {
    100_000
}

fn default_workers() -> usize {
    10
}

fn default_genesis_payload() -> String {
    "Proof of work is money!".to_string()
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.mining.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidConfig(format!(
                "mining.difficulty must be at most {}",
                MAX_DIFFICULTY
            )));
        }

        if self.mining.increment == 0 {
            return Err(ChainError::InvalidConfig(
                "mining.increment must be greater than zero".to_string(),
            ));
        }

        if self.mining.workers == 0 {
            return Err(ChainError::InvalidConfig(
                "mining.workers must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load configuration from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(path)?;
    Config::from_toml(&config_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.mining.difficulty, 16);
        assert_eq!(config.mining.increment, 100_000);
        assert_eq!(config.mining.workers, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml("[mining]\ndifficulty = 12\n").unwrap();
        assert_eq!(config.mining.difficulty, 12);
        assert_eq!(config.mining.increment, 100_000);
        assert_eq!(config.genesis, GenesisConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml("[mining]\ndifficulty = 300\n"),
            Err(ChainError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::from_toml("[mining]\nincrement = 0\n"),
            Err(ChainError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::from_toml("[mining]\nworkers = 0\n"),
            Err(ChainError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::from_toml("[mining]\ndifficulty = \"hard\"\n"),
            Err(ChainError::Toml(_))
        ));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("powpool.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[mining]\ndifficulty = 10\nincrement = 5000\nworkers = 4\n").unwrap();
        writeln!(file, "[genesis]\npayload = \"X\"").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.mining.difficulty, 10);
        assert_eq!(config.mining.increment, 5000);
        assert_eq!(config.mining.workers, 4);
        assert_eq!(config.genesis.payload, "X");
    }
}
