//! Configuration loading (ambient stack, SPEC_FULL §6).
//!
//! Recognized options mirror spec.md §6 exactly. Structure comes from a TOML
//! file; anything secret-shaped (`ethereum.passphrase`) can be overridden
//! from the environment at load time, the way
//! `crates/x402/src/config.rs`'s `X402Config::from_env` keeps secrets out of
//! checked-in files.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid ledger_subsystem.max_transactions: must be an even integer >= 2, got {0}")]
    InvalidCapacity(u32),
    #[error("unsupported ledger_subsystem.subsystem: {0} (only \"ethereum\" is supported)")]
    UnsupportedSubsystem(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub workingdir: PathBuf,
    #[serde(default)]
    pub ledger: LedgerDbConfig,
    pub ledger_subsystem: LedgerSubsystemConfig,
    pub ethereum: EthereumConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerDbConfig {
    #[serde(default = "default_auxiliary_db")]
    pub auxiliary_db: String,
}

fn default_auxiliary_db() -> String {
    "bbc_aux.sqlite3".to_string()
}

impl Default for LedgerDbConfig {
    fn default() -> Self {
        Self {
            auxiliary_db: default_auxiliary_db(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSubsystemConfig {
    pub max_transactions: u32,
    pub max_seconds: u64,
    pub subsystem: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EthereumConfig {
    pub account: String,
    pub passphrase: String,
    pub contract_address: String,
    pub chain_id: u64,
}

impl Config {
    /// Load from a TOML file, then apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::from_str(&text, path)?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Secrets recognized from the environment, overriding whatever the file
    /// said. `LEDGER_ETHEREUM_PASSPHRASE` and `LEDGER_ETHEREUM_ACCOUNT` take
    /// priority so credentials never need to land in a checked-in file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LEDGER_ETHEREUM_PASSPHRASE") {
            self.ethereum.passphrase = v;
        }
        if let Ok(v) = std::env::var("LEDGER_ETHEREUM_ACCOUNT") {
            self.ethereum.account = v;
        }
    }

    /// Validate the recognized options named in spec.md §6.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cap = self.ledger_subsystem.max_transactions;
        if cap < 2 || cap % 2 != 0 {
            return Err(ConfigError::InvalidCapacity(cap));
        }
        if self.ledger_subsystem.subsystem != "ethereum" {
            return Err(ConfigError::UnsupportedSubsystem(
                self.ledger_subsystem.subsystem.clone(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn auxiliary_db_path(&self) -> PathBuf {
        self.workingdir.join(&self.ledger.auxiliary_db)
    }

    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.workingdir.join("ledger_subsystem.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
        workingdir = "/tmp/ledger"

        [ledger]
        auxiliary_db = "bbc_aux.sqlite3"

        [ledger_subsystem]
        max_transactions = 1000
        max_seconds = 300
        subsystem = "ethereum"

        [ethereum]
        account = "0xdead"
        passphrase = "hunter2"
        contract_address = "0xbeef"
        chain_id = 1337
        "#
    }

    #[test]
    fn parses_recognized_options() {
        let cfg = Config::from_str(sample_toml(), Path::new("test.toml")).unwrap();
        assert_eq!(cfg.workingdir, PathBuf::from("/tmp/ledger"));
        assert_eq!(cfg.ledger.auxiliary_db, "bbc_aux.sqlite3");
        assert_eq!(cfg.ledger_subsystem.max_transactions, 1000);
        assert_eq!(cfg.ledger_subsystem.subsystem, "ethereum");
        assert_eq!(cfg.ethereum.chain_id, 1337);
    }

    #[test]
    fn rejects_odd_capacity() {
        let toml = sample_toml().replace("max_transactions = 1000", "max_transactions = 7");
        let cfg = Config::from_str(&toml, Path::new("test.toml")).unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidCapacity(7))
        ));
    }

    #[test]
    fn rejects_unsupported_subsystem() {
        let toml = sample_toml().replace("subsystem = \"ethereum\"", "subsystem = \"bitcoin\"");
        let cfg = Config::from_str(&toml, Path::new("test.toml")).unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnsupportedSubsystem(s)) if s == "bitcoin"
        ));
    }

    #[test]
    fn default_auxiliary_db_when_section_missing() {
        let toml = r#"
        workingdir = "/tmp/ledger"

        [ledger_subsystem]
        max_transactions = 2
        max_seconds = 60
        subsystem = "ethereum"

        [ethereum]
        account = "a"
        passphrase = "b"
        contract_address = "c"
        chain_id = 1
        "#;
        let cfg = Config::from_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(cfg.ledger.auxiliary_db, "bbc_aux.sqlite3");
    }
}
