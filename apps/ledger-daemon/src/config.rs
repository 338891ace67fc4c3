//! Daemon-level configuration: where to find the ledger config file, which
//! address to bind, and whether to talk to a real Ethereum node or the
//! in-memory stub. Mirrors the env-var driven setup the original keeper
//! binary used for its own provider toggle (`KEEPER_USE_STUB`,
//! `ETHERLINK_ENDPOINT`), renamed for this subsystem.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub ledger_config_path: PathBuf,
    pub bind_addr: String,
    pub use_stub_anchor: bool,
    pub ethereum_endpoint: String,
}

impl DaemonConfig {
    /// Read daemon-level settings from the environment. The ledger
    /// subsystem's own recognized options (spec §6) are loaded separately
    /// from `ledger_config_path` via `ledger_core::Config::load`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            ledger_config_path: std::env::var("LEDGER_CONFIG")
                .unwrap_or_else(|_| "ledger.toml".to_string())
                .into(),
            bind_addr: std::env::var("LEDGER_DAEMON_BIND")
                .unwrap_or_else(|_| "0.0.0.0:8088".to_string()),
            use_stub_anchor: parse_bool_env("LEDGER_USE_STUB_ANCHOR"),
            ethereum_endpoint: std::env::var("LEDGER_ETHEREUM_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8545".to_string()),
        }
    }
}

fn parse_bool_env(key: &str) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        Err(_) => false,
    }
}
