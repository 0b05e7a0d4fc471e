use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use shared::domain::ChainId;

pub const SEPOLIA: ChainId = ChainId(11_155_111);
pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub id: ChainId,
    pub name: String,
}

impl ChainInfo {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: ChainId(id),
            name: name.into(),
        }
    }
}

pub fn default_supported_chains() -> Vec<ChainInfo> {
    vec![
        ChainInfo::new(SEPOLIA.0, "Sepolia"),
        ChainInfo::new(97, "BNB Smart Chain Testnet"),
        ChainInfo::new(168_587_773, "Blast Sepolia"),
        ChainInfo::new(1, "Ethereum"),
        ChainInfo::new(137, "Polygon"),
        ChainInfo::new(10, "OP Mainnet"),
        ChainInfo::new(42_161, "Arbitrum One"),
        ChainInfo::new(8_453, "Base"),
    ]
}

/// Everything the controller needs to know about its environment, supplied
/// once at construction.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub app_name: String,
    pub project_id: Option<String>,
    pub required_chain_id: ChainId,
    pub supported_chains: Vec<ChainInfo>,
    pub confirmation_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            app_name: "WalletConnection".into(),
            project_id: None,
            required_chain_id: SEPOLIA,
            supported_chains: default_supported_chains(),
            confirmation_delay: DEFAULT_CONFIRMATION_DELAY,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            bail!("app name must not be empty");
        }
        if self.supported_chains.is_empty() {
            bail!("at least one supported chain must be configured");
        }
        if self.chain(self.required_chain_id).is_none() {
            bail!(
                "required chain {} is not in the supported chain list",
                self.required_chain_id
            );
        }
        Ok(())
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainInfo> {
        self.supported_chains
            .iter()
            .find(|chain| chain.id == chain_id)
    }

    pub fn network_name(&self, chain_id: ChainId) -> String {
        self.chain(chain_id)
            .map(|chain| chain.name.clone())
            .unwrap_or_else(|| format!("chain {chain_id}"))
    }

    pub fn required_network_name(&self) -> String {
        self.network_name(self.required_chain_id)
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.supported_chains.iter().map(|chain| chain.id).collect()
    }
}
