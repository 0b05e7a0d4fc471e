use anyhow::{anyhow, bail};
use async_trait::async_trait;
use shared::domain::{ChainId, WalletAddress};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    Connected {
        address: WalletAddress,
        chain_id: ChainId,
    },
    Disconnected,
    ChainChanged {
        chain_id: ChainId,
    },
}

/// Account custody and network switching live behind this boundary; the
/// controller only consumes its events and issues the two requests below.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_disconnect(&self) -> anyhow::Result<()>;
    async fn request_switch_network(&self, chain_id: ChainId) -> anyhow::Result<()>;
    fn subscribe_events(&self) -> broadcast::Receiver<ProviderEvent>;
}

pub struct MissingWalletProvider;

#[async_trait]
impl WalletProvider for MissingWalletProvider {
    async fn request_disconnect(&self) -> anyhow::Result<()> {
        Err(anyhow!("wallet provider is unavailable"))
    }

    async fn request_switch_network(&self, chain_id: ChainId) -> anyhow::Result<()> {
        Err(anyhow!(
            "wallet provider is unavailable; cannot switch to chain {chain_id}"
        ))
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ProviderEvent> {
        broadcast::channel(1).1
    }
}

#[derive(Default)]
struct SimulatedWalletState {
    address: Option<WalletAddress>,
    chain_id: Option<ChainId>,
    fail_next_switch: bool,
    fail_next_disconnect: bool,
}

/// In-process wallet used by the CLI and tests. `connect` and `change_chain`
/// play the part of the user acting inside their wallet UI.
pub struct SimulatedWalletProvider {
    switchable_chains: Vec<ChainId>,
    state: Mutex<SimulatedWalletState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl SimulatedWalletProvider {
    pub fn new(switchable_chains: Vec<ChainId>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            switchable_chains,
            state: Mutex::new(SimulatedWalletState::default()),
            events,
        }
    }

    pub async fn connect(&self, address: WalletAddress, chain_id: ChainId) {
        {
            let mut state = self.state.lock().await;
            state.address = Some(address.clone());
            state.chain_id = Some(chain_id);
        }
        info!(address = %address.short(), %chain_id, "simulated wallet connected");
        let _ = self
            .events
            .send(ProviderEvent::Connected { address, chain_id });
    }

    /// Out-of-band network change made from the wallet itself.
    pub async fn change_chain(&self, chain_id: ChainId) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.address.is_none() {
                bail!("no wallet connected");
            }
            state.chain_id = Some(chain_id);
        }
        let _ = self.events.send(ProviderEvent::ChainChanged { chain_id });
        Ok(())
    }

    pub async fn fail_next_switch(&self) {
        self.state.lock().await.fail_next_switch = true;
    }

    pub async fn fail_next_disconnect(&self) {
        self.state.lock().await.fail_next_disconnect = true;
    }

    pub async fn chain_id(&self) -> Option<ChainId> {
        self.state.lock().await.chain_id
    }

    pub async fn address(&self) -> Option<WalletAddress> {
        self.state.lock().await.address.clone()
    }
}

#[async_trait]
impl WalletProvider for SimulatedWalletProvider {
    async fn request_disconnect(&self) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock().await;
            if std::mem::take(&mut state.fail_next_disconnect) {
                bail!("wallet rejected the disconnect request");
            }
            state.address = None;
            state.chain_id = None;
        }
        debug!("simulated wallet disconnected");
        let _ = self.events.send(ProviderEvent::Disconnected);
        Ok(())
    }

    async fn request_switch_network(&self, chain_id: ChainId) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.address.is_none() {
                bail!("no wallet connected");
            }
            if std::mem::take(&mut state.fail_next_switch) {
                bail!("user rejected the network switch");
            }
            if !self.switchable_chains.contains(&chain_id) {
                bail!("chain {chain_id} is not configured in the wallet");
            }
            state.chain_id = Some(chain_id);
        }
        debug!(%chain_id, "simulated wallet switched network");
        let _ = self.events.send(ProviderEvent::ChainChanged { chain_id });
        Ok(())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
