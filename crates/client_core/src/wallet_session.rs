use shared::domain::Session;
use tracing::{debug, info};
use wallet_provider::ProviderEvent;

use crate::network_gate::NetworkGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    Unchanged,
    Connected,
    Disconnected,
    ChainChanged,
}

#[derive(Default)]
pub struct WalletSession {
    session: Session,
}

impl WalletSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Applies a provider event and forwards the chain it carries to `gate`.
    pub fn on_provider_event(
        &mut self,
        event: &ProviderEvent,
        gate: &mut NetworkGate,
    ) -> SessionTransition {
        match event {
            ProviderEvent::Connected { address, chain_id } => {
                info!(address = %address.short(), %chain_id, "wallet: connected");
                self.session = Session::connected(address.clone());
                gate.set_current_chain(Some(*chain_id));
                SessionTransition::Connected
            }
            ProviderEvent::Disconnected => self.end(gate),
            ProviderEvent::ChainChanged { chain_id } => {
                if !self.session.is_connected() {
                    debug!(%chain_id, "wallet: ignoring chain change without a session");
                    return SessionTransition::Unchanged;
                }
                if gate.current_chain_id() == Some(*chain_id) {
                    return SessionTransition::Unchanged;
                }
                info!(%chain_id, "wallet: chain changed");
                gate.set_current_chain(Some(*chain_id));
                SessionTransition::ChainChanged
            }
        }
    }

    /// Forces the safe disconnected state, whatever the provider said.
    pub fn end(&mut self, gate: &mut NetworkGate) -> SessionTransition {
        gate.set_current_chain(None);
        if !self.session.is_connected() {
            return SessionTransition::Unchanged;
        }
        info!("wallet: disconnected");
        self.session = Session::disconnected();
        SessionTransition::Disconnected
    }
}
