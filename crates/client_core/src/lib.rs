use std::sync::Arc;

use serde::Serialize;
use shared::{
    domain::{ChainId, NetworkStatus, Session, StakePosition},
    error::ErrorKind,
    protocol::{Action, ControllerEvent, OperationKind, OperationResult, Screen},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::{JoinError, JoinHandle},
};
use tracing::{debug, info, warn};
use wallet_provider::{MissingWalletProvider, ProviderEvent, WalletProvider};

pub mod config;
pub mod network_gate;
pub mod stake_ledger;
pub mod wallet_session;

pub use config::{ChainInfo, ControllerConfig};

use network_gate::NetworkGate;
use stake_ledger::StakeLedger;
use wallet_session::{SessionTransition, WalletSession};

/// Everything the presentation layer needs to render one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerView {
    pub session: Session,
    pub network_status: NetworkStatus,
    pub stake_position: StakePosition,
    pub available_actions: Vec<Action>,
    pub screen: Screen,
    pub required_network: String,
    pub stake_input: String,
}

impl ControllerView {
    pub fn can(&self, action: Action) -> bool {
        self.available_actions.contains(&action)
    }
}

pub fn available_actions(
    session: &Session,
    network_status: &NetworkStatus,
    stake_position: &StakePosition,
) -> Vec<Action> {
    let connected = session.is_connected();
    let ready = connected && network_status.is_correct && !stake_position.is_pending();

    let mut actions = Vec::new();
    if !connected {
        actions.push(Action::Connect);
    }
    if connected && !network_status.is_correct {
        actions.push(Action::SwitchNetwork);
    }
    if ready {
        actions.push(Action::Stake);
    }
    if ready && stake_position.has_balance() {
        actions.push(Action::Unstake);
    }
    if connected {
        actions.push(Action::Disconnect);
    }
    actions
}

pub fn screen_for(session: &Session, network_status: &NetworkStatus) -> Screen {
    if !session.is_connected() {
        Screen::Connect
    } else if !network_status.is_correct {
        Screen::WrongNetwork
    } else {
        Screen::Staking
    }
}

struct Observed {
    session: Session,
    network_status: NetworkStatus,
    stake_position: StakePosition,
}

impl Observed {
    fn changes_since(&self, before: &Observed) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        if self.session != before.session {
            events.push(ControllerEvent::SessionChanged(self.session.clone()));
        }
        if self.network_status != before.network_status {
            events.push(ControllerEvent::NetworkChanged(self.network_status));
        }
        if self.stake_position != before.stake_position {
            events.push(ControllerEvent::StakePositionChanged(self.stake_position));
        }
        events
    }
}

struct ControllerState {
    wallet: WalletSession,
    gate: NetworkGate,
    ledger: StakeLedger,
}

impl ControllerState {
    fn observe(&self) -> Observed {
        Observed {
            session: self.wallet.session().clone(),
            network_status: self.gate.status(self.wallet.session()),
            stake_position: self.ledger.position(),
        }
    }

    fn ensure_ready(&self) -> Result<(), ErrorKind> {
        self.gate.ensure_ready(self.wallet.session())
    }

    fn apply_provider_event(&mut self, event: &ProviderEvent) -> SessionTransition {
        let transition = self.wallet.on_provider_event(event, &mut self.gate);
        if transition == SessionTransition::Disconnected {
            self.ledger.reset_in_memory();
        }
        transition
    }

    fn force_disconnect(&mut self) {
        if self.wallet.end(&mut self.gate) == SessionTransition::Disconnected {
            self.ledger.reset_in_memory();
        }
    }
}

/// Single decision surface over wallet session, network gate and stake ledger.
pub struct SessionController {
    config: ControllerConfig,
    provider: Arc<dyn WalletProvider>,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl SessionController {
    pub fn new(config: ControllerConfig) -> Arc<Self> {
        Self::new_with_provider(config, Arc::new(MissingWalletProvider))
    }

    pub fn new_with_provider(
        config: ControllerConfig,
        provider: Arc<dyn WalletProvider>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            inner: Mutex::new(ControllerState {
                wallet: WalletSession::new(),
                gate: NetworkGate::new(config.required_chain_id),
                ledger: StakeLedger::new(),
            }),
            config,
            provider,
            events,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, events: Vec<ControllerEvent>) {
        for event in events {
            let _ = self.events.send(event);
        }
    }

    pub async fn view(&self) -> ControllerView {
        let state = self.inner.lock().await;
        let observed = state.observe();
        ControllerView {
            available_actions: available_actions(
                &observed.session,
                &observed.network_status,
                &observed.stake_position,
            ),
            screen: screen_for(&observed.session, &observed.network_status),
            required_network: self.config.required_network_name(),
            stake_input: state.ledger.stake_input().to_string(),
            session: observed.session,
            network_status: observed.network_status,
            stake_position: observed.stake_position,
        }
    }

    pub async fn handle_provider_event(&self, event: ProviderEvent) {
        let changes = {
            let mut state = self.inner.lock().await;
            let before = state.observe();
            let transition = state.apply_provider_event(&event);
            debug!(?event, ?transition, "provider event applied");
            state.observe().changes_since(&before)
        };
        self.emit(changes);
    }

    /// Pumps provider events into the controller until the provider goes away,
    /// at which point the session is torn down.
    pub fn spawn_provider_event_task(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.provider.subscribe_events();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => controller.handle_provider_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "provider: event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("provider: event stream closed");
            controller
                .handle_provider_event(ProviderEvent::Disconnected)
                .await;
        })
    }

    pub async fn request_switch(&self, target: ChainId) -> Result<(), ErrorKind> {
        let began = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let before = state.observe();
            state
                .gate
                .begin_switch(state.wallet.session())
                .map(|()| state.observe().changes_since(&before))
        };
        match began {
            Ok(changes) => self.emit(changes),
            Err(kind) => {
                self.emit(vec![ControllerEvent::Error(kind)]);
                return Err(kind);
            }
        }

        info!(%target, "network: switch requested");
        let outcome = self.provider.request_switch_network(target).await;

        let mut changes = {
            let mut state = self.inner.lock().await;
            let before = state.observe();
            state.gate.finish_switch();
            if outcome.is_ok() {
                state.apply_provider_event(&ProviderEvent::ChainChanged { chain_id: target });
            }
            state.observe().changes_since(&before)
        };

        match outcome {
            Ok(()) => {
                info!(%target, "network: switch confirmed");
                changes.push(ControllerEvent::NetworkSwitched {
                    chain_id: target,
                    network_name: self.config.network_name(target),
                });
                self.emit(changes);
                Ok(())
            }
            Err(error) => {
                warn!(%target, %error, "network: switch failed");
                changes.push(ControllerEvent::Error(ErrorKind::SwitchFailed));
                self.emit(changes);
                Err(ErrorKind::SwitchFailed)
            }
        }
    }

    pub async fn disconnect(&self) -> Result<(), ErrorKind> {
        if !self.inner.lock().await.wallet.session().is_connected() {
            self.emit(vec![ControllerEvent::Error(ErrorKind::ConnectionRequired)]);
            return Err(ErrorKind::ConnectionRequired);
        }

        if let Err(error) = self.provider.request_disconnect().await {
            warn!(%error, "wallet: provider disconnect failed; disconnecting locally");
        }

        let changes = {
            let mut state = self.inner.lock().await;
            let before = state.observe();
            state.force_disconnect();
            state.observe().changes_since(&before)
        };
        self.emit(changes);
        Ok(())
    }

    pub async fn set_stake_input(&self, input: impl Into<String>) {
        self.inner.lock().await.ledger.set_stake_input(input);
    }

    /// Stakes whatever is currently in the amount field.
    pub async fn submit_stake(self: &Arc<Self>) -> Result<OperationResult, ErrorKind> {
        let input = self.inner.lock().await.ledger.stake_input().to_string();
        self.stake(&input).await
    }

    /// Validates and stakes `amount_input`, holding the ledger in `Pending`
    /// for the configured confirmation delay. The confirmation runs on its own
    /// task so dropping this future never strands the ledger mid-operation.
    pub async fn stake(self: &Arc<Self>, amount_input: &str) -> Result<OperationResult, ErrorKind> {
        let begun = {
            let mut state = self.inner.lock().await;
            let before = state.observe();
            state
                .ensure_ready()
                .and_then(|()| state.ledger.begin_stake(amount_input))
                .map(|ticket| (ticket, state.observe().changes_since(&before)))
        };
        let ticket = match begun {
            Ok((ticket, changes)) => {
                self.emit(changes);
                ticket
            }
            Err(kind) => {
                debug!(%kind, input = amount_input, "stake: rejected");
                self.emit(vec![ControllerEvent::Operation(OperationResult::failure(
                    OperationKind::Stake,
                    kind,
                ))]);
                return Err(kind);
            }
        };

        info!(amount = ticket.amount(), "stake: pending confirmation");
        let controller = Arc::clone(self);
        let confirmation = tokio::spawn(async move {
            tokio::time::sleep(controller.config.confirmation_delay).await;
            let (result, changes) = {
                let mut state = controller.inner.lock().await;
                let before = state.observe();
                let result = state.ledger.complete_stake(ticket);
                info!(
                    amount = ?result.amount,
                    balance = state.ledger.position().staked_balance,
                    "stake: confirmed"
                );
                (result, state.observe().changes_since(&before))
            };
            let mut events = changes;
            events.push(ControllerEvent::Operation(result.clone()));
            controller.emit(events);
            result
        });

        confirmation_outcome(confirmation.await)
    }

    pub async fn unstake(&self) -> Result<OperationResult, ErrorKind> {
        let outcome = {
            let mut state = self.inner.lock().await;
            let before = state.observe();
            state
                .ensure_ready()
                .and_then(|()| state.ledger.unstake())
                .map(|result| (result, state.observe().changes_since(&before)))
        };
        match outcome {
            Ok((result, mut changes)) => {
                info!(withdrawn = ?result.amount, "unstake: completed");
                changes.push(ControllerEvent::Operation(result.clone()));
                self.emit(changes);
                Ok(result)
            }
            Err(kind) => {
                debug!(%kind, "unstake: rejected");
                self.emit(vec![ControllerEvent::Operation(OperationResult::failure(
                    OperationKind::Unstake,
                    kind,
                ))]);
                Err(kind)
            }
        }
    }
}

/// A panicking confirmation is re-raised on the caller. Cancellation only
/// happens while the runtime shuts down, and leaves the stake unconfirmed.
fn confirmation_outcome(
    joined: Result<OperationResult, JoinError>,
) -> Result<OperationResult, ErrorKind> {
    match joined {
        Ok(result) => Ok(result),
        Err(join_error) if join_error.is_panic() => {
            std::panic::resume_unwind(join_error.into_panic())
        }
        Err(join_error) => {
            warn!(%join_error, "stake: confirmation cancelled before completing");
            Err(ErrorKind::OperationInProgress)
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
