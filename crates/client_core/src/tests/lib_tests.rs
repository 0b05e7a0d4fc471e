use super::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{domain::WalletAddress, protocol::Notification};
use std::time::Duration;
use tokio::sync::Notify;
use wallet_provider::SimulatedWalletProvider;

const SEPOLIA: ChainId = ChainId(11155111);
const MAINNET: ChainId = ChainId(1);
const ADDRESS: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";

struct MockWalletProvider {
    fail_switch: bool,
    fail_disconnect: bool,
    hold_switch: Option<Arc<Notify>>,
    switch_requests: Mutex<Vec<ChainId>>,
    disconnect_calls: Mutex<u32>,
    events: std::sync::Mutex<Option<broadcast::Sender<ProviderEvent>>>,
}

impl MockWalletProvider {
    fn ok() -> Self {
        Self {
            fail_switch: false,
            fail_disconnect: false,
            hold_switch: None,
            switch_requests: Mutex::new(Vec::new()),
            disconnect_calls: Mutex::new(0),
            events: std::sync::Mutex::new(Some(broadcast::channel(32).0)),
        }
    }

    fn failing_switch() -> Self {
        Self {
            fail_switch: true,
            ..Self::ok()
        }
    }

    fn failing_disconnect() -> Self {
        Self {
            fail_disconnect: true,
            ..Self::ok()
        }
    }

    fn holding_switch(release: Arc<Notify>) -> Self {
        Self {
            hold_switch: Some(release),
            ..Self::ok()
        }
    }

    fn emit(&self, event: ProviderEvent) {
        if let Some(tx) = self.events.lock().expect("events lock").as_ref() {
            let _ = tx.send(event);
        }
    }

    fn close(&self) {
        self.events.lock().expect("events lock").take();
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request_disconnect(&self) -> Result<()> {
        *self.disconnect_calls.lock().await += 1;
        if self.fail_disconnect {
            return Err(anyhow!("provider transport closed"));
        }
        self.emit(ProviderEvent::Disconnected);
        Ok(())
    }

    async fn request_switch_network(&self, chain_id: ChainId) -> Result<()> {
        self.switch_requests.lock().await.push(chain_id);
        if let Some(release) = &self.hold_switch {
            release.notified().await;
        }
        if self.fail_switch {
            return Err(anyhow!("user rejected the request"));
        }
        Ok(())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ProviderEvent> {
        match self.events.lock().expect("events lock").as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }
}

fn test_config() -> ControllerConfig {
    ControllerConfig {
        confirmation_delay: Duration::from_millis(1500),
        ..ControllerConfig::default()
    }
}

async fn connected_controller(
    provider: Arc<MockWalletProvider>,
    chain_id: ChainId,
) -> Arc<SessionController> {
    let controller = SessionController::new_with_provider(test_config(), provider);
    controller
        .handle_provider_event(ProviderEvent::Connected {
            address: WalletAddress::new(ADDRESS),
            chain_id,
        })
        .await;
    controller
}

async fn wait_until<F>(controller: &SessionController, predicate: F)
where
    F: Fn(&ControllerView) -> bool,
{
    for _ in 0..1000 {
        if predicate(&controller.view().await) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("controller never reached the expected state");
}

fn drain(rx: &mut broadcast::Receiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn disconnected_controller_only_offers_connect() {
    let controller = SessionController::new(test_config());
    let view = controller.view().await;

    assert_eq!(view.available_actions, vec![Action::Connect]);
    assert_eq!(view.screen, Screen::Connect);
    assert!(!view.network_status.is_correct);
    assert_eq!(view.session.address(), None);
    assert_eq!(view.stake_position, StakePosition::default());
    assert_eq!(view.required_network, "Sepolia");
}

#[tokio::test]
async fn wrong_network_gates_ledger_and_offers_switch() {
    let controller = connected_controller(Arc::new(MockWalletProvider::ok()), MAINNET).await;
    let view = controller.view().await;

    assert_eq!(view.network_status.current_chain_id, Some(MAINNET));
    assert_eq!(view.network_status.required_chain_id, SEPOLIA);
    assert!(!view.network_status.is_correct);
    assert_eq!(view.screen, Screen::WrongNetwork);
    assert_eq!(
        view.available_actions,
        vec![Action::SwitchNetwork, Action::Disconnect]
    );

    assert_eq!(
        controller.stake("2.5").await.map(|r| r.kind),
        Err(ErrorKind::NetworkMismatch)
    );
    assert_eq!(
        controller.unstake().await.map(|r| r.kind),
        Err(ErrorKind::NetworkMismatch)
    );
    assert_eq!(controller.view().await.stake_position.staked_balance, 0.0);
}

#[tokio::test]
async fn ledger_requires_connected_wallet() {
    let controller = SessionController::new(test_config());
    assert_eq!(
        controller.stake("1").await.map(|r| r.kind),
        Err(ErrorKind::ConnectionRequired)
    );
    assert_eq!(
        controller.unstake().await.map(|r| r.kind),
        Err(ErrorKind::ConnectionRequired)
    );
}

#[tokio::test(start_paused = true)]
async fn stake_unstake_and_invalid_input_scenarios() {
    let controller = connected_controller(Arc::new(MockWalletProvider::ok()), SEPOLIA).await;
    let view = controller.view().await;
    assert_eq!(view.screen, Screen::Staking);
    assert_eq!(
        view.available_actions,
        vec![Action::Stake, Action::Disconnect]
    );

    let started = tokio::time::Instant::now();
    let result = controller.stake("2.5").await.expect("stake");
    assert!(started.elapsed() >= Duration::from_millis(1500));
    assert!(result.is_success());

    let view = controller.view().await;
    assert_eq!(view.stake_position.staked_balance.to_string(), "2.5");
    assert_eq!(view.stake_position.pending_amount, None);
    assert!(view.can(Action::Unstake));

    let result = controller.unstake().await.expect("unstake");
    assert_eq!(result.amount, Some(2.5));
    let view = controller.view().await;
    assert_eq!(view.stake_position.staked_balance.to_string(), "0");
    assert!(!view.can(Action::Unstake));

    for input in ["-1", "abc", "", "0"] {
        assert_eq!(
            controller.stake(input).await.map(|r| r.kind),
            Err(ErrorKind::InvalidAmount),
            "input {input:?}"
        );
        assert_eq!(controller.view().await.stake_position.staked_balance, 0.0);
    }

    assert_eq!(
        controller.unstake().await.map(|r| r.kind),
        Err(ErrorKind::NothingToUnstake)
    );
}

#[tokio::test(start_paused = true)]
async fn second_operation_is_rejected_while_stake_pending() {
    let controller = connected_controller(Arc::new(MockWalletProvider::ok()), SEPOLIA).await;
    controller.stake("1").await.expect("first stake");

    let in_flight = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.stake("4").await })
    };
    wait_until(&controller, |view| view.stake_position.is_pending()).await;

    let view = controller.view().await;
    assert!(!view.can(Action::Stake));
    assert!(!view.can(Action::Unstake));
    assert_eq!(view.stake_position.pending_amount, Some(4.0));

    assert_eq!(
        controller.stake("3").await.map(|r| r.kind),
        Err(ErrorKind::OperationInProgress)
    );
    assert_eq!(
        controller.unstake().await.map(|r| r.kind),
        Err(ErrorKind::OperationInProgress)
    );
    let view = controller.view().await;
    assert_eq!(view.stake_position.pending_amount, Some(4.0));
    assert_eq!(view.stake_position.staked_balance, 1.0);

    in_flight.await.expect("join").expect("stake completes");
    let view = controller.view().await;
    assert_eq!(view.stake_position.staked_balance, 5.0);
    assert_eq!(view.stake_position.pending_amount, None);
}

#[tokio::test(start_paused = true)]
async fn pending_stake_survives_disconnect() {
    let controller = connected_controller(Arc::new(MockWalletProvider::ok()), SEPOLIA).await;

    let in_flight = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.stake("2").await })
    };
    wait_until(&controller, |view| view.stake_position.is_pending()).await;

    controller.disconnect().await.expect("disconnect");
    assert!(!controller.view().await.session.is_connected());

    in_flight.await.expect("join").expect("stake completes");
    assert_eq!(controller.view().await.stake_position.staked_balance, 2.0);
}

#[tokio::test(start_paused = true)]
async fn submit_stake_uses_and_clears_amount_field() {
    let controller = connected_controller(Arc::new(MockWalletProvider::ok()), SEPOLIA).await;
    let mut rx = controller.subscribe_events();

    controller.set_stake_input("0.75").await;
    assert_eq!(controller.view().await.stake_input, "0.75");

    controller.submit_stake().await.expect("stake");

    let view = controller.view().await;
    assert_eq!(view.stake_input, "");
    assert_eq!(view.stake_position.staked_balance, 0.75);

    let notifications: Vec<Notification> = drain(&mut rx)
        .iter()
        .filter_map(ControllerEvent::notification)
        .collect();
    assert_eq!(
        notifications,
        vec![Notification::success("Staked successfully (UI-only simulation)")]
    );
}

#[tokio::test]
async fn failed_validation_is_notified_once() {
    let controller = connected_controller(Arc::new(MockWalletProvider::ok()), SEPOLIA).await;
    let mut rx = controller.subscribe_events();

    let _ = controller.stake("abc").await;
    let _ = controller.unstake().await;

    let notifications: Vec<Notification> = drain(&mut rx)
        .iter()
        .filter_map(ControllerEvent::notification)
        .collect();
    assert_eq!(
        notifications,
        vec![
            Notification::error("Enter a valid amount"),
            Notification::error("Nothing to unstake"),
        ]
    );
}

#[tokio::test]
async fn switch_network_success_updates_gate() {
    let provider = Arc::new(MockWalletProvider::ok());
    let controller = connected_controller(provider.clone(), MAINNET).await;
    let mut rx = controller.subscribe_events();

    controller.request_switch(SEPOLIA).await.expect("switch");

    assert_eq!(*provider.switch_requests.lock().await, vec![SEPOLIA]);
    let view = controller.view().await;
    assert!(view.network_status.is_correct);
    assert!(!view.network_status.switch_pending);
    assert_eq!(view.screen, Screen::Staking);
    assert!(!view.can(Action::SwitchNetwork));

    let events = drain(&mut rx);
    assert!(events.contains(&ControllerEvent::NetworkSwitched {
        chain_id: SEPOLIA,
        network_name: "Sepolia".to_string(),
    }));
}

#[tokio::test]
async fn switch_network_failure_leaves_state_unchanged() {
    let controller =
        connected_controller(Arc::new(MockWalletProvider::failing_switch()), MAINNET).await;
    let before = controller.view().await;
    let mut rx = controller.subscribe_events();

    assert_eq!(
        controller.request_switch(SEPOLIA).await,
        Err(ErrorKind::SwitchFailed)
    );

    assert_eq!(controller.view().await, before);
    let notifications: Vec<Notification> = drain(&mut rx)
        .iter()
        .filter_map(ControllerEvent::notification)
        .collect();
    assert_eq!(
        notifications,
        vec![Notification::error("Failed to switch network")]
    );
}

#[tokio::test]
async fn switch_requires_connected_wallet() {
    let provider = Arc::new(MockWalletProvider::ok());
    let controller = SessionController::new_with_provider(test_config(), provider.clone());

    assert_eq!(
        controller.request_switch(SEPOLIA).await,
        Err(ErrorKind::ConnectionRequired)
    );
    assert!(provider.switch_requests.lock().await.is_empty());
}

#[tokio::test]
async fn ledger_stays_gated_while_switch_outstanding() {
    let release = Arc::new(Notify::new());
    let provider = Arc::new(MockWalletProvider::holding_switch(release.clone()));
    let controller = connected_controller(provider, MAINNET).await;

    let switching = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.request_switch(SEPOLIA).await })
    };
    wait_until(&controller, |view| view.network_status.switch_pending).await;

    assert_eq!(
        controller.stake("1").await.map(|r| r.kind),
        Err(ErrorKind::NetworkMismatch)
    );
    assert!(!controller.view().await.can(Action::Stake));

    release.notify_one();
    switching.await.expect("join").expect("switch");

    let view = controller.view().await;
    assert!(view.network_status.is_correct);
    assert!(view.can(Action::Stake));
}

#[tokio::test(start_paused = true)]
async fn disconnect_keeps_balance_and_clears_amount_field() {
    let provider = Arc::new(MockWalletProvider::ok());
    let controller = connected_controller(provider.clone(), SEPOLIA).await;
    controller.stake("2.5").await.expect("stake");
    controller.set_stake_input("3").await;

    controller.disconnect().await.expect("disconnect");

    let view = controller.view().await;
    assert_eq!(*provider.disconnect_calls.lock().await, 1);
    assert!(!view.session.is_connected());
    assert!(!view.network_status.is_correct);
    assert_eq!(view.network_status.current_chain_id, None);
    assert_eq!(view.available_actions, vec![Action::Connect]);
    assert_eq!(view.stake_input, "");
    assert_eq!(view.stake_position.staked_balance, 2.5);

    controller
        .handle_provider_event(ProviderEvent::Connected {
            address: WalletAddress::new(ADDRESS),
            chain_id: SEPOLIA,
        })
        .await;
    let view = controller.view().await;
    assert_eq!(view.stake_position.staked_balance, 2.5);
    assert!(view.can(Action::Unstake));
}

#[tokio::test]
async fn provider_disconnect_failure_still_disconnects_locally() {
    let provider = Arc::new(MockWalletProvider::failing_disconnect());
    let controller = connected_controller(provider.clone(), SEPOLIA).await;

    controller.disconnect().await.expect("local disconnect");

    assert_eq!(*provider.disconnect_calls.lock().await, 1);
    assert!(!controller.view().await.session.is_connected());
}

#[tokio::test]
async fn disconnect_without_session_is_rejected() {
    let provider = Arc::new(MockWalletProvider::ok());
    let controller = SessionController::new_with_provider(test_config(), provider.clone());

    assert_eq!(
        controller.disconnect().await,
        Err(ErrorKind::ConnectionRequired)
    );
    assert_eq!(*provider.disconnect_calls.lock().await, 0);
}

#[tokio::test]
async fn network_is_incorrect_once_session_ends() {
    let controller = connected_controller(Arc::new(MockWalletProvider::ok()), SEPOLIA).await;
    assert!(controller.view().await.network_status.is_correct);

    controller
        .handle_provider_event(ProviderEvent::Disconnected)
        .await;
    controller
        .handle_provider_event(ProviderEvent::ChainChanged { chain_id: SEPOLIA })
        .await;

    let view = controller.view().await;
    assert!(!view.network_status.is_correct);
    assert_eq!(view.available_actions, vec![Action::Connect]);
}

#[tokio::test]
async fn provider_event_task_applies_events_and_tears_down_on_close() {
    let provider = Arc::new(MockWalletProvider::ok());
    let controller = SessionController::new_with_provider(test_config(), provider.clone());
    let mut rx = controller.subscribe_events();
    let pump = controller.spawn_provider_event_task();

    provider.emit(ProviderEvent::Connected {
        address: WalletAddress::new(ADDRESS),
        chain_id: SEPOLIA,
    });
    match rx.recv().await.expect("event") {
        ControllerEvent::SessionChanged(session) => {
            assert_eq!(
                session.address().map(WalletAddress::short),
                Some("0x71C7...976F".to_string())
            );
        }
        other => panic!("unexpected event {other:?}"),
    }

    provider.close();
    pump.await.expect("pump exits");
    assert!(!controller.view().await.session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn simulated_wallet_drives_full_session() {
    let wallet = Arc::new(SimulatedWalletProvider::new(test_config().chain_ids()));
    let controller = SessionController::new_with_provider(test_config(), wallet.clone());
    let _pump = controller.spawn_provider_event_task();

    wallet.connect(WalletAddress::new(ADDRESS), MAINNET).await;
    wait_until(&controller, |view| view.screen == Screen::WrongNetwork).await;

    controller.request_switch(SEPOLIA).await.expect("switch");
    assert_eq!(wallet.chain_id().await, Some(SEPOLIA));

    controller.stake("1.5").await.expect("stake");
    controller.unstake().await.expect("unstake");
    controller.disconnect().await.expect("disconnect");

    assert_eq!(wallet.address().await, None);
    let view = controller.view().await;
    assert_eq!(view.screen, Screen::Connect);
    assert_eq!(view.stake_position.staked_balance, 0.0);
}

#[tokio::test(start_paused = true)]
async fn stake_that_would_overflow_balance_is_rejected() {
    let controller = connected_controller(Arc::new(MockWalletProvider::ok()), SEPOLIA).await;
    controller.stake("1.7e308").await.expect("first stake");

    assert_eq!(
        controller.stake("1.7e308").await.map(|r| r.kind),
        Err(ErrorKind::InvalidAmount)
    );
    let view = controller.view().await;
    assert_eq!(view.stake_position.staked_balance, 1.7e308);
    assert_eq!(view.stake_position.pending_amount, None);
    let json = serde_json::to_value(&view).expect("serialize");
    assert!(json["stake_position"]["staked_balance"].is_f64());
}

#[tokio::test]
async fn cancelled_confirmation_reports_unconfirmed_stake() {
    let task = tokio::spawn(async {
        std::future::pending::<()>().await;
        OperationResult::success(OperationKind::Stake, 1.0)
    });
    task.abort();
    let joined = task.await;
    assert!(joined.as_ref().is_err_and(|err| err.is_cancelled()));

    assert_eq!(
        confirmation_outcome(joined),
        Err(ErrorKind::OperationInProgress)
    );
}

#[test]
fn view_serializes_for_presentation_layer() {
    let session = Session::connected(WalletAddress::new(ADDRESS));
    let status = network_gate::evaluate(&session, Some(SEPOLIA), SEPOLIA);
    let position = StakePosition {
        staked_balance: 2.5,
        pending_amount: None,
    };
    let view = ControllerView {
        available_actions: available_actions(&session, &status, &position),
        screen: screen_for(&session, &status),
        required_network: "Sepolia".into(),
        stake_input: String::new(),
        session,
        network_status: status,
        stake_position: position,
    };

    let json = serde_json::to_value(&view).expect("serialize");
    assert_eq!(json["screen"], "staking");
    assert_eq!(
        json["available_actions"],
        serde_json::json!(["stake", "unstake", "disconnect"])
    );
    assert_eq!(json["stake_position"]["staked_balance"], 2.5);
    assert_eq!(json["session"]["address"], ADDRESS);
}
