use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::SessionController;
use shared::{
    domain::{ChainId, WalletAddress},
    protocol::{ControllerEvent, NotificationLevel},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wallet_provider::SimulatedWalletProvider;

mod commands;
mod config;

use commands::{parse_command, Command, HELP};
use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    /// Settings file; missing files fall back to defaults.
    #[arg(long, default_value = "staking.toml")]
    config: PathBuf,
    /// Connect this address on startup.
    #[arg(long)]
    address: Option<String>,
    /// Chain the wallet starts on when `--address` is given.
    #[arg(long)]
    chain_id: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let config = load_settings(&args.config)?.into_controller_config();
    config.validate().context("invalid staking settings")?;
    if config.project_id.is_none() {
        warn!("no wallet project id configured; set WALLETCONNECT_PROJECT_ID for real providers");
    }
    info!(
        app = %config.app_name,
        required_chain = %config.required_chain_id,
        network = %config.required_network_name(),
        "staking controller starting"
    );

    let wallet = Arc::new(SimulatedWalletProvider::new(config.chain_ids()));
    let controller = SessionController::new_with_provider(config, wallet.clone());
    let _provider_pump = controller.spawn_provider_event_task();
    let _notifier = spawn_notification_printer(&controller);

    if let Some(address) = args.address {
        let chain_id = args
            .chain_id
            .map(ChainId)
            .unwrap_or(controller.config().required_chain_id);
        wallet.connect(WalletAddress::new(address), chain_id).await;
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        debug!(command = command.name(), "dispatching command");
        if command == Command::Quit {
            break;
        }
        dispatch(&controller, &wallet, command).await?;
    }

    Ok(())
}

async fn dispatch(
    controller: &Arc<SessionController>,
    wallet: &Arc<SimulatedWalletProvider>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Connect { address, chain_id } => {
            let chain_id = chain_id.unwrap_or(controller.config().required_chain_id);
            wallet.connect(address, chain_id).await;
        }
        Command::ChangeChain { chain_id } => {
            if let Err(err) = wallet.change_chain(chain_id).await {
                println!("{err}");
            }
        }
        Command::SwitchNetwork => {
            let _ = controller
                .request_switch(controller.config().required_chain_id)
                .await;
        }
        Command::Input { amount } => controller.set_stake_input(amount).await,
        Command::Stake { amount } => {
            // Confirmation takes a while; keep reading commands meanwhile.
            let controller = Arc::clone(controller);
            tokio::spawn(async move {
                let _ = match amount {
                    Some(amount) => controller.stake(&amount).await,
                    None => controller.submit_stake().await,
                };
            });
        }
        Command::Unstake => {
            let _ = controller.unstake().await;
        }
        Command::Disconnect => {
            let _ = controller.disconnect().await;
        }
        Command::FailNextSwitch => wallet.fail_next_switch().await,
        Command::FailNextDisconnect => wallet.fail_next_disconnect().await,
        Command::View => print_view(controller).await?,
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

async fn print_view(controller: &SessionController) -> Result<()> {
    let view = controller.view().await;
    if let Some(address) = view.session.address() {
        println!("Connected: {}", address.short());
    }
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn spawn_notification_printer(controller: &SessionController) -> tokio::task::JoinHandle<()> {
    let events = controller.subscribe_events();
    tokio::spawn(print_notifications(events, |line| println!("{line}")))
}

/// Renders controller events until the controller goes away. A lagged
/// receiver skips the missed events and keeps going.
async fn print_notifications(
    mut events: broadcast::Receiver<ControllerEvent>,
    mut print: impl FnMut(String),
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "notifications lagged; some were dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        if let ControllerEvent::StakePositionChanged(position) = &event {
            if let Some(amount) = position.pending_amount {
                print(format!("Staking {amount}..."));
            }
        }
        if let Some(notification) = event.notification() {
            let tag = match notification.level {
                NotificationLevel::Success => "ok",
                NotificationLevel::Error => "error",
            };
            print(format!("[{tag}] {}", notification.message));
        }
    }
}
