//! Line commands typed at the prompt, standing in for button clicks.

use anyhow::{anyhow, bail, Context, Result};
use shared::domain::{ChainId, WalletAddress};

pub const HELP: &str = "\
commands:
  connect <address> [chain_id]   approve a connection in the wallet
  chain <chain_id>               change network from inside the wallet
  switch                         ask the wallet to switch to the required network
  input <amount>                 type into the stake amount field
  stake [amount]                 stake the given amount (or the amount field)
  unstake                        withdraw the full staked balance
  disconnect                     end the wallet session
  fail-switch | fail-disconnect  make the next wallet request fail
  view                           print the controller view
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect {
        address: WalletAddress,
        chain_id: Option<ChainId>,
    },
    ChangeChain {
        chain_id: ChainId,
    },
    SwitchNetwork,
    Input {
        amount: String,
    },
    Stake {
        amount: Option<String>,
    },
    Unstake,
    Disconnect,
    FailNextSwitch,
    FailNextDisconnect,
    View,
    Help,
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Connect { .. } => "connect",
            Command::ChangeChain { .. } => "chain",
            Command::SwitchNetwork => "switch",
            Command::Input { .. } => "input",
            Command::Stake { .. } => "stake",
            Command::Unstake => "unstake",
            Command::Disconnect => "disconnect",
            Command::FailNextSwitch => "fail-switch",
            Command::FailNextDisconnect => "fail-disconnect",
            Command::View => "view",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

fn parse_chain_id(raw: &str) -> Result<ChainId> {
    raw.parse::<u64>()
        .map(ChainId)
        .with_context(|| format!("invalid chain id '{raw}'"))
}

/// Returns `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("connect", [address]) => Command::Connect {
            address: WalletAddress::new(*address),
            chain_id: None,
        },
        ("connect", [address, chain_id]) => Command::Connect {
            address: WalletAddress::new(*address),
            chain_id: Some(parse_chain_id(chain_id)?),
        },
        ("chain", [chain_id]) => Command::ChangeChain {
            chain_id: parse_chain_id(chain_id)?,
        },
        ("switch", []) => Command::SwitchNetwork,
        ("input", []) => Command::Input {
            amount: String::new(),
        },
        ("input", [amount]) => Command::Input {
            amount: amount.to_string(),
        },
        ("stake", []) => Command::Stake { amount: None },
        ("stake", [amount]) => Command::Stake {
            amount: Some(amount.to_string()),
        },
        ("unstake", []) => Command::Unstake,
        ("disconnect", []) => Command::Disconnect,
        ("fail-switch", []) => Command::FailNextSwitch,
        ("fail-disconnect", []) => Command::FailNextDisconnect,
        ("view", []) => Command::View,
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        ("connect" | "chain" | "switch" | "input" | "stake" | "unstake" | "disconnect", _) => {
            bail!("wrong number of arguments for '{verb}'; type 'help'")
        }
        _ => return Err(anyhow!("unknown command '{verb}'; type 'help'")),
    };
    Ok(Some(command))
}
