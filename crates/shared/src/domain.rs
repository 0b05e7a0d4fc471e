use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ChainId);

const ADDRESS_PREFIX_LEN: usize = 6;
const ADDRESS_SUFFIX_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd` form used in the connected banner. Addresses too short
    /// to abbreviate are returned whole.
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= ADDRESS_PREFIX_LEN + ADDRESS_SUFFIX_LEN {
            return self.0.clone();
        }
        let prefix: String = chars[..ADDRESS_PREFIX_LEN].iter().collect();
        let suffix: String = chars[chars.len() - ADDRESS_SUFFIX_LEN..].iter().collect();
        format!("{prefix}...{suffix}")
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection state of the wallet. `address` is present iff `connected`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    address: Option<WalletAddress>,
    connected: bool,
}

impl Session {
    pub fn connected(address: WalletAddress) -> Self {
        Self {
            address: Some(address),
            connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn address(&self) -> Option<&WalletAddress> {
        self.address.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_chain_id: Option<ChainId>,
    pub required_chain_id: ChainId,
    pub is_correct: bool,
    #[serde(default)]
    pub switch_pending: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StakePosition {
    pub staked_balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_amount: Option<f64>,
}

impl StakePosition {
    pub fn has_balance(&self) -> bool {
        self.staked_balance > 0.0
    }

    pub fn is_pending(&self) -> bool {
        self.pending_amount.is_some()
    }
}
