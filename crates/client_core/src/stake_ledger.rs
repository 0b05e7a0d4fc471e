//! Simulated staking balance and its single-flight operation state machine.
//!
//! A stake moves the ledger from `Idle` to `Pending` and hands back a
//! [`PendingStake`] ticket. The balance only changes when that ticket is
//! redeemed through [`StakeLedger::complete_stake`], and no other mutation is
//! accepted while it is outstanding.

use shared::{
    domain::StakePosition,
    error::ErrorKind,
    protocol::{OperationKind, OperationResult},
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum LedgerState {
    Idle,
    Pending { amount: f64 },
}

/// Proof that a stake is in flight. Not `Clone`, so each stake completes once.
#[derive(Debug)]
#[must_use = "a pending stake must be completed or the ledger stays locked"]
pub struct PendingStake {
    amount: f64,
}

impl PendingStake {
    pub fn amount(&self) -> f64 {
        self.amount
    }
}

/// Parses a user-entered amount. Empty, non-numeric, non-finite and
/// non-positive inputs are all rejected.
pub fn parse_amount(input: &str) -> Result<f64, ErrorKind> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ErrorKind::InvalidAmount);
    }
    let amount: f64 = trimmed.parse().map_err(|_| ErrorKind::InvalidAmount)?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ErrorKind::InvalidAmount);
    }
    Ok(amount)
}

pub struct StakeLedger {
    staked_balance: f64,
    state: LedgerState,
    stake_input: String,
}

impl Default for StakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StakeLedger {
    pub fn new() -> Self {
        Self {
            staked_balance: 0.0,
            state: LedgerState::Idle,
            stake_input: String::new(),
        }
    }

    pub fn position(&self) -> StakePosition {
        StakePosition {
            staked_balance: self.staked_balance,
            pending_amount: match self.state {
                LedgerState::Pending { amount } => Some(amount),
                LedgerState::Idle => None,
            },
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, LedgerState::Pending { .. })
    }

    pub fn stake_input(&self) -> &str {
        &self.stake_input
    }

    pub fn set_stake_input(&mut self, input: impl Into<String>) {
        self.stake_input = input.into();
    }

    pub fn begin_stake(&mut self, amount_input: &str) -> Result<PendingStake, ErrorKind> {
        if self.is_pending() {
            return Err(ErrorKind::OperationInProgress);
        }
        let amount = parse_amount(amount_input)?;
        if !(self.staked_balance + amount).is_finite() {
            return Err(ErrorKind::InvalidAmount);
        }
        self.state = LedgerState::Pending { amount };
        Ok(PendingStake { amount })
    }

    pub fn complete_stake(&mut self, ticket: PendingStake) -> OperationResult {
        debug_assert_eq!(self.state, LedgerState::Pending { amount: ticket.amount });
        self.staked_balance += ticket.amount;
        self.state = LedgerState::Idle;
        self.stake_input.clear();
        OperationResult::success(OperationKind::Stake, ticket.amount)
    }

    /// Full withdrawal; there is no partial unstake.
    pub fn unstake(&mut self) -> Result<OperationResult, ErrorKind> {
        if self.is_pending() {
            return Err(ErrorKind::OperationInProgress);
        }
        if self.staked_balance <= 0.0 {
            return Err(ErrorKind::NothingToUnstake);
        }
        let withdrawn = std::mem::take(&mut self.staked_balance);
        Ok(OperationResult::success(OperationKind::Unstake, withdrawn))
    }

    /// Drops per-session scratch state on disconnect. The balance survives.
    pub fn reset_in_memory(&mut self) {
        self.stake_input.clear();
    }
}
