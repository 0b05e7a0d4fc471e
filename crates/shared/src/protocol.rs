use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChainId, NetworkStatus, Session, StakePosition},
    error::ErrorKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Stake,
    Unstake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub kind: OperationKind,
    pub outcome: OperationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl OperationResult {
    pub fn success(kind: OperationKind, amount: f64) -> Self {
        Self {
            kind,
            outcome: OperationOutcome::Success,
            reason: None,
            amount: Some(amount),
            completed_at: Utc::now(),
        }
    }

    pub fn failure(kind: OperationKind, reason: ErrorKind) -> Self {
        Self {
            kind,
            outcome: OperationOutcome::Failure,
            reason: Some(reason),
            amount: None,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == OperationOutcome::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Connect,
    SwitchNetwork,
    Stake,
    Unstake,
    Disconnect,
}

/// Which panel the presentation layer should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Connect,
    WrongNetwork,
    Staking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ControllerEvent {
    SessionChanged(Session),
    NetworkChanged(NetworkStatus),
    StakePositionChanged(StakePosition),
    Operation(OperationResult),
    NetworkSwitched {
        chain_id: ChainId,
        network_name: String,
    },
    Error(ErrorKind),
}

impl ControllerEvent {
    /// Toast-equivalent message for events the user should be told about.
    /// State-change events return `None`; the view already reflects them.
    pub fn notification(&self) -> Option<Notification> {
        match self {
            ControllerEvent::Operation(result) => Some(match (result.kind, result.reason) {
                (OperationKind::Stake, None) => {
                    Notification::success("Staked successfully (UI-only simulation)")
                }
                (OperationKind::Unstake, None) => {
                    Notification::success("Unstaked successfully (UI-only simulation)")
                }
                (_, Some(reason)) => Notification::error(reason.to_string()),
            }),
            ControllerEvent::NetworkSwitched { network_name, .. } => {
                Some(Notification::success(format!("Switched to {network_name}")))
            }
            ControllerEvent::Error(kind) => Some(Notification::error(kind.to_string())),
            ControllerEvent::SessionChanged(_)
            | ControllerEvent::NetworkChanged(_)
            | ControllerEvent::StakePositionChanged(_) => None,
        }
    }
}
