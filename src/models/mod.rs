pub mod consent;
pub mod copy_trade;
pub mod follower;
pub mod trade;

pub use consent::ConsentRecord;
pub use copy_trade::CopyTrade;
pub use follower::Follower;
pub use trade::{MasterTrade, RawTrade};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Broker feeds report the side as either the full word or the
    /// single-letter transaction type.
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" | "B" => Some(Side::Buy),
            "SELL" | "S" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// TradeStatus — replication ledger lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of a ledger entry. `Pending` is the only non-terminal state;
/// once an entry reaches `Success`, `Failed` or `Cancelled` it stays there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl TradeStatus {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(TradeStatus::Pending),
            "SUCCESS" => Some(TradeStatus::Success),
            "FAILED" => Some(TradeStatus::Failed),
            "CANCELLED" => Some(TradeStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Pending)
    }

    /// A transition is legal from `Pending` to any state; repeating the
    /// current state is accepted as an idempotent no-op (callbacks are
    /// delivered at least once).
    pub fn can_transition_to(&self, next: TradeStatus) -> bool {
        *self == TradeStatus::Pending || *self == next
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Pending => write!(f, "PENDING"),
            TradeStatus::Success => write!(f, "SUCCESS"),
            TradeStatus::Failed => write!(f, "FAILED"),
            TradeStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}
