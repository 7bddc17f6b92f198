use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Side, TradeStatus};

/// One row of the replication ledger: a single master trade replicated
/// into a single follower account. Rows are append-only; after creation
/// only `status`, `reason` and `updated_at` ever change, through the
/// store's guarded status update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyTrade {
    pub id: Uuid,
    pub master_trade_id: String,
    pub follower_id: String,
    pub symbol: String,
    pub side: Side,
    pub master_quantity: i64,
    pub follower_quantity: i64,
    pub price: Decimal,
    pub status: TradeStatus,
    /// Failure or cancellation detail, mirrored from broker callbacks.
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CopyTrade {
    /// Fresh PENDING entry for the (master trade, follower) pair.
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        master_trade_id: impl Into<String>,
        follower_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        master_quantity: i64,
        follower_quantity: i64,
        price: Decimal,
    ) -> Self {
        let now = Utc::now();
        CopyTrade {
            id: Uuid::new_v4(),
            master_trade_id: master_trade_id.into(),
            follower_id: follower_id.into(),
            symbol: symbol.into(),
            side,
            master_quantity,
            follower_quantity,
            price,
            status: TradeStatus::Pending,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}
