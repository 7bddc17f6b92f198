use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// Trade-book row as the broker reports it. Every field is optional
/// because upstream payloads vary by segment and omit fields freely;
/// normalization decides what is usable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTrade {
    /// Broker-assigned trade or fill id, when the venue provides one.
    pub id: Option<String>,
    pub order_id: Option<String>,
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
    /// Epoch seconds, epoch millis or an RFC 3339 string.
    pub timestamp: Option<String>,
}

/// A normalized, first-sighted master-account trade. `id` is stable across
/// repeated polls: the broker id verbatim when present, otherwise a digest
/// of the identifying fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterTrade {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: Decimal,
    pub executed_at: DateTime<Utc>,
    pub seen_at: DateTime<Utc>,
}
