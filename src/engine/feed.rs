use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::errors::CopyError;
use crate::models::{MasterTrade, RawTrade, Side};
use crate::store::Store;

/// Normalize one raw trade-book row. Rows without a usable symbol, side,
/// positive quantity or positive price are rejected, as are id-less rows
/// without a parseable timestamp (nothing stable to dedupe on); the
/// poller drops them with a warning rather than aborting the batch.
pub fn normalize(
    account_id: &str,
    raw: &RawTrade,
    seen_at: DateTime<Utc>,
) -> Result<MasterTrade, CopyError> {
    let symbol = raw
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CopyError::Validation("trade row is missing a symbol".into()))?;

    let side = raw
        .side
        .as_deref()
        .and_then(Side::from_api_str)
        .ok_or_else(|| CopyError::Validation("trade row has no recognizable side".into()))?;

    let quantity = raw
        .quantity
        .filter(|q| *q > 0)
        .ok_or_else(|| CopyError::Validation("trade row needs a positive quantity".into()))?;

    let price = raw
        .price
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| CopyError::Validation("trade row needs a positive price".into()))?;

    let upstream_id = raw
        .id
        .as_deref()
        .or(raw.order_id.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let executed_at = match raw.timestamp.as_deref().and_then(parse_timestamp) {
        Some(at) => at,
        // with a broker id the fill time is cosmetic; without one it is
        // part of the identity, and a poll-time stand-in would mint a
        // fresh id every cycle
        None if upstream_id.is_some() => seen_at,
        None => {
            return Err(CopyError::Validation(
                "trade row has neither an id nor a usable timestamp".into(),
            ));
        }
    };

    let id = match upstream_id {
        Some(upstream) => upstream.to_string(),
        None => synthesize_id(account_id, symbol, side, quantity, price, executed_at),
    };

    Ok(MasterTrade {
        id,
        account_id: account_id.to_string(),
        symbol: symbol.to_string(),
        side,
        quantity,
        price,
        executed_at,
        seen_at,
    })
}

/// Push one poll's raw rows through normalization and the store's
/// first-sighting filter. Returns only newly seen trades, in input order,
/// ready for fan-out.
pub async fn ingest(
    store: &dyn Store,
    account_id: &str,
    raw_trades: Vec<RawTrade>,
) -> Result<Vec<MasterTrade>, CopyError> {
    let seen_at = Utc::now();
    let mut normalized = Vec::with_capacity(raw_trades.len());
    for raw in &raw_trades {
        match normalize(account_id, raw, seen_at) {
            Ok(trade) => normalized.push(trade),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    account = %account_id,
                    "Discarding malformed trade row"
                );
            }
        }
    }
    store.record_unseen_trades(normalized).await
}

/// Identity for rows the broker did not stamp with an id. The digest
/// covers everything that distinguishes one fill from another, so
/// re-polling the same row lands on the same id and dedupes.
fn synthesize_id(
    account_id: &str,
    symbol: &str,
    side: Side,
    quantity: i64,
    price: Decimal,
    executed_at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    hasher.update([0]);
    hasher.update(symbol.as_bytes());
    hasher.update([0]);
    hasher.update(side.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(quantity.to_le_bytes());
    // normalize() strips trailing zeros so 2950.5 and 2950.50 digest alike
    hasher.update(price.normalize().to_string().as_bytes());
    hasher.update(executed_at.timestamp_millis().to_le_bytes());

    let digest = hasher.finalize();
    digest.iter().take(16).map(|b| format!("{b:02x}")).collect()
}

/// Broker feeds stamp rows with epoch seconds, epoch millis or RFC 3339.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(n) = raw.parse::<i64>() {
        // If >1e12, it's milliseconds
        if n > 1_000_000_000_000 {
            return DateTime::from_timestamp(n / 1000, ((n % 1000) * 1_000_000) as u32);
        }
        return DateTime::from_timestamp(n, 0);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
