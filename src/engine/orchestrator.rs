use metrics::counter;

use crate::engine::quantity;
use crate::errors::CopyError;
use crate::models::{CopyTrade, Follower, MasterTrade};
use crate::store::Store;

/// Fan one newly seen master trade out across the follower set.
///
/// Consent is read per follower at decision time, never cached across
/// trades. Per-follower failures are logged and isolated; one broken
/// account never blocks the rest of the fan-out. Returns the ledger
/// entries that were actually created.
pub async fn replicate(
    store: &dyn Store,
    trade: &MasterTrade,
    followers: &[Follower],
) -> Vec<CopyTrade> {
    let mut created = Vec::new();

    for follower in followers {
        // 1. Consent gate — fresh read, fail-open on absence
        match store.consent_is_active(&follower.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(
                    follower = %follower.id,
                    master_trade = %trade.id,
                    "Copy trading stopped — skipping follower"
                );
                counter!("copy_trades_skipped_total").increment(1);
                continue;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    follower = %follower.id,
                    master_trade = %trade.id,
                    "Consent lookup failed — skipping follower"
                );
                continue;
            }
        }

        // 2. Scale the quantity for this follower's config
        let follower_quantity = quantity::follower_quantity(trade.quantity, follower);

        // 3. Append the PENDING ledger entry
        let entry = CopyTrade::pending(
            &trade.id,
            &follower.id,
            &trade.symbol,
            trade.side,
            trade.quantity,
            follower_quantity,
            trade.price,
        );

        match store.append_copy_trade(entry).await {
            Ok(row) => {
                tracing::info!(
                    follower = %follower.id,
                    master_trade = %trade.id,
                    symbol = %trade.symbol,
                    side = %trade.side,
                    quantity = follower_quantity,
                    "Replication queued"
                );
                counter!("copy_trades_created_total").increment(1);
                created.push(row);
            }
            Err(CopyError::DuplicateEntry { .. }) => {
                // replayed fan-out of an already-replicated trade
                tracing::debug!(
                    follower = %follower.id,
                    master_trade = %trade.id,
                    "Ledger entry already exists — skipping"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    follower = %follower.id,
                    master_trade = %trade.id,
                    "Ledger append failed"
                );
                counter!("copy_trades_errored_total").increment(1);
            }
        }
    }

    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::models::{ConsentRecord, Side, TradeStatus};
    use crate::store::MemoryStore;

    fn master_trade(id: &str) -> MasterTrade {
        MasterTrade {
            id: id.into(),
            account_id: "master_1".into(),
            symbol: "RELIANCE-EQ".into(),
            side: Side::Buy,
            quantity: 100,
            price: Decimal::from(2950),
            executed_at: Utc::now(),
            seen_at: Utc::now(),
        }
    }

    fn follower(id: &str, factor: Decimal) -> Follower {
        Follower {
            id: id.into(),
            display_name: id.to_uppercase(),
            scaling_factor: factor,
            max_quantity: Some(1_000),
            max_order_value: None,
            max_daily_loss: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn one_entry_per_follower_at_scaled_quantity() {
        let store = MemoryStore::new();
        let followers = vec![
            follower("f1", Decimal::new(5, 1)),  // 0.5
            follower("f2", Decimal::new(25, 2)), // 0.25
        ];

        let created = replicate(&store, &master_trade("t1"), &followers).await;
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|c| c.status == TradeStatus::Pending));

        let by_qty: Vec<(String, i64)> = created
            .iter()
            .map(|c| (c.follower_id.clone(), c.follower_quantity))
            .collect();
        assert_eq!(by_qty, vec![("f1".into(), 50), ("f2".into(), 25)]);
    }

    #[tokio::test]
    async fn stopped_follower_is_skipped_others_proceed() {
        let store = MemoryStore::new();
        store
            .set_consent(ConsentRecord::stopped("f1", "master_account"))
            .await
            .unwrap();

        let followers = vec![
            follower("f1", Decimal::ONE),
            follower("f2", Decimal::ONE),
        ];
        let created = replicate(&store, &master_trade("t1"), &followers).await;

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].follower_id, "f2");
        assert!(store
            .copy_trades_by_follower("f1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn replayed_fanout_creates_nothing_new() {
        let store = MemoryStore::new();
        let followers = vec![follower("f1", Decimal::ONE)];
        let trade = master_trade("t1");

        assert_eq!(replicate(&store, &trade, &followers).await.len(), 1);
        assert_eq!(replicate(&store, &trade, &followers).await.len(), 0);
        assert_eq!(store.list_copy_trades(None).await.unwrap().len(), 1);
    }
}
