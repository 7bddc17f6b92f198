use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::CopyError;
use crate::models::{ConsentRecord, CopyTrade, Follower, MasterTrade, TradeStatus};
use crate::store::Store;

/// In-process store. Concurrency guarantees come from DashMap's per-key
/// entry locks: the (master trade, follower) pair index is claimed before
/// the ledger row is written, and status updates mutate the row under its
/// shard lock.
#[derive(Default)]
pub struct MemoryStore {
    copy_trades: DashMap<Uuid, CopyTrade>,
    /// (master_trade_id, follower_id) -> ledger entry id. Owns pair
    /// uniqueness; always locked before `copy_trades`.
    pairs: DashMap<(String, String), Uuid>,
    master_trades: DashMap<String, MasterTrade>,
    followers: DashMap<String, Follower>,
    consents: DashMap<String, ConsentRecord>,
    tokens: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), CopyError> {
        Ok(())
    }

    // -----------------------------------------------------------------
    // Replication ledger
    // -----------------------------------------------------------------

    async fn append_copy_trade(&self, entry: CopyTrade) -> Result<CopyTrade, CopyError> {
        // ids are generated, so a collision is a caller bug; reject it
        // rather than overwrite the existing row
        if self.copy_trades.contains_key(&entry.id) {
            return Err(CopyError::DuplicateEntry {
                master_trade_id: entry.master_trade_id,
                follower_id: entry.follower_id,
            });
        }

        let key = (entry.master_trade_id.clone(), entry.follower_id.clone());
        match self.pairs.entry(key) {
            Entry::Occupied(_) => Err(CopyError::DuplicateEntry {
                master_trade_id: entry.master_trade_id,
                follower_id: entry.follower_id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(entry.id);
                self.copy_trades.insert(entry.id, entry.clone());
                Ok(entry)
            }
        }
    }

    async fn update_copy_trade_status(
        &self,
        id: Uuid,
        next: TradeStatus,
        reason: Option<String>,
    ) -> Result<CopyTrade, CopyError> {
        let mut row = self
            .copy_trades
            .get_mut(&id)
            .ok_or_else(|| CopyError::NotFound(format!("copy trade {id} not found")))?;

        if !row.status.can_transition_to(next) {
            return Err(CopyError::InvalidTransition {
                from: row.status,
                to: next,
            });
        }
        if row.status == next {
            // replayed callback; leave the row untouched
            return Ok(row.clone());
        }

        row.status = next;
        if reason.is_some() {
            row.reason = reason;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn get_copy_trade(&self, id: Uuid) -> Result<Option<CopyTrade>, CopyError> {
        Ok(self.copy_trades.get(&id).map(|r| r.clone()))
    }

    async fn list_copy_trades(
        &self,
        status: Option<TradeStatus>,
    ) -> Result<Vec<CopyTrade>, CopyError> {
        let mut rows: Vec<CopyTrade> = self
            .copy_trades
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn copy_trades_by_follower(
        &self,
        follower_id: &str,
    ) -> Result<Vec<CopyTrade>, CopyError> {
        let mut rows: Vec<CopyTrade> = self
            .copy_trades
            .iter()
            .filter(|r| r.follower_id == follower_id)
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn copy_trades_by_master_trade(
        &self,
        master_trade_id: &str,
    ) -> Result<Vec<CopyTrade>, CopyError> {
        let mut rows: Vec<CopyTrade> = self
            .copy_trades
            .iter()
            .filter(|r| r.master_trade_id == master_trade_id)
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn copy_trade_status_counts(&self) -> Result<HashMap<TradeStatus, i64>, CopyError> {
        let mut counts = HashMap::new();
        for row in self.copy_trades.iter() {
            *counts.entry(row.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    // -----------------------------------------------------------------
    // Master trade feed
    // -----------------------------------------------------------------

    async fn record_unseen_trades(
        &self,
        trades: Vec<MasterTrade>,
    ) -> Result<Vec<MasterTrade>, CopyError> {
        let mut fresh = Vec::new();
        for trade in trades {
            match self.master_trades.entry(trade.id.clone()) {
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(trade.clone());
                    fresh.push(trade);
                }
            }
        }
        Ok(fresh)
    }

    async fn master_trades_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<MasterTrade>, CopyError> {
        let mut rows: Vec<MasterTrade> = self
            .master_trades
            .iter()
            .filter(|t| t.account_id == account_id)
            .map(|t| t.clone())
            .collect();
        rows.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        Ok(rows)
    }

    // -----------------------------------------------------------------
    // Follower registry
    // -----------------------------------------------------------------

    async fn upsert_follower(&self, follower: Follower) -> Result<Follower, CopyError> {
        self.followers
            .insert(follower.id.clone(), follower.clone());
        Ok(follower)
    }

    async fn get_follower(&self, id: &str) -> Result<Option<Follower>, CopyError> {
        Ok(self.followers.get(id).map(|f| f.clone()))
    }

    async fn list_followers(&self) -> Result<Vec<Follower>, CopyError> {
        let mut rows: Vec<Follower> = self.followers.iter().map(|f| f.clone()).collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }

    // -----------------------------------------------------------------
    // Consent gate
    // -----------------------------------------------------------------

    async fn get_consent(&self, follower_id: &str) -> Result<Option<ConsentRecord>, CopyError> {
        Ok(self.consents.get(follower_id).map(|c| c.clone()))
    }

    async fn set_consent(&self, record: ConsentRecord) -> Result<ConsentRecord, CopyError> {
        self.consents
            .insert(record.follower_id.clone(), record.clone());
        Ok(record)
    }

    // -----------------------------------------------------------------
    // Upstream access tokens
    // -----------------------------------------------------------------

    async fn put_access_token(&self, account_id: &str, token: &str) -> Result<(), CopyError> {
        self.tokens.insert(account_id.to_string(), token.to_string());
        Ok(())
    }

    async fn get_access_token(&self, account_id: &str) -> Result<Option<String>, CopyError> {
        Ok(self.tokens.get(account_id).map(|t| t.clone()))
    }

    async fn delete_access_token(&self, account_id: &str) -> Result<bool, CopyError> {
        Ok(self.tokens.remove(account_id).is_some())
    }

    async fn accounts_with_tokens(&self) -> Result<Vec<String>, CopyError> {
        let mut accounts: Vec<String> = self.tokens.iter().map(|t| t.key().clone()).collect();
        accounts.sort();
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    use crate::models::Side;

    fn entry(master_trade_id: &str, follower_id: &str) -> CopyTrade {
        CopyTrade::pending(
            master_trade_id,
            follower_id,
            "RELIANCE-EQ",
            Side::Buy,
            100,
            50,
            Decimal::new(295_050, 2), // 2950.50
        )
    }

    #[tokio::test]
    async fn append_then_fetch() {
        let store = MemoryStore::new();
        let created = store.append_copy_trade(entry("t1", "f1")).await.unwrap();

        let fetched = store.get_copy_trade(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.master_trade_id, "t1");
        assert_eq!(fetched.status, TradeStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_pair_is_rejected() {
        let store = MemoryStore::new();
        store.append_copy_trade(entry("t1", "f1")).await.unwrap();

        let err = store.append_copy_trade(entry("t1", "f1")).await.unwrap_err();
        assert!(matches!(err, CopyError::DuplicateEntry { .. }));

        // same trade for a different follower is fine
        store.append_copy_trade(entry("t1", "f2")).await.unwrap();
        assert_eq!(store.list_copy_trades(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reusing_an_entry_id_is_rejected() {
        let store = MemoryStore::new();
        let first = store.append_copy_trade(entry("t1", "f1")).await.unwrap();

        let mut clash = entry("t2", "f2");
        clash.id = first.id;
        let err = store.append_copy_trade(clash).await.unwrap_err();
        assert!(matches!(err, CopyError::DuplicateEntry { .. }));

        let row = store.get_copy_trade(first.id).await.unwrap().unwrap();
        assert_eq!(row.master_trade_id, "t1");
    }

    #[tokio::test]
    async fn status_update_respects_the_state_machine() {
        let store = MemoryStore::new();
        let row = store.append_copy_trade(entry("t1", "f1")).await.unwrap();

        let updated = store
            .update_copy_trade_status(row.id, TradeStatus::Success, None)
            .await
            .unwrap();
        assert_eq!(updated.status, TradeStatus::Success);

        let err = store
            .update_copy_trade_status(row.id, TradeStatus::Failed, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CopyError::InvalidTransition {
                from: TradeStatus::Success,
                to: TradeStatus::Failed,
            }
        ));
    }

    #[tokio::test]
    async fn replaying_the_current_status_is_a_noop() {
        let store = MemoryStore::new();
        let row = store.append_copy_trade(entry("t1", "f1")).await.unwrap();

        let first = store
            .update_copy_trade_status(row.id, TradeStatus::Failed, Some("rejected by broker".into()))
            .await
            .unwrap();
        let replay = store
            .update_copy_trade_status(row.id, TradeStatus::Failed, Some("rejected again".into()))
            .await
            .unwrap();

        assert_eq!(replay.updated_at, first.updated_at);
        assert_eq!(replay.reason.as_deref(), Some("rejected by broker"));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_copy_trade_status(Uuid::new_v4(), TradeStatus::Success, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::NotFound(_)));
    }

    #[tokio::test]
    async fn follower_history_is_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (i, trade_id) in ["t1", "t2", "t3"].iter().enumerate() {
            let mut e = entry(trade_id, "f1");
            e.created_at = now + Duration::seconds(i as i64);
            store.append_copy_trade(e).await.unwrap();
        }

        let rows = store.copy_trades_by_follower("f1").await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.master_trade_id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }

    #[tokio::test]
    async fn record_unseen_filters_known_ids() {
        let store = MemoryStore::new();
        let t = |id: &str| MasterTrade {
            id: id.into(),
            account_id: "master_1".into(),
            symbol: "INFY-EQ".into(),
            side: Side::Sell,
            quantity: 10,
            price: Decimal::from(1500),
            executed_at: Utc::now(),
            seen_at: Utc::now(),
        };

        let fresh = store
            .record_unseen_trades(vec![t("a"), t("b")])
            .await
            .unwrap();
        assert_eq!(fresh.len(), 2);

        let fresh = store
            .record_unseen_trades(vec![t("b"), t("c")])
            .await
            .unwrap();
        let ids: Vec<&str> = fresh.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[tokio::test]
    async fn consent_defaults_to_active() {
        let store = MemoryStore::new();
        assert!(store.consent_is_active("f1").await.unwrap());

        store
            .set_consent(ConsentRecord::stopped("f1", "master_account"))
            .await
            .unwrap();
        assert!(!store.consent_is_active("f1").await.unwrap());

        store
            .set_consent(ConsentRecord::resumed("f1"))
            .await
            .unwrap();
        assert!(store.consent_is_active("f1").await.unwrap());
    }

    #[tokio::test]
    async fn token_lifecycle() {
        let store = MemoryStore::new();
        assert!(store.get_access_token("m1").await.unwrap().is_none());

        store.put_access_token("m1", "sess-abc").await.unwrap();
        store.put_access_token("m2", "sess-def").await.unwrap();
        assert_eq!(
            store.get_access_token("m1").await.unwrap().as_deref(),
            Some("sess-abc")
        );
        assert_eq!(
            store.accounts_with_tokens().await.unwrap(),
            vec!["m1".to_string(), "m2".to_string()]
        );

        assert!(store.delete_access_token("m1").await.unwrap());
        assert!(!store.delete_access_token("m1").await.unwrap());
    }
}
