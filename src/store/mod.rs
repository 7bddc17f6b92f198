pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::CopyError;
use crate::models::{ConsentRecord, CopyTrade, Follower, MasterTrade, TradeStatus};

/// Keyed persistence behind the engine. Backed by Postgres in production
/// and by an in-process map store in tests and single-node setups; the
/// engine and the API only ever see this trait.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), CopyError>;

    // -----------------------------------------------------------------
    // Replication ledger
    // -----------------------------------------------------------------

    /// Append a new ledger entry. Fails with `DuplicateEntry` when an
    /// entry for the same (master trade, follower) pair already exists,
    /// or when the generated id is already taken; the check and the
    /// insert are a single atomic step, never an overwrite.
    async fn append_copy_trade(&self, entry: CopyTrade) -> Result<CopyTrade, CopyError>;

    /// Guarded status update. Legal from PENDING to anything; replaying
    /// the entry's current status is a no-op that returns the row
    /// unchanged. Everything else is `InvalidTransition`.
    async fn update_copy_trade_status(
        &self,
        id: Uuid,
        next: TradeStatus,
        reason: Option<String>,
    ) -> Result<CopyTrade, CopyError>;

    async fn get_copy_trade(&self, id: Uuid) -> Result<Option<CopyTrade>, CopyError>;

    /// All ledger entries, newest first, optionally filtered by status.
    async fn list_copy_trades(
        &self,
        status: Option<TradeStatus>,
    ) -> Result<Vec<CopyTrade>, CopyError>;

    /// A follower's replication history, newest first.
    async fn copy_trades_by_follower(&self, follower_id: &str)
        -> Result<Vec<CopyTrade>, CopyError>;

    /// Every replication of one master trade across followers.
    async fn copy_trades_by_master_trade(
        &self,
        master_trade_id: &str,
    ) -> Result<Vec<CopyTrade>, CopyError>;

    async fn copy_trade_status_counts(&self) -> Result<HashMap<TradeStatus, i64>, CopyError>;

    // -----------------------------------------------------------------
    // Master trade feed
    // -----------------------------------------------------------------

    /// Record trades not seen before and return exactly those, in input
    /// order. Each id is checked-and-inserted atomically so overlapping
    /// polls cannot both claim a first sighting.
    async fn record_unseen_trades(
        &self,
        trades: Vec<MasterTrade>,
    ) -> Result<Vec<MasterTrade>, CopyError>;

    async fn master_trades_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<MasterTrade>, CopyError>;

    // -----------------------------------------------------------------
    // Follower registry
    // -----------------------------------------------------------------

    async fn upsert_follower(&self, follower: Follower) -> Result<Follower, CopyError>;

    async fn get_follower(&self, id: &str) -> Result<Option<Follower>, CopyError>;

    async fn list_followers(&self) -> Result<Vec<Follower>, CopyError>;

    // -----------------------------------------------------------------
    // Consent gate
    // -----------------------------------------------------------------

    async fn get_consent(&self, follower_id: &str) -> Result<Option<ConsentRecord>, CopyError>;

    async fn set_consent(&self, record: ConsentRecord) -> Result<ConsentRecord, CopyError>;

    /// Fail-open read used by the fan-out path: no record means active.
    async fn consent_is_active(&self, follower_id: &str) -> Result<bool, CopyError> {
        Ok(self
            .get_consent(follower_id)
            .await?
            .map(|c| c.copy_trading_active)
            .unwrap_or(true))
    }

    // -----------------------------------------------------------------
    // Upstream access tokens
    // -----------------------------------------------------------------

    /// Store an opaque broker session token for a master account. The
    /// engine never inspects the value; it forwards it to the trade
    /// source and treats presence as "pollable".
    async fn put_access_token(&self, account_id: &str, token: &str) -> Result<(), CopyError>;

    async fn get_access_token(&self, account_id: &str) -> Result<Option<String>, CopyError>;

    /// Returns whether a token was present.
    async fn delete_access_token(&self, account_id: &str) -> Result<bool, CopyError>;

    async fn accounts_with_tokens(&self) -> Result<Vec<String>, CopyError>;
}
