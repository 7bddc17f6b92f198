pub mod broker_client;

pub use broker_client::BrokerClient;

use async_trait::async_trait;

use crate::errors::CopyError;
use crate::models::RawTrade;

/// Where master-account trades come from. The poller drives this once per
/// account per cycle; tests script it with canned batches. Failures
/// surface as `UpstreamUnavailable` and cost the account one cycle, never
/// the whole pass.
#[async_trait]
pub trait TradeSource: Send + Sync {
    /// Fetch the account's current trade book. `access_token` is the
    /// opaque broker session token from the store, forwarded untouched.
    async fn fetch_trades(
        &self,
        account_id: &str,
        access_token: &str,
    ) -> Result<Vec<RawTrade>, CopyError>;
}
