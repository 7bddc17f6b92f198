use async_trait::async_trait;
use reqwest::Client;

use crate::errors::CopyError;
use crate::models::RawTrade;
use crate::upstream::TradeSource;

/// REST trade-book client for the brokerage API. Auth is a bearer session
/// token scoped to the master account being polled.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: Client,
    base_url: String,
}

impl BrokerClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn unavailable(account_id: &str, e: impl std::fmt::Display) -> CopyError {
        CopyError::UpstreamUnavailable {
            account: account_id.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl TradeSource for BrokerClient {
    async fn fetch_trades(
        &self,
        account_id: &str,
        access_token: &str,
    ) -> Result<Vec<RawTrade>, CopyError> {
        let url = format!("{}/api/trade-book", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("account", account_id)])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Self::unavailable(account_id, e))?
            .error_for_status()
            .map_err(|e| Self::unavailable(account_id, e))?;

        let trades: Vec<RawTrade> = resp
            .json()
            .await
            .map_err(|e| Self::unavailable(account_id, e))?;
        Ok(trades)
    }
}
