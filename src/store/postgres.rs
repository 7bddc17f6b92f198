use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::CopyError;
use crate::models::{ConsentRecord, CopyTrade, Follower, MasterTrade, Side, TradeStatus};
use crate::store::Store;

/// Bootstrap DDL, applied on connect. Statements are idempotent so every
/// instance can run them unconditionally at startup.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS master_trades (
        id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL,
        symbol TEXT NOT NULL,
        side TEXT NOT NULL,
        quantity BIGINT NOT NULL,
        price NUMERIC NOT NULL,
        executed_at TIMESTAMPTZ NOT NULL,
        seen_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_master_trades_account ON master_trades (account_id, executed_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS copy_trades (
        id UUID PRIMARY KEY,
        master_trade_id TEXT NOT NULL,
        follower_id TEXT NOT NULL,
        symbol TEXT NOT NULL,
        side TEXT NOT NULL,
        master_quantity BIGINT NOT NULL,
        follower_quantity BIGINT NOT NULL,
        price NUMERIC NOT NULL,
        status TEXT NOT NULL,
        reason TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        UNIQUE (master_trade_id, follower_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_copy_trades_follower ON copy_trades (follower_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_copy_trades_status ON copy_trades (status)",
    r#"
    CREATE TABLE IF NOT EXISTS followers (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        scaling_factor NUMERIC NOT NULL,
        max_quantity BIGINT,
        max_order_value NUMERIC,
        max_daily_loss NUMERIC,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS consents (
        follower_id TEXT PRIMARY KEY,
        copy_trading_active BOOLEAN NOT NULL,
        stopped_at TIMESTAMPTZ,
        stopped_by TEXT,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS access_tokens (
        account_id TEXT PRIMARY KEY,
        token TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        // Verify connectivity
        sqlx::query("SELECT 1").execute(&pool).await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(PgStore { pool })
    }
}

// ---------------------------------------------------------------------------
// Row types — TEXT side/status columns decoded into domain enums
// ---------------------------------------------------------------------------

#[derive(FromRow)]
struct CopyTradeRow {
    id: Uuid,
    master_trade_id: String,
    follower_id: String,
    symbol: String,
    side: String,
    master_quantity: i64,
    follower_quantity: i64,
    price: Decimal,
    status: String,
    reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MasterTradeRow {
    id: String,
    account_id: String,
    symbol: String,
    side: String,
    quantity: i64,
    price: Decimal,
    executed_at: DateTime<Utc>,
    seen_at: DateTime<Utc>,
}

fn decode_side(s: &str) -> Result<Side, CopyError> {
    Side::from_api_str(s)
        .ok_or_else(|| CopyError::Internal(anyhow::anyhow!("unreadable side column: {s}")))
}

fn decode_status(s: &str) -> Result<TradeStatus, CopyError> {
    TradeStatus::from_api_str(s)
        .ok_or_else(|| CopyError::Internal(anyhow::anyhow!("unreadable status column: {s}")))
}

impl TryFrom<CopyTradeRow> for CopyTrade {
    type Error = CopyError;

    fn try_from(row: CopyTradeRow) -> Result<Self, Self::Error> {
        Ok(CopyTrade {
            id: row.id,
            master_trade_id: row.master_trade_id,
            follower_id: row.follower_id,
            symbol: row.symbol,
            side: decode_side(&row.side)?,
            master_quantity: row.master_quantity,
            follower_quantity: row.follower_quantity,
            price: row.price,
            status: decode_status(&row.status)?,
            reason: row.reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<MasterTradeRow> for MasterTrade {
    type Error = CopyError;

    fn try_from(row: MasterTradeRow) -> Result<Self, Self::Error> {
        Ok(MasterTrade {
            id: row.id,
            account_id: row.account_id,
            symbol: row.symbol,
            side: decode_side(&row.side)?,
            quantity: row.quantity,
            price: row.price,
            executed_at: row.executed_at,
            seen_at: row.seen_at,
        })
    }
}

fn collect_copy_trades(rows: Vec<CopyTradeRow>) -> Result<Vec<CopyTrade>, CopyError> {
    rows.into_iter().map(CopyTrade::try_from).collect()
}

// ---------------------------------------------------------------------------
// Store impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), CopyError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn append_copy_trade(&self, entry: CopyTrade) -> Result<CopyTrade, CopyError> {
        let row = sqlx::query_as::<_, CopyTradeRow>(
            r#"
            INSERT INTO copy_trades
                (id, master_trade_id, follower_id, symbol, side, master_quantity,
                 follower_quantity, price, status, reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT DO NOTHING
            RETURNING *
            "#,
        )
        .bind(entry.id)
        .bind(&entry.master_trade_id)
        .bind(&entry.follower_id)
        .bind(&entry.symbol)
        .bind(entry.side.to_string())
        .bind(entry.master_quantity)
        .bind(entry.follower_quantity)
        .bind(entry.price)
        .bind(entry.status.to_string())
        .bind(&entry.reason)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(CopyError::DuplicateEntry {
                master_trade_id: entry.master_trade_id,
                follower_id: entry.follower_id,
            }),
        }
    }

    async fn update_copy_trade_status(
        &self,
        id: Uuid,
        next: TradeStatus,
        reason: Option<String>,
    ) -> Result<CopyTrade, CopyError> {
        let current = self
            .get_copy_trade(id)
            .await?
            .ok_or_else(|| CopyError::NotFound(format!("copy trade {id} not found")))?;
        if current.status == next {
            // replayed callback; leave the row untouched
            return Ok(current);
        }

        let row = sqlx::query_as::<_, CopyTradeRow>(
            r#"
            UPDATE copy_trades
            SET status = $2, reason = COALESCE($3, reason), updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.to_string())
        .bind(&reason)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                // Lost a race: someone else closed the row between the read
                // and the guarded update. Re-read for the precise verdict.
                let latest = self
                    .get_copy_trade(id)
                    .await?
                    .ok_or_else(|| CopyError::NotFound(format!("copy trade {id} not found")))?;
                if latest.status == next {
                    Ok(latest)
                } else {
                    Err(CopyError::InvalidTransition {
                        from: latest.status,
                        to: next,
                    })
                }
            }
        }
    }

    async fn get_copy_trade(&self, id: Uuid) -> Result<Option<CopyTrade>, CopyError> {
        let row = sqlx::query_as::<_, CopyTradeRow>("SELECT * FROM copy_trades WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CopyTrade::try_from).transpose()
    }

    async fn list_copy_trades(
        &self,
        status: Option<TradeStatus>,
    ) -> Result<Vec<CopyTrade>, CopyError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, CopyTradeRow>(
                    "SELECT * FROM copy_trades WHERE status = $1 ORDER BY created_at DESC, id",
                )
                .bind(status.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CopyTradeRow>(
                    "SELECT * FROM copy_trades ORDER BY created_at DESC, id",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        collect_copy_trades(rows)
    }

    async fn copy_trades_by_follower(
        &self,
        follower_id: &str,
    ) -> Result<Vec<CopyTrade>, CopyError> {
        let rows = sqlx::query_as::<_, CopyTradeRow>(
            "SELECT * FROM copy_trades WHERE follower_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(follower_id)
        .fetch_all(&self.pool)
        .await?;
        collect_copy_trades(rows)
    }

    async fn copy_trades_by_master_trade(
        &self,
        master_trade_id: &str,
    ) -> Result<Vec<CopyTrade>, CopyError> {
        let rows = sqlx::query_as::<_, CopyTradeRow>(
            "SELECT * FROM copy_trades WHERE master_trade_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(master_trade_id)
        .fetch_all(&self.pool)
        .await?;
        collect_copy_trades(rows)
    }

    async fn copy_trade_status_counts(&self) -> Result<HashMap<TradeStatus, i64>, CopyError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM copy_trades GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = HashMap::new();
        for (status, count) in rows {
            counts.insert(decode_status(&status)?, count);
        }
        Ok(counts)
    }

    async fn record_unseen_trades(
        &self,
        trades: Vec<MasterTrade>,
    ) -> Result<Vec<MasterTrade>, CopyError> {
        let mut fresh = Vec::new();
        for trade in trades {
            let result = sqlx::query(
                r#"
                INSERT INTO master_trades
                    (id, account_id, symbol, side, quantity, price, executed_at, seen_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&trade.id)
            .bind(&trade.account_id)
            .bind(&trade.symbol)
            .bind(trade.side.to_string())
            .bind(trade.quantity)
            .bind(trade.price)
            .bind(trade.executed_at)
            .bind(trade.seen_at)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                fresh.push(trade);
            }
        }
        Ok(fresh)
    }

    async fn master_trades_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<MasterTrade>, CopyError> {
        let rows = sqlx::query_as::<_, MasterTradeRow>(
            "SELECT * FROM master_trades WHERE account_id = $1 ORDER BY executed_at DESC, id",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MasterTrade::try_from).collect()
    }

    async fn upsert_follower(&self, follower: Follower) -> Result<Follower, CopyError> {
        let row = sqlx::query_as::<_, Follower>(
            r#"
            INSERT INTO followers
                (id, display_name, scaling_factor, max_quantity, max_order_value,
                 max_daily_loss, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                display_name = $2,
                scaling_factor = $3,
                max_quantity = $4,
                max_order_value = $5,
                max_daily_loss = $6
            RETURNING *
            "#,
        )
        .bind(&follower.id)
        .bind(&follower.display_name)
        .bind(follower.scaling_factor)
        .bind(follower.max_quantity)
        .bind(follower.max_order_value)
        .bind(follower.max_daily_loss)
        .bind(follower.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_follower(&self, id: &str) -> Result<Option<Follower>, CopyError> {
        let row = sqlx::query_as::<_, Follower>("SELECT * FROM followers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_followers(&self) -> Result<Vec<Follower>, CopyError> {
        let rows = sqlx::query_as::<_, Follower>("SELECT * FROM followers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_consent(&self, follower_id: &str) -> Result<Option<ConsentRecord>, CopyError> {
        let row =
            sqlx::query_as::<_, ConsentRecord>("SELECT * FROM consents WHERE follower_id = $1")
                .bind(follower_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn set_consent(&self, record: ConsentRecord) -> Result<ConsentRecord, CopyError> {
        let row = sqlx::query_as::<_, ConsentRecord>(
            r#"
            INSERT INTO consents
                (follower_id, copy_trading_active, stopped_at, stopped_by, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (follower_id) DO UPDATE SET
                copy_trading_active = $2,
                stopped_at = $3,
                stopped_by = $4,
                updated_at = $5
            RETURNING *
            "#,
        )
        .bind(&record.follower_id)
        .bind(record.copy_trading_active)
        .bind(record.stopped_at)
        .bind(&record.stopped_by)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_access_token(&self, account_id: &str, token: &str) -> Result<(), CopyError> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens (account_id, token, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (account_id) DO UPDATE SET token = $2, updated_at = NOW()
            "#,
        )
        .bind(account_id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_access_token(&self, account_id: &str) -> Result<Option<String>, CopyError> {
        let token: Option<String> =
            sqlx::query_scalar("SELECT token FROM access_tokens WHERE account_id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(token)
    }

    async fn delete_access_token(&self, account_id: &str) -> Result<bool, CopyError> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn accounts_with_tokens(&self) -> Result<Vec<String>, CopyError> {
        let accounts: Vec<String> =
            sqlx::query_scalar("SELECT account_id FROM access_tokens ORDER BY account_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(accounts)
    }
}
