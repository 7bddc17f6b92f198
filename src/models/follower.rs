use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A follower account registered for replication.
///
/// `scaling_factor` and `max_quantity` drive the quantity calculator;
/// `max_order_value` and `max_daily_loss` are recorded limits served back
/// to operators but not enforced by the engine, which never sees fills.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Follower {
    pub id: String,
    pub display_name: String,
    pub scaling_factor: Decimal,
    /// Per-trade share cap; unset means uncapped.
    pub max_quantity: Option<i64>,
    pub max_order_value: Option<Decimal>,
    pub max_daily_loss: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Follower {
    /// Registration-time sanity rules. Returns a caller-facing message so
    /// the API layer can reject with a 400.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("follower id must not be empty".into());
        }
        if self.display_name.trim().is_empty() {
            return Err("display_name must not be empty".into());
        }
        if self.scaling_factor <= Decimal::ZERO {
            return Err("scaling_factor must be positive".into());
        }
        if matches!(self.max_quantity, Some(v) if v < 1) {
            return Err("max_quantity must be at least 1 when set".into());
        }
        if matches!(self.max_order_value, Some(v) if v <= Decimal::ZERO) {
            return Err("max_order_value must be positive when set".into());
        }
        if matches!(self.max_daily_loss, Some(v) if v <= Decimal::ZERO) {
            return Err("max_daily_loss must be positive when set".into());
        }
        Ok(())
    }
}
