use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Master-controlled replication switch for one follower.
///
/// Absence of a record means replication is allowed; the gate fails open
/// so a follower never silently stops copying because nobody wrote a row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConsentRecord {
    pub follower_id: String,
    pub copy_trading_active: bool,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stopped_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConsentRecord {
    pub fn stopped(follower_id: impl Into<String>, actor: impl Into<String>) -> Self {
        let now = Utc::now();
        ConsentRecord {
            follower_id: follower_id.into(),
            copy_trading_active: false,
            stopped_at: Some(now),
            stopped_by: Some(actor.into()),
            updated_at: now,
        }
    }

    pub fn resumed(follower_id: impl Into<String>) -> Self {
        ConsentRecord {
            follower_id: follower_id.into(),
            copy_trading_active: true,
            stopped_at: None,
            stopped_by: None,
            updated_at: Utc::now(),
        }
    }
}
