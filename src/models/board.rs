use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A kudos board. Boards are created and removed outside the card API;
/// cards only ever reference them by id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
