use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, Result};

/// A comment attached to a single card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i32,
    pub card_id: i32,
    pub body: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request to add a comment to a card
#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    #[serde(alias = "message")]
    pub body: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub body: String,
    pub author: Option<String>,
}

impl CommentRequest {
    pub fn validate(self) -> Result<CommentDraft> {
        let body = self
            .body
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Validation("body is required".to_string()))?;

        Ok(CommentDraft {
            body,
            author: self.author,
        })
    }
}
