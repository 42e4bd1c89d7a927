//! Persistence boundary.
//!
//! The stores talk to storage only through [`Repository`], which is injected
//! at construction time. [`Database`] is the PostgreSQL implementation used by
//! the server; [`MemoryDatabase`] backs tests and local experiments.

mod boards;
mod cards;
mod comments;
mod memory;

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{Card, CardDraft, Comment, CommentDraft};

pub use memory::MemoryDatabase;

/// Schema migrations, embedded at compile time
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Read-only view of the boards a card can belong to
#[async_trait]
pub trait BoardDirectory: Send + Sync {
    async fn board_exists(&self, board_id: i32) -> Result<bool>;
}

/// Card persistence.
///
/// Writes that take a `board_id` only touch a card owned by that board and
/// return `None` otherwise. Pin orders are allocated atomically per board.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// All cards of a board, in no particular order
    async fn list_cards(&self, board_id: i32) -> Result<Vec<Card>>;

    async fn get_card(&self, card_id: i32) -> Result<Option<Card>>;

    /// Insert a card. Returns `None` if the board does not exist.
    async fn insert_card(&self, board_id: i32, draft: &CardDraft) -> Result<Option<Card>>;

    async fn update_card(
        &self,
        board_id: i32,
        card_id: i32,
        draft: &CardDraft,
    ) -> Result<Option<Card>>;

    /// Delete a card and, through the cascade, its comments
    async fn delete_card(&self, board_id: i32, card_id: i32) -> Result<Option<Card>>;

    async fn upvote_card(&self, board_id: i32, card_id: i32) -> Result<Option<Card>>;
}

/// Comment persistence, always scoped to a card
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Comments of a card in creation order
    async fn list_comments(&self, card_id: i32) -> Result<Vec<Comment>>;

    /// Batch lookup for board listings (avoids N+1)
    async fn list_comments_for_cards(&self, card_ids: &[i32])
        -> Result<HashMap<i32, Vec<Comment>>>;

    async fn insert_comment(&self, card_id: i32, draft: &CommentDraft) -> Result<Comment>;

    async fn delete_comment(&self, card_id: i32, comment_id: i32) -> Result<Option<Comment>>;
}

/// Everything the stores need from storage
#[async_trait]
pub trait Repository: BoardDirectory + CardRepository + CommentRepository {
    /// Connectivity check for the readiness endpoint
    async fn ping(&self) -> Result<()>;
}

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for Database {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
