//! Comment store. Comments are only reachable through a card that belongs to
//! the requested board.

use std::sync::Arc;

use crate::cards::CardStore;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentRequest};

#[derive(Clone)]
pub struct CommentStore {
    repo: Arc<dyn Repository>,
    cards: CardStore,
}

impl CommentStore {
    pub fn new(repo: Arc<dyn Repository>, cards: CardStore) -> Self {
        Self { repo, cards }
    }

    /// Comments of a card in creation order
    pub async fn list_comments(&self, board_id: i32, card_id: i32) -> Result<Vec<Comment>> {
        self.cards.find_card_in_board(board_id, card_id).await?;
        self.repo.list_comments(card_id).await
    }

    pub async fn create_comment(
        &self,
        board_id: i32,
        card_id: i32,
        req: CommentRequest,
    ) -> Result<Comment> {
        let draft = req.validate()?;
        self.cards.find_card_in_board(board_id, card_id).await?;

        let comment = self.repo.insert_comment(card_id, &draft).await?;
        tracing::info!(board_id, card_id, comment_id = comment.id, "comment created");
        Ok(comment)
    }

    /// Delete a comment. Returns the deleted comment.
    pub async fn delete_comment(
        &self,
        board_id: i32,
        card_id: i32,
        comment_id: i32,
    ) -> Result<Comment> {
        self.cards.find_card_in_board(board_id, card_id).await?;

        let comment = self
            .repo
            .delete_comment(card_id, comment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Comment {} not found on card {}",
                    comment_id, card_id
                ))
            })?;

        tracing::info!(board_id, card_id, comment_id, "comment deleted");
        Ok(comment)
    }
}
