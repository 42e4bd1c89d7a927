use async_trait::async_trait;
use std::collections::HashMap;

use super::{CommentRepository, Database};
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentDraft};

#[async_trait]
impl CommentRepository for Database {
    async fn list_comments(&self, card_id: i32) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE card_id = $1 ORDER BY id ASC",
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn list_comments_for_cards(
        &self,
        card_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<Comment>>> {
        if card_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE card_id = ANY($1) ORDER BY id ASC",
        )
        .bind(card_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_card: HashMap<i32, Vec<Comment>> = HashMap::new();
        for comment in comments {
            by_card.entry(comment.card_id).or_default().push(comment);
        }

        Ok(by_card)
    }

    async fn insert_comment(&self, card_id: i32, draft: &CommentDraft) -> Result<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (card_id, body, author, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING *
            "#,
        )
        .bind(card_id)
        .bind(&draft.body)
        .bind(&draft.author)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Card deleted between the membership check and the insert
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("comments_card_id_fkey") {
                    return AppError::NotFound(format!("Card {} not found", card_id));
                }
            }
            AppError::Database(e)
        })
    }

    async fn delete_comment(&self, card_id: i32, comment_id: i32) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "DELETE FROM comments WHERE id = $2 AND card_id = $1 RETURNING *",
        )
        .bind(card_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }
}
