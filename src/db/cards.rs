use async_trait::async_trait;
use sqlx::PgConnection;

use super::{CardRepository, Database};
use crate::cards::next_pin_order;
use crate::error::{AppError, Result};
use crate::models::{Card, CardDraft, PinChange};

/// Allocate the next pin order for a board.
///
/// Locks the board row for the rest of the transaction, so concurrent pins on
/// the same board queue up here instead of reading the same maximum.
/// Returns `None` if the board does not exist.
async fn allocate_pin_order(conn: &mut PgConnection, board_id: i32) -> Result<Option<i32>> {
    let locked: Option<(i32,)> = sqlx::query_as("SELECT id FROM boards WHERE id = $1 FOR UPDATE")
        .bind(board_id)
        .fetch_optional(&mut *conn)
        .await?;

    if locked.is_none() {
        return Ok(None);
    }

    let (current_max,): (Option<i32>,) =
        sqlx::query_as("SELECT MAX(pin_order) FROM cards WHERE board_id = $1 AND pinned")
            .bind(board_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(Some(next_pin_order(current_max)))
}

fn is_missing_board(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some("cards_board_id_fkey"))
}

#[async_trait]
impl CardRepository for Database {
    async fn list_cards(&self, board_id: i32) -> Result<Vec<Card>> {
        let cards = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE board_id = $1 ORDER BY id")
            .bind(board_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(cards)
    }

    async fn get_card(&self, card_id: i32) -> Result<Option<Card>> {
        let card = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1")
            .bind(card_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(card)
    }

    async fn insert_card(&self, board_id: i32, draft: &CardDraft) -> Result<Option<Card>> {
        let mut tx = self.pool.begin().await?;

        let pin_order = match draft.pin {
            PinChange::Pin => match allocate_pin_order(&mut tx, board_id).await? {
                Some(order) => Some(order),
                None => return Ok(None),
            },
            PinChange::Unpin | PinChange::Keep => None,
        };

        let inserted = sqlx::query_as::<_, Card>(
            r#"
            INSERT INTO cards (
                board_id, title, description, media_url, upvote_count, author,
                pinned, pin_order, created_at
            )
            VALUES ($1, $2, $3, $4, COALESCE($5, 0), $6, $7, $8, NOW())
            RETURNING *
            "#,
        )
        .bind(board_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.media_url.clone().flatten())
        .bind(draft.upvote_count)
        .bind(draft.author.clone().flatten())
        .bind(pin_order.is_some())
        .bind(pin_order)
        .fetch_one(&mut *tx)
        .await;

        let card = match inserted {
            Ok(card) => card,
            Err(e) if is_missing_board(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        Ok(Some(card))
    }

    async fn update_card(
        &self,
        board_id: i32,
        card_id: i32,
        draft: &CardDraft,
    ) -> Result<Option<Card>> {
        let mut tx = self.pool.begin().await?;

        // (new pinned flag, new order); a NULL flag keeps the stored pin state
        let (pinned, pin_order): (Option<bool>, Option<i32>) = match draft.pin {
            PinChange::Pin => match allocate_pin_order(&mut tx, board_id).await? {
                Some(order) => (Some(true), Some(order)),
                None => return Ok(None),
            },
            PinChange::Unpin => (Some(false), None),
            PinChange::Keep => (None, None),
        };

        // Optional text columns: a FALSE flag keeps the stored value,
        // TRUE writes the bound value (NULL clears it)
        let card = sqlx::query_as::<_, Card>(
            r#"
            UPDATE cards SET
                title = $3,
                description = $4,
                media_url = CASE WHEN $5::BOOLEAN THEN $6::TEXT ELSE media_url END,
                upvote_count = COALESCE($7, upvote_count),
                author = CASE WHEN $8::BOOLEAN THEN $9::TEXT ELSE author END,
                pinned = COALESCE($10::BOOLEAN, pinned),
                pin_order = CASE WHEN $10::BOOLEAN IS NULL THEN pin_order ELSE $11::INTEGER END
            WHERE id = $2 AND board_id = $1
            RETURNING *
            "#,
        )
        .bind(board_id)
        .bind(card_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.media_url.is_some())
        .bind(draft.media_url.clone().flatten())
        .bind(draft.upvote_count)
        .bind(draft.author.is_some())
        .bind(draft.author.clone().flatten())
        .bind(pinned)
        .bind(pin_order)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(card)
    }

    async fn delete_card(&self, board_id: i32, card_id: i32) -> Result<Option<Card>> {
        let card = sqlx::query_as::<_, Card>(
            "DELETE FROM cards WHERE id = $2 AND board_id = $1 RETURNING *",
        )
        .bind(board_id)
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn upvote_card(&self, board_id: i32, card_id: i32) -> Result<Option<Card>> {
        let card = sqlx::query_as::<_, Card>(
            r#"
            UPDATE cards SET upvote_count = upvote_count + 1
            WHERE id = $2 AND board_id = $1 AND upvote_count < 2147483647
            RETURNING *
            "#,
        )
        .bind(board_id)
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;

        if card.is_some() {
            return Ok(card);
        }

        // No row: either the card is not on this board or the count is capped
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM cards WHERE id = $2 AND board_id = $1)")
                .bind(board_id)
                .bind(card_id)
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Err(AppError::upvote_limit())
        } else {
            Ok(None)
        }
    }
}
