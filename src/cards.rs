//! Card store: board membership, pinned ordering and the card lifecycle.
//!
//! Pin state machine: an update with `pinned = true` always moves the card to
//! the most recently pinned position (highest order in its board), including
//! when the card was already pinned. `pinned = false` clears the order.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{Card, CardRequest, CardWithComments};

/// Order assigned to a newly pinned card given the board's current maximum
pub fn next_pin_order(current_max: Option<i32>) -> i32 {
    current_max.map_or(1, |max| max + 1)
}

/// Display order: pinned cards first by `pin_order` descending,
/// then unpinned cards in creation order.
pub fn display_order(a: &Card, b: &Card) -> Ordering {
    match (a.pin_order, b.pin_order) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

#[derive(Clone)]
pub struct CardStore {
    repo: Arc<dyn Repository>,
}

impl CardStore {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// The card, if it belongs to `board_id`.
    ///
    /// Every card-scoped operation goes through here.
    pub async fn find_card_in_board(&self, board_id: i32, card_id: i32) -> Result<Card> {
        self.repo
            .get_card(card_id)
            .await?
            .filter(|card| card.board_id == board_id)
            .ok_or_else(|| AppError::card_not_in_board(card_id, board_id))
    }

    /// All cards of a board in display order, each with its comments
    pub async fn list_cards(&self, board_id: i32) -> Result<Vec<CardWithComments>> {
        if !self.repo.board_exists(board_id).await? {
            return Err(AppError::board_not_found(board_id));
        }

        let mut cards = self.repo.list_cards(board_id).await?;
        cards.sort_by(display_order);

        let card_ids: Vec<i32> = cards.iter().map(|c| c.id).collect();
        let mut comments = self.repo.list_comments_for_cards(&card_ids).await?;

        tracing::debug!(board_id, count = cards.len(), "listed cards");

        Ok(cards
            .into_iter()
            .map(|card| {
                let comments = comments.remove(&card.id).unwrap_or_default();
                CardWithComments { card, comments }
            })
            .collect())
    }

    pub async fn get_card(&self, board_id: i32, card_id: i32) -> Result<Card> {
        self.find_card_in_board(board_id, card_id).await
    }

    /// Create a card. A card created with `pinned = true` gets a pin order
    /// right away, exactly as if it had been pinned by an update.
    pub async fn create_card(&self, board_id: i32, req: CardRequest) -> Result<Card> {
        let draft = req.validate()?;

        if !self.repo.board_exists(board_id).await? {
            return Err(AppError::board_not_found(board_id));
        }

        let card = self
            .repo
            .insert_card(board_id, &draft)
            .await?
            .ok_or_else(|| AppError::board_not_found(board_id))?;

        tracing::info!(board_id, card_id = card.id, pinned = card.pinned, "card created");
        Ok(card)
    }

    pub async fn update_card(&self, board_id: i32, card_id: i32, req: CardRequest) -> Result<Card> {
        let draft = req.validate()?;
        self.find_card_in_board(board_id, card_id).await?;

        // The card may have been deleted or the board removed since the check
        let card = self
            .repo
            .update_card(board_id, card_id, &draft)
            .await?
            .ok_or_else(|| AppError::card_not_in_board(card_id, board_id))?;

        tracing::info!(
            board_id,
            card_id,
            pinned = card.pinned,
            pin_order = ?card.pin_order,
            "card updated"
        );
        Ok(card)
    }

    /// Delete a card (its comments go with it). Returns the deleted card.
    pub async fn delete_card(&self, board_id: i32, card_id: i32) -> Result<Card> {
        self.find_card_in_board(board_id, card_id).await?;

        let card = self
            .repo
            .delete_card(board_id, card_id)
            .await?
            .ok_or_else(|| AppError::card_not_in_board(card_id, board_id))?;

        tracing::info!(board_id, card_id, "card deleted");
        Ok(card)
    }

    pub async fn upvote_card(&self, board_id: i32, card_id: i32) -> Result<Card> {
        self.find_card_in_board(board_id, card_id).await?;

        let card = self
            .repo
            .upvote_card(board_id, card_id)
            .await?
            .ok_or_else(|| AppError::card_not_in_board(card_id, board_id))?;

        tracing::debug!(board_id, card_id, upvotes = card.upvote_count, "card upvoted");
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use std::collections::HashSet;

    fn request(title: &str, pinned: Option<bool>) -> CardRequest {
        CardRequest {
            title: Some(title.to_string()),
            description: Some("thank you!".to_string()),
            pinned,
            ..Default::default()
        }
    }

    async fn setup() -> (MemoryDatabase, CardStore, i32) {
        let db = MemoryDatabase::new();
        let board = db.insert_board("Team kudos").await;
        let store = CardStore::new(Arc::new(db.clone()));
        (db, store, board.id)
    }

    fn card(id: i32, pin_order: Option<i32>) -> Card {
        Card {
            id,
            board_id: 1,
            title: format!("card {}", id),
            description: "d".to_string(),
            media_url: None,
            upvote_count: 0,
            author: None,
            pinned: pin_order.is_some(),
            pin_order,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_next_pin_order() {
        assert_eq!(next_pin_order(None), 1);
        assert_eq!(next_pin_order(Some(3)), 4);
    }

    #[test]
    fn test_display_order_pinned_first_descending() {
        let mut cards = vec![
            card(1, Some(1)),
            card(2, None),
            card(3, Some(3)),
            card(4, Some(2)),
            card(5, None),
        ];
        cards.sort_by(display_order);
        let orders: Vec<Option<i32>> = cards.iter().map(|c| c.pin_order).collect();
        assert_eq!(orders, vec![Some(3), Some(2), Some(1), None, None]);
        assert_eq!(cards[3].id, 2);
        assert_eq!(cards[4].id, 5);
    }

    #[tokio::test]
    async fn test_pin_gets_next_order() {
        let (_db, store, board_id) = setup().await;

        let a = store.create_card(board_id, request("A", None)).await.unwrap();
        let b = store.create_card(board_id, request("B", None)).await.unwrap();
        assert!(!a.pinned);
        assert_eq!(a.pin_order, None);

        let a = store.update_card(board_id, a.id, request("A", Some(true))).await.unwrap();
        assert_eq!(a.pin_order, Some(1));

        let b = store.update_card(board_id, b.id, request("B", Some(true))).await.unwrap();
        assert_eq!(b.pin_order, Some(2));
        assert!(b.pin_state_consistent());
    }

    #[tokio::test]
    async fn test_pin_after_existing_max() {
        let (_db, store, board_id) = setup().await;

        // A ends up pinned with order 3
        let a = store.create_card(board_id, request("A", None)).await.unwrap();
        for _ in 0..3 {
            store.update_card(board_id, a.id, request("A", Some(true))).await.unwrap();
        }
        let a = store.get_card(board_id, a.id).await.unwrap();
        assert_eq!(a.pin_order, Some(3));

        let b = store.create_card(board_id, request("B", None)).await.unwrap();
        let b = store.update_card(board_id, b.id, request("B", Some(true))).await.unwrap();
        assert_eq!(b.pin_order, Some(4));
    }

    #[tokio::test]
    async fn test_repin_moves_to_top() {
        let (_db, store, board_id) = setup().await;

        let a = store.create_card(board_id, request("A", Some(true))).await.unwrap();
        let b = store.create_card(board_id, request("B", Some(true))).await.unwrap();
        assert_eq!((a.pin_order, b.pin_order), (Some(1), Some(2)));

        let a = store.update_card(board_id, a.id, request("A", Some(true))).await.unwrap();
        assert_eq!(a.pin_order, Some(3));

        let listed = store.list_cards(board_id).await.unwrap();
        assert_eq!(listed[0].card.id, a.id);
        assert_eq!(listed[1].card.id, b.id);
    }

    #[tokio::test]
    async fn test_unpin_clears_order_and_moves_to_unpinned_group() {
        let (_db, store, board_id) = setup().await;

        let a = store.create_card(board_id, request("A", Some(true))).await.unwrap();
        let b = store.create_card(board_id, request("B", None)).await.unwrap();

        let a = store.update_card(board_id, a.id, request("A", Some(false))).await.unwrap();
        assert!(!a.pinned);
        assert_eq!(a.pin_order, None);

        let c = store.create_card(board_id, request("C", Some(true))).await.unwrap();

        let listed: Vec<i32> = store
            .list_cards(board_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.card.id)
            .collect();
        assert_eq!(listed, vec![c.id, a.id, b.id]);
    }

    #[tokio::test]
    async fn test_update_without_pinned_keeps_pin_state() {
        let (_db, store, board_id) = setup().await;

        let a = store.create_card(board_id, request("A", Some(true))).await.unwrap();
        let updated = store.update_card(board_id, a.id, request("A2", None)).await.unwrap();
        assert_eq!(updated.title, "A2");
        assert!(updated.pinned);
        assert_eq!(updated.pin_order, a.pin_order);
    }

    #[tokio::test]
    async fn test_update_keeps_omitted_optional_fields() {
        let (_db, store, board_id) = setup().await;

        let req = CardRequest {
            media_url: Some(Some("https://media.example/clap.gif".into())),
            author: Some(Some("riley".into())),
            upvote_count: Some(5),
            ..request("A", None)
        };
        let a = store.create_card(board_id, req).await.unwrap();

        let updated = store.update_card(board_id, a.id, request("A", None)).await.unwrap();
        assert_eq!(updated.media_url.as_deref(), Some("https://media.example/clap.gif"));
        assert_eq!(updated.author.as_deref(), Some("riley"));
        assert_eq!(updated.upvote_count, 5);
    }

    #[tokio::test]
    async fn test_update_with_null_clears_optional_fields() {
        let (_db, store, board_id) = setup().await;

        let req = CardRequest {
            media_url: Some(Some("https://media.example/clap.gif".into())),
            author: Some(Some("riley".into())),
            ..request("A", None)
        };
        let a = store.create_card(board_id, req).await.unwrap();

        let clear_media = CardRequest { media_url: Some(None), ..request("A", None) };
        let updated = store.update_card(board_id, a.id, clear_media).await.unwrap();
        assert_eq!(updated.media_url, None);
        assert_eq!(updated.author.as_deref(), Some("riley"));

        let clear_author = CardRequest { author: Some(None), ..request("A", None) };
        let updated = store.update_card(board_id, a.id, clear_author).await.unwrap();
        assert_eq!(updated.author, None);
    }

    #[tokio::test]
    async fn test_create_with_empty_title_persists_nothing() {
        let (_db, store, board_id) = setup().await;

        let err = store.create_card(board_id, request("", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_cards(board_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_card_in_other_board_is_not_found() {
        let (db, store, board_id) = setup().await;
        let other = db.insert_board("Elsewhere").await;

        let a = store.create_card(board_id, request("A", None)).await.unwrap();

        assert!(matches!(
            store.get_card(other.id, a.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.update_card(other.id, a.id, request("A", Some(true))).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_card(other.id, a.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.upvote_card(other.id, a.id).await,
            Err(AppError::NotFound(_))
        ));

        // Untouched in its own board
        let a = store.get_card(board_id, a.id).await.unwrap();
        assert!(!a.pinned);
    }

    #[tokio::test]
    async fn test_validation_checked_before_membership() {
        let (_db, store, board_id) = setup().await;
        let err = store.update_card(board_id, 999, request("", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_missing_board() {
        let (_db, store, _) = setup().await;
        assert!(matches!(store.list_cards(404).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            store.create_card(404, request("A", None)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_returns_snapshot() {
        let (_db, store, board_id) = setup().await;
        let a = store.create_card(board_id, request("A", Some(true))).await.unwrap();

        let deleted = store.delete_card(board_id, a.id).await.unwrap();
        assert_eq!(deleted, a);
        assert!(matches!(
            store.get_card(board_id, a.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upvote_increments() {
        let (_db, store, board_id) = setup().await;
        let a = store.create_card(board_id, request("A", None)).await.unwrap();

        store.upvote_card(board_id, a.id).await.unwrap();
        let a = store.upvote_card(board_id, a.id).await.unwrap();
        assert_eq!(a.upvote_count, 2);
    }

    #[tokio::test]
    async fn test_upvote_at_maximum_is_rejected() {
        let (_db, store, board_id) = setup().await;
        let req = CardRequest { upvote_count: Some(i32::MAX), ..request("A", None) };
        let a = store.create_card(board_id, req).await.unwrap();

        assert!(matches!(
            store.upvote_card(board_id, a.id).await,
            Err(AppError::Validation(_))
        ));
        let a = store.get_card(board_id, a.id).await.unwrap();
        assert_eq!(a.upvote_count, i32::MAX);
    }

    #[tokio::test]
    async fn test_concurrent_pins_get_distinct_orders() {
        let (_db, store, board_id) = setup().await;

        let mut ids = Vec::new();
        for i in 0..16 {
            let card = store
                .create_card(board_id, request(&format!("card {}", i), None))
                .await
                .unwrap();
            ids.push(card.id);
        }

        let mut handles = Vec::new();
        for id in ids {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_card(board_id, id, request("pinned", Some(true)))
                    .await
            }));
        }

        let mut orders = HashSet::new();
        for handle in handles {
            let card = handle.await.unwrap().unwrap();
            assert!(orders.insert(card.pin_order.unwrap()));
        }
        assert_eq!(orders.len(), 16);
        assert_eq!(orders.iter().max(), Some(&16));

        for listed in store.list_cards(board_id).await.unwrap() {
            assert!(listed.card.pin_state_consistent());
        }
    }
}
