//! In-memory repository.
//!
//! Mirrors the PostgreSQL schema rules: foreign keys cascade on delete and pin
//! orders are allocated under a single write lock, so the same invariants hold
//! as with the real database.

use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::RwLock;

use super::{BoardDirectory, CardRepository, CommentRepository, Repository};
use crate::cards::next_pin_order;
use crate::error::{AppError, Result};
use crate::models::{Board, Card, CardDraft, Comment, CommentDraft, PinChange};

#[derive(Default)]
struct Tables {
    boards: BTreeMap<i32, Board>,
    cards: BTreeMap<i32, Card>,
    comments: BTreeMap<i32, Comment>,
    last_board_id: i32,
    last_card_id: i32,
    last_comment_id: i32,
}

impl Tables {
    fn pin_order_for(&self, board_id: i32) -> i32 {
        let current_max = self
            .cards
            .values()
            .filter(|c| c.board_id == board_id && c.pinned)
            .filter_map(|c| c.pin_order)
            .max();
        next_pin_order(current_max)
    }
}

/// Repository backed by process memory. Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a storage outage: every call fails until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("memory store unavailable")));
        }
        Ok(())
    }

    /// Create a board (boards are managed outside the card API)
    pub async fn insert_board(&self, title: &str) -> Board {
        let mut tables = self.tables.write().await;
        tables.last_board_id += 1;
        let board = Board {
            id: tables.last_board_id,
            title: title.to_string(),
            created_at: Utc::now(),
        };
        tables.boards.insert(board.id, board.clone());
        board
    }

    /// Delete a board along with its cards and their comments.
    /// Returns false if the board did not exist.
    pub async fn delete_board(&self, board_id: i32) -> bool {
        let mut tables = self.tables.write().await;
        if tables.boards.remove(&board_id).is_none() {
            return false;
        }

        let card_ids: Vec<i32> = tables
            .cards
            .values()
            .filter(|c| c.board_id == board_id)
            .map(|c| c.id)
            .collect();
        tables.cards.retain(|_, c| c.board_id != board_id);
        tables.comments.retain(|_, c| !card_ids.contains(&c.card_id));
        true
    }

    /// Total comments across all cards
    pub async fn comment_count(&self) -> usize {
        self.tables.read().await.comments.len()
    }
}

#[async_trait]
impl BoardDirectory for MemoryDatabase {
    async fn board_exists(&self, board_id: i32) -> Result<bool> {
        self.check_available()?;
        Ok(self.tables.read().await.boards.contains_key(&board_id))
    }
}

#[async_trait]
impl CardRepository for MemoryDatabase {
    async fn list_cards(&self, board_id: i32) -> Result<Vec<Card>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .cards
            .values()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect())
    }

    async fn get_card(&self, card_id: i32) -> Result<Option<Card>> {
        self.check_available()?;
        Ok(self.tables.read().await.cards.get(&card_id).cloned())
    }

    async fn insert_card(&self, board_id: i32, draft: &CardDraft) -> Result<Option<Card>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !tables.boards.contains_key(&board_id) {
            return Ok(None);
        }

        let pin_order = match draft.pin {
            PinChange::Pin => Some(tables.pin_order_for(board_id)),
            PinChange::Unpin | PinChange::Keep => None,
        };

        tables.last_card_id += 1;
        let card = Card {
            id: tables.last_card_id,
            board_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            media_url: draft.media_url.clone().flatten(),
            upvote_count: draft.upvote_count.unwrap_or(0),
            author: draft.author.clone().flatten(),
            pinned: pin_order.is_some(),
            pin_order,
            created_at: Utc::now(),
        };
        tables.cards.insert(card.id, card.clone());
        Ok(Some(card))
    }

    async fn update_card(
        &self,
        board_id: i32,
        card_id: i32,
        draft: &CardDraft,
    ) -> Result<Option<Card>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !matches!(tables.cards.get(&card_id), Some(c) if c.board_id == board_id) {
            return Ok(None);
        }

        let pin_order = match draft.pin {
            PinChange::Pin => Some(Some(tables.pin_order_for(board_id))),
            PinChange::Unpin => Some(None),
            PinChange::Keep => None,
        };

        let Some(card) = tables.cards.get_mut(&card_id) else {
            return Ok(None);
        };
        card.title = draft.title.clone();
        card.description = draft.description.clone();
        if let Some(media_url) = &draft.media_url {
            card.media_url = media_url.clone();
        }
        if let Some(upvotes) = draft.upvote_count {
            card.upvote_count = upvotes;
        }
        if let Some(author) = &draft.author {
            card.author = author.clone();
        }
        if let Some(order) = pin_order {
            card.pinned = order.is_some();
            card.pin_order = order;
        }
        Ok(Some(card.clone()))
    }

    async fn delete_card(&self, board_id: i32, card_id: i32) -> Result<Option<Card>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !matches!(tables.cards.get(&card_id), Some(c) if c.board_id == board_id) {
            return Ok(None);
        }

        let card = tables.cards.remove(&card_id);
        tables.comments.retain(|_, c| c.card_id != card_id);
        Ok(card)
    }

    async fn upvote_card(&self, board_id: i32, card_id: i32) -> Result<Option<Card>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let Some(card) = tables
            .cards
            .get_mut(&card_id)
            .filter(|c| c.board_id == board_id)
        else {
            return Ok(None);
        };
        card.upvote_count = card
            .upvote_count
            .checked_add(1)
            .ok_or_else(AppError::upvote_limit)?;
        Ok(Some(card.clone()))
    }
}

#[async_trait]
impl CommentRepository for MemoryDatabase {
    async fn list_comments(&self, card_id: i32) -> Result<Vec<Comment>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .values()
            .filter(|c| c.card_id == card_id)
            .cloned()
            .collect())
    }

    async fn list_comments_for_cards(
        &self,
        card_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<Comment>>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut by_card: HashMap<i32, Vec<Comment>> = HashMap::new();
        for comment in tables.comments.values() {
            if card_ids.contains(&comment.card_id) {
                by_card.entry(comment.card_id).or_default().push(comment.clone());
            }
        }
        Ok(by_card)
    }

    async fn insert_comment(&self, card_id: i32, draft: &CommentDraft) -> Result<Comment> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !tables.cards.contains_key(&card_id) {
            return Err(AppError::NotFound(format!("Card {} not found", card_id)));
        }

        tables.last_comment_id += 1;
        let comment = Comment {
            id: tables.last_comment_id,
            card_id,
            body: draft.body.clone(),
            author: draft.author.clone(),
            created_at: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete_comment(&self, card_id: i32, comment_id: i32) -> Result<Option<Comment>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !matches!(tables.comments.get(&comment_id), Some(c) if c.card_id == card_id) {
            return Ok(None);
        }
        Ok(tables.comments.remove(&comment_id))
    }
}

#[async_trait]
impl Repository for MemoryDatabase {
    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}
