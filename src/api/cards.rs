use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::params::{BoardPath, CardPath};
use crate::{
    error::Result,
    models::{Card, CardRequest, CardWithComments},
    AppState,
};

/// List a board's cards: pinned first (most recently pinned on top), each with comments
pub async fn list_cards(
    State(state): State<AppState>,
    path: BoardPath,
) -> Result<Json<Vec<CardWithComments>>> {
    let cards = state.cards.list_cards(path.board_id).await?;
    Ok(Json(cards))
}

/// Get a card that belongs to the board
pub async fn get_card(State(state): State<AppState>, path: CardPath) -> Result<Json<Card>> {
    let card = state.cards.get_card(path.board_id, path.card_id).await?;
    Ok(Json(card))
}

/// Create a card on a board
///
/// JSON body: `title`, `description` (required), `mediaURL`, `upvoteCount`,
/// `author`, `pinned` (optional)
pub async fn create_card(
    State(state): State<AppState>,
    path: BoardPath,
    payload: std::result::Result<Json<CardRequest>, JsonRejection>,
) -> Result<Json<Card>> {
    let Json(req) = payload?;
    let card = state.cards.create_card(path.board_id, req).await?;
    Ok(Json(card))
}

/// Replace a card's fields; `pinned: true` moves it to the top of the pinned group
pub async fn update_card(
    State(state): State<AppState>,
    path: CardPath,
    payload: std::result::Result<Json<CardRequest>, JsonRejection>,
) -> Result<Json<Card>> {
    let Json(req) = payload?;
    let card = state
        .cards
        .update_card(path.board_id, path.card_id, req)
        .await?;
    Ok(Json(card))
}

/// Delete a card, returning the deleted record
pub async fn delete_card(State(state): State<AppState>, path: CardPath) -> Result<Json<Card>> {
    let card = state.cards.delete_card(path.board_id, path.card_id).await?;
    Ok(Json(card))
}

pub async fn upvote_card(State(state): State<AppState>, path: CardPath) -> Result<Json<Card>> {
    let card = state.cards.upvote_card(path.board_id, path.card_id).await?;
    Ok(Json(card))
}
