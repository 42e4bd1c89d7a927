mod cards;
mod comments;
pub mod params;

use axum::{routing::{delete, get, post}, Router};

use crate::AppState;

/// Build the card and comment routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/boards/{board_id}/cards",
            get(cards::list_cards).post(cards::create_card),
        )
        .route(
            "/boards/{board_id}/cards/{card_id}",
            get(cards::get_card)
                .put(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/boards/{board_id}/cards/{card_id}/upvote", post(cards::upvote_card))
        // Comments are mounted under their card
        .route(
            "/boards/{board_id}/cards/{card_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/boards/{board_id}/cards/{card_id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
}
