use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::params::{CardPath, CommentPath};
use crate::{
    error::Result,
    models::{Comment, CommentRequest},
    AppState,
};

pub async fn list_comments(
    State(state): State<AppState>,
    path: CardPath,
) -> Result<Json<Vec<Comment>>> {
    let comments = state
        .comments
        .list_comments(path.board_id, path.card_id)
        .await?;
    Ok(Json(comments))
}

/// Add a comment to a card
///
/// JSON body: `body` (required), `author` (optional)
pub async fn create_comment(
    State(state): State<AppState>,
    path: CardPath,
    payload: std::result::Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Json<Comment>> {
    let Json(req) = payload?;
    let comment = state
        .comments
        .create_comment(path.board_id, path.card_id, req)
        .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    path: CommentPath,
) -> Result<Json<Comment>> {
    let comment = state
        .comments
        .delete_comment(path.board_id, path.card_id, path.comment_id)
        .await?;
    Ok(Json(comment))
}
