//! Path parameter extractors.
//!
//! Identifiers in the URL must be plain positive decimal integers. Anything
//! else (`12abc`, `-3`, `+7`, overflow) is rejected with a validation error
//! instead of being coerced.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use std::collections::HashMap;

use crate::error::AppError;

/// Parse a single path identifier
pub fn parse_id(raw: &str, name: &str) -> Result<i32, AppError> {
    let invalid = || AppError::Validation(format!("{} must be a positive integer", name));

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(invalid()),
    }
}

async fn path_params<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<HashMap<String, String>, AppError> {
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?;
    Ok(params)
}

fn id_param(params: &HashMap<String, String>, key: &str, name: &str) -> Result<i32, AppError> {
    let raw = params
        .get(key)
        .ok_or_else(|| AppError::Validation(format!("{} is required", name)))?;
    parse_id(raw, name)
}

/// `/boards/{board_id}/...`
#[derive(Debug, Clone, Copy)]
pub struct BoardPath {
    pub board_id: i32,
}

/// `/boards/{board_id}/cards/{card_id}/...`
#[derive(Debug, Clone, Copy)]
pub struct CardPath {
    pub board_id: i32,
    pub card_id: i32,
}

/// `/boards/{board_id}/cards/{card_id}/comments/{comment_id}`
#[derive(Debug, Clone, Copy)]
pub struct CommentPath {
    pub board_id: i32,
    pub card_id: i32,
    pub comment_id: i32,
}

impl<S> FromRequestParts<S> for BoardPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = path_params(parts, state).await?;
        Ok(BoardPath {
            board_id: id_param(&params, "board_id", "boardId")?,
        })
    }
}

impl<S> FromRequestParts<S> for CardPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = path_params(parts, state).await?;
        Ok(CardPath {
            board_id: id_param(&params, "board_id", "boardId")?,
            card_id: id_param(&params, "card_id", "cardId")?,
        })
    }
}

impl<S> FromRequestParts<S> for CommentPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = path_params(parts, state).await?;
        Ok(CommentPath {
            board_id: id_param(&params, "board_id", "boardId")?,
            card_id: id_param(&params, "card_id", "cardId")?,
            comment_id: id_param(&params, "comment_id", "commentId")?,
        })
    }
}
