use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use super::Comment;
use crate::error::{AppError, Result};

/// A card posted onto a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i32,
    /// Owning board, fixed at creation
    pub board_id: i32,
    pub title: String,
    pub description: String,
    /// GIF or image shown on the card
    #[serde(rename = "mediaURL")]
    pub media_url: Option<String>,
    pub upvote_count: i32,
    pub author: Option<String>,
    pub pinned: bool,
    /// Rank among pinned cards of the board; set iff `pinned`
    pub pin_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Card as rendered in a board listing
#[derive(Debug, Clone, Serialize)]
pub struct CardWithComments {
    #[serde(flatten)]
    pub card: Card,
    pub comments: Vec<Comment>,
}

/// Body of a create or update card request.
///
/// Everything is optional at the wire level so that missing required
/// fields surface as a validation error rather than a JSON rejection.
/// The older client field names are accepted as aliases. For `mediaURL`
/// and `author` the outer `Option` records whether the field was sent at
/// all; an explicit `null` is `Some(None)` and clears the stored value.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    #[serde(alias = "cardTitle")]
    pub title: Option<String>,
    #[serde(alias = "cardDescription")]
    pub description: Option<String>,
    #[serde(
        rename = "mediaURL",
        alias = "gifURL",
        default,
        deserialize_with = "deserialize_present"
    )]
    pub media_url: Option<Option<String>>,
    #[serde(alias = "cardUpvotes")]
    pub upvote_count: Option<i32>,
    #[serde(alias = "cardAuthor", default, deserialize_with = "deserialize_present")]
    pub author: Option<Option<String>>,
    pub pinned: Option<bool>,
}

/// Mark a field as present even when its value is `null`
fn deserialize_present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// What a write does to a card's pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinChange {
    /// Move the card to the most recently pinned position
    Pin,
    /// Clear the pin and its order
    Unpin,
    /// Leave pin state and order as stored
    Keep,
}

impl From<Option<bool>> for PinChange {
    fn from(pinned: Option<bool>) -> Self {
        match pinned {
            Some(true) => PinChange::Pin,
            Some(false) => PinChange::Unpin,
            None => PinChange::Keep,
        }
    }
}

/// Validated card fields, ready to hand to a repository.
///
/// `None` leaves a stored value alone on update; `Some(None)` clears it.
#[derive(Debug, Clone)]
pub struct CardDraft {
    pub title: String,
    pub description: String,
    pub media_url: Option<Option<String>>,
    pub upvote_count: Option<i32>,
    pub author: Option<Option<String>>,
    pub pin: PinChange,
}

impl CardRequest {
    /// Check required fields. Title and description must be present and non-empty.
    pub fn validate(self) -> Result<CardDraft> {
        let title = self.title.filter(|t| !t.is_empty());
        let description = self.description.filter(|d| !d.is_empty());

        let (title, description) = match (title, description) {
            (Some(t), Some(d)) => (t, d),
            _ => {
                return Err(AppError::Validation(
                    "title and description are required".to_string(),
                ))
            }
        };

        if matches!(self.upvote_count, Some(n) if n < 0) {
            return Err(AppError::Validation(
                "upvoteCount cannot be negative".to_string(),
            ));
        }

        Ok(CardDraft {
            title,
            description,
            media_url: self.media_url,
            upvote_count: self.upvote_count,
            author: self.author,
            pin: self.pinned.into(),
        })
    }
}

impl Card {
    /// `pinned` and `pin_order` agree with each other
    pub fn pin_state_consistent(&self) -> bool {
        self.pinned == self.pin_order.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_title_and_description() {
        let req = CardRequest {
            title: Some(String::new()),
            description: Some("thanks for the review".into()),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let req = CardRequest {
            title: Some("Great demo".into()),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_maps_pinned_flag() {
        let base = CardRequest {
            title: Some("Great demo".into()),
            description: Some("Loved it".into()),
            ..Default::default()
        };

        let draft = base.clone().validate().unwrap();
        assert_eq!(draft.pin, PinChange::Keep);

        let draft = CardRequest { pinned: Some(true), ..base.clone() }.validate().unwrap();
        assert_eq!(draft.pin, PinChange::Pin);

        let draft = CardRequest { pinned: Some(false), ..base }.validate().unwrap();
        assert_eq!(draft.pin, PinChange::Unpin);
    }

    #[test]
    fn test_request_accepts_legacy_field_names() {
        let req: CardRequest = serde_json::from_str(
            r#"{"cardTitle":"Hi","cardDescription":"There","gifURL":"https://g/1.gif","cardUpvotes":2,"cardAuthor":"sam","pinned":true}"#,
        )
        .unwrap();
        assert_eq!(req.title.as_deref(), Some("Hi"));
        assert_eq!(req.description.as_deref(), Some("There"));
        assert_eq!(req.media_url, Some(Some("https://g/1.gif".to_string())));
        assert_eq!(req.upvote_count, Some(2));
        assert_eq!(req.author, Some(Some("sam".to_string())));
        assert_eq!(req.pinned, Some(true));
    }

    #[test]
    fn test_request_distinguishes_null_from_missing() {
        let req: CardRequest =
            serde_json::from_str(r#"{"title":"t","description":"d","mediaURL":null}"#).unwrap();
        assert_eq!(req.media_url, Some(None));
        assert_eq!(req.author, None);

        let req: CardRequest =
            serde_json::from_str(r#"{"title":"t","description":"d","cardAuthor":null}"#).unwrap();
        assert_eq!(req.author, Some(None));
        assert_eq!(req.media_url, None);
    }

    #[test]
    fn test_card_serializes_camel_case() {
        let card = Card {
            id: 1,
            board_id: 9,
            title: "t".into(),
            description: "d".into(),
            media_url: None,
            upvote_count: 0,
            author: None,
            pinned: false,
            pin_order: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["boardId"], 9);
        assert!(value["pinOrder"].is_null());
        assert!(value.get("mediaURL").is_some());
        assert_eq!(value["upvoteCount"], 0);
    }
}
