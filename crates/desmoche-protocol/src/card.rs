//! Card shapes as they travel on the wire.
//!
//! The server has used two card encodings over time:
//!
//! ```text
//! "7 of Hearts"                                         ← composite string
//! { "suit": "Hearts", "rank": "7", "value": 7,
//!   "color": "Red", "string": "7 of Hearts" }           ← structured object
//! ```
//!
//! [`WireCard`] accepts either one. Interpreting the contents (suit symbols,
//! colors) is the session layer's job; this module only carries the shape.

use serde::{Deserialize, Serialize};

/// Separator between rank and suit in the composite form.
pub const COMPOSITE_SEPARATOR: &str = " of ";

/// A card in either of the two wire encodings.
///
/// `#[serde(untagged)]` tries each variant in order: a JSON string becomes
/// `Composite`, a JSON object becomes `Structured`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireCard {
    /// `"<Rank> of <SuitName>"`.
    Composite(String),
    /// `{ suit, rank, value, color, string }`.
    Structured(StructuredCard),
}

/// The structured card object.
///
/// Only `suit` and `rank` are required; the rest are filled in by the server
/// when it knows them and by the client encoder when it sends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredCard {
    /// Suit name, e.g. `"Hearts"`.
    pub suit: String,
    /// Rank label, e.g. `"7"` or `"Queen"`.
    pub rank: String,
    /// Numeric value of the rank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    /// Color name, e.g. `"Red"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Canonical `"<rank> of <suit>"` label.
    #[serde(
        rename = "string",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
}

impl WireCard {
    /// Splits the card into `(rank, suit_name)`.
    ///
    /// Returns `None` for a composite string that has no `" of "` separator
    /// or an empty side.
    pub fn rank_and_suit(&self) -> Option<(&str, &str)> {
        match self {
            Self::Composite(text) => {
                let (rank, suit) = text.split_once(COMPOSITE_SEPARATOR)?;
                let (rank, suit) = (rank.trim(), suit.trim());
                if rank.is_empty() || suit.is_empty() {
                    return None;
                }
                Some((rank, suit))
            }
            Self::Structured(card) => Some((&card.rank, &card.suit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_deserializes_as_composite() {
        let card: WireCard = serde_json::from_str(r#""7 of Hearts""#).unwrap();
        assert_eq!(card, WireCard::Composite("7 of Hearts".into()));
        assert_eq!(card.rank_and_suit(), Some(("7", "Hearts")));
    }

    #[test]
    fn test_object_deserializes_as_structured() {
        let json = r#"{"suit":"Spades","rank":"Queen","value":12,
                       "color":"Black","string":"Queen of Spades"}"#;
        let card: WireCard = serde_json::from_str(json).unwrap();
        let WireCard::Structured(inner) = &card else {
            panic!("expected structured card, got {card:?}");
        };
        assert_eq!(inner.value, Some(12));
        assert_eq!(inner.label.as_deref(), Some("Queen of Spades"));
        assert_eq!(card.rank_and_suit(), Some(("Queen", "Spades")));
    }

    #[test]
    fn test_structured_minimal_object() {
        // Missing optional fields default to None.
        let card: WireCard =
            serde_json::from_str(r#"{"suit":"Clubs","rank":"2"}"#).unwrap();
        assert!(matches!(
            card,
            WireCard::Structured(StructuredCard { value: None, color: None, .. })
        ));
    }

    #[test]
    fn test_structured_serializes_label_as_string_field() {
        let card = WireCard::Structured(StructuredCard {
            suit: "Hearts".into(),
            rank: "10".into(),
            value: Some(10),
            color: Some("Red".into()),
            label: Some("10 of Hearts".into()),
        });
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["string"], "10 of Hearts");
        assert_eq!(json["value"], 10);
    }

    #[test]
    fn test_composite_without_separator_has_no_parts() {
        let card = WireCard::Composite("Joker".into());
        assert_eq!(card.rank_and_suit(), None);

        let card = WireCard::Composite(" of Hearts".into());
        assert_eq!(card.rank_and_suit(), None);
    }

    #[test]
    fn test_number_is_not_a_card() {
        let result: Result<WireCard, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }
}
