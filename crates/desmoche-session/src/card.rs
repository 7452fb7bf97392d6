//! The display card model and its mapping to and from the wire.
//!
//! ```text
//! "7 of Hearts"                      ─┐
//!                                     ├─→ Card { suit: Hearts, rank: "7", value: Some(7), color: Red }
//! { "suit": "Hearts", "rank": "7" }  ─┘          │
//!                                                └─ Display: "7♥"   identity: "7 of Hearts"
//! ```
//!
//! Suit names the client doesn't recognise are carried through as
//! [`Suit::Other`] rather than rejected, so a server that grows a fifth suit
//! doesn't break the client.

use std::fmt;

use desmoche_protocol::{COMPOSITE_SEPARATOR, StructuredCard, WireCard};

use crate::ProjectionError;

// ---------------------------------------------------------------------------
// Suit
// ---------------------------------------------------------------------------

/// A card suit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
    /// A suit name the client doesn't know, kept verbatim.
    Other(String),
}

impl Suit {
    /// Parses a wire suit name. Matching is case-insensitive; anything else
    /// becomes [`Suit::Other`].
    pub fn from_name(name: &str) -> Self {
        const KNOWN: [(&str, Suit); 4] = [
            ("Hearts", Suit::Hearts),
            ("Diamonds", Suit::Diamonds),
            ("Clubs", Suit::Clubs),
            ("Spades", Suit::Spades),
        ];
        KNOWN
            .into_iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, suit)| suit)
            .unwrap_or_else(|| Suit::Other(name.to_string()))
    }

    /// Parses a display symbol (`♥`, `♦`, `♣`, `♠`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "♥" => Some(Self::Hearts),
            "♦" => Some(Self::Diamonds),
            "♣" => Some(Self::Clubs),
            "♠" => Some(Self::Spades),
            _ => None,
        }
    }

    /// The canonical wire name, e.g. `"Hearts"`.
    pub fn name(&self) -> &str {
        match self {
            Self::Hearts => "Hearts",
            Self::Diamonds => "Diamonds",
            Self::Clubs => "Clubs",
            Self::Spades => "Spades",
            Self::Other(name) => name,
        }
    }

    /// The display symbol. Unknown suits display as their name.
    pub fn symbol(&self) -> &str {
        match self {
            Self::Hearts => "♥",
            Self::Diamonds => "♦",
            Self::Clubs => "♣",
            Self::Spades => "♠",
            Self::Other(name) => name,
        }
    }

    /// The color a suit is printed in when the wire doesn't say.
    pub fn default_color(&self) -> Color {
        match self {
            Self::Hearts | Self::Diamonds => Color::Red,
            _ => Color::Black,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Card color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    /// Parses a wire color name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("red") {
            Some(Self::Red)
        } else if name.eq_ignore_ascii_case("black") {
            Some(Self::Black)
        } else {
            None
        }
    }

    /// The wire name, `"Red"` or `"Black"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Black => "Black",
        }
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// Which wire form outbound card descriptors are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardFormat {
    /// `"7 of Hearts"`
    #[default]
    Composite,
    /// `{ "suit": "Hearts", "rank": "7", "value": 7, "color": "Red", "string": "7 of Hearts" }`
    Structured,
}

/// A card as the client displays it.
///
/// Two cards with the same rank and suit compare equal, but hands may
/// contain duplicates (multi-deck play), so selection always goes by hand
/// index, never by card value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Card {
    pub suit: Suit,
    /// Rank label as the server sent it, e.g. `"7"` or `"Queen"`.
    pub rank: String,
    /// Numeric rank, when the server sent one or it can be derived.
    pub value: Option<u32>,
    pub color: Color,
}

impl Card {
    /// Builds a card with color and value derived from suit and rank.
    pub fn new(rank: impl Into<String>, suit: Suit) -> Self {
        let rank = rank.into();
        Self {
            color: suit.default_color(),
            value: rank_value(&rank),
            rank,
            suit,
        }
    }

    /// The canonical identity string, `"<rank> of <suit name>"`.
    pub fn identity(&self) -> String {
        format!("{}{COMPOSITE_SEPARATOR}{}", self.rank, self.suit.name())
    }

    /// Re-encodes the card in the requested wire form.
    ///
    /// This is the inverse of `Card::try_from(&WireCard)`: the suit goes
    /// back to its wire name and a missing value is derived from the rank.
    pub fn to_wire(&self, format: CardFormat) -> WireCard {
        match format {
            CardFormat::Composite => WireCard::Composite(self.identity()),
            CardFormat::Structured => WireCard::Structured(StructuredCard {
                suit: self.suit.name().to_string(),
                rank: self.rank.clone(),
                value: self.value.or_else(|| rank_value(&self.rank)),
                color: Some(self.color.name().to_string()),
                label: Some(self.identity()),
            }),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit.symbol())
    }
}

impl TryFrom<&WireCard> for Card {
    type Error = ProjectionError;

    fn try_from(wire: &WireCard) -> Result<Self, Self::Error> {
        match wire {
            WireCard::Composite(text) => {
                let (rank, suit) = wire
                    .rank_and_suit()
                    .ok_or_else(|| ProjectionError::UnparsableCard(text.clone()))?;
                Ok(Card::new(rank, Suit::from_name(suit)))
            }
            WireCard::Structured(card) => {
                let (rank, suit) = (card.rank.trim(), card.suit.trim());
                if rank.is_empty() || suit.is_empty() {
                    return Err(ProjectionError::EmptyCardField);
                }
                let suit = Suit::from_name(suit);
                // A color the wire states wins over the suit's default.
                let color = card
                    .color
                    .as_deref()
                    .and_then(Color::from_name)
                    .unwrap_or_else(|| suit.default_color());
                Ok(Card {
                    value: card.value.or_else(|| rank_value(rank)),
                    rank: rank.to_string(),
                    color,
                    suit,
                })
            }
        }
    }
}

/// Converts a list of wire cards, preserving order. Fails on the first card
/// that can't be read.
pub fn project_cards(cards: &[WireCard]) -> Result<Vec<Card>, ProjectionError> {
    cards.iter().map(Card::try_from).collect()
}

/// Numeric value for a rank label: Ace is 1, face cards 11 to 13.
fn rank_value(rank: &str) -> Option<u32> {
    let named = [("Ace", 1), ("Jack", 11), ("Queen", 12), ("King", 13)];
    for (name, value) in named {
        if rank.eq_ignore_ascii_case(name) || rank.eq_ignore_ascii_case(&name[..1]) {
            return Some(value);
        }
    }
    rank.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composite(s: &str) -> WireCard {
        WireCard::Composite(s.into())
    }

    #[test]
    fn test_composite_card_projects_with_symbol_and_color() {
        let card = Card::try_from(&composite("7 of Hearts")).unwrap();
        assert_eq!(card.suit, Suit::Hearts);
        assert_eq!(card.color, Color::Red);
        assert_eq!(card.value, Some(7));
        assert_eq!(card.to_string(), "7♥");
        assert_eq!(card.identity(), "7 of Hearts");
    }

    #[test]
    fn test_black_suits() {
        for name in ["Clubs", "Spades"] {
            let card = Card::try_from(&composite(&format!("King of {name}"))).unwrap();
            assert_eq!(card.color, Color::Black);
            assert_eq!(card.value, Some(13));
        }
    }

    #[test]
    fn test_unknown_suit_passes_through() {
        let card = Card::try_from(&composite("3 of Stars")).unwrap();
        assert_eq!(card.suit, Suit::Other("Stars".into()));
        assert_eq!(card.suit.symbol(), "Stars");
        assert_eq!(card.identity(), "3 of Stars");
    }

    #[test]
    fn test_wire_color_wins_over_suit() {
        let wire = WireCard::Structured(StructuredCard {
            suit: "Spades".into(),
            rank: "2".into(),
            value: None,
            color: Some("red".into()),
            label: None,
        });
        let card = Card::try_from(&wire).unwrap();
        assert_eq!(card.color, Color::Red);
        assert_eq!(card.value, Some(2));
    }

    #[test]
    fn test_unparsable_composite_is_an_error() {
        assert_eq!(
            Card::try_from(&composite("Joker")),
            Err(ProjectionError::UnparsableCard("Joker".into()))
        );
    }

    #[test]
    fn test_to_wire_inverts_projection() {
        let original = composite("Queen of Diamonds");
        let card = Card::try_from(&original).unwrap();
        assert_eq!(card.to_wire(CardFormat::Composite), original);

        let WireCard::Structured(s) = card.to_wire(CardFormat::Structured) else {
            panic!("expected structured card");
        };
        assert_eq!(s.suit, "Diamonds");
        assert_eq!(s.rank, "Queen");
        assert_eq!(s.value, Some(12));
        assert_eq!(s.color.as_deref(), Some("Red"));
        assert_eq!(s.label.as_deref(), Some("Queen of Diamonds"));
    }

    #[test]
    fn test_suit_symbols_round_trip() {
        for suit in [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades] {
            assert_eq!(Suit::from_symbol(suit.symbol()), Some(suit.clone()));
            assert_eq!(Suit::from_name(suit.name()), suit);
        }
    }

    #[test]
    fn test_project_cards_keeps_order_and_fails_closed() {
        let cards = [composite("2 of Clubs"), composite("Ace of Spades")];
        let projected = project_cards(&cards).unwrap();
        assert_eq!(projected[0].rank, "2");
        assert_eq!(projected[1].value, Some(1));

        let bad = [composite("2 of Clubs"), composite("nonsense")];
        assert!(project_cards(&bad).is_err());
    }
}
