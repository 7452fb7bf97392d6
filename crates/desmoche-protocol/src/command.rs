//! Outbound commands.
//!
//! Commands are plain JSON objects whose tag names the action and whose
//! other fields are the arguments:
//!
//! ```text
//! { "event": "exchange_card", "card": "7 of Hearts" }
//! { "event": "create_meld", "cards": ["7 of Hearts", "8 of Hearts", "9 of Hearts"] }
//! ```
//!
//! Card arguments are always named `card` (one) or `cards` (several).

use serde::Serialize;
use serde_json::Value;

use crate::{ProtocolError, WireCard};

/// A command for the game server.
///
/// `#[serde(tag = "event")]` writes the variant name into the `event` key
/// next to the variant's fields, and `rename_all = "snake_case"` turns
/// `ExchangeCard` into `"exchange_card"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Command {
    /// Host asks the server to deal.
    StartGame,
    /// Flip the local player's lobby ready flag.
    ToggleReady,
    /// Swap one card during the setup round.
    ExchangeCard {
        /// The card given up.
        card: WireCard,
    },
    /// Draw the top card of the deck.
    DrawFromDeck,
    /// Propose a meld.
    CreateMeld {
        /// The cards, in the order the player picked them.
        cards: Vec<WireCard>,
    },
    /// Discard one card to end the turn.
    DiscardCard {
        /// The card discarded.
        card: WireCard,
    },
}

impl Command {
    /// The wire tag this command is sent under.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::StartGame => "start_game",
            Self::ToggleReady => "toggle_ready",
            Self::ExchangeCard { .. } => "exchange_card",
            Self::DrawFromDeck => "draw_from_deck",
            Self::CreateMeld { .. } => "create_meld",
            Self::DiscardCard { .. } => "discard_card",
        }
    }

    /// Builds the JSON frame for this command with the tag under `field`.
    pub fn to_frame(&self, field: TagField) -> Result<Value, ProtocolError> {
        let mut frame =
            serde_json::to_value(self).map_err(ProtocolError::Encode)?;
        if field == TagField::Action {
            let Value::Object(map) = &mut frame else {
                return Err(ProtocolError::InvalidMessage(format!(
                    "command `{}` did not serialize to an object",
                    self.tag()
                )));
            };
            if let Some(tag) = map.shift_remove(TagField::Event.key()) {
                map.insert(TagField::Action.key().to_string(), tag);
            }
        }
        Ok(frame)
    }
}

/// Which key carries the tag in outbound frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagField {
    /// `{ "event": ... }`, used by the current server.
    #[default]
    Event,
    /// `{ "action": ... }`, used by older builds.
    Action,
}

impl TagField {
    /// The JSON key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Action => "action",
        }
    }
}
