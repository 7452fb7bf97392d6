//! Session snapshots broadcast by the server.
//!
//! Most events carry a full copy of the server's session under
//! `data.session`. The client only reads the fields it projects; anything
//! else in the object (deck, melds, pick queue) is ignored by serde.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::WireCard;

/// The server's session object.
///
/// Only `players` is required: every event that carries a snapshot is a
/// roster update, and a snapshot without a roster is rejected as a whole
/// rather than half-applied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireSession {
    /// Session identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Name of the player hosting the session.
    #[serde(default)]
    pub host: Option<String>,
    /// Roster in server order. Accepts a name-keyed map or a list.
    #[serde(deserialize_with = "deserialize_roster")]
    pub players: Vec<WirePlayer>,
    /// Coarse lobby-vs-game stage.
    #[serde(default)]
    pub state: Option<String>,
    /// Lobby sub-state (`waiting`, `setup`, `playing`, ...).
    #[serde(default)]
    pub phase: Option<String>,
    /// The dealer for this round.
    #[serde(default)]
    pub dealer: Option<PlayerRef>,
    /// Whose turn it is.
    #[serde(default)]
    pub current_turn_player: Option<PlayerRef>,
    /// Turn order for this round.
    #[serde(default)]
    pub turn_order: Option<Vec<PlayerRef>>,
    /// Discard pile, most recent first.
    #[serde(default)]
    pub discard_pile: Option<Vec<WireCard>>,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WirePlayer {
    /// Player name. When the roster is a map, an empty name is filled in
    /// from the map key.
    #[serde(default)]
    pub name: String,
    /// The player's hand, if the server disclosed it.
    #[serde(default)]
    pub hand: Option<WireHand>,
    /// Lobby ready flag.
    #[serde(default)]
    pub is_ready: bool,
}

/// A disclosed hand.
///
/// The current server wraps the cards in an object with counters; older
/// builds sent the bare card list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireHand {
    /// `{ "cards": [...], "remaining_cards": n, "is_empty": bool }`
    Detailed {
        /// Cards in hand order.
        cards: Vec<WireCard>,
        /// Server-side card count.
        #[serde(default)]
        remaining_cards: Option<usize>,
    },
    /// `[...]`
    Bare(Vec<WireCard>),
}

impl WireHand {
    /// The cards in hand order, whichever shape was received.
    pub fn cards(&self) -> &[WireCard] {
        match self {
            Self::Detailed { cards, .. } | Self::Bare(cards) => cards,
        }
    }
}

/// A reference to a player: either a bare name or a full player record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerRef {
    /// `"Bob"`
    Name(String),
    /// `{ "name": "Bob", ... }`
    Record {
        /// The referenced player's name.
        name: String,
    },
}

impl PlayerRef {
    /// The referenced player's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Record { name } => name,
        }
    }
}

/// Reads `players` as either `{ "<name>": player, ... }` or `[player, ...]`,
/// keeping document order.
///
/// Map order is only preserved because the workspace enables `serde_json`'s
/// `preserve_order` feature; without it the roster would come back sorted.
fn deserialize_roster<'de, D>(deserializer: D) -> Result<Vec<WirePlayer>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RosterVisitor;

    impl<'de> Visitor<'de> for RosterVisitor {
        type Value = Vec<WirePlayer>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of players keyed by name, or a list of players")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut players = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, mut player)) =
                map.next_entry::<String, WirePlayer>()?
            {
                if player.name.is_empty() {
                    player.name = key;
                }
                players.push(player);
            }
            Ok(players)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut players = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(player) = seq.next_element::<WirePlayer>()? {
                if player.name.is_empty() {
                    return Err(de::Error::missing_field("name"));
                }
                players.push(player);
            }
            Ok(players)
        }
    }

    deserializer.deserialize_any(RosterVisitor)
}
