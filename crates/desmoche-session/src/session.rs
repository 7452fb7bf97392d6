//! Session types: the client's copy of the shared game state.
//!
//! A [`Session`] is everything the server has told us about the game that
//! isn't private to the local player: the roster, the phase, the discard
//! pile, whose turn it is. It's only ever changed by
//! [`Table::apply`](crate::Table::apply).

use std::fmt;

use crate::Card;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The lobby sub-state reported by the server.
///
/// ```text
///   Waiting ──→ Lobby ──→ Setup ──→ Playing
///      ↑                               │
///      └────────(disconnect)───────────┘
/// ```
///
/// The server has used both `"play"` and `"playing"`; both map to
/// [`Phase::Playing`]. Anything unrecognised is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No session joined yet, or the connection dropped.
    #[default]
    Waiting,
    /// Players are gathering and toggling ready.
    Lobby,
    /// The card exchange round.
    Setup,
    /// Drawing, melding, discarding.
    Playing,
    Other(String),
}

impl Phase {
    /// Parses the wire `phase` string, case-insensitively.
    pub fn from_wire(phase: &str) -> Self {
        match phase.to_ascii_lowercase().as_str() {
            "waiting" => Self::Waiting,
            "lobby" => Self::Lobby,
            "setup" => Self::Setup,
            "play" | "playing" => Self::Playing,
            _ => Self::Other(phase.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Waiting => "waiting",
            Self::Lobby => "lobby",
            Self::Setup => "setup",
            Self::Playing => "playing",
            Self::Other(phase) => phase,
        }
    }

    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Unique within the roster.
    pub name: String,
    pub is_ready: bool,
    /// `None` means the server hasn't disclosed this player's hand;
    /// `Some(vec![])` means the hand is known to be empty.
    pub hand: Option<Vec<Card>>,
}

impl Player {
    /// A player with no ready flag and no disclosed hand.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_ready: false,
            hand: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The coarse stage string a fresh session starts in.
pub const LOBBY_STATE: &str = "lobby";

/// The shared game state as projected from the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Option<String>,
    /// Name of the hosting player.
    pub host: Option<String>,
    pub phase: Phase,
    /// Coarse lobby-vs-game stage, as sent by the server.
    pub state: String,
    /// Roster in server order.
    pub players: Vec<Player>,
    /// Most recent discard first.
    pub discard_pile: Vec<Card>,
    pub current_turn: Option<String>,
    pub dealer: Option<String>,
    pub turn_order: Vec<String>,
    /// The card the local player drew last, until the hand is next
    /// replaced by a snapshot.
    pub drawn_card: Option<Card>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: None,
            host: None,
            phase: Phase::Waiting,
            state: LOBBY_STATE.to_string(),
            players: Vec::new(),
            discard_pile: Vec::new(),
            current_turn: None,
            dealer: None,
            turn_order: Vec::new(),
            drawn_card: None,
        }
    }
}

impl Session {
    /// Looks up a player by name.
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub(crate) fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    /// Returns `true` if `name` is the session host.
    pub fn is_host(&self, name: &str) -> bool {
        self.host.as_deref() == Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_aliases() {
        assert_eq!(Phase::from_wire("play"), Phase::Playing);
        assert_eq!(Phase::from_wire("Playing"), Phase::Playing);
        assert_eq!(Phase::from_wire("SETUP"), Phase::Setup);
        assert_eq!(
            Phase::from_wire("scoring"),
            Phase::Other("scoring".into())
        );
        assert_eq!(Phase::from_wire("scoring").as_str(), "scoring");
    }

    #[test]
    fn test_default_session_is_lobby() {
        let session = Session::default();
        assert_eq!(session.phase, Phase::Waiting);
        assert_eq!(session.state, "lobby");
        assert!(session.players.is_empty());
    }
}
