//! Inbound frames and the tagged event union.
//!
//! Decoding happens in two steps:
//!
//! ```text
//! bytes ──codec──→ Frame { event, message, data } ──Inbound::from──→ ServerEvent
//! ```
//!
//! The first step only fails on broken JSON or a missing tag, and such frames
//! are dropped by the caller. The second step never fails: a known tag whose
//! `data` has the wrong shape becomes [`ServerEvent::Malformed`], so the
//! message text still reaches the log while the state stays untouched.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ProtocolError, WireCard, WireSession};

/// Tags ending in this suffix are rejection notifications.
pub const REJECTION_SUFFIX: &str = "_exception";

/// One inbound JSON frame, before its payload is interpreted.
///
/// The tag is canonically `event`; frames from older servers use `action`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Frame {
    /// Event tag, e.g. `"player_joined"`.
    #[serde(alias = "action")]
    pub event: String,
    /// Human-readable text for the message log.
    #[serde(default)]
    pub message: Option<String>,
    /// Tag-dependent payload.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Every event tag the client knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PlayerJoined,
    PlayerReady,
    PlayerNotReady,
    GameStarted,
    CardExchangeComplete,
    NoAutomaticWin,
    CanCreateMeld,
    CardDiscarded,
    PlayerLeft,
    Error,
}

impl EventKind {
    /// Looks up a wire tag. Returns `None` for tags the client doesn't know.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "player_joined" => Self::PlayerJoined,
            "player_ready" => Self::PlayerReady,
            "player_not_ready" => Self::PlayerNotReady,
            "game_started" => Self::GameStarted,
            "card_exchange_complete" => Self::CardExchangeComplete,
            "no_automatic_win" => Self::NoAutomaticWin,
            "can_create_meld" => Self::CanCreateMeld,
            "card_discarded" => Self::CardDiscarded,
            "player_left" => Self::PlayerLeft,
            "error" => Self::Error,
            _ => return None,
        })
    }

    /// The wire tag for this kind.
    pub fn tag(self) -> &'static str {
        match self {
            Self::PlayerJoined => "player_joined",
            Self::PlayerReady => "player_ready",
            Self::PlayerNotReady => "player_not_ready",
            Self::GameStarted => "game_started",
            Self::CardExchangeComplete => "card_exchange_complete",
            Self::NoAutomaticWin => "no_automatic_win",
            Self::CanCreateMeld => "can_create_meld",
            Self::CardDiscarded => "card_discarded",
            Self::PlayerLeft => "player_left",
            Self::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `data` for events that carry a full session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionPayload {
    /// The snapshot.
    pub session: WireSession,
}

/// `data` for `player_ready` / `player_not_ready`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadyPayload {
    /// The player whose flag changed.
    pub player: ReadyPlayer,
}

/// The player record inside a [`ReadyPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadyPlayer {
    /// Omitted by some server builds for `player_not_ready`, in which case
    /// the event refers to the receiving client.
    #[serde(default)]
    pub name: Option<String>,
    /// New ready flag.
    pub is_ready: bool,
}

/// `data` for `no_automatic_win`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhasePayload {
    /// Only the phase is read from the snapshot.
    pub session: PhaseOnly,
}

/// A snapshot reduced to its phase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhaseOnly {
    /// The new phase.
    pub phase: String,
}

/// `data` for `can_create_meld`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DrawPayload {
    /// The card the local player just drew.
    pub card_drawn: WireCard,
}

/// `data` for `card_discarded`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DiscardPayload {
    /// `{ "session": { "discard_pile": [...] } }`
    Snapshot {
        /// Snapshot holding the pile.
        session: DiscardPile,
    },
    /// `{ "discard_pile": [...] }`
    Direct {
        /// The pile, most recent first.
        discard_pile: Vec<WireCard>,
    },
}

/// A snapshot reduced to its discard pile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscardPile {
    /// The pile, most recent first.
    pub discard_pile: Vec<WireCard>,
}

impl DiscardPayload {
    /// The pile, most recent first, whichever shape was received.
    pub fn pile(&self) -> &[WireCard] {
        match self {
            Self::Snapshot { session } => &session.discard_pile,
            Self::Direct { discard_pile } => discard_pile,
        }
    }
}

/// `data` for `player_left`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DeparturePayload {
    /// The remaining roster.
    Snapshot {
        /// Snapshot after the departure.
        session: WireSession,
    },
    /// Only the departing player's name.
    Named {
        /// Name of the player who left.
        player: String,
    },
}

// ---------------------------------------------------------------------------
// ServerEvent / Inbound
// ---------------------------------------------------------------------------

/// An inbound event with its payload decoded according to its tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    PlayerJoined(SessionPayload),
    PlayerReady(ReadyPayload),
    PlayerNotReady(ReadyPayload),
    GameStarted(SessionPayload),
    CardExchangeComplete(SessionPayload),
    NoAutomaticWin(PhasePayload),
    CanCreateMeld(DrawPayload),
    CardDiscarded(DiscardPayload),
    PlayerLeft(DeparturePayload),
    /// A server-side error report. Carries no payload.
    Error,
    /// The server refused one of our commands (`*_exception`).
    Rejected,
    /// A tag this client doesn't know.
    Unknown,
    /// A known tag whose payload could not be decoded.
    Malformed {
        /// Why the payload was rejected.
        reason: String,
    },
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    /// The raw wire tag.
    pub tag: String,
    /// Text for the message log, if any.
    pub message: Option<String>,
    /// The interpreted event.
    pub event: ServerEvent,
}

impl Inbound {
    /// Returns `true` if the tag is a rejection notification.
    pub fn is_rejection(&self) -> bool {
        matches!(self.event, ServerEvent::Rejected)
    }
}

impl From<Frame> for Inbound {
    fn from(frame: Frame) -> Self {
        let Frame { event: tag, message, data } = frame;

        // Rejections are recognised before ordinary dispatch, so a
        // `foo_exception` tag can never be mistaken for a known event.
        let event = if tag.ends_with(REJECTION_SUFFIX) {
            ServerEvent::Rejected
        } else {
            match EventKind::from_tag(&tag) {
                None => ServerEvent::Unknown,
                Some(kind) => match decode_event(kind, data) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(%tag, error = %e, "payload rejected");
                        ServerEvent::Malformed { reason: e.to_string() }
                    }
                },
            }
        };

        Self { tag, message, event }
    }
}

fn decode_event(
    kind: EventKind,
    data: Option<Value>,
) -> Result<ServerEvent, ProtocolError> {
    Ok(match kind {
        EventKind::PlayerJoined => ServerEvent::PlayerJoined(payload(kind, data)?),
        EventKind::PlayerReady => ServerEvent::PlayerReady(payload(kind, data)?),
        EventKind::PlayerNotReady => {
            ServerEvent::PlayerNotReady(payload(kind, data)?)
        }
        EventKind::GameStarted => ServerEvent::GameStarted(payload(kind, data)?),
        EventKind::CardExchangeComplete => {
            ServerEvent::CardExchangeComplete(payload(kind, data)?)
        }
        EventKind::NoAutomaticWin => {
            ServerEvent::NoAutomaticWin(payload(kind, data)?)
        }
        EventKind::CanCreateMeld => {
            ServerEvent::CanCreateMeld(payload(kind, data)?)
        }
        EventKind::CardDiscarded => {
            ServerEvent::CardDiscarded(payload(kind, data)?)
        }
        EventKind::PlayerLeft => ServerEvent::PlayerLeft(payload(kind, data)?),
        EventKind::Error => ServerEvent::Error,
    })
}

fn payload<T: DeserializeOwned>(
    kind: EventKind,
    data: Option<Value>,
) -> Result<T, ProtocolError> {
    let data = data.ok_or_else(|| ProtocolError::Payload {
        tag: kind.tag().to_string(),
        reason: "missing data".into(),
    })?;
    serde_json::from_value(data).map_err(|e| ProtocolError::Payload {
        tag: kind.tag().to_string(),
        reason: e.to_string(),
    })
}
