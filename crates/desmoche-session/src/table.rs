//! The table: the client's aggregate of session, local hand, and log.
//!
//! [`Table::apply`] is the only way game state changes in response to the
//! server. It's a pure fold: the same table and the same event always
//! produce the same next table.
//!
//! # Fail-closed
//!
//! Each event handler first converts everything it needs from the wire
//! (which may fail) and only then mutates. If conversion fails the event is
//! dropped whole; only its message, if any, reaches the log.

use desmoche_protocol::{
    DeparturePayload, Inbound, ReadyPayload, ServerEvent, SessionPayload,
    WireSession,
};

use crate::card::project_cards;
use crate::projector::{local_hand, player_names, project_roster};
use crate::{Card, LogKind, MessageLog, Phase, ProjectionError, Session};

/// How the local hand last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandUpdate {
    /// Replaced wholesale from a snapshot, or cleared on disconnect.
    /// Indices into the old hand are meaningless now.
    Replaced,
    /// A card was appended at the end. Existing indices still hold.
    Appended,
}

/// Session, local hand, and message log for one connected identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    identity: String,
    session: Session,
    hand: Vec<Card>,
    /// Bumped on every hand change so observers can tell a new hand from
    /// an identical-looking old one.
    hand_revision: u64,
    last_hand_update: Option<HandUpdate>,
    log: MessageLog,
}

impl Table {
    /// An empty table in lobby defaults for `identity`.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            session: Session::default(),
            hand: Vec::new(),
            hand_revision: 0,
            last_hand_update: None,
            log: MessageLog::new(),
        }
    }

    /// The local player's name.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The local player's hand, in hand order.
    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn hand_revision(&self) -> u64 {
        self.hand_revision
    }

    pub fn last_hand_update(&self) -> Option<HandUpdate> {
        self.last_hand_update
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Appends a client-side line to the log (connection notices, local
    /// warnings).
    pub fn push_message(&mut self, kind: LogKind, text: impl Into<String>) {
        self.log.push(kind, text);
    }

    /// Drops all derived game state back to lobby defaults. The log is kept.
    pub fn reset_to_lobby(&mut self) {
        self.session = Session::default();
        self.hand.clear();
        self.bump_hand(HandUpdate::Replaced);
    }

    /// Folds one inbound event into the table.
    pub fn apply(mut self, inbound: &Inbound) -> Self {
        if let Some(text) = &inbound.message {
            self.log.push(log_kind(inbound), text.clone());
        }

        if let Err(e) = self.apply_event(&inbound.event) {
            tracing::warn!(tag = %inbound.tag, error = %e, "event dropped");
        }
        self
    }

    fn apply_event(&mut self, event: &ServerEvent) -> Result<(), ProjectionError> {
        match event {
            ServerEvent::PlayerJoined(SessionPayload { session }) => {
                self.session.players = project_roster(&session.players)?;
                self.adopt_header(session);
            }

            ServerEvent::PlayerReady(payload)
            | ServerEvent::PlayerNotReady(payload) => self.set_ready(payload),

            ServerEvent::GameStarted(SessionPayload { session }) => {
                self.session.players = project_roster(&session.players)?;
                self.adopt_header(session);
                if session.phase.is_none() {
                    self.session.phase = Phase::Playing;
                }
                if let Some(dealer) = &session.dealer {
                    self.session.dealer = Some(dealer.name().to_string());
                }
                if let Some(order) = &session.turn_order {
                    self.session.turn_order = player_names(order);
                }
                self.adopt_turn(session);
                self.refresh_local_hand();
            }

            ServerEvent::CardExchangeComplete(SessionPayload { session }) => {
                self.session.players = project_roster(&session.players)?;
                self.adopt_header(session);
                self.adopt_turn(session);
                self.refresh_local_hand();
            }

            ServerEvent::NoAutomaticWin(payload) => {
                self.session.phase = Phase::from_wire(&payload.session.phase);
            }

            ServerEvent::CanCreateMeld(payload) => {
                let card = Card::try_from(&payload.card_drawn)?;
                self.hand.push(card.clone());
                self.session.drawn_card = Some(card);
                self.bump_hand(HandUpdate::Appended);
            }

            ServerEvent::CardDiscarded(payload) => {
                self.session.discard_pile = project_cards(payload.pile())?;
            }

            ServerEvent::PlayerLeft(DeparturePayload::Snapshot { session }) => {
                self.session.players = project_roster(&session.players)?;
                self.adopt_header(session);
            }
            ServerEvent::PlayerLeft(DeparturePayload::Named { player }) => {
                self.session.players.retain(|p| &p.name != player);
            }

            // Message-only events.
            ServerEvent::Error
            | ServerEvent::Rejected
            | ServerEvent::Unknown
            | ServerEvent::Malformed { .. } => {}
        }
        Ok(())
    }

    /// Takes id, host, state, and phase from a snapshot where present.
    fn adopt_header(&mut self, snapshot: &WireSession) {
        if let Some(id) = &snapshot.id {
            self.session.id = Some(id.clone());
        }
        if let Some(host) = &snapshot.host {
            self.session.host = Some(host.clone());
        }
        if let Some(state) = &snapshot.state {
            self.session.state = state.clone();
        }
        if let Some(phase) = &snapshot.phase {
            self.session.phase = Phase::from_wire(phase);
        }
    }

    fn adopt_turn(&mut self, snapshot: &WireSession) {
        if let Some(current) = &snapshot.current_turn_player {
            self.session.current_turn = Some(current.name().to_string());
        }
    }

    fn set_ready(&mut self, payload: &ReadyPayload) {
        // Some server builds omit the name when the event is about us.
        let name = payload
            .player
            .name
            .as_deref()
            .unwrap_or(self.identity.as_str());
        match self.session.player_mut(name) {
            Some(player) => player.is_ready = payload.player.is_ready,
            None => tracing::debug!(%name, "ready flag for unknown player"),
        }
    }

    /// Replaces the local hand from the roster, or keeps it if the roster
    /// doesn't disclose it.
    fn refresh_local_hand(&mut self) {
        let Some(hand) =
            local_hand(&self.session.players, &self.identity).map(<[Card]>::to_vec)
        else {
            tracing::debug!(identity = %self.identity, "local hand not in snapshot, keeping previous");
            return;
        };
        self.hand = hand;
        self.session.drawn_card = None;
        self.bump_hand(HandUpdate::Replaced);
    }

    fn bump_hand(&mut self, update: HandUpdate) {
        self.hand_revision += 1;
        self.last_hand_update = Some(update);
    }
}

fn log_kind(inbound: &Inbound) -> LogKind {
    if inbound.is_rejection() {
        return LogKind::Error;
    }
    match inbound.event {
        ServerEvent::Error => LogKind::Error,
        ServerEvent::Unknown => LogKind::Game,
        _ => LogKind::System,
    }
}
