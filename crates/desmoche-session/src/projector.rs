//! Projection from wire snapshots to display state.
//!
//! Everything here is pure and all-or-nothing: a snapshot with one
//! unreadable card yields an error, never a partially converted roster.

use desmoche_protocol::{PlayerRef, WirePlayer};

use crate::{Card, Player, ProjectionError, card::project_cards};

/// Converts a wire roster into display players, keeping server order.
///
/// Names must be unique. If the server sends a name twice, the first entry
/// wins and the duplicate is logged and dropped.
pub fn project_roster(
    players: &[WirePlayer],
) -> Result<Vec<Player>, ProjectionError> {
    let mut roster: Vec<Player> = Vec::with_capacity(players.len());
    for wire in players {
        if roster.iter().any(|p| p.name == wire.name) {
            tracing::warn!(name = %wire.name, "duplicate roster entry ignored");
            continue;
        }
        let hand = wire
            .hand
            .as_ref()
            .map(|hand| project_cards(hand.cards()))
            .transpose()?;
        roster.push(Player {
            name: wire.name.clone(),
            is_ready: wire.is_ready,
            hand,
        });
    }
    Ok(roster)
}

/// Finds `identity`'s disclosed hand in a roster.
///
/// Returns `None` when the player is absent or their hand wasn't
/// disclosed. Callers keep their previous projection in that case rather
/// than clearing it.
pub fn local_hand<'a>(roster: &'a [Player], identity: &str) -> Option<&'a [Card]> {
    roster
        .iter()
        .find(|p| p.name == identity)
        .and_then(|p| p.hand.as_deref())
}

/// Names from a list of player references, in order.
pub fn player_names(refs: &[PlayerRef]) -> Vec<String> {
    refs.iter().map(|r| r.name().to_string()).collect()
}
