//! Client-side game state for Desmoche.
//!
//! This crate turns the server's event stream into something a front end
//! can draw:
//!
//! 1. **Cards** ([`Card`], [`Suit`], [`Color`]): the display model and its
//!    mapping to and from both wire card forms
//! 2. **Projection** ([`projector`]): wire rosters into display players,
//!    and the local player's hand out of a roster
//! 3. **Reduction** ([`Table::apply`]): one event in, next table out
//!
//! # How it fits in the stack
//!
//! ```text
//! Client loop (above)  ← owns one Table, feeds it every inbound event
//!     ↕
//! Session layer (this crate)  ← pure state, no I/O, no timers
//!     ↕
//! Protocol layer (below)  ← provides Inbound, WireSession, WireCard
//! ```

mod card;
mod error;
mod log;
pub mod projector;
mod session;
mod table;

pub use card::{Card, CardFormat, Color, Suit, project_cards};
pub use error::ProjectionError;
pub use log::{LogEntry, LogKind, MessageLog};
pub use session::{LOBBY_STATE, Phase, Player, Session};
pub use table::{HandUpdate, Table};
