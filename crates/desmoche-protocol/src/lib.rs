//! Wire protocol for the Desmoche game server.
//!
//! This crate defines what travels over the socket:
//!
//! - **Inbound** ([`Frame`], [`Inbound`], [`ServerEvent`]): a tagged JSON
//!   object decoded first into a raw frame, then into a typed event.
//! - **Outbound** ([`Command`]): the actions a player can send.
//! - **Snapshots** ([`WireSession`], [`WirePlayer`], [`WireCard`]): the
//!   server's session object as it appears inside event payloads.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, bytes out.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (projected game state). It doesn't know about connections or players;
//! it only knows what the JSON looks like.
//!
//! ```text
//! Transport (bytes) → Protocol (Inbound) → Session (Table)
//! ```

mod card;
mod codec;
mod command;
mod error;
mod event;
mod snapshot;

pub use card::{COMPOSITE_SEPARATOR, StructuredCard, WireCard};
pub use codec::{Codec, JsonCodec};
pub use command::{Command, TagField};
pub use error::ProtocolError;
pub use event::{
    DeparturePayload, DiscardPayload, DiscardPile, DrawPayload, EventKind,
    Frame, Inbound, PhaseOnly, PhasePayload, REJECTION_SUFFIX, ReadyPayload,
    ReadyPlayer, ServerEvent, SessionPayload,
};
pub use snapshot::{PlayerRef, WireHand, WirePlayer, WireSession};
