//! Turns player intents into outbound frame bytes.

use desmoche_protocol::{Codec, Command, JsonCodec, TagField};
use desmoche_session::{Card, CardFormat};

use crate::ClientError;

/// Something the local player asked the server to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    StartGame,
    ToggleReady,
    ExchangeCard(Card),
    DrawFromDeck,
    /// Cards in the order the player selected them.
    CreateMeld(Vec<Card>),
    DiscardCard(Card),
}

/// Encodes [`Intent`]s in the configured wire dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandEncoder {
    card_format: CardFormat,
    tag_field: TagField,
    codec: JsonCodec,
}

impl CommandEncoder {
    pub fn new(card_format: CardFormat, tag_field: TagField) -> Self {
        Self {
            card_format,
            tag_field,
            codec: JsonCodec,
        }
    }

    /// Maps an intent to its wire command, re-encoding card descriptors.
    pub fn command(&self, intent: &Intent) -> Command {
        let format = self.card_format;
        match intent {
            Intent::StartGame => Command::StartGame,
            Intent::ToggleReady => Command::ToggleReady,
            Intent::ExchangeCard(card) => Command::ExchangeCard {
                card: card.to_wire(format),
            },
            Intent::DrawFromDeck => Command::DrawFromDeck,
            Intent::CreateMeld(cards) => Command::CreateMeld {
                cards: cards.iter().map(|c| c.to_wire(format)).collect(),
            },
            Intent::DiscardCard(card) => Command::DiscardCard {
                card: card.to_wire(format),
            },
        }
    }

    /// Encodes an intent to frame bytes.
    ///
    /// # Errors
    /// Returns [`ClientError::Protocol`] if the frame can't be serialized.
    pub fn encode(&self, intent: &Intent) -> Result<Vec<u8>, ClientError> {
        let command = self.command(intent);
        let frame = command.to_frame(self.tag_field)?;
        let bytes = self.codec.encode(&frame)?;
        tracing::trace!(tag = command.tag(), len = bytes.len(), "command encoded");
        Ok(bytes)
    }
}
