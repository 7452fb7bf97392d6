//! The game client: one owner for the table, the UI intent, and the
//! connection.
//!
//! [`GameClient::step`] waits for the next connection event or timer and
//! folds it into state. Intent methods (`toggle_ready`, `exchange_card`, ...)
//! validate locally, then encode and send. After every change the client
//! publishes a fresh [`ClientSnapshot`] on a `watch` channel, so a renderer
//! never sees a half-applied event.

use desmoche_intent::{TimerFired, TimerSlot, UiIntent, UiIntentController};
use desmoche_protocol::{Codec, Frame, Inbound, JsonCodec};
use desmoche_session::{Card, LogEntry, LogKind, Session, Table};
use desmoche_transport::{Connector, WebSocketConnector};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    ClientConfig, ClientError, CommandEncoder, ConnectionEvent, ConnectionManager,
    ConnectionState, Intent,
};

/// Log line appended when the connection opens.
pub const CONNECTED_MESSAGE: &str = "Connected to game server";
/// Log line appended on every close, error or not.
pub const DISCONNECTED_MESSAGE: &str = "Disconnected from game server";
/// Log line appended before [`DISCONNECTED_MESSAGE`] when the close was an
/// error.
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error occurred";
/// Log line appended once reconnection gives up.
pub const GAVE_UP_MESSAGE: &str = "Unable to reach game server";
/// Log line appended when a command is dropped because there's no
/// connection.
pub const NOT_CONNECTED_MESSAGE: &str = "Not connected to game server";

/// How many of the newest log entries a [`ClientSnapshot`] carries.
pub const SNAPSHOT_LOG_TAIL: usize = 50;

/// Everything a front end renders, captured at one point in time.
///
/// The message log only grows, so a snapshot carries its length and the
/// newest [`SNAPSHOT_LOG_TAIL`] entries rather than all of it. A renderer
/// that needs the full history reads [`GameClient::table`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSnapshot {
    pub session: Session,
    pub hand: Vec<Card>,
    /// Total entries in the log, including those not in `recent_log`.
    pub log_len: usize,
    /// The newest log entries, oldest first.
    pub recent_log: Vec<LogEntry>,
    pub intent: UiIntent,
    pub connection: ConnectionState,
}

impl ClientSnapshot {
    fn capture(table: &Table, intent: &UiIntent, connection: ConnectionState) -> Self {
        let entries = table.log().entries();
        let tail = entries.len().saturating_sub(SNAPSHOT_LOG_TAIL);
        Self {
            session: table.session().clone(),
            hand: table.hand().to_vec(),
            log_len: entries.len(),
            recent_log: entries[tail..].to_vec(),
            intent: intent.clone(),
            connection,
        }
    }
}

/// What one [`GameClient::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The connection changed state.
    Connection(ConnectionState),
    /// An inbound event was applied to the table.
    Event(Inbound),
    /// An inbound frame couldn't be decoded and was dropped.
    Discarded,
    /// A UI timer fired.
    Timer(TimerSlot),
}

/// A Desmoche game client.
///
/// ```rust,no_run
/// use desmoche::prelude::*;
///
/// # async fn demo() -> Result<(), ClientError> {
/// let config = ClientConfig::builder("42", "Alice").build()?;
/// let mut client = GameClient::new(config);
/// client.connect()?;
/// loop {
///     client.step().await;
///     let snapshot = client.snapshot();
///     println!("{} players", snapshot.session.players.len());
/// }
/// # }
/// ```
pub struct GameClient<C: Connector = WebSocketConnector> {
    config: ClientConfig,
    table: Table,
    intent: UiIntentController,
    timers: mpsc::UnboundedReceiver<TimerFired>,
    connection: ConnectionManager<C>,
    encoder: CommandEncoder,
    codec: JsonCodec,
    snapshot_tx: watch::Sender<ClientSnapshot>,
}

impl GameClient<WebSocketConnector> {
    /// Creates a client that connects over WebSocket.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, WebSocketConnector)
    }
}

impl<C: Connector> GameClient<C> {
    /// Creates a client on a custom transport.
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        let table = Table::new(config.identity.clone());
        let (intent, timers) = UiIntentController::new(config.intent.clone());
        let connection = ConnectionManager::new(connector, config.reconnect.clone());
        let encoder = CommandEncoder::new(config.card_format, config.tag_field);
        let (snapshot_tx, _) = watch::channel(ClientSnapshot::capture(
            &table,
            intent.state(),
            connection.state(),
        ));
        Self {
            config,
            table,
            intent,
            timers,
            connection,
            encoder,
            codec: JsonCodec,
            snapshot_tx,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn intent(&self) -> &UiIntent {
        self.intent.state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// The current state, copied.
    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot::capture(&self.table, self.intent.state(), self.connection.state())
    }

    /// A receiver that sees a snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<ClientSnapshot> {
        self.snapshot_tx.subscribe()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Joins the configured session, replacing any current connection.
    ///
    /// Replacing an open connection closes the table first, exactly as if
    /// the server had closed it.
    ///
    /// # Errors
    /// [`ClientError::Config`] if the configured host no longer makes a
    /// valid endpoint.
    pub fn connect(&mut self) -> Result<(), ClientError> {
        let url = self.config.endpoint()?;
        info!(
            session = %self.config.session_id,
            player = %self.config.identity,
            %url,
            "joining session"
        );
        if self.connection.connect(url) {
            self.close_table(None);
        }
        self.publish();
        Ok(())
    }

    /// Leaves the session. The table is back in the lobby when this returns.
    pub fn disconnect(&mut self) {
        if self.connection.disconnect() {
            self.close_table(None);
        }
        self.publish();
    }

    /// Waits for the next connection event or timer and applies it.
    ///
    /// Cancel-safe, so it can sit in a `tokio::select!` next to other input.
    pub async fn step(&mut self) -> Step {
        let step = tokio::select! {
            event = self.connection.next_event() => self.on_connection_event(event),
            Some(fired) = self.timers.recv() => {
                self.intent.on_timer(fired);
                Step::Timer(fired.slot)
            }
        };
        self.publish();
        step
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) -> Step {
        match event {
            ConnectionEvent::Frame(bytes) => return self.on_frame(&bytes),
            ConnectionEvent::Opened => {
                self.table.push_message(LogKind::System, CONNECTED_MESSAGE);
            }
            ConnectionEvent::Closed { error } => self.close_table(error.as_deref()),
            ConnectionEvent::GaveUp => {
                self.table.push_message(LogKind::Error, GAVE_UP_MESSAGE);
            }
            ConnectionEvent::Connecting | ConnectionEvent::Reconnecting { .. } => {}
        }
        Step::Connection(self.connection.state())
    }

    /// Drops the table back to the lobby after a close, from whichever side.
    fn close_table(&mut self, error: Option<&str>) {
        if let Some(error) = error {
            debug!(%error, "connection closed with error");
            self.table.push_message(LogKind::System, CONNECTION_ERROR_MESSAGE);
        }
        self.table.reset_to_lobby();
        self.table.push_message(LogKind::System, DISCONNECTED_MESSAGE);
        self.intent.reconcile(&self.table);
    }

    fn on_frame(&mut self, bytes: &[u8]) -> Step {
        let frame: Frame = match self.codec.decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, len = bytes.len(), "discarding undecodable frame");
                return Step::Discarded;
            }
        };
        let inbound = Inbound::from(frame);
        debug!(tag = %inbound.tag, "applying server event");

        let table = std::mem::replace(&mut self.table, Table::new(String::new()));
        self.table = table.apply(&inbound);
        self.intent.reconcile(&self.table);
        Step::Event(inbound)
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Flips the local player's lobby ready flag.
    pub fn toggle_ready(&mut self) -> Result<(), ClientError> {
        self.submit(Intent::ToggleReady)
    }

    /// Asks the server to deal. The server decides whether we're host.
    pub fn start_game(&mut self) -> Result<(), ClientError> {
        self.submit(Intent::StartGame)
    }

    /// Exchanges the card at hand position `index` during setup.
    ///
    /// # Errors
    /// [`ClientError::Intent`] if the exchange is refused locally, in which
    /// case nothing is sent.
    pub fn exchange_card(&mut self, index: usize) -> Result<(), ClientError> {
        let result = self
            .intent
            .request_exchange(index, &self.table)
            .map_err(ClientError::from)
            .and_then(|card| self.send(Intent::ExchangeCard(card)));
        self.publish();
        result
    }

    /// Draws the top card of the deck.
    pub fn draw(&mut self) -> Result<(), ClientError> {
        self.submit(Intent::DrawFromDeck)
    }

    /// Selects or deselects the card at hand position `index`.
    pub fn toggle_selection(&mut self, index: usize) -> Result<(), ClientError> {
        let result = self
            .intent
            .toggle_selection(index, &self.table)
            .map_err(ClientError::from);
        self.publish();
        result
    }

    /// Sends the selected cards as a meld, in selection order.
    pub fn submit_meld(&mut self) -> Result<(), ClientError> {
        let result = self
            .intent
            .submit_meld(&self.table)
            .map_err(ClientError::from)
            .and_then(|cards| self.send(Intent::CreateMeld(cards)));
        self.publish();
        result
    }

    /// Discards the one selected card.
    pub fn discard(&mut self) -> Result<(), ClientError> {
        let result = self
            .intent
            .discard_selected(&self.table)
            .map_err(ClientError::from)
            .and_then(|card| self.send(Intent::DiscardCard(card)));
        self.publish();
        result
    }

    fn submit(&mut self, intent: Intent) -> Result<(), ClientError> {
        let result = self.send(intent);
        self.publish();
        result
    }

    fn send(&mut self, intent: Intent) -> Result<(), ClientError> {
        let bytes = self.encoder.encode(&intent)?;
        if let Err(e) = self.connection.send(bytes) {
            self.table.push_message(LogKind::Error, NOT_CONNECTED_MESSAGE);
            return Err(e);
        }
        debug!(?intent, "command sent");
        Ok(())
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desmoche_intent::IntentRejected;

    fn client() -> GameClient {
        let config = ClientConfig::builder("42", "Alice").build().unwrap();
        GameClient::new(config)
    }

    #[tokio::test]
    async fn test_new_client_is_idle_in_lobby() {
        let client = client();
        let snapshot = client.snapshot();
        assert_eq!(snapshot.connection, ConnectionState::Idle);
        assert!(snapshot.session.players.is_empty());
        assert_eq!(snapshot.log_len, 0);
        assert!(snapshot.recent_log.is_empty());
    }

    #[tokio::test]
    async fn test_send_while_idle_logs_warning() {
        let mut client = client();
        let err = client.toggle_ready().unwrap_err();
        assert!(matches!(
            err,
            ClientError::NotConnected(ConnectionState::Idle)
        ));
        let last = client.table().log().last().unwrap();
        assert_eq!(last.kind, LogKind::Error);
        assert_eq!(last.text, NOT_CONNECTED_MESSAGE);
    }

    #[tokio::test]
    async fn test_refused_intent_sends_nothing() {
        let mut client = client();
        let err = client.exchange_card(0).unwrap_err();
        assert!(matches!(err, ClientError::Intent(IntentRejected::NotInSetup)));
        // A refused intent never reaches the connection.
        assert!(client.table().log().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_published_snapshots() {
        let mut client = client();
        let mut rx = client.subscribe();
        let _ = client.toggle_ready();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().log_len, 1);
    }

    #[tokio::test]
    async fn test_snapshot_carries_only_the_log_tail() {
        let mut client = client();
        for _ in 0..SNAPSHOT_LOG_TAIL + 10 {
            let _ = client.toggle_ready();
        }
        let snapshot = client.snapshot();
        assert_eq!(snapshot.log_len, SNAPSHOT_LOG_TAIL + 10);
        assert_eq!(snapshot.recent_log.len(), SNAPSHOT_LOG_TAIL);
        assert_eq!(
            snapshot.recent_log.last().map(|e| e.text.as_str()),
            Some(NOT_CONNECTED_MESSAGE)
        );
        assert_eq!(client.table().log().len(), SNAPSHOT_LOG_TAIL + 10);
    }

    #[tokio::test]
    async fn test_disconnect_while_idle_leaves_log_alone() {
        let mut client = client();
        client.disconnect();
        assert_eq!(client.connection_state(), ConnectionState::Idle);
        assert!(client.table().log().is_empty());
    }
}
