//! Connection lifecycle: connect, reconnect with backoff, send, receive.
//!
//! The [`ConnectionManager`] owns one background task per [`connect`]
//! call. The task owns the transport and multiplexes outbound commands,
//! inbound frames and shutdown with `tokio::select!`:
//!
//! ```text
//!              ┌──────── connection task (epoch N) ────────┐
//! send() ──mpsc──→ conn.send()            conn.recv() ──→ Frame ──┐
//!              │   shutdown (oneshot)     backoff sleep ──→ Reconnecting
//!              └───────────────────────────────────────────┘      │
//!                                                                 ▼
//!                                next_event() ← drops events from older epochs
//! ```
//!
//! Every event is tagged with the epoch of the task that produced it. A
//! new `connect` or a `disconnect` bumps the epoch, so a replaced task can
//! never move the state of its successor.
//!
//! [`connect`]: ConnectionManager::connect

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use desmoche_transport::{Connection, Connector, WebSocketConnector};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::{ClientError, ReconnectPolicy};

// ---------------------------------------------------------------------------
// State and events
// ---------------------------------------------------------------------------

/// Connection lifecycle state.
///
/// ```text
///   Idle ──connect──→ Connecting ──open──→ Connected
///                         ↑                    │ close / error
///                         │                    ▼
///               Reconnecting(n) ←─backoff── Closed
///                         │
///                         └──(n > max_attempts)──→ Disconnected
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    /// The connection dropped or was closed by the user.
    Closed,
    /// Waiting before retry number `attempt`.
    Reconnecting { attempt: u32 },
    /// Out of retries. Only a fresh `connect` leaves this state.
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Closed => f.write_str("closed"),
            Self::Reconnecting { attempt } => {
                write!(f, "reconnecting, attempt {attempt}")
            }
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// What the connection task reports to the client loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connect attempt started.
    Connecting,
    /// The transport is open.
    Opened,
    /// One inbound frame, undecoded.
    Frame(Vec<u8>),
    /// The transport closed or failed. Close and error are reported alike;
    /// `error` only carries the reason for logging.
    Closed { error: Option<String> },
    /// Retry number `attempt` will start after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// All retries failed.
    GaveUp,
}

type Tagged = (u64, ConnectionEvent);

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// Handle to the running connection task.
///
/// Dropping it drops the shutdown sender, which stops the task as well.
struct ConnectionTask {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    shutdown: oneshot::Sender<()>,
}

impl ConnectionTask {
    fn stop(self) {
        // The task may already have exited on its own.
        let _ = self.shutdown.send(());
    }
}

/// Owns the connection to the game server.
///
/// There's no global socket: the client constructs one manager and passes
/// it where it's needed. All methods are called from the client loop.
pub struct ConnectionManager<C: Connector = WebSocketConnector> {
    connector: Arc<C>,
    policy: Option<ReconnectPolicy>,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::UnboundedSender<Tagged>,
    events_rx: mpsc::UnboundedReceiver<Tagged>,
    epoch: u64,
    task: Option<ConnectionTask>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates an idle manager. `policy: None` disables reconnection.
    pub fn new(connector: C, policy: Option<ReconnectPolicy>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(connector),
            policy,
            state_tx,
            events_tx,
            events_rx,
            epoch: 0,
            task: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    /// A receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Number of `connect`/`disconnect` calls so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Opens a connection to `url`, closing any previous one first.
    ///
    /// Returns `true` if a connection that was open or opening got closed
    /// to make way. That close is not reported by
    /// [`next_event`](Self::next_event); the caller handles it.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn connect(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        let replaced = self.stop_task();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let emitter = Emitter {
            epoch: self.epoch,
            tx: self.events_tx.clone(),
        };
        debug!(epoch = self.epoch, %url, replaced, "starting connection task");
        tokio::spawn(run_connection(
            Arc::clone(&self.connector),
            url,
            self.policy.clone(),
            emitter,
            outbound_rx,
            shutdown_rx,
        ));

        self.task = Some(ConnectionTask {
            outbound: outbound_tx,
            shutdown: shutdown_tx,
        });
        self.set_state(ConnectionState::Connecting);
        replaced
    }

    /// Closes the connection. Never triggers a reconnect.
    ///
    /// The state is `Closed` when this returns. Returns `true` if a
    /// connection that was open or opening got closed; like for
    /// [`connect`](Self::connect), that close is the caller's to handle.
    pub fn disconnect(&mut self) -> bool {
        let had_task = self.task.is_some();
        let closed = self.stop_task();
        if had_task {
            info!(closed, "disconnected");
            self.set_state(ConnectionState::Closed);
        }
        closed
    }

    /// Stops the current task, if any, and moves to a new epoch so nothing
    /// it already queued gets through.
    fn stop_task(&mut self) -> bool {
        self.epoch += 1;
        let Some(task) = self.task.take() else {
            return false;
        };
        task.stop();
        matches!(
            self.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        )
    }

    /// Queues `bytes` for sending. Never blocks and never retries.
    ///
    /// # Errors
    /// Returns [`ClientError::NotConnected`] and drops the bytes if the
    /// connection isn't open.
    pub fn send(&self, bytes: Vec<u8>) -> Result<(), ClientError> {
        let state = self.state();
        match &self.task {
            Some(task) if state.is_connected() => {
                task.outbound.send(bytes).map_err(|_| {
                    ClientError::NotConnected(ConnectionState::Closed)
                })
            }
            _ => {
                warn!(%state, "not connected, command dropped");
                Err(ClientError::NotConnected(state))
            }
        }
    }

    /// Waits for the next event from the current connection task and
    /// applies its state transition.
    ///
    /// Cancel-safe. Pends forever while there's no connection.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        loop {
            let Some((epoch, event)) = self.events_rx.recv().await else {
                // Unreachable while `self` holds `events_tx`.
                return std::future::pending().await;
            };
            if epoch != self.epoch {
                trace!(epoch, current = self.epoch, "stale connection event ignored");
                continue;
            }
            self.transition(&event);
            return event;
        }
    }

    fn transition(&mut self, event: &ConnectionEvent) {
        let next = match event {
            ConnectionEvent::Connecting => ConnectionState::Connecting,
            ConnectionEvent::Opened => ConnectionState::Connected,
            ConnectionEvent::Frame(_) => return,
            ConnectionEvent::Closed { .. } => {
                if self.policy.is_none() {
                    self.task = None;
                }
                ConnectionState::Closed
            }
            ConnectionEvent::Reconnecting { attempt, .. } => {
                ConnectionState::Reconnecting { attempt: *attempt }
            }
            ConnectionEvent::GaveUp => {
                self.task = None;
                ConnectionState::Disconnected
            }
        };
        self.set_state(next);
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state_tx.send_replace(next.clone());
        if previous != next {
            debug!(from = %previous, to = %next, "connection state changed");
        }
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

struct Emitter {
    epoch: u64,
    tx: mpsc::UnboundedSender<Tagged>,
}

impl Emitter {
    /// Returns `false` once the manager is gone.
    fn emit(&self, event: ConnectionEvent) -> bool {
        self.tx.send((self.epoch, event)).is_ok()
    }
}

enum Exit {
    Shutdown,
    Closed(Option<String>),
}

async fn run_connection<C: Connector>(
    connector: Arc<C>,
    url: String,
    policy: Option<ReconnectPolicy>,
    emitter: Emitter,
    mut outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut attempt = 0u32;
    loop {
        let connected = tokio::select! {
            _ = &mut shutdown_rx => return,
            result = connector.connect(&url) => result,
        };

        let error = match connected {
            Ok(conn) => {
                info!(id = %conn.id(), %url, "connected to game server");
                attempt = 0;
                if !emitter.emit(ConnectionEvent::Opened) {
                    return;
                }
                match pump(&conn, &emitter, &mut outbound_rx, &mut shutdown_rx).await {
                    Exit::Shutdown => {
                        if let Err(e) = conn.close().await {
                            debug!(error = %e, "close failed");
                        }
                        return;
                    }
                    Exit::Closed(error) => error,
                }
            }
            Err(e) => {
                warn!(%url, error = %e, "connect failed");
                Some(e.to_string())
            }
        };

        // Commands meant for the dead connection are dropped, not replayed.
        let mut dropped = 0usize;
        while outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "discarded unsent commands");
        }

        if !emitter.emit(ConnectionEvent::Closed { error }) {
            return;
        }
        let Some(policy) = &policy else {
            return;
        };

        attempt += 1;
        if attempt > policy.max_attempts {
            warn!(attempts = policy.max_attempts, "reconnect attempts exhausted");
            emitter.emit(ConnectionEvent::GaveUp);
            return;
        }
        let delay = policy.delay_for(attempt);
        info!(attempt, max = policy.max_attempts, ?delay, "reconnecting");
        if !emitter.emit(ConnectionEvent::Reconnecting { attempt, delay }) {
            return;
        }
        tokio::select! {
            _ = &mut shutdown_rx => return,
            _ = tokio::time::sleep(delay) => {}
        }
        if !emitter.emit(ConnectionEvent::Connecting) {
            return;
        }
    }
}

async fn pump<T: Connection>(
    conn: &T,
    emitter: &Emitter,
    outbound_rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> Exit {
    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => return Exit::Shutdown,

            Some(bytes) = outbound_rx.recv() => {
                if let Err(e) = conn.send(&bytes).await {
                    warn!(id = %conn.id(), error = %e, "send failed");
                    return Exit::Closed(Some(e.to_string()));
                }
                trace!(id = %conn.id(), len = bytes.len(), "frame sent");
            }

            incoming = conn.recv() => match incoming {
                Ok(Some(data)) => {
                    if !emitter.emit(ConnectionEvent::Frame(data)) {
                        return Exit::Shutdown;
                    }
                }
                Ok(None) => {
                    info!(id = %conn.id(), "server closed the connection");
                    return Exit::Closed(None);
                }
                Err(e) => {
                    warn!(id = %conn.id(), error = %e, "receive failed");
                    return Exit::Closed(Some(e.to_string()));
                }
            },
        }
    }
}
