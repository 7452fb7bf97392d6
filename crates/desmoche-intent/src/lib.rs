//! Local UI intent state for Desmoche.
//!
//! Everything here is client-only and never sent over the wire: which
//! cards are selected, whether this round's exchange has been used, which
//! hand slot is animating out, and the transient toast and warning.
//!
//! # Timers
//!
//! Toasts, warnings and the exit-animation floor expire on their own. Each
//! one is a spawned task that sleeps and then reports back over a channel:
//!
//! ```text
//! arm(slot) ──spawn──→ sleep(lifetime) ──→ TimerFired { slot, generation }
//!     │                                              │
//!     └─ cancels the previous task, bumps generation └─→ on_timer(): stale? ignore
//! ```
//!
//! A superseded timer can still be in flight when it's cancelled, so every
//! firing carries the generation it was armed with and the controller
//! ignores any that don't match.
//!
//! # Integration
//!
//! The controller sits inside the client's `tokio::select!` loop next to the
//! connection:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(event) = conn_rx.recv() => {
//!             table = table.apply(&inbound);
//!             intent.reconcile(&table);
//!         }
//!         Some(fired) = timer_rx.recv() => { intent.on_timer(fired); }
//!     }
//! }
//! ```

use std::time::Duration;

use desmoche_session::{Card, HandUpdate, Phase, Table};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Fewest cards a meld may contain.
pub const MIN_MELD_SIZE: usize = 3;

/// Toast shown when play begins.
pub const PLAY_STARTED_TOAST: &str = "Let the game begin!";

/// Warning shown for a second exchange in one round.
pub const ALREADY_EXCHANGED_WARNING: &str =
    "You've already exchanged a card this round";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Lifetimes for the controller's timers.
#[derive(Debug, Clone)]
pub struct IntentConfig {
    /// How long a toast stays up. Default: 2 seconds.
    pub toast_lifetime: Duration,
    /// How long a local warning stays up. Default: 3 seconds.
    pub warning_lifetime: Duration,
    /// Minimum time an exchanged card stays marked as leaving, even if the
    /// server's new hand arrives sooner. `None` clears the mark as soon as
    /// the hand is replaced. Default: 400 ms.
    pub exit_animation_floor: Option<Duration>,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            toast_lifetime: Duration::from_secs(2),
            warning_lifetime: Duration::from_secs(3),
            exit_animation_floor: Some(Duration::from_millis(400)),
        }
    }
}

impl IntentConfig {
    /// Fix values that would make timers meaningless.
    ///
    /// Called automatically by [`UiIntentController::new`]. Rules:
    /// - A zero toast or warning lifetime falls back to the default.
    /// - A zero exit-animation floor is treated as no floor.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.toast_lifetime.is_zero() {
            warn!("toast_lifetime is zero, using default");
            self.toast_lifetime = defaults.toast_lifetime;
        }
        if self.warning_lifetime.is_zero() {
            warn!("warning_lifetime is zero, using default");
            self.warning_lifetime = defaults.warning_lifetime;
        }
        if self.exit_animation_floor.is_some_and(|d| d.is_zero()) {
            self.exit_animation_floor = None;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The UI intent state a front end renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiIntent {
    /// This setup round's exchange has been used.
    pub has_exchanged: bool,
    /// Hand slot currently animating out after an exchange.
    pub removed_card_index: Option<usize>,
    /// Selected hand positions, in the order they were picked. Unique and
    /// always valid for the current hand.
    pub selected_indices: Vec<usize>,
    pub toast: Option<String>,
    pub warning: Option<String>,
}

/// Why a local intent was refused. Refused intents send nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentRejected {
    #[error("cards can only be exchanged during setup")]
    NotInSetup,

    #[error("cards can only be selected during play")]
    NotPlaying,

    #[error("a card has already been exchanged this round")]
    AlreadyExchanged,

    #[error("no card at hand position {0}")]
    InvalidIndex(usize),

    /// A meld needs at least [`MIN_MELD_SIZE`] cards.
    #[error("a meld needs at least {MIN_MELD_SIZE} cards, {0} selected")]
    TooFewCards(usize),

    /// Discarding needs exactly one selected card.
    #[error("select exactly one card to discard, {0} selected")]
    NotOneCard(usize),
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Toast,
    Warning,
    ExitAnimation,
}

/// Sent by a timer task when its lifetime elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub slot: TimerSlot,
    /// The generation the timer was armed with.
    pub generation: u64,
}

/// One cancellable timer.
#[derive(Debug, Default)]
struct Timer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    /// Cancels any running timer and starts a new one.
    fn arm(
        &mut self,
        slot: TimerSlot,
        after: Duration,
        fired_tx: &mpsc::UnboundedSender<TimerFired>,
    ) {
        self.cancel();
        let generation = self.generation;
        let tx = fired_tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // The receiver is gone only when the client is shutting down.
            let _ = tx.send(TimerFired { slot, generation });
        }));
        trace!(?slot, generation, ?after, "timer armed");
    }

    /// Aborts the running task, if any. A firing already in the channel is
    /// made stale by the generation bump.
    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Consumes a firing. Returns `false` if it was stale.
    fn take_fired(&mut self, generation: u64) -> bool {
        if self.handle.is_some() && generation == self.generation {
            self.handle = None;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns [`UiIntent`] and its timers.
///
/// One controller per client. It reads the [`Table`] but never writes it;
/// the table only changes in response to the server.
pub struct UiIntentController {
    config: IntentConfig,
    state: UiIntent,
    fired_tx: mpsc::UnboundedSender<TimerFired>,
    toast_timer: Timer,
    warning_timer: Timer,
    exit_timer: Timer,
    /// The hand was replaced while the exit-animation floor was still
    /// running; clear `removed_card_index` when it fires.
    removal_settled: bool,
    /// Last phase and hand revision seen by `reconcile`.
    phase: Phase,
    hand_revision: u64,
}

impl UiIntentController {
    /// Creates a controller and the receiver its timers report to.
    ///
    /// Timers are spawned on the current Tokio runtime, so the controller
    /// must be driven from inside one.
    pub fn new(
        config: IntentConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let config = config.validated();
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        debug!(?config, "intent controller created");
        let controller = Self {
            config,
            state: UiIntent::default(),
            fired_tx,
            toast_timer: Timer::default(),
            warning_timer: Timer::default(),
            exit_timer: Timer::default(),
            removal_settled: false,
            phase: Phase::default(),
            hand_revision: 0,
        };
        (controller, fired_rx)
    }

    pub fn state(&self) -> &UiIntent {
        &self.state
    }

    pub fn config(&self) -> &IntentConfig {
        &self.config
    }

    /// Brings intent state in line with a table that may have changed.
    ///
    /// Call after every `Table::apply` and after a disconnect reset. Phase
    /// changes are handled before hand changes.
    pub fn reconcile(&mut self, table: &Table) {
        let phase = &table.session().phase;
        if *phase != self.phase {
            let previous = std::mem::replace(&mut self.phase, phase.clone());
            debug!(from = %previous, to = %phase, "phase changed");

            if previous.is_setup() && !phase.is_setup() {
                self.state.has_exchanged = false;
                self.settle_removal();
            }
            if previous.is_playing() && !phase.is_playing() {
                self.state.selected_indices.clear();
            }
            if phase.is_playing() && !previous.is_playing() {
                self.show_toast(PLAY_STARTED_TOAST);
            }
        }

        if table.hand_revision() != self.hand_revision {
            self.hand_revision = table.hand_revision();
            match table.last_hand_update() {
                Some(HandUpdate::Appended) => {
                    let len = table.hand().len();
                    self.state.selected_indices.retain(|&i| i < len);
                }
                Some(HandUpdate::Replaced) | None => {
                    self.state.selected_indices.clear();
                    self.settle_removal();
                }
            }
        }
    }

    /// Validates an exchange of the card at `index`.
    ///
    /// On success the card is returned for sending, the round's exchange
    /// is marked used, and the slot is marked as leaving. A second attempt
    /// in the same round shows a warning and is refused.
    pub fn request_exchange(
        &mut self,
        index: usize,
        table: &Table,
    ) -> Result<Card, IntentRejected> {
        if !table.session().phase.is_setup() {
            return Err(IntentRejected::NotInSetup);
        }
        if self.state.has_exchanged {
            self.show_warning(ALREADY_EXCHANGED_WARNING);
            return Err(IntentRejected::AlreadyExchanged);
        }
        let card = table
            .hand()
            .get(index)
            .cloned()
            .ok_or(IntentRejected::InvalidIndex(index))?;

        self.state.has_exchanged = true;
        self.state.removed_card_index = Some(index);
        self.removal_settled = false;
        match self.config.exit_animation_floor {
            Some(floor) => {
                self.exit_timer
                    .arm(TimerSlot::ExitAnimation, floor, &self.fired_tx)
            }
            None => self.exit_timer.cancel(),
        }
        debug!(index, card = %card, "exchange accepted locally");
        Ok(card)
    }

    /// Selects `index`, or deselects it if already selected.
    pub fn toggle_selection(
        &mut self,
        index: usize,
        table: &Table,
    ) -> Result<(), IntentRejected> {
        if !table.session().phase.is_playing() {
            return Err(IntentRejected::NotPlaying);
        }
        if index >= table.hand().len() {
            return Err(IntentRejected::InvalidIndex(index));
        }
        let selected = &mut self.state.selected_indices;
        match selected.iter().position(|&i| i == index) {
            Some(pos) => {
                selected.remove(pos);
            }
            None => selected.push(index),
        }
        Ok(())
    }

    /// Takes the selection as a meld candidate, in selection order.
    ///
    /// The selection is cleared immediately. If the server later rejects
    /// the meld the selection stays cleared.
    pub fn submit_meld(&mut self, table: &Table) -> Result<Vec<Card>, IntentRejected> {
        let count = self.state.selected_indices.len();
        if count < MIN_MELD_SIZE {
            return Err(IntentRejected::TooFewCards(count));
        }
        let cards = self.selected_cards(table)?;
        self.state.selected_indices.clear();
        Ok(cards)
    }

    /// Takes the single selected card for discarding, clearing the
    /// selection.
    pub fn discard_selected(&mut self, table: &Table) -> Result<Card, IntentRejected> {
        let count = self.state.selected_indices.len();
        if count != 1 {
            return Err(IntentRejected::NotOneCard(count));
        }
        let mut cards = self.selected_cards(table)?;
        self.state.selected_indices.clear();
        cards.pop().ok_or(IntentRejected::NotOneCard(0))
    }

    /// Shows a toast, replacing any visible one and restarting its timer.
    pub fn show_toast(&mut self, text: impl Into<String>) {
        self.state.toast = Some(text.into());
        self.toast_timer.arm(
            TimerSlot::Toast,
            self.config.toast_lifetime,
            &self.fired_tx,
        );
    }

    /// Shows a local warning, replacing any visible one and restarting its
    /// timer.
    pub fn show_warning(&mut self, text: impl Into<String>) {
        self.state.warning = Some(text.into());
        self.warning_timer.arm(
            TimerSlot::Warning,
            self.config.warning_lifetime,
            &self.fired_tx,
        );
    }

    /// Handles a timer firing. Returns `true` if the state changed.
    pub fn on_timer(&mut self, fired: TimerFired) -> bool {
        let timer = match fired.slot {
            TimerSlot::Toast => &mut self.toast_timer,
            TimerSlot::Warning => &mut self.warning_timer,
            TimerSlot::ExitAnimation => &mut self.exit_timer,
        };
        if !timer.take_fired(fired.generation) {
            trace!(?fired, "stale timer ignored");
            return false;
        }

        match fired.slot {
            TimerSlot::Toast => self.state.toast.take().is_some(),
            TimerSlot::Warning => self.state.warning.take().is_some(),
            TimerSlot::ExitAnimation => {
                if self.removal_settled {
                    self.removal_settled = false;
                    self.state.removed_card_index.take().is_some()
                } else {
                    false
                }
            }
        }
    }

    fn selected_cards(&self, table: &Table) -> Result<Vec<Card>, IntentRejected> {
        self.state
            .selected_indices
            .iter()
            .map(|&i| {
                table
                    .hand()
                    .get(i)
                    .cloned()
                    .ok_or(IntentRejected::InvalidIndex(i))
            })
            .collect()
    }

    /// The hand the leaving card belonged to is gone. Clear the mark now,
    /// or when the animation floor elapses if it's still running.
    fn settle_removal(&mut self) {
        if self.state.removed_card_index.is_none() {
            return;
        }
        if self.exit_timer.is_armed() {
            self.removal_settled = true;
        } else {
            self.state.removed_card_index = None;
        }
    }
}

impl Drop for UiIntentController {
    fn drop(&mut self) {
        self.toast_timer.cancel();
        self.warning_timer.cancel();
        self.exit_timer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_replaces_zero_lifetimes() {
        let config = IntentConfig {
            toast_lifetime: Duration::ZERO,
            warning_lifetime: Duration::ZERO,
            exit_animation_floor: Some(Duration::ZERO),
        }
        .validated();
        assert_eq!(config.toast_lifetime, Duration::from_secs(2));
        assert_eq!(config.warning_lifetime, Duration::from_secs(3));
        assert_eq!(config.exit_animation_floor, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_makes_in_flight_firing_stale() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = Timer::default();
        timer.arm(TimerSlot::Toast, Duration::from_millis(10), &tx);
        let first = timer.generation;

        tokio::time::sleep(Duration::from_millis(20)).await;
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.generation, first);

        // Re-armed before the old firing was handled.
        timer.arm(TimerSlot::Toast, Duration::from_millis(10), &tx);
        assert!(!timer.take_fired(fired.generation));
        assert!(timer.is_armed());
    }
}
