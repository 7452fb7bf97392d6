//! Integration tests for the UI intent controller.
//!
//! Timer tests run with paused time: `tokio::time::sleep` in the test body
//! auto-advances the clock, and timer tasks due before the test's deadline
//! run and report first.

use std::time::Duration;

use desmoche_intent::{
    ALREADY_EXCHANGED_WARNING, IntentConfig, IntentRejected, PLAY_STARTED_TOAST,
    TimerFired, UiIntentController,
};
use desmoche_protocol::{Frame, Inbound};
use desmoche_session::Table;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;

// =========================================================================
// Helpers
// =========================================================================

fn inbound(value: Value) -> Inbound {
    let frame: Frame = serde_json::from_value(value).unwrap();
    Inbound::from(frame)
}

/// A snapshot event putting Alice's `hand` on the table in `phase`.
fn snapshot(tag: &str, phase: &str, hand: &[&str]) -> Inbound {
    inbound(json!({
        "event": tag,
        "data": { "session": {
            "phase": phase,
            "players": [
                { "name": "Alice", "is_ready": true, "hand": hand },
                { "name": "Bob", "is_ready": true }
            ]
        } }
    }))
}

fn setup_table() -> Table {
    Table::new("Alice").apply(&snapshot(
        "game_started",
        "setup",
        &["7 of Hearts", "8 of Hearts", "9 of Hearts", "2 of Clubs"],
    ))
}

fn playing_table() -> Table {
    Table::new("Alice").apply(&snapshot(
        "game_started",
        "playing",
        &["7 of Hearts", "8 of Hearts", "9 of Hearts", "2 of Clubs"],
    ))
}

fn controller() -> (UiIntentController, UnboundedReceiver<TimerFired>) {
    UiIntentController::new(IntentConfig {
        toast_lifetime: Duration::from_secs(2),
        warning_lifetime: Duration::from_secs(3),
        exit_animation_floor: Some(Duration::from_millis(400)),
    })
}

/// Lets `after` pass, then feeds every timer firing to the controller.
async fn settle(
    ctrl: &mut UiIntentController,
    rx: &mut UnboundedReceiver<TimerFired>,
    after: Duration,
) {
    tokio::time::sleep(after).await;
    while let Ok(fired) = rx.try_recv() {
        ctrl.on_timer(fired);
    }
}

// =========================================================================
// Exchange guard
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_second_exchange_in_round_is_refused_with_warning() {
    let (mut ctrl, mut rx) = controller();
    let table = setup_table();
    ctrl.reconcile(&table);

    let card = ctrl.request_exchange(0, &table).unwrap();
    assert_eq!(card.identity(), "7 of Hearts");
    assert!(ctrl.state().has_exchanged);
    assert_eq!(ctrl.state().removed_card_index, Some(0));

    assert_eq!(
        ctrl.request_exchange(1, &table),
        Err(IntentRejected::AlreadyExchanged)
    );
    assert_eq!(ctrl.state().warning.as_deref(), Some(ALREADY_EXCHANGED_WARNING));

    settle(&mut ctrl, &mut rx, Duration::from_millis(2_900)).await;
    assert!(ctrl.state().warning.is_some(), "warning lives for 3s");

    settle(&mut ctrl, &mut rx, Duration::from_millis(200)).await;
    assert!(ctrl.state().warning.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_exchange_guard_resets_only_when_leaving_setup() {
    let (mut ctrl, _rx) = controller();
    let table = setup_table();
    ctrl.reconcile(&table);
    ctrl.request_exchange(3, &table).unwrap();

    // A new hand inside setup doesn't reopen the exchange.
    let table = table.apply(&snapshot(
        "card_exchange_complete",
        "setup",
        &["7 of Hearts", "8 of Hearts", "9 of Hearts", "5 of Spades"],
    ));
    ctrl.reconcile(&table);
    assert!(ctrl.state().has_exchanged);
    assert_eq!(
        ctrl.request_exchange(0, &table),
        Err(IntentRejected::AlreadyExchanged)
    );

    let table = table.apply(&inbound(json!({
        "event": "no_automatic_win",
        "data": { "session": { "phase": "playing" } }
    })));
    ctrl.reconcile(&table);
    assert!(!ctrl.state().has_exchanged);
}

#[tokio::test(start_paused = true)]
async fn test_exchange_outside_setup_or_out_of_range() {
    let (mut ctrl, _rx) = controller();
    let playing = playing_table();
    assert_eq!(
        ctrl.request_exchange(0, &playing),
        Err(IntentRejected::NotInSetup)
    );

    let setup = setup_table();
    assert_eq!(
        ctrl.request_exchange(9, &setup),
        Err(IntentRejected::InvalidIndex(9))
    );
    assert!(!ctrl.state().has_exchanged, "a refused exchange uses nothing");
}

// =========================================================================
// Exit animation floor
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_fast_hand_reply_waits_for_animation_floor() {
    let (mut ctrl, mut rx) = controller();
    let table = setup_table();
    ctrl.reconcile(&table);
    ctrl.request_exchange(2, &table).unwrap();

    settle(&mut ctrl, &mut rx, Duration::from_millis(100)).await;
    let table = table.apply(&snapshot(
        "card_exchange_complete",
        "setup",
        &["7 of Hearts", "8 of Hearts", "Jack of Clubs", "2 of Clubs"],
    ));
    ctrl.reconcile(&table);
    assert_eq!(ctrl.state().removed_card_index, Some(2));

    settle(&mut ctrl, &mut rx, Duration::from_millis(400)).await;
    assert_eq!(ctrl.state().removed_card_index, None);
}

#[tokio::test(start_paused = true)]
async fn test_slow_hand_reply_clears_removal_on_arrival() {
    let (mut ctrl, mut rx) = controller();
    let table = setup_table();
    ctrl.reconcile(&table);
    ctrl.request_exchange(2, &table).unwrap();

    settle(&mut ctrl, &mut rx, Duration::from_secs(1)).await;
    assert_eq!(ctrl.state().removed_card_index, Some(2), "data-driven, not timed");

    let table = table.apply(&snapshot(
        "card_exchange_complete",
        "setup",
        &["7 of Hearts", "8 of Hearts", "Jack of Clubs", "2 of Clubs"],
    ));
    ctrl.reconcile(&table);
    assert_eq!(ctrl.state().removed_card_index, None);
}

// =========================================================================
// Selection and melds
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_toggle_is_self_inverse() {
    let (mut ctrl, _rx) = controller();
    let table = playing_table();
    ctrl.reconcile(&table);

    ctrl.toggle_selection(2, &table).unwrap();
    ctrl.toggle_selection(0, &table).unwrap();
    let before = ctrl.state().selected_indices.clone();

    ctrl.toggle_selection(3, &table).unwrap();
    ctrl.toggle_selection(3, &table).unwrap();
    assert_eq!(ctrl.state().selected_indices, before);

    // Removing from the middle keeps the order of the rest.
    ctrl.toggle_selection(1, &table).unwrap();
    ctrl.toggle_selection(0, &table).unwrap();
    assert_eq!(ctrl.state().selected_indices, [2, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_outside_play_or_hand_is_refused() {
    let (mut ctrl, _rx) = controller();
    let setup = setup_table();
    assert_eq!(ctrl.toggle_selection(0, &setup), Err(IntentRejected::NotPlaying));

    let playing = playing_table();
    assert_eq!(
        ctrl.toggle_selection(4, &playing),
        Err(IntentRejected::InvalidIndex(4))
    );
}

#[tokio::test(start_paused = true)]
async fn test_meld_needs_three_and_clears_optimistically() {
    let (mut ctrl, _rx) = controller();
    let table = playing_table();
    ctrl.reconcile(&table);

    ctrl.toggle_selection(2, &table).unwrap();
    ctrl.toggle_selection(0, &table).unwrap();
    assert_eq!(ctrl.submit_meld(&table), Err(IntentRejected::TooFewCards(2)));
    assert_eq!(ctrl.state().selected_indices.len(), 2);

    ctrl.toggle_selection(1, &table).unwrap();
    let meld: Vec<String> = ctrl
        .submit_meld(&table)
        .unwrap()
        .iter()
        .map(|c| c.identity())
        .collect();
    assert_eq!(meld, ["9 of Hearts", "7 of Hearts", "8 of Hearts"]);
    assert!(ctrl.state().selected_indices.is_empty());

    // The server refusing the meld doesn't bring the selection back.
    let table = table.apply(&inbound(json!({
        "event": "create_meld_exception",
        "message": "Not a valid meld"
    })));
    ctrl.reconcile(&table);
    assert!(ctrl.state().selected_indices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_discard_needs_exactly_one_card() {
    let (mut ctrl, _rx) = controller();
    let table = playing_table();
    ctrl.reconcile(&table);

    assert_eq!(ctrl.discard_selected(&table), Err(IntentRejected::NotOneCard(0)));
    ctrl.toggle_selection(3, &table).unwrap();
    assert_eq!(ctrl.discard_selected(&table).unwrap().identity(), "2 of Clubs");
    assert!(ctrl.state().selected_indices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hand_replacement_clears_selection_but_append_keeps_it() {
    let (mut ctrl, _rx) = controller();
    let table = playing_table();
    ctrl.reconcile(&table);
    ctrl.toggle_selection(1, &table).unwrap();

    let table = table.apply(&inbound(json!({
        "event": "can_create_meld",
        "data": { "card_drawn": "4 of Diamonds" }
    })));
    ctrl.reconcile(&table);
    assert_eq!(ctrl.state().selected_indices, [1]);

    let table = table.apply(&snapshot("card_exchange_complete", "playing", &["3 of Clubs"]));
    ctrl.reconcile(&table);
    assert!(ctrl.state().selected_indices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_reset_clears_selection() {
    let (mut ctrl, _rx) = controller();
    let mut table = playing_table();
    ctrl.reconcile(&table);
    ctrl.toggle_selection(0, &table).unwrap();

    table.reset_to_lobby();
    ctrl.reconcile(&table);
    assert!(ctrl.state().selected_indices.is_empty());
}

// =========================================================================
// Toasts
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_entering_play_shows_toast_that_expires() {
    let (mut ctrl, mut rx) = controller();
    let table = playing_table();
    ctrl.reconcile(&table);
    assert_eq!(ctrl.state().toast.as_deref(), Some(PLAY_STARTED_TOAST));

    settle(&mut ctrl, &mut rx, Duration::from_millis(2_100)).await;
    assert!(ctrl.state().toast.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stale_toast_timer_cannot_clear_newer_toast() {
    let (mut ctrl, mut rx) = controller();
    ctrl.show_toast("first");

    // The first timer fires, but the loop hasn't handled it yet.
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    let stale = rx.try_recv().unwrap();

    ctrl.show_toast("second");
    assert!(!ctrl.on_timer(stale));
    assert_eq!(ctrl.state().toast.as_deref(), Some("second"));

    settle(&mut ctrl, &mut rx, Duration::from_millis(2_100)).await;
    assert!(ctrl.state().toast.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rearmed_toast_gets_full_lifetime() {
    let (mut ctrl, mut rx) = controller();
    ctrl.show_toast("first");
    settle(&mut ctrl, &mut rx, Duration::from_millis(1_500)).await;

    ctrl.show_toast("second");
    settle(&mut ctrl, &mut rx, Duration::from_millis(1_000)).await;
    assert_eq!(
        ctrl.state().toast.as_deref(),
        Some("second"),
        "cancelled timer must not dismiss the new toast"
    );

    settle(&mut ctrl, &mut rx, Duration::from_millis(1_100)).await;
    assert!(ctrl.state().toast.is_none());
}
