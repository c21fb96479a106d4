//! Operations for the two-player "step increment" scoreboard.
//!
//! The duel variant has no phases: every operation is legal at all times.
//! Each score-bearing mutation pushes a snapshot of the two scores first, so
//! undo restores the prior scores verbatim (and therefore undoes resets as
//! well as individual changes).

use tracing::debug;

use crate::{
    services::{
        feedback::{ConfirmGate, FeedbackKind},
        persistence,
    },
    state::{
        SharedState,
        game::{DuelSlot, Theme},
        history::HistoryEntry,
    },
};

/// Apply a signed delta to one player's score.
pub async fn add_score(state: &SharedState, slot: DuelSlot, delta: i64) {
    state.haptic(FeedbackKind::Selection);

    let mut duel = state.duel().write().await;
    let snapshot = duel.snapshot();
    state.duel_undo().lock().await.push(snapshot);

    *duel.score_mut(slot) += delta;
    duel.history.push(HistoryEntry::score_change(slot.id(), delta));
    drop(duel);

    persistence::schedule_duel_save(state);
}

/// Restore the scores captured before the most recent mutation.
///
/// Returns false when there is nothing to undo; that is user feedback, not
/// an error, and leaves all state untouched.
pub async fn undo(state: &SharedState) -> bool {
    let mut duel = state.duel().write().await;
    let Some(snapshot) = state.duel_undo().lock().await.pop() else {
        drop(duel);
        debug!("undo requested with an empty stack");
        state.haptic(FeedbackKind::Warning);
        return false;
    };

    duel.restore(snapshot);
    duel.history.push(HistoryEntry::undo());
    drop(duel);

    state.haptic(FeedbackKind::Impact);
    persistence::schedule_duel_save(state);
    true
}

/// Reset both scores to 0 after user confirmation.
///
/// The pre-reset scores are pushed onto the undo stack first, so the reset
/// itself can be undone. Declining the prompt changes nothing.
pub async fn reset_scores(state: &SharedState, confirm: &dyn ConfirmGate) -> bool {
    if !confirm.confirm("Reset both scores to 0?").await {
        return false;
    }

    state.haptic(FeedbackKind::Success);

    let mut duel = state.duel().write().await;
    let snapshot = duel.snapshot();
    state.duel_undo().lock().await.push(snapshot);

    duel.p1_score = 0;
    duel.p2_score = 0;
    duel.history.push(HistoryEntry::reset());
    drop(duel);

    persistence::schedule_duel_save(state);
    true
}

/// Rename one of the two fixed players; no-op on an empty name.
pub async fn set_player_name(state: &SharedState, slot: DuelSlot, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        debug!(slot = ?slot, "ignoring empty player name");
        return false;
    }

    let mut duel = state.duel().write().await;
    *duel.name_mut(slot) = name.to_owned();
    drop(duel);

    persistence::schedule_duel_save(state);
    true
}

/// Set the per-press increment step, clamped to at least 1.
pub async fn set_increment_step(state: &SharedState, step: i64) {
    let mut duel = state.duel().write().await;
    duel.step = step.max(1);
    drop(duel);

    persistence::schedule_duel_save(state);
}

/// Switch the color theme.
pub async fn set_theme(state: &SharedState, theme: Theme) {
    let mut duel = state.duel().write().await;
    duel.theme = theme;
    drop(duel);

    persistence::schedule_duel_save(state);
}

/// Clear the visible action history, in memory and in the stored blob.
pub async fn clear_history(state: &SharedState) {
    persistence::clear_duel_history(state).await;
}
