//! Operations for the multi-player match variant: roster management, score
//! deltas with undo, and the setup/playing/finished session flow.
//!
//! Phase-invalid calls and unknown player ids are tolerated no-ops (logged,
//! sometimes answered with a warning haptic), never errors; the state
//! machine is the single authority on which transitions are legal.

use tracing::debug;

use crate::{
    services::{
        feedback::{ConfirmGate, FeedbackKind},
        persistence, timer,
    },
    state::{
        SharedState,
        game::{GameRecord, GameResult, Theme},
        history::HistoryEntry,
        state_machine::{SessionEvent, SessionPhase},
    },
};

/// Apply an event to the state machine, logging rejected transitions.
async fn transition(state: &SharedState, event: SessionEvent) -> Option<SessionPhase> {
    match state.machine().write().await.apply(event) {
        Ok(next) => Some(next),
        Err(err) => {
            debug!(error = %err, "transition rejected");
            None
        }
    }
}

/// Start a fresh game from the setup screen.
///
/// Resets round, elapsed time, and the turn pointer, clears any stale final
/// result, starts the ticker, and moves to Playing. Ignored outside Setup.
pub async fn start_game(state: &SharedState) -> bool {
    if transition(state, SessionEvent::StartGame).await.is_none() {
        return false;
    }

    {
        let mut session = state.session().write().await;
        session.round = 1;
        session.elapsed_seconds = 0;
        session.current_turn_index = 0;
        session.result = None;
        session.timer_running = true;
    }
    state.set_timer(timer::spawn_ticker(state.clone())).await;

    state.haptic(FeedbackKind::Success);
    persistence::schedule_match_save(state);
    true
}

/// End the running game: stop the timer, compute the result from the live
/// registry, and append a record to the finished-game log.
///
/// Returns the computed result, or `None` when no game is playing.
pub async fn end_game(state: &SharedState) -> Option<GameResult> {
    transition(state, SessionEvent::EndGame).await?;

    let (result, record) = {
        let mut session = state.session().write().await;
        session.timer_running = false;
        let result = session.final_result();
        session.result = Some(result.clone());
        let record = GameRecord::capture(&session, &result);
        (result, record)
    };
    state.stop_timer().await;
    state.records().write().await.push(record);

    state.haptic(FeedbackKind::Success);
    persistence::schedule_match_save(state);
    persistence::schedule_records_save(state);
    Some(result)
}

/// Advance to the next round, resetting the turn pointer. Playing-phase only.
pub async fn advance_round(state: &SharedState) -> bool {
    if state.phase().await != SessionPhase::Playing {
        debug!("advance_round outside playing phase ignored");
        return false;
    }

    let mut session = state.session().write().await;
    session.round += 1;
    session.current_turn_index = 0;
    drop(session);

    state.haptic(FeedbackKind::Selection);
    persistence::schedule_match_save(state);
    true
}

/// Move the turn pointer to the next player in registry order, wrapping.
/// Playing-phase only.
pub async fn advance_turn(state: &SharedState) -> bool {
    if state.phase().await != SessionPhase::Playing {
        debug!("advance_turn outside playing phase ignored");
        return false;
    }

    let mut session = state.session().write().await;
    session.current_turn_index = (session.current_turn_index + 1) % session.players.len();
    drop(session);

    state.haptic(FeedbackKind::Selection);
    persistence::schedule_match_save(state);
    true
}

/// Leave the final scoreboard for the setup screen, keeping all scores.
///
/// Supports editing the roster mid-tournament; only legal from Finished.
pub async fn go_to_setup(state: &SharedState) -> bool {
    if transition(state, SessionEvent::EditRoster).await.is_none() {
        return false;
    }

    state.session().write().await.result = None;
    persistence::schedule_match_save(state);
    true
}

/// Full reset after user confirmation: every score back to 0, undo stack
/// cleared, timers stopped, phase back to Setup. Declining changes nothing.
pub async fn reset_game(state: &SharedState, confirm: &dyn ConfirmGate) -> bool {
    if !confirm
        .confirm("Reset the game? All scores return to 0.")
        .await
    {
        return false;
    }

    // Reset is legal from every phase, so the transition cannot fail.
    let _ = transition(state, SessionEvent::Reset).await;
    state.stop_timer().await;

    let mut session = state.session().write().await;
    session.zero_scores();
    session.round = 1;
    session.elapsed_seconds = 0;
    session.current_turn_index = 0;
    session.timer_running = false;
    session.result = None;
    session.history.push(HistoryEntry::reset());
    drop(session);

    state.match_undo().lock().await.clear();

    state.haptic(FeedbackKind::Success);
    persistence::schedule_match_save(state);
    true
}

/// Apply a signed delta to one player's score.
///
/// A stale id (player removed while a press was in flight) is silently
/// ignored. Otherwise the full registry is snapshotted for undo first. A
/// correction applied after the game has finished recomputes the displayed
/// result so the final scoreboard never goes stale.
pub async fn apply_delta(state: &SharedState, player_id: u32, delta: i64) -> bool {
    let mut session = state.session().write().await;
    if !session.players.contains_key(&player_id) {
        debug!(player_id, "delta for unknown player ignored");
        return false;
    }

    let snapshot = session.snapshot_roster();
    state.match_undo().lock().await.push(snapshot);

    if let Some(player) = session.players.get_mut(&player_id) {
        player.score += delta;
    }
    session.history.push(HistoryEntry::score_change(player_id, delta));
    if state.phase().await == SessionPhase::Finished {
        session.result = Some(session.final_result());
    }
    drop(session);

    state.haptic(FeedbackKind::Selection);
    persistence::schedule_match_save(state);
    true
}

/// Restore the registry captured before the most recent mutation.
///
/// Returns false when there is nothing to undo; that is user feedback, not
/// an error, and leaves all state untouched.
pub async fn undo(state: &SharedState) -> bool {
    let mut session = state.session().write().await;
    let Some(snapshot) = state.match_undo().lock().await.pop() else {
        drop(session);
        debug!("undo requested with an empty stack");
        state.haptic(FeedbackKind::Warning);
        return false;
    };

    session.restore_roster(snapshot);
    session.history.push(HistoryEntry::undo());
    if state.phase().await == SessionPhase::Finished {
        session.result = Some(session.final_result());
    }
    drop(session);

    state.haptic(FeedbackKind::Impact);
    persistence::schedule_match_save(state);
    true
}

/// Add a player to the roster, assigning the next palette color.
///
/// Returns the minted id, or `None` when the name is blank or the roster is
/// already full.
pub async fn add_player(state: &SharedState, name: &str) -> Option<u32> {
    let mut session = state.session().write().await;
    let color = state.config().color_for_slot(session.players.len());
    match session.add_player(name, color) {
        Some(id) => {
            drop(session);
            state.haptic(FeedbackKind::Selection);
            persistence::schedule_match_save(state);
            Some(id)
        }
        None => {
            drop(session);
            debug!(name, "add_player rejected");
            state.haptic(FeedbackKind::Warning);
            None
        }
    }
}

/// Remove a player from the roster. Setup-phase only, and the last player
/// can never be removed.
pub async fn remove_player(state: &SharedState, player_id: u32) -> bool {
    if state.phase().await != SessionPhase::Setup {
        debug!(player_id, "remove_player outside setup phase ignored");
        return false;
    }

    let mut session = state.session().write().await;
    if !session.remove_player(player_id) {
        drop(session);
        debug!(player_id, "remove_player rejected");
        state.haptic(FeedbackKind::Warning);
        return false;
    }
    drop(session);

    state.haptic(FeedbackKind::Selection);
    persistence::schedule_match_save(state);
    true
}

/// Rename a player; no-op on unknown id or empty name.
pub async fn rename_player(state: &SharedState, player_id: u32, name: &str) -> bool {
    let mut session = state.session().write().await;
    if !session.rename_player(player_id, name) {
        drop(session);
        debug!(player_id, "rename_player rejected");
        return false;
    }
    drop(session);

    persistence::schedule_match_save(state);
    true
}

/// Switch the color theme.
pub async fn set_theme(state: &SharedState, theme: Theme) {
    let mut session = state.session().write().await;
    session.theme = theme;
    drop(session);

    persistence::schedule_match_save(state);
}

/// Clear the visible action history, in memory and in the stored blob.
pub async fn clear_history(state: &SharedState) {
    persistence::clear_match_history(state).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::memory::MemoryStore,
        services::feedback::{AlwaysConfirm, NeverConfirm, NoHaptics},
        state::{AppState, game::ROSTER_CAPACITY},
    };

    async fn state_with(store: MemoryStore) -> SharedState {
        let state = AppState::new(AppConfig::default(), Box::new(NoHaptics));
        state.install_store(Arc::new(store)).await;
        persistence::restore(&state).await;
        state
    }

    #[tokio::test]
    async fn end_game_preserves_ties() {
        let state = state_with(MemoryStore::new()).await;
        add_player(&state, "C").await.unwrap();

        assert!(start_game(&state).await);
        apply_delta(&state, 1, 10).await;
        apply_delta(&state, 2, 10).await;
        apply_delta(&state, 3, 5).await;

        let result = end_game(&state).await.unwrap();
        assert_eq!(result.top_score, 10);
        assert!(result.is_tie);
        assert_eq!(result.winners.len(), 2);
        assert_eq!(state.phase().await, SessionPhase::Finished);

        let records = state.records().read().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].winner_names, vec!["Player 1", "Player 2"]);
    }

    #[tokio::test]
    async fn end_game_with_single_winner() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);
        apply_delta(&state, 1, 12).await;
        apply_delta(&state, 2, 10).await;

        let result = end_game(&state).await.unwrap();
        assert_eq!(result.top_score, 12);
        assert!(!result.is_tie);
        assert_eq!(result.winners[0].id, 1);
    }

    #[tokio::test]
    async fn end_game_outside_playing_is_a_noop() {
        let state = state_with(MemoryStore::new()).await;
        assert_eq!(end_game(&state).await, None);
        assert_eq!(state.phase().await, SessionPhase::Setup);
        assert!(state.records().read().await.is_empty());
    }

    #[tokio::test]
    async fn roster_never_exceeds_capacity() {
        let state = state_with(MemoryStore::new()).await;

        for index in 0..10 {
            let _ = add_player(&state, &format!("Extra {index}")).await;
        }

        assert_eq!(
            state.session().read().await.players.len(),
            ROSTER_CAPACITY
        );
        assert_eq!(add_player(&state, "One more").await, None);
    }

    #[tokio::test]
    async fn roster_never_drops_below_one_player() {
        let state = state_with(MemoryStore::new()).await;

        assert!(remove_player(&state, 2).await);
        assert!(!remove_player(&state, 1).await);
        assert_eq!(state.session().read().await.players.len(), 1);
    }

    #[tokio::test]
    async fn remove_player_is_setup_only() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);
        assert!(!remove_player(&state, 2).await);
        assert_eq!(state.session().read().await.players.len(), 2);
    }

    #[tokio::test]
    async fn delta_for_unknown_player_is_ignored() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);

        assert!(!apply_delta(&state, 99, 5).await);
        // No snapshot was pushed either: undo has nothing to do.
        assert!(!undo(&state).await);
    }

    #[tokio::test]
    async fn undo_restores_registry_and_walks_back() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);

        apply_delta(&state, 1, 5).await;
        apply_delta(&state, 1, 3).await;
        assert_eq!(state.session().read().await.players[&1].score, 8);

        assert!(undo(&state).await);
        assert_eq!(state.session().read().await.players[&1].score, 5);
        assert!(undo(&state).await);
        assert_eq!(state.session().read().await.players[&1].score, 0);
        assert!(!undo(&state).await);
    }

    #[tokio::test]
    async fn reset_zeroes_scores_clears_undo_and_returns_to_setup() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);
        apply_delta(&state, 1, 9).await;

        assert!(reset_game(&state, &AlwaysConfirm).await);

        let session = state.session().read().await;
        assert_eq!(session.players[&1].score, 0);
        assert_eq!(session.round, 1);
        assert_eq!(session.elapsed_seconds, 0);
        assert!(!session.timer_running);
        drop(session);
        assert_eq!(state.phase().await, SessionPhase::Setup);

        // Undo stack was cleared by the reset.
        assert!(!undo(&state).await);
    }

    #[tokio::test]
    async fn declined_reset_changes_nothing() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);
        apply_delta(&state, 1, 9).await;

        assert!(!reset_game(&state, &NeverConfirm).await);
        assert_eq!(state.session().read().await.players[&1].score, 9);
        assert_eq!(state.phase().await, SessionPhase::Playing);
    }

    #[tokio::test]
    async fn round_and_turn_advance_only_while_playing() {
        let state = state_with(MemoryStore::new()).await;

        assert!(!advance_round(&state).await);
        assert!(!advance_turn(&state).await);

        assert!(start_game(&state).await);
        assert!(advance_turn(&state).await);
        assert_eq!(state.session().read().await.current_turn_index, 1);
        // Wraps around the two-player roster.
        assert!(advance_turn(&state).await);
        assert_eq!(state.session().read().await.current_turn_index, 0);

        advance_turn(&state).await;
        assert!(advance_round(&state).await);
        let session = state.session().read().await;
        assert_eq!(session.round, 2);
        assert_eq!(session.current_turn_index, 0);
    }

    #[tokio::test]
    async fn go_to_setup_keeps_scores() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);
        apply_delta(&state, 1, 4).await;
        end_game(&state).await.unwrap();

        assert!(go_to_setup(&state).await);
        assert_eq!(state.phase().await, SessionPhase::Setup);
        let session = state.session().read().await;
        assert_eq!(session.players[&1].score, 4);
        assert!(session.result.is_none());
    }

    #[tokio::test]
    async fn post_finish_mutations_keep_result_current() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);
        apply_delta(&state, 1, 5).await;
        end_game(&state).await.unwrap();

        // A late correction on the final scoreboard updates the result.
        apply_delta(&state, 2, 9).await;
        let session = state.session().read().await;
        let result = session.result.as_ref().unwrap();
        assert_eq!(result.top_score, 9);
        assert_eq!(result.winners[0].id, 2);
        drop(session);

        assert!(undo(&state).await);
        let session = state.session().read().await;
        let result = session.result.as_ref().unwrap();
        assert_eq!(result.top_score, 5);
        assert_eq!(result.winners[0].id, 1);
    }

    #[tokio::test]
    async fn clear_history_keeps_other_persisted_fields() {
        let store = MemoryStore::new();
        let state = state_with(store.clone()).await;

        assert!(start_game(&state).await);
        apply_delta(&state, 1, 7).await;
        assert!(advance_round(&state).await);
        persistence::flush(&state).await.unwrap();
        clear_history(&state).await;

        let reloaded = state_with(store).await;
        let session = reloaded.session().read().await;
        assert_eq!(session.players[&1].score, 7);
        assert_eq!(session.round, 2);
        assert!(session.history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_tracks_whole_seconds_and_freezes_on_end() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);

        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(state.session().read().await.elapsed_seconds, 3);

        end_game(&state).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(state.session().read().await.elapsed_seconds, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_a_new_game_never_leaks_the_old_ticker() {
        let state = state_with(MemoryStore::new()).await;
        assert!(start_game(&state).await);
        tokio::time::sleep(Duration::from_millis(2_100)).await;

        end_game(&state).await.unwrap();
        assert!(go_to_setup(&state).await);
        assert!(start_game(&state).await);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        // Elapsed time restarted from zero; only the new ticker increments.
        assert_eq!(state.session().read().await.elapsed_seconds, 1);
    }

    #[tokio::test]
    async fn session_persists_across_restart_without_running_timer() {
        let store = MemoryStore::new();
        let state = state_with(store.clone()).await;

        assert!(start_game(&state).await);
        apply_delta(&state, 1, 6).await;
        assert!(advance_round(&state).await);
        persistence::flush(&state).await.unwrap();

        let reloaded = state_with(store).await;
        assert_eq!(reloaded.phase().await, SessionPhase::Playing);
        let session = reloaded.session().read().await;
        assert_eq!(session.players[&1].score, 6);
        assert_eq!(session.round, 2);
        assert!(!session.timer_running);
    }

    #[tokio::test]
    async fn finished_game_log_survives_restart() {
        let store = MemoryStore::new();
        let state = state_with(store.clone()).await;

        assert!(start_game(&state).await);
        apply_delta(&state, 2, 3).await;
        end_game(&state).await.unwrap();
        persistence::flush(&state).await.unwrap();

        let reloaded = state_with(store).await;
        let records = reloaded.records().read().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].top_score, 3);
        assert_eq!(records[0].winner_names, vec!["Player 2"]);
    }
}
