//! The elapsed-time ticker: a spawned task incrementing the match session's
//! elapsed seconds once per second while a game is playing.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

use crate::{
    services::persistence,
    state::{SharedState, state_machine::SessionPhase},
};

/// Handle on a live ticker task.
///
/// Stopping is deterministic: the watch signal wakes the task out of its
/// current tick wait, and the abort covers teardown paths where the task is
/// no longer polled. Either way no further increments happen after `stop`
/// returns.
#[derive(Debug)]
pub struct TimerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Stop the ticker immediately.
    pub fn stop(self) {
        let _ = self.stop.send(true);
        self.task.abort();
    }
}

/// Spawn the once-per-second ticker for the match session.
///
/// Each tick increments `elapsed_seconds` by exactly one and schedules a
/// save. The task exits on its own if it ever observes a phase other than
/// Playing or a cleared timer flag, so even an unstopped handle cannot leak
/// a ghost timer into the next game.
pub fn spawn_ticker(state: SharedState) -> TimerHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut tick = time::interval(Duration::from_secs(1));
        // The first interval tick completes immediately; consume it so the
        // first increment lands a full second after the game starts.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tick.tick() => {
                    if state.phase().await != SessionPhase::Playing {
                        debug!("ticker observed a non-playing phase; stopping");
                        break;
                    }

                    let mut session = state.session().write().await;
                    if !session.timer_running {
                        debug!("ticker observed a stopped timer; stopping");
                        break;
                    }
                    session.elapsed_seconds += 1;
                    drop(session);

                    persistence::schedule_match_save(&state);
                }
            }
        }
    });

    TimerHandle {
        stop: stop_tx,
        task,
    }
}
