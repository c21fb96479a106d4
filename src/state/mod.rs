pub mod game;
pub mod history;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    config::AppConfig,
    dao::store::StateStore,
    services::{
        feedback::{FeedbackKind, Haptics},
        timer::TimerHandle,
    },
    state::{
        game::{DuelSession, DuelSnapshot, GameRecord, MatchSession, RosterSnapshot},
        history::UndoStack,
        state_machine::{SessionPhase, SessionStateMachine},
    },
};

/// Shared handle to the application state, cloned into tasks and the view layer.
pub type SharedState = Arc<AppState>;

/// Central application state owning both variants' sessions, their undo
/// stacks, the finished-game log, and the installed storage backend.
///
/// All mutation goes through the service layer; there are no ambient
/// globals. The state starts without a storage backend and persists nothing
/// until one is installed.
pub struct AppState {
    config: AppConfig,
    haptics: Box<dyn Haptics>,
    store: RwLock<Option<Arc<dyn StateStore>>>,
    duel: RwLock<DuelSession>,
    duel_undo: Mutex<UndoStack<DuelSnapshot>>,
    session: RwLock<MatchSession>,
    machine: RwLock<SessionStateMachine>,
    match_undo: Mutex<UndoStack<RosterSnapshot>>,
    records: RwLock<Vec<GameRecord>>,
    timer: Mutex<Option<TimerHandle>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The match roster is seeded with two default players so the session
    /// invariant (at least one player) holds from the first render.
    pub fn new(config: AppConfig, haptics: Box<dyn Haptics>) -> SharedState {
        let mut session = MatchSession::default();
        seed_default_roster(&mut session, &config);

        Arc::new(Self {
            config,
            haptics,
            store: RwLock::new(None),
            duel: RwLock::new(DuelSession::default()),
            duel_undo: Mutex::new(UndoStack::default()),
            session: RwLock::new(session),
            machine: RwLock::new(SessionStateMachine::new()),
            match_undo: Mutex::new(UndoStack::default()),
            records: RwLock::new(Vec::new()),
            timer: Mutex::new(None),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn StateStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a storage backend; subsequent state changes persist through it.
    pub async fn install_store(&self, store: Arc<dyn StateStore>) {
        let mut guard = self.store.write().await;
        *guard = Some(store);
    }

    /// Remove the current storage backend; the core keeps working in memory.
    pub async fn clear_store(&self) {
        let mut guard = self.store.write().await;
        guard.take();
    }

    /// Fire-and-forget haptic notification for the given action kind.
    pub fn haptic(&self, kind: FeedbackKind) {
        self.haptics.notify(kind);
    }

    /// The duel variant's session data.
    pub fn duel(&self) -> &RwLock<DuelSession> {
        &self.duel
    }

    /// The duel variant's undo stack.
    pub fn duel_undo(&self) -> &Mutex<UndoStack<DuelSnapshot>> {
        &self.duel_undo
    }

    /// The match variant's session data.
    pub fn session(&self) -> &RwLock<MatchSession> {
        &self.session
    }

    /// The match variant's state machine.
    pub fn machine(&self) -> &RwLock<SessionStateMachine> {
        &self.machine
    }

    /// The match variant's undo stack.
    pub fn match_undo(&self) -> &Mutex<UndoStack<RosterSnapshot>> {
        &self.match_undo
    }

    /// Append-only log of finished games, oldest first.
    pub fn records(&self) -> &RwLock<Vec<GameRecord>> {
        &self.records
    }

    /// Snapshot the current phase of the match state machine.
    pub async fn phase(&self) -> SessionPhase {
        self.machine.read().await.phase()
    }

    /// Install a fresh ticker handle, stopping any previous one first so a
    /// stale ticker can never keep incrementing elapsed time.
    pub async fn set_timer(&self, handle: TimerHandle) {
        let mut slot = self.timer.lock().await;
        if let Some(old) = slot.take() {
            old.stop();
        }
        *slot = Some(handle);
    }

    /// Stop and drop the live ticker, if any.
    pub async fn stop_timer(&self) {
        if let Some(old) = self.timer.lock().await.take() {
            old.stop();
        }
    }
}

/// Fill an empty roster with the two default players.
pub(crate) fn seed_default_roster(session: &mut MatchSession, config: &AppConfig) {
    if !session.players.is_empty() {
        return;
    }
    for (slot, name) in ["Player 1", "Player 2"].iter().enumerate() {
        let _ = session.add_player(name, config.color_for_slot(slot));
    }
}
