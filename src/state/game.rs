use indexmap::IndexMap;
use uuid::Uuid;

use crate::dao::models::{
    ColorEntity, DuelStateEntity, GameRecordEntity, MatchStateEntity, OutcomeEntity, PlayerEntity,
    ThemeEntity,
};
use crate::state::history::{ActionLog, now_millis};

/// Maximum number of players a match registry can hold.
pub const ROSTER_CAPACITY: usize = 6;
/// Minimum number of players a match registry must keep.
pub const ROSTER_MIN: usize = 1;

/// UI color theme shared by both variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    /// Dark theme (the default).
    #[default]
    Dark,
    /// Light theme.
    Light,
}

/// HSV color assigned to a player for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerColor {
    /// Hue in degrees.
    pub h: f32,
    /// Saturation in `[0, 1]`.
    pub s: f32,
    /// Value in `[0, 1]`.
    pub v: f32,
}

/// Player info tracked during a match session.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Stable identifier, unique within the registry for the session lifetime.
    pub id: u32,
    /// Display name chosen for the player.
    pub name: String,
    /// Current score for the player.
    pub score: i64,
    /// Color assigned when the player joined.
    pub color: PlayerColor,
}

/// Which of the duel variant's two fixed players an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelSlot {
    /// The left-hand player.
    One,
    /// The right-hand player.
    Two,
}

impl DuelSlot {
    /// Numeric id used when recording history entries for this slot.
    pub fn id(self) -> u32 {
        match self {
            DuelSlot::One => 1,
            DuelSlot::Two => 2,
        }
    }
}

/// Undo snapshot for the duel variant.
///
/// Deliberately narrower than the match variant's full-registry snapshot: it
/// captures the two scores and nothing else, so undo never reverts names,
/// the step, or the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelSnapshot {
    /// Player one's score at snapshot time.
    pub p1: i64,
    /// Player two's score at snapshot time.
    pub p2: i64,
}

/// State for the two-player "step increment" scoreboard.
#[derive(Debug, Clone)]
pub struct DuelSession {
    /// Player one's score.
    pub p1_score: i64,
    /// Player two's score.
    pub p2_score: i64,
    /// Player one's display name.
    pub p1_name: String,
    /// Player two's display name.
    pub p2_name: String,
    /// Increment step applied per score button press, always >= 1.
    pub step: i64,
    /// Selected theme.
    pub theme: Theme,
    /// Bounded action history, newest first.
    pub history: ActionLog,
}

impl Default for DuelSession {
    fn default() -> Self {
        DuelStateEntity::default().into()
    }
}

impl DuelSession {
    /// Mutable handle on the score for `slot`.
    pub fn score_mut(&mut self, slot: DuelSlot) -> &mut i64 {
        match slot {
            DuelSlot::One => &mut self.p1_score,
            DuelSlot::Two => &mut self.p2_score,
        }
    }

    /// Mutable handle on the display name for `slot`.
    pub fn name_mut(&mut self, slot: DuelSlot) -> &mut String {
        match slot {
            DuelSlot::One => &mut self.p1_name,
            DuelSlot::Two => &mut self.p2_name,
        }
    }

    /// Capture the score-bearing state for the undo stack.
    pub fn snapshot(&self) -> DuelSnapshot {
        DuelSnapshot {
            p1: self.p1_score,
            p2: self.p2_score,
        }
    }

    /// Restore both scores from a snapshot verbatim.
    pub fn restore(&mut self, snapshot: DuelSnapshot) {
        self.p1_score = snapshot.p1;
        self.p2_score = snapshot.p2;
    }
}

/// Deep copy of the match registry pushed before every score-bearing mutation.
pub type RosterSnapshot = IndexMap<u32, Player>;

/// End-of-game result computed when a match finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct GameResult {
    /// Every player holding the top score, in registry order.
    pub winners: Vec<Player>,
    /// The top score itself; 0 when the registry is empty.
    pub top_score: i64,
    /// Whether two or more players share the top score.
    pub is_tie: bool,
}

/// Whether a finished game produced a single winner or a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A single player held the top score.
    Winner,
    /// Two or more players shared the top score.
    Tie,
}

/// Immutable record of one finished game, appended to the persistent log.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    /// Primary key of the record.
    pub id: Uuid,
    /// Snapshot of the registry at the moment the game ended.
    pub players: Vec<Player>,
    /// Names of every player sharing the top score.
    pub winner_names: Vec<String>,
    /// The top score itself.
    pub top_score: i64,
    /// Single winner or tie.
    pub outcome: MatchOutcome,
    /// Epoch milliseconds at which the game ended.
    pub at: u64,
    /// Whole seconds the game lasted.
    pub duration_seconds: u64,
    /// Round counter when the game ended.
    pub round: u32,
}

impl GameRecord {
    /// Build the record for a finished session from its computed result.
    pub fn capture(session: &MatchSession, result: &GameResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            players: session.players.values().cloned().collect(),
            winner_names: result
                .winners
                .iter()
                .map(|player| player.name.clone())
                .collect(),
            top_score: result.top_score,
            outcome: if result.is_tie {
                MatchOutcome::Tie
            } else {
                MatchOutcome::Winner
            },
            at: now_millis(),
            duration_seconds: session.elapsed_seconds,
            round: session.round,
        }
    }
}

/// Aggregated state for the multi-player match variant.
///
/// The session phase lives in the state machine, not here; persisted
/// snapshots capture both together.
#[derive(Debug, Clone)]
pub struct MatchSession {
    /// Ordered registry of participating players, keyed by id.
    pub players: IndexMap<u32, Player>,
    /// Index (in registry order) of the player whose turn it is.
    pub current_turn_index: usize,
    /// Current round number, starting at 1.
    pub round: u32,
    /// Whole seconds of game time accrued so far.
    pub elapsed_seconds: u64,
    /// True only while the phase is Playing and the ticker is live.
    pub timer_running: bool,
    /// Selected theme.
    pub theme: Theme,
    /// Bounded action history, newest first.
    pub history: ActionLog,
    /// Result of the last finished game, while on the final scoreboard.
    pub result: Option<GameResult>,
}

impl Default for MatchSession {
    fn default() -> Self {
        Self {
            players: IndexMap::new(),
            current_turn_index: 0,
            round: 1,
            elapsed_seconds: 0,
            timer_running: false,
            theme: Theme::Dark,
            history: ActionLog::default(),
            result: None,
        }
    }
}

impl MatchSession {
    /// Add a player, minting a fresh id.
    ///
    /// Returns the new id, or `None` when the name trims empty or the
    /// registry is already at [`ROSTER_CAPACITY`].
    pub fn add_player(&mut self, name: &str, color: PlayerColor) -> Option<u32> {
        let name = name.trim();
        if name.is_empty() || self.players.len() >= ROSTER_CAPACITY {
            return None;
        }

        let id = self.players.keys().max().copied().unwrap_or(0) + 1;
        self.players.insert(
            id,
            Player {
                id,
                name: name.to_owned(),
                score: 0,
                color,
            },
        );
        Some(id)
    }

    /// Remove a player by id.
    ///
    /// Returns false when the id is unknown or removal would empty the
    /// registry below [`ROSTER_MIN`]. The turn pointer is reset to 0 when it
    /// no longer points inside the registry.
    pub fn remove_player(&mut self, id: u32) -> bool {
        if self.players.len() <= ROSTER_MIN {
            return false;
        }
        if self.players.shift_remove(&id).is_none() {
            return false;
        }
        if self.current_turn_index >= self.players.len() {
            self.current_turn_index = 0;
        }
        true
    }

    /// Rename a player; no-op on unknown id or empty name.
    pub fn rename_player(&mut self, id: u32, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.players.get_mut(&id) {
            Some(player) => {
                player.name = name.to_owned();
                true
            }
            None => false,
        }
    }

    /// Set every player's score back to 0.
    pub fn zero_scores(&mut self) {
        for player in self.players.values_mut() {
            player.score = 0;
        }
    }

    /// Deep copy of the registry for the undo stack.
    pub fn snapshot_roster(&self) -> RosterSnapshot {
        self.players.clone()
    }

    /// Restore the registry from a snapshot verbatim, re-clamping the turn
    /// pointer against the restored length.
    pub fn restore_roster(&mut self, snapshot: RosterSnapshot) {
        self.players = snapshot;
        if self.current_turn_index >= self.players.len() {
            self.current_turn_index = 0;
        }
    }

    /// Compute the end-of-game result from the live registry.
    ///
    /// Ties are fully preserved: every player holding the top score appears
    /// in `winners`, in registry order.
    pub fn final_result(&self) -> GameResult {
        let top_score = self
            .players
            .values()
            .map(|player| player.score)
            .max()
            .unwrap_or(0);
        let winners: Vec<Player> = self
            .players
            .values()
            .filter(|player| player.score == top_score)
            .cloned()
            .collect();
        let is_tie = winners.len() > 1;

        GameResult {
            winners,
            top_score,
            is_tie,
        }
    }
}

impl From<ColorEntity> for PlayerColor {
    fn from(value: ColorEntity) -> Self {
        Self {
            h: value.h,
            s: value.s,
            v: value.v,
        }
    }
}

impl From<PlayerColor> for ColorEntity {
    fn from(value: PlayerColor) -> Self {
        Self {
            h: value.h,
            s: value.s,
            v: value.v,
        }
    }
}

impl From<ThemeEntity> for Theme {
    fn from(value: ThemeEntity) -> Self {
        match value {
            ThemeEntity::Dark => Theme::Dark,
            ThemeEntity::Light => Theme::Light,
        }
    }
}

impl From<Theme> for ThemeEntity {
    fn from(value: Theme) -> Self {
        match value {
            Theme::Dark => ThemeEntity::Dark,
            Theme::Light => ThemeEntity::Light,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            score: value.score,
            color: value.color.into(),
        }
    }
}

impl From<Player> for PlayerEntity {
    fn from(value: Player) -> Self {
        Self {
            id: value.id,
            name: value.name,
            score: value.score,
            color: value.color.into(),
        }
    }
}

impl From<DuelStateEntity> for DuelSession {
    fn from(value: DuelStateEntity) -> Self {
        Self {
            p1_score: value.p1,
            p2_score: value.p2,
            p1_name: value.p1_name,
            p2_name: value.p2_name,
            step: value.step.max(1),
            theme: value.theme.into(),
            history: value.history.into(),
        }
    }
}

impl From<DuelSession> for DuelStateEntity {
    fn from(value: DuelSession) -> Self {
        Self {
            schema_version: crate::dao::models::SCHEMA_VERSION,
            p1: value.p1_score,
            p2: value.p2_score,
            p1_name: value.p1_name,
            p2_name: value.p2_name,
            step: value.step,
            theme: value.theme.into(),
            history: value.history.into(),
        }
    }
}

impl From<MatchStateEntity> for MatchSession {
    fn from(value: MatchStateEntity) -> Self {
        let players: IndexMap<u32, Player> = value
            .players
            .into_iter()
            .map(|entity| (entity.id, entity.into()))
            .collect();
        let current_turn_index = if value.current_turn_index < players.len() {
            value.current_turn_index
        } else {
            0
        };

        Self {
            players,
            current_turn_index,
            round: value.round.max(1),
            elapsed_seconds: value.elapsed_seconds,
            timer_running: false,
            theme: value.theme.into(),
            history: value.history.into(),
            result: None,
        }
    }
}

impl From<(MatchSession, crate::state::state_machine::SessionPhase)> for MatchStateEntity {
    fn from(
        (session, phase): (MatchSession, crate::state::state_machine::SessionPhase),
    ) -> Self {
        Self {
            schema_version: crate::dao::models::SCHEMA_VERSION,
            phase: phase.into(),
            players: session
                .players
                .into_values()
                .map(Into::into)
                .collect(),
            current_turn_index: session.current_turn_index,
            round: session.round,
            elapsed_seconds: session.elapsed_seconds,
            theme: session.theme.into(),
            history: session.history.into(),
        }
    }
}

impl From<GameRecordEntity> for GameRecord {
    fn from(value: GameRecordEntity) -> Self {
        Self {
            id: value.id,
            players: value.players.into_iter().map(Into::into).collect(),
            winner_names: value.winner_names,
            top_score: value.top_score,
            outcome: match value.outcome {
                OutcomeEntity::Winner => MatchOutcome::Winner,
                OutcomeEntity::Tie => MatchOutcome::Tie,
            },
            at: value.at,
            duration_seconds: value.duration_seconds,
            round: value.round,
        }
    }
}

impl From<GameRecord> for GameRecordEntity {
    fn from(value: GameRecord) -> Self {
        Self {
            id: value.id,
            players: value.players.into_iter().map(Into::into).collect(),
            winner_names: value.winner_names,
            top_score: value.top_score,
            outcome: match value.outcome {
                MatchOutcome::Winner => OutcomeEntity::Winner,
                MatchOutcome::Tie => OutcomeEntity::Tie,
            },
            at: value.at,
            duration_seconds: value.duration_seconds,
            round: value.round,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color() -> PlayerColor {
        PlayerColor {
            h: 0.0,
            s: 1.0,
            v: 1.0,
        }
    }

    fn session_with(names: &[&str]) -> MatchSession {
        let mut session = MatchSession::default();
        for name in names {
            session.add_player(name, color()).unwrap();
        }
        session
    }

    #[test]
    fn add_player_mints_increasing_ids() {
        let mut session = session_with(&["Ada", "Grace"]);
        session.remove_player(1);
        let id = session.add_player("Edsger", color()).unwrap();
        // Ids never get recycled, even after a removal.
        assert_eq!(id, 3);
    }

    #[test]
    fn add_player_rejects_blank_names_and_full_roster() {
        let mut session = MatchSession::default();
        assert_eq!(session.add_player("   ", color()), None);

        for index in 0..ROSTER_CAPACITY {
            assert!(session.add_player(&format!("P{index}"), color()).is_some());
        }
        assert_eq!(session.add_player("One too many", color()), None);
        assert_eq!(session.players.len(), ROSTER_CAPACITY);
    }

    #[test]
    fn remove_player_keeps_at_least_one_and_fixes_turn_pointer() {
        let mut session = session_with(&["Ada", "Grace", "Edsger"]);
        session.current_turn_index = 2;

        assert!(session.remove_player(3));
        assert_eq!(session.current_turn_index, 0);

        assert!(session.remove_player(2));
        // Last remaining player cannot be removed.
        assert!(!session.remove_player(1));
        assert_eq!(session.players.len(), 1);
    }

    #[test]
    fn final_result_preserves_ties() {
        let mut session = session_with(&["A", "B", "C"]);
        session.players.get_mut(&1).unwrap().score = 10;
        session.players.get_mut(&2).unwrap().score = 10;
        session.players.get_mut(&3).unwrap().score = 5;

        let result = session.final_result();
        assert_eq!(result.top_score, 10);
        assert!(result.is_tie);
        let names: Vec<&str> = result
            .winners
            .iter()
            .map(|player| player.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn final_result_with_single_winner() {
        let mut session = session_with(&["A", "B"]);
        session.players.get_mut(&1).unwrap().score = 12;
        session.players.get_mut(&2).unwrap().score = 10;

        let result = session.final_result();
        assert_eq!(result.top_score, 12);
        assert!(!result.is_tie);
        assert_eq!(result.winners.len(), 1);
        assert_eq!(result.winners[0].name, "A");
    }

    #[test]
    fn final_result_on_empty_registry_defaults_to_zero() {
        let session = MatchSession::default();
        let result = session.final_result();
        assert_eq!(result.top_score, 0);
        assert!(result.winners.is_empty());
        assert!(!result.is_tie);
    }

    #[test]
    fn roster_snapshot_restores_verbatim() {
        let mut session = session_with(&["Ada", "Grace"]);
        let snapshot = session.snapshot_roster();

        session.players.get_mut(&1).unwrap().score = 99;
        session.remove_player(2);
        session.restore_roster(snapshot);

        assert_eq!(session.players.len(), 2);
        assert_eq!(session.players[&1].score, 0);
    }

    #[test]
    fn duel_snapshot_restores_scores_only() {
        let mut duel = DuelSession::default();
        duel.p1_score = 4;
        let snapshot = duel.snapshot();

        duel.p1_score = 9;
        duel.p2_score = -3;
        duel.p1_name = "Renamed".into();
        duel.restore(snapshot);

        assert_eq!(duel.p1_score, 4);
        assert_eq!(duel.p2_score, 0);
        // Names are outside the undo scope.
        assert_eq!(duel.p1_name, "Renamed");
    }
}
