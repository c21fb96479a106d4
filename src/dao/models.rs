//! Serialized entities for the persisted blobs, plus their decoders.
//!
//! Decoding never fails: each field is read out of a [`serde_json::Value`]
//! independently and falls back to its documented default when missing or of
//! the wrong type, so a partially corrupt blob still restores every field
//! that did parse. Malformed array elements (players, history entries, game
//! records) are skipped with a warning instead of voiding the whole load.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

/// Version tag written into every persisted blob for forward migration.
pub const SCHEMA_VERSION: u32 = 1;

/// Color theme stored with either variant's session.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeEntity {
    /// Dark UI theme (the default).
    #[default]
    Dark,
    /// Light UI theme.
    Light,
}

/// Session phase stored with the match variant's blob.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PhaseEntity {
    /// Roster editing before a game starts.
    #[default]
    Setup,
    /// A game is in progress.
    Playing,
    /// A game has ended and its result is on display.
    Finished,
}

/// Discriminant for a stored history entry.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKindEntity {
    /// A signed delta was applied to one player's score.
    ScoreChange,
    /// All scores were reset.
    Reset,
    /// The previous snapshot was restored.
    Undo,
}

/// Outcome discriminant for a finished-game record.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeEntity {
    /// A single player held the top score.
    Winner,
    /// Two or more players shared the top score.
    Tie,
}

/// HSV color assigned to a player.
#[derive(Debug, Clone, Serialize)]
pub struct ColorEntity {
    /// Hue in degrees.
    pub h: f32,
    /// Saturation in `[0, 1]`.
    pub s: f32,
    /// Value in `[0, 1]`.
    pub v: f32,
}

impl Default for ColorEntity {
    fn default() -> Self {
        Self {
            h: 0.0,
            s: 0.0,
            v: 1.0,
        }
    }
}

impl PartialEq for ColorEntity {
    fn eq(&self, other: &Self) -> bool {
        self.h.to_bits() == other.h.to_bits()
            && self.s.to_bits() == other.s.to_bits()
            && self.v.to_bits() == other.v.to_bits()
    }
}

impl Eq for ColorEntity {}

/// One entry of the bounded, newest-first action history.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HistoryEntryEntity {
    /// Epoch milliseconds at which the action happened.
    pub at: u64,
    /// What kind of action this was.
    pub kind: HistoryKindEntity,
    /// Player the action applied to, when it targeted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u32>,
    /// Signed score delta, for score changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
}

/// Representation of a player stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player, unique within the registry.
    pub id: u32,
    /// Display name chosen for the player.
    pub name: String,
    /// Current score for the player.
    pub score: i64,
    /// HSV color assigned to the player.
    pub color: ColorEntity,
}

/// Persisted blob for the two-player duel variant.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DuelStateEntity {
    /// Blob format version.
    pub schema_version: u32,
    /// Player one's score.
    pub p1: i64,
    /// Player two's score.
    pub p2: i64,
    /// Player one's display name.
    pub p1_name: String,
    /// Player two's display name.
    pub p2_name: String,
    /// Increment step applied per score button press, always >= 1.
    pub step: i64,
    /// Selected theme.
    pub theme: ThemeEntity,
    /// Bounded action history, newest first.
    pub history: Vec<HistoryEntryEntity>,
}

impl Default for DuelStateEntity {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            p1: 0,
            p2: 0,
            p1_name: "Player 1".into(),
            p2_name: "Player 2".into(),
            step: 1,
            theme: ThemeEntity::Dark,
            history: Vec::new(),
        }
    }
}

/// Persisted blob for the multi-player match variant.
///
/// The timer-running flag is deliberately absent: a ticker task never
/// survives the process, so restored sessions always come back paused.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MatchStateEntity {
    /// Blob format version.
    pub schema_version: u32,
    /// Phase the session was in when last saved.
    pub phase: PhaseEntity,
    /// Ordered player registry.
    pub players: Vec<PlayerEntity>,
    /// Index of the player whose turn it is.
    pub current_turn_index: usize,
    /// Current round number, starting at 1.
    pub round: u32,
    /// Whole seconds of game time accrued so far.
    pub elapsed_seconds: u64,
    /// Selected theme.
    pub theme: ThemeEntity,
    /// Bounded action history, newest first.
    pub history: Vec<HistoryEntryEntity>,
}

impl Default for MatchStateEntity {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            phase: PhaseEntity::Setup,
            players: Vec::new(),
            current_turn_index: 0,
            round: 1,
            elapsed_seconds: 0,
            theme: ThemeEntity::Dark,
            history: Vec::new(),
        }
    }
}

/// Immutable record of one finished game.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GameRecordEntity {
    /// Primary key of the record.
    pub id: Uuid,
    /// Snapshot of the registry at the moment the game ended.
    pub players: Vec<PlayerEntity>,
    /// Names of every player sharing the top score.
    pub winner_names: Vec<String>,
    /// The top score itself.
    pub top_score: i64,
    /// Whether the game produced a single winner or a tie.
    pub outcome: OutcomeEntity,
    /// Epoch milliseconds at which the game ended.
    pub at: u64,
    /// Whole seconds the game lasted.
    pub duration_seconds: u64,
    /// Round counter when the game ended.
    pub round: u32,
}

/// Persisted append-only log of finished games.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecordLogEntity {
    /// Blob format version.
    pub schema_version: u32,
    /// Finished games, oldest first.
    pub records: Vec<GameRecordEntity>,
}

impl Default for RecordLogEntity {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            records: Vec::new(),
        }
    }
}

impl DuelStateEntity {
    /// Decode a duel blob, defaulting each field independently.
    pub fn decode(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(map) = value.as_object() else {
            return defaults;
        };

        Self {
            schema_version: u32_or(map, "schema_version", defaults.schema_version),
            p1: i64_or(map, "p1", defaults.p1),
            p2: i64_or(map, "p2", defaults.p2),
            p1_name: string_or(map, "p1_name", defaults.p1_name),
            p2_name: string_or(map, "p2_name", defaults.p2_name),
            step: i64_or(map, "step", defaults.step).max(1),
            theme: theme_or(map, "theme"),
            history: history_or(map, "history"),
        }
    }
}

impl MatchStateEntity {
    /// Decode a match blob, defaulting each field independently.
    ///
    /// Invariants are re-established on the way in: the round is at least 1
    /// and the turn index is reset to 0 when it does not point inside the
    /// decoded registry.
    pub fn decode(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(map) = value.as_object() else {
            return defaults;
        };

        let players = players_or(map, "players");
        let turn = usize_or(map, "current_turn_index", defaults.current_turn_index);
        let current_turn_index = if turn < players.len() { turn } else { 0 };

        Self {
            schema_version: u32_or(map, "schema_version", defaults.schema_version),
            phase: phase_or(map, "phase"),
            players,
            current_turn_index,
            round: u32_or(map, "round", defaults.round).max(1),
            elapsed_seconds: u64_or(map, "elapsed_seconds", defaults.elapsed_seconds),
            theme: theme_or(map, "theme"),
            history: history_or(map, "history"),
        }
    }
}

impl RecordLogEntity {
    /// Decode the finished-game log, skipping malformed records.
    pub fn decode(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(map) = value.as_object() else {
            return defaults;
        };

        let records = match map.get("records").and_then(Value::as_array) {
            Some(raw) => {
                let records: Vec<_> = raw.iter().filter_map(GameRecordEntity::decode).collect();
                if records.len() < raw.len() {
                    warn!(
                        skipped = raw.len() - records.len(),
                        "dropped malformed game records while loading"
                    );
                }
                records
            }
            None => Vec::new(),
        };

        Self {
            schema_version: u32_or(map, "schema_version", defaults.schema_version),
            records,
        }
    }
}

impl GameRecordEntity {
    /// Decode one stored game record; `None` when the record is unusable.
    fn decode(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())?;
        let outcome = match map.get("outcome").and_then(Value::as_str) {
            Some("winner") => OutcomeEntity::Winner,
            Some("tie") => OutcomeEntity::Tie,
            _ => return None,
        };

        Some(Self {
            id,
            players: players_or(map, "players"),
            winner_names: map
                .get("winner_names")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            top_score: i64_or(map, "top_score", 0),
            outcome,
            at: u64_or(map, "at", 0),
            duration_seconds: u64_or(map, "duration_seconds", 0),
            round: u32_or(map, "round", 1),
        })
    }
}

impl PlayerEntity {
    /// Decode one stored player; `None` when no usable id is present.
    fn decode(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let id = map
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|raw| u32::try_from(raw).ok())?;

        Some(Self {
            id,
            name: string_or(map, "name", "Player".into()),
            score: i64_or(map, "score", 0),
            color: color_or(map, "color"),
        })
    }
}

impl HistoryEntryEntity {
    /// Decode one stored history entry; `None` when the kind is unknown.
    fn decode(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let kind = match map.get("kind").and_then(Value::as_str) {
            Some("score_change") => HistoryKindEntity::ScoreChange,
            Some("reset") => HistoryKindEntity::Reset,
            Some("undo") => HistoryKindEntity::Undo,
            _ => return None,
        };

        Some(Self {
            at: u64_or(map, "at", 0),
            kind,
            player_id: map
                .get("player_id")
                .and_then(Value::as_u64)
                .and_then(|raw| u32::try_from(raw).ok()),
            delta: map.get("delta").and_then(Value::as_i64),
        })
    }
}

fn i64_or(map: &Map<String, Value>, key: &str, default: i64) -> i64 {
    map.get(key).and_then(Value::as_i64).unwrap_or(default)
}

fn u64_or(map: &Map<String, Value>, key: &str, default: u64) -> u64 {
    map.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn u32_or(map: &Map<String, Value>, key: &str, default: u32) -> u32 {
    map.get(key)
        .and_then(Value::as_u64)
        .and_then(|raw| u32::try_from(raw).ok())
        .unwrap_or(default)
}

fn usize_or(map: &Map<String, Value>, key: &str, default: usize) -> usize {
    map.get(key)
        .and_then(Value::as_u64)
        .and_then(|raw| usize::try_from(raw).ok())
        .unwrap_or(default)
}

fn f32_or(map: &Map<String, Value>, key: &str, default: f32) -> f32 {
    map.get(key)
        .and_then(Value::as_f64)
        .map(|raw| raw as f32)
        .unwrap_or(default)
}

fn string_or(map: &Map<String, Value>, key: &str, default: String) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or(default)
}

fn theme_or(map: &Map<String, Value>, key: &str) -> ThemeEntity {
    match map.get(key).and_then(Value::as_str) {
        Some("light") => ThemeEntity::Light,
        _ => ThemeEntity::Dark,
    }
}

fn phase_or(map: &Map<String, Value>, key: &str) -> PhaseEntity {
    match map.get(key).and_then(Value::as_str) {
        Some("playing") => PhaseEntity::Playing,
        Some("finished") => PhaseEntity::Finished,
        _ => PhaseEntity::Setup,
    }
}

fn color_or(map: &Map<String, Value>, key: &str) -> ColorEntity {
    let defaults = ColorEntity::default();
    let Some(color) = map.get(key).and_then(Value::as_object) else {
        return defaults;
    };

    ColorEntity {
        h: f32_or(color, "h", defaults.h),
        s: f32_or(color, "s", defaults.s),
        v: f32_or(color, "v", defaults.v),
    }
}

fn players_or(map: &Map<String, Value>, key: &str) -> Vec<PlayerEntity> {
    let Some(raw) = map.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };

    let players: Vec<_> = raw.iter().filter_map(PlayerEntity::decode).collect();
    if players.len() < raw.len() {
        warn!(
            skipped = raw.len() - players.len(),
            "dropped malformed players while loading"
        );
    }
    players
}

fn history_or(map: &Map<String, Value>, key: &str) -> Vec<HistoryEntryEntity> {
    let Some(raw) = map.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    raw.iter().filter_map(HistoryEntryEntity::decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duel_decode_of_empty_blob_yields_defaults() {
        let decoded = DuelStateEntity::decode(&json!({}));
        assert_eq!(decoded, DuelStateEntity::default());
        assert_eq!(decoded.p1_name, "Player 1");
        assert_eq!(decoded.step, 1);
        assert_eq!(decoded.theme, ThemeEntity::Dark);
    }

    #[test]
    fn duel_decode_keeps_fields_that_parsed() {
        let decoded = DuelStateEntity::decode(&json!({
            "p1": 3,
            "p2": -2,
            "step": 5,
            "theme": "light",
            "p2_name": ["not", "a", "string"],
        }));
        assert_eq!(decoded.p1, 3);
        assert_eq!(decoded.p2, -2);
        assert_eq!(decoded.step, 5);
        assert_eq!(decoded.theme, ThemeEntity::Light);
        // Wrong-typed field falls back on its own, not the whole blob.
        assert_eq!(decoded.p2_name, "Player 2");
    }

    #[test]
    fn duel_decode_clamps_step_to_one() {
        let decoded = DuelStateEntity::decode(&json!({"step": 0}));
        assert_eq!(decoded.step, 1);
        let decoded = DuelStateEntity::decode(&json!({"step": -4}));
        assert_eq!(decoded.step, 1);
    }

    #[test]
    fn duel_round_trips_through_serialization() {
        let entity = DuelStateEntity {
            p1: 42,
            p2: -7,
            p1_name: "Ada".into(),
            p2_name: "Grace".into(),
            step: 5,
            theme: ThemeEntity::Light,
            history: vec![HistoryEntryEntity {
                at: 1_700_000_000_000,
                kind: HistoryKindEntity::ScoreChange,
                player_id: Some(1),
                delta: Some(5),
            }],
            ..DuelStateEntity::default()
        };

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(DuelStateEntity::decode(&value), entity);
    }

    #[test]
    fn match_decode_resets_out_of_bounds_turn_index() {
        let decoded = MatchStateEntity::decode(&json!({
            "players": [
                {"id": 1, "name": "A", "score": 4},
                {"id": 2, "name": "B", "score": 9},
            ],
            "current_turn_index": 5,
        }));
        assert_eq!(decoded.players.len(), 2);
        assert_eq!(decoded.current_turn_index, 0);
    }

    #[test]
    fn match_decode_skips_malformed_players() {
        let decoded = MatchStateEntity::decode(&json!({
            "players": [
                {"id": 1, "name": "A"},
                {"name": "no id"},
                "garbage",
            ],
        }));
        assert_eq!(decoded.players.len(), 1);
        assert_eq!(decoded.players[0].id, 1);
        assert_eq!(decoded.players[0].score, 0);
    }

    #[test]
    fn match_round_trips_through_serialization() {
        let entity = MatchStateEntity {
            phase: PhaseEntity::Playing,
            players: vec![PlayerEntity {
                id: 3,
                name: "Ada".into(),
                score: 12,
                color: ColorEntity::default(),
            }],
            current_turn_index: 0,
            round: 4,
            elapsed_seconds: 90,
            theme: ThemeEntity::Light,
            ..MatchStateEntity::default()
        };

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(MatchStateEntity::decode(&value), entity);
    }

    #[test]
    fn record_log_skips_records_without_valid_id() {
        let good = Uuid::new_v4();
        let decoded = RecordLogEntity::decode(&json!({
            "records": [
                {"id": good.to_string(), "outcome": "tie", "top_score": 10},
                {"id": "not-a-uuid", "outcome": "winner"},
                {"outcome": "winner"},
            ],
        }));
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].id, good);
        assert_eq!(decoded.records[0].outcome, OutcomeEntity::Tie);
    }

    #[test]
    fn history_entries_with_unknown_kind_are_dropped() {
        let decoded = DuelStateEntity::decode(&json!({
            "history": [
                {"at": 1, "kind": "score_change", "player_id": 1, "delta": -2},
                {"at": 2, "kind": "mystery"},
                {"at": 3, "kind": "undo"},
            ],
        }));
        assert_eq!(decoded.history.len(), 2);
        assert_eq!(decoded.history[0].kind, HistoryKindEntity::ScoreChange);
        assert_eq!(decoded.history[1].kind, HistoryKindEntity::Undo);
    }
}
