//! Bounded action history and the undo snapshot stack.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::dao::models::{HistoryEntryEntity, HistoryKindEntity};

/// Maximum number of entries the visible action history retains.
pub const HISTORY_CAP: usize = 50;

/// What kind of action a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// A signed delta was applied to one player's score.
    ScoreChange,
    /// All scores were reset.
    Reset,
    /// The previous snapshot was restored.
    Undo,
}

/// One human-visible record of an applied action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Epoch milliseconds at which the action happened.
    pub at: u64,
    /// What kind of action this was.
    pub kind: HistoryKind,
    /// Player the action applied to, when it targeted one.
    pub player_id: Option<u32>,
    /// Signed score delta, for score changes.
    pub delta: Option<i64>,
}

impl HistoryEntry {
    /// Entry for a score delta applied to `player_id`.
    pub fn score_change(player_id: u32, delta: i64) -> Self {
        Self {
            at: now_millis(),
            kind: HistoryKind::ScoreChange,
            player_id: Some(player_id),
            delta: Some(delta),
        }
    }

    /// Entry for a confirmed reset.
    pub fn reset() -> Self {
        Self {
            at: now_millis(),
            kind: HistoryKind::Reset,
            player_id: None,
            delta: None,
        }
    }

    /// Entry for a successful undo.
    pub fn undo() -> Self {
        Self {
            at: now_millis(),
            kind: HistoryKind::Undo,
            player_id: None,
            delta: None,
        }
    }
}

/// Newest-first action history capped at [`HISTORY_CAP`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLog {
    entries: VecDeque<HistoryEntry>,
}

impl ActionLog {
    /// Prepend an entry, dropping the oldest once the cap is reached.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_CAP);
    }

    /// Iterate entries newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// LIFO stack of full state snapshots taken before each mutation.
///
/// Snapshots live only in memory: they are never persisted, and the stack is
/// emptied wholesale by a confirmed reset.
#[derive(Debug, Clone)]
pub struct UndoStack<S> {
    entries: Vec<S>,
}

// Manual impl: an empty stack needs no `S: Default`.
impl<S> Default for UndoStack<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S> UndoStack<S> {
    /// Push a pre-mutation snapshot.
    pub fn push(&mut self, snapshot: S) {
        self.entries.push(snapshot);
    }

    /// Pop the most recent snapshot, if any.
    pub fn pop(&mut self) -> Option<S> {
        self.entries.pop()
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether the stack holds no snapshots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

impl From<HistoryKindEntity> for HistoryKind {
    fn from(value: HistoryKindEntity) -> Self {
        match value {
            HistoryKindEntity::ScoreChange => HistoryKind::ScoreChange,
            HistoryKindEntity::Reset => HistoryKind::Reset,
            HistoryKindEntity::Undo => HistoryKind::Undo,
        }
    }
}

impl From<HistoryKind> for HistoryKindEntity {
    fn from(value: HistoryKind) -> Self {
        match value {
            HistoryKind::ScoreChange => HistoryKindEntity::ScoreChange,
            HistoryKind::Reset => HistoryKindEntity::Reset,
            HistoryKind::Undo => HistoryKindEntity::Undo,
        }
    }
}

impl From<HistoryEntryEntity> for HistoryEntry {
    fn from(value: HistoryEntryEntity) -> Self {
        Self {
            at: value.at,
            kind: value.kind.into(),
            player_id: value.player_id,
            delta: value.delta,
        }
    }
}

impl From<HistoryEntry> for HistoryEntryEntity {
    fn from(value: HistoryEntry) -> Self {
        Self {
            at: value.at,
            kind: value.kind.into(),
            player_id: value.player_id,
            delta: value.delta,
        }
    }
}

impl From<Vec<HistoryEntryEntity>> for ActionLog {
    fn from(value: Vec<HistoryEntryEntity>) -> Self {
        let mut entries: VecDeque<HistoryEntry> =
            value.into_iter().map(Into::into).collect();
        entries.truncate(HISTORY_CAP);
        Self { entries }
    }
}

impl From<ActionLog> for Vec<HistoryEntryEntity> {
    fn from(value: ActionLog) -> Self {
        value.entries.into_iter().map(Into::into).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_capped_and_newest_first() {
        let mut log = ActionLog::default();
        for delta in 0..55 {
            log.push(HistoryEntry::score_change(1, delta));
        }

        assert_eq!(log.len(), HISTORY_CAP);
        let deltas: Vec<i64> = log.iter().filter_map(|entry| entry.delta).collect();
        assert_eq!(deltas.first(), Some(&54));
        assert_eq!(deltas.last(), Some(&5));
    }

    #[test]
    fn empty_stack_does_not_require_default_snapshots() {
        struct Snapshot(#[allow(dead_code)] i64);
        let stack: UndoStack<Snapshot> = UndoStack::default();
        assert!(stack.is_empty());
    }

    #[test]
    fn undo_stack_is_lifo_and_clearable() {
        let mut stack = UndoStack::default();
        stack.push(1);
        stack.push(2);
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);

        stack.push(3);
        stack.clear();
        assert!(stack.is_empty());
    }

    #[test]
    fn oversized_persisted_history_is_truncated_on_load() {
        let entities: Vec<HistoryEntryEntity> = (0..60)
            .map(|delta| HistoryEntry::score_change(1, delta).into())
            .collect();
        let log: ActionLog = entities.into();
        assert_eq!(log.len(), HISTORY_CAP);
    }
}
