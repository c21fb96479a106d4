//! The persistence gateway: one-time restore at startup, fire-and-forget
//! saves after every state change, and the history-clearing merge.
//!
//! Every path here fails soft. A missing or malformed blob restores
//! defaults, a failed write is logged and never retried, and neither ever
//! surfaces to the user; the in-memory state stays authoritative even when
//! the durable copy is stale.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    dao::{
        models::{DuelStateEntity, MatchStateEntity, RecordLogEntity, SCHEMA_VERSION},
        storage::{StorageError, StorageResult},
        store::StateStore,
    },
    error::ServiceError,
    state::{
        SharedState,
        game::MatchSession,
        seed_default_roster,
        state_machine::SessionPhase,
    },
};

/// Storage key for the duel variant's blob.
pub const DUEL_STATE_KEY: &str = "duel_state";
/// Storage key for the match variant's blob.
pub const MATCH_STATE_KEY: &str = "match_state";
/// Storage key for the finished-game log.
pub const MATCH_RECORDS_KEY: &str = "match_records";

/// Load every persisted blob into the shared state, once at startup.
///
/// Absent or unreadable blobs leave the corresponding defaults in place;
/// partially corrupt blobs restore field by field (see `dao::models`).
pub async fn restore(state: &SharedState) {
    let Some(store) = state.store().await else {
        debug!("no store installed; starting from defaults");
        return;
    };

    if let Some(value) = fetch(store.as_ref(), DUEL_STATE_KEY).await {
        let entity = DuelStateEntity::decode(&value);
        *state.duel().write().await = entity.into();
    }

    if let Some(value) = fetch(store.as_ref(), MATCH_STATE_KEY).await {
        let entity = MatchStateEntity::decode(&value);
        let phase: SessionPhase = entity.phase.into();
        let mut session: MatchSession = entity.into();
        seed_default_roster(&mut session, state.config());
        // The ticker does not survive the process: a session saved
        // mid-game comes back in Playing but paused.
        session.timer_running = false;
        if phase == SessionPhase::Finished {
            session.result = Some(session.final_result());
        }
        *state.session().write().await = session;
        state.machine().write().await.restore(phase);
    }

    if let Some(value) = fetch(store.as_ref(), MATCH_RECORDS_KEY).await {
        let entity = RecordLogEntity::decode(&value);
        *state.records().write().await = entity.records.into_iter().map(Into::into).collect();
    }
}

/// Persist the duel blob in the background; failures are logged only.
pub fn schedule_duel_save(state: &SharedState) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = save_duel(&state).await {
            warn!(error = %err, "failed to persist duel state");
        }
    });
}

/// Persist the match blob in the background; failures are logged only.
pub fn schedule_match_save(state: &SharedState) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = save_match(&state).await {
            warn!(error = %err, "failed to persist match state");
        }
    });
}

/// Persist the finished-game log in the background; failures are logged only.
pub fn schedule_records_save(state: &SharedState) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = save_records(&state).await {
            warn!(error = %err, "failed to persist game records");
        }
    });
}

/// Write every blob and wait for the result.
///
/// For shells that want a synchronous save on backgrounding or teardown
/// instead of relying on the scheduled writes having landed.
pub async fn flush(state: &SharedState) -> Result<(), ServiceError> {
    save_duel(state).await?;
    save_match(state).await?;
    save_records(state).await?;
    Ok(())
}

/// Empty the duel history and patch it out of the stored blob without
/// disturbing the other persisted fields.
pub async fn clear_duel_history(state: &SharedState) {
    state.duel().write().await.history.clear();
    merge_empty_history(state, DUEL_STATE_KEY).await;
}

/// Empty the match history and patch it out of the stored blob without
/// disturbing the other persisted fields.
pub async fn clear_match_history(state: &SharedState) {
    state.session().write().await.history.clear();
    merge_empty_history(state, MATCH_STATE_KEY).await;
}

async fn merge_empty_history(state: &SharedState, key: &str) {
    let Some(store) = state.store().await else {
        return;
    };
    if let Err(err) = store.merge(key, r#"{"history":[]}"#.into()).await {
        warn!(key, error = %err, "failed to clear persisted history");
    }
}

async fn fetch(store: &dyn StateStore, key: &str) -> Option<Value> {
    match store.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "stored blob is not valid JSON; using defaults");
                None
            }
        },
        Ok(None) => {
            debug!(key, "no saved state");
            None
        }
        Err(err) => {
            warn!(key, error = %err, "failed to read saved state; using defaults");
            None
        }
    }
}

async fn save_duel(state: &SharedState) -> StorageResult<()> {
    let Some(store) = state.store().await else {
        debug!("no store installed; skipping duel save");
        return Ok(());
    };
    let entity: DuelStateEntity = state.duel().read().await.clone().into();
    store.set(DUEL_STATE_KEY, encode(&entity)?).await
}

async fn save_match(state: &SharedState) -> StorageResult<()> {
    let Some(store) = state.store().await else {
        debug!("no store installed; skipping match save");
        return Ok(());
    };
    let phase = state.phase().await;
    let session = state.session().read().await.clone();
    let entity: MatchStateEntity = (session, phase).into();
    store.set(MATCH_STATE_KEY, encode(&entity)?).await
}

async fn save_records(state: &SharedState) -> StorageResult<()> {
    let Some(store) = state.store().await else {
        debug!("no store installed; skipping records save");
        return Ok(());
    };
    let records = state.records().read().await.clone();
    let entity = RecordLogEntity {
        schema_version: SCHEMA_VERSION,
        records: records.into_iter().map(Into::into).collect(),
    };
    store.set(MATCH_RECORDS_KEY, encode(&entity)?).await
}

fn encode<T: Serialize>(entity: &T) -> StorageResult<String> {
    serde_json::to_string(entity)
        .map_err(|err| StorageError::unavailable("encoding state blob".into(), err))
}
