//! Per-space live-state store
//!
//! One slot per space, each behind its own async mutex. Holding a
//! [`SpaceGuard`] is the only way to replace a space's [`LiveState`], so
//! passes for one space are serialized while passes for different spaces
//! run in parallel. Slots hydrate lazily from the [`LiveStateRepository`]
//! and every replacement is written through to it.

use crate::db::LiveStateRepository;
use crate::model::LiveState;
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Default)]
struct Slot {
    hydrated: bool,
    state: Option<LiveState>,
}

/// Owner of every space's live state
pub struct LiveStateStore {
    repository: Arc<dyn LiveStateRepository>,
    slots: Mutex<HashMap<String, Arc<AsyncMutex<Slot>>>>,
}

impl LiveStateStore {
    pub fn new(repository: Arc<dyn LiveStateRepository>) -> Self {
        Self {
            repository,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, space_id: &str) -> Arc<AsyncMutex<Slot>> {
        // The map lock is never held across an await
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(space_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Slot::default())))
            .clone()
    }

    /// Take exclusive ownership of one space's state
    ///
    /// Waits for any pass already holding the space. Fails when the stored
    /// state cannot be loaded; the slot stays unhydrated and the load is
    /// attempted again on the next lock.
    pub async fn lock(&self, space_id: &str) -> Result<SpaceGuard> {
        let mut slot = self.slot(space_id).lock_owned().await;

        if !slot.hydrated {
            let state = self.repository.load(space_id).await?;
            debug!(space_id = %space_id, found = state.is_some(), "Hydrated live state");
            slot.state = state;
            slot.hydrated = true;
        }

        Ok(SpaceGuard {
            space_id: space_id.to_string(),
            slot,
            repository: Arc::clone(&self.repository),
        })
    }

    /// Copy of the current state, if the space has ever been reconciled
    pub async fn snapshot(&self, space_id: &str) -> Result<Option<LiveState>> {
        Ok(self.lock(space_id).await?.current().cloned())
    }
}

/// Exclusive handle on one space's live state
pub struct SpaceGuard {
    space_id: String,
    slot: OwnedMutexGuard<Slot>,
    repository: Arc<dyn LiveStateRepository>,
}

impl SpaceGuard {
    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn current(&self) -> Option<&LiveState> {
        self.slot.state.as_ref()
    }

    /// Replace the state and write it through
    ///
    /// The in-memory state is replaced even when the write fails; the error
    /// is returned for the caller to log.
    pub async fn replace(&mut self, state: LiveState) -> Result<()> {
        let written = self.repository.save(&self.space_id, &state).await;
        self.slot.state = Some(state);
        self.slot.hydrated = true;
        written
    }
}
