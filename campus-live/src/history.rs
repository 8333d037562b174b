//! History Recorder
//!
//! Builds an immutable [`HistoryRecord`] from each completed pass and
//! appends it. Under [`HistoryPolicy::EveryEvent`] every pass is recorded;
//! [`HistoryPolicy::Interval`] keeps at most one record per space per
//! interval, measured from the newest stored record.

use crate::db::HistoryStore;
use crate::model::{HistoryRecord, LiveState, Space};
use crate::Result;
use campus_common::config::{HistoryConfig, HistoryPolicyKind};
use campus_common::time::day_of_week;
use chrono::{Duration, FixedOffset};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPolicy {
    #[default]
    EveryEvent,
    Interval(Duration),
}

impl HistoryPolicy {
    pub fn from_config(config: &HistoryConfig) -> Self {
        match config.policy {
            HistoryPolicyKind::EveryEvent => HistoryPolicy::EveryEvent,
            HistoryPolicyKind::Interval => {
                HistoryPolicy::Interval(Duration::minutes(config.interval_minutes as i64))
            }
        }
    }
}

pub struct HistoryRecorder {
    store: Arc<dyn HistoryStore>,
    policy: HistoryPolicy,
    offset: FixedOffset,
}

impl HistoryRecorder {
    /// `offset` decides the day of week stamped on each record
    pub fn new(store: Arc<dyn HistoryStore>, policy: HistoryPolicy, offset: FixedOffset) -> Self {
        Self {
            store,
            policy,
            offset,
        }
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// Append a record for the pass that produced `state`
    ///
    /// Returns `Ok(None)` when the policy skipped this pass.
    pub async fn record(&self, space: &Space, state: &LiveState) -> Result<Option<HistoryRecord>> {
        if let HistoryPolicy::Interval(interval) = self.policy {
            let newest = self.store.query_recent(&space.space_id, 1).await?;
            if let Some(last) = newest.first() {
                if state.timestamp() - last.timestamp < interval {
                    debug!(
                        space_id = %space.space_id,
                        last = %last.timestamp,
                        "History interval not yet elapsed; skipping record"
                    );
                    return Ok(None);
                }
            }
        }

        let record = HistoryRecord {
            guid: Uuid::new_v4(),
            space_id: space.space_id.clone(),
            occupancy: state.occupancy(),
            capacity: space.capacity,
            is_ghost: state.is_ghost(),
            day_of_week: day_of_week(&state.timestamp(), &self.offset),
            timestamp: state.timestamp(),
        };

        self.store.append(&record).await?;
        Ok(Some(record))
    }

    /// Most recent records for a space, newest first
    pub async fn query_recent(&self, space_id: &str, limit: u32) -> Result<Vec<HistoryRecord>> {
        self.store.query_recent(space_id, limit).await
    }
}
