//! Storage seams for the live-occupancy core
//!
//! Traits describe what the core needs from storage; the SQLite
//! implementations live in the submodules.

use crate::model::{HistoryRecord, LiveState, Space};
use crate::Result;
use async_trait::async_trait;

mod history;
mod spaces;

pub use history::SqliteHistoryStore;
pub use spaces::SqliteSpaceStore;

/// Read-only view of provisioned spaces
#[async_trait]
pub trait SpaceDirectory: Send + Sync {
    /// Space bound to `sensor_id`, if any
    async fn find_by_sensor(&self, sensor_id: &str) -> Result<Option<Space>>;

    async fn get(&self, space_id: &str) -> Result<Option<Space>>;

    /// All spaces ordered by id
    async fn list(&self) -> Result<Vec<Space>>;
}

/// Durable copy of each space's live state
#[async_trait]
pub trait LiveStateRepository: Send + Sync {
    async fn load(&self, space_id: &str) -> Result<Option<LiveState>>;

    /// Insert or replace the row for `space_id`
    async fn save(&self, space_id: &str, state: &LiveState) -> Result<()>;
}

/// Append-only history log
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: &HistoryRecord) -> Result<()>;

    /// Newest first, at most `limit` records
    async fn query_recent(&self, space_id: &str, limit: u32) -> Result<Vec<HistoryRecord>>;
}
