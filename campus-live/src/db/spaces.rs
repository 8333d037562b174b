//! SQLite-backed space directory and live-state repository

use super::{LiveStateRepository, SpaceDirectory};
use crate::model::{LiveState, Space};
use crate::Result;
use async_trait::async_trait;
use campus_common::time::{from_db_timestamp, to_db_timestamp};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SPACE_COLUMNS: &str = "space_id, name, kind, capacity, sensor_id, calendar_id";

/// Space and live-state queries over the shared pool
#[derive(Clone)]
pub struct SqliteSpaceStore {
    db: SqlitePool,
}

impl SqliteSpaceStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn space_from_row(row: &SqliteRow) -> Space {
    Space {
        space_id: row.get("space_id"),
        name: row.get("name"),
        kind: row.get("kind"),
        capacity: row.get::<i64, _>("capacity").max(0) as u32,
        sensor_id: row.get("sensor_id"),
        calendar_id: row.get("calendar_id"),
    }
}

#[async_trait]
impl SpaceDirectory for SqliteSpaceStore {
    async fn find_by_sensor(&self, sensor_id: &str) -> Result<Option<Space>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM spaces WHERE sensor_id = ?",
            SPACE_COLUMNS
        ))
        .bind(sensor_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.as_ref().map(space_from_row))
    }

    async fn get(&self, space_id: &str) -> Result<Option<Space>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM spaces WHERE space_id = ?",
            SPACE_COLUMNS
        ))
        .bind(space_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.as_ref().map(space_from_row))
    }

    async fn list(&self) -> Result<Vec<Space>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM spaces ORDER BY space_id",
            SPACE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(space_from_row).collect())
    }
}

#[async_trait]
impl LiveStateRepository for SqliteSpaceStore {
    async fn load(&self, space_id: &str) -> Result<Option<LiveState>> {
        let row = sqlx::query(
            "SELECT occupancy, is_ghost, calendar_degraded, updated_at FROM live_state WHERE space_id = ?",
        )
        .bind(space_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let updated_at = from_db_timestamp(&row.get::<String, _>("updated_at"))?;
        Ok(Some(LiveState::restore(
            row.get::<i64, _>("occupancy").max(0) as u32,
            row.get::<bool, _>("is_ghost"),
            updated_at,
            row.get::<bool, _>("calendar_degraded"),
        )))
    }

    async fn save(&self, space_id: &str, state: &LiveState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO live_state (space_id, occupancy, occupied, is_ghost, calendar_degraded, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(space_id) DO UPDATE SET
                occupancy = excluded.occupancy,
                occupied = excluded.occupied,
                is_ghost = excluded.is_ghost,
                calendar_degraded = excluded.calendar_degraded,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(space_id)
        .bind(state.occupancy() as i64)
        .bind(state.occupied())
        .bind(state.is_ghost())
        .bind(state.calendar_degraded())
        .bind(to_db_timestamp(&state.timestamp()))
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_common::config::SpaceConfig;
    use campus_common::db::{init_memory_database, provision_spaces};
    use chrono::{TimeZone, Utc};

    async fn setup_store() -> SqliteSpaceStore {
        let pool = init_memory_database().await.unwrap();
        provision_spaces(
            &pool,
            &[
                SpaceConfig {
                    space_id: "S2".to_string(),
                    name: "Seminar Hall".to_string(),
                    kind: "Seminar Hall".to_string(),
                    capacity: 120,
                    sensor_id: None,
                    calendar_id: None,
                },
                SpaceConfig {
                    space_id: "S1".to_string(),
                    name: "Chemistry Lab 101".to_string(),
                    kind: "Laboratory".to_string(),
                    capacity: 40,
                    sensor_id: Some("CAM_001".to_string()),
                    calendar_id: Some("cal-s1".to_string()),
                },
            ],
        )
        .await
        .unwrap();
        SqliteSpaceStore::new(pool)
    }

    #[tokio::test]
    async fn test_find_by_sensor() {
        let store = setup_store().await;

        let space = store.find_by_sensor("CAM_001").await.unwrap().unwrap();
        assert_eq!(space.space_id, "S1");
        assert_eq!(space.capacity, 40);
        assert_eq!(space.calendar_id.as_deref(), Some("cal-s1"));

        assert!(store.find_by_sensor("CAM_999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered() {
        let store = setup_store().await;
        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|s| s.space_id).collect();
        assert_eq!(ids, vec!["S1", "S2"]);
        assert!(store.get("S3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_state_save_and_load() {
        let store = setup_store().await;
        assert!(store.load("S1").await.unwrap().is_none());

        let ts = Utc.with_ymd_and_hms(2026, 1, 16, 4, 30, 0).unwrap();
        store.save("S1", &LiveState::derive(0, true, ts, false)).await.unwrap();
        let later = ts + chrono::Duration::seconds(5);
        store.save("S1", &LiveState::derive(7, true, later, true)).await.unwrap();

        let loaded = store.load("S1").await.unwrap().unwrap();
        assert_eq!(loaded, LiveState::derive(7, true, later, true));
        assert!(!loaded.is_ghost());
    }
}
