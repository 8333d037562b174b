//! SQLite-backed history log

use super::HistoryStore;
use crate::model::HistoryRecord;
use crate::Result;
use async_trait::async_trait;
use campus_common::time::{from_db_timestamp, to_db_timestamp};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// History rows are only ever inserted and read
#[derive(Clone)]
pub struct SqliteHistoryStore {
    db: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, record: &HistoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history (guid, space_id, occupancy, capacity, is_ghost, day_of_week, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.guid.to_string())
        .bind(&record.space_id)
        .bind(record.occupancy as i64)
        .bind(record.capacity as i64)
        .bind(record.is_ghost)
        .bind(&record.day_of_week)
        .bind(to_db_timestamp(&record.timestamp))
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn query_recent(&self, space_id: &str, limit: u32) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT guid, space_id, occupancy, capacity, is_ghost, day_of_week, recorded_at
            FROM history
            WHERE space_id = ?
            ORDER BY recorded_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(space_id)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let guid: String = row.get("guid");
            records.push(HistoryRecord {
                guid: Uuid::parse_str(&guid).map_err(|e| {
                    campus_common::Error::CorruptRecord(format!("Bad history guid '{}': {}", guid, e))
                })?,
                space_id: row.get("space_id"),
                occupancy: row.get::<i64, _>("occupancy").max(0) as u32,
                capacity: row.get::<i64, _>("capacity").max(0) as u32,
                is_ghost: row.get("is_ghost"),
                day_of_week: row.get("day_of_week"),
                timestamp: from_db_timestamp(&row.get::<String, _>("recorded_at"))?,
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_common::db::init_memory_database;
    use chrono::{Duration, TimeZone, Utc};

    fn record(space_id: &str, occupancy: u32, minutes: i64) -> HistoryRecord {
        HistoryRecord {
            guid: Uuid::new_v4(),
            space_id: space_id.to_string(),
            occupancy,
            capacity: 40,
            is_ghost: occupancy == 0,
            day_of_week: "Fri".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 16, 4, 0, 0).unwrap() + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn test_query_recent_newest_first_with_limit() {
        let store = SqliteHistoryStore::new(init_memory_database().await.unwrap());

        for (occupancy, minutes) in [(1, 0), (2, 10), (3, 5), (4, 20)] {
            store.append(&record("S1", occupancy, minutes)).await.unwrap();
        }
        store.append(&record("S2", 9, 30)).await.unwrap();

        let recent = store.query_recent("S1", 3).await.unwrap();
        let occupancies: Vec<u32> = recent.iter().map(|r| r.occupancy).collect();
        assert_eq!(occupancies, vec![4, 2, 3]);
        assert!(recent.iter().all(|r| r.space_id == "S1"));
    }

    #[tokio::test]
    async fn test_record_fields_roundtrip() {
        let store = SqliteHistoryStore::new(init_memory_database().await.unwrap());
        let original = record("S1", 0, 0);

        store.append(&original).await.unwrap();
        let loaded = store.query_recent("S1", 10).await.unwrap();

        assert_eq!(loaded, vec![original]);
    }

    #[tokio::test]
    async fn test_duplicate_guid_rejected() {
        let store = SqliteHistoryStore::new(init_memory_database().await.unwrap());
        let original = record("S1", 0, 0);

        store.append(&original).await.unwrap();
        assert!(store.append(&original).await.is_err());
    }
}
