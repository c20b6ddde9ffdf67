use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{DeviceKey, DeviceRecord, DeviceStore, StorageError};

#[async_trait]
impl DeviceStore for SqliteRepository {
    async fn load(&self, key: &DeviceKey) -> Result<Option<DeviceRecord>, StorageError> {
        let row = sqlx::query("SELECT payload FROM quiz_device_state WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row
            .try_get("payload")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        DeviceRecord::decode(&payload).map(Some)
    }

    async fn save(&self, key: &DeviceKey, record: &DeviceRecord) -> Result<(), StorageError> {
        let payload = record.encode()?;
        sqlx::query(
            r"
            INSERT INTO quiz_device_state (key, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key.as_str())
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn remove(&self, key: &DeviceKey) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM quiz_device_state WHERE key = ?1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
