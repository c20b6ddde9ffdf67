use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AnswerStore, ContentKey, Question, QuizKind, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── SESSION CACHE (tier 1) ────────────────────────────────────────────────────
//

/// Snapshot of one quiz instance, keyed by its stable content key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: ContentKey,
    pub kind: QuizKind,
    pub task_id: Option<TaskId>,
    pub questions: Vec<Question>,
    pub answers: AnswerStore,
    pub completed: bool,
    pub saved_at: DateTime<Utc>,
}

/// Session-scoped cache shared by every remount inside one editing surface.
///
/// Reads and writes are synchronous so a hit can be applied before any
/// asynchronous recovery path starts.
pub trait SessionCache: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be read.
    fn get(&self, key: &ContentKey) -> Result<Option<CacheEntry>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    fn set(&self, entry: CacheEntry) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be removed.
    fn delete(&self, key: &ContentKey) -> Result<(), StorageError>;
}

/// Bounded in-memory cache; the oldest entry is evicted when full.
///
/// Owned by the editing surface and dropped (or cleared) with it.
#[derive(Clone)]
pub struct InMemorySessionCache {
    entries: Arc<Mutex<HashMap<ContentKey, CacheEntry>>>,
    capacity: usize,
}

impl InMemorySessionCache {
    pub const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |guard| guard.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// End of the editing surface: forget every entry.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        }
    }
}

impl Default for InMemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemorySessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySessionCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl SessionCache for InMemorySessionCache {
    fn get(&self, key: &ContentKey) -> Result<Option<CacheEntry>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, entry: CacheEntry) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if !guard.contains_key(&entry.key) && guard.len() >= self.capacity {
            let oldest = guard
                .values()
                .min_by_key(|cached| cached.saved_at)
                .map(|cached| cached.key.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(key = %oldest, "evicting oldest session cache entry");
                guard.remove(&oldest);
            }
        }

        guard.insert(entry.key.clone(), entry);
        Ok(())
    }

    fn delete(&self, key: &ContentKey) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

//
// ─── DEVICE STORE (tier 4) ─────────────────────────────────────────────────────
//

/// Device-local storage key: `"<quiz-type>-quiz-state-<taskId>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey(String);

impl DeviceKey {
    #[must_use]
    pub fn new(kind: QuizKind, task_id: TaskId) -> Self {
        Self(format!("{}-quiz-state-{}", kind.as_str(), task_id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted shape of a confirmed submission.
///
/// Answers stay loosely typed here; readers normalize them against the
/// current questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub submitted_answers: Map<String, Value>,
    pub is_completed: bool,
}

impl DeviceRecord {
    /// Build a completed record from canonical answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the answers cannot be encoded.
    pub fn completed(answers: &AnswerStore) -> Result<Self, StorageError> {
        match serde_json::to_value(answers).map_err(|e| StorageError::Serialization(e.to_string()))? {
            Value::Object(submitted_answers) => Ok(Self {
                submitted_answers,
                is_completed: true,
            }),
            other => Err(StorageError::Serialization(format!(
                "answers encoded as {other}, expected an object"
            ))),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn encode(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed payloads.
    pub fn decode(payload: &str) -> Result<Self, StorageError> {
        serde_json::from_str(payload).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Device-local persistent store of confirmed submissions.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Fetch the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store is unavailable or the payload is malformed.
    async fn load(&self, key: &DeviceKey) -> Result<Option<DeviceRecord>, StorageError>;

    /// Persist or replace the record under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save(&self, key: &DeviceKey, record: &DeviceRecord) -> Result<(), StorageError>;

    /// Remove the record under `key`; missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store is unavailable.
    async fn remove(&self, key: &DeviceKey) -> Result<(), StorageError>;
}

/// In-memory device store holding serialized payloads, like a browser's
/// local storage would.
#[derive(Clone, Default)]
pub struct InMemoryDeviceStore {
    payloads: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryDeviceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw payload, bypassing encoding. Used to seed corrupted data.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_raw(&self, key: &DeviceKey, payload: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .payloads
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.as_str().to_string(), payload.into());
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn load(&self, key: &DeviceKey) -> Result<Option<DeviceRecord>, StorageError> {
        let payload = {
            let guard = self
                .payloads
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard.get(key.as_str()).cloned()
        };
        payload.as_deref().map(DeviceRecord::decode).transpose()
    }

    async fn save(&self, key: &DeviceKey, record: &DeviceRecord) -> Result<(), StorageError> {
        let payload = record.encode()?;
        self.insert_raw(key, payload)
    }

    async fn remove(&self, key: &DeviceKey) -> Result<(), StorageError> {
        let mut guard = self
            .payloads
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key.as_str());
        Ok(())
    }
}

/// Storage handles behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub device: Arc<dyn DeviceStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            device: Arc::new(InMemoryDeviceStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Answer, QuestionId};
    use quiz_core::time::fixed_now;

    fn entry(key: &str, age_secs: i64) -> CacheEntry {
        CacheEntry {
            key: key.parse().unwrap(),
            kind: QuizKind::Flashcard,
            task_id: None,
            questions: Vec::new(),
            answers: AnswerStore::new(),
            completed: false,
            saved_at: fixed_now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn device_key_format() {
        let key = DeviceKey::new(QuizKind::FillBlank, TaskId::new(12));
        assert_eq!(key.as_str(), "fill-blank-quiz-state-12");
    }

    #[test]
    fn cache_evicts_oldest_when_full() {
        let cache = InMemorySessionCache::with_capacity(2);
        cache.set(entry("old", 100)).unwrap();
        cache.set(entry("mid", 50)).unwrap();
        cache.set(entry("new", 0)).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"old".parse().unwrap()).unwrap().is_none());
        assert!(cache.get(&"mid".parse().unwrap()).unwrap().is_some());
    }

    #[test]
    fn cache_overwrite_does_not_evict() {
        let cache = InMemorySessionCache::with_capacity(2);
        cache.set(entry("a", 10)).unwrap();
        cache.set(entry("b", 5)).unwrap();
        cache.set(entry("a", 0)).unwrap();
        assert_eq!(cache.len(), 2);

        cache.delete(&"a".parse().unwrap()).unwrap();
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn device_record_uses_camel_case() {
        let answers: AnswerStore = [(QuestionId::from("q1"), Answer::Text("Paris".into()))]
            .into_iter()
            .collect();
        let record = DeviceRecord::completed(&answers).unwrap();
        let encoded = record.encode().unwrap();
        assert_eq!(encoded, r#"{"submittedAnswers":{"q1":"Paris"},"isCompleted":true}"#);
        assert_eq!(DeviceRecord::decode(&encoded).unwrap(), record);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_serialization_error() {
        let store = InMemoryDeviceStore::new();
        let key = DeviceKey::new(QuizKind::Ranking, TaskId::new(1));
        store.insert_raw(&key, "{not json").unwrap();

        let err = store.load(&key).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));

        store.remove(&key).await.unwrap();
        assert!(store.load(&key).await.unwrap().is_none());
    }
}
