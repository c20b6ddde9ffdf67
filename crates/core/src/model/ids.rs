use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a question, unique within one quiz session.
///
/// Upstream records carry either numeric or string ids, so the canonical
/// form is always a string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Positional id handed to records that arrive without one (1-based).
    #[must_use]
    pub fn positional(index: usize) -> Self {
        Self(format!("q{}", index + 1))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for QuestionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a quiz task on the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Stable key of a logical quiz/editor instance.
///
/// Must not change across remounts of the same instance; the session cache is
/// keyed by it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    /// Key for an item that already exists on the backend.
    #[must_use]
    pub fn for_content(content_id: u64) -> Self {
        Self(format!("content-{content_id}"))
    }

    /// Fresh key for a new, unsaved item.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("new-{}", uuid::Uuid::new_v4()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing an id from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for TaskId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TaskId::new)
            .map_err(|_| ParseIdError { kind: "TaskId" })
    }
}

impl FromStr for ContentKey {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError { kind: "ContentKey" });
        }
        Ok(Self(trimmed.to_string()))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_from_str() {
        let id: TaskId = " 123 ".parse().unwrap();
        assert_eq!(id, TaskId::new(123));
        assert_eq!(id.to_string(), "123");
    }

    #[test]
    fn task_id_from_str_invalid() {
        assert!("not-a-number".parse::<TaskId>().is_err());
    }

    #[test]
    fn content_key_rejects_blank() {
        assert!("   ".parse::<ContentKey>().is_err());
        let key: ContentKey = "content-7".parse().unwrap();
        assert_eq!(key, ContentKey::for_content(7));
    }

    #[test]
    fn generated_keys_are_distinct() {
        let a = ContentKey::generate();
        let b = ContentKey::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("new-"));
    }

    #[test]
    fn positional_question_ids_are_one_based() {
        assert_eq!(QuestionId::positional(0).as_str(), "q1");
        assert_eq!(QuestionId::from(42).as_str(), "42");
    }
}
