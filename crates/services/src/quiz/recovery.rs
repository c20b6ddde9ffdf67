//! Answer recovery, strongest source first.
//!
//! 1. session cache (synchronous)
//! 2. live mirror (synchronous)
//! 3. server-confirmed answers (skipped in preview)
//! 4. device store record
//! 5. values still rendered in the player's inputs
//!
//! Tiers 3 and 4 only ever hold submitted answers, so a hit there restores
//! the session as completed. Any tier that fails is logged and skipped.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{AnswerStore, Question, QuestionId};
use quiz_core::normalize::normalize_answers;
use serde_json::{Map, Value};
use storage::repository::{DeviceKey, DeviceStore, SessionCache};
use thiserror::Error;

use crate::api::QuizApi;
use crate::error::LoadError;

use super::mirror::{LiveMirror, Liveness};
use super::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTier {
    SessionCache,
    LiveMirror,
    ConfirmedAnswers,
    DeviceStore,
    RenderedInputs,
}

/// Questions plus whatever answers recovery found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    /// `None` when every tier missed.
    pub tier: Option<RecoveryTier>,
    pub questions: Vec<Question>,
    pub answers: AnswerStore,
    pub completed: bool,
}

impl Recovered {
    /// Nothing recovered; answers default per kind when loaded.
    #[must_use]
    pub fn fresh(questions: Vec<Question>) -> Self {
        Self {
            tier: None,
            questions,
            answers: AnswerStore::new(),
            completed: false,
        }
    }
}

/// One value read back from a rendered input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedValue {
    pub question_id: QuestionId,
    /// Blank index or ranking position; `None` for whole-answer inputs.
    pub position: Option<usize>,
    pub value: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("rendered inputs unavailable: {0}")]
pub struct ScrapeError(pub String);

/// Reads the player's input elements back out of the rendered document.
#[async_trait(?Send)]
pub trait RenderedInputs {
    /// # Errors
    ///
    /// Returns `ScrapeError` when the document cannot be queried.
    async fn scrape(&self) -> Result<Vec<RenderedValue>, ScrapeError>;
}

/// Everything recovery may read from.
pub struct RecoverySources<'a> {
    pub context: &'a SessionContext,
    pub cache: &'a dyn SessionCache,
    pub mirror: &'a LiveMirror,
    pub api: &'a dyn QuizApi,
    pub device: &'a dyn DeviceStore,
    pub rendered: Option<&'a dyn RenderedInputs>,
    pub liveness: &'a Liveness,
    pub timeout: Duration,
}

impl RecoverySources<'_> {
    /// Run every tier in order.
    ///
    /// `load_questions` is only awaited when neither synchronous tier hits.
    ///
    /// # Errors
    ///
    /// Returns the question loader's error, or `LoadError::Stale` once the
    /// owner is gone.
    pub async fn recover<F>(&self, load_questions: F) -> Result<Recovered, LoadError>
    where
        F: Future<Output = Result<Vec<Question>, LoadError>>,
    {
        if let Some(hit) = self.local() {
            return Ok(hit);
        }
        let questions = load_questions.await?;
        self.ensure_alive()?;
        self.remote(questions).await
    }

    /// Tiers 1 and 2.
    #[must_use]
    pub fn local(&self) -> Option<Recovered> {
        self.from_cache().or_else(|| self.from_mirror())
    }

    async fn remote(&self, questions: Vec<Question>) -> Result<Recovered, LoadError> {
        let confirmed = self.confirmed_answers().await;
        self.ensure_alive()?;
        if let Some(raw) = confirmed {
            return Ok(self.resolved(RecoveryTier::ConfirmedAnswers, questions, &raw, true));
        }

        let device = self.device_answers().await;
        self.ensure_alive()?;
        if let Some(raw) = device {
            return Ok(self.resolved(RecoveryTier::DeviceStore, questions, &raw, true));
        }

        let rendered = self.rendered_answers(&questions).await;
        self.ensure_alive()?;
        if let Some(raw) = rendered {
            return Ok(self.resolved(RecoveryTier::RenderedInputs, questions, &raw, false));
        }

        Ok(Recovered::fresh(questions))
    }

    fn ensure_alive(&self) -> Result<(), LoadError> {
        if self.liveness.is_alive() {
            Ok(())
        } else {
            Err(LoadError::Stale)
        }
    }

    fn resolved(
        &self,
        tier: RecoveryTier,
        questions: Vec<Question>,
        raw: &Map<String, Value>,
        completed: bool,
    ) -> Recovered {
        let answers = normalize_answers(self.context.kind, &questions, raw);
        tracing::info!(key = %self.context.key, ?tier, completed, "recovered quiz answers");
        Recovered {
            tier: Some(tier),
            questions,
            answers,
            completed,
        }
    }

    fn from_cache(&self) -> Option<Recovered> {
        match self.cache.get(&self.context.key) {
            Ok(Some(entry)) if !entry.questions.is_empty() && entry.kind == self.context.kind => {
                tracing::debug!(key = %self.context.key, "restored quiz from session cache");
                Some(Recovered {
                    tier: Some(RecoveryTier::SessionCache),
                    questions: entry.questions,
                    answers: entry.answers,
                    completed: entry.completed,
                })
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(key = %self.context.key, error = %err, "session cache read failed");
                None
            }
        }
    }

    fn from_mirror(&self) -> Option<Recovered> {
        let snapshot = self
            .mirror
            .get(&self.context.key)
            .filter(|snapshot| !snapshot.questions.is_empty())?;
        tracing::debug!(key = %self.context.key, "restored quiz from live mirror");
        Some(Recovered {
            tier: Some(RecoveryTier::LiveMirror),
            questions: snapshot.questions,
            answers: snapshot.answers,
            completed: snapshot.completed,
        })
    }

    async fn confirmed_answers(&self) -> Option<Map<String, Value>> {
        if self.context.preview {
            return None;
        }
        let task_id = self.context.task_id?;
        let request = self.api.fetch_confirmed_answers(self.context.kind, task_id);
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(Some(confirmed))) if !confirmed.answers.is_empty() => Some(confirmed.answers),
            Ok(Ok(_)) => None,
            Ok(Err(err)) => {
                tracing::warn!(%task_id, error = %err, "confirmed answers unavailable");
                None
            }
            Err(_) => {
                tracing::warn!(%task_id, timeout = ?self.timeout, "confirmed answers timed out");
                None
            }
        }
    }

    async fn device_answers(&self) -> Option<Map<String, Value>> {
        let task_id = self.context.task_id?;
        let key = DeviceKey::new(self.context.kind, task_id);
        match self.device.load(&key).await {
            Ok(Some(record)) if !record.submitted_answers.is_empty() => {
                Some(record.submitted_answers)
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(%key, error = %err, "ignoring unreadable device record");
                None
            }
        }
    }

    async fn rendered_answers(&self, questions: &[Question]) -> Option<Map<String, Value>> {
        let rendered = self.rendered?;
        match rendered.scrape().await {
            Ok(values) => {
                let raw = rendered_map(&values, questions);
                (!raw.is_empty()).then_some(raw)
            }
            Err(err) => {
                tracing::warn!(key = %self.context.key, error = %err, "rendered inputs unreadable");
                None
            }
        }
    }
}

/// Fold scraped inputs into the loose answer map the normalizer accepts.
///
/// Values for unknown questions, and positions past a question's blanks or
/// tiers, are dropped.
fn rendered_map(values: &[RenderedValue], questions: &[Question]) -> Map<String, Value> {
    let mut raw = Map::new();
    for rendered in values.iter().filter(|v| !v.value.trim().is_empty()) {
        let Some(question) = questions.iter().find(|q| q.id == rendered.question_id) else {
            continue;
        };
        let id = rendered.question_id.as_str().to_string();
        let value = Value::String(rendered.value.clone());
        match rendered.position {
            None => {
                raw.insert(id, value);
            }
            Some(index) if index >= question.blank_count().max(question.tiers().len()) => {
                tracing::debug!(%id, index, "ignoring out-of-range rendered position");
            }
            Some(index) => {
                let entry = raw.entry(id).or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(slots) = entry {
                    if slots.len() <= index {
                        slots.resize(index + 1, Value::String(String::new()));
                    }
                    slots[index] = value;
                }
            }
        }
    }
    raw
}
