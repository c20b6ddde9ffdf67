use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{
    AnswerError, AnswerStore, ContentKey, FormatError, Question, QuestionId, QuizKind, TaskId,
};
use quiz_core::normalize::empty_answers;
use quiz_core::validation::{ValidationErrors, Validator};
use storage::repository::{CacheEntry, SessionCache};

use crate::completion::CompletionPayload;
use crate::error::{LoadError, SessionError};

use super::mirror::{LiveMirror, SessionSnapshot};
use super::recovery::Recovered;
use super::state::{SessionProgress, SessionState};

/// Identity of one mounted quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub key: ContentKey,
    pub kind: QuizKind,
    pub task_id: Option<TaskId>,
    pub preview: bool,
}

/// One quiz instance: questions, answers, validation state and lifecycle.
///
/// Every answer mutation is published to the live mirror and written through
/// to the session cache before it returns.
pub struct QuizSession {
    context: SessionContext,
    clock: Clock,
    cache: Arc<dyn SessionCache>,
    mirror: LiveMirror,
    validator: Validator,
    state: SessionState,
    questions: Vec<Question>,
    answers: AnswerStore,
    staged: Option<AnswerStore>,
    errors: ValidationErrors,
}

impl std::fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizSession")
            .field("context", &self.context)
            .field("state", &self.state)
            .field("questions", &self.questions.len())
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

impl QuizSession {
    #[must_use]
    pub fn new(
        context: SessionContext,
        clock: Clock,
        cache: Arc<dyn SessionCache>,
        mirror: LiveMirror,
    ) -> Self {
        let validator = Validator::for_kind(context.kind);
        Self {
            context,
            clock,
            cache,
            mirror,
            validator,
            state: SessionState::Loading,
            questions: Vec::new(),
            answers: AnswerStore::new(),
            staged: None,
            errors: ValidationErrors::new(),
        }
    }

    // ─── ACCESSORS ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    #[must_use]
    pub fn key(&self) -> &ContentKey {
        &self.context.key
    }

    #[must_use]
    pub fn kind(&self) -> QuizKind {
        self.context.kind
    }

    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.context.preview
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| &question.id == id)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    /// Answers frozen when the learner entered review or completed.
    #[must_use]
    pub fn staged_answers(&self) -> Option<&AnswerStore> {
        self.staged.as_ref()
    }

    #[must_use]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Structural problem of a question, shown inline instead of its inputs.
    #[must_use]
    pub fn format_error(&self, id: &QuestionId) -> Option<FormatError> {
        self.question(id).and_then(|q| q.check_format().err())
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self
            .questions
            .iter()
            .filter(|q| self.answers.get(&q.id).is_some_and(|a| !a.is_blank()))
            .count();
        SessionProgress {
            answered,
            total: self.questions.len(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            key: self.context.key.clone(),
            questions: self.questions.clone(),
            answers: self.answers.clone(),
            completed: self.state.is_completed(),
        }
    }

    // ─── LOADING ───────────────────────────────────────────────────────────────

    /// `Loading` → `Answering`, or straight to `Completed` for recovered
    /// submissions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is loading.
    pub fn finish_loading(&mut self, recovered: Recovered) -> Result<(), SessionError> {
        self.require(&[SessionState::Loading], "finish loading")?;

        self.answers = self.overlay_defaults(&recovered.questions, &recovered.answers);
        self.questions = recovered.questions;
        self.errors = ValidationErrors::new();
        if recovered.completed {
            self.staged = Some(self.answers.clone());
            self.state = SessionState::Completed;
        } else {
            self.staged = None;
            self.state = SessionState::Answering;
        }
        self.persist();
        Ok(())
    }

    /// `Loading` → `LoadError`.
    pub fn fail_loading(&mut self, error: LoadError) {
        if self.state == SessionState::Loading {
            self.state = SessionState::LoadError(error);
        }
    }

    // ─── MUTATIONS ─────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `SessionError` outside `Answering` or when the answer is rejected.
    pub fn set_text(&mut self, id: &QuestionId, value: impl Into<String>) -> Result<(), SessionError> {
        self.mutate(id, None, |answers| answers.set_text(id, value))
    }

    /// # Errors
    ///
    /// Returns `SessionError` outside `Answering` or when the blank is unknown.
    pub fn set_blank(
        &mut self,
        id: &QuestionId,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.mutate(id, Some(index), |answers| answers.set_blank(id, index, value))
    }

    /// Returns whether the order changed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `Answering` or for non-ranking questions.
    pub fn reorder(&mut self, id: &QuestionId, from: usize, to: usize) -> Result<bool, SessionError> {
        self.mutate(id, None, |answers| answers.reorder(id, from, to))
    }

    /// # Errors
    ///
    /// See [`QuizSession::reorder`].
    pub fn move_up(&mut self, id: &QuestionId, index: usize) -> Result<bool, SessionError> {
        self.mutate(id, None, |answers| answers.move_up(id, index))
    }

    /// # Errors
    ///
    /// See [`QuizSession::reorder`].
    pub fn move_down(&mut self, id: &QuestionId, index: usize) -> Result<bool, SessionError> {
        self.mutate(id, None, |answers| answers.move_down(id, index))
    }

    /// # Errors
    ///
    /// Returns `SessionError` outside `Answering` or when `option` is not offered.
    pub fn select(&mut self, id: &QuestionId, option: impl Into<String>) -> Result<(), SessionError> {
        let option = option.into();
        let offered = self
            .question(id)
            .is_some_and(|q| q.options().iter().any(|candidate| candidate == &option));
        if !offered && self.question(id).is_some() {
            return Err(AnswerError::UnknownOption {
                id: id.clone(),
                option,
            }
            .into());
        }
        self.mutate(id, None, |answers| answers.select(id, option))
    }

    fn mutate<T>(
        &mut self,
        id: &QuestionId,
        blank: Option<usize>,
        apply: impl FnOnce(&mut AnswerStore) -> Result<T, AnswerError>,
    ) -> Result<T, SessionError> {
        self.require(&[SessionState::Answering], "edit answers")?;
        if self.question(id).is_none() {
            return Err(AnswerError::UnknownQuestion(id.clone()).into());
        }

        let outcome = apply(&mut self.answers)?;
        self.persist();
        self.clear_resolved(id, blank);
        Ok(outcome)
    }

    /// Drop the error of a question (or one of its blanks) the learner just fixed.
    fn clear_resolved(&mut self, id: &QuestionId, blank: Option<usize>) {
        if !self.errors.contains(id) {
            return;
        }
        let Some(question) = self.question(id) else {
            return;
        };
        match self.validator.check(question, self.answers.get(id)) {
            None => {
                self.errors.remove(id);
            }
            Some(remaining) => {
                if let Some(index) = blank.filter(|index| remaining.blank(*index).is_none()) {
                    self.errors.resolve(id, Some(index));
                }
            }
        }
    }

    // ─── TRANSITIONS ───────────────────────────────────────────────────────────

    /// `Answering` → `Reviewing` after full validation.
    ///
    /// Preview sessions skip validation entirely.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Incomplete` with the first invalid question to
    /// focus; the session stays in `Answering`.
    pub fn submit_for_review(&mut self) -> Result<(), SessionError> {
        self.require(&[SessionState::Answering], "submit for review")?;
        self.validate_all()?;
        self.staged = Some(self.answers.clone());
        self.state = SessionState::Reviewing;
        Ok(())
    }

    /// `Reviewing` → `Answering`, answers untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `Reviewing`.
    pub fn back(&mut self) -> Result<(), SessionError> {
        self.require(&[SessionState::Reviewing], "go back")?;
        self.staged = None;
        self.state = SessionState::Answering;
        Ok(())
    }

    /// `Reviewing` → `Submitting`, re-validating the live answers.
    ///
    /// Returns the frozen completion payload.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Incomplete` (back in `Answering`) if the answers
    /// changed into an invalid state since staging.
    pub fn begin_submit(&mut self) -> Result<CompletionPayload, SessionError> {
        self.require(&[SessionState::Reviewing], "confirm")?;
        if let Err(err) = self.validate_all() {
            self.staged = None;
            self.state = SessionState::Answering;
            return Err(err);
        }

        let frozen = self.answers.clone();
        self.staged = Some(frozen.clone());
        self.state = SessionState::Submitting;

        if self.context.preview {
            return Ok(CompletionPayload::Preview);
        }
        Ok(CompletionPayload::Answers {
            key: self.context.key.clone(),
            kind: self.context.kind,
            task_id: self.context.task_id,
            answers: frozen,
        })
    }

    /// `Submitting` → `Completed`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `Submitting`.
    pub fn complete_submit(&mut self) -> Result<(), SessionError> {
        self.require(&[SessionState::Submitting], "complete")?;
        self.state = SessionState::Completed;
        self.persist();
        Ok(())
    }

    /// `Completed` → `Answering` with every answer reset to its empty default.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `Completed`.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.require(&[SessionState::Completed], "restart")?;
        self.answers = empty_answers(self.context.kind, &self.questions);
        self.errors = ValidationErrors::new();
        self.staged = None;
        self.state = SessionState::Answering;
        self.persist();
        Ok(())
    }

    /// Replace questions and answers with a previously taken snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` while loading or submitting.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> Result<(), SessionError> {
        self.require(
            &[
                SessionState::Answering,
                SessionState::Reviewing,
                SessionState::Completed,
            ],
            "restore",
        )?;
        self.answers = self.overlay_defaults(&snapshot.questions, &snapshot.answers);
        self.questions = snapshot.questions;
        self.errors = ValidationErrors::new();
        if snapshot.completed {
            self.staged = Some(self.answers.clone());
            self.state = SessionState::Completed;
        } else {
            self.staged = None;
            self.state = SessionState::Answering;
        }
        self.persist();
        Ok(())
    }

    // ─── INTERNALS ─────────────────────────────────────────────────────────────

    /// Per-kind defaults for every question, overlaid with `answers` for
    /// known ids only.
    fn overlay_defaults(&self, questions: &[Question], answers: &AnswerStore) -> AnswerStore {
        let mut merged = empty_answers(self.context.kind, questions);
        for (id, answer) in answers.iter() {
            if merged.contains(id) {
                merged.insert(id.clone(), answer.clone());
            }
        }
        merged
    }

    fn require(&self, allowed: &[SessionState], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                action,
                state: self.state.label(),
            })
        }
    }

    fn validate_all(&mut self) -> Result<(), SessionError> {
        if self.context.preview {
            self.errors = ValidationErrors::new();
            return Ok(());
        }
        let errors = self.validator.full(&self.questions, &self.answers);
        self.errors = errors.clone();
        match errors.first().cloned() {
            None => Ok(()),
            Some(first_invalid) => Err(SessionError::Incomplete {
                errors,
                first_invalid,
            }),
        }
    }

    /// Mirror first, then the session cache. A cache failure never fails the
    /// operation that triggered it.
    fn persist(&self) {
        let snapshot = self.snapshot();
        let entry = CacheEntry {
            key: snapshot.key.clone(),
            kind: self.context.kind,
            task_id: self.context.task_id,
            questions: snapshot.questions.clone(),
            answers: snapshot.answers.clone(),
            completed: snapshot.completed,
            saved_at: self.clock.now(),
        };
        self.mirror.publish(snapshot);
        if let Err(err) = self.cache.set(entry) {
            tracing::warn!(key = %self.context.key, error = %err, "session cache write failed");
        }
    }
}
