use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::Clock;
use quiz_core::model::{ContentKey, Question, QuizKind, TaskId};
use quiz_core::normalize::{RawQuestion, normalize};
use storage::repository::{DeviceKey, DeviceRecord, DeviceStore, SessionCache};

use crate::api::QuizApi;
use crate::completion::CompletionReporter;
use crate::error::{LoadError, SessionError};

use super::mirror::{LiveMirror, Liveness};
use super::recovery::{RecoverySources, RenderedInputs};
use super::session::{QuizSession, SessionContext};

/// Tunables for the quiz loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizLoopConfig {
    /// Upper bound for every network call.
    pub request_timeout: Duration,
}

impl QuizLoopConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// A zero timeout falls back to the default.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            request_timeout: if timeout.is_zero() {
                Self::DEFAULT_TIMEOUT
            } else {
                timeout
            },
        }
    }
}

impl Default for QuizLoopConfig {
    fn default() -> Self {
        Self {
            request_timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Everything the host passes in when it mounts a quiz.
pub struct MountRequest {
    pub context: SessionContext,
    pub preview_questions: Option<Vec<RawQuestion>>,
    pub mirror: LiveMirror,
    pub liveness: Liveness,
    pub rendered: Option<Rc<dyn RenderedInputs>>,
}

impl MountRequest {
    #[must_use]
    pub fn new(key: ContentKey, kind: QuizKind) -> Self {
        Self {
            context: SessionContext {
                key,
                kind,
                task_id: None,
                preview: false,
            },
            preview_questions: None,
            mirror: LiveMirror::new(),
            liveness: Liveness::new(),
            rendered: None,
        }
    }

    #[must_use]
    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.context.task_id = Some(task_id);
        self
    }

    /// Preview mode; supplied questions replace the network fetch.
    #[must_use]
    pub fn preview(mut self, questions: Option<Vec<RawQuestion>>) -> Self {
        self.context.preview = true;
        self.preview_questions = questions;
        self
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: LiveMirror) -> Self {
        self.mirror = mirror;
        self
    }

    #[must_use]
    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    #[must_use]
    pub fn with_rendered(mut self, rendered: Rc<dyn RenderedInputs>) -> Self {
        self.rendered = Some(rendered);
        self
    }
}

/// Result of a mount attempt.
#[derive(Debug)]
pub enum MountOutcome {
    /// Loaded, or failed in a way the player should show.
    Ready(QuizSession),
    /// The owner went away first; nothing may be applied.
    Discarded,
}

/// Orchestrates loading, confirming and restarting quiz sessions.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    api: Arc<dyn QuizApi>,
    cache: Arc<dyn SessionCache>,
    device: Arc<dyn DeviceStore>,
    reporter: Arc<dyn CompletionReporter>,
    config: QuizLoopConfig,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        api: Arc<dyn QuizApi>,
        cache: Arc<dyn SessionCache>,
        device: Arc<dyn DeviceStore>,
        reporter: Arc<dyn CompletionReporter>,
    ) -> Self {
        Self {
            clock,
            api,
            cache,
            device,
            reporter,
            config: QuizLoopConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: QuizLoopConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> QuizLoopConfig {
        self.config
    }

    /// Build a session and bring it out of `Loading`.
    ///
    /// A cache or mirror hit is applied without touching the network.
    /// Load failures leave the session in `LoadError`.
    pub async fn mount(&self, request: MountRequest) -> MountOutcome {
        let MountRequest {
            context,
            preview_questions,
            mirror,
            liveness,
            rendered,
        } = request;

        let mut session = QuizSession::new(
            context.clone(),
            self.clock,
            Arc::clone(&self.cache),
            mirror.clone(),
        );
        let sources = RecoverySources {
            context: &context,
            cache: self.cache.as_ref(),
            mirror: &mirror,
            api: self.api.as_ref(),
            device: self.device.as_ref(),
            rendered: rendered.as_deref(),
            liveness: &liveness,
            timeout: self.config.request_timeout,
        };

        let loaded = sources
            .recover(self.load_questions(&context, preview_questions.as_deref()))
            .await;
        if !liveness.is_alive() {
            tracing::debug!(key = %context.key, "quiz unmounted during load; result dropped");
            return MountOutcome::Discarded;
        }

        match loaded {
            Ok(recovered) => {
                if let Err(err) = session.finish_loading(recovered) {
                    tracing::warn!(key = %context.key, error = %err, "quiz could not leave loading");
                }
            }
            Err(LoadError::Stale) => return MountOutcome::Discarded,
            Err(err) => {
                tracing::warn!(key = %context.key, error = %err, "quiz failed to load");
                session.fail_loading(err);
            }
        }
        MountOutcome::Ready(session)
    }

    async fn load_questions(
        &self,
        context: &SessionContext,
        supplied: Option<&[RawQuestion]>,
    ) -> Result<Vec<Question>, LoadError> {
        if context.preview
            && let Some(raws) = supplied
        {
            return Ok(normalize(context.kind, raws)?);
        }

        let task_id = context.task_id.ok_or(LoadError::MissingSource)?;
        let timeout = self.config.request_timeout;
        let raws = tokio::time::timeout(timeout, self.api.fetch_questions(context.kind, task_id))
            .await
            .map_err(|_| LoadError::Timeout(timeout))??;
        tracing::info!(key = %context.key, %task_id, count = raws.len(), "fetched quiz questions");
        Ok(normalize(context.kind, &raws)?)
    }

    /// Confirm the reviewed answers.
    ///
    /// Persists the device record (real sessions only), completes the session
    /// and reports to the host exactly once.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the session is not reviewing or the answers
    /// no longer validate.
    pub async fn confirm(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        let payload = session.begin_submit()?;

        if let (Some(answers), Some(task_id)) = (payload.answers(), session.context().task_id) {
            let key = DeviceKey::new(session.kind(), task_id);
            let saved = match DeviceRecord::completed(answers) {
                Ok(record) => self.device.save(&key, &record).await,
                Err(err) => Err(err),
            };
            if let Err(err) = saved {
                tracing::warn!(%key, error = %err, "device record not saved");
            }
        }

        session.complete_submit()?;
        tracing::info!(key = %session.key(), preview = session.is_preview(), "quiz confirmed");
        self.reporter.on_complete(payload);
        Ok(())
    }

    /// Reset a completed session and forget its device record.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is completed.
    pub async fn restart(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.restart()?;
        if let Some(task_id) = session.context().task_id.filter(|_| !session.is_preview()) {
            let key = DeviceKey::new(session.kind(), task_id);
            if let Err(err) = self.device.remove(&key).await {
                tracing::warn!(%key, error = %err, "device record not removed");
            }
        }
        Ok(())
    }
}
