use std::sync::{Arc, Mutex, PoisonError};

use quiz_core::model::{ContentKey, QuizKind, TaskId};
use quiz_core::normalize::RawQuestion;
use services::{LiveMirror, Liveness, MountRequest, QuizLoopService, RenderedValue};

/// What the host wants the player to show.
#[derive(Clone, Debug, PartialEq)]
pub struct QuizLaunch {
    pub key: ContentKey,
    pub kind: QuizKind,
    pub task_id: Option<TaskId>,
    pub preview: bool,
    pub preview_questions: Option<Vec<RawQuestion>>,
}

impl QuizLaunch {
    #[must_use]
    pub fn request(&self, mirror: LiveMirror, liveness: Liveness) -> MountRequest {
        let mut request = MountRequest::new(self.key.clone(), self.kind)
            .with_mirror(mirror)
            .with_liveness(liveness);
        if let Some(task_id) = self.task_id {
            request = request.with_task(task_id);
        }
        if self.preview {
            request = request.preview(self.preview_questions.clone());
        }
        request
    }
}

/// Input values read from a player right before it was torn down, waiting
/// for the next mount to pick them up.
#[derive(Clone, Default)]
pub struct InputHandoff {
    values: Arc<Mutex<Vec<RenderedValue>>>,
}

impl InputHandoff {
    pub fn stash(&self, values: Vec<RenderedValue>) {
        *self.values.lock().unwrap_or_else(PoisonError::into_inner) = values;
    }

    /// Empties the handoff; a later mount never sees stale values.
    #[must_use]
    pub fn take(&self) -> Vec<RenderedValue> {
        std::mem::take(&mut *self.values.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

pub trait UiApp: Send + Sync {
    fn quiz_loop(&self) -> Arc<QuizLoopService>;
    fn launch(&self) -> QuizLaunch;
}

#[derive(Clone)]
pub struct AppContext {
    quiz_loop: Arc<QuizLoopService>,
    launch: QuizLaunch,
    // Outlives every player remount inside this window.
    mirror: LiveMirror,
    handoff: InputHandoff,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            quiz_loop: app.quiz_loop(),
            launch: app.launch(),
            mirror: LiveMirror::new(),
            handoff: InputHandoff::default(),
        }
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn launch(&self) -> &QuizLaunch {
        &self.launch
    }

    #[must_use]
    pub fn mirror(&self) -> LiveMirror {
        self.mirror.clone()
    }

    #[must_use]
    pub fn handoff(&self) -> InputHandoff {
        self.handoff.clone()
    }
}

// Provided by the composition root (`crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}

#[cfg(test)]
mod tests {
    use quiz_core::model::QuestionId;

    use super::*;

    #[test]
    fn handoff_is_taken_once() {
        let handoff = InputHandoff::default();
        handoff.stash(vec![RenderedValue {
            question_id: QuestionId::from("q1"),
            position: None,
            value: "Paris".into(),
        }]);

        let shared = handoff.clone();
        assert_eq!(shared.take().len(), 1);
        assert!(handoff.take().is_empty());
    }
}
