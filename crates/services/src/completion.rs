use quiz_core::model::{AnswerStore, ContentKey, QuizKind, TaskId};

/// What the host receives when a quiz completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionPayload {
    Answers {
        key: ContentKey,
        kind: QuizKind,
        task_id: Option<TaskId>,
        answers: AnswerStore,
    },
    /// Preview sessions report a sentinel instead of real answers.
    Preview,
}

impl CompletionPayload {
    #[must_use]
    pub fn answers(&self) -> Option<&AnswerStore> {
        match self {
            CompletionPayload::Answers { answers, .. } => Some(answers),
            CompletionPayload::Preview => None,
        }
    }
}

/// Host sequencer callback, invoked once per completed session.
pub trait CompletionReporter: Send + Sync {
    fn on_complete(&self, payload: CompletionPayload);
}

/// Default reporter for hosts without a sequencer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl CompletionReporter for TracingReporter {
    fn on_complete(&self, payload: CompletionPayload) {
        match payload {
            CompletionPayload::Answers {
                key,
                kind,
                task_id,
                answers,
            } => {
                let body = serde_json::to_string(&answers).unwrap_or_default();
                tracing::info!(%key, %kind, ?task_id, answers = %body, "quiz completed");
            }
            CompletionPayload::Preview => tracing::info!("preview quiz completed"),
        }
    }
}
