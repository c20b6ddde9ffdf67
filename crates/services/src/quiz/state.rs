use crate::error::LoadError;

/// Lifecycle of one quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    LoadError(LoadError),
    Answering,
    Reviewing,
    Submitting,
    Completed,
}

impl SessionState {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::LoadError(_) => "failed to load",
            SessionState::Answering => "answering",
            SessionState::Reviewing => "reviewing",
            SessionState::Submitting => "submitting",
            SessionState::Completed => "completed",
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, SessionState::Completed)
    }
}

/// Answered vs total questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub answered: usize,
    pub total: usize,
}
