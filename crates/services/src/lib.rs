#![forbid(unsafe_code)]

pub mod api;
pub mod completion;
pub mod error;
pub mod quiz;

pub use quiz_core::Clock;

pub use api::{ConfirmedAnswers, HttpQuizApi, QuizApi, QuizApiConfig};
pub use completion::{CompletionPayload, CompletionReporter, TracingReporter};
pub use error::{LoadError, QuizApiError, SessionError};
pub use quiz::{
    LiveMirror, Liveness, MountOutcome, MountRequest, QuizLoopConfig, QuizLoopService,
    QuizSession, Recovered, RecoverySources, RecoveryTier, RenderedInputs, RenderedValue,
    ScrapeError, SessionContext, SessionProgress, SessionSnapshot, SessionState,
};
