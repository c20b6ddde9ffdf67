//! Quiz session lifecycle: state machine, mirror, recovery and the loop service.

mod mirror;
mod recovery;
mod session;
mod state;
mod workflow;

pub use mirror::{LiveMirror, Liveness, SessionSnapshot};
pub use recovery::{
    Recovered, RecoverySources, RecoveryTier, RenderedInputs, RenderedValue, ScrapeError,
};
pub use session::{QuizSession, SessionContext};
pub use state::{SessionProgress, SessionState};
pub use workflow::{MountOutcome, MountRequest, QuizLoopConfig, QuizLoopService};
