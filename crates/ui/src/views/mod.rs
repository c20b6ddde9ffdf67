mod quiz;
mod state;

pub use quiz::{QuestionCard, QuizPlayer};
pub(crate) use quiz::hand_off_inputs;
pub use state::{ViewError, ViewState, view_state_from_resource};
