mod answer;
mod ids;
mod kind;
mod question;

pub use answer::{Answer, AnswerError, AnswerStore};
pub use ids::{ContentKey, ParseIdError, QuestionId, TaskId};
pub use kind::{ParseKindError, QuizKind};
pub use question::{FormatError, Question, QuestionBody};
