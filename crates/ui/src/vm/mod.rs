mod quiz_vm;

pub use quiz_vm::{
    BlankSegment, MatchOptionVm, QuestionCardVm, QuestionInputVm, QuizIntent, QuizPhase, QuizVm,
    ReviewRowVm, mount_quiz,
};
