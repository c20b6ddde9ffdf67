use quiz_core::model::{Answer, FormatError, Question, QuestionBody, QuestionId};
use quiz_core::validation::FieldError;
use services::{
    MountOutcome, MountRequest, QuizLoopService, QuizSession, SessionError, SessionState,
};

use crate::views::ViewError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuizIntent {
    SetText { id: QuestionId, value: String },
    SetBlank { id: QuestionId, index: usize, value: String },
    MoveUp { id: QuestionId, index: usize },
    MoveDown { id: QuestionId, index: usize },
    Select { id: QuestionId, option: String },
    Review,
    Back,
    Confirm,
    Restart,
}

impl QuizIntent {
    /// Intents that go through the loop service and must be spawned.
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, QuizIntent::Confirm | QuizIntent::Restart)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizPhase {
    Loading,
    LoadFailed,
    Answering,
    Reviewing,
    Submitting,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlankSegment {
    Text(String),
    Blank {
        index: usize,
        value: String,
        error: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchOptionVm {
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuestionInputVm {
    Text {
        value: String,
        error: Option<String>,
    },
    Blanks {
        segments: Vec<BlankSegment>,
    },
    Ranked {
        items: Vec<String>,
    },
    Matching {
        options: Vec<MatchOptionVm>,
        error: Option<String>,
    },
    Malformed {
        message: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionCardVm {
    pub id: QuestionId,
    pub number: usize,
    pub prompt: String,
    pub hint: Option<String>,
    pub input: QuestionInputVm,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewRowVm {
    pub number: usize,
    pub prompt: String,
    pub answer: String,
}

pub struct QuizVm {
    session: QuizSession,
    focus: Option<QuestionId>,
    notice: Option<ViewError>,
}

impl QuizVm {
    #[must_use]
    pub fn new(session: QuizSession) -> Self {
        Self {
            session,
            focus: None,
            notice: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        match self.session.state() {
            SessionState::Loading => QuizPhase::Loading,
            SessionState::LoadError(_) => QuizPhase::LoadFailed,
            SessionState::Answering => QuizPhase::Answering,
            SessionState::Reviewing => QuizPhase::Reviewing,
            SessionState::Submitting => QuizPhase::Submitting,
            SessionState::Completed => QuizPhase::Completed,
        }
    }

    #[must_use]
    pub fn load_error(&self) -> Option<String> {
        match self.session.state() {
            SessionState::LoadError(err) => Some(err.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn notice(&self) -> Option<ViewError> {
        self.notice
    }

    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.session.is_preview()
    }

    #[must_use]
    pub fn progress_label(&self) -> String {
        let progress = self.session.progress();
        format!("{} / {} answered", progress.answered, progress.total)
    }

    /// Question to scroll to after a rejected review; cleared once read.
    pub fn take_focus(&mut self) -> Option<QuestionId> {
        self.focus.take()
    }

    #[must_use]
    pub fn cards(&self) -> Vec<QuestionCardVm> {
        self.session
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| QuestionCardVm {
                id: question.id.clone(),
                number: index + 1,
                prompt: question.prompt.clone(),
                hint: (!question.hint.trim().is_empty()).then(|| question.hint.clone()),
                input: self.input_for(question),
            })
            .collect()
    }

    /// Frozen answers as shown on the review and completion panes.
    #[must_use]
    pub fn review_rows(&self) -> Vec<ReviewRowVm> {
        let answers = self
            .session
            .staged_answers()
            .unwrap_or_else(|| self.session.answers());
        self.session
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| ReviewRowVm {
                number: index + 1,
                prompt: question.prompt.clone(),
                answer: answers
                    .get(&question.id)
                    .map_or_else(|| NO_ANSWER.to_string(), answer_summary),
            })
            .collect()
    }

    fn input_for(&self, question: &Question) -> QuestionInputVm {
        if let Some(err) = self.session.format_error(&question.id) {
            return QuestionInputVm::Malformed {
                message: format_message(&err),
            };
        }
        let answer = self.session.answers().get(&question.id);
        let error = self.session.errors().get(&question.id);
        let whole = error.and_then(FieldError::message).map(str::to_string);

        match &question.body {
            QuestionBody::Text => QuestionInputVm::Text {
                value: answer.and_then(Answer::as_text).unwrap_or_default().to_string(),
                error: whole,
            },
            QuestionBody::FillBlank { .. } => {
                let slots = answer.and_then(Answer::blanks).unwrap_or(&[]);
                let mut segments = Vec::new();
                for (index, text) in question.prompt_segments().into_iter().enumerate() {
                    if index > 0 {
                        let blank = index - 1;
                        segments.push(BlankSegment::Blank {
                            index: blank,
                            value: slots.get(blank).cloned().unwrap_or_default(),
                            error: error.and_then(|e| e.blank(blank)).map(str::to_string),
                        });
                    }
                    if !text.is_empty() {
                        segments.push(BlankSegment::Text(text.to_string()));
                    }
                }
                QuestionInputVm::Blanks { segments }
            }
            QuestionBody::Ranking { tiers } => QuestionInputVm::Ranked {
                items: answer
                    .and_then(Answer::ranked)
                    .map_or_else(|| tiers.clone(), <[String]>::to_vec),
            },
            QuestionBody::Matching { options } => {
                let selected = answer.and_then(Answer::selected);
                QuestionInputVm::Matching {
                    options: options
                        .iter()
                        .map(|label| MatchOptionVm {
                            label: label.clone(),
                            selected: selected == Some(label.as_str()),
                        })
                        .collect(),
                    error: whole,
                }
            }
        }
    }

    // ─── INTENTS ───────────────────────────────────────────────────────────────

    /// Apply a synchronous intent.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::Incomplete` when review is blocked by missing
    /// answers, `ViewError::Unknown` for anything else the session rejects.
    pub fn apply(&mut self, intent: QuizIntent) -> Result<(), ViewError> {
        self.notice = None;
        let result = match intent {
            QuizIntent::SetText { id, value } => self.session.set_text(&id, value),
            QuizIntent::SetBlank { id, index, value } => self.session.set_blank(&id, index, value),
            QuizIntent::MoveUp { id, index } => self.session.move_up(&id, index).map(drop),
            QuizIntent::MoveDown { id, index } => self.session.move_down(&id, index).map(drop),
            QuizIntent::Select { id, option } => self.session.select(&id, option),
            QuizIntent::Review => self.session.submit_for_review(),
            QuizIntent::Back => self.session.back(),
            QuizIntent::Confirm | QuizIntent::Restart => return Err(ViewError::Unknown),
        };
        self.absorb(result)
    }

    /// Apply any intent, routing confirm and restart through the loop service.
    ///
    /// # Errors
    ///
    /// See [`QuizVm::apply`].
    pub async fn dispatch(
        &mut self,
        quiz_loop: &QuizLoopService,
        intent: QuizIntent,
    ) -> Result<(), ViewError> {
        match intent {
            QuizIntent::Confirm => {
                self.notice = None;
                let result = quiz_loop.confirm(&mut self.session).await;
                self.absorb(result)
            }
            QuizIntent::Restart => {
                self.notice = None;
                let result = quiz_loop.restart(&mut self.session).await;
                self.absorb(result)
            }
            other => self.apply(other),
        }
    }

    fn absorb(&mut self, result: Result<(), SessionError>) -> Result<(), ViewError> {
        match result {
            Ok(()) => Ok(()),
            Err(SessionError::Incomplete { first_invalid, .. }) => {
                tracing::debug!(question = %first_invalid, "review blocked by missing answers");
                self.focus = Some(first_invalid);
                self.notice = Some(ViewError::Incomplete);
                Err(ViewError::Incomplete)
            }
            Err(err) => {
                tracing::debug!(error = %err, "quiz intent rejected");
                self.notice = Some(ViewError::Unknown);
                Err(ViewError::Unknown)
            }
        }
    }
}

const NO_ANSWER: &str = "(no answer)";

fn answer_summary(answer: &Answer) -> String {
    let text = match answer {
        Answer::Text(text) => text.trim().to_string(),
        Answer::Blanks(slots) => slots
            .iter()
            .map(|slot| slot.trim())
            .collect::<Vec<_>>()
            .join(", "),
        Answer::Ranked(items) => items.join(" > "),
        Answer::Selected(selected) => selected.clone().unwrap_or_default(),
    };
    if answer.is_blank() || text.is_empty() {
        NO_ANSWER.to_string()
    } else {
        text
    }
}

fn format_message(err: &FormatError) -> String {
    format!("This question cannot be shown: {err}")
}

/// Mount a quiz; `None` when the player went away before loading finished.
pub async fn mount_quiz(quiz_loop: &QuizLoopService, request: MountRequest) -> Option<QuizVm> {
    match quiz_loop.mount(request).await {
        MountOutcome::Ready(session) => Some(QuizVm::new(session)),
        MountOutcome::Discarded => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiz_core::model::{ContentKey, QuizKind, TaskId};
    use quiz_core::time::fixed_clock;
    use quiz_core::validation::BLANK_REQUIRED;
    use services::{LiveMirror, Recovered, SessionContext};
    use storage::repository::InMemorySessionCache;

    use super::*;

    fn question(id: &str, prompt: &str, body: QuestionBody) -> Question {
        Question {
            id: QuestionId::from(id),
            prompt: prompt.to_string(),
            hint: String::new(),
            order: 0,
            body,
        }
    }

    fn vm(kind: QuizKind, questions: Vec<Question>) -> QuizVm {
        let mut session = QuizSession::new(
            SessionContext {
                key: ContentKey::for_content(3),
                kind,
                task_id: Some(TaskId::new(1)),
                preview: false,
            },
            fixed_clock(),
            Arc::new(InMemorySessionCache::new()),
            LiveMirror::new(),
        );
        session.finish_loading(Recovered::fresh(questions)).unwrap();
        QuizVm::new(session)
    }

    fn capital() -> Question {
        let prompt = "The capital of France is ____ and known for ____.";
        question(
            "fb1",
            prompt,
            QuestionBody::FillBlank {
                blanks: Question::count_blanks(prompt),
            },
        )
    }

    #[test]
    fn blanks_interleave_with_prompt_text() {
        let vm = vm(QuizKind::FillBlank, vec![capital()]);
        let cards = vm.cards();
        let QuestionInputVm::Blanks { segments } = &cards[0].input else {
            panic!("expected blanks");
        };
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0], BlankSegment::Text("The capital of France is ".into()));
        assert!(matches!(segments[1], BlankSegment::Blank { index: 0, .. }));
        assert!(matches!(segments[3], BlankSegment::Blank { index: 1, .. }));
        assert_eq!(segments[4], BlankSegment::Text(".".into()));
    }

    #[test]
    fn rejected_review_marks_blank_and_sets_focus() {
        let mut vm = vm(QuizKind::FillBlank, vec![capital()]);
        let id = QuestionId::from("fb1");
        vm.apply(QuizIntent::SetBlank {
            id: id.clone(),
            index: 0,
            value: "Paris".into(),
        })
        .unwrap();

        assert_eq!(vm.apply(QuizIntent::Review), Err(ViewError::Incomplete));
        assert_eq!(vm.notice(), Some(ViewError::Incomplete));
        assert_eq!(vm.take_focus(), Some(id));
        assert_eq!(vm.take_focus(), None);

        let cards = vm.cards();
        let QuestionInputVm::Blanks { segments } = &cards[0].input else {
            panic!("expected blanks");
        };
        let errors: Vec<_> = segments
            .iter()
            .filter_map(|segment| match segment {
                BlankSegment::Blank { index, error, .. } => Some((*index, error.clone())),
                BlankSegment::Text(_) => None,
            })
            .collect();
        assert_eq!(errors, vec![(0, None), (1, Some(BLANK_REQUIRED.to_string()))]);
    }

    #[test]
    fn malformed_matching_renders_inline_error() {
        let vm = vm(
            QuizKind::Matching,
            vec![question("m1", "Pick", QuestionBody::Matching { options: vec![] })],
        );
        assert!(matches!(
            vm.cards()[0].input,
            QuestionInputVm::Malformed { .. }
        ));
    }

    #[test]
    fn review_rows_show_ranked_order() {
        let mut vm = vm(
            QuizKind::Ranking,
            vec![question(
                "r1",
                "Rank",
                QuestionBody::Ranking {
                    tiers: vec!["A".into(), "B".into(), "C".into()],
                },
            )],
        );
        vm.apply(QuizIntent::MoveDown {
            id: QuestionId::from("r1"),
            index: 0,
        })
        .unwrap();
        vm.apply(QuizIntent::Review).unwrap();

        assert_eq!(vm.phase(), QuizPhase::Reviewing);
        assert_eq!(vm.review_rows()[0].answer, "B > A > C");
        assert_eq!(vm.progress_label(), "1 / 1 answered");
    }

    #[test]
    fn confirm_is_not_a_sync_intent() {
        let mut vm = vm(QuizKind::QuestionAnswer, vec![question("q1", "Why?", QuestionBody::Text)]);
        assert!(QuizIntent::Confirm.is_async());
        assert_eq!(vm.apply(QuizIntent::Confirm), Err(ViewError::Unknown));
        assert_eq!(vm.phase(), QuizPhase::Answering);
    }
}
