//! Completeness rules and the error map they produce.
//!
//! `Validator::full` is the authority for gating session transitions;
//! `Validator::check` covers a single question and only serves to clear
//! errors as soon as the learner fixes them.

use crate::model::{Answer, AnswerStore, Question, QuestionId, QuizKind};
use crate::strategy::{Strategy, strategy_for};

pub const TEXT_REQUIRED: &str = "This field is required.";
pub const BLANK_REQUIRED: &str = "Please fill in this blank.";
pub const SELECTION_REQUIRED: &str = "Please select an answer.";

/// Validation failure for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The whole answer is missing.
    Whole(String),
    /// One slot per blank; `None` marks a filled blank.
    Blanks(Vec<Option<String>>),
}

impl FieldError {
    /// Message for a whole-question error.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            FieldError::Whole(message) => Some(message),
            FieldError::Blanks(_) => None,
        }
    }

    /// Message for blank `index`, if that blank is in error.
    #[must_use]
    pub fn blank(&self, index: usize) -> Option<&str> {
        match self {
            FieldError::Blanks(slots) => slots.get(index).and_then(Option::as_deref),
            FieldError::Whole(_) => None,
        }
    }
}

/// Question id → error, in question order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<(QuestionId, FieldError)>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&FieldError> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, error)| error)
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &FieldError)> {
        self.entries.iter().map(|(id, error)| (id, error))
    }

    /// The first invalid question, by display order.
    #[must_use]
    pub fn first(&self) -> Option<&QuestionId> {
        self.entries.first().map(|(id, _)| id)
    }

    pub fn insert(&mut self, id: QuestionId, error: FieldError) {
        match self.entries.iter_mut().find(|(entry_id, _)| *entry_id == id) {
            Some((_, slot)) => *slot = error,
            None => self.entries.push((id, error)),
        }
    }

    pub fn remove(&mut self, id: &QuestionId) -> Option<FieldError> {
        let index = self.entries.iter().position(|(entry_id, _)| entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    /// Drop the error for `id`, or only for blank `blank` of it.
    ///
    /// A blank-level error disappears once its last slot is cleared.
    pub fn resolve(&mut self, id: &QuestionId, blank: Option<usize>) {
        let Some(error) = self
            .entries
            .iter_mut()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, error)| error)
        else {
            return;
        };

        let fully_resolved = match (error, blank) {
            (FieldError::Blanks(slots), Some(index)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = None;
                }
                slots.iter().all(Option::is_none)
            }
            _ => true,
        };

        if fully_resolved {
            self.remove(id);
        }
    }
}

/// Runs the completeness rule of one quiz kind.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    strategy: &'static Strategy,
}

impl Validator {
    #[must_use]
    pub fn for_kind(kind: QuizKind) -> Self {
        Self {
            strategy: strategy_for(kind),
        }
    }

    /// Validate a single question.
    ///
    /// Questions that fail their format check are reported inline elsewhere
    /// and never block a transition.
    #[must_use]
    pub fn check(&self, question: &Question, answer: Option<&Answer>) -> Option<FieldError> {
        if question.check_format().is_err() {
            return None;
        }
        (self.strategy.validate)(question, answer)
    }

    /// Validate every question against the store, in question order.
    #[must_use]
    pub fn full(&self, questions: &[Question], store: &AnswerStore) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for question in questions {
            if let Some(error) = self.check(question, store.get(&question.id)) {
                errors.insert(question.id.clone(), error);
            }
        }
        errors
    }
}

//
// ─── RULES ─────────────────────────────────────────────────────────────────────
//

pub(crate) fn require_text(_question: &Question, answer: Option<&Answer>) -> Option<FieldError> {
    match answer {
        Some(Answer::Text(text)) if !text.trim().is_empty() => None,
        _ => Some(FieldError::Whole(TEXT_REQUIRED.to_string())),
    }
}

pub(crate) fn require_every_blank(
    question: &Question,
    answer: Option<&Answer>,
) -> Option<FieldError> {
    let slots = answer.and_then(Answer::blanks).unwrap_or(&[]);
    let errors: Vec<Option<String>> = (0..question.blank_count())
        .map(|index| match slots.get(index) {
            Some(value) if !value.trim().is_empty() => None,
            _ => Some(BLANK_REQUIRED.to_string()),
        })
        .collect();

    if errors.iter().all(Option::is_none) {
        None
    } else {
        Some(FieldError::Blanks(errors))
    }
}

pub(crate) fn accept_any_order(_question: &Question, _answer: Option<&Answer>) -> Option<FieldError> {
    None
}

pub(crate) fn require_selection(
    _question: &Question,
    answer: Option<&Answer>,
) -> Option<FieldError> {
    match answer.and_then(Answer::selected) {
        Some(option) if !option.trim().is_empty() => None,
        _ => Some(FieldError::Whole(SELECTION_REQUIRED.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionBody;

    fn question(id: &str, order: i64, body: QuestionBody, prompt: &str) -> Question {
        Question {
            id: QuestionId::from(id),
            prompt: prompt.to_string(),
            hint: String::new(),
            order,
            body,
        }
    }

    fn capital_question() -> Question {
        let prompt = "The capital of France is ____ and known for ____.";
        question(
            "fb1",
            0,
            QuestionBody::FillBlank {
                blanks: Question::count_blanks(prompt),
            },
            prompt,
        )
    }

    #[test]
    fn partial_blanks_error_only_on_empty_slot() {
        let q = capital_question();
        let store: AnswerStore = [(
            q.id.clone(),
            Answer::Blanks(vec!["Paris".into(), String::new()]),
        )]
        .into_iter()
        .collect();

        let errors = Validator::for_kind(QuizKind::FillBlank).full(std::slice::from_ref(&q), &store);

        assert_eq!(errors.len(), 1);
        let error = errors.get(&q.id).unwrap();
        assert_eq!(error.blank(0), None);
        assert_eq!(error.blank(1), Some(BLANK_REQUIRED));
    }

    #[test]
    fn filled_blanks_are_valid() {
        let q = capital_question();
        let store: AnswerStore = [(
            q.id.clone(),
            Answer::Blanks(vec!["Paris".into(), "the Louvre".into()]),
        )]
        .into_iter()
        .collect();
        assert!(Validator::for_kind(QuizKind::FillBlank)
            .full(&[q], &store)
            .is_empty());
    }

    #[test]
    fn whitespace_text_is_incomplete() {
        let q = question("t1", 0, QuestionBody::Text, "Why?");
        let store: AnswerStore = [(q.id.clone(), Answer::Text("   ".into()))]
            .into_iter()
            .collect();
        let errors = Validator::for_kind(QuizKind::QuestionAnswer).full(&[q], &store);
        assert_eq!(
            errors.get(&QuestionId::from("t1")).and_then(FieldError::message),
            Some(TEXT_REQUIRED)
        );
    }

    #[test]
    fn ranking_never_fails() {
        let q = question(
            "r1",
            0,
            QuestionBody::Ranking {
                tiers: vec!["A".into(), "B".into()],
            },
            "Rank",
        );
        let errors = Validator::for_kind(QuizKind::Ranking).full(&[q], &AnswerStore::new());
        assert!(errors.is_empty());
    }

    #[test]
    fn matching_requires_selection_and_reports_in_question_order() {
        let options = QuestionBody::Matching {
            options: vec!["x".into(), "y".into()],
        };
        let first = question("m-b", 1, options.clone(), "first");
        let second = question("m-a", 2, options, "second");
        let store: AnswerStore = [
            (first.id.clone(), Answer::Selected(None)),
            (second.id.clone(), Answer::Selected(None)),
        ]
        .into_iter()
        .collect();

        let errors = Validator::for_kind(QuizKind::Matching).full(&[first, second], &store);
        assert_eq!(errors.first(), Some(&QuestionId::from("m-b")));
    }

    #[test]
    fn malformed_questions_do_not_gate() {
        let q = question("m1", 0, QuestionBody::Matching { options: vec![] }, "x");
        let errors = Validator::for_kind(QuizKind::Matching).full(&[q], &AnswerStore::new());
        assert!(errors.is_empty());
    }

    #[test]
    fn resolve_clears_single_blank_then_entry() {
        let id = QuestionId::from("fb");
        let mut errors = ValidationErrors::new();
        errors.insert(
            id.clone(),
            FieldError::Blanks(vec![Some("a".into()), Some("b".into())]),
        );

        errors.resolve(&id, Some(0));
        assert_eq!(errors.get(&id).and_then(|e| e.blank(1)), Some("b"));
        assert!(errors.get(&id).and_then(|e| e.blank(0)).is_none());

        errors.resolve(&id, Some(1));
        assert!(errors.is_empty());
    }
}
