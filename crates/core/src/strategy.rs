//! Per-kind strategy table.
//!
//! Every quiz player shares one lifecycle; what differs is how a question's
//! body is read, what an empty answer looks like, how completeness is judged
//! and how a loose answer payload is coerced back into shape.

use serde_json::Value;

use crate::model::{Answer, Question, QuestionBody, QuizKind};
use crate::normalize::{self, RawQuestion};
use crate::validation::{self, FieldError};

/// Which mutation operation a kind's answers accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerShape {
    Text,
    Blanks,
    Ranked,
    Selected,
}

impl AnswerShape {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AnswerShape::Text => "text",
            AnswerShape::Blanks => "fill-in-the-blank",
            AnswerShape::Ranked => "ranking",
            AnswerShape::Selected => "matching",
        }
    }
}

pub struct Strategy {
    pub kind: QuizKind,
    pub shape: AnswerShape,
    pub body: fn(&RawQuestion, &str) -> QuestionBody,
    pub empty_answer: fn(&Question) -> Answer,
    pub validate: fn(&Question, Option<&Answer>) -> Option<FieldError>,
    pub coerce: fn(&Question, &Value) -> Answer,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

const fn free_text(kind: QuizKind) -> Strategy {
    Strategy {
        kind,
        shape: AnswerShape::Text,
        body: normalize::text_body,
        empty_answer: normalize::empty_text,
        validate: validation::require_text,
        coerce: normalize::coerce_text,
    }
}

static FLASHCARD: Strategy = free_text(QuizKind::Flashcard);
static FLOWCHART: Strategy = free_text(QuizKind::Flowchart);
static QUESTION_ANSWER: Strategy = free_text(QuizKind::QuestionAnswer);

static FILL_BLANK: Strategy = Strategy {
    kind: QuizKind::FillBlank,
    shape: AnswerShape::Blanks,
    body: normalize::fill_blank_body,
    empty_answer: normalize::empty_blanks,
    validate: validation::require_every_blank,
    coerce: normalize::coerce_blanks,
};

static RANKING: Strategy = Strategy {
    kind: QuizKind::Ranking,
    shape: AnswerShape::Ranked,
    body: normalize::ranking_body,
    empty_answer: normalize::empty_ranked,
    validate: validation::accept_any_order,
    coerce: normalize::coerce_ranked,
};

static MATCHING: Strategy = Strategy {
    kind: QuizKind::Matching,
    shape: AnswerShape::Selected,
    body: normalize::matching_body,
    empty_answer: normalize::empty_selected,
    validate: validation::require_selection,
    coerce: normalize::coerce_selected,
};

#[must_use]
pub fn strategy_for(kind: QuizKind) -> &'static Strategy {
    match kind {
        QuizKind::Flashcard => &FLASHCARD,
        QuizKind::FillBlank => &FILL_BLANK,
        QuizKind::Flowchart => &FLOWCHART,
        QuizKind::Matching => &MATCHING,
        QuizKind::Ranking => &RANKING,
        QuizKind::QuestionAnswer => &QUESTION_ANSWER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_kind() {
        for kind in QuizKind::ALL {
            assert_eq!(strategy_for(kind).kind, kind);
        }
        assert_eq!(strategy_for(QuizKind::Flowchart).shape, AnswerShape::Text);
        assert_eq!(strategy_for(QuizKind::Matching).shape, AnswerShape::Selected);
    }
}
