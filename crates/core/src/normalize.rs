//! Question and answer normalization.
//!
//! Live-fetched and preview-supplied records disagree on field names
//! (`text` vs `question_text`, `hint` vs `hint_text`, payloads under
//! `answers`, `tiers` or `options`). Everything downstream only sees the
//! canonical `Question` and `AnswerStore` produced here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Answer, AnswerStore, Question, QuestionBody, QuestionId, QuizKind};
use crate::strategy::strategy_for;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
    #[error("no questions were returned")]
    Empty,

    #[error("question id {0} appears more than once")]
    DuplicateId(QuestionId),

    #[error("question {id} has no blank marker (____)")]
    NoBlanks { id: QuestionId },
}

/// A question record of uncertain shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl From<&Question> for RawQuestion {
    fn from(question: &Question) -> Self {
        let list = |items: &[String]| Some(Value::from(items.to_vec()));
        Self {
            id: Some(Value::String(question.id.as_str().to_string())),
            prompt: Some(question.prompt.clone()),
            hint: Some(question.hint.clone()),
            order: Some(Value::from(question.order)),
            tiers: match &question.body {
                QuestionBody::Ranking { tiers } => list(tiers),
                _ => None,
            },
            options: match &question.body {
                QuestionBody::Matching { options } => list(options),
                _ => None,
            },
            ..Self::default()
        }
    }
}

/// Convert raw records into canonical questions sorted by `order`.
///
/// The sort is stable: records sharing an order (including the default 0)
/// keep their relative position.
///
/// # Errors
///
/// Returns `NormalizeError` for an empty list, duplicate ids, or a
/// fill-in-the-blank prompt without an exact blank marker.
pub fn normalize(kind: QuizKind, raws: &[RawQuestion]) -> Result<Vec<Question>, NormalizeError> {
    if raws.is_empty() {
        return Err(NormalizeError::Empty);
    }

    let strategy = strategy_for(kind);
    let mut seen = HashSet::with_capacity(raws.len());
    let mut questions = Vec::with_capacity(raws.len());

    for (index, raw) in raws.iter().enumerate() {
        let id = raw
            .id
            .as_ref()
            .and_then(question_id)
            .unwrap_or_else(|| QuestionId::positional(index));
        if !seen.insert(id.clone()) {
            return Err(NormalizeError::DuplicateId(id));
        }

        let prompt = first_present(&[&raw.prompt, &raw.question_text, &raw.text]);
        let hint = first_present(&[&raw.hint, &raw.hint_text]);
        let order = raw.order.as_ref().map_or(0, order_value);
        let body = (strategy.body)(raw, &prompt);

        questions.push(Question {
            id,
            prompt,
            hint,
            order,
            body,
        });
    }

    questions.sort_by_key(|question| question.order);

    if let Some(question) = questions
        .iter()
        .find(|question| matches!(question.body, QuestionBody::FillBlank { blanks: 0 }))
    {
        return Err(NormalizeError::NoBlanks {
            id: question.id.clone(),
        });
    }

    Ok(questions)
}

/// Per-kind empty answers for every question.
#[must_use]
pub fn empty_answers(kind: QuizKind, questions: &[Question]) -> AnswerStore {
    let strategy = strategy_for(kind);
    questions
        .iter()
        .map(|question| (question.id.clone(), (strategy.empty_answer)(question)))
        .collect()
}

/// Coerce a loosely-shaped answer map onto the questions' canonical shapes.
///
/// Unknown ids are dropped; questions without a value get their empty default.
#[must_use]
pub fn normalize_answers(
    kind: QuizKind,
    questions: &[Question],
    raw: &Map<String, Value>,
) -> AnswerStore {
    let strategy = strategy_for(kind);
    questions
        .iter()
        .map(|question| {
            let answer = raw.get(question.id.as_str()).map_or_else(
                || (strategy.empty_answer)(question),
                |value| (strategy.coerce)(question, value),
            );
            (question.id.clone(), answer)
        })
        .collect()
}

//
// ─── FIELD HELPERS ─────────────────────────────────────────────────────────────
//

fn question_id(value: &Value) -> Option<QuestionId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(QuestionId::new(s.trim())),
        Value::Number(n) => Some(QuestionId::new(n.to_string())),
        _ => None,
    }
}

fn order_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn first_present(candidates: &[&Option<String>]) -> String {
    candidates
        .iter()
        .find_map(|candidate| candidate.as_deref().filter(|s| !s.trim().is_empty()))
        .map(str::to_string)
        .unwrap_or_default()
}

fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(fields) => ["text", "label", "value", "option", "tier"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        Value::Null | Value::Array(_) => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(item_text)
            .filter(|item| !item.trim().is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn list_field(primary: Option<&Value>, fallback: Option<&Value>) -> Vec<String> {
    let primary = primary.map(string_list).unwrap_or_default();
    if primary.is_empty() {
        fallback.map(string_list).unwrap_or_default()
    } else {
        primary
    }
}

//
// ─── PER-SHAPE BUILDERS ────────────────────────────────────────────────────────
//

pub(crate) fn text_body(_raw: &RawQuestion, _prompt: &str) -> QuestionBody {
    QuestionBody::Text
}

pub(crate) fn fill_blank_body(_raw: &RawQuestion, prompt: &str) -> QuestionBody {
    QuestionBody::FillBlank {
        blanks: Question::count_blanks(prompt),
    }
}

pub(crate) fn ranking_body(raw: &RawQuestion, _prompt: &str) -> QuestionBody {
    QuestionBody::Ranking {
        tiers: list_field(raw.tiers.as_ref(), raw.answers.as_ref()),
    }
}

pub(crate) fn matching_body(raw: &RawQuestion, _prompt: &str) -> QuestionBody {
    QuestionBody::Matching {
        options: list_field(raw.options.as_ref(), raw.answers.as_ref()),
    }
}

pub(crate) fn empty_text(_question: &Question) -> Answer {
    Answer::Text(String::new())
}

pub(crate) fn empty_blanks(question: &Question) -> Answer {
    Answer::Blanks(vec![String::new(); question.blank_count()])
}

pub(crate) fn empty_ranked(question: &Question) -> Answer {
    Answer::Ranked(question.tiers().to_vec())
}

pub(crate) fn empty_selected(_question: &Question) -> Answer {
    Answer::Selected(None)
}

pub(crate) fn coerce_text(_question: &Question, value: &Value) -> Answer {
    Answer::Text(item_text(value).unwrap_or_default())
}

pub(crate) fn coerce_blanks(question: &Question, value: &Value) -> Answer {
    let mut slots: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| item_text(item).unwrap_or_default())
            .collect(),
        other => item_text(other).into_iter().collect(),
    };
    slots.resize(question.blank_count(), String::new());
    Answer::Blanks(slots)
}

pub(crate) fn coerce_ranked(question: &Question, value: &Value) -> Answer {
    let candidate = string_list(value);
    let mut sorted_candidate = candidate.clone();
    let mut sorted_tiers = question.tiers().to_vec();
    sorted_candidate.sort();
    sorted_tiers.sort();

    if sorted_candidate == sorted_tiers {
        Answer::Ranked(candidate)
    } else {
        Answer::Ranked(question.tiers().to_vec())
    }
}

pub(crate) fn coerce_selected(question: &Question, value: &Value) -> Answer {
    let selected = item_text(value).filter(|choice| question.options().contains(choice));
    Answer::Selected(selected)
}
