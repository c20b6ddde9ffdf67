use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("no answer slot for question {0}")]
    UnknownQuestion(QuestionId),

    #[error("question {id} does not take a {expected} answer")]
    ShapeMismatch {
        id: QuestionId,
        expected: &'static str,
    },

    #[error("question {id} has {len} blanks, index {index} is out of range")]
    BlankOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("{option:?} is not an option of question {id}")]
    UnknownOption { id: QuestionId, option: String },
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// One stored answer; the variant follows the question's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    /// One entry per blank, index-aligned with the prompt segments.
    Blanks(Vec<String>),
    /// A permutation of the question's tiers.
    Ranked(Vec<String>),
    Selected(Option<String>),
}

impl Answer {
    /// True when the learner has not put anything into this answer yet.
    ///
    /// Ranked answers are never blank: the default order is itself an answer.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Blanks(slots) => slots.iter().all(|slot| slot.trim().is_empty()),
            Answer::Ranked(_) => false,
            Answer::Selected(selected) => selected.is_none(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn blanks(&self) -> Option<&[String]> {
        match self {
            Answer::Blanks(slots) => Some(slots),
            _ => None,
        }
    }

    #[must_use]
    pub fn ranked(&self) -> Option<&[String]> {
        match self {
            Answer::Ranked(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        match self {
            Answer::Selected(selected) => selected.as_deref(),
            _ => None,
        }
    }
}

//
// ─── ANSWER STORE ──────────────────────────────────────────────────────────────
//

/// Ordered question id → answer mapping.
///
/// Entries keep insertion order, which is question order when built through
/// normalization. Mutations touch exactly one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerStore {
    entries: Vec<(QuestionId, Answer)>,
}

impl AnswerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&Answer> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, answer)| answer)
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &Answer)> {
        self.entries.iter().map(|(id, answer)| (id, answer))
    }

    /// True if at least one answer carries learner input.
    #[must_use]
    pub fn has_input(&self) -> bool {
        self.entries.iter().any(|(_, answer)| !answer.is_blank())
    }

    /// Insert or replace the answer for `id`, keeping its position if present.
    pub fn insert(&mut self, id: QuestionId, answer: Answer) {
        match self.entries.iter_mut().find(|(entry_id, _)| *entry_id == id) {
            Some((_, slot)) => *slot = answer,
            None => self.entries.push((id, answer)),
        }
    }

    fn slot_mut(&mut self, id: &QuestionId) -> Result<&mut Answer, AnswerError> {
        self.entries
            .iter_mut()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, answer)| answer)
            .ok_or_else(|| AnswerError::UnknownQuestion(id.clone()))
    }

    /// Replace a free-text answer.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if `id` is unknown or not a text question.
    pub fn set_text(&mut self, id: &QuestionId, value: impl Into<String>) -> Result<(), AnswerError> {
        match self.slot_mut(id)? {
            Answer::Text(text) => {
                *text = value.into();
                Ok(())
            }
            _ => Err(AnswerError::ShapeMismatch {
                id: id.clone(),
                expected: "text",
            }),
        }
    }

    /// Replace one blank, leaving the question's other blanks untouched.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if `id` is unknown, not fill-in-the-blank, or
    /// `index` is past the last blank.
    pub fn set_blank(
        &mut self,
        id: &QuestionId,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), AnswerError> {
        match self.slot_mut(id)? {
            Answer::Blanks(slots) => {
                let len = slots.len();
                let slot = slots.get_mut(index).ok_or(AnswerError::BlankOutOfRange {
                    id: id.clone(),
                    index,
                    len,
                })?;
                *slot = value.into();
                Ok(())
            }
            _ => Err(AnswerError::ShapeMismatch {
                id: id.clone(),
                expected: "fill-in-the-blank",
            }),
        }
    }

    /// Swap the ranked items at `from` and `to`.
    ///
    /// Items between the two positions never move. Out-of-range or equal
    /// indices are a no-op. Returns whether the order changed.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if `id` is unknown or not a ranking question.
    pub fn reorder(&mut self, id: &QuestionId, from: usize, to: usize) -> Result<bool, AnswerError> {
        match self.slot_mut(id)? {
            Answer::Ranked(items) => {
                if from == to || from >= items.len() || to >= items.len() {
                    return Ok(false);
                }
                items.swap(from, to);
                Ok(true)
            }
            _ => Err(AnswerError::ShapeMismatch {
                id: id.clone(),
                expected: "ranking",
            }),
        }
    }

    /// Move the item at `index` one position towards the top.
    ///
    /// # Errors
    ///
    /// See [`AnswerStore::reorder`].
    pub fn move_up(&mut self, id: &QuestionId, index: usize) -> Result<bool, AnswerError> {
        match index.checked_sub(1) {
            Some(to) => self.reorder(id, index, to),
            None => self.reorder(id, index, index),
        }
    }

    /// Move the item at `index` one position towards the bottom.
    ///
    /// # Errors
    ///
    /// See [`AnswerStore::reorder`].
    pub fn move_down(&mut self, id: &QuestionId, index: usize) -> Result<bool, AnswerError> {
        self.reorder(id, index, index.saturating_add(1))
    }

    /// Record the selected option, replacing any earlier selection.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if `id` is unknown or not a matching question.
    pub fn select(&mut self, id: &QuestionId, option: impl Into<String>) -> Result<(), AnswerError> {
        match self.slot_mut(id)? {
            Answer::Selected(selected) => {
                *selected = Some(option.into());
                Ok(())
            }
            _ => Err(AnswerError::ShapeMismatch {
                id: id.clone(),
                expected: "matching",
            }),
        }
    }
}

impl FromIterator<(QuestionId, Answer)> for AnswerStore {
    fn from_iter<I: IntoIterator<Item = (QuestionId, Answer)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (id, answer) in iter {
            store.insert(id, answer);
        }
        store
    }
}

impl Serialize for AnswerStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, answer) in &self.entries {
            map.serialize_entry(id, answer)?;
        }
        map.end()
    }
}
