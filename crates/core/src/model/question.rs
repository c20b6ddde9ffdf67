use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// A blank is exactly four underscores bounded by word boundaries.
///
/// `_` is a word character, so longer or shorter runs never match.
static BLANK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b____\b").expect("blank marker pattern is valid"));

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Structural problem with a single normalized question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormatError {
    #[error("no blank marker (____) found in the prompt")]
    NoBlanks,

    #[error("a ranking question needs at least two tiers, found {found}")]
    TooFewTiers { found: usize },

    #[error("a matching question needs at least one option")]
    NoOptions,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Type-specific structure of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum QuestionBody {
    /// Flashcard, Q&A and flowchart steps: one free-text answer.
    Text,
    FillBlank { blanks: usize },
    Ranking { tiers: Vec<String> },
    Matching { options: Vec<String> },
}

/// Canonical question, the output of normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub hint: String,
    pub order: i64,
    pub body: QuestionBody,
}

impl Question {
    /// Number of exact blank markers in `prompt`.
    #[must_use]
    pub fn count_blanks(prompt: &str) -> usize {
        BLANK_MARKER.find_iter(prompt).count()
    }

    /// Prompt text split around the blank markers.
    ///
    /// Always yields `blanks + 1` segments, so segment `i` precedes blank `i`.
    #[must_use]
    pub fn prompt_segments(&self) -> Vec<&str> {
        BLANK_MARKER.split(&self.prompt).collect()
    }

    #[must_use]
    pub fn blank_count(&self) -> usize {
        match &self.body {
            QuestionBody::FillBlank { blanks } => *blanks,
            _ => 0,
        }
    }

    #[must_use]
    pub fn tiers(&self) -> &[String] {
        match &self.body {
            QuestionBody::Ranking { tiers } => tiers,
            _ => &[],
        }
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        match &self.body {
            QuestionBody::Matching { options } => options,
            _ => &[],
        }
    }

    /// Structural check of the type-specific payload.
    ///
    /// # Errors
    ///
    /// Returns the `FormatError` describing the first structural defect.
    pub fn check_format(&self) -> Result<(), FormatError> {
        match &self.body {
            QuestionBody::Text => Ok(()),
            QuestionBody::FillBlank { blanks: 0 } => Err(FormatError::NoBlanks),
            QuestionBody::FillBlank { .. } => Ok(()),
            QuestionBody::Ranking { tiers } if tiers.len() < 2 => {
                Err(FormatError::TooFewTiers { found: tiers.len() })
            }
            QuestionBody::Ranking { .. } => Ok(()),
            QuestionBody::Matching { options } if options.is_empty() => Err(FormatError::NoOptions),
            QuestionBody::Matching { .. } => Ok(()),
        }
    }
}
