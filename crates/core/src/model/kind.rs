use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The quiz player variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizKind {
    Flashcard,
    FillBlank,
    Flowchart,
    Matching,
    Ranking,
    QuestionAnswer,
}

impl QuizKind {
    pub const ALL: [QuizKind; 6] = [
        QuizKind::Flashcard,
        QuizKind::FillBlank,
        QuizKind::Flowchart,
        QuizKind::Matching,
        QuizKind::Ranking,
        QuizKind::QuestionAnswer,
    ];

    /// Slug used in device-local storage keys and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            QuizKind::Flashcard => "flashcard",
            QuizKind::FillBlank => "fill-blank",
            QuizKind::Flowchart => "flowchart",
            QuizKind::Matching => "matching",
            QuizKind::Ranking => "ranking",
            QuizKind::QuestionAnswer => "qa",
        }
    }
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown quiz kind: {0}")]
pub struct ParseKindError(String);

impl FromStr for QuizKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        QuizKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == needle)
            .ok_or(ParseKindError(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip_through_from_str() {
        for kind in QuizKind::ALL {
            assert_eq!(kind.as_str().parse::<QuizKind>().unwrap(), kind);
        }
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("Fill-Blank".parse::<QuizKind>().unwrap(), QuizKind::FillBlank);
        assert!("essay".parse::<QuizKind>().is_err());
    }
}
