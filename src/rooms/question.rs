//! Question Types
//!
//! Question shapes and authoring-time validation. A question's kind is a
//! closed enum so validation and aggregation stay exhaustive when a new
//! kind is added.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::RoomError;

/// Kind of question, driving both rendering and aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    /// Single choice among declared options (radio button style)
    #[serde(rename = "MULTIPLE_CHOICE")]
    MultipleChoice,
    /// Free text merged into a term/frequency cloud
    #[serde(rename = "WORD_CLOUD")]
    WordCloud,
    /// Free text collected verbatim, one entry per submission
    #[serde(rename = "OPEN_TEXT")]
    OpenText,
}

/// Selectable option for a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Option ID (unique within the question)
    pub id: String,
    /// Option label
    pub text: String,
}

impl QuestionOption {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A question authored by the room owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Question ID (unique within its room)
    pub id: String,
    /// Question kind
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Prompt shown to participants
    pub text: String,
    /// Declared options; only present for multiple-choice questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<QuestionOption>>,
}

impl Question {
    /// Create a multiple-choice question.
    pub fn multiple_choice(
        id: impl Into<String>,
        text: impl Into<String>,
        options: Vec<QuestionOption>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: QuestionKind::MultipleChoice,
            text: text.into(),
            options: Some(options),
        }
    }

    /// Create a word-cloud question.
    pub fn word_cloud(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: QuestionKind::WordCloud,
            text: text.into(),
            options: None,
        }
    }

    /// Create an open-text question.
    pub fn open_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: QuestionKind::OpenText,
            text: text.into(),
            options: None,
        }
    }

    /// Whether `option_id` is one of this question's declared options.
    pub fn has_option(&self, option_id: &str) -> bool {
        self.options
            .as_deref()
            .is_some_and(|opts| opts.iter().any(|o| o.id == option_id))
    }

    /// Validate the question shape before it enters a room.
    ///
    /// Empty prompts are rejected for every kind. Multiple-choice questions
    /// need at least two options with distinct ids and non-empty labels
    /// (after trimming); the other kinds must not carry options at all.
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.id.trim().is_empty() {
            return Err(RoomError::InvalidQuestion("question id is empty".into()));
        }
        if self.text.trim().is_empty() {
            return Err(RoomError::InvalidQuestion("question text is empty".into()));
        }

        match self.kind {
            QuestionKind::MultipleChoice => {
                let options = self.options.as_deref().unwrap_or_default();
                let non_empty = options
                    .iter()
                    .filter(|o| !o.text.trim().is_empty())
                    .count();
                if non_empty < 2 {
                    return Err(RoomError::InvalidQuestion(
                        "multiple-choice question needs at least 2 non-empty options".into(),
                    ));
                }
                let mut seen = HashSet::new();
                for option in options {
                    if option.id.trim().is_empty() {
                        return Err(RoomError::InvalidQuestion("option id is empty".into()));
                    }
                    if !seen.insert(option.id.as_str()) {
                        return Err(RoomError::InvalidQuestion(format!(
                            "duplicate option id '{}'",
                            option.id
                        )));
                    }
                }
            }
            QuestionKind::WordCloud | QuestionKind::OpenText => {
                if self.options.as_deref().is_some_and(|o| !o.is_empty()) {
                    return Err(RoomError::InvalidQuestion(
                        "options are only valid for multiple-choice questions".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}
