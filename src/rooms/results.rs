//! Answer Aggregation
//!
//! Per-question result structures and the fold that merges accepted answers
//! into them. Each question kind has its own result shape; the fold decides
//! accept-or-drop for the payload itself (declared option, non-empty text),
//! while relevance checks (room exists, question active) happen upstream in
//! the registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::question::{Question, QuestionKind};

/// One merged term in a word cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    /// Display text, the casing of the first submission that produced the term
    pub text: String,
    /// Number of submissions merged into this term
    pub value: u64,
}

/// One collected open-text response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResponse {
    /// Generated response ID
    pub id: String,
    /// Response text as submitted (trimmed)
    pub text: String,
}

/// Aggregated answers for a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionResults {
    /// Vote count per declared option id; every option is present from
    /// activation with a count of 0.
    MultipleChoice { counts: HashMap<String, u64> },
    /// Distinct terms with frequencies, merged case-insensitively.
    WordCloud { terms: Vec<WordCount> },
    /// Responses in acceptance order, never merged or deduplicated.
    OpenText { responses: Vec<TextResponse> },
}

impl QuestionResults {
    /// Empty results for a freshly activated question.
    pub fn for_question(question: &Question) -> Self {
        match question.kind {
            QuestionKind::MultipleChoice => {
                let counts = question
                    .options
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|o| (o.id.clone(), 0))
                    .collect();
                Self::MultipleChoice { counts }
            }
            QuestionKind::WordCloud => Self::WordCloud { terms: Vec::new() },
            QuestionKind::OpenText => Self::OpenText {
                responses: Vec::new(),
            },
        }
    }

    /// Fold one answer into the results. Returns `false` when the payload is
    /// dropped (unknown option id, empty text after trimming).
    pub fn record(&mut self, question: &Question, answer: &str) -> bool {
        match self {
            Self::MultipleChoice { counts } => {
                if !question.has_option(answer) {
                    return false;
                }
                *counts.entry(answer.to_string()).or_insert(0) += 1;
                true
            }
            Self::WordCloud { terms } => {
                let trimmed = answer.trim();
                if trimmed.is_empty() {
                    return false;
                }
                let folded = trimmed.to_lowercase();
                match terms.iter_mut().find(|t| t.text.to_lowercase() == folded) {
                    Some(term) => term.value += 1,
                    None => terms.push(WordCount {
                        text: trimmed.to_string(),
                        value: 1,
                    }),
                }
                true
            }
            Self::OpenText { responses } => {
                let trimmed = answer.trim();
                if trimmed.is_empty() {
                    return false;
                }
                responses.push(TextResponse {
                    id: Uuid::new_v4().to_string(),
                    text: trimmed.to_string(),
                });
                true
            }
        }
    }

    /// Total number of accepted submissions reflected in these results.
    pub fn total(&self) -> u64 {
        match self {
            Self::MultipleChoice { counts } => counts.values().sum(),
            Self::WordCloud { terms } => terms.iter().map(|t| t.value).sum(),
            Self::OpenText { responses } => responses.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::question::QuestionOption;

    fn choice_question() -> Question {
        Question::multiple_choice(
            "q1",
            "Ready?",
            vec![
                QuestionOption::new("yes", "Yes"),
                QuestionOption::new("no", "No"),
            ],
        )
    }

    #[test]
    fn test_choice_counts_seeded_at_zero() {
        let q = choice_question();
        let results = QuestionResults::for_question(&q);
        let QuestionResults::MultipleChoice { counts } = &results else {
            panic!("wrong results shape");
        };
        assert_eq!(counts.get("yes"), Some(&0));
        assert_eq!(counts.get("no"), Some(&0));
    }

    #[test]
    fn test_choice_tally_and_unknown_option_drop() {
        let q = choice_question();
        let mut results = QuestionResults::for_question(&q);
        assert!(results.record(&q, "yes"));
        assert!(results.record(&q, "yes"));
        assert!(results.record(&q, "no"));
        assert!(!results.record(&q, "maybe"));

        let QuestionResults::MultipleChoice { counts } = &results else {
            panic!("wrong results shape");
        };
        assert_eq!(counts.get("yes"), Some(&2));
        assert_eq!(counts.get("no"), Some(&1));
        assert_eq!(results.total(), 3);
    }

    #[test]
    fn test_word_cloud_case_insensitive_merge() {
        let q = Question::word_cloud("q1", "One word?");
        let mut results = QuestionResults::for_question(&q);
        assert!(results.record(&q, "Cat"));
        assert!(results.record(&q, "cat"));
        assert!(results.record(&q, "  CAT "));
        assert!(results.record(&q, "dog"));

        let QuestionResults::WordCloud { terms } = &results else {
            panic!("wrong results shape");
        };
        assert_eq!(terms.len(), 2);
        // First-seen casing wins for display
        assert_eq!(terms[0].text, "Cat");
        assert_eq!(terms[0].value, 3);
        assert_eq!(terms[1].text, "dog");
        assert_eq!(terms[1].value, 1);
    }

    #[test]
    fn test_word_cloud_empty_after_trim_dropped() {
        let q = Question::word_cloud("q1", "One word?");
        let mut results = QuestionResults::for_question(&q);
        assert!(!results.record(&q, "   "));
        assert_eq!(results.total(), 0);
    }

    #[test]
    fn test_open_text_order_preserved_no_dedup() {
        let q = Question::open_text("q1", "Thoughts?");
        let mut results = QuestionResults::for_question(&q);
        assert!(results.record(&q, "same"));
        assert!(results.record(&q, "other"));
        assert!(results.record(&q, "same"));
        assert!(results.record(&q, "same"));

        let QuestionResults::OpenText { responses } = &results else {
            panic!("wrong results shape");
        };
        let texts: Vec<_> = responses.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["same", "other", "same", "same"]);
        // Every entry carries its own generated id
        let mut ids: Vec<_> = responses.iter().map(|r| r.id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
