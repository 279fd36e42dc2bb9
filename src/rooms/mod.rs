//! Rooms
//!
//! The coordination engine: room registry, question authoring and
//! validation, and per-question answer aggregation.

pub mod question;
pub mod registry;
pub mod results;

pub use question::{Question, QuestionKind, QuestionOption};
pub use registry::{
    ActivateOutcome, AnswerOutcome, DisconnectOutcome, JoinOutcome, LeaveOutcome, RoomRegistry,
    StudentInfo,
};
pub use results::{QuestionResults, TextResponse, WordCount};

use thiserror::Error;

/// Room operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Referenced room does not exist
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    /// Referenced question does not exist in the room
    #[error("question '{0}' not found")]
    QuestionNotFound(String),
    /// Authored question failed shape validation
    #[error("invalid question: {0}")]
    InvalidQuestion(String),
}
