//! Wire Protocol
//!
//! JSON events exchanged over the WebSocket. Frames are tagged by a `type`
//! field with kebab-case event names and camelCase payload fields, e.g.
//! `{"type":"join-room","roomId":"r1","studentName":"Ada"}`.

use serde::{Deserialize, Serialize};

use crate::rooms::{Question, QuestionKind};

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Presenter creates (or resets) a room and becomes its owner.
    CreateRoom { room_id: String },
    /// Student joins a room's roster.
    JoinRoom {
        room_id: String,
        student_name: String,
    },
    /// Student leaves a room's roster.
    LeaveRoom { room_id: String },
    /// Presenter publishes a question and opens it for submissions. The
    /// payload carries the full question so late-created rooms need no
    /// separate authoring round trip.
    ActivateQuestion {
        room_id: String,
        question_id: String,
        question: Question,
    },
    /// Request/reply query for the room's active question.
    GetActiveQuestion { room_id: String },
    /// Answer submission for the (supposedly) active question.
    SubmitAnswer {
        room_id: String,
        question_id: String,
        answer: String,
    },
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Roster delta, sent to every member except the joiner.
    StudentJoined {
        student_id: String,
        student_name: String,
        count: usize,
    },
    /// Roster delta, sent to the remaining members.
    StudentLeft { student_id: String, count: usize },
    /// Full question payload, broadcast to the whole room.
    QuestionActivated {
        room_id: String,
        question_id: String,
        question: Question,
    },
    /// Direct reply to `get-active-question`; `question` is null when no
    /// question is active.
    ActiveQuestion { question: Option<Question> },
    /// Accepted raw answer, relayed to the room except the submitter.
    AnswerReceived {
        room_id: String,
        question_id: String,
        question_type: QuestionKind,
        answer: String,
    },
    /// The owner is gone and the room was torn down.
    RoomClosed { room_id: String },
    /// Synchronous failure reply to the requester.
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::QuestionOption;

    #[test]
    fn test_client_event_wire_names() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"join-room","roomId":"r1","studentName":"Ada"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: "r1".into(),
                student_name: "Ada".into(),
            }
        );

        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"submit-answer","roomId":"r1","questionId":"q1","answer":"yes"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::SubmitAnswer {
                room_id: "r1".into(),
                question_id: "q1".into(),
                answer: "yes".into(),
            }
        );
    }

    #[test]
    fn test_activate_question_payload() {
        let frame = r#"{
            "type": "activate-question",
            "roomId": "r1",
            "questionId": "q1",
            "question": {
                "id": "q1",
                "type": "MULTIPLE_CHOICE",
                "text": "Ready?",
                "options": [
                    {"id": "yes", "text": "Yes"},
                    {"id": "no", "text": "No"}
                ]
            }
        }"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        let ClientEvent::ActivateQuestion { question, .. } = event else {
            panic!("wrong event");
        };
        assert_eq!(question.kind, QuestionKind::MultipleChoice);
        assert_eq!(question.options.unwrap().len(), 2);
    }

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::AnswerReceived {
            room_id: "r1".into(),
            question_id: "q1".into(),
            question_type: QuestionKind::WordCloud,
            answer: "Cat".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "answer-received");
        assert_eq!(json["questionType"], "WORD_CLOUD");
        assert_eq!(json["answer"], "Cat");

        // Absent active question serializes as an explicit null
        let json = serde_json::to_value(ServerEvent::ActiveQuestion { question: None }).unwrap();
        assert_eq!(json["type"], "active-question");
        assert!(json["question"].is_null());

        let q = Question::multiple_choice(
            "q1",
            "Ready?",
            vec![
                QuestionOption::new("yes", "Yes"),
                QuestionOption::new("no", "No"),
            ],
        );
        let json = serde_json::to_value(ServerEvent::QuestionActivated {
            room_id: "r1".into(),
            question_id: "q1".into(),
            question: q,
        })
        .unwrap();
        assert_eq!(json["type"], "question-activated");
        assert_eq!(json["question"]["type"], "MULTIPLE_CHOICE");
    }
}
