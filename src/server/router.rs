//! Event Router
//!
//! Maps inbound client events onto registry operations and resolves the
//! fan-out for each resulting state change: reply to the requester, notify
//! the rest of the room, or broadcast to every member. The router returns
//! `Outgoing` batches and the WebSocket layer performs the sends, so full
//! event flows are testable without sockets.

use tracing::{debug, warn};

use super::events::{ClientEvent, ServerEvent};
use crate::rooms::{RoomError, RoomRegistry};

/// One server event addressed to an explicit set of connections.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub to: Vec<String>,
    pub event: ServerEvent,
}

impl Outgoing {
    fn reply(conn: &str, event: ServerEvent) -> Self {
        Self {
            to: vec![conn.to_string()],
            event,
        }
    }
}

fn error_reply(conn: &str, code: &str, message: impl Into<String>) -> Vec<Outgoing> {
    vec![Outgoing::reply(
        conn,
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
        },
    )]
}

/// Dispatch one inbound event from `conn` and resolve its fan-out.
pub fn route_event(registry: &RoomRegistry, conn: &str, event: ClientEvent) -> Vec<Outgoing> {
    match event {
        ClientEvent::CreateRoom { room_id } => {
            registry.create_room(&room_id, conn);
            Vec::new()
        }

        ClientEvent::JoinRoom {
            room_id,
            student_name,
        } => {
            let Some(outcome) = registry.join(&room_id, conn, &student_name) else {
                // Unknown room: expected transient state, not an error
                debug!(room = %room_id, "join ignored, unknown room");
                return Vec::new();
            };
            if !outcome.newly_joined {
                return Vec::new();
            }
            vec![Outgoing {
                to: outcome.notify,
                event: ServerEvent::StudentJoined {
                    student_id: conn.to_string(),
                    student_name,
                    count: outcome.count,
                },
            }]
        }

        ClientEvent::LeaveRoom { room_id } => {
            let Some(outcome) = registry.leave(&room_id, conn) else {
                return Vec::new();
            };
            vec![Outgoing {
                to: outcome.notify,
                event: ServerEvent::StudentLeft {
                    student_id: conn.to_string(),
                    count: outcome.count,
                },
            }]
        }

        ClientEvent::ActivateQuestion {
            room_id,
            question_id,
            question,
        } => {
            if question.id != question_id {
                return error_reply(
                    conn,
                    "invalid-question",
                    format!(
                        "question id mismatch: '{}' vs '{}'",
                        question.id, question_id
                    ),
                );
            }
            match registry.add_question(&room_id, question) {
                Ok(()) => {}
                Err(RoomError::RoomNotFound(_)) => {
                    debug!(room = %room_id, "activate ignored, unknown room");
                    return Vec::new();
                }
                Err(err) => return error_reply(conn, "invalid-question", err.to_string()),
            }
            match registry.activate_question(&room_id, &question_id) {
                Ok(outcome) => vec![Outgoing {
                    to: outcome.notify,
                    event: ServerEvent::QuestionActivated {
                        room_id,
                        question_id,
                        question: outcome.question,
                    },
                }],
                Err(RoomError::RoomNotFound(_)) => Vec::new(),
                Err(err) => {
                    warn!(room = %room_id, question = %question_id, %err, "activate failed");
                    error_reply(conn, "question-not-found", err.to_string())
                }
            }
        }

        ClientEvent::GetActiveQuestion { room_id } => {
            vec![Outgoing::reply(
                conn,
                ServerEvent::ActiveQuestion {
                    question: registry.active_question(&room_id),
                },
            )]
        }

        ClientEvent::SubmitAnswer {
            room_id,
            question_id,
            answer,
        } => {
            let Some(outcome) = registry.submit_answer(&room_id, conn, &question_id, &answer)
            else {
                // Dropped by the accept gate: silent by design
                return Vec::new();
            };
            vec![Outgoing {
                to: outcome.notify,
                event: ServerEvent::AnswerReceived {
                    room_id,
                    question_id,
                    question_type: outcome.kind,
                    answer,
                },
            }]
        }
    }
}

/// Cleanup for a lost connection: scan every room, remove the connection,
/// and notify the survivors. Rooms owned by the lost connection are torn
/// down and their members told so.
pub fn disconnect_cleanup(registry: &RoomRegistry, conn: &str) -> Vec<Outgoing> {
    registry
        .disconnect(conn)
        .into_iter()
        .map(|outcome| Outgoing {
            event: if outcome.closed {
                ServerEvent::RoomClosed {
                    room_id: outcome.room_id,
                }
            } else {
                ServerEvent::StudentLeft {
                    student_id: conn.to_string(),
                    count: outcome.count,
                }
            },
            to: outcome.notify,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::{Question, QuestionKind, QuestionOption};

    fn yes_no_question(id: &str) -> Question {
        Question::multiple_choice(
            id,
            "Ready?",
            vec![
                QuestionOption::new("yes", "Yes"),
                QuestionOption::new("no", "No"),
            ],
        )
    }

    fn activate(registry: &RoomRegistry, conn: &str, room: &str, q: Question) -> Vec<Outgoing> {
        route_event(
            registry,
            conn,
            ClientEvent::ActivateQuestion {
                room_id: room.into(),
                question_id: q.id.clone(),
                question: q,
            },
        )
    }

    fn join(registry: &RoomRegistry, conn: &str, room: &str, name: &str) -> Vec<Outgoing> {
        route_event(
            registry,
            conn,
            ClientEvent::JoinRoom {
                room_id: room.into(),
                student_name: name.into(),
            },
        )
    }

    fn setup() -> RoomRegistry {
        let registry = RoomRegistry::new();
        route_event(
            &registry,
            "teacher",
            ClientEvent::CreateRoom {
                room_id: "r1".into(),
            },
        );
        registry
    }

    #[test]
    fn test_join_notifies_others_not_joiner() {
        let registry = setup();
        join(&registry, "p1", "r1", "Ada");
        let out = join(&registry, "p2", "r1", "Grace");

        assert_eq!(out.len(), 1);
        let mut to = out[0].to.clone();
        to.sort();
        assert_eq!(to, vec!["p1", "teacher"]);
        assert_eq!(
            out[0].event,
            ServerEvent::StudentJoined {
                student_id: "p2".into(),
                student_name: "Grace".into(),
                count: 2,
            }
        );
    }

    #[test]
    fn test_rejoin_emits_nothing() {
        let registry = setup();
        join(&registry, "p1", "r1", "Ada");
        assert!(join(&registry, "p1", "r1", "Ada").is_empty());
    }

    #[test]
    fn test_join_unknown_room_emits_nothing() {
        let registry = setup();
        assert!(join(&registry, "p1", "nope", "Ada").is_empty());
    }

    #[test]
    fn test_activation_broadcast_includes_requester() {
        let registry = setup();
        join(&registry, "p1", "r1", "Ada");
        let out = activate(&registry, "teacher", "r1", yes_no_question("q1"));

        assert_eq!(out.len(), 1);
        let mut to = out[0].to.clone();
        to.sort();
        assert_eq!(to, vec!["p1", "teacher"]);
        assert!(matches!(
            out[0].event,
            ServerEvent::QuestionActivated { .. }
        ));
    }

    #[test]
    fn test_invalid_question_error_to_requester_only() {
        let registry = setup();
        let bad = Question::multiple_choice("q1", "Ready?", vec![QuestionOption::new("yes", "Yes")]);
        let out = activate(&registry, "teacher", "r1", bad);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, vec!["teacher"]);
        assert!(matches!(out[0].event, ServerEvent::Error { .. }));
        // Nothing was applied
        assert!(registry.active_question("r1").is_none());
    }

    #[test]
    fn test_question_id_mismatch_rejected() {
        let registry = setup();
        let out = route_event(
            &registry,
            "teacher",
            ClientEvent::ActivateQuestion {
                room_id: "r1".into(),
                question_id: "other".into(),
                question: yes_no_question("q1"),
            },
        );
        assert!(matches!(out[0].event, ServerEvent::Error { .. }));
    }

    #[test]
    fn test_get_active_question_replies_to_requester() {
        let registry = setup();
        let out = route_event(
            &registry,
            "p1",
            ClientEvent::GetActiveQuestion {
                room_id: "r1".into(),
            },
        );
        assert_eq!(out, vec![Outgoing::reply(
            "p1",
            ServerEvent::ActiveQuestion { question: None },
        )]);

        activate(&registry, "teacher", "r1", yes_no_question("q1"));
        let out = route_event(
            &registry,
            "p1",
            ClientEvent::GetActiveQuestion {
                room_id: "r1".into(),
            },
        );
        assert_eq!(out[0].to, vec!["p1"]);
        let ServerEvent::ActiveQuestion {
            question: Some(ref q),
        } = out[0].event
        else {
            panic!("expected active question reply");
        };
        assert_eq!(q.id, "q1");
    }

    #[test]
    fn test_answer_relayed_to_room_except_submitter() {
        let registry = setup();
        join(&registry, "p1", "r1", "Ada");
        join(&registry, "p2", "r1", "Grace");
        activate(&registry, "teacher", "r1", yes_no_question("q1"));

        let out = route_event(
            &registry,
            "p1",
            ClientEvent::SubmitAnswer {
                room_id: "r1".into(),
                question_id: "q1".into(),
                answer: "yes".into(),
            },
        );
        assert_eq!(out.len(), 1);
        let mut to = out[0].to.clone();
        to.sort();
        assert_eq!(to, vec!["p2", "teacher"]);
        assert_eq!(
            out[0].event,
            ServerEvent::AnswerReceived {
                room_id: "r1".into(),
                question_id: "q1".into(),
                question_type: QuestionKind::MultipleChoice,
                answer: "yes".into(),
            }
        );
    }

    #[test]
    fn test_dropped_answer_emits_nothing() {
        let registry = setup();
        join(&registry, "p1", "r1", "Ada");
        // No active question yet
        let out = route_event(
            &registry,
            "p1",
            ClientEvent::SubmitAnswer {
                room_id: "r1".into(),
                question_id: "q1".into(),
                answer: "yes".into(),
            },
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_disconnect_without_leave_notifies_survivor() {
        let registry = setup();
        join(&registry, "p1", "r1", "Ada");
        join(&registry, "p2", "r1", "Grace");

        let out = disconnect_cleanup(&registry, "p2");
        assert_eq!(out.len(), 1);
        let mut to = out[0].to.clone();
        to.sort();
        assert_eq!(to, vec!["p1", "teacher"]);
        assert_eq!(
            out[0].event,
            ServerEvent::StudentLeft {
                student_id: "p2".into(),
                count: 1,
            }
        );
    }

    #[test]
    fn test_owner_disconnect_closes_room() {
        let registry = setup();
        join(&registry, "p1", "r1", "Ada");

        let out = disconnect_cleanup(&registry, "teacher");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, vec!["p1"]);
        assert_eq!(
            out[0].event,
            ServerEvent::RoomClosed {
                room_id: "r1".into(),
            }
        );
        assert_eq!(registry.room_count(), 0);
    }
}
