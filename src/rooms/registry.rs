//! Room Registry
//!
//! In-memory registry of live polling rooms. The registry exclusively owns
//! every room reachable from it; rooms own their questions and results and
//! are never shared across registry entries. All mutating operations take
//! the write lock for their full duration, so operations on a room never
//! interleave and no partial state is observable from outside.
//!
//! The registry is an explicitly owned object handed to the transport layer
//! (`Arc<RoomRegistry>`), not a process global, so tests can run several
//! independent registries side by side.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use super::question::{Question, QuestionKind};
use super::results::QuestionResults;
use super::RoomError;

/// Roster entry for a joined student.
#[derive(Debug, Clone)]
pub struct StudentInfo {
    /// Display name supplied at join time
    pub name: String,
    /// Per-room arrival counter, for audit/log ordering
    pub seq: u64,
}

/// One live polling room.
#[derive(Debug)]
struct Room {
    id: String,
    /// Connection that created the room (the presenter)
    owner: String,
    /// Every connection subscribed to this room's broadcasts (owner + students)
    members: HashSet<String>,
    /// Student roster keyed by connection id
    students: HashMap<String, StudentInfo>,
    /// Authored questions in authorship order
    questions: Vec<Question>,
    /// At most one question open for submissions
    active_question_id: Option<String>,
    /// Aggregated answers per question id
    results: HashMap<String, QuestionResults>,
    next_seq: u64,
}

impl Room {
    fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        let mut members = HashSet::new();
        members.insert(owner.clone());
        Self {
            id: id.into(),
            owner,
            members,
            students: HashMap::new(),
            questions: Vec::new(),
            active_question_id: None,
            results: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Members to notify about a change, excluding the connection that
    /// caused it.
    fn audience_except(&self, except: &str) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| m.as_str() != except)
            .cloned()
            .collect()
    }

    fn audience(&self) -> Vec<String> {
        self.members.iter().cloned().collect()
    }
}

/// Result of a successful `join`.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// False when the connection was already on the roster (idempotent rejoin)
    pub newly_joined: bool,
    /// Arrival counter assigned to the student
    pub seq: u64,
    /// Roster size after the join
    pub count: usize,
    /// Members to notify, excluding the joiner
    pub notify: Vec<String>,
}

/// Result of a successful `leave`.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    /// Roster size after the leave
    pub count: usize,
    /// Remaining members to notify
    pub notify: Vec<String>,
}

/// Per-room effect of a connection disappearing.
#[derive(Debug, Clone)]
pub struct DisconnectOutcome {
    pub room_id: String,
    /// True when the lost connection owned the room and the room was dropped
    pub closed: bool,
    /// Roster size after cleanup
    pub count: usize,
    /// Remaining members to notify
    pub notify: Vec<String>,
}

/// Result of activating a question.
#[derive(Debug, Clone)]
pub struct ActivateOutcome {
    pub question: Question,
    /// Every member of the room, including the requester
    pub notify: Vec<String>,
}

/// Result of an accepted answer submission.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub kind: QuestionKind,
    /// Members to relay the raw answer to, excluding the submitter
    pub notify: Vec<String>,
}

/// Registry of live rooms.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh room id for callers that do not bring their own code.
    pub fn new_room_id() -> String {
        format!("room_{}", Uuid::new_v4().simple())
    }

    /// Create a room owned by `owner`. Recreating an existing id resets the
    /// room; creation never fails.
    pub fn create_room(&self, room_id: &str, owner: &str) {
        let mut rooms = self.rooms.write();
        if rooms.insert(room_id.to_string(), Room::new(room_id, owner)).is_some() {
            info!(room = room_id, "room recreated, previous state discarded");
        } else {
            info!(room = room_id, "room created");
        }
    }

    /// Add a connection to a room's roster. Unknown rooms are a no-op
    /// (`None`); rejoining is idempotent.
    pub fn join(&self, room_id: &str, conn: &str, name: &str) -> Option<JoinOutcome> {
        let mut rooms = self.rooms.write();
        let room = rooms.get_mut(room_id)?;
        room.members.insert(conn.to_string());

        let (newly_joined, seq) = match room.students.get(conn) {
            Some(existing) => (false, existing.seq),
            None => {
                let seq = room.next_seq;
                room.next_seq += 1;
                room.students.insert(
                    conn.to_string(),
                    StudentInfo {
                        name: name.to_string(),
                        seq,
                    },
                );
                (true, seq)
            }
        };

        debug!(room = room_id, student = conn, seq, "student joined");
        Some(JoinOutcome {
            newly_joined,
            seq,
            count: room.students.len(),
            notify: room.audience_except(conn),
        })
    }

    /// Remove a connection from a room's roster. Unknown room or absent
    /// student is a no-op.
    pub fn leave(&self, room_id: &str, conn: &str) -> Option<LeaveOutcome> {
        let mut rooms = self.rooms.write();
        let room = rooms.get_mut(room_id)?;
        room.students.remove(conn)?;
        room.members.remove(conn);

        debug!(room = room_id, student = conn, "student left");
        Some(LeaveOutcome {
            count: room.students.len(),
            notify: room.audience_except(conn),
        })
    }

    /// Clean up after a lost connection. Scans every room rather than
    /// trusting a last-known room id, since disconnects can arrive without a
    /// preceding leave. Rooms owned by the lost connection are dropped.
    pub fn disconnect(&self, conn: &str) -> Vec<DisconnectOutcome> {
        let mut rooms = self.rooms.write();
        let mut outcomes = Vec::new();
        let mut dropped = Vec::new();

        for room in rooms.values_mut() {
            if room.owner == conn {
                outcomes.push(DisconnectOutcome {
                    room_id: room.id.clone(),
                    closed: true,
                    count: room.students.len(),
                    notify: room.audience_except(conn),
                });
                dropped.push(room.id.clone());
            } else if room.students.remove(conn).is_some() {
                room.members.remove(conn);
                outcomes.push(DisconnectOutcome {
                    room_id: room.id.clone(),
                    closed: false,
                    count: room.students.len(),
                    notify: room.audience_except(conn),
                });
            } else {
                room.members.remove(conn);
            }
        }

        for room_id in dropped {
            rooms.remove(&room_id);
            info!(room = %room_id, "room dropped, owner disconnected");
        }
        outcomes
    }

    /// Drop a room and all of its state. Idempotent.
    pub fn drop_room(&self, room_id: &str) -> bool {
        let removed = self.rooms.write().remove(room_id).is_some();
        if removed {
            info!(room = room_id, "room dropped");
        }
        removed
    }

    /// Validate and store a question. A question with an already-known id
    /// replaces the stored one in place; if its content changed, previously
    /// accumulated results for that id are discarded.
    pub fn add_question(&self, room_id: &str, question: Question) -> Result<(), RoomError> {
        question.validate()?;
        let mut rooms = self.rooms.write();
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;

        match room.questions.iter_mut().find(|q| q.id == question.id) {
            Some(existing) if *existing == question => {}
            Some(existing) => {
                room.results.remove(&question.id);
                *existing = question;
            }
            None => room.questions.push(question),
        }
        Ok(())
    }

    /// Make `question_id` the room's single active question. Activating the
    /// already-active question is a harmless no-op; the swap is a single
    /// assignment under the write lock, so no observer ever sees two active
    /// questions or none mid-transition.
    pub fn activate_question(
        &self,
        room_id: &str,
        question_id: &str,
    ) -> Result<ActivateOutcome, RoomError> {
        let mut rooms = self.rooms.write();
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;
        let question = room
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| RoomError::QuestionNotFound(question_id.to_string()))?
            .clone();

        room.active_question_id = Some(question.id.clone());
        room.results
            .entry(question.id.clone())
            .or_insert_with(|| QuestionResults::for_question(&question));

        info!(room = room_id, question = question_id, "question activated");
        Ok(ActivateOutcome {
            question,
            notify: room.audience(),
        })
    }

    /// The room's currently active question, if any.
    pub fn active_question(&self, room_id: &str) -> Option<Question> {
        let mut rooms = self.rooms.write();
        let room = rooms.get_mut(room_id)?;
        let active_id = room.active_question_id.clone()?;
        match room.questions.iter().find(|q| q.id == active_id) {
            Some(question) => Some(question.clone()),
            None => {
                // A dangling active id means a mutation-order bug; clear it
                // rather than report a question that no longer exists.
                debug_assert!(false, "active question id does not resolve");
                room.active_question_id = None;
                None
            }
        }
    }

    /// Accept-or-drop gate for an answer submission. Accepts only when the
    /// room exists, a question is active, and `question_id` matches it; the
    /// per-kind fold may still drop the payload (unknown option, empty
    /// text). `None` means dropped, silently by design.
    pub fn submit_answer(
        &self,
        room_id: &str,
        conn: &str,
        question_id: &str,
        answer: &str,
    ) -> Option<AnswerOutcome> {
        let mut rooms = self.rooms.write();
        let Some(room) = rooms.get_mut(room_id) else {
            debug!(room = room_id, "answer dropped, unknown room");
            return None;
        };
        if room.active_question_id.as_deref() != Some(question_id) {
            debug!(
                room = room_id,
                question = question_id,
                "answer dropped, question not active"
            );
            return None;
        }
        let Some(question) = room.questions.iter().find(|q| q.id == question_id) else {
            debug_assert!(false, "active question id does not resolve");
            room.active_question_id = None;
            return None;
        };

        let results = room
            .results
            .entry(question_id.to_string())
            .or_insert_with(|| QuestionResults::for_question(question));
        if !results.record(question, answer) {
            debug!(room = room_id, question = question_id, "answer dropped by fold");
            return None;
        }

        Some(AnswerOutcome {
            kind: question.kind,
            notify: room.audience_except(conn),
        })
    }

    /// Snapshot of the aggregated results for a question. Reflects every
    /// submission accepted before this call.
    pub fn results(&self, room_id: &str, question_id: &str) -> Option<QuestionResults> {
        let rooms = self.rooms.read();
        rooms.get(room_id)?.results.get(question_id).cloned()
    }

    /// Current roster size of a room.
    pub fn roster_count(&self, room_id: &str) -> Option<usize> {
        let rooms = self.rooms.read();
        Some(rooms.get(room_id)?.students.len())
    }

    /// Roster snapshot in arrival order.
    pub fn roster(&self, room_id: &str) -> Option<Vec<(String, StudentInfo)>> {
        let rooms = self.rooms.read();
        let room = rooms.get(room_id)?;
        let mut entries: Vec<_> = room
            .students
            .iter()
            .map(|(conn, info)| (conn.clone(), info.clone()))
            .collect();
        entries.sort_by_key(|(_, info)| info.seq);
        Some(entries)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }
}
