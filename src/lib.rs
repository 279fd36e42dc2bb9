//! classpoll library
//!
//! Real-time classroom polling: a presenter creates a room, publishes
//! questions to connected students over WebSocket, and answers aggregate
//! live per question type. All state is process-memory resident; nothing
//! survives a restart.

pub mod config;
pub mod rooms;
pub mod server;
