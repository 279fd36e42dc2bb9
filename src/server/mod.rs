//! Server
//!
//! Transport layer: wire protocol, event routing, and the WebSocket/HTTP
//! shell around the room registry.

pub mod events;
pub mod router;
pub mod ws;

pub use events::{ClientEvent, ServerEvent};
pub use router::{disconnect_cleanup, route_event, Outgoing};
pub use ws::{app, serve, AppState, ConnectionHub, ServerError};
