//! WebSocket Server
//!
//! The transport shell around the engine: HTTP routes, the per-connection
//! WebSocket loop, and the connection hub that fans server events out to
//! their audiences. The engine never blocks on delivery: sends are
//! `try_send` into each connection's bounded queue, and a slow consumer
//! drops frames rather than stalling the room.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{ClientEvent, ServerEvent};
use super::router::{disconnect_cleanup, route_event, Outgoing};
use crate::config::ServerConfig;
use crate::rooms::RoomRegistry;

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound queues for every live connection.
#[derive(Debug)]
pub struct ConnectionHub {
    conns: RwLock<HashMap<String, mpsc::Sender<ServerEvent>>>,
    queue_size: usize,
}

impl ConnectionHub {
    pub fn new(queue_size: usize) -> Self {
        Self {
            conns: RwLock::new(HashMap::new()),
            queue_size,
        }
    }

    /// Register a connection and hand back the receiving end of its queue.
    pub fn register(&self, conn: &str) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(self.queue_size);
        self.conns.write().insert(conn.to_string(), tx);
        rx
    }

    pub fn unregister(&self, conn: &str) {
        self.conns.write().remove(conn);
    }

    /// Queue one event for one connection. Gone connections are skipped;
    /// a full queue drops the frame.
    pub fn send(&self, conn: &str, event: ServerEvent) {
        let tx = {
            let conns = self.conns.read();
            match conns.get(conn) {
                Some(tx) => tx.clone(),
                None => {
                    debug!(conn, "send skipped, connection gone");
                    return;
                }
            }
        };
        if let Err(err) = tx.try_send(event) {
            warn!(conn, %err, "outbound queue full, frame dropped");
        }
    }

    /// Deliver a routed batch to its audiences.
    pub fn deliver(&self, batch: Vec<Outgoing>) {
        for outgoing in batch {
            for conn in &outgoing.to {
                self.send(conn, outgoing.event.clone());
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.conns.read().len()
    }
}

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub hub: Arc<ConnectionHub>,
    pub started: Instant,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new()),
            hub: Arc::new(ConnectionHub::new(config.queue_size)),
            started: Instant::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    git_hash: &'static str,
    uptime_seconds: u64,
    rooms: usize,
    connections: usize,
}

/// Build the HTTP router: WebSocket upgrade plus a health endpoint.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "classpoll server listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("CLASSPOLL_GIT_HASH"),
        uptime_seconds: state.started.elapsed().as_secs(),
        rooms: state.registry.room_count(),
        connections: state.hub.connection_count(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection loop: a writer task drains the hub queue while the reader
/// parses and routes inbound frames in arrival order. Cleanup always runs
/// the full disconnect scan, since the peer may vanish without a leave
/// event.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = format!("conn_{}", Uuid::new_v4().simple());
    info!(conn = %conn_id, "connection opened");

    let mut rx = state.hub.register(&conn_id);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%err, "failed to encode server event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                debug!(conn = %conn_id, %err, "connection error");
                break;
            }
        };
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => {
                    debug!(conn = %conn_id, ?event, "event received");
                    state.hub.deliver(route_event(&state.registry, &conn_id, event));
                }
                Err(err) => {
                    warn!(conn = %conn_id, %err, "unparseable frame skipped");
                }
            },
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of
            // the protocol
            _ => {}
        }
    }

    state.hub.unregister(&conn_id);
    state.hub.deliver(disconnect_cleanup(&state.registry, &conn_id));
    writer.abort();
    info!(conn = %conn_id, "connection closed");
}
