//! Server Configuration

use serde::{Deserialize, Serialize};

/// Process configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// Listen port
    pub port: u16,
    /// Outbound queue size per connection
    pub queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3001,
            queue_size: 100,
        }
    }
}

impl ServerConfig {
    /// Defaults with the `PORT` environment variable applied when set to a
    /// valid port number.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        config
    }
}
