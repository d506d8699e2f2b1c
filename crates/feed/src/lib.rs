//! WebSocket status feed server.
//!
//! Accepts connections on `GET /ws/status` and pushes a
//! [`StatusMessage`](pulse_protocol::StatusMessage) once per interval until
//! the client disconnects or the server shuts down.

mod server;

pub use server::{FeedConfig, StatusFeed};

/// Errors produced by the feed server.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
