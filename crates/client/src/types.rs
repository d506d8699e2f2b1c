//! Public types for the liveness client.

use std::time::Duration;

use pulse_protocol::constants::{RECONNECT_DELAY, STALE_FEED_TIMEOUT, WS_MAX_MESSAGE_SIZE};

/// Snapshot of the tracked liveness signal.
///
/// Owned and mutated exclusively by the client; subscribers receive clones
/// through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LivenessState {
    /// `true` while the feed is connected and reporting `"ok"`.
    pub is_online: bool,
    /// Timestamp from the last well-formed status message, if it carried one.
    pub last_timestamp: Option<String>,
}

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before the first `start`.
    Idle,
    /// Dialing the feed endpoint.
    Connecting,
    /// Connection established.
    Connected,
    /// Connection lost; the fixed-delay timer is running.
    ReconnectPending,
    /// Terminal. Reached only through `stop`.
    Shutdown,
}

/// Timing and limits for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Read deadline — a connection silent this long is dropped.
    pub stale_after: Duration,
    /// Maximum accepted message size in bytes.
    pub max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
            stale_after: STALE_FEED_TIMEOUT,
            max_message_size: WS_MAX_MESSAGE_SIZE,
        }
    }
}

/// Returns the API base address from the `PULSE_API_URL` environment
/// variable, if set and non-empty.
pub fn api_base_from_env() -> Option<String> {
    std::env::var("PULSE_API_URL")
        .ok()
        .filter(|v| !v.is_empty())
}
