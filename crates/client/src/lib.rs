//! Liveness connection manager for the Pulse status feed.
//!
//! Maintains one persistent WebSocket connection to `/ws/status`, publishes
//! the current [`LivenessState`] to subscribers, and transparently
//! re-establishes the connection after any failure with a fixed delay until
//! [`LivenessClient::stop`] is called.

pub mod manager;
pub(crate) mod session;
pub mod types;

pub use manager::LivenessClient;
pub use types::{ClientConfig, LivenessState, Phase, api_base_from_env};
