//! Wire contract for the Pulse status feed.
//!
//! Defines the JSON payload pushed over `/ws/status`, the derivation of the
//! feed URL from an HTTP(S) base address, and the timing constants shared by
//! the client and the feed server.

pub mod constants;
pub mod endpoint;
pub mod status;

pub use endpoint::{EndpointError, status_endpoint};
pub use status::StatusMessage;
