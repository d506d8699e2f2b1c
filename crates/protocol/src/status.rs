use serde::{Deserialize, Serialize};

use crate::constants::STATUS_OK;

/// Status payload pushed by the feed server.
///
/// The client only interprets `status` and `datetime_utc`; the remaining
/// fields are informational extras the feed includes for humans watching the
/// raw stream. Unknown fields on the wire are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl StatusMessage {
    /// Creates an "ok" message with the given timestamp and uptime.
    pub fn online(datetime_utc: impl Into<String>, uptime_seconds: f64) -> Self {
        Self {
            status: STATUS_OK.into(),
            datetime_utc: Some(datetime_utc.into()),
            uptime_seconds: Some(uptime_seconds),
            platform: Some(std::env::consts::OS.into()),
        }
    }

    /// Returns `true` if this message reports the service as up.
    pub fn is_online(&self) -> bool {
        self.status == STATUS_OK
    }
}
