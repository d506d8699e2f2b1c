use std::time::Duration;

/// Path of the status feed endpoint, appended to the derived base.
pub const WS_STATUS_PATH: &str = "/ws/status";

/// `status` value that means the service is up. Anything else is offline.
pub const STATUS_OK: &str = "ok";

/// Fixed delay between reconnect attempts.
///
/// Deliberately constant — no backoff growth, no retry cap. The probe is a
/// single small JSON message per second, so retrying forever at this rate is
/// cheaper than the bookkeeping to avoid it.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// How often the feed server pushes a status message.
pub const STATUS_PUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Read deadline for the client.
///
/// The feed pushes every [`STATUS_PUSH_INTERVAL`], so a connection that has
/// been silent this long is dead even if TCP has not noticed yet. The client
/// drops it and lets the reconnect loop take over.
pub const STALE_FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum status message size in bytes (64 KB).
pub const WS_MAX_MESSAGE_SIZE: usize = 64 * 1024;
