//! Connection session: dial, read, reconnect.
//!
//! One spawned task owns the whole lifecycle serially — connect, drain the
//! feed, publish offline, wait the fixed delay, repeat. Because connect, the
//! read loop, and the reconnect sleep never coexist, the manager can never
//! hold both an open connection and a pending reconnect timer, and no event
//! from a superseded connection can outlive it.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use pulse_protocol::StatusMessage;

use crate::types::{ClientConfig, LivenessState, Phase};

/// Close reason sent on intentional teardown (code 1000).
const CLOSE_REASON: &str = "client shutdown";

/// Everything the session task needs from the manager.
pub(crate) struct SessionContext {
    pub(crate) config: ClientConfig,
    pub(crate) state_tx: watch::Sender<LivenessState>,
    pub(crate) phase_tx: watch::Sender<Phase>,
    pub(crate) cancel: CancellationToken,
}

impl SessionContext {
    fn set_phase(&self, phase: Phase) {
        if *self.phase_tx.borrow() != phase {
            trace!(?phase, "phase change");
            self.phase_tx.send_replace(phase);
        }
    }

    /// Marks the feed offline. The last timestamp is kept — it still
    /// describes the last moment the service was known to be up.
    fn set_offline(&self) {
        self.state_tx.send_if_modified(|state| {
            if state.is_online {
                state.is_online = false;
                true
            } else {
                false
            }
        });
    }
}

/// Runs the connect/read/reconnect loop until cancellation.
pub(crate) async fn run(endpoint: String, ctx: SessionContext) {
    loop {
        ctx.set_phase(Phase::Connecting);

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(ctx.config.max_message_size);
        ws_config.max_frame_size = Some(ctx.config.max_message_size);

        let attempt = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            r = tokio_tungstenite::connect_async_with_config(
                endpoint.as_str(), Some(ws_config), false) => r,
        };

        match attempt {
            Ok((stream, _)) => {
                info!(url = %endpoint, "status feed connected");
                ctx.set_phase(Phase::Connected);
                ctx.state_tx.send_if_modified(|state| {
                    if state.is_online {
                        false
                    } else {
                        state.is_online = true;
                        true
                    }
                });

                let (mut write, read) = stream.split();
                read_feed(read, &ctx).await;

                if ctx.cancel.is_cancelled() {
                    // Intentional teardown: normal closure with a reason.
                    let frame = tungstenite::protocol::CloseFrame {
                        code: CloseCode::Normal,
                        reason: CLOSE_REASON.into(),
                    };
                    let _ = write.send(tungstenite::Message::Close(Some(frame))).await;
                }
            }
            Err(e) => {
                warn!(url = %endpoint, error = %e, "status feed connect failed");
            }
        }

        ctx.set_offline();

        if ctx.cancel.is_cancelled() {
            break;
        }

        ctx.set_phase(Phase::ReconnectPending);
        debug!(
            delay_ms = ctx.config.reconnect_delay.as_millis() as u64,
            "scheduling reconnect"
        );
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(ctx.config.reconnect_delay) => {}
        }
    }

    ctx.set_phase(Phase::Shutdown);
}

/// Reads the feed until it closes, errors, goes stale, or is cancelled.
///
/// Generic over the message stream so tests can drive it with fake frames.
/// The stale deadline is reset by any incoming frame; the feed pushes every
/// second, so prolonged silence means the connection is dead.
pub(crate) async fn read_feed<S>(mut read: S, ctx: &SessionContext)
where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let stale = tokio::time::sleep(ctx.config.stale_after);
    tokio::pin!(stale);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => return,

            () = &mut stale => {
                warn!("status feed silent too long, dropping connection");
                return;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        stale.as_mut().reset(
                            tokio::time::Instant::now() + ctx.config.stale_after);

                        match msg {
                            tungstenite::Message::Text(text) => {
                                if text.len() > ctx.config.max_message_size {
                                    warn!("status message too large ({} bytes)", text.len());
                                    ctx.set_offline();
                                } else {
                                    apply_status_text(&text, &ctx.state_tx);
                                }
                            }
                            tungstenite::Message::Close(frame) => {
                                debug!(?frame, "received close frame");
                                return;
                            }
                            _ => {} // Ping/Pong/Binary — nothing to track
                        }
                    }
                    Some(Err(e)) => {
                        warn!("status feed read error: {e}");
                        ctx.set_offline();
                        return;
                    }
                    None => {
                        debug!("status feed stream ended");
                        return;
                    }
                }
            }
        }
    }
}

/// Applies one text frame to the liveness state.
///
/// A well-formed message sets `is_online` from its `status` and replaces the
/// timestamp with whatever the message carries (including nothing). A
/// malformed message degrades to offline but keeps the previous timestamp.
pub(crate) fn apply_status_text(text: &str, state_tx: &watch::Sender<LivenessState>) {
    match serde_json::from_str::<StatusMessage>(text) {
        Ok(msg) => {
            trace!(status = %msg.status, "status message");
            let next = LivenessState {
                is_online: msg.is_online(),
                last_timestamp: msg.datetime_utc,
            };
            state_tx.send_if_modified(|state| {
                if *state == next {
                    false
                } else {
                    *state = next;
                    true
                }
            });
        }
        Err(e) => {
            warn!("malformed status message: {e}");
            state_tx.send_if_modified(|state| {
                if state.is_online {
                    state.is_online = false;
                    true
                } else {
                    false
                }
            });
        }
    }
}
