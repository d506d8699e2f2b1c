//! Status feed WebSocket server.
//!
//! Listens on a TCP port, upgrades HTTP GET `/ws/status` to WebSocket, and
//! pushes a status payload to every connected client once per interval.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pulse_protocol::StatusMessage;
use pulse_protocol::constants::{STATUS_PUSH_INTERVAL, WS_STATUS_PATH};

use crate::FeedError;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    /// How often each client receives a status message.
    pub push_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            port: 0,
            push_interval: STATUS_PUSH_INTERVAL,
        }
    }
}

/// The status feed server.
pub struct StatusFeed {
    port: u16,
    push_interval: Duration,
    started_at: Instant,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl StatusFeed {
    /// Creates a new feed server.
    pub fn new(config: FeedConfig) -> Arc<Self> {
        Arc::new(Self {
            port: config.port,
            push_interval: config.push_interval,
            started_at: Instant::now(),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        })
    }

    /// Returns the local address the server is listening on.
    ///
    /// Only available after [`run`](Self::run) binds the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    /// Gracefully shuts down the server and all client connections.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs the server until cancellation.
    pub async fn run(self: &Arc<Self>) -> Result<(), FeedError> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let listener = TcpListener::bind(addr).await?;

        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        info!("status feed listening on {local_addr}");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("status feed shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "incoming connection");
                            let server = self.clone();
                            tokio::spawn(async move {
                                server.handle_client(stream, peer).await;
                            });
                        }
                        Err(e) => warn!("accept error: {e}"),
                    }
                }
            }
        }
    }

    /// Upgrades one TCP connection and pushes status messages until the
    /// client goes away or the server shuts down.
    async fn handle_client(&self, stream: TcpStream, peer: SocketAddr) {
        let check_path = |req: &Request, resp: Response| {
            if req.uri().path() == WS_STATUS_PATH {
                Ok(resp)
            } else {
                let mut reject = ErrorResponse::new(Some("unknown path".into()));
                *reject.status_mut() = StatusCode::NOT_FOUND;
                Err(reject)
            }
        };

        let mut ws = match accept_hdr_async(stream, check_path).await {
            Ok(ws) => ws,
            Err(e) => {
                debug!(%peer, "handshake rejected: {e}");
                return;
            }
        };
        debug!(%peer, "client subscribed to status feed");

        let mut ticker = tokio::time::interval(self.push_interval);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "server shutdown".into(),
                    };
                    let _ = ws.close(Some(frame)).await;
                    return;
                }

                _ = ticker.tick() => {
                    let uptime = round2(self.started_at.elapsed().as_secs_f64());
                    let msg = StatusMessage::online(Utc::now().to_rfc3339(), uptime);
                    let json = match serde_json::to_string(&msg) {
                        Ok(j) => j,
                        Err(e) => {
                            warn!("failed to encode status message: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = ws.send(tungstenite::Message::Text(json.into())).await {
                        debug!(%peer, "push failed, dropping client: {e}");
                        return;
                    }
                }

                incoming = ws.next() => {
                    match incoming {
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            debug!(%peer, ?frame, "client closed");
                            return;
                        }
                        Some(Ok(_)) => {} // The feed is push-only.
                        Some(Err(e)) => {
                            debug!(%peer, "read error: {e}");
                            return;
                        }
                        None => return,
                    }
                }
            }
        }
    }
}

/// Rounds to two decimals, matching the original uptime format.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
