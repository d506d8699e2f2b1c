//! Lifecycle and subscription surface of the liveness client.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pulse_protocol::endpoint::{EndpointError, status_endpoint};

use crate::session::{self, SessionContext};
use crate::types::{ClientConfig, LivenessState, Phase};

/// Tracks the status feed of one service.
///
/// `start` spawns a single session task that owns the connection for its
/// whole life; `stop` cancels it and waits for it to finish, so once `stop`
/// returns no further state is published — even if transport events for the
/// old connection were still in flight.
pub struct LivenessClient {
    config: ClientConfig,
    state_tx: watch::Sender<LivenessState>,
    phase_tx: watch::Sender<Phase>,
    started: AtomicBool,
    cancel: CancellationToken,
    session: Mutex<Option<JoinHandle<()>>>,
}

impl Default for LivenessClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl LivenessClient {
    /// Creates a client in the idle state, reporting offline.
    pub fn new(config: ClientConfig) -> Self {
        let (state_tx, _) = watch::channel(LivenessState::default());
        let (phase_tx, _) = watch::channel(Phase::Idle);
        Self {
            config,
            state_tx,
            phase_tx,
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            session: Mutex::new(None),
        }
    }

    /// Subscribes to liveness updates.
    pub fn subscribe(&self) -> watch::Receiver<LivenessState> {
        self.state_tx.subscribe()
    }

    /// Returns the current liveness snapshot.
    pub fn current(&self) -> LivenessState {
        self.state_tx.borrow().clone()
    }

    /// Returns the current connection phase.
    pub fn phase(&self) -> Phase {
        *self.phase_tx.borrow()
    }

    /// Subscribes to connection phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    /// Connects to the status feed of the service at `base_addr`.
    ///
    /// The feed URL is derived from the base address (`http→ws`,
    /// `https→wss`, `/ws/status` appended). Calling `start` again — or after
    /// [`stop`](Self::stop) — is a no-op.
    pub async fn start(&self, base_addr: &str) -> Result<(), EndpointError> {
        if self.cancel.is_cancelled() || self.started.swap(true, Ordering::SeqCst) {
            debug!("start ignored, already started or shut down");
            return Ok(());
        }

        let endpoint = match status_endpoint(base_addr) {
            Ok(url) => url,
            Err(e) => {
                // Leave the client usable with a corrected base address.
                self.started.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let mut guard = self.session.lock().await;
        info!(url = %endpoint, "starting liveness client");
        let ctx = SessionContext {
            config: self.config.clone(),
            state_tx: self.state_tx.clone(),
            phase_tx: self.phase_tx.clone(),
            cancel: self.cancel.clone(),
        };
        *guard = Some(tokio::spawn(session::run(endpoint, ctx)));
        Ok(())
    }

    /// Shuts the client down.
    ///
    /// Cancels any pending reconnect, closes an open connection with a
    /// normal-closure frame, and waits for the session task to finish. Safe
    /// to call from any state, any number of times. Terminal: a later
    /// `start` will not revive the client.
    pub async fn stop(&self) {
        self.started.store(true, Ordering::SeqCst);
        self.cancel.cancel();

        if let Some(handle) = self.session.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("session task failed: {e}");
            }
        }

        self.phase_tx.send_replace(Phase::Shutdown);
        debug!("liveness client stopped");
    }
}
