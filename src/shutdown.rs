//! Signal-driven drain-and-exit coordination.
//!
//! The coordinator moves linearly through [`ShutdownState::Running`],
//! [`ShutdownState::Draining`] and [`ShutdownState::Stopped`]. A termination signal cancels the
//! shared [`CancellationToken`], which stops the dispatcher's read loop and releases the
//! listening socket. Every worker already spawned through the [`TaskTracker`] is then awaited to
//! completion; none is aborted.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tracker: TaskTracker,
    state: Arc<watch::Sender<ShutdownState>>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        ShutdownCoordinator {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            state: Arc::new(state),
        }
    }

    /// The cancellation signal observed by the dispatcher.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// The join/count mechanism request workers are spawned on.
    #[must_use]
    pub fn tracker(&self) -> TaskTracker {
        self.tracker.clone()
    }

    #[must_use]
    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// `Running -> Draining`: cancel the dispatcher. Later calls are no-ops.
    pub fn begin_shutdown(&self) {
        if self.advance(ShutdownState::Draining) {
            self.token.cancel();
        }
    }

    /// Wait for SIGINT or SIGTERM, then [begin shutdown][Self::begin_shutdown].
    pub async fn wait_for_signal(self) {
        tokio::select! {
            () = termination_signal() => {
                info!("Shutting down...");
                self.begin_shutdown();
            }
            () = self.token.cancelled() => {}
        }
    }

    /// `Draining -> Stopped`: wait for every tracked worker to finish on its own.
    pub async fn drain(&self) {
        self.begin_shutdown();
        self.tracker.close();
        if !self.tracker.is_empty() {
            info!("waiting for {} in-flight requests", self.tracker.len());
        }
        self.tracker.wait().await;
        self.advance(ShutdownState::Stopped);
    }

    fn advance(&self, next: ShutdownState) -> bool {
        self.state.send_if_modified(|current| {
            if *current < next {
                *current = next;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(unix)]
async fn termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = sigterm.recv() => {},
            }
        }
        Err(err) => {
            tracing::warn!("unable to listen for SIGTERM: {err}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn termination_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
