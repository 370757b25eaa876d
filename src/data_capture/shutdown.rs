//! One-shot shutdown signal shared by every trigger of a capture session.
//!
//! The OS signal listener, the capture-duration timer and the stream itself
//! all publish to the same [`ShutdownSignal`]. Only the first publication is
//! kept; the session's single consumer waits on it and runs the teardown.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::types::ShutdownReason;

#[derive(Debug, Default)]
pub struct ShutdownSignal {
    reason: OnceLock<ShutdownReason>,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Publishes `reason`. Returns `false` when another trigger already fired.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.reason.set(reason).is_ok() {
            debug!("Shutdown triggered: {}", reason);
            // a stored permit wakes a consumer that is not waiting yet
            self.notify.notify_one();
            true
        } else {
            false
        }
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Resolves with the first published reason.
    pub async fn wait(&self) -> ShutdownReason {
        loop {
            if let Some(reason) = self.reason() {
                return reason;
            }
            self.notify.notified().await;
        }
    }
}

/// Arms a one-shot deadline when `duration` is set.
pub fn arm_deadline(signal: &Arc<ShutdownSignal>, duration: Option<Duration>) -> Option<JoinHandle<()>> {
    let duration = duration?;
    let signal = Arc::clone(signal);
    info!("Capture will stop after {} second(s)", duration.as_secs());
    Some(tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        signal.trigger(ShutdownReason::Deadline);
    }))
}

/// Forwards Ctrl-C and, on unix, SIGTERM to `signal`.
pub fn listen_for_os_signals(signal: &Arc<ShutdownSignal>) -> JoinHandle<()> {
    let signal = Arc::clone(signal);
    tokio::spawn(async move {
        let reason = wait_for_os_signal().await;
        info!("Received {}, terminating", reason);
        signal.trigger(reason);
    })
}

#[cfg(unix)]
async fn wait_for_os_signal() -> ShutdownReason {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => tokio::select! {
            _ = tokio::signal::ctrl_c() => ShutdownReason::Interrupt,
            _ = term.recv() => ShutdownReason::Terminate,
        },
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            wait_for_ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() -> ShutdownReason {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}
