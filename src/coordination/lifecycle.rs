//! Process lifecycle: termination signals and the shared shutdown flag.
//!
//! The flag only ever moves from running to stopped. Signal tasks set it
//! and log; the poll loop reads it between iterations and while sleeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::error::Result;

#[derive(Debug, Default)]
struct Inner {
    shutdown_requested: AtomicBool,
    wake: Notify,
}

/// Cloneable handle to the process-wide shutdown flag
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install SIGINT/SIGTERM handlers that flip the shutdown flag
    pub fn register(&self) -> Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            for (kind, name) in [
                (SignalKind::interrupt(), "SIGINT"),
                (SignalKind::terminate(), "SIGTERM"),
            ] {
                let mut stream = signal(kind)?;
                let lifecycle = self.clone();
                tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        lifecycle.on_signal(name);
                    }
                });
            }
        }

        #[cfg(not(unix))]
        {
            let lifecycle = self.clone();
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    lifecycle.on_signal("Ctrl+C");
                }
            });
        }

        info!("Shutdown handlers registered (SIGINT, SIGTERM)");
        Ok(())
    }

    fn on_signal(&self, name: &str) {
        warn!("Received {} - initiating graceful shutdown", name);
        self.set_flag();
    }

    fn set_flag(&self) {
        self.inner.shutdown_requested.store(true, Ordering::SeqCst);
        self.inner.wake.notify_waiters();
    }

    /// False once shutdown has been requested
    pub fn is_running(&self) -> bool {
        !self.inner.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Trigger shutdown from inside the application
    pub fn request_shutdown(&self, reason: &str) {
        warn!("Shutdown initiated: {}", reason);
        self.set_flag();
    }

    /// Sleep for `interval` unless shutdown is requested first.
    ///
    /// Returns `true` if the full interval elapsed and the loop should go on.
    pub async fn sleep_or_shutdown(&self, interval: Duration) -> bool {
        let woken = self.inner.wake.notified();
        if !self.is_running() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => self.is_running(),
            _ = woken => false,
        }
    }
}
