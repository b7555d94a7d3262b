//! Process signals that request shutdown.

use std::io;

use tokio::sync::watch;
use tracing::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Installed handlers for SIGINT, SIGTERM and SIGQUIT.
#[cfg(unix)]
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    /// Wait for the first signal and return its name.
    pub async fn recv(self) -> &'static str {
        let Self {
            mut interrupt,
            mut terminate,
            mut quit,
        } = self;

        tokio::select! {
            name = on_signal(async { delivered(interrupt.recv().await) }, "SIGINT") => name,
            name = on_signal(async { delivered(terminate.recv().await) }, "SIGTERM") => name,
            name = on_signal(async { delivered(quit.recv().await) }, "SIGQUIT") => name,
        }
    }
}

/// `Signal::recv` yields `None` once the stream can deliver nothing more.
#[cfg(unix)]
fn delivered(received: Option<()>) -> io::Result<()> {
    received.ok_or_else(|| io::Error::other("signal stream closed"))
}

/// Ctrl-C on platforms without unix signals.
#[cfg(not(unix))]
pub struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(self) -> &'static str {
        on_signal(tokio::signal::ctrl_c(), "ctrl-c").await
    }
}

/// Resolve to `name` once `wait` succeeds.
///
/// A failed listener is logged and then never resolves.
async fn on_signal<F>(wait: F, name: &'static str) -> &'static str
where
    F: Future<Output = io::Result<()>>,
{
    match wait.await {
        Ok(()) => name,
        Err(e) => {
            warn!(signal = name, error = %e, "signal listener failed, ignoring it");
            std::future::pending().await
        }
    }
}

/// Flip `shutdown` once a signal arrives.
pub async fn forward(signals: ShutdownSignals, shutdown: watch::Sender<bool>) {
    let name = signals.recv().await;
    info!(signal = name, "shutdown signal received");
    let _ = shutdown.send(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn received_signal_resolves_to_its_name() {
        assert_eq!(on_signal(async { Ok(()) }, "SIGTERM").await, "SIGTERM");
    }

    #[tokio::test]
    async fn failed_listener_never_requests_shutdown() {
        let (tx, rx) = watch::channel(false);
        let waited = tokio::time::timeout(Duration::from_millis(50), async move {
            let name = on_signal(async { Err(io::Error::other("no console")) }, "ctrl-c").await;
            let _ = tx.send(true);
            name
        })
        .await;

        assert!(waited.is_err());
        assert!(!*rx.borrow());
    }

    #[cfg(unix)]
    #[test]
    fn closed_signal_stream_is_an_error() {
        assert!(delivered(Some(())).is_ok());
        assert!(delivered(None).is_err());
    }
}
