//! User cancellation input

use std::io::{BufRead, IsTerminal};

use tokio::sync::mpsc;
use tracing::debug;

/// Source of user cancellation requests
///
/// Each request is one message. Requests that arrive while nothing is waiting
/// stay queued until [`CancelSignal::drain`] discards them.
#[derive(Debug, Default)]
pub struct CancelSignal {
    rx: Option<mpsc::UnboundedReceiver<()>>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// A signal paired with a sender, for programmatic cancellation
    pub fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx: Some(rx) })
    }

    /// Listen for Enter on stdin when stdin is a terminal
    ///
    /// Spawns one background thread that lives until stdin closes or the signal
    /// is dropped.
    pub fn stdin() -> Self {
        if !std::io::stdin().is_terminal() {
            debug!("stdin is not a terminal, cancellation disabled");
            return Self::never();
        }
        let (tx, signal) = Self::channel();
        spawn_stdin_listener(tx);
        signal
    }

    /// Discard pending requests, returning how many were dropped
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        if let Some(rx) = self.rx.as_mut() {
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
        }
        dropped
    }

    /// Wait for the next request; pends forever if the source is gone
    pub async fn recv(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            if rx.recv().await.is_some() {
                return;
            }
            self.rx = None;
        }
        std::future::pending::<()>().await
    }
}

fn spawn_stdin_listener(tx: mpsc::UnboundedSender<()>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(()).is_err() {
                        break;
                    }
                }
            }
        }
        debug!("stdin listener stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_channel_signal_fires() {
        let (tx, mut signal) = CancelSignal::channel();
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_discards_stale_requests() {
        let (tx, mut signal) = CancelSignal::channel();
        tx.send(()).unwrap();
        tx.send(()).unwrap();
        assert_eq!(signal.drain(), 2);

        let waited = tokio::time::timeout(Duration::from_millis(20), signal.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_and_closed_signals_pend() {
        let mut never = CancelSignal::never();
        assert!(tokio::time::timeout(Duration::from_secs(5), never.recv()).await.is_err());

        let (tx, mut closed) = CancelSignal::channel();
        drop(tx);
        assert!(tokio::time::timeout(Duration::from_secs(5), closed.recv()).await.is_err());
    }
}
