//! Broadcast-once cancellation for a run

use std::sync::Arc;
use tokio::sync::watch;

/// Process-wide stop flag shared by the deadline task, abort paths and workers
///
/// The signal starts open and can be closed exactly once. Closing an already
/// closed signal is a no-op, so the deadline task and an explicit abort (Ctrl+C)
/// may race freely.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationSignal {
    /// Create an open signal
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Close the signal
    ///
    /// Returns `true` if this call closed it, `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    /// Whether the signal has been closed
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Create a listener for a worker
    pub fn listener(&self) -> CancellationListener {
        CancellationListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a [`CancellationSignal`], owned by one worker
#[derive(Debug, Clone)]
pub struct CancellationListener {
    rx: watch::Receiver<bool>,
}

impl CancellationListener {
    /// Non-blocking check used at tick and point boundaries
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal is closed
    ///
    /// Never resolves if every [`CancellationSignal`] handle was dropped while
    /// still open, since nothing can close it anymore.
    pub async fn closed(&mut self) {
        if self.rx.wait_for(|closed| *closed).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_starts_open() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_closed());
        assert!(!signal.listener().is_closed());
    }

    #[test]
    fn test_close_is_idempotent() {
        let signal = CancellationSignal::new();
        let listener = signal.listener();

        assert!(signal.close());
        assert!(!signal.close());
        assert!(!signal.clone().close());

        assert!(signal.is_closed());
        assert!(listener.is_closed());
    }

    #[test]
    fn test_close_without_listeners() {
        let signal = CancellationSignal::new();
        assert!(signal.close());
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn test_listener_created_after_close() {
        let signal = CancellationSignal::new();
        signal.close();

        let mut listener = signal.listener();
        assert!(listener.is_closed());
        listener.closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_wakes_all_listeners() {
        let signal = CancellationSignal::new();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mut listener = signal.listener();
                tokio::spawn(async move { listener.closed().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.close();

        for handle in handles {
            handle.await.expect("listener task panicked");
        }
    }
}
