//! Cancellation token for cooperative cancellation of background work.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Returned by [`CancellationToken::check`] once the token is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Shared cancellation flag.
///
/// Workers poll `is_cancelled()` (or `check()`) between units of work and
/// stop early. All clones observe the same state.
///
/// # Example
///
/// ```
/// use pdfmark_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
///
/// token.cancel();
/// assert!(worker_token.check().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// The token starts in a non-cancelled state.
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancelled, for use with `?` at checkpoints.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn check_fails_only_after_cancel() {
        let token = CancellationToken::default();
        assert_eq!(token.check(), Ok(()));

        token.cancel();
        token.cancel();
        assert_eq!(token.check(), Err(Cancelled));
    }

    #[test]
    fn worker_stops_at_next_checkpoint() {
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let mut checkpoints = 0u32;
            ready_tx.send(()).expect("signal ready");
            while worker_token.check().is_ok() {
                checkpoints += 1;
                thread::yield_now();
            }
            checkpoints
        });

        ready_rx.recv().expect("worker started");
        token.cancel();
        worker.join().expect("worker should exit after cancel");
        assert!(token.is_cancelled());
    }
}
