//! Background work on a dedicated thread.

use crate::cancel::CancellationToken;
use std::io;
use std::thread::{self, JoinHandle};

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("failed to spawn background thread: {0}")]
    Spawn(#[from] io::Error),
    #[error("background task `{0}` panicked")]
    Panicked(String),
}

/// Handle to work running on its own named thread.
///
/// The closure receives a [`CancellationToken`] and is expected to poll it.
/// Dropping the handle without waiting cancels the work and detaches the
/// thread.
pub struct BackgroundTask<T> {
    name: String,
    token: CancellationToken,
    thread: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    pub fn spawn<F>(name: impl Into<String>, work: F) -> Result<Self, TaskError>
    where
        F: FnOnce(CancellationToken) -> T + Send + 'static,
    {
        let name = name.into();
        let token = CancellationToken::new();
        let worker_token = token.clone();

        let thread = thread::Builder::new().name(name.clone()).spawn(move || work(worker_token))?;
        tracing::debug!(task = %name, "background task started");

        Ok(Self { name, token, thread: Some(thread) })
    }
}

impl<T> BackgroundTask<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request cancellation. The worker stops at its next checkpoint.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Block until the work returns.
    pub fn wait(mut self) -> Result<T, TaskError> {
        let Some(thread) = self.thread.take() else {
            return Err(TaskError::Panicked(self.name.clone()));
        };

        thread.join().map_err(|_| {
            tracing::warn!(task = %self.name, "background task panicked");
            TaskError::Panicked(self.name.clone())
        })
    }
}

impl<T> Drop for BackgroundTask<T> {
    fn drop(&mut self) {
        if self.thread.is_some() {
            tracing::debug!(task = %self.name, "background task handle dropped; cancelling");
            self.token.cancel();
        }
    }
}
