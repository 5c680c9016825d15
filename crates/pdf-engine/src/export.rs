//! Export on a background thread.

use crate::embed::{embed_cancellable, EmbedError, EmbedOptions};
use doc_model::Annotation;
use pdfmark_scheduler::BackgroundTask;
use std::sync::Arc;

/// Starts background exports.
pub struct ExportJob;

impl ExportJob {
    /// Embed `annotations` into a copy of `source` off the calling thread.
    ///
    /// The worker only reads through its own `Arc`, so the caller's bytes are
    /// never written, whether the job finishes, fails or is cancelled.
    pub fn spawn(
        source: Arc<[u8]>,
        annotations: Vec<Annotation>,
        options: EmbedOptions,
    ) -> Result<ExportHandle, EmbedError> {
        let task = BackgroundTask::spawn("pdfmark-export", move |token| {
            let result = embed_cancellable(&source, &annotations, &options, &token);
            match &result {
                Ok(bytes) => tracing::info!(bytes = bytes.len(), "export finished"),
                Err(EmbedError::Cancelled) => tracing::info!("export cancelled"),
                Err(err) => tracing::warn!(error = %err, "export failed"),
            }
            result
        })?;

        Ok(ExportHandle { task })
    }
}

/// Handle to a running export. Dropping it cancels the export.
pub struct ExportHandle {
    task: BackgroundTask<Result<Vec<u8>, EmbedError>>,
}

impl ExportHandle {
    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Block until the export completes and return the new document bytes.
    pub fn wait(self) -> Result<Vec<u8>, EmbedError> {
        self.task.wait()?
    }
}
