//! Off-thread work with cooperative cancellation.
//!
//! Long-running operations (document export) run on a background thread so
//! interactive geometry work never waits on them.

mod cancel;
mod task;

pub use cancel::{Cancelled, CancellationToken};
pub use task::{BackgroundTask, TaskError};
