//! Execution-context abstraction for callback delivery.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Where `receive*` callbacks fire.
///
/// A thin wrapper over a tokio runtime handle; the default queue of a
/// configuration, or the current runtime when none is set.
#[derive(Debug, Clone)]
pub struct Queue {
    handle: Handle,
}

impl Queue {
    /// Queue backed by the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// Queue backed by an explicit runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl From<Handle> for Queue {
    fn from(handle: Handle) -> Self {
        Self::new(handle)
    }
}
