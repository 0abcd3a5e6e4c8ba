//! Single-shot delivery surfaces.
//!
//! [`Publisher`] is the canonical asynchronous primitive: a future yielding
//! exactly one value-or-failure. The callback surface (`receive*`) is a thin
//! adapter that spawns the same future on a [`Queue`], never a second
//! pipeline.
//!
//! [`Queue`]: crate::Queue

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::Result;

/// Boxed dispatch pipeline future.
pub type PipelineFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// A cancellable single-value future over the dispatch pipeline.
///
/// Yields exactly one `Result` when awaited. After [`CancelHandle::cancel`]
/// the decode path never runs and the publisher never resolves; dropping the
/// publisher without polling is equally a cancellation.
pub struct Publisher<T> {
    future: PipelineFuture<T>,
    cancelled: Arc<AtomicBool>,
}

impl<T> Publisher<T> {
    pub(crate) fn new(future: PipelineFuture<T>, cancelled: Arc<AtomicBool>) -> Self {
        Self { future, cancelled }
    }

    /// Publisher that fails immediately, without touching any transport.
    pub(crate) fn failed(error: crate::Error) -> Self
    where
        T: Send + 'static,
    {
        Self {
            future: Box::pin(async move { Err(error) }),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for cancelling this publisher from elsewhere.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl<T> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("cancelled", &self.cancelled.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<T> Future for Publisher<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.cancelled.load(Ordering::Acquire) {
            return Poll::Pending;
        }
        self.future.as_mut().poll(cx)
    }
}

/// Cancels a [`Publisher`] before it delivers.
///
/// Once cancelled, no value or failure is ever delivered and the decode step
/// is guaranteed not to run.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Handle for an in-flight `receive*` dispatch.
///
/// [`Receipt::cancel`] guarantees the callback never fires: the cancellation
/// flag is checked before the decode step and again before callback
/// invocation, and the spawned task is aborted.
#[derive(Debug)]
pub struct Receipt {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Receipt {
    pub(crate) fn new(cancelled: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self { cancelled, task }
    }

    /// Cancel the dispatch; the callback will not be invoked.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
