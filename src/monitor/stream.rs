//! Consumer side of a monitor subscription.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_stream::Stream;

use super::handoff::Handoff;
use crate::store::ChangeBatch;

/// Stream of change batches produced by [`super::ConfigMonitor::subscribe`].
///
/// Polling registers the stream as the waiting consumer; the next batch the
/// store reports completes the poll. Batches reported while the stream is not
/// being polled are dropped. The stream ends once the monitor is closed.
///
/// Bound a wait by racing `next()` against a timer, e.g. `tokio::time::timeout`.
pub struct ChangeStream {
    handoff: Arc<Handoff>,
    pending: Option<oneshot::Receiver<ChangeBatch>>,
    terminated: bool,
}

impl std::fmt::Debug for ChangeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeStream")
            .field("waiting", &self.pending.is_some())
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl ChangeStream {
    pub(super) const fn new(handoff: Arc<Handoff>) -> Self {
        Self {
            handoff,
            pending: None,
            terminated: false,
        }
    }

    /// Returns true once the stream has yielded its final `None`.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn finish(&mut self) -> Poll<Option<ChangeBatch>> {
        self.pending = None;
        self.terminated = true;
        Poll::Ready(None)
    }
}

impl Stream for ChangeStream {
    type Item = ChangeBatch;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.terminated {
            return Poll::Ready(None);
        }

        if this.pending.is_none() {
            tracing::trace!("Attaching change consumer");
            this.pending = this.handoff.attach();
        }
        let Some(receiver) = this.pending.as_mut() else {
            // Handoff already closed.
            return this.finish();
        };

        match Pin::new(receiver).poll(cx) {
            Poll::Ready(Ok(batch)) => {
                this.pending = None;
                Poll::Ready(Some(batch))
            }
            // Sender dropped: the monitor closed the handoff.
            Poll::Ready(Err(_)) => this.finish(),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        if self.pending.is_some() {
            self.handoff.detach();
        }
    }
}
