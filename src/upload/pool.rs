use crate::error::{ErrorRepr, Result};
use crate::plan::Part;
use crate::request::CompletedPart;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt as _, Stream, StreamExt as _, ready};
use std::collections::VecDeque;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, DropGuard};

type Running = BoxFuture<'static, (Part, Result<CompletedPart>)>;

/// Runs a task for every part with at most `workers` tasks in flight.
///
/// Every task runs on its own tokio task and is yielded with the part it was
/// started for as soon as it finishes, so the stream produces results in
/// completion order rather than part order.
///
/// The first task to fail cancels the shared [`CancellationToken`]. No new
/// task is started once the token is cancelled, but tasks in flight run to
/// their end and are yielded, so the stream always drains completely.
///
/// Dropping the pool cancels the token, so tasks still in flight stop at
/// their next cancellation point instead of running on detached.
#[must_use = "streams do nothing unless polled"]
pub struct WorkerPool<F> {
    queue: VecDeque<Part>,
    running: FuturesUnordered<Running>,
    workers: NonZeroUsize,
    token: CancellationToken,
    task: F,
    _cancel_on_drop: DropGuard,
}

impl<F, Fut> WorkerPool<F>
where
    F: FnMut(Part, CancellationToken) -> Fut,
    Fut: Future<Output = Result<CompletedPart>> + Send + 'static,
{
    /// Create a pool that runs `task` for each of `parts`.
    pub fn new<I>(parts: I, workers: NonZeroUsize, token: CancellationToken, task: F) -> Self
    where
        I: IntoIterator<Item = Part>,
    {
        Self {
            queue: parts.into_iter().collect(),
            running: FuturesUnordered::new(),
            workers,
            _cancel_on_drop: token.clone().drop_guard(),
            token,
            task,
        }
    }

    /// Number of tasks currently in flight.
    pub fn in_flight(&self) -> usize {
        self.running.len()
    }

    /// Number of parts not yet started.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn fill(&mut self) {
        while self.running.len() < self.workers.get() && !self.token.is_cancelled() {
            let Some(part) = self.queue.pop_front() else {
                break;
            };
            trace!(part = %part.part_number, in_flight = self.running.len() + 1, "starting part");
            let handle = tokio::spawn((self.task)(part, self.token.clone()));
            let fut = handle.map(move |res| match res {
                Ok(res) => (part, res),
                Err(_) => (part, Err(ErrorRepr::TaskPanicked(part.part_number).into())),
            });
            self.running.push(fut.boxed());
        }
    }
}

impl<F, Fut> Stream for WorkerPool<F>
where
    F: FnMut(Part, CancellationToken) -> Fut + Unpin,
    Fut: Future<Output = Result<CompletedPart>> + Send + 'static,
{
    type Item = (Part, Result<CompletedPart>);

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.fill();

        // Empty only when the queue is exhausted or the token is cancelled.
        let Some((part, res)) = ready!(this.running.poll_next_unpin(cx)) else {
            return Poll::Ready(None);
        };
        if res.is_err() && !this.token.is_cancelled() {
            debug!(
                part = %part.part_number,
                in_flight = this.running.len(),
                queued = this.queue.len(),
                "part failed, stopping remaining parts",
            );
            this.token.cancel();
        }
        Poll::Ready(Some((part, res)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.running.len() + self.queue.len();
        (self.running.len(), Some(n))
    }
}

impl<F> Debug for WorkerPool<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("queued", &self.queue.len())
            .field("running", &self.running.len())
            .field("workers", &self.workers)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
