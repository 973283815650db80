//! Future returned by [`ToneCache::preload`](crate::ToneCache::preload).

use crate::error::{Result, ToneError};
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Outcome of a preload, resolved exactly once.
///
/// Registration happens before this value is returned, so dropping it does
/// not cancel the load; the entry still becomes ready when the mixer reports
/// back.
#[derive(Debug)]
#[must_use = "a PendingTone does nothing unless awaited or dropped deliberately"]
pub struct PendingTone {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Resolved(Option<Result<()>>),
    Waiting {
        name: String,
        receiver: oneshot::Receiver<Result<()>>,
    },
}

impl PendingTone {
    /// A preload that needed no platform work.
    pub(crate) fn ready() -> Self {
        Self {
            inner: Inner::Resolved(Some(Ok(()))),
        }
    }

    pub(crate) fn waiting(name: impl Into<String>, receiver: oneshot::Receiver<Result<()>>) -> Self {
        Self {
            inner: Inner::Waiting {
                name: name.into(),
                receiver,
            },
        }
    }

    /// Whether the tone was already loaded when the preload was issued.
    pub fn is_immediate(&self) -> bool {
        matches!(self.inner, Inner::Resolved(_))
    }
}

impl Future for PendingTone {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            Inner::Resolved(outcome) => Poll::Ready(outcome.take().unwrap_or(Ok(()))),
            Inner::Waiting { name, receiver } => match receiver.poll_unpin(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                // Entry dropped without an explicit outcome
                Poll::Ready(Err(_)) => Poll::Ready(Err(ToneError::LoadCancelled(name.clone()))),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}
