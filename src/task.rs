use std::{
    future::{ready, Future},
    pin::Pin,
    task::{Context, Poll},
};

use futures::{channel::oneshot, future::LocalBoxFuture, FutureExt};
use parse_display::Display;

/// A computation that settles exactly once with `Ok(value)` or `Err(failure)`.
pub struct Task<T: 'static, E: 'static>(LocalBoxFuture<'static, Result<T, E>>);

impl<T: 'static, E: 'static> Task<T, E> {
    pub fn new(future: impl Future<Output = Result<T, E>> + 'static) -> Self {
        Self(future.boxed_local())
    }

    /// Create a task that succeeds with `value`.
    pub fn resolve(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// Create a task that fails with `error`.
    pub fn reject(error: E) -> Self {
        Self::from_result(Err(error))
    }

    pub fn from_result(result: Result<T, E>) -> Self {
        Self::new(ready(result))
    }
}
impl<T: 'static, E: 'static> Future for Task<T, E> {
    type Output = Result<T, E>;
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}
impl<T: 'static, E: 'static> std::fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task")
    }
}

/// Values accepted by [`AsyncOp::run`](crate::AsyncOp::run).
///
/// Returning `None` means the caller did not actually produce a task,
/// which `run` reports as [`UsageError`].
pub trait IntoTask<T: 'static, E: 'static> {
    fn into_task(self) -> Option<Task<T, E>>;
}
impl<T: 'static, E: 'static> IntoTask<T, E> for Task<T, E> {
    fn into_task(self) -> Option<Task<T, E>> {
        Some(self)
    }
}
impl<T: 'static, E: 'static> IntoTask<T, E> for Option<Task<T, E>> {
    fn into_task(self) -> Option<Task<T, E>> {
        self
    }
}
impl<T: 'static, E: 'static> IntoTask<T, E> for () {
    fn into_task(self) -> Option<Task<T, E>> {
        None
    }
}

/// Error returned by [`AsyncOp::run`](crate::AsyncOp::run) when the argument is not a task.
#[non_exhaustive]
#[derive(Display, Debug, Clone, PartialEq, Eq)]
#[display("the argument passed to `run` must be an awaitable task")]
pub struct UsageError {}

impl std::error::Error for UsageError {}

/// Completes with the outcome of the task passed to [`AsyncOp::run`](crate::AsyncOp::run),
/// after that outcome has been applied to the operation's state.
///
/// If the [`Runtime`](crate::Runtime) is dropped before the task settles, the handle never completes.
pub struct RunHandle<T, E>(oneshot::Receiver<Result<T, E>>);

impl<T, E> RunHandle<T, E> {
    pub(crate) fn channel() -> (oneshot::Sender<Result<T, E>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self(receiver))
    }
}
impl<T, E> Future for RunHandle<T, E> {
    type Output = Result<T, E>;
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        match self.0.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) | Poll::Pending => Poll::Pending,
        }
    }
}
impl<T, E> std::fmt::Debug for RunHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RunHandle")
    }
}
