//! Asynchronous handle returned for a running command.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::domain::order_execution::OutcomeEvent;
use crate::error::CommandError;

/// One item delivered by a command stream.
pub type CommandItem = Result<OutcomeEvent, CommandError>;

/// Stream of forwarded outcome events ending in at most one error.
///
/// The stream is cold: nothing runs until it is polled. A successful
/// command ends after its done event; a failed one after a single `Err`.
/// Dropping the stream tears down its feed subscription and any pending
/// retry timer.
#[must_use = "commands do nothing unless the stream is polled"]
pub struct CommandStream {
    inner: BoxStream<'static, CommandItem>,
}

impl CommandStream {
    pub(crate) fn from_stream(inner: BoxStream<'static, CommandItem>) -> Self {
        Self { inner }
    }

    /// A stream that completes immediately without items.
    pub fn empty() -> Self {
        Self::from_stream(stream::empty().boxed())
    }

    /// A stream that yields a single error.
    pub fn failed(error: CommandError) -> Self {
        Self::from_stream(stream::once(async move { Err(error) }).boxed())
    }

    /// Drive the stream to completion.
    ///
    /// Returns the last forwarded event, which for a successful command is
    /// its done event, or `None` if the command was skipped.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`CommandError`] of a failed command.
    pub async fn finish(mut self) -> Result<Option<OutcomeEvent>, CommandError> {
        let mut last = None;
        while let Some(item) = self.inner.next().await {
            last = Some(item?);
        }
        Ok(last)
    }

    /// Drive the stream to completion and collect every forwarded event.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`CommandError`] of a failed command.
    pub async fn collect_events(mut self) -> Result<Vec<OutcomeEvent>, CommandError> {
        let mut events = Vec::new();
        while let Some(item) = self.inner.next().await {
            events.push(item?);
        }
        Ok(events)
    }

    pub(crate) fn into_inner(self) -> BoxStream<'static, CommandItem> {
        self.inner
    }
}

impl Stream for CommandStream {
    type Item = CommandItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl fmt::Debug for CommandStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStream").finish_non_exhaustive()
    }
}
