//! Lazy-sequence views over a sink.
//!
//! Both iterators are push-driven single-producer / multi-consumer views:
//! every iterator carries its own cursor into the sink's buffer (or
//! announce log) and parks on the sink's notify when it catches up. A
//! buffered view starts at the beginning and replays everything ever
//! pushed; a live view starts at the current end and sees only subsequent
//! items.

use crate::error::PathStreamError;
use crate::handle::PathHandle;
use crate::parser::Shared;
use crate::sink::{Polled, Sink};
use serde_json::Value;
use std::sync::Arc;

/// Iterator over a sink's partial emissions.
///
/// String sinks yield text chunks, atomic sinks the single final value,
/// aggregate sinks progressive snapshots (the last one equal to the final
/// value).
pub struct ValueIter {
    sink: Sink,
    cursor: usize,
}

impl ValueIter {
    pub(crate) fn buffered(sink: Sink) -> Self {
        ValueIter { sink, cursor: 0 }
    }

    pub(crate) fn live(sink: Sink) -> Self {
        let cursor = sink.buffer_len();
        ValueIter { sink, cursor }
    }

    /// Next emission.
    ///
    /// Suspends while the sink is open with nothing new; yields `Ok(None)`
    /// once the sink closed successfully and the view is drained, or the
    /// close error once buffered items are exhausted.
    pub async fn next(&mut self) -> Result<Option<Value>, PathStreamError> {
        loop {
            let notified = self.sink.notified();
            match self.sink.poll_buffer(self.cursor) {
                Polled::Item(value) => {
                    self.cursor += 1;
                    return Ok(Some(value));
                }
                Polled::End => return Ok(None),
                Polled::Failed(error) => return Err(error),
                Polled::Pending => notified.await,
            }
        }
    }
}

// Note: these are not futures::Stream impls; a plain `async fn next` in a
// loop keeps cancellation and borrowing simple.

/// Iterator over an aggregate sink's announced children.
///
/// Yields one [`PathHandle`] per child in announce order. A buffered view
/// replays every announcement made before the iterator attached (the
/// late-subscriber guarantee); announcements always precede the child's
/// first emission. Non-aggregate sinks simply end without yielding.
pub struct ChildIter {
    shared: Arc<Shared>,
    sink: Sink,
    cursor: usize,
}

impl ChildIter {
    pub(crate) fn buffered(shared: Arc<Shared>, sink: Sink) -> Self {
        ChildIter {
            shared,
            sink,
            cursor: 0,
        }
    }

    pub(crate) fn live(shared: Arc<Shared>, sink: Sink) -> Self {
        let cursor = sink.children_len();
        ChildIter {
            shared,
            sink,
            cursor,
        }
    }

    pub async fn next(&mut self) -> Result<Option<PathHandle>, PathStreamError> {
        loop {
            let notified = self.sink.notified();
            match self.sink.poll_children(self.cursor) {
                Polled::Item((_, child)) => {
                    self.cursor += 1;
                    return Ok(Some(PathHandle::new(self.shared.clone(), child)));
                }
                Polled::End => return Ok(None),
                Polled::Failed(error) => return Err(error),
                Polled::Pending => notified.await,
            }
        }
    }
}
