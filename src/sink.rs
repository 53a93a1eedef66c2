//! Per-path sinks.
//!
//! A sink is the state-holder for one subscribed or visited path: the
//! buffer of partial emissions, the child-announce log (aggregates only),
//! the one-shot final value, and the close protocol. Sinks are shared
//! between the drain task and any number of consumers; the mutex is
//! sync-only and never held across an await point, and every waiter parks
//! on the sink's `Notify`.

use crate::error::PathStreamError;
use crate::types::ValueKind;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// Key under which a child was announced by its parent aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ChildKey {
    Key(String),
    Index(usize),
}

/// Shared handle to a sink.
pub(crate) type Sink = Arc<PathSink>;

/// Result of polling a sink cursor.
pub(crate) enum Polled<T> {
    Item(T),
    End,
    Failed(PathStreamError),
    Pending,
}

pub(crate) struct PathSink {
    path: String,
    kind: ValueKind,
    state: Mutex<SinkState>,
    notify: Notify,
}

#[derive(Default)]
struct SinkState {
    buffer: Vec<Value>,
    children: Vec<(ChildKey, Sink)>,
    final_value: Option<Value>,
    error: Option<PathStreamError>,
    closed: bool,
    attached: bool,
}

impl PathSink {
    pub(crate) fn create(path: impl Into<String>, kind: ValueKind) -> Sink {
        Arc::new(PathSink {
            path: path.into(),
            kind,
            state: Mutex::new(SinkState::default()),
            notify: Notify::new(),
        })
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Push a partial emission. Dropped silently once closed.
    pub(crate) fn push(&self, value: Value) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.buffer.push(value);
        }
        self.notify.notify_waiters();
    }

    /// Record a newly discovered child, before the child has received any
    /// character. The log is retained forever so late subscribers replay
    /// every announcement in order.
    pub(crate) fn announce(&self, key: ChildKey, child: Sink) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.children.push((key, child));
        }
        self.notify.notify_waiters();
    }

    /// Close successfully. Sets the final value exactly once; for every
    /// kind except strings the final value is also pushed as the last
    /// buffered emission (atomics buffer their single value here, and
    /// aggregates always end on a snapshot equal to the final value).
    /// Strings have already flushed their last chunk.
    pub(crate) fn close_ok(&self, value: Value) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            if self.kind != ValueKind::String {
                state.buffer.push(value.clone());
            }
            state.final_value = Some(value);
            state.closed = true;
        }
        self.notify.notify_waiters();
    }

    /// Close with an error. First close wins; later closes are no-ops.
    pub(crate) fn close_err(&self, error: PathStreamError) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.error = Some(error);
            state.closed = true;
        }
        self.notify.notify_waiters();
    }

    /// Mark that a delegate has bound to this path. Unattached sinks are
    /// swept with `PathNotFound` when the root completes.
    pub(crate) fn mark_attached(&self) {
        self.state.lock().attached = true;
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    /// The final value, if the sink closed successfully.
    pub(crate) fn current_final(&self) -> Option<Value> {
        self.state.lock().final_value.clone()
    }

    pub(crate) fn buffer_len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub(crate) fn children_len(&self) -> usize {
        self.state.lock().children.len()
    }

    /// Poll the emission buffer at a cursor position.
    pub(crate) fn poll_buffer(&self, cursor: usize) -> Polled<Value> {
        let state = self.state.lock();
        if cursor < state.buffer.len() {
            return Polled::Item(state.buffer[cursor].clone());
        }
        if state.closed {
            return match &state.error {
                Some(error) => Polled::Failed(error.clone()),
                None => Polled::End,
            };
        }
        Polled::Pending
    }

    /// Poll the child-announce log at a cursor position.
    pub(crate) fn poll_children(&self, cursor: usize) -> Polled<(ChildKey, Sink)> {
        let state = self.state.lock();
        if cursor < state.children.len() {
            return Polled::Item(state.children[cursor].clone());
        }
        if state.closed {
            return match &state.error {
                Some(error) => Polled::Failed(error.clone()),
                None => Polled::End,
            };
        }
        Polled::Pending
    }

    /// A wake-on-push future. Create it *before* re-checking state so a
    /// push between the check and the await is never lost.
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// One-shot: the eventual final value, or the close error.
    pub(crate) async fn final_value(&self) -> Result<Value, PathStreamError> {
        loop {
            let notified = self.notified();
            {
                let state = self.state.lock();
                if state.closed {
                    return match &state.error {
                        Some(error) => Err(error.clone()),
                        None => Ok(state.final_value.clone().unwrap_or(Value::Null)),
                    };
                }
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for PathSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PathSink")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("buffered", &state.buffer.len())
            .field("children", &state.children.len())
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pushes_after_close_are_dropped() {
        let sink = PathSink::create("a", ValueKind::Number);
        sink.close_ok(json!(1));
        sink.push(json!(2));
        assert_eq!(sink.buffer_len(), 1);
        assert_eq!(sink.current_final(), Some(json!(1)));
    }

    #[test]
    fn atomic_close_buffers_the_single_value() {
        let sink = PathSink::create("flag", ValueKind::Boolean);
        sink.close_ok(json!(true));
        match sink.poll_buffer(0) {
            Polled::Item(v) => assert_eq!(v, json!(true)),
            _ => panic!("expected the buffered value"),
        }
        assert!(matches!(sink.poll_buffer(1), Polled::End));
    }

    #[test]
    fn string_close_does_not_duplicate_the_last_chunk() {
        let sink = PathSink::create("name", ValueKind::String);
        sink.push(json!("Ali"));
        sink.push(json!("ce"));
        sink.close_ok(json!("Alice"));
        assert_eq!(sink.buffer_len(), 2);
        assert_eq!(sink.current_final(), Some(json!("Alice")));
    }

    #[test]
    fn error_close_wins_once() {
        let sink = PathSink::create("x", ValueKind::Number);
        sink.close_err(PathStreamError::Disposed);
        sink.close_ok(json!(5));
        assert_eq!(sink.current_final(), None);
        assert!(matches!(
            sink.poll_buffer(0),
            Polled::Failed(PathStreamError::Disposed)
        ));
    }

    #[test]
    fn announce_log_is_retained_after_close() {
        let parent = PathSink::create("items", ValueKind::Array);
        let child = PathSink::create("items[0]", ValueKind::Number);
        parent.announce(ChildKey::Index(0), child);
        parent.close_ok(json!([1]));
        assert_eq!(parent.children_len(), 1);
        match parent.poll_children(0) {
            Polled::Item((ChildKey::Index(0), sink)) => assert_eq!(sink.path(), "items[0]"),
            _ => panic!("expected the announced child"),
        }
    }

    #[tokio::test]
    async fn one_shot_resolves_on_close() {
        let sink = PathSink::create("n", ValueKind::Number);
        let waiter = {
            let sink = sink.clone();
            tokio::spawn(async move { sink.final_value().await })
        };
        tokio::task::yield_now().await;
        sink.close_ok(json!(42));
        assert_eq!(waiter.await.unwrap(), Ok(json!(42)));
    }
}
