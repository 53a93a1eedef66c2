//! The parse controller.
//!
//! `StreamParser` owns the path registry and a detached drain task that
//! pulls fragments from the producer and routes every character through
//! the delegate tree. Consumers subscribe through [`StreamParser::get`]
//! and never touch the drain task directly.

use crate::delegate::Delegate;
use crate::error::{FragmentError, PathStreamError};
use crate::fragments::FragmentStream;
use crate::handle::PathHandle;
use crate::sink::{PathSink, Sink};
use crate::types::ValueKind;
use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Path-to-sink registry plus parser lifecycle flags. Everything behind
/// one sync mutex; the drain task takes it once per fragment, consumers
/// once per subscription.
pub(crate) struct Registry {
    sinks: HashMap<String, Sink>,
    disposed: bool,
    faulted: bool,
    root_completed: bool,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            sinks: HashMap::new(),
            disposed: false,
            faulted: false,
            root_completed: false,
        }
    }

    /// Consumer-side lookup/create.
    ///
    /// A same-kind sink is shared; a different-kind sink is closed with
    /// `KindConflict`, dropped from the registry, and the error is
    /// returned. A path first requested after the root completed can no
    /// longer be visited and fails with `PathNotFound` immediately.
    pub(crate) fn subscribe(
        &mut self,
        path: &str,
        kind: ValueKind,
    ) -> Result<Sink, PathStreamError> {
        if self.disposed || self.faulted {
            return Err(PathStreamError::Disposed);
        }
        if let Some(existing) = self.sinks.get(path) {
            if existing.kind() == kind {
                return Ok(existing.clone());
            }
            let error = PathStreamError::KindConflict {
                path: path.to_string(),
                existing: existing.kind(),
                requested: kind,
            };
            existing.close_err(error.clone());
            self.sinks.remove(path);
            return Err(error);
        }
        if self.root_completed {
            return Err(PathStreamError::PathNotFound {
                path: path.to_string(),
            });
        }
        let sink = PathSink::create(path, kind);
        trace!(path, kind = %kind, "sink registered");
        self.sinks.insert(path.to_string(), sink.clone());
        Ok(sink)
    }

    /// Parse-side lookup/create, called when a delegate discovers a value.
    ///
    /// Never fails: a conflicting subscriber sink is closed with
    /// `KindConflict` and replaced, so a consumer's wrong guess cannot
    /// stall the document.
    pub(crate) fn resolve(&mut self, path: &str, kind: ValueKind) -> Sink {
        if let Some(existing) = self.sinks.get(path) {
            if existing.kind() == kind {
                existing.mark_attached();
                return existing.clone();
            }
            existing.close_err(PathStreamError::KindConflict {
                path: path.to_string(),
                existing: existing.kind(),
                requested: kind,
            });
            self.sinks.remove(path);
        }
        let sink = PathSink::create(path, kind);
        sink.mark_attached();
        trace!(path, kind = %kind, "sink attached");
        self.sinks.insert(path.to_string(), sink.clone());
        sink
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Root value finished: pending sinks the parse never reached will
    /// never resolve, so they fail now.
    fn complete_root(&mut self) {
        self.root_completed = true;
        for sink in self.sinks.values() {
            if !sink.is_attached() {
                sink.close_err(PathStreamError::PathNotFound {
                    path: sink.path().to_string(),
                });
            }
        }
    }

    fn root_completed(&self) -> bool {
        self.root_completed
    }

    /// Producer failure: every open sink fails, and new subscriptions
    /// are refused.
    fn fault(&mut self, error: PathStreamError) {
        self.faulted = true;
        for sink in self.sinks.values() {
            sink.close_err(error.clone());
        }
    }

    fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        for sink in self.sinks.values() {
            sink.close_err(PathStreamError::Disposed);
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn get_sink(&self, path: &str) -> Option<Sink> {
        self.sinks.get(path).cloned()
    }
}

/// State shared between the parser handle(s) and the drain task.
pub(crate) struct Shared {
    pub(crate) registry: Mutex<Registry>,
    close_on_root_complete: bool,
}

/// The character router: skips preamble until the first structural
/// character, then owns the root delegate.
pub(crate) struct ParseCore {
    root: Option<Delegate>,
    root_done: bool,
}

impl ParseCore {
    pub(crate) fn new() -> Self {
        ParseCore {
            root: None,
            root_done: false,
        }
    }

    pub(crate) fn root_done(&self) -> bool {
        self.root_done
    }

    /// Route one fragment, then signal the fragment boundary down the
    /// delegate chain.
    pub(crate) fn feed_fragment(&mut self, text: &str, registry: &mut Registry) {
        for c in text.chars() {
            if self.root_done {
                // Trailing text after the root value is ignored.
                break;
            }
            self.feed_char(c, registry);
        }
        if !self.root_done {
            if let Some(root) = self.root.as_mut() {
                root.flush();
            }
        }
    }

    fn feed_char(&mut self, c: char, registry: &mut Registry) {
        match self.root.as_mut() {
            None => {
                // Preamble (prose, markdown fences) before the first
                // structural character is skipped.
                if c == '{' || c == '[' {
                    let kind = if c == '{' {
                        ValueKind::Object
                    } else {
                        ValueKind::Array
                    };
                    let sink = registry.resolve("", kind);
                    debug!(kind = %kind, "root delegate constructed");
                    let mut root = Delegate::new(String::new(), kind, sink);
                    root.feed(c, registry);
                    self.root = Some(root);
                }
            }
            Some(root) => {
                root.feed(c, registry);
                self.root_done = root.done();
            }
        }
    }
}

async fn drain(shared: Arc<Shared>, mut fragments: FragmentStream) {
    let mut core = ParseCore::new();
    while let Some(item) = fragments.next().await {
        let text = match item {
            Ok(text) => text,
            Err(error) => {
                debug!(%error, "fragment producer failed");
                shared.registry.lock().fault(error.into());
                return;
            }
        };
        let stop = {
            let mut registry = shared.registry.lock();
            if registry.is_disposed() {
                return;
            }
            core.feed_fragment(&text, &mut registry);
            if core.root_done() && !registry.root_completed() {
                debug!("root value complete");
                registry.complete_root();
            }
            core.root_done() && shared.close_on_root_complete
        };
        if stop {
            return;
        }
    }
    // End of sequence.
    let mut registry = shared.registry.lock();
    if core.root_done() {
        if !registry.root_completed() {
            registry.complete_root();
        }
    } else if !registry.is_disposed() {
        debug!("producer ended before the root value completed");
        registry.fault(PathStreamError::Stream {
            message: "producer ended before the root value completed".to_string(),
        });
    }
}

/// Builder for configuring a parser.
#[must_use = "builders do nothing unless you call .open()"]
pub struct ParserBuilder {
    close_on_root_complete: bool,
}

impl ParserBuilder {
    pub(crate) fn new() -> Self {
        ParserBuilder {
            close_on_root_complete: true,
        }
    }

    /// Whether the drain loop stops pulling fragments once the root value
    /// is complete (default true). With `false` the remaining fragments
    /// are drained and discarded.
    pub fn close_on_root_complete(mut self, enabled: bool) -> Self {
        self.close_on_root_complete = enabled;
        self
    }

    /// Open the parser over a fragment producer and start draining.
    ///
    /// Must be called within a Tokio runtime: the drain task is spawned
    /// immediately.
    pub fn open<S>(self, fragments: S) -> StreamParser
    where
        S: Stream<Item = Result<String, FragmentError>> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::new()),
            close_on_root_complete: self.close_on_root_complete,
        });
        debug!(
            close_on_root_complete = self.close_on_root_complete,
            "parser opened"
        );
        let drain_shared = shared.clone();
        let task = tokio::spawn(drain(drain_shared, fragments.boxed()));
        StreamParser {
            shared,
            drain: Arc::new(Mutex::new(Some(task))),
        }
    }
}

/// A streaming, path-addressable JSON parser.
///
/// Cheap to clone; all clones share the same registry and drain task.
#[derive(Clone)]
pub struct StreamParser {
    shared: Arc<Shared>,
    drain: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl StreamParser {
    /// Open a parser with default options.
    pub fn open<S>(fragments: S) -> StreamParser
    where
        S: Stream<Item = Result<String, FragmentError>> + Send + 'static,
    {
        StreamParser::builder().open(fragments)
    }

    /// Create a parser builder for customization.
    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    /// Subscribe to a path.
    ///
    /// Creates the sink on demand; subscribing before the parse reaches
    /// the path is the normal case (this includes the root path `""`,
    /// which resolves as soon as the first structural character arrives).
    pub fn get(&self, path: &str, kind: ValueKind) -> Result<PathHandle, PathStreamError> {
        let sink = self.shared.registry.lock().subscribe(path, kind)?;
        Ok(PathHandle::new(self.shared.clone(), sink))
    }

    /// Tear down: abort the drain, close every open sink with
    /// [`PathStreamError::Disposed`], reject pending one-shots.
    /// Idempotent.
    pub fn dispose(&self) {
        if let Some(task) = self.drain.lock().take() {
            task.abort();
        }
        if self.shared.registry.lock().dispose() {
            debug!("parser disposed");
        }
    }
}

impl std::fmt::Debug for StreamParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.shared.registry.lock();
        f.debug_struct("StreamParser")
            .field("paths", &registry.sinks.len())
            .field("disposed", &registry.disposed)
            .field("root_completed", &registry.root_completed)
            .finish()
    }
}
