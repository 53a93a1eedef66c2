//! Path subscription handles.

use crate::error::PathStreamError;
use crate::iterator::{ChildIter, ValueIter};
use crate::parser::Shared;
use crate::sink::Sink;
use crate::types::{join, ValueKind};
use serde_json::Value;
use std::sync::Arc;

/// A subscription to one JSON path.
///
/// A handle is a lightweight, cloneable view over the path's sink. It
/// exposes the one-shot final value, the lazy sequence of partial
/// emissions, the announced children of an aggregate, and path
/// composition. Handles for paths the parse has not reached yet are the
/// normal case - they resolve when (and if) the document gets there.
#[derive(Clone)]
pub struct PathHandle {
    shared: Arc<Shared>,
    sink: Sink,
}

impl PathHandle {
    pub(crate) fn new(shared: Arc<Shared>, sink: Sink) -> Self {
        PathHandle { shared, sink }
    }

    /// The canonical path this handle is subscribed to (`""` is the root).
    pub fn path(&self) -> &str {
        self.sink.path()
    }

    /// The kind this path was subscribed as.
    pub fn kind(&self) -> ValueKind {
        self.sink.kind()
    }

    /// One-shot: the eventual final value.
    ///
    /// Resolves when the value completes; fails with `PathNotFound` if the
    /// root completes without visiting this path, with `KindConflict` if a
    /// conflicting subscription or the document itself invalidated this
    /// sink, with `Stream` on producer failure, or with `Disposed`.
    pub async fn final_value(&self) -> Result<Value, PathStreamError> {
        self.sink.final_value().await
    }

    /// Buffered view over this path's partial emissions: every chunk or
    /// snapshot ever pushed, then end (or the close error).
    pub fn values(&self) -> ValueIter {
        ValueIter::buffered(self.sink.clone())
    }

    /// Live view: only emissions pushed after this call.
    pub fn values_live(&self) -> ValueIter {
        ValueIter::live(self.sink.clone())
    }

    /// Buffered view over an aggregate's announced children, in announce
    /// order (array indices, or object keys in document order). Children
    /// announced before this call are replayed - a late subscriber misses
    /// nothing. Ends once the aggregate closes; non-aggregate handles
    /// yield an empty sequence.
    pub fn children(&self) -> ChildIter {
        ChildIter::buffered(self.shared.clone(), self.sink.clone())
    }

    /// Live view over subsequently announced children.
    pub fn children_live(&self) -> ChildIter {
        ChildIter::live(self.shared.clone(), self.sink.clone())
    }

    /// Subscribe to a path beneath this one: `get("name", …)` on a handle
    /// at `users[0]` subscribes to `users[0].name`. Bracketed sub-paths
    /// concatenate (`get("[2]", …)`); dotted sub-paths are allowed.
    pub fn get(&self, sub_path: &str, kind: ValueKind) -> Result<PathHandle, PathStreamError> {
        let path = join(self.path(), sub_path);
        let sink = self.shared.registry.lock().subscribe(&path, kind)?;
        Ok(PathHandle::new(self.shared.clone(), sink))
    }
}

impl std::fmt::Debug for PathHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathHandle")
            .field("path", &self.path())
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments;
    use crate::parser::StreamParser;
    use serde_json::json;

    #[tokio::test]
    async fn array_iteration_yields_child_handles_in_order() {
        let doc = r#"{"users":[{"name":"Alice"},{"name":"Bob"}]}"#;
        let parser = StreamParser::open(fragments::pieces(doc, 5));
        let users = parser.get("users", ValueKind::Array).unwrap();

        let mut children = users.children();
        let mut names = Vec::new();
        while let Some(child) = children.next().await.unwrap() {
            assert_eq!(child.kind(), ValueKind::Object);
            let name = child.get("name", ValueKind::String).unwrap();
            names.push(name.final_value().await.unwrap());
        }
        assert_eq!(names, vec![json!("Alice"), json!("Bob")]);
    }

    #[tokio::test]
    async fn late_subscriber_replays_all_announcements() {
        let doc = r#"{"features":["a","b","c","d","e"]}"#;
        let parser = StreamParser::open(fragments::whole(doc));
        // Let the whole fragment parse before subscribing.
        let features = parser.get("features", ValueKind::Array).unwrap();
        features.final_value().await.unwrap();

        let mut children = features.children();
        let mut values = Vec::new();
        while let Some(child) = children.next().await.unwrap() {
            values.push(child.final_value().await.unwrap());
        }
        assert_eq!(
            values,
            vec![json!("a"), json!("b"), json!("c"), json!("d"), json!("e")]
        );
    }

    #[tokio::test]
    async fn object_children_arrive_in_document_order() {
        let doc = r#"{"first":1,"second":2}"#;
        let parser = StreamParser::open(fragments::whole(doc));
        let root = parser.get("", ValueKind::Object).unwrap();
        let mut children = root.children();
        let mut paths = Vec::new();
        while let Some(child) = children.next().await.unwrap() {
            paths.push(child.path().to_string());
        }
        assert_eq!(paths, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn path_composition_through_handles() {
        let doc = r#"{"a":{"b":[{"c":7}]}}"#;
        let parser = StreamParser::open(fragments::chars(doc));
        let a = parser.get("a", ValueKind::Object).unwrap();
        let c = a
            .get("b", ValueKind::Array)
            .unwrap()
            .get("[0]", ValueKind::Object)
            .unwrap()
            .get("c", ValueKind::Number)
            .unwrap();
        assert_eq!(c.path(), "a.b[0].c");
        assert_eq!(c.final_value().await.unwrap(), json!(7));
    }

    #[tokio::test]
    async fn snapshots_stream_for_aggregates() {
        let doc = r#"{"list":[1,2,3]}"#;
        let parser = StreamParser::open(fragments::chars(doc));
        let list = parser.get("list", ValueKind::Array).unwrap();
        let mut snapshots = list.values();
        let mut last = None;
        while let Some(snapshot) = snapshots.next().await.unwrap() {
            let len = snapshot.as_array().unwrap().len();
            if let Some(Value::Array(prev)) = &last {
                assert!(len >= prev.len());
            }
            last = Some(snapshot);
        }
        // The last snapshot equals the awaited final value.
        assert_eq!(last, Some(list.final_value().await.unwrap()));
        assert_eq!(last, Some(json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn live_values_only_see_the_future() {
        let doc = r#"{"msg":"hello"}"#;
        let parser = StreamParser::open(fragments::whole(doc));
        let msg = parser.get("msg", ValueKind::String).unwrap();
        msg.final_value().await.unwrap();
        // Everything already happened; a live view starts after it all.
        let mut live = msg.values_live();
        assert_eq!(live.next().await.unwrap(), None);
        // The buffered view still replays the chunk history.
        let mut buffered = msg.values();
        assert_eq!(buffered.next().await.unwrap(), Some(json!("hello")));
    }
}
