//! Value delegates: per-kind incremental parsers.
//!
//! One delegate exists per in-flight JSON value, owned by its parent (the
//! root delegate is owned by the drain loop). A delegate consumes
//! characters via `feed`, reports fragment boundaries via `flush`, and is
//! dropped by its parent once done. `feed` and `flush` never suspend; the
//! whole state advance for one character is synchronous.
//!
//! The one subtle rule lives in [`Step`]: string, number, and literal
//! values end on a character that structurally belongs to the parent
//! (`,`, `}`, `]`), so the parent must re-run its state machine on that
//! character. Object and array children consume their own closing bracket,
//! and the parent must not.

use crate::parser::Registry;
use crate::sink::{ChildKey, Sink};
use crate::types::{append_index, append_key, ValueKind};
use serde_json::{Map, Value};
use tracing::trace;

/// Outcome of feeding one character to a delegate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// The character was consumed; the delegate wants more.
    Consumed,
    /// The value is complete and the delegate consumed the current
    /// character (object/array closing bracket).
    Finished,
    /// The value is complete but the current character belongs to the
    /// parent, which must re-run its state machine on it.
    FinishedReprocess,
}

fn is_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// First characters that open a value inside an array.
fn starts_value(c: char) -> bool {
    matches!(c, '"' | '{' | '[' | 't' | 'f' | 'n' | '-' | '0'..='9')
}

pub(crate) enum Delegate {
    Str(StringDelegate),
    Num(NumberDelegate),
    Lit(LiteralDelegate),
    Obj(ObjectDelegate),
    Arr(ArrayDelegate),
}

impl Delegate {
    pub(crate) fn new(path: String, kind: ValueKind, sink: Sink) -> Delegate {
        match kind {
            ValueKind::String => Delegate::Str(StringDelegate::new(sink)),
            ValueKind::Number => Delegate::Num(NumberDelegate::new(sink)),
            ValueKind::Boolean | ValueKind::Null => Delegate::Lit(LiteralDelegate::new(sink)),
            ValueKind::Object => Delegate::Obj(ObjectDelegate::new(path, sink)),
            ValueKind::Array => Delegate::Arr(ArrayDelegate::new(path, sink)),
        }
    }

    pub(crate) fn feed(&mut self, c: char, registry: &mut Registry) -> Step {
        match self {
            Delegate::Str(d) => d.feed(c),
            Delegate::Num(d) => d.feed(c),
            Delegate::Lit(d) => d.feed(c),
            Delegate::Obj(d) => d.feed(c, registry),
            Delegate::Arr(d) => d.feed(c, registry),
        }
    }

    /// Fragment boundary: flush pending string chunks and changed
    /// aggregate snapshots, down the whole active chain.
    pub(crate) fn flush(&mut self) {
        match self {
            Delegate::Str(d) => d.flush(),
            Delegate::Num(_) | Delegate::Lit(_) => {}
            Delegate::Obj(d) => d.flush(),
            Delegate::Arr(d) => d.flush(),
        }
    }

    pub(crate) fn done(&self) -> bool {
        match self {
            Delegate::Str(d) => d.done,
            Delegate::Num(d) => d.done,
            Delegate::Lit(d) => d.done,
            Delegate::Obj(d) => d.done,
            Delegate::Arr(d) => d.done,
        }
    }

    /// The completed value, if this delegate's sink closed successfully.
    fn final_value(&self) -> Option<Value> {
        self.sink().current_final()
    }

    fn sink(&self) -> &Sink {
        match self {
            Delegate::Str(d) => &d.sink,
            Delegate::Num(d) => &d.sink,
            Delegate::Lit(d) => &d.sink,
            Delegate::Obj(d) => &d.sink,
            Delegate::Arr(d) => &d.sink,
        }
    }
}

// ---------------------------------------------------------------------------
// Strings

enum StrState {
    PreQuote,
    InString,
    EscapePending,
    Done,
}

pub(crate) struct StringDelegate {
    sink: Sink,
    state: StrState,
    /// Characters decoded since the last emitted chunk.
    pending: String,
    /// Concatenation of all emitted chunks.
    value: String,
    done: bool,
}

impl StringDelegate {
    fn new(sink: Sink) -> Self {
        StringDelegate {
            sink,
            state: StrState::PreQuote,
            pending: String::new(),
            value: String::new(),
            done: false,
        }
    }

    fn feed(&mut self, c: char) -> Step {
        match self.state {
            StrState::PreQuote => {
                if c == '"' {
                    self.state = StrState::InString;
                }
                Step::Consumed
            }
            StrState::InString => match c {
                '\\' => {
                    self.state = StrState::EscapePending;
                    Step::Consumed
                }
                '"' => {
                    self.finalize();
                    Step::FinishedReprocess
                }
                _ => {
                    self.pending.push(c);
                    Step::Consumed
                }
            },
            StrState::EscapePending => {
                match c {
                    'n' => self.pending.push('\n'),
                    't' => self.pending.push('\t'),
                    'r' => self.pending.push('\r'),
                    '"' => self.pending.push('"'),
                    '\\' => self.pending.push('\\'),
                    '/' => self.pending.push('/'),
                    'b' => self.pending.push('\u{0008}'),
                    'f' => self.pending.push('\u{000C}'),
                    // Unknown escapes (including \uXXXX) pass through as
                    // the literal backslash plus character.
                    other => {
                        self.pending.push('\\');
                        self.pending.push(other);
                    }
                }
                self.state = StrState::InString;
                Step::Consumed
            }
            StrState::Done => Step::Consumed,
        }
    }

    /// Emit the pending characters as one chunk. Chunks are non-empty and
    /// never span a half-decoded escape (a pending `\` is not in the
    /// buffer yet).
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.value.push_str(&self.pending);
        let chunk = std::mem::take(&mut self.pending);
        self.sink.push(Value::String(chunk));
    }

    fn finalize(&mut self) {
        self.flush();
        self.done = true;
        self.state = StrState::Done;
        self.sink.close_ok(Value::String(self.value.clone()));
    }
}

// ---------------------------------------------------------------------------
// Numbers

pub(crate) struct NumberDelegate {
    sink: Sink,
    text: String,
    done: bool,
}

impl NumberDelegate {
    fn new(sink: Sink) -> Self {
        NumberDelegate {
            sink,
            text: String::new(),
            done: false,
        }
    }

    fn feed(&mut self, c: char) -> Step {
        if matches!(c, '-' | '+' | '.' | 'e' | 'E' | '0'..='9') {
            self.text.push(c);
            return Step::Consumed;
        }
        self.finalize();
        Step::FinishedReprocess
    }

    fn finalize(&mut self) {
        self.done = true;
        // Integers keep integer representation; everything else goes
        // through f64.
        let value = if let Ok(i) = self.text.parse::<i64>() {
            Some(Value::from(i))
        } else if let Ok(u) = self.text.parse::<u64>() {
            Some(Value::from(u))
        } else {
            self.text
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
        };
        match value {
            Some(v) => self.sink.close_ok(v),
            None => self.sink.close_err(crate::error::PathStreamError::Parse {
                path: self.sink.path().to_string(),
                message: format!("invalid number {:?}", self.text),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Literals (true / false / null)

pub(crate) struct LiteralDelegate {
    sink: Sink,
    target: &'static str,
    value: Value,
    scratch: String,
    done: bool,
}

impl LiteralDelegate {
    fn new(sink: Sink) -> Self {
        LiteralDelegate {
            sink,
            target: "",
            value: Value::Null,
            scratch: String::new(),
            done: false,
        }
    }

    fn feed(&mut self, c: char) -> Step {
        if self.scratch.is_empty() && self.target.is_empty() {
            (self.target, self.value) = match c {
                't' => ("true", Value::Bool(true)),
                'f' => ("false", Value::Bool(false)),
                _ => ("null", Value::Null),
            };
        }
        let expected = self.target[self.scratch.len()..].chars().next();
        if expected == Some(c) {
            self.scratch.push(c);
            return Step::Consumed;
        }
        self.finalize();
        Step::FinishedReprocess
    }

    fn finalize(&mut self) {
        self.done = true;
        if self.scratch == self.target {
            self.sink.close_ok(self.value.clone());
        } else {
            self.sink.close_err(crate::error::PathStreamError::Parse {
                path: self.sink.path().to_string(),
                message: format!("invalid literal {:?}", self.scratch),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Objects

enum ObjState {
    PreBrace,
    WaitingForKey,
    ReadingKey,
    WaitingForValue,
    ReadingValue,
    WaitingForCommaOrEnd,
    Done,
}

pub(crate) struct ObjectDelegate {
    path: String,
    sink: Sink,
    state: ObjState,
    key_buffer: String,
    map: Map<String, Value>,
    child: Option<Box<Delegate>>,
    child_key: String,
    dirty: bool,
    done: bool,
}

impl ObjectDelegate {
    fn new(path: String, sink: Sink) -> Self {
        ObjectDelegate {
            path,
            sink,
            state: ObjState::PreBrace,
            key_buffer: String::new(),
            map: Map::new(),
            child: None,
            child_key: String::new(),
            dirty: false,
            done: false,
        }
    }

    fn feed(&mut self, c: char, registry: &mut Registry) -> Step {
        loop {
            match self.state {
                ObjState::PreBrace => {
                    if c == '{' {
                        self.state = ObjState::WaitingForKey;
                    }
                    return Step::Consumed;
                }
                ObjState::WaitingForKey => {
                    if c == '"' {
                        self.key_buffer.clear();
                        self.state = ObjState::ReadingKey;
                    } else if c == '}' {
                        self.finalize();
                        return Step::Finished;
                    }
                    // Whitespace and anything unexpected is skipped.
                    return Step::Consumed;
                }
                ObjState::ReadingKey => {
                    // Keys accumulate raw characters: escapes are NOT
                    // decoded, so a key containing `\"` terminates at the
                    // escaped quote. Known limitation, kept as-is.
                    if c == '"' {
                        self.state = ObjState::WaitingForValue;
                    } else {
                        self.key_buffer.push(c);
                    }
                    return Step::Consumed;
                }
                ObjState::WaitingForValue => {
                    if c == ':' || is_ws(c) {
                        return Step::Consumed;
                    }
                    if c == '}' {
                        self.finalize();
                        return Step::Finished;
                    }
                    self.start_child(c, registry);
                    return Step::Consumed;
                }
                ObjState::ReadingValue => {
                    let Some(child) = self.child.as_mut() else {
                        self.state = ObjState::WaitingForCommaOrEnd;
                        continue;
                    };
                    match child.feed(c, registry) {
                        Step::Consumed => return Step::Consumed,
                        step => {
                            if let Some(value) = child.final_value() {
                                self.map.insert(self.child_key.clone(), value);
                                self.dirty = true;
                            }
                            self.child = None;
                            self.state = ObjState::WaitingForCommaOrEnd;
                            if step == Step::FinishedReprocess {
                                continue;
                            }
                            return Step::Consumed;
                        }
                    }
                }
                ObjState::WaitingForCommaOrEnd => {
                    if c == ',' {
                        self.state = ObjState::WaitingForKey;
                    } else if c == '}' {
                        self.finalize();
                        return Step::Finished;
                    }
                    // Whitespace and reprocessed closing quotes land here
                    // and are ignored.
                    return Step::Consumed;
                }
                ObjState::Done => return Step::Consumed,
            }
        }
    }

    fn start_child(&mut self, c: char, registry: &mut Registry) {
        let key = self.key_buffer.clone();
        let kind = ValueKind::classify(c);
        let child_path = append_key(&self.path, &key);
        let child_sink = registry.resolve(&child_path, kind);
        trace!(path = %child_path, kind = %kind, "announcing child");
        self.sink.announce(ChildKey::Key(key.clone()), child_sink.clone());
        // Placeholder until the child completes. Duplicate keys overwrite.
        self.map.insert(key.clone(), Value::Null);
        self.dirty = true;
        let mut child = Delegate::new(child_path, kind, child_sink);
        // A degenerate first character (junk classified as a number) can
        // finish the child immediately; it has nothing for the parent to
        // re-examine.
        if child.feed(c, registry) == Step::Consumed {
            self.child = Some(Box::new(child));
            self.child_key = key;
            self.state = ObjState::ReadingValue;
        } else {
            if let Some(value) = child.final_value() {
                self.map.insert(key, value);
            }
            self.state = ObjState::WaitingForCommaOrEnd;
        }
    }

    fn flush(&mut self) {
        if self.done {
            return;
        }
        if let Some(child) = self.child.as_mut() {
            child.flush();
        }
        if self.dirty {
            self.sink.push(Value::Object(self.map.clone()));
            self.dirty = false;
        }
    }

    fn finalize(&mut self) {
        self.done = true;
        self.state = ObjState::Done;
        self.sink.close_ok(Value::Object(self.map.clone()));
    }
}

// ---------------------------------------------------------------------------
// Arrays

enum ArrState {
    PreBracket,
    WaitingForValue,
    ReadingValue,
    WaitingForCommaOrEnd,
    Done,
}

pub(crate) struct ArrayDelegate {
    path: String,
    sink: Sink,
    state: ArrState,
    list: Vec<Value>,
    next_index: usize,
    child: Option<Box<Delegate>>,
    child_index: usize,
    dirty: bool,
    done: bool,
}

impl ArrayDelegate {
    fn new(path: String, sink: Sink) -> Self {
        ArrayDelegate {
            path,
            sink,
            state: ArrState::PreBracket,
            list: Vec::new(),
            next_index: 0,
            child: None,
            child_index: 0,
            dirty: false,
            done: false,
        }
    }

    fn feed(&mut self, c: char, registry: &mut Registry) -> Step {
        loop {
            match self.state {
                ArrState::PreBracket => {
                    if c == '[' {
                        self.state = ArrState::WaitingForValue;
                    }
                    return Step::Consumed;
                }
                ArrState::WaitingForValue => {
                    if c == ']' {
                        self.finalize();
                        return Step::Finished;
                    }
                    if starts_value(c) {
                        self.start_child(c, registry);
                    }
                    // Whitespace and stray commas are skipped.
                    return Step::Consumed;
                }
                ArrState::ReadingValue => {
                    let Some(child) = self.child.as_mut() else {
                        self.state = ArrState::WaitingForCommaOrEnd;
                        continue;
                    };
                    match child.feed(c, registry) {
                        Step::Consumed => return Step::Consumed,
                        step => {
                            if let Some(value) = child.final_value() {
                                self.list[self.child_index] = value;
                                self.dirty = true;
                            }
                            self.child = None;
                            self.state = ArrState::WaitingForCommaOrEnd;
                            if step == Step::FinishedReprocess {
                                continue;
                            }
                            return Step::Consumed;
                        }
                    }
                }
                ArrState::WaitingForCommaOrEnd => {
                    if c == ',' {
                        self.state = ArrState::WaitingForValue;
                    } else if c == ']' {
                        self.finalize();
                        return Step::Finished;
                    }
                    return Step::Consumed;
                }
                ArrState::Done => return Step::Consumed,
            }
        }
    }

    fn start_child(&mut self, c: char, registry: &mut Registry) {
        let index = self.next_index;
        let kind = ValueKind::classify(c);
        let child_path = append_index(&self.path, index);
        let child_sink = registry.resolve(&child_path, kind);
        trace!(path = %child_path, kind = %kind, "announcing element");
        self.sink.announce(ChildKey::Index(index), child_sink.clone());
        self.list.push(Value::Null);
        self.next_index += 1;
        self.dirty = true;
        let mut child = Delegate::new(child_path, kind, child_sink);
        if child.feed(c, registry) == Step::Consumed {
            self.child = Some(Box::new(child));
            self.child_index = index;
            self.state = ArrState::ReadingValue;
        } else {
            if let Some(value) = child.final_value() {
                self.list[index] = value;
            }
            self.state = ArrState::WaitingForCommaOrEnd;
        }
    }

    fn flush(&mut self) {
        if self.done {
            return;
        }
        if let Some(child) = self.child.as_mut() {
            child.flush();
        }
        if self.dirty {
            self.sink.push(Value::Array(self.list.clone()));
            self.dirty = false;
        }
    }

    fn finalize(&mut self) {
        self.done = true;
        self.state = ArrState::Done;
        self.sink.close_ok(Value::Array(self.list.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathStreamError;
    use crate::parser::{ParseCore, Registry};
    use crate::sink::Polled;
    use serde_json::json;

    /// Feed the whole document as a single fragment.
    fn run(doc: &str) -> Registry {
        let mut registry = Registry::new();
        let mut core = ParseCore::new();
        core.feed_fragment(doc, &mut registry);
        registry
    }

    /// Feed one character per fragment - the stress shape.
    fn run_charwise(doc: &str) -> Registry {
        let mut registry = Registry::new();
        let mut core = ParseCore::new();
        for c in doc.chars() {
            core.feed_fragment(&c.to_string(), &mut registry);
        }
        registry
    }

    fn final_at(registry: &Registry, path: &str) -> Option<serde_json::Value> {
        registry.get_sink(path).and_then(|s| s.current_final())
    }

    fn emissions(registry: &Registry, path: &str) -> Vec<serde_json::Value> {
        let sink = registry.get_sink(path).expect("sink exists");
        let mut out = Vec::new();
        let mut cursor = 0;
        while let Polled::Item(v) = sink.poll_buffer(cursor) {
            out.push(v);
            cursor += 1;
        }
        out
    }

    #[test]
    fn flat_object() {
        let registry = run(r#"{"name":"Alice","age":30}"#);
        assert_eq!(final_at(&registry, "name"), Some(json!("Alice")));
        assert_eq!(final_at(&registry, "age"), Some(json!(30)));
        assert_eq!(
            final_at(&registry, ""),
            Some(json!({"name": "Alice", "age": 30}))
        );
    }

    #[test]
    fn charwise_matches_whole() {
        let doc = r#"{"a":{"b":[1,"x",true,null]},"c":-2.5}"#;
        let whole = run(doc);
        let charwise = run_charwise(doc);
        for path in ["", "a", "a.b", "a.b[0]", "a.b[1]", "a.b[2]", "a.b[3]", "c"] {
            assert_eq!(
                final_at(&whole, path),
                final_at(&charwise, path),
                "path {path:?} differs between fragmentations"
            );
        }
        assert_eq!(final_at(&whole, "c"), Some(json!(-2.5)));
    }

    #[test]
    fn string_chunks_concatenate_to_final() {
        let registry = run_charwise(r#"{"name":"Alice"}"#);
        let chunks = emissions(&registry, "name");
        assert!(!chunks.is_empty());
        let mut collected = String::new();
        for chunk in &chunks {
            let text = chunk.as_str().expect("string chunk");
            assert!(!text.is_empty());
            collected.push_str(text);
        }
        assert_eq!(collected, "Alice");
    }

    #[test]
    fn escapes_decode_and_unknown_escapes_pass_through() {
        let registry = run(r#"{"a":"line\nbreak","b":"\u0048i","c":"q\"end\\"}"#);
        assert_eq!(final_at(&registry, "a"), Some(json!("line\nbreak")));
        // \uXXXX is intentionally not decoded.
        assert_eq!(final_at(&registry, "b"), Some(json!("\\u0048i")));
        assert_eq!(final_at(&registry, "c"), Some(json!("q\"end\\")));
    }

    #[test]
    fn escape_split_across_fragments_never_splits_a_chunk() {
        let mut registry = Registry::new();
        let mut core = ParseCore::new();
        core.feed_fragment(r#"{"a":"x\"#, &mut registry);
        core.feed_fragment(r#"ny""#, &mut registry);
        core.feed_fragment("}", &mut registry);
        let chunks = emissions(&registry, "a");
        assert_eq!(chunks, vec![json!("x"), json!("\ny")]);
        assert_eq!(final_at(&registry, "a"), Some(json!("x\ny")));
    }

    #[test]
    fn keys_do_not_decode_escapes() {
        // The escaped quote terminates the key early; the rest of the
        // member is skipped as junk. Preserved behavior, not a feature.
        let registry = run(r#"{"a\"x":1}"#);
        assert_eq!(final_at(&registry, ""), Some(json!({"a\\": null})));
    }

    #[test]
    fn numbers_and_literals_end_on_their_delimiter() {
        let registry = run(r#"{"i":42,"f":3.14,"e":1e3,"t":true,"n":null,"neg":-7}"#);
        assert_eq!(final_at(&registry, "i"), Some(json!(42)));
        assert_eq!(final_at(&registry, "f"), Some(json!(3.14)));
        assert_eq!(final_at(&registry, "e"), Some(json!(1000.0)));
        assert_eq!(final_at(&registry, "t"), Some(json!(true)));
        assert_eq!(final_at(&registry, "n"), Some(json!(null)));
        assert_eq!(final_at(&registry, "neg"), Some(json!(-7)));
    }

    #[test]
    fn number_closing_the_root_is_not_lost() {
        let registry = run(r#"{"age":30}"#);
        assert_eq!(final_at(&registry, "age"), Some(json!(30)));
        assert_eq!(final_at(&registry, ""), Some(json!({"age": 30})));
    }

    #[test]
    fn invalid_number_closes_only_its_sink() {
        let registry = run(r#"{"bad":1.2.3,"good":5}"#);
        let bad = registry.get_sink("bad").unwrap();
        assert!(matches!(
            bad.poll_buffer(0),
            Polled::Failed(PathStreamError::Parse { .. })
        ));
        assert_eq!(final_at(&registry, "good"), Some(json!(5)));
        // The failed member keeps its placeholder in the parent.
        assert_eq!(
            final_at(&registry, ""),
            Some(json!({"bad": null, "good": 5}))
        );
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let registry = run(r#"{"a":1,"a":2}"#);
        assert_eq!(final_at(&registry, ""), Some(json!({"a": 2})));
    }

    #[test]
    fn empty_object_and_array() {
        let registry = run(r#"{"o":{},"a":[]}"#);
        assert_eq!(final_at(&registry, "o"), Some(json!({})));
        assert_eq!(final_at(&registry, "a"), Some(json!([])));
    }

    #[test]
    fn array_of_objects() {
        let registry = run(r#"{"users":[{"name":"Alice"},{"name":"Bob"}]}"#);
        assert_eq!(final_at(&registry, "users[0].name"), Some(json!("Alice")));
        assert_eq!(final_at(&registry, "users[1].name"), Some(json!("Bob")));
        assert_eq!(
            final_at(&registry, "users"),
            Some(json!([{"name": "Alice"}, {"name": "Bob"}]))
        );
        let users = registry.get_sink("users").unwrap();
        assert_eq!(users.children_len(), 2);
    }

    #[test]
    fn whitespace_everywhere() {
        let registry = run("{ \"a\" :\t1 ,\n\"b\" : [ 1 , 2 ] }");
        assert_eq!(final_at(&registry, "a"), Some(json!(1)));
        assert_eq!(final_at(&registry, "b"), Some(json!([1, 2])));
    }

    #[test]
    fn object_snapshots_are_prefix_monotone() {
        let registry = run_charwise(r#"{"a":1,"b":{"c":2},"d":"x"}"#);
        let snapshots = emissions(&registry, "");
        assert!(!snapshots.is_empty());
        for pair in snapshots.windows(2) {
            let prev = pair[0].as_object().expect("object snapshot");
            let next = pair[1].as_object().expect("object snapshot");
            for key in prev.keys() {
                assert!(next.contains_key(key), "key {key:?} was removed");
            }
        }
        assert_eq!(
            snapshots.last(),
            Some(&json!({"a": 1, "b": {"c": 2}, "d": "x"}))
        );
    }

    #[test]
    fn array_snapshots_grow_and_end_on_final() {
        let registry = run_charwise(r#"{"xs":[10,20,30]}"#);
        let snapshots = emissions(&registry, "xs");
        for pair in snapshots.windows(2) {
            let prev = pair[0].as_array().expect("array snapshot").len();
            let next = pair[1].as_array().expect("array snapshot").len();
            assert!(next >= prev, "array snapshot shrank");
        }
        assert_eq!(snapshots.last(), Some(&json!([10, 20, 30])));
    }

    #[test]
    fn announce_precedes_first_child_emission() {
        let mut registry = Registry::new();
        let mut core = ParseCore::new();
        core.feed_fragment(r#"{"msg":"he"#, &mut registry);
        // At the fragment boundary the child is announced and has flushed
        // its first chunk.
        let root = registry.get_sink("").unwrap();
        assert_eq!(root.children_len(), 1);
        let msg = registry.get_sink("msg").unwrap();
        assert!(matches!(msg.poll_buffer(0), Polled::Item(_)));
        core.feed_fragment(r#"llo"}"#, &mut registry);
        assert_eq!(final_at(&registry, "msg"), Some(json!("hello")));
    }

    #[test]
    fn deep_nesting() {
        let registry = run(r#"{"a":{"b":{"c":{"d":[[1],[2,[3]]]}}}}"#);
        assert_eq!(final_at(&registry, "a.b.c.d[1][1][0]"), Some(json!(3)));
        assert_eq!(
            final_at(&registry, "a.b.c.d"),
            Some(json!([[1], [2, [3]]]))
        );
    }
}
