//! Value kinds and path composition.

use std::fmt;

/// The JSON kind a path is subscribed as.
///
/// A sink's kind is fixed at creation; subscribing to the same path with a
/// different kind is a conflict. The parser never guesses - callers declare
/// the expected kind on every access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Null,
    Object,
    Array,
}

impl ValueKind {
    /// Classify a value by its first character.
    ///
    /// Anything that is not a string, object, array, or literal opener is
    /// treated as a number - the number delegate reports the parse failure
    /// if the guess was wrong.
    pub(crate) fn classify(first: char) -> ValueKind {
        match first {
            '"' => ValueKind::String,
            '{' => ValueKind::Object,
            '[' => ValueKind::Array,
            't' | 'f' => ValueKind::Boolean,
            'n' => ValueKind::Null,
            _ => ValueKind::Number,
        }
    }

    /// Whether sinks of this kind carry a child-announce log.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, ValueKind::Object | ValueKind::Array)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Null => "null",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append an object key to a path: `append_key("", "a") == "a"`,
/// `append_key("a", "b") == "a.b"`.
pub fn append_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Append an array index to a path: `append_index("a", 3) == "a[3]"`.
pub fn append_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Compose a path with a caller-supplied sub-path.
///
/// Bracketed sub-paths concatenate directly; anything else is dot-joined.
/// The sub-path may itself be dotted or indexed (`"profile.name"`,
/// `"[2].id"`). Paths are opaque - no quoting, no normalization.
pub fn join(path: &str, sub_path: &str) -> String {
    if sub_path.is_empty() {
        path.to_string()
    } else if sub_path.starts_with('[') {
        format!("{path}{sub_path}")
    } else {
        append_key(path, sub_path)
    }
}
