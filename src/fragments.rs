//! Fragment producers.
//!
//! The parser's only external boundary is a stream of text fragments:
//! arbitrary non-empty pieces of one JSON document, delivered in order,
//! with completion signaled by end-of-sequence and producer failure by a
//! single `Err` item. There are no delimiter semantics - a fragment may
//! split the document anywhere, including mid-escape and mid-number.
//!
//! The producers here cover the common cases: a whole document in one
//! fragment, fixed-size pieces, the one-character-per-fragment stress
//! shape, a timer-paced slicer for demos, and a producer that fails
//! part-way through.

use crate::error::FragmentError;
use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;

/// A fragment producer: an ordered stream of text pieces.
pub type FragmentStream = BoxStream<'static, Result<String, FragmentError>>;

/// The whole document as a single fragment.
pub fn whole(text: impl Into<String>) -> FragmentStream {
    let text = text.into();
    let items = if text.is_empty() { vec![] } else { vec![Ok(text)] };
    stream::iter(items).boxed()
}

/// The document sliced into pieces of `size` characters.
pub fn pieces(text: &str, size: usize) -> FragmentStream {
    stream::iter(slice(text, size).into_iter().map(Ok).collect::<Vec<_>>()).boxed()
}

/// One character per fragment - the stress case.
pub fn chars(text: &str) -> FragmentStream {
    pieces(text, 1)
}

/// Pieces of `size` characters, one per tick of `interval`.
///
/// Mirrors the classic demo producer that slices a canned response on a
/// timer. Drive it under `#[tokio::test(start_paused = true)]` to keep
/// tests instant.
pub fn paced(text: &str, size: usize, interval: Duration) -> FragmentStream {
    stream::unfold(
        (slice(text, size).into_iter(), interval),
        |(mut iter, interval)| async move {
            let piece = iter.next()?;
            tokio::time::sleep(interval).await;
            Some((Ok(piece), (iter, interval)))
        },
    )
    .boxed()
}

/// The JSON encoding of any serializable value, as a single fragment.
pub fn from_value<T: serde::Serialize>(value: &T) -> FragmentStream {
    match serde_json::to_string(value) {
        Ok(text) => whole(text),
        Err(err) => stream::iter(vec![Err(FragmentError::new(err.to_string()))]).boxed(),
    }
}

/// Pieces of `size` characters, then a producer error.
pub fn faulty(text: &str, size: usize, message: impl Into<String>) -> FragmentStream {
    let mut items: Vec<Result<String, FragmentError>> =
        slice(text, size).into_iter().map(Ok).collect();
    items.push(Err(FragmentError::new(message)));
    stream::iter(items).boxed()
}

/// Slice at character boundaries, never emitting an empty piece.
fn slice(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == size {
            out.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
