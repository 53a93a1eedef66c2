//! Streaming, path-addressable JSON parser.
//!
//! Consumes one JSON document arriving as a sequence of text fragments of
//! unpredictable size (the shape of large-language-model output) and lets
//! consumers subscribe to individual paths *before the document is
//! complete*. A subscription yields either a lazy sequence of partial
//! values (string chunks, progressive object/array snapshots) or a single
//! eventual final value. Results are identical regardless of how the
//! input is chopped - one character per fragment is a legitimate case.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use json_path_stream::{fragments, StreamParser, ValueKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let producer = fragments::chars(r#"{"user":{"name":"Alice"},"tags":["a","b"]}"#);
//!     let parser = StreamParser::open(producer);
//!
//!     // Stream a string as it arrives.
//!     let name = parser.get("user.name", ValueKind::String)?;
//!     let mut chunks = name.values();
//!     while let Some(chunk) = chunks.next().await? {
//!         print!("{}", chunk.as_str().unwrap_or_default());
//!     }
//!
//!     // Iterate an array's elements as they are discovered.
//!     let tags = parser.get("tags", ValueKind::Array)?;
//!     let mut elements = tags.children();
//!     while let Some(tag) = elements.next().await? {
//!         println!("{} = {}", tag.path(), tag.final_value().await?);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod delegate;
mod error;
pub mod fragments;
mod handle;
mod iterator;
mod parser;
mod sink;
mod types;

pub use error::{FragmentError, PathStreamError};
pub use fragments::FragmentStream;
pub use handle::PathHandle;
pub use iterator::{ChildIter, ValueIter};
pub use parser::{ParserBuilder, StreamParser};
pub use types::{append_index, append_key, join, ValueKind};
