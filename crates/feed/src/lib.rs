//! Recent-changes feed.
//!
//! Subscribes to Wikimedia EventStreams (Server-Sent Events), turns each
//! record into an [`Event`], and yields them in arrival order. Transient
//! HTTP failures are retried inside the stream; malformed records surface as
//! per-item errors that callers skip.

pub mod error;
pub mod event;
pub mod sse;
pub mod stream;

pub use {
    error::{Error, Result},
    event::{Event, EventKind},
    stream::{DEFAULT_BASE_URL, EventStream, EventStreamClient, FeedConfig},
};
