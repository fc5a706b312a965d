//! Errors produced by [`EventStream`](super::event_stream::EventStream).

use core::str::Utf8Error;

/// Failure while turning a byte stream into events.
///
/// Either variant is yielded as a stream item; polling may continue after a
/// `Utf8` error, the offending frame is skipped.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum EventStreamError<E> {
    /// The underlying byte stream failed.
    #[error("{0}")]
    Transport(E),
    /// A complete frame was not valid UTF-8.
    #[error("Invalid UTF-8 in event stream: {0}")]
    Utf8(#[from] Utf8Error),
}
