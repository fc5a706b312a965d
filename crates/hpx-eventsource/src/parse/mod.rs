//! Server-Sent Events wire format.
//!
//! - [`assembler`]: byte chunks to complete frames.
//! - [`field`]: the `keyword: value` line grammar.
//! - [`event_stream`]: a [`Stream`](futures_core::Stream) adapter that applies
//!   the [HTML Living Standard](https://html.spec.whatwg.org/multipage/server-sent-events.html)
//!   dispatch rules on top of both, for callers who want joined events.

pub mod assembler;
pub mod constants;
mod errors;
pub mod event;
pub mod event_stream;
pub mod field;

pub use assembler::{Frame, FrameAssembler};
pub use errors::EventStreamError;
pub use event::Event;
pub use event_stream::EventStream;
pub use field::{EventField, Keyword, LineKind};
