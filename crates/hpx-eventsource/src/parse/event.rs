//! Dispatched events as defined by the
//! [HTML Living Standard](https://html.spec.whatwg.org/multipage/server-sent-events.html).

use core::time::Duration;

use bytes_utils::Str;

/// One dispatched event from an [`EventStream`](super::event_stream::EventStream).
///
/// Unlike the per-field [`Subscriber`](crate::Subscriber) callbacks, all
/// `data` lines of a frame are joined with `\n` here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Event {
    /// Event type; `"message"` when the frame had no `event` field.
    pub event: Str,
    /// Joined data payload.
    pub data: Str,
    /// Last event ID in effect, carried over from earlier frames.
    pub id: Str,
    /// Reconnection delay advertised in this frame.
    pub retry: Option<Duration>,
}

impl Event {
    /// The event ID as an integer, if it is one.
    pub fn id_as_i64(&self) -> Option<i64> {
        self.id.parse().ok()
    }
}
