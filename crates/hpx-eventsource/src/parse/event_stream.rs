//! [`Stream`] that converts a stream of
//! [`Bytes`](bytes::Bytes) chunks into [`Event`]s.

use core::{
    pin::Pin,
    task::{Context, Poll, ready},
    time::Duration,
};

use bytes::{Bytes, BytesMut};
use bytes_utils::{Str, StrMut};
use futures_core::Stream;

use super::{
    assembler::{Frame, FrameAssembler},
    constants::{EMPTY_STR, MESSAGE_STR},
    errors::EventStreamError,
    event::Event,
    field::{LineKind, classify_line, trim_line_end},
};

// ---------------------------------------------------------------------------
// EventBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct EventBuilder {
    event: Str,
    id: Str,
    data_buffer: EventBuilderDataBuffer,
    retry: Option<Duration>,
}

/// Optimised data buffer.
///
/// The common case is a single `data:` line per event, so we keep the first
/// value as an immutable [`Str`] and only upgrade to a mutable buffer when a
/// second `data:` line arrives.
#[derive(Debug, Default, Clone)]
enum EventBuilderDataBuffer {
    #[default]
    Uninit,
    Immutable(Str),
    Mutable(StrMut),
}

impl EventBuilderDataBuffer {
    fn freeze(self) -> Str {
        match self {
            Self::Uninit => EMPTY_STR,
            Self::Immutable(s) => s,
            Self::Mutable(s) => s.freeze(),
        }
    }

    fn push_str(&mut self, s: Str) {
        match self {
            Self::Uninit => *self = Self::Immutable(s),
            Self::Immutable(immutable_buf) => {
                let len = immutable_buf.len() + 1 + s.len();
                let inner = BytesMut::with_capacity(len);
                // Safety: The buffer is empty, so it holds no invalid bytes.
                let mut buf = unsafe { StrMut::from_inner_unchecked(inner) };
                buf.push_str(immutable_buf);
                buf.push('\n');
                buf.push_str(&s);
                *self = Self::Mutable(buf);
            }
            Self::Mutable(mutable_buf) => {
                mutable_buf.push('\n');
                mutable_buf.push_str(&s);
            }
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Uninit)
    }
}

/// Zero-copy [`Str`] over `part`, which must be borrowed from `line`.
fn sub_str(line: &Bytes, part: &str) -> Str {
    if part.is_empty() {
        return EMPTY_STR;
    }
    let bytes = line.slice_ref(part.as_bytes());
    // Safety: `part` is a `&str`, so the bytes it covers are valid UTF-8.
    unsafe { Str::from_inner_unchecked(bytes) }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self {
            event: EMPTY_STR,
            id: EMPTY_STR,
            data_buffer: EventBuilderDataBuffer::default(),
            retry: None,
        }
    }
}

impl EventBuilder {
    /// Apply one line; `text` is `line` validated as UTF-8.
    fn add(&mut self, line: &Bytes, text: &str) {
        // A line without a colon names a field with an empty value.
        let (name, value) = match classify_line(text) {
            LineKind::Field { name, value } => (name, value),
            LineKind::Unrecognized => (trim_line_end(text), ""),
            LineKind::Blank | LineKind::Comment => return,
        };
        match name {
            "event" => self.event = sub_str(line, value),
            "data" => self.data_buffer.push_str(sub_str(line, value)),
            "id" => {
                if memchr::memchr(0, value.as_bytes()).is_none() {
                    self.id = sub_str(line, value);
                }
            }
            "retry" => {
                if !value.is_empty()
                    && value.bytes().all(|b| b.is_ascii_digit())
                    && let Ok(millis) = value.parse()
                {
                    self.retry = Some(Duration::from_millis(millis));
                }
            }
            _ => {}
        }
    }

    /// Apply every line of `frame`, then dispatch.
    fn build<E>(&mut self, frame: &Frame) -> Result<Option<Event>, EventStreamError<E>> {
        let last_id = self.id.clone();
        for line in frame.lines() {
            match core::str::from_utf8(line) {
                Ok(text) => self.add(line, text),
                Err(err) => {
                    self.discard(last_id);
                    return Err(err.into());
                }
            }
        }
        Ok(self.dispatch())
    }

    /// Drop the frame under construction, restoring the ID it started with.
    fn discard(&mut self, id: Str) {
        *self = Self { id, ..Self::default() };
    }

    /// Dispatch a complete event (HTML spec §9.2.6 steps 1–8).
    #[must_use]
    fn dispatch(&mut self) -> Option<Event> {
        let EventBuilder {
            mut event,
            id,
            data_buffer,
            retry,
        } = core::mem::take(self);
        // Preserve `id` for the next event.
        self.id = id.clone();

        if data_buffer.is_empty() {
            return None;
        }

        if event.is_empty() {
            event = MESSAGE_STR;
        }

        Some(Event {
            event,
            data: data_buffer.freeze(),
            id,
            retry,
        })
    }
}

// ---------------------------------------------------------------------------
// EventStream
// ---------------------------------------------------------------------------

pin_project_lite::pin_project! {
    /// A [`Stream`] that converts a stream of byte chunks into dispatched
    /// [`Event`]s.
    ///
    /// Uses the same [`FrameAssembler`] and line grammar as the callback
    /// interface, but follows the HTML dispatch rules: `data` lines are
    /// joined, frames without data produce nothing, and a frame still open
    /// when the stream ends is discarded.
    #[project = EventStreamProjection]
    #[derive(Debug)]
    pub struct EventStream<S> {
        #[pin]
        stream: S,
        assembler: FrameAssembler,
        builder: EventBuilder,
        terminated: bool,
        last_event_id: Str,
    }
}

impl<S> EventStream<S> {
    /// Create a new [`EventStream`] from an underlying byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            assembler: FrameAssembler::new(),
            builder: EventBuilder::default(),
            terminated: false,
            last_event_id: EMPTY_STR,
        }
    }

    /// Seed the last event ID, as when resuming a stream.
    pub fn set_last_event_id(&mut self, id: impl Into<Str>) {
        let id = id.into();
        self.builder.id = id.clone();
        self.last_event_id = id;
    }

    /// Reference to the last event ID given out by this stream.
    pub fn last_event_id(&self) -> &Str {
        &self.last_event_id
    }

    /// Take the input not yet split into lines (useful for checking leftovers).
    pub fn take_buffer(mut self) -> BytesMut {
        self.assembler.take_buffer()
    }
}

impl<S, E, B> Stream for EventStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Event, EventStreamError<E>>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<<Self as Stream>::Item>> {
        let mut this = self.project();

        loop {
            while let Some(frame) = this.assembler.next_frame() {
                match this.builder.build(&frame) {
                    Ok(Some(event)) => {
                        *this.last_event_id = event.id.clone();
                        return Poll::Ready(Some(Ok(event)));
                    }
                    Ok(None) => {}
                    Err(e) => return Poll::Ready(Some(Err(e))),
                }
            }

            if *this.terminated {
                return Poll::Ready(None);
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => this.assembler.extend(bytes.as_ref()),
                Some(Err(e)) => return Poll::Ready(Some(Err(EventStreamError::Transport(e)))),
                None => {
                    // A trailing CR is now known to be standalone; anything
                    // still unterminated after that is dropped.
                    *this.terminated = true;
                    this.assembler.end_stream();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
