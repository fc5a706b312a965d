//! Sans-IO protocol core.
//!
//! [`StreamDecoder`] owns the frame assembler and the session state of one
//! connection and routes everything it parses to a [`Subscriber`]. It does no
//! I/O and never blocks: it is pure computation over the bytes it is given,
//! which makes it usable from any transport callback.

use tracing::{trace, warn};

use crate::{
    encoding::TextEncoding,
    parse::{
        assembler::{Frame, FrameAssembler},
        field::{Keyword, match_field},
    },
    session::SessionState,
    subscriber::Subscriber,
};

/// Turns body chunks into subscriber callbacks.
#[derive(Debug)]
pub struct StreamDecoder {
    assembler: FrameAssembler,
    session: SessionState,
    keywords: Vec<Keyword>,
    encoding: TextEncoding,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(Keyword::STANDARD.to_vec(), TextEncoding::Utf8)
    }
}

impl StreamDecoder {
    /// Create a decoder matching `keywords` in order and decoding with `encoding`.
    pub fn new(keywords: Vec<Keyword>, encoding: TextEncoding) -> Self {
        Self {
            assembler: FrameAssembler::new(),
            session: SessionState::new(),
            keywords,
            encoding,
        }
    }

    /// Session state as of the last dispatched frame.
    pub fn session(&self) -> SessionState {
        self.session
    }

    /// The keywords this decoder recognizes.
    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    /// Feed one body chunk and dispatch every frame it completes.
    ///
    /// Returns the number of frames dispatched.
    pub fn feed(&mut self, chunk: &[u8], subscriber: &dyn Subscriber) -> usize {
        self.assembler.extend(chunk);
        let mut dispatched = 0;
        while let Some(frame) = self.assembler.next_frame() {
            self.dispatch(&frame, subscriber);
            dispatched += 1;
        }
        dispatched
    }

    /// Flush whatever is pending at a graceful end of stream.
    ///
    /// Returns the number of frames dispatched.
    pub fn finish(&mut self, subscriber: &dyn Subscriber) -> usize {
        let frames = self.assembler.finish();
        for frame in &frames {
            self.dispatch(frame, subscriber);
        }
        frames.len()
    }

    /// Drop buffered input and return to a fresh session.
    pub fn reset(&mut self) {
        self.assembler.reset();
        self.session.reset();
    }

    fn dispatch(&mut self, frame: &Frame, subscriber: &dyn Subscriber) {
        let text = match self.encoding.decode(frame.raw()) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, bytes = frame.raw().len(), "Dropping undecodable SSE frame");
                subscriber.on_diagnostic(&err);
                return;
            }
        };
        trace!(lines = frame.len(), "SSE frame assembled");
        subscriber.on_raw_frame(&text);

        for line in frame.lines() {
            let Ok(line) = self.encoding.decode(line) else {
                continue;
            };
            if let Some(field) = match_field(&line, &self.keywords) {
                self.session.apply(&field);
                subscriber.on_event(&field);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        error::EventSourceError, parse::field::EventField, status::ConnectionStatus,
    };

    /// Records callbacks as strings, in order.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) log: Mutex<Vec<String>>,
    }

    impl Recorder {
        pub(crate) fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.log.lock())
        }
    }

    impl Subscriber for Recorder {
        fn on_status(&self, status: &ConnectionStatus) {
            self.log.lock().push(format!("status:{status}"));
        }

        fn on_raw_frame(&self, text: &str) {
            self.log.lock().push(format!("raw:{text:?}"));
        }

        fn on_event(&self, field: &EventField) {
            self.log
                .lock()
                .push(format!("{}={}", field.keyword, field.value));
        }

        fn on_diagnostic(&self, error: &EventSourceError) {
            self.log.lock().push(format!("diagnostic:{error}"));
        }
    }

    #[test]
    fn test_frame_fields_in_line_order() {
        let recorder = Recorder::default();
        let mut decoder = StreamDecoder::default();

        let frames = decoder.feed(b"id: 7\nevent: ping\ndata: hi\n\n", &recorder);

        assert_eq!(frames, 1);
        assert_eq!(
            recorder.take(),
            [
                "raw:\"id: 7\\nevent: ping\\ndata: hi\\n\\n\"",
                "id=7",
                "event=ping",
                "data=hi",
            ]
        );
        assert_eq!(decoder.session().last_event_id(), Some(7));
    }

    #[test]
    fn test_each_data_line_is_its_own_event() {
        let recorder = Recorder::default();
        let mut decoder = StreamDecoder::default();

        decoder.feed(b"data: YHOO\ndata: +2\ndata: 10\n\n", &recorder);

        let log = recorder.take();
        assert_eq!(&log[1..], ["data=YHOO", "data=+2", "data=10"]);
    }

    #[test]
    fn test_comment_and_unknown_lines_are_skipped() {
        let recorder = Recorder::default();
        let mut decoder = StreamDecoder::default();

        decoder.feed(b": keep-alive\nfoo: bar\ndata: x\n\n", &recorder);

        let log = recorder.take();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1], "data=x");
    }

    #[test]
    fn test_custom_keyword() {
        let recorder = Recorder::default();
        let mut keywords = Keyword::STANDARD.to_vec();
        keywords.push(Keyword::Custom("usage".to_string()));
        let mut decoder = StreamDecoder::new(keywords, TextEncoding::Utf8);

        decoder.feed(b"usage: 12\ndata: x\n\n", &recorder);

        assert_eq!(&recorder.take()[1..], ["usage=12", "data=x"]);
    }

    #[test]
    fn test_bad_retry_keeps_previous_value() {
        let recorder = Recorder::default();
        let mut decoder = StreamDecoder::default();

        decoder.feed(b"retry: 2500\n\nretry: abc\n\n", &recorder);

        assert_eq!(decoder.session().retry_interval_millis(), 2500);
        let log = recorder.take();
        assert!(log.contains(&"retry=abc".to_string()));
    }

    #[test]
    fn test_frames_split_across_feeds() {
        let recorder = Recorder::default();
        let mut decoder = StreamDecoder::default();

        assert_eq!(decoder.feed(b"data: caf\xC3", &recorder), 0);
        assert_eq!(decoder.feed(b"\xA9\n", &recorder), 0);
        assert_eq!(decoder.feed(b"\n", &recorder), 1);

        assert_eq!(recorder.take()[1], "data=café");
    }

    #[test]
    fn test_undecodable_frame_is_reported_and_skipped() {
        let recorder = Recorder::default();
        let mut decoder = StreamDecoder::default();

        decoder.feed(b"data: \xFF\xFE\n\ndata: ok\n\n", &recorder);

        let log = recorder.take();
        assert!(log[0].starts_with("diagnostic:Decoding error (utf-8)"));
        assert_eq!(&log[1..], ["raw:\"data: ok\\n\\n\"", "data=ok"]);
    }

    #[test]
    fn test_latin1_stream() {
        let recorder = Recorder::default();
        let mut decoder = StreamDecoder::new(Keyword::STANDARD.to_vec(), TextEncoding::Latin1);

        decoder.feed(b"data: caf\xE9\n\n", &recorder);

        assert_eq!(recorder.take()[1], "data=café");
    }

    #[test]
    fn test_finish_flushes_and_reset_clears() {
        let recorder = Recorder::default();
        let mut decoder = StreamDecoder::default();

        decoder.feed(b"id: 28825252\nevent: done", &recorder);
        assert_eq!(decoder.finish(&recorder), 1);
        assert_eq!(&recorder.take()[1..], ["id=28825252", "event=done"]);
        assert_eq!(decoder.session().last_event_id(), Some(28825252));

        decoder.reset();
        assert_eq!(decoder.session(), SessionState::default());
    }
}
