//! Incremental frame assembly over arbitrarily split byte chunks.
//!
//! The assembler works on raw bytes and never decodes text, so a multi-byte
//! character split across two chunks simply waits in the pending buffer until
//! its line is complete. Chunk boundaries are invisible in the output: feeding
//! a stream in any number of pieces yields the same frames as feeding it whole.

use bytes::{Buf, Bytes, BytesMut};

use super::constants::{BOM, CR, LF};

/// One SSE record: a run of non-blank lines closed by a blank line or by the
/// end of the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    raw: Bytes,
    lines: Vec<Bytes>,
}

impl Frame {
    /// The untouched source bytes, line terminators included.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// The frame's lines without their terminators, in source order.
    pub fn lines(&self) -> &[Bytes] {
        &self.lines
    }

    /// Number of non-blank lines in the frame.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Frames always carry at least one line; this exists for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Finds the next end-of-line in `bytes`.
///
/// Returns `(line_end, remainder_start)` with the non-inclusive end of the
/// line and the inclusive start of the remainder. Returns `None` if more data
/// is needed: either there is no terminator yet, or the buffer ends with a
/// lone CR that could be the first half of a CRLF pair. Once the stream has
/// ended (`at_eof`) a trailing CR is a terminator on its own.
fn find_eol(bytes: &[u8], at_eof: bool) -> Option<(usize, usize)> {
    let first_match = memchr::memchr2(CR, LF, bytes)?;

    match bytes[first_match] {
        LF => Some((first_match, first_match + 1)),
        _ => match bytes.get(first_match + 1) {
            Some(&LF) => Some((first_match, first_match + 2)),
            Some(_) => Some((first_match, first_match + 1)),
            None if at_eof => Some((first_match, first_match + 1)),
            None => None,
        },
    }
}

/// Whether the buffer starts with a UTF-8 BOM; `None` if it is too short to
/// tell yet.
const fn starts_with_bom(buf: &[u8]) -> Option<bool> {
    match buf.len() {
        0 => None,
        1 => {
            if buf[0] == BOM[0] {
                None
            } else {
                Some(false)
            }
        }
        2 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] {
                None
            } else {
                Some(false)
            }
        }
        _gte_3 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] && buf[2] == BOM[2] {
                Some(true)
            } else {
                Some(false)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssemblerState {
    /// Still looking for a leading BOM.
    NotStarted,
    Started,
    /// `finish` was called; trailing CRs count as terminators.
    Finished,
}

/// Stateful accumulator turning byte chunks into complete [`Frame`]s.
///
/// Push input with [`extend`](Self::extend) and pull frames with
/// [`next_frame`](Self::next_frame) (or [`drain`](Self::drain)). Anything
/// not yet terminated stays buffered for the next chunk.
#[derive(Debug)]
pub struct FrameAssembler {
    /// Bytes not yet split into lines.
    buffer: BytesMut,
    /// Source bytes of the frame under construction.
    raw: BytesMut,
    /// Completed lines of the frame under construction.
    lines: Vec<Bytes>,
    state: AssemblerState,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            raw: BytesMut::new(),
            lines: Vec::new(),
            state: AssemblerState::NotStarted,
        }
    }

    /// Append a chunk to the pending buffer.
    pub fn extend(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.buffer.extend_from_slice(chunk);

        if self.state == AssemblerState::NotStarted {
            match starts_with_bom(&self.buffer) {
                Some(true) => {
                    self.state = AssemblerState::Started;
                    self.buffer.advance(BOM.len());
                }
                Some(false) => self.state = AssemblerState::Started,
                None => {}
            }
        }
    }

    /// Pull the next complete frame, if the buffered input holds one.
    pub fn next_frame(&mut self) -> Option<Frame> {
        // A BOM prefix might still be incomplete.
        if self.state == AssemblerState::NotStarted {
            return None;
        }

        let at_eof = self.state == AssemblerState::Finished;
        while let Some((line_end, rem_start)) = find_eol(&self.buffer, at_eof) {
            let line = self.buffer.split_to(line_end).freeze();
            let terminator = self.buffer.split_to(rem_start - line_end);

            if line.is_empty() {
                if self.lines.is_empty() {
                    // Blank line with nothing accumulated: no frame.
                    self.raw.clear();
                    continue;
                }
                self.raw.extend_from_slice(&terminator);
                return Some(self.take_frame());
            }

            self.raw.extend_from_slice(&line);
            self.raw.extend_from_slice(&terminator);
            self.lines.push(line);
        }
        None
    }

    /// Drain every frame currently available.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { assembler: self }
    }

    /// Signal the end of the stream without flushing.
    ///
    /// A trailing CR now terminates its line, so [`next_frame`](Self::next_frame)
    /// can return frames it was holding back. A frame without its closing
    /// blank line stays pending.
    pub fn end_stream(&mut self) {
        // A buffer holding only a partial BOM is plain data after all.
        self.state = AssemblerState::Finished;
    }

    /// Signal the end of the stream and return whatever is left.
    ///
    /// A trailing line without a terminator counts as complete, and a frame
    /// without its closing blank line is emitted as the last frame.
    pub fn finish(&mut self) -> Vec<Frame> {
        self.end_stream();

        let mut frames: Vec<Frame> = self.drain().collect();
        if !self.buffer.is_empty() {
            let line = self.buffer.split().freeze();
            self.raw.extend_from_slice(&line);
            self.lines.push(line);
        }
        if !self.lines.is_empty() {
            frames.push(self.take_frame());
        }
        frames
    }

    /// Discard the partial frame and all buffered input.
    ///
    /// Returns the assembler to its initial state, ready for a new stream.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Bytes received but not yet part of an emitted frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.raw.len()
    }

    /// Take the buffered input that has not been split into lines yet.
    pub fn take_buffer(&mut self) -> BytesMut {
        self.buffer.split()
    }

    fn take_frame(&mut self) -> Frame {
        Frame {
            raw: self.raw.split().freeze(),
            lines: std::mem::take(&mut self.lines),
        }
    }
}

/// Iterator returned by [`FrameAssembler::drain`].
#[derive(Debug)]
pub struct Drain<'a> {
    assembler: &'a mut FrameAssembler,
}

impl Iterator for Drain<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.assembler.next_frame()
    }
}
