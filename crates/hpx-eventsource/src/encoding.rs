//! Text encodings for response decoding and request bodies.
//!
//! Only ASCII-compatible encodings are supported: line splitting happens on
//! raw `\r` / `\n` bytes before any decoding takes place.

use std::fmt;

use crate::error::{EventSourceError, EventSourceResult};

/// Character encoding of the event stream or of a text request body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TextEncoding {
    /// UTF-8, rejecting invalid sequences.
    #[default]
    Utf8,
    /// UTF-8, replacing invalid sequences with U+FFFD.
    Utf8Lossy,
    /// 7-bit US-ASCII.
    Ascii,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    /// Canonical label of the encoding.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Lossy => "utf-8 (lossy)",
            Self::Ascii => "us-ascii",
            Self::Latin1 => "iso-8859-1",
        }
    }

    /// Decode bytes into text.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::Decoding`] when `bytes` is not valid in
    /// this encoding.
    pub fn decode(&self, bytes: &[u8]) -> EventSourceResult<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| EventSourceError::decoding(self.label(), e.to_string())),
            Self::Utf8Lossy => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(EventSourceError::decoding(
                    self.label(),
                    format!("non-ASCII byte 0x{:02X} at offset {pos}", bytes[pos]),
                )),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode text into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::InvalidBody`] when `text` holds a character
    /// the encoding cannot represent.
    pub fn encode(&self, text: &str) -> EventSourceResult<Vec<u8>> {
        match self {
            Self::Utf8 | Self::Utf8Lossy => Ok(text.as_bytes().to_vec()),
            Self::Ascii => narrow(text, 0x7F, self.label()),
            Self::Latin1 => narrow(text, 0xFF, self.label()),
        }
    }
}

fn narrow(text: &str, max: u32, label: &str) -> EventSourceResult<Vec<u8>> {
    text.chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(b) if u32::from(b) <= max => Ok(b),
            _ => Err(EventSourceError::invalid_body(format!(
                "character {c:?} cannot be encoded as {label}"
            ))),
        })
        .collect()
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
