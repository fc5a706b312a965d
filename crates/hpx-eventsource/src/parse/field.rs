//! Field grammar for single SSE lines.
//!
//! ```text
//! field-line  := keyword ":" [" "] value LINE-END
//! blank-line  := LINE-END
//! ```
//!
//! Matching is anchored at the start of the line and done with plain prefix
//! checks. A line that matches no keyword is not an error, it is simply not a
//! field. Comment lines (leading `:`) never match, since no keyword is empty.

use std::{fmt, time::Duration};

use super::constants::{COLON, CR, LF};

/// The field type discriminator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `id: <event id>`
    Id,
    /// `event: <event type>`
    Event,
    /// `retry: <reconnection delay in milliseconds>`
    Retry,
    /// `data: <payload>`
    Data,
    /// A caller-requested keyword outside the standard four.
    Custom(String),
}

impl Keyword {
    /// The four keywords every connection recognizes, in matching order.
    pub const STANDARD: [Keyword; 4] = [Keyword::Id, Keyword::Event, Keyword::Retry, Keyword::Data];

    /// The prefix this keyword matches, without the separator.
    pub fn name(&self) -> &str {
        match self {
            Self::Id => "id",
            Self::Event => "event",
            Self::Retry => "retry",
            Self::Data => "data",
            Self::Custom(name) => name,
        }
    }

    /// Returns `true` for `id`, `event`, `retry` and `data`.
    pub fn is_standard(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// Map a field name onto a standard keyword, or a custom one.
    pub fn from_name(name: &str) -> Self {
        match name {
            "id" => Self::Id,
            "event" => Self::Event,
            "retry" => Self::Retry,
            "data" => Self::Data,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recognized `keyword: value` line from a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventField {
    /// Which keyword matched.
    pub keyword: Keyword,
    /// Text after the keyword prefix and separator.
    pub value: String,
    /// The source line with its terminator removed.
    pub raw_line: String,
}

impl EventField {
    /// Build a field from its parts.
    pub fn new(keyword: Keyword, value: impl Into<String>, raw_line: impl Into<String>) -> Self {
        Self {
            keyword,
            value: value.into(),
            raw_line: raw_line.into(),
        }
    }

    /// The value as an event id, if this is an `id` field holding an integer.
    pub fn as_id(&self) -> Option<i64> {
        match self.keyword {
            Keyword::Id => self.value.parse().ok(),
            _ => None,
        }
    }

    /// The value as a reconnection delay, if this is a valid `retry` field.
    pub fn as_retry(&self) -> Option<Duration> {
        match self.keyword {
            Keyword::Retry => self.value.parse().ok().map(Duration::from_millis),
            _ => None,
        }
    }
}

/// How a single line reads, independent of any keyword set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// An empty line: the frame delimiter.
    Blank,
    /// A line starting with `:`.
    Comment,
    /// `name: value` with the separator handled.
    Field { name: &'a str, value: &'a str },
    /// Text without a separator.
    Unrecognized,
}

/// Strip the record's terminating `\n` / `\r\n` / `\r` characters.
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches([LF as char, CR as char])
}

/// Drop the single optional space that follows the separator.
fn strip_value_space(value: &str) -> &str {
    value.strip_prefix(' ').unwrap_or(value)
}

/// Extract the value of `keyword` from `line`.
///
/// Returns `None` when the line does not start with `"<keyword>:"`. An empty
/// value yields `Some("")`, never `None`.
pub fn parse_field<'a>(line: &'a str, keyword: &Keyword) -> Option<&'a str> {
    let line = trim_line_end(line);
    let rest = line.strip_prefix(keyword.name())?;
    let value = rest.strip_prefix(COLON)?;
    Some(strip_value_space(value))
}

/// Match `line` against `keywords` in order and build the first hit.
pub fn match_field(line: &str, keywords: &[Keyword]) -> Option<EventField> {
    let raw_line = trim_line_end(line);
    keywords.iter().find_map(|keyword| {
        parse_field(raw_line, keyword)
            .map(|value| EventField::new(keyword.clone(), value, raw_line))
    })
}

/// Classify a line without reference to a keyword set.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = trim_line_end(line);
    if line.is_empty() {
        return LineKind::Blank;
    }
    match line.split_once(COLON) {
        Some(("", _)) => LineKind::Comment,
        Some((name, value)) => LineKind::Field {
            name,
            value: strip_value_space(value),
        },
        None => LineKind::Unrecognized,
    }
}

/// Check that `name` can be used as a custom keyword.
///
/// # Errors
///
/// Returns a message when the name is empty, contains the separator or line
/// terminators, or shadows a standard keyword.
pub fn validate_custom_keyword(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Custom keyword cannot be empty".to_string());
    }
    if name.contains([COLON, LF as char, CR as char]) {
        return Err(format!("Custom keyword {name:?} contains a reserved character"));
    }
    if Keyword::from_name(name).is_standard() {
        return Err(format!("Custom keyword {name:?} duplicates a standard keyword"));
    }
    Ok(())
}
