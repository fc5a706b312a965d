//! Per-connection protocol memory.

use std::time::Duration;

use tracing::debug;

use crate::parse::{
    constants::DEFAULT_RETRY_MILLIS,
    field::{EventField, Keyword},
};

/// Last event id and reconnection delay of one connection attempt.
///
/// A fresh value is created for every `connect`; nothing is shared across
/// connections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionState {
    last_event_id: Option<i64>,
    retry_interval_millis: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            last_event_id: None,
            retry_interval_millis: DEFAULT_RETRY_MILLIS,
        }
    }
}

impl SessionState {
    /// Create the state a new connection starts with.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent integer `id:` value received, if any.
    pub fn last_event_id(&self) -> Option<i64> {
        self.last_event_id
    }

    /// The reconnection delay advertised by the server, in milliseconds.
    pub fn retry_interval_millis(&self) -> u64 {
        self.retry_interval_millis
    }

    /// The reconnection delay advertised by the server.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_millis)
    }

    /// Fold a parsed field into the state.
    ///
    /// Only `id` and `retry` fields matter. A value that does not parse as an
    /// integer leaves the previous value in place.
    pub fn apply(&mut self, field: &EventField) {
        match field.keyword {
            Keyword::Id => match field.value.parse::<i64>() {
                Ok(id) => self.last_event_id = Some(id),
                Err(_) => debug!(value = %field.value, "Ignoring non-integer event id"),
            },
            Keyword::Retry => match field.value.parse::<u64>() {
                Ok(millis) => self.retry_interval_millis = millis,
                Err(_) => debug!(value = %field.value, "Ignoring invalid retry interval"),
            },
            _ => {}
        }
    }

    /// Return to the state of a fresh connection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(keyword: Keyword, value: &str) -> EventField {
        EventField::new(keyword.clone(), value, format!("{keyword}: {value}"))
    }

    #[test]
    fn test_defaults() {
        let state = SessionState::new();
        assert_eq!(state.last_event_id(), None);
        assert_eq!(state.retry_interval_millis(), 3000);
        assert_eq!(state.retry_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_id_updates() {
        let mut state = SessionState::new();
        state.apply(&field(Keyword::Id, "42"));
        assert_eq!(state.last_event_id(), Some(42));
        state.apply(&field(Keyword::Id, "28825252"));
        assert_eq!(state.last_event_id(), Some(28825252));
    }

    #[test]
    fn test_bad_id_retains_previous() {
        let mut state = SessionState::new();
        state.apply(&field(Keyword::Id, "7"));
        state.apply(&field(Keyword::Id, "evt-8"));
        state.apply(&field(Keyword::Id, ""));
        assert_eq!(state.last_event_id(), Some(7));
    }

    #[test]
    fn test_bad_retry_retains_previous() {
        let mut state = SessionState::new();
        state.apply(&field(Keyword::Retry, "abc"));
        assert_eq!(state.retry_interval_millis(), 3000);

        state.apply(&field(Keyword::Retry, "2500"));
        state.apply(&field(Keyword::Retry, "-1"));
        state.apply(&field(Keyword::Retry, " 100"));
        assert_eq!(state.retry_interval_millis(), 2500);
    }

    #[test]
    fn test_other_fields_ignored() {
        let mut state = SessionState::new();
        state.apply(&field(Keyword::Data, "42"));
        state.apply(&field(Keyword::Event, "42"));
        state.apply(&field(Keyword::Custom("id2".to_string()), "42"));
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_reset() {
        let mut state = SessionState::new();
        state.apply(&field(Keyword::Id, "1"));
        state.apply(&field(Keyword::Retry, "10"));
        state.reset();
        assert_eq!(state, SessionState::default());
    }
}
