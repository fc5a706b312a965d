//! Error handling for the event source client.

use thiserror::Error;

/// Boxed error produced by a [`Transport`](crate::transport::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main result type used throughout the crate.
pub type EventSourceResult<T> = Result<T, EventSourceError>;

/// Every failure the client can report.
///
/// Connection-wide errors are returned from
/// [`EventSource::connect`](crate::EventSource::connect) or surfaced as
/// [`ConnectionStatus::Failed`](crate::ConnectionStatus::Failed). Field-level
/// problems (an unparseable `id` or `retry`) never show up here.
#[derive(Error, Debug)]
pub enum EventSourceError {
    /// The URL string plus query parameters does not form a valid URL.
    #[error("Malformed URL {url:?}: {reason}")]
    MalformedUrl { url: String, reason: String },

    /// The transport failed while opening or streaming the response.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// A complete frame could not be decoded with the declared encoding.
    #[error("Decoding error ({encoding}): {reason}")]
    Decoding {
        encoding: &'static str,
        reason: String,
    },

    /// The transport produced a body without an HTTP response.
    #[error("Transport did not deliver an HTTP response")]
    NotHttpResponse,

    /// The server answered with a non-success status code.
    #[error("Unexpected HTTP status: {status}")]
    InvalidStatus { status: http::StatusCode },

    /// The server answered with something other than `text/event-stream`.
    #[error("Unexpected Content-Type: {content_type}")]
    InvalidContentType { content_type: String },

    /// A header name or value cannot be sent.
    #[error("Invalid header: {name}")]
    InvalidHeader { name: String },

    /// The request body could not be encoded.
    #[error("Invalid request body: {reason}")]
    InvalidBody { reason: String },

    /// JSON serialization of the request body failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl From<reqwest::Error> for EventSourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(Box::new(e))
    }
}

impl EventSourceError {
    /// Create a malformed URL error.
    pub fn malformed_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap any error as a transport failure.
    pub fn transport(error: impl Into<BoxError>) -> Self {
        Self::Transport(error.into())
    }

    /// Create a decoding error.
    pub fn decoding(encoding: &'static str, reason: impl Into<String>) -> Self {
        Self::Decoding {
            encoding,
            reason: reason.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(name: impl Into<String>) -> Self {
        Self::InvalidHeader { name: name.into() }
    }

    /// Create an invalid body error.
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::InvalidBody {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid status error.
    pub fn invalid_status(status: http::StatusCode) -> Self {
        Self::InvalidStatus { status }
    }

    /// Create an invalid content type error.
    pub fn invalid_content_type(content_type: impl Into<String>) -> Self {
        Self::InvalidContentType {
            content_type: content_type.into(),
        }
    }

    /// Returns `true` if this error ends the whole connection attempt.
    pub fn is_connection_fatal(&self) -> bool {
        !matches!(self, Self::Decoding { .. } | Self::NotHttpResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EventSourceError::config("missing runtime");
        assert!(matches!(err, EventSourceError::Config { .. }));

        let err = EventSourceError::malformed_url("ht!tp://", "relative URL without a base");
        assert!(matches!(err, EventSourceError::MalformedUrl { .. }));
        assert_eq!(
            err.to_string(),
            "Malformed URL \"ht!tp://\": relative URL without a base"
        );

        let err = EventSourceError::transport("connection reset");
        assert!(matches!(err, EventSourceError::Transport(_)));
        assert_eq!(err.to_string(), "Transport error: connection reset");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(EventSourceError::transport("boom").is_connection_fatal());
        assert!(EventSourceError::invalid_status(http::StatusCode::FORBIDDEN).is_connection_fatal());
        assert!(!EventSourceError::decoding("utf-8", "bad byte").is_connection_fatal());
        assert!(!EventSourceError::NotHttpResponse.is_connection_fatal());
    }
}
