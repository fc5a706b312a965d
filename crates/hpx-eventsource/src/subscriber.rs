//! Callback contract between the connection controller and the application.

use tracing::warn;

use crate::{
    error::EventSourceError, parse::field::EventField, status::ConnectionStatus,
    transport::ResponseHead,
};

/// Receiver of everything a connection produces.
///
/// Callbacks are plain side effects and run synchronously on whatever task
/// delivers the transport's chunks, so they should return quickly. Ordering
/// per connection:
///
/// - `Connecting` comes before any other callback.
/// - Frames arrive in chunk order; within a frame, `on_raw_frame` comes first,
///   then one `on_event` per recognized field in line order.
/// - The terminal status (`Closed` or `Failed`) is the last callback.
///
/// Calling [`EventSource::disconnect`](crate::EventSource::disconnect) from
/// inside a callback is allowed.
pub trait Subscriber: Send + Sync + 'static {
    /// Called for every status transition.
    fn on_status(&self, status: &ConnectionStatus);

    /// Called once per assembled frame, before field parsing.
    fn on_raw_frame(&self, text: &str);

    /// Called once per recognized field within a frame.
    fn on_event(&self, field: &EventField);

    /// Called once the transport has produced the response.
    ///
    /// Receives `Err(NotHttpResponse)` when the transport delivered a body
    /// without HTTP metadata. Not terminal.
    ///
    /// Default implementation does nothing.
    fn on_response(&self, _response: Result<&ResponseHead, &EventSourceError>) {}

    /// Called for recoverable problems, such as a frame that cannot be decoded.
    ///
    /// The stream continues afterwards. Default implementation logs a warning.
    fn on_diagnostic(&self, error: &EventSourceError) {
        warn!(error = %error, "SSE diagnostic");
    }
}
