//! SSE connection controller.
//!
//! [`EventSource`] issues the request, spawns a background task that drives
//! the response body through a [`StreamDecoder`], and reports everything to
//! the caller's [`Subscriber`].
//!
//! Every callback of one connection runs while holding that connection's
//! delivery lock and only if the connection has not terminated yet. The lock
//! is reentrant, so a subscriber may call [`EventSource::disconnect`] from
//! inside a callback; from any other thread `disconnect` waits for the
//! in-flight chunk to finish and nothing is delivered after it returns.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::StreamExt;
use parking_lot::{Mutex, ReentrantMutex};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    config::ClientConfig,
    decoder::StreamDecoder,
    error::{EventSourceError, EventSourceResult},
    parse::{constants::EVENT_STREAM_MIME, field::EventField},
    request::{ConnectRequest, PreparedRequest},
    session::SessionState,
    status::{ConnectionState, ConnectionStatus},
    subscriber::Subscriber,
    transport::{ReqwestTransport, ResponseHead, Transport},
};

// ---------------------------------------------------------------------------
// Public API: EventSource
// ---------------------------------------------------------------------------

/// Server-Sent Events client.
///
/// One `EventSource` drives at most one connection at a time. Calling
/// [`connect`](Self::connect) again first disconnects the previous
/// connection. Dropping the `EventSource` disconnects it as well.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use hpx_eventsource::{ChannelSubscriber, ConnectRequest, EventSource};
///
/// # async fn run() -> hpx_eventsource::EventSourceResult<()> {
/// let source = EventSource::new()?;
/// let (subscriber, mut notifications) = ChannelSubscriber::new();
/// source.connect(ConnectRequest::new("http://localhost:8080/sse"), Arc::new(subscriber))?;
///
/// while let Some(notification) = notifications.next_notification().await {
///     println!("{notification:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct EventSource<T: Transport = ReqwestTransport> {
    transport: Arc<T>,
    current: Mutex<Option<Arc<Link>>>,
}

impl EventSource<ReqwestTransport> {
    /// Create a client backed by `reqwest` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> EventSourceResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client backed by `reqwest` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: ClientConfig) -> EventSourceResult<Self> {
        Ok(Self::with_transport(ReqwestTransport::new(config)?))
    }
}

impl<T: Transport> EventSource<T> {
    /// Create a client over a custom transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            current: Mutex::new(None),
        }
    }

    /// The transport this client sends requests through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open a connection and deliver its events to `subscriber`.
    ///
    /// Returns once the request has been handed to a background task; the
    /// subscriber has already received `Connecting` at that point. Everything
    /// else arrives asynchronously.
    ///
    /// # Errors
    ///
    /// Returns an error, without any subscriber callback, if the request
    /// cannot be built (`MalformedUrl`, `InvalidHeader`, `InvalidBody`,
    /// `Config` for a bad custom keyword) or if no Tokio runtime is running.
    pub fn connect(
        &self,
        request: ConnectRequest,
        subscriber: Arc<dyn Subscriber>,
    ) -> EventSourceResult<()> {
        let runtime = Handle::try_current().map_err(|_| {
            EventSourceError::config("EventSource::connect requires a running Tokio runtime")
        })?;
        let prepared = request.prepare()?;

        self.disconnect();

        let link = Arc::new(Link::new(subscriber));
        // Published before `Connecting` so a disconnect from that callback finds it.
        *self.current.lock() = Some(Arc::clone(&link));

        let span = info_span!("sse", method = %prepared.method, url = %prepared.url);
        span.in_scope(|| info!("SSE connecting"));
        link.advance(ConnectionStatus::Connecting);
        if link.is_terminated() {
            span.in_scope(|| debug!("SSE connection closed before the request was sent"));
            return Ok(());
        }

        let task = runtime.spawn(
            drive(Arc::clone(&self.transport), Arc::clone(&link), prepared).instrument(span),
        );
        *link.task.lock() = Some(task);
        // A concurrent `close` that ran before the handle was stored cannot abort it.
        if link.is_terminated()
            && let Some(task) = link.task.lock().take()
        {
            task.abort();
        }
        Ok(())
    }

    /// Stop the current connection.
    ///
    /// Cancels the transport, emits a final `Closed` unless the connection has
    /// already terminated, and releases the subscriber. No callback fires
    /// after this returns. Calling it again, or with no connection, does
    /// nothing.
    pub fn disconnect(&self) {
        let link = self.current.lock().clone();
        if let Some(link) = link {
            link.close();
        }
    }

    /// State of the most recent connection, `Idle` if none was started.
    pub fn state(&self) -> ConnectionState {
        self.current
            .lock()
            .as_ref()
            .map_or(ConnectionState::Idle, |link| *link.state.lock())
    }

    /// Session state of the most recent connection.
    ///
    /// Stays readable after the connection terminates, so a subscriber can
    /// use `retry_interval` and `last_event_id` to reconnect. Returns the
    /// defaults before the first `connect`.
    pub fn session(&self) -> SessionState {
        self.current
            .lock()
            .as_ref()
            .map_or_else(SessionState::default, |link| *link.session.lock())
    }

    /// Returns `true` while the connection is receiving data.
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }
}

impl<T: Transport> Drop for EventSource<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<T: Transport> std::fmt::Debug for EventSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Internal: per-connection shared state
// ---------------------------------------------------------------------------

/// State shared between the controller and one connection's driver task.
struct Link {
    delivery: ReentrantMutex<()>,
    terminated: AtomicBool,
    subscriber: Mutex<Option<Arc<dyn Subscriber>>>,
    state: Mutex<ConnectionState>,
    session: Mutex<SessionState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Link {
    fn new(subscriber: Arc<dyn Subscriber>) -> Self {
        Self {
            delivery: ReentrantMutex::new(()),
            terminated: AtomicBool::new(false),
            subscriber: Mutex::new(Some(subscriber)),
            state: Mutex::new(ConnectionState::Idle),
            session: Mutex::new(SessionState::new()),
            task: Mutex::new(None),
        }
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Run `f` against the subscriber unless the connection has terminated.
    fn deliver(&self, f: impl FnOnce(&dyn Subscriber)) -> bool {
        let _guard = self.delivery.lock();
        if self.terminated.load(Ordering::Acquire) {
            return false;
        }
        let subscriber = self.subscriber.lock().clone();
        match subscriber {
            Some(subscriber) => {
                f(subscriber.as_ref());
                true
            }
            None => false,
        }
    }

    /// Move to the state of `status` and report it.
    ///
    /// A terminal status marks the link terminated and releases the
    /// subscriber before its final callback, so that callback is the last.
    fn advance(&self, status: ConnectionStatus) -> bool {
        let _guard = self.delivery.lock();
        if self.terminated.load(Ordering::Acquire) {
            return false;
        }
        {
            let mut state = self.state.lock();
            let next = status.state();
            if !state.can_transition_to(next) {
                debug!(from = ?*state, to = ?next, "Ignoring invalid state transition");
                return false;
            }
            *state = next;
        }

        if status.is_terminal() {
            self.terminated.store(true, Ordering::Release);
            let subscriber = self.subscriber.lock().take();
            if let Some(subscriber) = subscriber {
                subscriber.on_status(&status);
            }
        } else {
            let subscriber = self.subscriber.lock().clone();
            if let Some(subscriber) = subscriber {
                subscriber.on_status(&status);
            }
        }
        true
    }

    /// Feed one chunk through the decoder.
    ///
    /// Returns `false` if the connection terminated before the chunk could be
    /// delivered.
    fn receive(&self, decoder: &mut StreamDecoder, chunk: &[u8]) -> bool {
        let _guard = self.delivery.lock();
        if !self.advance(ConnectionStatus::Open) {
            return false;
        }
        decoder.feed(chunk, self);
        *self.session.lock() = decoder.session();
        true
    }

    /// Graceful end of stream: flush the pending frame, then `Closed`.
    fn complete(&self, decoder: &mut StreamDecoder) {
        let _guard = self.delivery.lock();
        if self.terminated.load(Ordering::Acquire) {
            return;
        }
        let flushed = decoder.finish(self);
        *self.session.lock() = decoder.session();
        if flushed > 0 {
            debug!(frames = flushed, "Flushed pending SSE frame at end of stream");
        }
        if self.advance(ConnectionStatus::Closed) {
            info!("SSE stream ended");
        }
    }

    fn fail(&self, err: EventSourceError) {
        if self.advance(ConnectionStatus::Failed(Arc::new(err))) {
            debug!("SSE connection marked failed");
        }
    }

    /// Explicit disconnect.
    ///
    /// Terminates before taking the task handle, so a handle stored after
    /// this point is aborted by `connect` instead.
    fn close(&self) {
        if self.advance(ConnectionStatus::Closed) {
            info!("SSE connection closed (requested)");
        }
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

/// Decoder output passes through the link so the terminated check applies to
/// every callback, including ones issued after a reentrant `disconnect`.
impl Subscriber for Link {
    fn on_status(&self, status: &ConnectionStatus) {
        self.deliver(|subscriber| subscriber.on_status(status));
    }

    fn on_raw_frame(&self, text: &str) {
        self.deliver(|subscriber| subscriber.on_raw_frame(text));
    }

    fn on_event(&self, field: &EventField) {
        self.deliver(|subscriber| subscriber.on_event(field));
    }

    fn on_response(&self, response: Result<&ResponseHead, &EventSourceError>) {
        self.deliver(|subscriber| subscriber.on_response(response));
    }

    fn on_diagnostic(&self, error: &EventSourceError) {
        self.deliver(|subscriber| subscriber.on_diagnostic(error));
    }
}

// ---------------------------------------------------------------------------
// Internal: background driver
// ---------------------------------------------------------------------------

/// Check the response head before any body byte is parsed.
fn validate_head(head: &ResponseHead) -> EventSourceResult<()> {
    if !head.status.is_success() {
        return Err(EventSourceError::invalid_status(head.status));
    }
    if let Some(content_type) = head.headers.get(http::header::CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or("");
        if !content_type.contains(EVENT_STREAM_MIME) {
            return Err(EventSourceError::invalid_content_type(content_type));
        }
    }
    Ok(())
}

/// The background task of one connection.
///
/// Opens the request, validates the response, then feeds body chunks to the
/// decoder until the stream ends, fails, or the connection is disconnected.
async fn drive<T: Transport>(transport: Arc<T>, link: Arc<Link>, request: PreparedRequest) {
    let mut decoder = StreamDecoder::new(request.keywords.clone(), request.encoding);

    let response = match transport.open(request).await {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "SSE connection failed");
            link.fail(err);
            return;
        }
    };

    match &response.head {
        Some(head) => {
            info!(status = %head.status, content_type = ?head.content_type(), "SSE response received");
            link.on_response(Ok(head));
            if let Err(err) = validate_head(head) {
                error!(error = %err, "SSE response rejected");
                link.fail(err);
                return;
            }
        }
        None => {
            warn!("SSE transport produced no HTTP response");
            link.on_response(Err(&EventSourceError::NotHttpResponse));
        }
    }

    let mut body = response.body;
    while let Some(item) = body.next().await {
        match item {
            Ok(chunk) if chunk.is_empty() => continue,
            Ok(chunk) => {
                if !link.receive(&mut decoder, &chunk) {
                    debug!(bytes = chunk.len(), "Dropping SSE chunk after disconnect");
                    return;
                }
            }
            Err(err) => {
                error!(error = %err, "SSE stream error");
                link.fail(err);
                return;
            }
        }
    }

    link.complete(&mut decoder);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tests::Recorder;

    #[test]
    fn test_connect_without_runtime_is_rejected() {
        let source = EventSource::with_transport(
            ReqwestTransport::new(ClientConfig::default()).expect("client"),
        );
        let recorder = Arc::new(Recorder::default());

        let err = source
            .connect(ConnectRequest::new("http://localhost/sse"), recorder.clone())
            .expect_err("no runtime");

        assert!(matches!(err, EventSourceError::Config { .. }));
        assert!(recorder.take().is_empty());
        assert_eq!(source.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_malformed_url_emits_nothing() {
        let source = EventSource::new().expect("client");
        let recorder = Arc::new(Recorder::default());

        let err = source
            .connect(ConnectRequest::new("ht!tp://"), recorder.clone())
            .expect_err("malformed");

        assert!(matches!(err, EventSourceError::MalformedUrl { .. }));
        assert!(recorder.take().is_empty());
        assert_eq!(source.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_link_terminal_status_is_last() {
        let recorder = Arc::new(Recorder::default());
        let link = Link::new(recorder.clone());

        assert!(link.advance(ConnectionStatus::Connecting));
        let mut decoder = StreamDecoder::default();
        assert!(link.receive(&mut decoder, b"data: a\n\n"));
        link.close();
        link.close();
        assert!(!link.receive(&mut decoder, b"data: b\n\n"));
        link.on_event(&EventField::new(
            crate::parse::field::Keyword::Data,
            "late",
            "data: late",
        ));

        assert_eq!(
            recorder.take(),
            [
                "status:connecting",
                "status:open",
                "raw:\"data: a\\n\\n\"",
                "data=a",
                "status:closed",
            ]
        );
        assert_eq!(*link.state.lock(), ConnectionState::Closed);
        assert!(link.subscriber.lock().is_none());
    }

    #[test]
    fn test_link_tracks_session() {
        let recorder = Arc::new(Recorder::default());
        let link = Link::new(recorder);
        link.advance(ConnectionStatus::Connecting);

        let mut decoder = StreamDecoder::default();
        link.receive(&mut decoder, b"id: 3939889\nretry: 2500\n\n");

        let session = *link.session.lock();
        assert_eq!(session.last_event_id(), Some(3939889));
        assert_eq!(session.retry_interval_millis(), 2500);
        assert_eq!(session, decoder.session());
    }

    #[test]
    fn test_session_includes_flushed_frame() {
        let recorder = Arc::new(Recorder::default());
        let link = Link::new(recorder);
        link.advance(ConnectionStatus::Connecting);

        let mut decoder = StreamDecoder::default();
        link.receive(&mut decoder, b"id: 1

id: 2");
        assert_eq!(link.session.lock().last_event_id(), Some(1));

        link.complete(&mut decoder);
        assert_eq!(link.session.lock().last_event_id(), Some(2));
        assert_eq!(*link.session.lock(), decoder.session());
    }

    #[test]
    fn test_close_while_connecting_terminates() {
        let recorder = Arc::new(Recorder::default());
        let link = Link::new(recorder.clone());
        link.advance(ConnectionStatus::Connecting);
        link.close();

        assert!(link.is_terminated());
        assert!(link.task.lock().is_none());
        assert_eq!(recorder.take(), ["status:connecting", "status:closed"]);
    }

    #[test]
    fn test_complete_flushes_then_closes() {
        let recorder = Arc::new(Recorder::default());
        let link = Link::new(recorder.clone());
        link.advance(ConnectionStatus::Connecting);

        let mut decoder = StreamDecoder::default();
        link.receive(&mut decoder, b"event: done\ndata: bye");
        link.complete(&mut decoder);

        let log = recorder.take();
        assert_eq!(&log[log.len() - 3..], ["event=done", "data=bye", "status:closed"]);
    }

    #[test]
    fn test_validate_head() {
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/event-stream; charset=utf-8"),
        );
        assert!(validate_head(&ResponseHead::new(http::StatusCode::OK, headers.clone())).is_ok());

        let err = validate_head(&ResponseHead::new(http::StatusCode::FORBIDDEN, headers))
            .expect_err("403");
        assert!(matches!(err, EventSourceError::InvalidStatus { .. }));

        let mut json = http::HeaderMap::new();
        json.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        let err = validate_head(&ResponseHead::new(http::StatusCode::OK, json)).expect_err("json");
        assert!(matches!(err, EventSourceError::InvalidContentType { .. }));

        assert!(validate_head(&ResponseHead::new(http::StatusCode::OK, http::HeaderMap::new())).is_ok());
    }
}
