//! Transport seam between the connection controller and an HTTP client.
//!
//! The controller only needs an ordered stream of body chunks that ends
//! exactly once, either cleanly or with an error. [`ReqwestTransport`] is the
//! default implementation; tests and embedders can plug in their own.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream::BoxStream};
use http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::{
    config::ClientConfig,
    error::{EventSourceError, EventSourceResult},
    request::PreparedRequest,
};

/// Ordered response body chunks. An `Err` item ends the stream.
pub type ByteStream = BoxStream<'static, EventSourceResult<Bytes>>;

/// Status line and headers of the HTTP response.
#[derive(Clone, Debug)]
pub struct ResponseHead {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Create a response head.
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    /// The `Content-Type` header, if present and readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// What a transport hands back once the request has been sent.
pub struct TransportResponse {
    /// The HTTP response head; `None` if the transport has none to offer.
    pub head: Option<ResponseHead>,
    /// The response body.
    pub body: ByteStream,
}

impl TransportResponse {
    /// A response with an HTTP head.
    pub fn new(head: ResponseHead, body: ByteStream) -> Self {
        Self {
            head: Some(head),
            body,
        }
    }

    /// A bare body without HTTP metadata.
    pub fn body_only(body: ByteStream) -> Self {
        Self { head: None, body }
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Streaming HTTP client used by [`EventSource`](crate::EventSource).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send the request and return the response head and body stream.
    ///
    /// Errors returned here, or yielded by the body stream, become
    /// [`ConnectionStatus::Failed`](crate::ConnectionStatus::Failed).
    async fn open(&self, request: PreparedRequest) -> EventSourceResult<TransportResponse>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::Config`] if the configuration is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> EventSourceResult<Self> {
        config.validate().map_err(EventSourceError::config)?;

        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let client = builder
            .build()
            .map_err(|e| EventSourceError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, request: PreparedRequest) -> EventSourceResult<TransportResponse> {
        let PreparedRequest {
            method,
            url,
            headers,
            body,
            ..
        } = request;

        debug!(%method, %url, "Sending SSE request");
        let mut req = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let head = ResponseHead::new(resp.status(), resp.headers().clone());
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(EventSourceError::from))
            .boxed();

        Ok(TransportResponse::new(head, body))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_response_head_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            "text/event-stream; charset=utf-8".parse().expect("valid header value"),
        );
        let head = ResponseHead::new(StatusCode::OK, headers);
        assert_eq!(head.content_type(), Some("text/event-stream; charset=utf-8"));

        let head = ResponseHead::new(StatusCode::OK, HeaderMap::new());
        assert_eq!(head.content_type(), None);
    }

    #[test]
    fn test_reqwest_transport_rejects_invalid_config() {
        let err = ReqwestTransport::new(ClientConfig::default().connect_timeout(Duration::ZERO))
            .expect_err("zero timeout");
        assert!(matches!(err, EventSourceError::Config { .. }));
    }

    #[test]
    fn test_body_only_has_no_head() {
        let response = TransportResponse::body_only(futures_util::stream::empty().boxed());
        assert!(response.head.is_none());
    }
}
