//! Connection request description.
//!
//! [`ConnectRequest`] carries everything `connect` needs: method, URL, query
//! parameters, headers, body, content type, response encoding and the extra
//! keywords to recognize. Entries whose value is `None` are dropped, so
//! callers can pass optional values straight through.

use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use url::Url;

use crate::{
    encoding::TextEncoding,
    error::{EventSourceError, EventSourceResult},
    parse::{
        constants::EVENT_STREAM_MIME,
        field::{Keyword, validate_custom_keyword},
    },
};

/// `Content-Type` of the request body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    /// `text/plain`
    Plain,
    /// `text/html`
    Html,
    /// `text/xml`
    Xml,
    /// `application/json`
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`
    FormUrlEncoded,
    /// `multipart/form-data; boundary=...`
    FormData { boundary: String },
    /// `application/octet-stream`
    OctetStream,
    /// Any other media type, sent as given.
    Custom(String),
}

impl ContentType {
    /// The MIME string sent in the header.
    pub fn mime(&self) -> String {
        match self {
            Self::Plain => "text/plain".to_string(),
            Self::Html => "text/html".to_string(),
            Self::Xml => "text/xml".to_string(),
            Self::Json => "application/json".to_string(),
            Self::FormUrlEncoded => "application/x-www-form-urlencoded".to_string(),
            Self::FormData { boundary } => format!("multipart/form-data; boundary={boundary}"),
            Self::OctetStream => "application/octet-stream".to_string(),
            Self::Custom(value) => value.clone(),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime())
    }
}

/// Request body specification.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Raw bytes, sent as given.
    Bytes(Bytes),
    /// Text encoded with the given encoding.
    Text { text: String, encoding: TextEncoding },
    /// A JSON array or object.
    Json(serde_json::Value),
}

impl RequestBody {
    /// UTF-8 text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            encoding: TextEncoding::Utf8,
        }
    }

    /// JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::Serialization`] if `value` cannot be
    /// represented as JSON.
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> EventSourceResult<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Encode the body into the bytes sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::InvalidBody`] if text cannot be encoded or
    /// the JSON value is neither an array nor an object.
    pub fn to_bytes(&self) -> EventSourceResult<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Text { text, encoding } => encoding.encode(text).map(Bytes::from),
            Self::Json(value @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => {
                Ok(Bytes::from(serde_json::to_vec(value)?))
            }
            Self::Json(_) => Err(EventSourceError::invalid_body(
                "JSON body must be an array or an object",
            )),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Everything needed to open one event stream.
///
/// Follows the builder pattern: start from [`ConnectRequest::new`] (GET) or
/// [`ConnectRequest::post`] and chain setters.
#[derive(Clone, Debug)]
pub struct ConnectRequest {
    /// HTTP method.
    pub method: Method,
    /// Base URL string; may already carry a query.
    pub url: String,
    /// Query parameters appended after any existing query.
    pub query: Vec<(String, Option<String>)>,
    /// Extra request headers.
    pub headers: Vec<(String, Option<String>)>,
    /// Optional request body.
    pub body: Option<RequestBody>,
    /// `Content-Type` header value.
    pub content_type: ContentType,
    /// Encoding used to decode the response.
    pub encoding: TextEncoding,
    /// Keywords recognized in addition to `id`, `event`, `retry` and `data`.
    pub custom_keywords: Vec<String>,
    /// Sent as `Last-Event-ID` when set.
    pub last_event_id: Option<i64>,
}

impl ConnectRequest {
    /// A GET request for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            content_type: ContentType::default(),
            encoding: TextEncoding::default(),
            custom_keywords: Vec::new(),
            last_event_id: None,
        }
    }

    /// A POST request for `url`.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::POST)
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a query parameter; `None` values are dropped.
    #[must_use]
    pub fn query<V: Into<String>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.query.push((name.into(), value.map(Into::into)));
        self
    }

    /// Add several query parameters at once.
    #[must_use]
    pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.map(Into::into))));
        self
    }

    /// Add a request header; `None` values are dropped.
    #[must_use]
    pub fn header<V: Into<String>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.headers.push((name.into(), value.map(Into::into)));
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the `Content-Type` header.
    #[must_use]
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Set the encoding used to decode the response.
    #[must_use]
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Recognize an extra field keyword.
    #[must_use]
    pub fn custom_keyword(mut self, name: impl Into<String>) -> Self {
        self.custom_keywords.push(name.into());
        self
    }

    /// Send `Last-Event-ID` to resume after this id.
    #[must_use]
    pub fn last_event_id(mut self, id: i64) -> Self {
        self.last_event_id = Some(id);
        self
    }

    /// Build the final URL from the base string and the query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::MalformedUrl`] if the string does not parse
    /// as an absolute `http`/`https` URL.
    pub fn build_url(&self) -> EventSourceResult<Url> {
        let mut url =
            Url::parse(&self.url).map_err(|e| EventSourceError::malformed_url(&self.url, e))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(EventSourceError::malformed_url(
                &self.url,
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }

        let present: Vec<(&str, &str)> = self
            .query
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|value| (name.as_str(), value)))
            .collect();
        if !present.is_empty() {
            url.query_pairs_mut().extend_pairs(present);
        }

        Ok(url)
    }

    /// The keyword set the stream is matched against, standard ones first.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::Config`] for an invalid custom keyword.
    pub fn keywords(&self) -> EventSourceResult<Vec<Keyword>> {
        let mut keywords = Keyword::STANDARD.to_vec();
        for name in &self.custom_keywords {
            validate_custom_keyword(name).map_err(EventSourceError::config)?;
            let keyword = Keyword::Custom(name.clone());
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
        Ok(keywords)
    }

    /// Build the header map sent with the request.
    ///
    /// Caller headers come first; `Content-Type` and `Accept` are always set
    /// by the client and replace caller values.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::InvalidHeader`] for a name or value that
    /// cannot be sent.
    pub fn build_headers(&self) -> EventSourceResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let Some(value) = value else { continue };
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| EventSourceError::invalid_header(name))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| EventSourceError::invalid_header(name))?;
            headers.append(header_name, header_value);
        }

        let content_type = self.content_type.mime();
        let content_type_value = HeaderValue::from_str(&content_type)
            .map_err(|_| EventSourceError::invalid_header(header::CONTENT_TYPE.as_str()))?;
        headers.insert(header::CONTENT_TYPE, content_type_value);
        headers.insert(header::ACCEPT, HeaderValue::from_static(EVENT_STREAM_MIME));
        headers
            .entry(header::CACHE_CONTROL)
            .or_insert(HeaderValue::from_static("no-cache"));

        if let Some(id) = self.last_event_id {
            headers.insert(
                HeaderName::from_static("last-event-id"),
                HeaderValue::from(id),
            );
        }

        Ok(headers)
    }

    /// Validate every part of the request and resolve it for a transport.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: a malformed URL, an invalid header,
    /// an unencodable body or an invalid custom keyword.
    pub fn prepare(&self) -> EventSourceResult<PreparedRequest> {
        let url = self.build_url()?;
        let headers = self.build_headers()?;
        let body = self.body.as_ref().map(RequestBody::to_bytes).transpose()?;
        let keywords = self.keywords()?;

        Ok(PreparedRequest {
            method: self.method.clone(),
            url,
            headers,
            body,
            encoding: self.encoding,
            keywords,
        })
    }
}

/// A validated request, ready to hand to a
/// [`Transport`](crate::transport::Transport).
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: Method,
    /// Final URL including the query.
    pub url: Url,
    /// Headers including `Accept: text/event-stream`.
    pub headers: HeaderMap,
    /// Encoded body.
    pub body: Option<Bytes>,
    /// Response decoding.
    pub encoding: TextEncoding,
    /// Keywords to recognize.
    pub keywords: Vec<Keyword>,
}
