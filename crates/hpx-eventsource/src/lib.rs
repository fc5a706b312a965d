//! # hpx-eventsource
//!
//! Server-Sent Events client: an incremental `text/event-stream` parser and a
//! connection controller that reports to a callback subscriber.
//!
//! ## Features
//!
//! - **Chunk-agnostic parsing**: frames are assembled from raw bytes, so line
//!   terminators and multi-byte characters may be split anywhere.
//! - **Per-field callbacks**: every `id`, `event`, `retry`, `data` or custom
//!   field reaches the [`Subscriber`] as it is parsed, with the raw frame first.
//! - **Session tracking**: last event ID and retry interval, readable at any
//!   time for caller-driven reconnects.
//! - **Safe teardown**: no callback fires after [`EventSource::disconnect`]
//!   returns, even with chunks still in flight.
//! - **Pluggable transport**: `reqwest` by default, any [`Transport`] otherwise.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hpx_eventsource::{
//!     ConnectionStatus, ConnectRequest, EventField, EventSource, Subscriber,
//! };
//!
//! struct Printer;
//!
//! impl Subscriber for Printer {
//!     fn on_status(&self, status: &ConnectionStatus) {
//!         println!("status: {status}");
//!     }
//!
//!     fn on_raw_frame(&self, text: &str) {
//!         println!("frame: {text:?}");
//!     }
//!
//!     fn on_event(&self, field: &EventField) {
//!         println!("{} = {}", field.keyword, field.value);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = EventSource::new()?;
//!     let request = ConnectRequest::new("http://localhost:8080/sse")
//!         .query("topic", Some("prices"));
//!     source.connect(request, Arc::new(Printer))?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     source.disconnect();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod decoder;
pub mod encoding;
pub mod error;
pub mod handlers;
pub mod parse;
pub mod request;
pub mod session;
pub mod status;
pub mod subscriber;
pub mod transport;

// Re-export commonly used types
pub use config::ClientConfig;
pub use connection::EventSource;
pub use decoder::StreamDecoder;
pub use encoding::TextEncoding;
pub use error::{EventSourceError, EventSourceResult};
pub use handlers::{ChannelSubscriber, Notification, NotificationStream};
pub use parse::{Event, EventField, EventStream, EventStreamError, Keyword};
pub use request::{ConnectRequest, ContentType, PreparedRequest, RequestBody};
pub use session::SessionState;
pub use status::{ConnectionState, ConnectionStatus};
pub use subscriber::Subscriber;
pub use transport::{ByteStream, ReqwestTransport, ResponseHead, Transport, TransportResponse};
