//! SSE Client Example
//!
//! Connects to an SSE endpoint, prints every callback, and reconnects on
//! failure after the server's advertised retry interval.
//!
//! Run with: `cargo run -p hpx-eventsource --example sse_client -- http://localhost:8080/sse`
//!
//! Set `RUST_LOG=hpx_eventsource=debug` to see connection logs.

use std::{sync::Arc, time::Duration};

use hpx_eventsource::{
    ChannelSubscriber, ClientConfig, ConnectRequest, ConnectionStatus, EventSource, Notification,
};
use tracing_subscriber::EnvFilter;

const MAX_ATTEMPTS: u32 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080/sse".to_string());

    let source = EventSource::with_config(
        ClientConfig::new().connect_timeout(Duration::from_secs(5)),
    )?;

    for attempt in 1..=MAX_ATTEMPTS {
        let mut request = ConnectRequest::new(url.as_str()).custom_keyword("usage");
        if let Some(id) = source.session().last_event_id() {
            request = request.last_event_id(id);
        }

        let (subscriber, mut notifications) = ChannelSubscriber::new();
        source.connect(request, Arc::new(subscriber))?;

        let mut failed = false;
        while let Some(notification) = notifications.next_notification().await {
            match notification {
                Notification::Status(ConnectionStatus::Failed(err)) => {
                    println!("[status] failed: {err}");
                    failed = true;
                }
                Notification::Status(status) => println!("[status] {status}"),
                Notification::Response(Some(head)) => println!("[response] {}", head.status),
                Notification::Response(None) => println!("[response] not an HTTP response"),
                Notification::RawFrame(text) => println!("[frame] {text:?}"),
                Notification::Event(field) => println!("[{}] {}", field.keyword, field.value),
                Notification::Diagnostic(message) => println!("[diagnostic] {message}"),
            }
        }

        if !failed {
            break;
        }
        let delay = source.session().retry_interval();
        println!("attempt {attempt} failed, retrying in {delay:?}");
        tokio::time::sleep(delay).await;
    }

    Ok(())
}
