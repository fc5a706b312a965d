//! Channel-backed subscriber.
//!
//! Callbacks are synchronous, so [`ChannelSubscriber`] uses an unbounded
//! channel and never waits on the consumer. When the connection releases the
//! subscriber after its terminal status, the channel closes and the
//! [`NotificationStream`] ends.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::Stream;
use tokio::sync::mpsc;
use tracing::trace;

use crate::{
    error::EventSourceError, parse::field::EventField, status::ConnectionStatus,
    subscriber::Subscriber, transport::ResponseHead,
};

/// One subscriber callback, captured as a value.
#[derive(Clone, Debug)]
pub enum Notification {
    /// From [`Subscriber::on_status`].
    Status(ConnectionStatus),
    /// From [`Subscriber::on_raw_frame`].
    RawFrame(String),
    /// From [`Subscriber::on_event`].
    Event(EventField),
    /// From [`Subscriber::on_response`]; `None` when there was no HTTP response.
    Response(Option<ResponseHead>),
    /// From [`Subscriber::on_diagnostic`], rendered as text.
    Diagnostic(String),
}

impl Notification {
    /// The status, if this is a status notification.
    pub fn as_status(&self) -> Option<&ConnectionStatus> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }

    /// The field, if this is an event notification.
    pub fn as_event(&self) -> Option<&EventField> {
        match self {
            Self::Event(field) => Some(field),
            _ => None,
        }
    }

    /// Returns `true` for a `Closed` or `Failed` status.
    pub fn is_terminal(&self) -> bool {
        self.as_status().is_some_and(ConnectionStatus::is_terminal)
    }
}

/// Subscriber that forwards every callback into a channel.
#[derive(Clone, Debug)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSubscriber {
    /// Create a subscriber and the stream its notifications arrive on.
    #[must_use]
    pub fn new() -> (Self, NotificationStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, NotificationStream { rx })
    }

    fn send(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            trace!("Notification stream dropped, discarding callback");
        }
    }
}

impl Subscriber for ChannelSubscriber {
    fn on_status(&self, status: &ConnectionStatus) {
        self.send(Notification::Status(status.clone()));
    }

    fn on_raw_frame(&self, text: &str) {
        self.send(Notification::RawFrame(text.to_string()));
    }

    fn on_event(&self, field: &EventField) {
        self.send(Notification::Event(field.clone()));
    }

    fn on_response(&self, response: Result<&ResponseHead, &EventSourceError>) {
        self.send(Notification::Response(response.ok().cloned()));
    }

    fn on_diagnostic(&self, error: &EventSourceError) {
        self.send(Notification::Diagnostic(error.to_string()));
    }
}

/// Stream of [`Notification`]s from a [`ChannelSubscriber`].
///
/// Ends once the subscriber has been released and every notification has
/// been consumed.
#[derive(Debug)]
pub struct NotificationStream {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationStream {
    /// Receive the next notification, waiting until one is available.
    pub async fn next_notification(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Take the next notification if one is already queued.
    pub fn try_next_notification(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parse::field::Keyword;

    #[tokio::test]
    async fn test_forwards_callbacks_in_order() {
        let (subscriber, mut stream) = ChannelSubscriber::new();

        subscriber.on_status(&ConnectionStatus::Connecting);
        subscriber.on_raw_frame("data: x\n\n");
        subscriber.on_event(&EventField::new(Keyword::Data, "x", "data: x"));
        subscriber.on_response(Err(&EventSourceError::NotHttpResponse));
        subscriber.on_diagnostic(&EventSourceError::decoding("utf-8", "bad byte"));
        subscriber.on_status(&ConnectionStatus::Closed);
        drop(subscriber);

        assert!(matches!(
            stream.next_notification().await,
            Some(Notification::Status(ConnectionStatus::Connecting))
        ));
        assert!(matches!(
            stream.next_notification().await,
            Some(Notification::RawFrame(text)) if text == "data: x\n\n"
        ));
        let event = stream.next_notification().await.expect("event");
        assert_eq!(event.as_event().map(|f| f.value.as_str()), Some("x"));
        assert!(matches!(
            stream.next_notification().await,
            Some(Notification::Response(None))
        ));
        assert!(matches!(
            stream.next_notification().await,
            Some(Notification::Diagnostic(message)) if message.contains("bad byte")
        ));
        let closed = stream.next_notification().await.expect("closed");
        assert!(closed.is_terminal());
        assert!(stream.next_notification().await.is_none());
    }

    #[test]
    fn test_dropped_stream_is_harmless() {
        let (subscriber, stream) = ChannelSubscriber::new();
        drop(stream);
        let subscriber: Arc<dyn Subscriber> = Arc::new(subscriber);
        subscriber.on_status(&ConnectionStatus::Open);
    }

    #[test]
    fn test_try_next_notification() {
        let (subscriber, mut stream) = ChannelSubscriber::new();
        assert!(stream.try_next_notification().is_none());
        subscriber.on_status(&ConnectionStatus::Open);
        assert!(matches!(
            stream.try_next_notification(),
            Some(Notification::Status(ConnectionStatus::Open))
        ));
    }
}
