//! Ready-to-use [`Subscriber`](crate::Subscriber) implementations.
//!
//! - [`ChannelSubscriber`]: forwards every callback into a channel consumed as
//!   an async [`NotificationStream`].

mod channel;

pub use channel::{ChannelSubscriber, Notification, NotificationStream};
