//! Accumulation and delivery of batched notifications.
//!
//! The manager owns the buffer and the flush lifecycle; the dispatcher fans
//! a submission out to the configured channels; the channels are thin
//! webhook transports behind one trait, so tests and embedders can plug in
//! their own.
pub mod channel;
pub mod dispatcher;
pub mod manager;
pub mod webhook;

pub use channel::{DeliveryChannel, DeliveryError, NotifyFormat, NotifyType};
pub use dispatcher::Dispatcher;
pub use manager::Notifier;
pub use webhook::{SlackChannel, WebhookChannel};
