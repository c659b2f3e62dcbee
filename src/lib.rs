//! lognotify - a log-accumulation-and-notification bridge.
//!
//! Records from `tracing` (via [`layer`]) or the legacy `log` facade (via
//! [`install_log_bridge`]) flow into a process-wide sink registry. A
//! [`Notifier`] subscribes an accumulator that buffers every record at or
//! above its trigger level, and flushes the buffer as one batched
//! notification: periodically, on an uncaught panic, on demand, or on drop.
//! Delivery failures keep the buffer for the next attempt, so batches are
//! delivered at least once.
//!
//! ```no_run
//! use tracing_subscriber::prelude::*;
//!
//! # fn main() -> Result<(), lognotify::ConfigError> {
//! tracing_subscriber::registry().with(lognotify::layer()).init();
//!
//! let notifier = lognotify::Notifier::with_defaults()?;
//! notifier.add("https://example.com/notify").ok();
//!
//! tracing::error!("this record is buffered and delivered on the next flush");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod formatting;
pub mod intercept;
pub mod level;
pub mod notification;
pub mod panic_hook;
pub mod record;
pub mod scheduler;

pub use config::{ConfigError, NotifierConfig};
pub use dispatch::{dispatch, layer, BridgeLayer, SinkId};
pub use intercept::{install_log_bridge, InterceptLogger};
pub use level::{LevelSpec, Severity};
pub use notification::{
    DeliveryChannel, DeliveryError, Dispatcher, Notifier, NotifyFormat, NotifyType,
};
pub use record::CapturedRecord;
