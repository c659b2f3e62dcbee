#![allow(dead_code)]
pub mod mock_channel;

use lognotify::{Notifier, NotifierConfig};
use mock_channel::MockChannel;

/// A notifier wired to a single mock channel, with default-path and panic
/// hook chaining disabled so tests stay deterministic.
pub fn test_notifier(trigger_level: &str, flush_interval_seconds: f64) -> (Notifier, MockChannel) {
    let config = NotifierConfig {
        trigger_level: trigger_level.to_string(),
        flush_interval_seconds,
        load_default_config: false,
        ..NotifierConfig::default()
    };
    let notifier = Notifier::new(config).expect("test notifier construction failed");
    let channel = MockChannel::new();
    notifier.add_channel(Box::new(channel.clone()));
    (notifier, channel)
}

/// Broadcasts a record straight into the capture pipeline, as either
/// logging front-end would.
pub fn emit(level: &str, message: &str) {
    let record = lognotify::CapturedRecord::new(
        lognotify::Severity::from_name(level).expect("unknown level in test"),
        message,
        "test",
    );
    lognotify::dispatch().broadcast(&record);
}
