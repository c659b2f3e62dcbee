//! The notifier: accumulates records above the trigger level and flushes
//! them as one batched notification, periodically or on the crash path.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tracing::{debug, warn};

use super::channel::{DeliveryError, NotifyFormat, NotifyType};
use super::dispatcher::Dispatcher;
use crate::config::{ConfigError, NotifierConfig};
use crate::dispatch::{dispatch, Dispatch, Sink, SinkId};
use crate::formatting::format_body;
use crate::level::LevelSpec;
use crate::panic_hook;
use crate::record::CapturedRecord;
use crate::scheduler::FlushScheduler;

/// State shared between the accumulator sink, the flush thread, the panic
/// hook, and the owning [`Notifier`].
pub(crate) struct NotifierShared {
    buffer: Mutex<Vec<CapturedRecord>>,
    trigger_rank: AtomicI64,
    dispatcher: Mutex<Dispatcher>,
    title: String,
}

impl NotifierShared {
    /// Appends the record iff its rank meets the trigger level. This is the
    /// only path by which records enter the buffer.
    fn accumulate(&self, record: &CapturedRecord) {
        if record.severity.rank() >= self.trigger_rank.load(Ordering::SeqCst) {
            self.buffer
                .lock()
                .expect("buffer poisoned")
                .push(record.clone());
        }
    }

    /// Formats the buffer into one body and submits it. The buffer is
    /// drained only on confirmed success; on rejection or transport error
    /// the records stay queued for the next trigger.
    ///
    /// Tracing events emitted here re-enter `accumulate` through the bridge
    /// layer, so no event may fire while the buffer mutex is held.
    pub(crate) fn deliver(&self) {
        let snapshot = {
            let buffer = self.buffer.lock().expect("buffer poisoned");
            if buffer.is_empty() {
                None
            } else {
                Some((format_body(&buffer), buffer.len()))
            }
        };
        let (body, pending) = match snapshot {
            Some(snapshot) => snapshot,
            None => {
                debug!("no buffered records to deliver");
                return;
            }
        };

        let outcome = {
            let dispatcher = self.dispatcher.lock().expect("dispatcher poisoned");
            dispatcher.submit(&self.title, &body, NotifyType::Warning, NotifyFormat::Text)
        };

        match outcome {
            Ok(true) => {
                let drained = {
                    let mut buffer = self.buffer.lock().expect("buffer poisoned");
                    // Records appended during the submission stay queued.
                    let drained = pending.min(buffer.len());
                    buffer.drain(..drained);
                    drained
                };
                debug!(records = drained, "notification delivered");
            }
            Ok(false) => {
                warn!(records = pending, "delivery rejected; keeping buffered records");
            }
            Err(e) => {
                warn!(error = %e, records = pending, "failed to send notification");
            }
        }
    }
}

/// Process-wide bookkeeping for the accumulator subscription. One record of
/// the last-known sink handle is shared by all notifier instances so re-
/// registration after a bulk removal never produces a second accumulator.
#[derive(Default)]
struct AccumulatorRegistry {
    sink_id: Option<SinkId>,
    sink: Option<Sink>,
}

fn accumulator_registry() -> &'static Mutex<AccumulatorRegistry> {
    static REGISTRY: OnceLock<Mutex<AccumulatorRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(AccumulatorRegistry::default()))
}

/// Re-registers the accumulator when a removal wiped its subscription.
/// Installed once per process; runs after every removal event.
fn removal_guard(dispatch: &Dispatch) {
    // The debug event below feeds back into the sink registry, so it must
    // fire only after the registry lock is released.
    let reinstalled = {
        let mut registry = accumulator_registry()
            .lock()
            .expect("accumulator registry poisoned");
        let still_live = registry
            .sink_id
            .map(|id| dispatch.contains(id))
            .unwrap_or(false);
        if still_live {
            None
        } else {
            registry.sink.clone().map(|sink| {
                let id = dispatch.subscribe(sink);
                registry.sink_id = Some(id);
                id
            })
        }
    };
    if let Some(id) = reinstalled {
        debug!(?id, "re-registered accumulator after sink removal");
    }
}

/// Buffers log records above a severity threshold and delivers them as one
/// batched notification: periodically, on an uncaught panic, on demand, and
/// on drop.
pub struct Notifier {
    shared: Arc<NotifierShared>,
    scheduler: FlushScheduler,
    flush_interval: f64,
}

impl Notifier {
    /// Builds a notifier from the given configuration and wires it into the
    /// process: destination discovery, the accumulator subscription, the
    /// panic hook, and the periodic flush loop.
    pub fn new(config: NotifierConfig) -> Result<Self, ConfigError> {
        let trigger_rank = LevelSpec::from(config.trigger_level.clone()).resolve()?;
        if !config.flush_interval_seconds.is_finite() || config.flush_interval_seconds <= 0.0 {
            return Err(ConfigError::InvalidInterval(config.flush_interval_seconds));
        }

        let mut dispatcher = Dispatcher::new(Duration::from_secs(config.request_timeout_seconds));
        if config.load_default_config {
            dispatcher.load_default_config_paths(config.recursion_depth);
        }
        for path in &config.config_paths {
            if let Err(e) = dispatcher.load_config_file(path, config.recursion_depth) {
                warn!(path = %path.display(), error = %e, "failed to load destination config");
            }
        }
        for url in &config.urls {
            if let Err(e) = dispatcher.add_url(url) {
                warn!(url, error = %e, "skipping configured destination");
            }
        }

        let shared = Arc::new(NotifierShared {
            buffer: Mutex::new(Vec::new()),
            trigger_rank: AtomicI64::new(trigger_rank),
            dispatcher: Mutex::new(dispatcher),
            title: config.title.clone(),
        });

        Self::register_accumulator(&shared);

        let flush_target = shared.clone();
        panic_hook::install(
            Arc::new(move || flush_target.deliver()),
            config.chain_panic_hook,
        );

        let mut scheduler = FlushScheduler::new();
        let on_flush = shared.clone();
        scheduler.start(
            Duration::from_secs_f64(config.flush_interval_seconds),
            Arc::new(move || on_flush.deliver()),
        )?;

        Ok(Self {
            shared,
            scheduler,
            flush_interval: config.flush_interval_seconds,
        })
    }

    /// Convenience constructor with the default configuration.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(NotifierConfig::default())
    }

    /// Subscribes this instance's accumulate callback and records its
    /// handle in the shared registry, replacing the previous instance's
    /// entry. The removal guard is installed on first use only.
    fn register_accumulator(shared: &Arc<NotifierShared>) {
        let sink_target = shared.clone();
        let sink: Sink = Arc::new(move |record| sink_target.accumulate(record));

        let mut registry = accumulator_registry()
            .lock()
            .expect("accumulator registry poisoned");
        let id = dispatch().subscribe(sink.clone());
        registry.sink_id = Some(id);
        registry.sink = Some(sink);
        drop(registry);

        dispatch().install_removal_guard(removal_guard);
    }

    /// Adds a destination URL.
    pub fn add(&self, url: &str) -> Result<(), DeliveryError> {
        let mut dispatcher = self.shared.dispatcher.lock().expect("dispatcher poisoned");
        dispatcher.add_url(url)
    }

    /// Adds a custom delivery channel.
    pub fn add_channel(&self, channel: Box<dyn super::channel::DeliveryChannel>) {
        let mut dispatcher = self.shared.dispatcher.lock().expect("dispatcher poisoned");
        dispatcher.add_channel(channel);
    }

    /// Current trigger level as a numeric rank.
    pub fn trigger_level(&self) -> i64 {
        self.shared.trigger_rank.load(Ordering::SeqCst)
    }

    /// Sets the trigger level from a rank, a level name, or a severity.
    /// An unrecognized name is a configuration error; the level is left
    /// unchanged.
    pub fn set_trigger_level(&self, level: impl Into<LevelSpec>) -> Result<(), ConfigError> {
        let rank = level.into().resolve()?;
        self.shared.trigger_rank.store(rank, Ordering::SeqCst);
        Ok(())
    }

    pub fn flush_interval(&self) -> f64 {
        self.flush_interval
    }

    /// Changes the flush period. The running loop is stopped and restarted
    /// so the new period takes effect on the next wait cycle; a
    /// non-positive or non-finite value is rejected and the old loop keeps
    /// running untouched.
    pub fn set_flush_interval(&mut self, seconds: f64) -> Result<(), ConfigError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(ConfigError::InvalidInterval(seconds));
        }
        if self.flush_interval == seconds {
            return Ok(());
        }
        self.flush_interval = seconds;
        let on_flush = self.shared.clone();
        self.scheduler.start(
            Duration::from_secs_f64(seconds),
            Arc::new(move || on_flush.deliver()),
        )?;
        Ok(())
    }

    /// Forces an immediate delivery of the buffered records.
    pub fn deliver(&self) {
        self.shared.deliver();
    }

    /// Stops the periodic flush loop. Idempotent.
    pub fn stop_periodic_flush(&mut self) {
        self.scheduler.stop();
    }

    /// Stops the flush loop and sends any pending records, unless the
    /// crash path already delivered them.
    pub fn cleanup(&mut self) {
        self.scheduler.stop();
        if !panic_hook::exiting_via_panic() {
            self.shared.deliver();
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.shared.buffer.lock().expect("buffer poisoned").len()
    }

    /// Message text of every buffered record, in insertion order.
    pub fn buffered_messages(&self) -> Vec<String> {
        self.shared
            .buffer
            .lock()
            .expect("buffer poisoned")
            .iter()
            .map(|record| record.message.clone())
            .collect()
    }

    /// Drops all buffered records without delivering them. Test isolation
    /// only.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn clear_buffer(&self) {
        self.shared.buffer.lock().expect("buffer poisoned").clear();
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.cleanup();
    }
}
