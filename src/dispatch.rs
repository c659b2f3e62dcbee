//! Process-wide sink registry and the `tracing` layer that feeds it.
//!
//! `tracing` has no notion of a removable sink table, so the crate owns one:
//! every captured record (from the tracing layer, the legacy-logging adapter,
//! or the panic hook) is broadcast to the sinks registered here. Sinks are
//! keyed by an opaque, monotonically increasing handle; liveness is always
//! checked by handle presence, never by callback identity.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::level::Severity;
use crate::record::CapturedRecord;

/// Opaque handle returned by [`Dispatch::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SinkId(u64);

pub type Sink = Arc<dyn Fn(&CapturedRecord) + Send + Sync>;

/// Invoked after every removal so interested parties can re-register.
type RemovalGuard = Arc<dyn Fn(&Dispatch) + Send + Sync>;

#[derive(Default)]
struct SinkTable {
    next_id: u64,
    sinks: BTreeMap<u64, Sink>,
}

/// The process-wide sink registry.
pub struct Dispatch {
    table: Mutex<SinkTable>,
    removal_guard: Mutex<Option<RemovalGuard>>,
}

/// Returns the process-wide registry, creating it on first use.
pub fn dispatch() -> &'static Dispatch {
    static DISPATCH: OnceLock<Dispatch> = OnceLock::new();
    DISPATCH.get_or_init(|| Dispatch {
        table: Mutex::new(SinkTable::default()),
        removal_guard: Mutex::new(None),
    })
}

impl Dispatch {
    /// Registers a sink and returns its handle.
    pub fn subscribe(&self, sink: Sink) -> SinkId {
        let mut table = self.table.lock().expect("sink table poisoned");
        let id = table.next_id;
        table.next_id += 1;
        table.sinks.insert(id, sink);
        SinkId(id)
    }

    /// Removes one sink by handle. The removal guard runs after the removal
    /// completes, whether or not the handle was present.
    pub fn remove(&self, id: SinkId) -> bool {
        let removed = {
            let mut table = self.table.lock().expect("sink table poisoned");
            table.sinks.remove(&id.0).is_some()
        };
        self.run_removal_guard();
        removed
    }

    /// Removes every registered sink, then runs the removal guard.
    pub fn remove_all(&self) {
        {
            let mut table = self.table.lock().expect("sink table poisoned");
            table.sinks.clear();
        }
        self.run_removal_guard();
    }

    pub fn contains(&self, id: SinkId) -> bool {
        let table = self.table.lock().expect("sink table poisoned");
        table.sinks.contains_key(&id.0)
    }

    pub fn sink_count(&self) -> usize {
        let table = self.table.lock().expect("sink table poisoned");
        table.sinks.len()
    }

    /// Delivers a record to every registered sink. Sinks are cloned out of
    /// the table first so a sink may subscribe or log without deadlocking.
    pub fn broadcast(&self, record: &CapturedRecord) {
        let sinks: Vec<Sink> = {
            let table = self.table.lock().expect("sink table poisoned");
            table.sinks.values().cloned().collect()
        };
        for sink in sinks {
            sink(record);
        }
    }

    /// Installs the process-wide removal guard. Only the first installation
    /// takes effect; later calls are ignored so the guard is never stacked.
    pub fn install_removal_guard<F>(&self, guard: F) -> bool
    where
        F: Fn(&Dispatch) + Send + Sync + 'static,
    {
        let mut slot = self.removal_guard.lock().expect("removal guard poisoned");
        if slot.is_some() {
            return false;
        }
        *slot = Some(Arc::new(guard));
        true
    }

    /// The guard is cloned out of its slot before it runs so it can log or
    /// touch the registry without holding the slot mutex.
    fn run_removal_guard(&self) {
        let guard = {
            let slot = self.removal_guard.lock().expect("removal guard poisoned");
            slot.clone()
        };
        if let Some(guard) = guard {
            guard(self);
        }
    }

    /// Drops all sinks and the removal guard. Test isolation only.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn reset(&self) {
        self.table.lock().expect("sink table poisoned").sinks.clear();
        *self.removal_guard.lock().expect("removal guard poisoned") = None;
    }
}

/// A `tracing_subscriber` layer that converts events into captured records
/// and broadcasts them to the registry.
#[derive(Debug, Default, Clone)]
pub struct BridgeLayer;

/// Convenience constructor for composing into a subscriber stack.
pub fn layer() -> BridgeLayer {
    BridgeLayer
}

impl<S: Subscriber> Layer<S> for BridgeLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let record = CapturedRecord::new(
            Severity::from_tracing(meta.level()),
            visitor.into_message(),
            meta.target(),
        )
        .with_location(meta.file(), meta.line());

        dispatch().broadcast(&record);
    }
}

/// Collects the `message` field plus any structured fields of an event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl EventVisitor {
    fn into_message(self) -> String {
        let mut message = self.message.unwrap_or_default();
        for (name, value) in self.fields {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(&name);
            message.push('=');
            message.push_str(&value);
        }
        message
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }
}
