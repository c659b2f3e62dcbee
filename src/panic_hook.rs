//! Uncaught-panic interception.
//!
//! Rust's panic hook is process-wide and fires for panics on any thread, so
//! one installation point covers both the main thread and worker threads.
//! The hook state is a single process-wide registry: installing from a
//! second notifier instance rebinds the delivery target instead of nesting
//! another wrapper, so N instances still produce exactly one delivery per
//! panic.

use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use crate::dispatch::dispatch;
use crate::level::Severity;
use crate::record::CapturedRecord;

/// Set once the crash path has run, so exit cleanup does not send a second,
/// redundant delivery.
static CRASH_EXIT: AtomicBool = AtomicBool::new(false);

pub fn exiting_via_panic() -> bool {
    CRASH_EXIT.load(Ordering::SeqCst)
}

#[cfg(any(test, feature = "test-utils"))]
pub fn reset_crash_flag() {
    CRASH_EXIT.store(false, Ordering::SeqCst);
}

type PriorHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

/// Origin classification for the hook found installed before ours.
///
/// A closure carries no module identity in Rust, so the hook captured at
/// first install is classified `Default` unless the caller asked for
/// chaining; a `User` hook is always re-invoked, a `Default` one is skipped
/// because the panic has already been re-logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookOrigin {
    Default,
    User,
}

fn should_chain(origin: HookOrigin) -> bool {
    origin == HookOrigin::User
}

#[derive(Default)]
struct HookState {
    installed: bool,
    prior: Option<Arc<PriorHook>>,
    prior_origin: Option<HookOrigin>,
    /// Delivery target of the most recently constructed notifier.
    flush: Option<Arc<dyn Fn() + Send + Sync>>,
}

fn hook_state() -> &'static Mutex<HookState> {
    static STATE: OnceLock<Mutex<HookState>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(HookState::default()))
}

/// Installs the panic wrapper, or rebinds it to a new delivery target when a
/// previous notifier instance already installed it.
pub fn install(flush: Arc<dyn Fn() + Send + Sync>, chain_prior: bool) {
    let mut state = hook_state().lock().expect("hook state poisoned");
    state.flush = Some(flush);

    if state.installed {
        // Another instance's wrapper is live; binding to the hook beneath
        // it is already recorded, so nothing else to do.
        return;
    }

    let prior = panic::take_hook();
    state.prior = Some(Arc::new(prior));
    state.prior_origin = Some(if chain_prior {
        HookOrigin::User
    } else {
        HookOrigin::Default
    });
    state.installed = true;
    drop(state);

    panic::set_hook(Box::new(handle_panic));
}

fn handle_panic(info: &PanicHookInfo<'_>) {
    let (flush, prior, prior_origin) = {
        let state = hook_state().lock().expect("hook state poisoned");
        (
            state.flush.clone(),
            state.prior.clone(),
            state.prior_origin,
        )
    };

    let current = thread::current();
    let thread_name = current.name().unwrap_or("<unnamed>");
    let payload = payload_message(info);
    let location = info
        .location()
        .map(|loc| format!("panicked at {}:{}:{}", loc.file(), loc.line(), loc.column()));

    let mut record = CapturedRecord::new(
        Severity::from_name("ERROR").unwrap_or_else(|| Severity::from_raw(crate::level::rank::ERROR)),
        format!("Uncaught panic in thread {thread_name}: {payload}"),
        "lognotify::panic_hook",
    );
    if let Some(loc) = info.location() {
        record = record.with_location(Some(loc.file()), Some(loc.line()));
    }
    if let Some(detail) = location {
        record = record.with_detail(detail);
    }
    dispatch().broadcast(&record);

    CRASH_EXIT.store(true, Ordering::SeqCst);

    if let Some(flush) = flush {
        flush();
    }

    if let (Some(prior), Some(origin)) = (prior, prior_origin) {
        if should_chain(origin) {
            (**prior)(info);
        }
    }
}

fn payload_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
