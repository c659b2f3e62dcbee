//! Background flush loop with a cancellable wait.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::warn;

/// Bound on how long `stop` waits for the loop thread to exit.
const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

pub type FlushFn = Arc<dyn Fn() + Send + Sync>;

/// Owns the periodic flush thread.
///
/// The loop waits up to the flush interval on a channel so it can be
/// cancelled mid-wait: a timeout means the interval elapsed and the flush
/// callback fires; a message (or a dropped sender) means stop was requested
/// and the loop exits without a final flush.
pub struct FlushScheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    pub fn new() -> Self {
        Self {
            stop_tx: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Starts the flush loop, stopping any previous loop first so no stale
    /// timer keeps firing at an old interval.
    pub fn start(&mut self, interval: Duration, on_flush: FlushFn) -> io::Result<()> {
        self.stop();

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("lognotify-flush".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => on_flush(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Signals cancellation and waits (bounded) for the loop to terminate.
    /// No-op when not running; safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        let Some(handle) = self.handle.take() else {
            return;
        };

        let deadline = Instant::now() + JOIN_TIMEOUT;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("flush loop did not terminate within {:?}", JOIN_TIMEOUT);
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        if handle.join().is_err() {
            warn!("flush loop thread panicked");
        }
    }
}

impl Default for FlushScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_flush() -> (FlushFn, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let flush: FlushFn = Arc::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (flush, count)
    }

    #[test]
    fn fires_on_each_elapsed_interval() {
        let (flush, count) = counting_flush();
        let mut scheduler = FlushScheduler::new();
        scheduler.start(Duration::from_millis(20), flush).unwrap();

        thread::sleep(Duration::from_millis(110));
        scheduler.stop();

        let fired = count.load(Ordering::SeqCst);
        assert!(fired >= 2, "expected at least 2 flushes, got {fired}");
    }

    #[test]
    fn stop_cancels_the_wait_without_a_final_flush() {
        let (flush, count) = counting_flush();
        let mut scheduler = FlushScheduler::new();
        scheduler
            .start(Duration::from_secs(3600), flush)
            .unwrap();
        assert!(scheduler.is_running());

        scheduler.stop();
        assert!(!scheduler.is_running());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_is_idempotent_and_safe_when_not_running() {
        let mut scheduler = FlushScheduler::new();
        scheduler.stop();

        let (flush, _count) = counting_flush();
        scheduler.start(Duration::from_secs(60), flush).unwrap();
        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn restart_replaces_the_previous_loop() {
        let (slow_flush, slow_count) = counting_flush();
        let (fast_flush, fast_count) = counting_flush();
        let mut scheduler = FlushScheduler::new();

        scheduler.start(Duration::from_secs(3600), slow_flush).unwrap();
        scheduler.start(Duration::from_millis(20), fast_flush).unwrap();

        thread::sleep(Duration::from_millis(70));
        scheduler.stop();

        assert_eq!(slow_count.load(Ordering::SeqCst), 0);
        assert!(fast_count.load(Ordering::SeqCst) >= 1);
    }
}
