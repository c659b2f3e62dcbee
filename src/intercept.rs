//! Legacy-logging adapter: forwards `log` crate records into the capture
//! pipeline, with caller attribution and a re-entrancy guard.

use std::cell::Cell;

use log::{LevelFilter, Metadata, Record};

use crate::dispatch::dispatch;
use crate::level::{log_rank, Severity};
use crate::record::CapturedRecord;

/// This module's own source path, as reported in record locations.
const SELF_FILE: &str = file!();

/// Path markers for IDE-injected helper code.
const IDE_MARKERS: &[&str] = &["jetbrains/intellij"];

/// Decides whether a source path belongs to infrastructure code that should
/// not be reported as the caller of a forwarded record: this adapter itself,
/// IDE-injected code, dynamic-eval pseudo-files, or the legacy logging
/// facility's own sources.
pub fn should_ignore(path: &str) -> bool {
    let normalized = path.replace('\\', "/").to_ascii_lowercase();
    if normalized.ends_with(SELF_FILE) {
        return true;
    }
    if IDE_MARKERS.iter().any(|marker| normalized.contains(marker)) {
        return true;
    }
    // Pseudo-files from dynamic evaluation have bracketed names.
    if normalized.starts_with('<') && normalized.ends_with('>') {
        return true;
    }
    // The `log` crate's own sources live under the cargo registry.
    normalized.contains("/registry/src/") && normalized.contains("/log-")
}

/// Walks caller frames outward and counts how many leading frames belong to
/// infrastructure. The first non-ignored frame is the true call site.
pub fn caller_depth<'a, I>(frames: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    frames.into_iter().take_while(|f| should_ignore(f)).count()
}

thread_local! {
    // Set while a record is being forwarded, so a sink that re-enters the
    // legacy facility does not loop the same record back through us.
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

struct ForwardingGuard;

impl ForwardingGuard {
    fn acquire() -> Option<Self> {
        FORWARDING.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(ForwardingGuard)
            }
        })
    }
}

impl Drop for ForwardingGuard {
    fn drop(&mut self) {
        FORWARDING.with(|flag| flag.set(false));
    }
}

/// A `log::Log` implementation that forwards every record into the capture
/// pipeline.
pub struct InterceptLogger;

static INTERCEPT_LOGGER: InterceptLogger = InterceptLogger;

/// Installs the adapter as the global `log` logger.
///
/// Fails if another global logger is already installed; the adapter is
/// opt-in because a library must not displace the host's logger silently.
pub fn install_log_bridge() -> Result<(), log::SetLoggerError> {
    log::set_logger(&INTERCEPT_LOGGER)?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}

impl InterceptLogger {
    /// Builds the captured record for a legacy record. Split out so the
    /// conversion is testable without installing the global logger.
    fn capture(record: &Record<'_>) -> CapturedRecord {
        // Resolve the level name, falling back to the raw numeric rank when
        // the name is not in the canonical table.
        let severity = Severity::from_name(record.level().as_str())
            .unwrap_or_else(|| Severity::from_raw(log_rank(record.level())));

        // Attribute the record to the first frame that is not
        // infrastructure. The legacy record carries one frame of location
        // metadata; when that frame is ignored the origin degrades to the
        // record's target.
        let frames = record.file().into_iter();
        let skipped = caller_depth(frames);
        let (file, line) = if skipped == 0 {
            (record.file(), record.line())
        } else {
            (None, None)
        };

        CapturedRecord::new(
            severity,
            record.args().to_string(),
            record.target().to_string(),
        )
        .with_location(file, line)
    }
}

impl log::Log for InterceptLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        // A record already being forwarded on this thread looped back
        // through the legacy facility; handling it again would recurse.
        let Some(_guard) = ForwardingGuard::acquire() else {
            return;
        };

        let captured = Self::capture(record);
        dispatch().broadcast(&captured);
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_adapter_module_is_ignored() {
        assert!(should_ignore(SELF_FILE));
        assert!(should_ignore("/home/user/project/src/intercept.rs"));
    }

    #[test]
    fn ide_injected_code_is_ignored() {
        assert!(should_ignore("/opt/JetBrains/IntelliJ/helpers/pydev.rs"));
    }

    #[test]
    fn dynamic_eval_pseudo_files_are_ignored() {
        assert!(should_ignore("<anon>"));
        assert!(should_ignore("<string>"));
    }

    #[test]
    fn legacy_facility_sources_are_ignored() {
        assert!(should_ignore(
            "/home/user/.cargo/registry/src/index.crates.io-1949cf8c6b5b557f/log-0.4.22/src/lib.rs"
        ));
    }

    #[test]
    fn application_sources_are_not_ignored() {
        assert!(!should_ignore("/home/user/project/src/main.rs"));
        assert!(!should_ignore("src/storage.rs"));
    }

    #[test]
    fn caller_depth_counts_leading_infrastructure_frames() {
        let frames = [SELF_FILE, "<string>", "src/main.rs", SELF_FILE];
        assert_eq!(caller_depth(frames), 2);
        assert_eq!(caller_depth(["src/main.rs"]), 0);
    }

    #[test]
    fn capture_preserves_call_site_attribution() {
        // Built and captured in one statement: `format_args!` borrows do
        // not outlive it.
        let captured = InterceptLogger::capture(
            &Record::builder()
                .args(format_args!("connection lost"))
                .level(log::Level::Error)
                .target("app::net")
                .file(Some("src/net.rs"))
                .line(Some(12))
                .build(),
        );
        assert_eq!(captured.severity.name(), "ERROR");
        assert_eq!(captured.message, "connection lost");
        assert_eq!(captured.target, "app::net");
        assert_eq!(captured.file.as_deref(), Some("src/net.rs"));
        assert_eq!(captured.line, Some(12));
    }

    #[test]
    fn capture_drops_infrastructure_attribution() {
        let captured = InterceptLogger::capture(
            &Record::builder()
                .args(format_args!("forwarded"))
                .level(log::Level::Warn)
                .target("app")
                .file(Some("<string>"))
                .line(Some(1))
                .build(),
        );
        assert_eq!(captured.file, None);
        assert_eq!(captured.line, None);
    }

    #[test]
    fn forwarding_guard_blocks_re_entry() {
        let outer = ForwardingGuard::acquire();
        assert!(outer.is_some());
        assert!(ForwardingGuard::acquire().is_none());
        drop(outer);
        assert!(ForwardingGuard::acquire().is_some());
    }
}
