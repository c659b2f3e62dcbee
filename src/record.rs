//! The captured log record buffered between flushes.

use chrono::{DateTime, Utc};

use crate::level::Severity;

/// A log record captured from either logging front-end, normalized to the
/// fields the notification body needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRecord {
    pub severity: Severity,
    pub message: String,
    /// Module path or logger target the record was emitted under.
    pub target: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub timestamp: DateTime<Utc>,
    /// Extra detail attached to the record, e.g. a panic location and
    /// payload on the crash path.
    pub detail: Option<String>,
}

impl CapturedRecord {
    pub fn new(severity: Severity, message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            target: target.into(),
            file: None,
            line: None,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    pub fn with_location(mut self, file: Option<&str>, line: Option<u32>) -> Self {
        self.file = file.map(str::to_string);
        self.line = line;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Renders the record as one line of the notification body.
    pub fn render(&self) -> String {
        let origin = match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{}:{}", file, line),
            (Some(file), None) => file.clone(),
            _ => self.target.clone(),
        };
        let mut line = format!(
            "{} | {:<8} | {} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.severity.name(),
            origin,
            self.message,
        );
        if let Some(detail) = &self.detail {
            line.push('\n');
            line.push_str(detail);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::rank;

    #[test]
    fn render_includes_level_origin_and_message() {
        let record = CapturedRecord::new(
            Severity::from_name("ERROR").unwrap(),
            "disk full",
            "app::storage",
        )
        .with_location(Some("src/storage.rs"), Some(42));

        let line = record.render();
        assert!(line.contains("ERROR"));
        assert!(line.contains("src/storage.rs:42"));
        assert!(line.ends_with("disk full"));
    }

    #[test]
    fn render_falls_back_to_target_without_location() {
        let record = CapturedRecord::new(Severity::from_raw(rank::INFO), "hello", "app");
        assert!(record.render().contains(" app - hello"));
    }

    #[test]
    fn render_appends_detail_on_a_new_line() {
        let record = CapturedRecord::new(Severity::from_name("ERROR").unwrap(), "boom", "app")
            .with_detail("panicked at src/main.rs:7");
        let rendered = record.render();
        let mut lines = rendered.lines();
        assert!(lines.next().unwrap().ends_with("boom"));
        assert_eq!(lines.next().unwrap(), "panicked at src/main.rs:7");
    }
}
