// src/formatting.rs

use crate::record::CapturedRecord;

/// Joins the buffered records into the single notification body.
///
/// Carriage returns are stripped so the body has uniform line endings
/// regardless of where the records were produced.
pub fn format_body(records: &[CapturedRecord]) -> String {
    let lines: Vec<String> = records.iter().map(CapturedRecord::render).collect();
    lines.join("\n").replace('\r', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Severity;

    fn record(message: &str) -> CapturedRecord {
        CapturedRecord::new(Severity::from_name("ERROR").unwrap(), message, "test")
    }

    #[test]
    fn empty_buffer_formats_to_an_empty_body() {
        assert_eq!(format_body(&[]), "");
    }

    #[test]
    fn records_appear_in_insertion_order() {
        let body = format_body(&[record("first"), record("second")]);
        let first_pos = body.find("first").unwrap();
        let second_pos = body.find("second").unwrap();
        assert!(first_pos < second_pos);
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let body = format_body(&[record("line one\r\nline two")]);
        assert!(!body.contains('\r'));
        assert!(body.contains("line one\nline two"));
    }
}
