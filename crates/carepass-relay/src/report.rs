//! Bounded in-memory log of client telemetry reports.
//!
//! Reports are process-local diagnostics, not part of the persisted
//! collections; a relay restart starts the log empty.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

use carepass_core::clock::SharedClock;
use carepass_core::code::{CodePrefix, ShareCode};
use carepass_core::payload::TelemetryReport;

/// Number of reports retained before the oldest is dropped.
pub const REPORT_CAPACITY: usize = 256;

/// A received report with its relay-assigned envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedReport {
    /// Relay-assigned `REP-` identifier.
    pub id: ShareCode,
    /// When the relay received the report (milliseconds since epoch).
    pub received_at: i64,
    /// The report as submitted.
    pub report: TelemetryReport,
}

/// Fixed-capacity report buffer. Oldest entries fall off first.
pub struct ReportLog {
    clock: SharedClock,
    capacity: usize,
    entries: Mutex<VecDeque<ReceivedReport>>,
}

impl ReportLog {
    pub fn new(clock: SharedClock, capacity: usize) -> Self {
        Self {
            clock,
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Record a report and hand back its assigned identifier.
    pub fn submit(&self, report: TelemetryReport) -> ShareCode {
        let id = ShareCode::generate(CodePrefix::Report);
        tracing::info!(
            id = %id,
            kind = ?report.kind,
            severity = report.severity.as_str(),
            "received new client report"
        );

        let received = ReceivedReport {
            id: id.clone(),
            received_at: self.clock.now_millis(),
            report,
        };

        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(received);
        id
    }

    /// Retained reports, newest first.
    pub fn recent(&self) -> Vec<ReceivedReport> {
        self.entries.lock().unwrap().iter().rev().cloned().collect()
    }

    /// Number of retained reports.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use carepass_core::clock::ManualClock;
    use carepass_core::payload::{ReportKind, ReportSeverity};

    fn report(message: &str) -> TelemetryReport {
        TelemetryReport {
            kind: ReportKind::Manual,
            severity: ReportSeverity::Medium,
            message: message.to_string(),
            detail: None,
            client: "test".to_string(),
            reported_at: "2024-03-18T09:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_submit_assigns_rep_code_and_stamp() {
        let clock = ManualClock::new(42_000);
        let log = ReportLog::new(clock.shared(), 8);

        let id = log.submit(report("sync failed"));
        assert!(id.as_str().starts_with("REP-"));

        let recent = log.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, id);
        assert_eq!(recent[0].received_at, 42_000);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let clock = ManualClock::new(0);
        let log = ReportLog::new(clock.shared(), 8);

        log.submit(report("first"));
        clock.advance(10);
        log.submit(report("second"));

        let recent = log.recent();
        assert_eq!(recent[0].report.message, "second");
        assert_eq!(recent[1].report.message, "first");
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let clock = ManualClock::new(0);
        let log = ReportLog::new(clock.shared(), 3);

        for i in 0..5 {
            log.submit(report(&format!("r{i}")));
        }

        let recent = log.recent();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].report.message, "r4");
        assert_eq!(recent[2].report.message, "r2");
    }
}
