//! Connection diagnostics.
//!
//! Every HTTP exchange made through an [`ApiContext`](crate::ApiContext) is
//! recorded here. Callers group exchanges into scenarios with
//! [`ConnectionDiagnostics::record_connection_details`], usually through the
//! [`DiagnosticsScope`] guard so a report is written on every exit path,
//! panics included.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};

/// One request/response pair as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecord {
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
    pub debug_id: Option<String>,
    pub elapsed: Duration,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl ExchangeRecord {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|status| (200..300).contains(&status))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario: String,
    pub failed: bool,
    pub exchanges: Vec<ExchangeRecord>,
}

/// Exchanges kept while no scenario claims them. Oldest are dropped first.
pub const DEFAULT_MAX_PENDING: usize = 256;
/// Scenario reports kept for inspection. Oldest are dropped first.
pub const DEFAULT_MAX_REPORTS: usize = 64;

#[derive(Debug)]
struct DiagnosticsState {
    pending: VecDeque<ExchangeRecord>,
    reports: VecDeque<ScenarioReport>,
    max_pending: usize,
    max_reports: usize,
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, limit: usize) {
    if limit == 0 {
        return;
    }
    while queue.len() >= limit {
        queue.pop_front();
    }
    queue.push_back(item);
}

#[derive(Debug, Clone)]
pub struct ConnectionDiagnostics {
    state: Arc<Mutex<DiagnosticsState>>,
}

impl Default for ConnectionDiagnostics {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_PENDING, DEFAULT_MAX_REPORTS)
    }
}

impl ConnectionDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics keeping at most `max_pending` unclaimed exchanges and
    /// `max_reports` reports.
    pub fn with_limits(max_pending: usize, max_reports: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(DiagnosticsState {
                pending: VecDeque::new(),
                reports: VecDeque::new(),
                max_pending,
                max_reports,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DiagnosticsState> {
        // A panic while holding the lock must not lose the records.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_exchange(&self, record: ExchangeRecord) {
        log::debug!(
            "{} {} -> {:?} in {:?}",
            record.method,
            record.url,
            record.status,
            record.elapsed
        );
        let mut state = self.lock();
        let limit = state.max_pending;
        push_bounded(&mut state.pending, record, limit);
    }

    /// Most recent exchange not yet assigned to a scenario.
    pub fn last_exchange(&self) -> Option<ExchangeRecord> {
        self.lock().pending.back().cloned()
    }

    pub fn pending(&self) -> Vec<ExchangeRecord> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Moves the pending exchanges into a report for `scenario` and logs it.
    pub fn record_connection_details(&self, scenario: &str, failed: bool) -> ScenarioReport {
        let mut state = self.lock();
        let report = ScenarioReport {
            scenario: scenario.to_string(),
            failed,
            exchanges: state.pending.drain(..).collect(),
        };

        let outcome = if failed { "failed" } else { "passed" };
        info!(
            "Scenario '{}' {} after {} exchange(s)",
            scenario,
            outcome,
            report.exchanges.len()
        );
        for exchange in &report.exchanges {
            match &exchange.error {
                Some(error) => warn!(
                    "  {} {} failed after {:?}: {}",
                    exchange.method, exchange.url, exchange.elapsed, error
                ),
                None => info!(
                    "  {} {} -> {} in {:?} debug_id={}",
                    exchange.method,
                    exchange.url,
                    exchange.status.map(|s| s.to_string()).unwrap_or_default(),
                    exchange.elapsed,
                    exchange.debug_id.as_deref().unwrap_or("-")
                ),
            }
        }

        let limit = state.max_reports;
        push_bounded(&mut state.reports, report.clone(), limit);
        report
    }

    pub fn reports(&self) -> Vec<ScenarioReport> {
        self.lock().reports.iter().cloned().collect()
    }

    pub fn report(&self, scenario: &str) -> Option<ScenarioReport> {
        self.lock()
            .reports
            .iter()
            .rev()
            .find(|report| report.scenario == scenario)
            .cloned()
    }

    /// Guard that records the scenario when dropped.
    pub fn scope(&self, scenario: impl Into<String>) -> DiagnosticsScope {
        DiagnosticsScope {
            diagnostics: self.clone(),
            scenario: scenario.into(),
            failed: false,
        }
    }
}

/// Records connection details for a scenario on drop. The scenario is marked
/// failed if [`DiagnosticsScope::mark_failed`] was called or the thread is
/// unwinding.
#[derive(Debug)]
pub struct DiagnosticsScope {
    diagnostics: ConnectionDiagnostics,
    scenario: String,
    failed: bool,
}

impl DiagnosticsScope {
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }
}

impl Drop for DiagnosticsScope {
    fn drop(&mut self) {
        let failed = self.failed || std::thread::panicking();
        self.diagnostics
            .record_connection_details(&self.scenario, failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn exchange(status: Option<u16>, error: Option<&str>) -> ExchangeRecord {
        ExchangeRecord {
            method: "GET".to_string(),
            url: "http://localhost/v1/payments/billing-plans/P-1".to_string(),
            status,
            debug_id: None,
            elapsed: Duration::from_millis(5),
            error: error.map(str::to_string),
            at: Utc::now(),
        }
    }

    #[test]
    fn storage_is_bounded() {
        let diagnostics = ConnectionDiagnostics::with_limits(3, 2);
        for status in 200..210 {
            diagnostics.record_exchange(exchange(Some(status), None));
        }
        let pending = diagnostics.pending();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].status, Some(207));
        assert_eq!(diagnostics.last_exchange().and_then(|e| e.status), Some(209));

        for name in ["first", "second", "third"] {
            diagnostics.record_connection_details(name, false);
        }
        let names: Vec<_> = diagnostics
            .reports()
            .into_iter()
            .map(|report| report.scenario)
            .collect();
        assert_eq!(names, vec!["second", "third"]);
        assert!(diagnostics.report("first").is_none());
    }

    #[test]
    fn report_drains_pending_exchanges() {
        let diagnostics = ConnectionDiagnostics::new();
        diagnostics.record_exchange(exchange(Some(200), None));
        diagnostics.record_exchange(exchange(Some(404), None));
        assert_eq!(diagnostics.last_exchange().and_then(|e| e.status), Some(404));

        let report = diagnostics.record_connection_details("get", false);
        assert_eq!(report.exchanges.len(), 2);
        assert!(diagnostics.pending().is_empty());
        assert_eq!(diagnostics.reports().len(), 1);
    }

    #[test]
    fn scope_records_on_normal_exit() {
        let diagnostics = ConnectionDiagnostics::new();
        {
            let _scope = diagnostics.scope("create");
            diagnostics.record_exchange(exchange(Some(201), None));
        }
        let report = diagnostics.report("create").expect("report");
        assert!(!report.failed);
        assert_eq!(report.exchanges.len(), 1);
        assert!(report.exchanges[0].is_success());
    }

    #[test]
    fn scope_records_on_panic() {
        let diagnostics = ConnectionDiagnostics::new();
        let cloned = diagnostics.clone();
        let result = catch_unwind(AssertUnwindSafe(move || {
            let _scope = cloned.scope("exploding");
            cloned.record_exchange(exchange(None, Some("connection refused")));
            panic!("assertion failed");
        }));

        assert!(result.is_err());
        let report = diagnostics.report("exploding").expect("report written");
        assert!(report.failed);
        assert!(!report.exchanges[0].is_success());
    }

    #[test]
    fn scope_can_be_marked_failed() {
        let diagnostics = ConnectionDiagnostics::new();
        {
            let mut scope = diagnostics.scope("rejected");
            assert_eq!(scope.scenario(), "rejected");
            scope.mark_failed();
        }
        assert!(diagnostics.report("rejected").unwrap().failed);
    }
}
