//! Debounced success/failure decision.
//!
//! The reporter is a pure function of the cycle outcome and the previous
//! failure streak. The streak is handed in and handed back so the caller
//! owns it; nothing here keeps state between cycles.

use stackbeat_core::Classification;

/// Number of consecutive failing cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrorStreak(u32);

impl ErrorStreak {
    pub const ZERO: ErrorStreak = ErrorStreak(0);

    pub fn new(count: u32) -> Self {
        Self(count)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    fn bump(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Whether this streak has reached `threshold`. Any threshold at or
    /// below zero is reached immediately.
    pub fn reached(self, threshold: i64) -> bool {
        i64::from(self.0) >= threshold
    }
}

impl std::fmt::Display for ErrorStreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// What one poll cycle observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub classification: Classification,
    /// Message of the inventory error, if the listing failed.
    pub fetch_error: Option<String>,
}

impl CycleOutcome {
    /// Listing succeeded.
    pub fn fetched(classification: Classification) -> Self {
        Self {
            classification,
            fetch_error: None,
        }
    }

    /// Listing failed; `classification` covers whatever was returned.
    pub fn fetch_failed(classification: Classification, error: impl Into<String>) -> Self {
        Self {
            classification,
            fetch_error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.fetch_error.is_none() && self.classification.all_running()
    }

    /// Newline-separated running services.
    pub fn success_payload(&self) -> String {
        join_lines(self.classification.running.iter())
    }

    /// Fetch error, then exited services, then unhealthy services, one per
    /// line. Empty segments are left out.
    pub fn failure_diagnostic(&self) -> String {
        let segments = [
            self.fetch_error.clone().unwrap_or_default(),
            join_lines(self.classification.exited.iter()),
            join_lines(self.classification.unhealthy.iter()),
        ];
        segments
            .iter()
            .map(|s| s.trim_matches('\n'))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn join_lines<'a>(names: impl Iterator<Item = &'a String>) -> String {
    names.map(String::as_str).collect::<Vec<_>>().join("\n")
}

/// Action the poll loop must take after a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Ping the success URL with this body.
    ReportSuccess(String),
    /// Ping the failure URL with this body.
    ReportFailure(String),
    /// Failing, but the streak is still below the threshold.
    Suppress,
}

/// Turns cycle outcomes into actions.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    error_threshold: i64,
}

impl Reporter {
    pub fn new(error_threshold: i64) -> Self {
        Self { error_threshold }
    }

    pub fn error_threshold(&self) -> i64 {
        self.error_threshold
    }

    /// Decide the action for one cycle and return the next streak.
    ///
    /// Healthy cycles reset the streak and always report success. Failing
    /// cycles extend the streak and report only once it reaches the
    /// threshold.
    pub fn evaluate(&self, outcome: &CycleOutcome, previous: ErrorStreak) -> (ErrorStreak, Action) {
        if outcome.is_healthy() {
            return (ErrorStreak::ZERO, Action::ReportSuccess(outcome.success_payload()));
        }

        let next = previous.bump();
        if next.reached(self.error_threshold) {
            (next, Action::ReportFailure(outcome.failure_diagnostic()))
        } else {
            (next, Action::Suppress)
        }
    }
}
