//! Domain types shared by the classifier, reporter and inventory backends.
//!
//! Observations are transient: an inventory backend produces a fresh list
//! on every poll and the classifier folds it into a [`Classification`],
//! after which both are dropped.

use std::collections::BTreeSet;

/// Compose service name as found in the container's service label.
///
/// Case-sensitive. An absent label is represented as the empty string.
pub type ServiceName = String;

/// Status substring that marks a container as failing its healthcheck.
pub const UNHEALTHY_MARKER: &str = "unhealthy";

/// Runtime state reported for a live container.
pub const RUNNING_STATE: &str = "running";

// ── Observation ────────────────────────────────────────────────────

/// One container's snapshot at poll time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerObservation {
    pub service_name: ServiceName,
    /// Free-form runtime state, e.g. "running", "exited", "restarting".
    pub runtime_state: String,
    /// Free-form human status, e.g. "Up 3 minutes (unhealthy)".
    pub status_text: String,
}

impl ContainerObservation {
    pub fn new(
        service_name: impl Into<ServiceName>,
        runtime_state: impl Into<String>,
        status_text: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            runtime_state: runtime_state.into(),
            status_text: status_text.into(),
        }
    }

    /// The bucket this single container falls into.
    pub fn state(&self) -> ServiceState {
        ServiceState::of(&self.runtime_state, &self.status_text)
    }
}

// ── Classification ─────────────────────────────────────────────────

/// Health bucket of a service.
///
/// Variants are ordered by severity so that `max` picks the worst bucket
/// when several replicas of one service disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceState {
    Running,
    Exited,
    Unhealthy,
}

impl ServiceState {
    /// Total classification of a container.
    ///
    /// Precedence: an "unhealthy" status wins over any runtime state, then
    /// "running", and everything else counts as exited.
    pub fn of(runtime_state: &str, status_text: &str) -> Self {
        if status_text.contains(UNHEALTHY_MARKER) {
            ServiceState::Unhealthy
        } else if runtime_state == RUNNING_STATE {
            ServiceState::Running
        } else {
            ServiceState::Exited
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Running => "running",
            ServiceState::Exited => "exited",
            ServiceState::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Services of one poll partitioned into three disjoint buckets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub running: BTreeSet<ServiceName>,
    pub exited: BTreeSet<ServiceName>,
    pub unhealthy: BTreeSet<ServiceName>,
}

impl Classification {
    /// Place `name` in the bucket for `state`.
    ///
    /// If the name already sits in another bucket, it ends up in the more
    /// severe of the two.
    pub fn place(&mut self, name: ServiceName, state: ServiceState) {
        let state = match self.state_of(&name) {
            Some(current) if current >= state => return,
            Some(current) => {
                self.bucket_mut(current).remove(&name);
                state
            }
            None => state,
        };
        self.bucket_mut(state).insert(name);
    }

    /// Bucket currently holding `name`, if any.
    pub fn state_of(&self, name: &str) -> Option<ServiceState> {
        if self.unhealthy.contains(name) {
            Some(ServiceState::Unhealthy)
        } else if self.exited.contains(name) {
            Some(ServiceState::Exited)
        } else if self.running.contains(name) {
            Some(ServiceState::Running)
        } else {
            None
        }
    }

    fn bucket_mut(&mut self, state: ServiceState) -> &mut BTreeSet<ServiceName> {
        match state {
            ServiceState::Running => &mut self.running,
            ServiceState::Exited => &mut self.exited,
            ServiceState::Unhealthy => &mut self.unhealthy,
        }
    }

    /// Number of distinct services across all buckets.
    pub fn len(&self) -> usize {
        self.running.len() + self.exited.len() + self.unhealthy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when at least one service runs and none exited or is unhealthy.
    pub fn all_running(&self) -> bool {
        !self.running.is_empty() && self.exited.is_empty() && self.unhealthy.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unhealthy_status_wins_over_running_state() {
        assert_eq!(
            ServiceState::of("running", "Up 2 minutes (unhealthy)"),
            ServiceState::Unhealthy
        );
        assert_eq!(
            ServiceState::of("exited", "unhealthy"),
            ServiceState::Unhealthy
        );
    }

    #[test]
    fn running_state_is_running() {
        assert_eq!(
            ServiceState::of("running", "Up 5 seconds (healthy)"),
            ServiceState::Running
        );
    }

    #[test]
    fn other_states_count_as_exited() {
        for state in ["exited", "created", "restarting", "paused", "dead", ""] {
            assert_eq!(ServiceState::of(state, "Exited (0)"), ServiceState::Exited);
        }
    }

    #[test]
    fn runtime_state_match_is_exact() {
        assert_eq!(ServiceState::of("Running", "Up"), ServiceState::Exited);
    }

    #[test]
    fn place_keeps_most_severe_bucket() {
        let mut c = Classification::default();
        c.place("web".into(), ServiceState::Running);
        c.place("web".into(), ServiceState::Exited);
        c.place("web".into(), ServiceState::Running);

        assert_eq!(c.state_of("web"), Some(ServiceState::Exited));
        assert!(c.running.is_empty());
        assert_eq!(c.len(), 1);

        c.place("web".into(), ServiceState::Unhealthy);
        assert_eq!(c.state_of("web"), Some(ServiceState::Unhealthy));
        assert!(c.exited.is_empty());
    }

    #[test]
    fn all_running_requires_a_running_service() {
        let mut c = Classification::default();
        assert!(!c.all_running());

        c.place("web".into(), ServiceState::Running);
        assert!(c.all_running());

        c.place("db".into(), ServiceState::Exited);
        assert!(!c.all_running());
    }

    #[test]
    fn observation_state_uses_precedence() {
        let obs = ContainerObservation::new("db", "running", "Up 1 hour (unhealthy)");
        assert_eq!(obs.state(), ServiceState::Unhealthy);
        assert_eq!(obs.state().to_string(), "unhealthy");
    }
}
