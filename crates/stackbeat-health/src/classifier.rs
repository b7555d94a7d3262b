//! Partition observed containers into running, exited and unhealthy.

use stackbeat_core::{Classification, ContainerObservation, IgnoreSet};

/// Classify one poll's observations.
///
/// Ignored services are skipped entirely. An empty list is valid and yields
/// an empty classification. Replicas of the same service that disagree are
/// merged into the most severe bucket.
pub fn classify(observations: &[ContainerObservation], ignore: &IgnoreSet) -> Classification {
    let mut result = Classification::default();
    for obs in observations {
        if ignore.contains(&obs.service_name) {
            continue;
        }
        result.place(obs.service_name.clone(), obs.state());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackbeat_core::ServiceState;
    use std::collections::BTreeSet;

    fn obs(name: &str, state: &str, status: &str) -> ContainerObservation {
        ContainerObservation::new(name, state, status)
    }

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    fn sample() -> Vec<ContainerObservation> {
        vec![
            obs("web", "running", "Up 3 minutes (healthy)"),
            obs("worker", "running", "Up 3 minutes"),
            obs("db", "running", "Up 3 minutes (unhealthy)"),
            obs("migrate", "exited", "Exited (0) 2 minutes ago"),
            obs("cache", "restarting", "Restarting (1) 5 seconds ago"),
            obs("sidecar", "running", "Up 1 minute (unhealthy)"),
        ]
    }

    #[test]
    fn empty_inventory_is_empty_classification() {
        let result = classify(&[], &IgnoreSet::default());
        assert!(result.is_empty());
        assert!(!result.all_running());
    }

    #[test]
    fn buckets_follow_precedence() {
        let result = classify(&sample(), &IgnoreSet::default());
        assert_eq!(result.running, names(&["web", "worker"]));
        assert_eq!(result.exited, names(&["cache", "migrate"]));
        assert_eq!(result.unhealthy, names(&["db", "sidecar"]));
    }

    #[test]
    fn ignored_services_never_appear() {
        let ignore = IgnoreSet::parse("sidecar, migrate; web");
        let result = classify(&sample(), &ignore);
        for name in ignore.iter() {
            assert_eq!(result.state_of(name), None, "{name} leaked");
        }
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn buckets_are_disjoint_and_cover_all_non_ignored() {
        let ignore = IgnoreSet::parse("cache");
        let observations = sample();
        let result = classify(&observations, &ignore);

        assert!(result.running.is_disjoint(&result.exited));
        assert!(result.running.is_disjoint(&result.unhealthy));
        assert!(result.exited.is_disjoint(&result.unhealthy));

        let expected: BTreeSet<String> = observations
            .iter()
            .map(|o| o.service_name.clone())
            .filter(|n| !ignore.contains(n))
            .collect();
        let union: BTreeSet<String> = result
            .running
            .iter()
            .chain(&result.exited)
            .chain(&result.unhealthy)
            .cloned()
            .collect();
        assert_eq!(union, expected);
    }

    #[test]
    fn unhealthy_status_wins_regardless_of_state() {
        for state in ["running", "exited", "paused", ""] {
            let result = classify(&[obs("db", state, "x (unhealthy)")], &IgnoreSet::default());
            assert_eq!(result.state_of("db"), Some(ServiceState::Unhealthy), "{state}");
        }
    }

    #[test]
    fn ignored_unhealthy_sidecar_leaves_healthy_project() {
        let observations = vec![
            obs("web", "running", "Up 10 seconds"),
            obs("sidecar", "running", "Up 10 seconds (unhealthy)"),
        ];
        let result = classify(&observations, &IgnoreSet::parse("sidecar"));
        assert_eq!(result.running, names(&["web"]));
        assert!(result.unhealthy.is_empty());
        assert!(result.exited.is_empty());
        assert!(result.all_running());
    }

    #[test]
    fn blank_service_name_is_classified() {
        let result = classify(&[obs("", "exited", "Exited (1)")], &IgnoreSet::default());
        assert_eq!(result.state_of(""), Some(ServiceState::Exited));
    }

    #[test]
    fn replicas_merge_into_worst_state() {
        let observations = vec![
            obs("worker", "running", "Up 1 hour"),
            obs("worker", "exited", "Exited (137)"),
            obs("worker", "running", "Up 1 hour"),
        ];
        let result = classify(&observations, &IgnoreSet::default());
        assert_eq!(result.state_of("worker"), Some(ServiceState::Exited));
        assert_eq!(result.len(), 1);
    }
}
