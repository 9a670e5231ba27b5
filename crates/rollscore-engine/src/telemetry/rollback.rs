use std::collections::HashSet;

use rollscore_core::metrics::RolloutWindow;
use rollscore_core::types::DeploymentEvent;

use super::{in_window, tag_matches};

/// Count deployments inside `window` that returned to an earlier state.
///
/// A deployment is a rollback when its tag carries a rollback marker, or
/// when it redeploys a version already seen earlier in the window that
/// differs from the version immediately before it.
pub fn detect_rollbacks(
    events: &[DeploymentEvent],
    window: &RolloutWindow,
    markers: &[String],
) -> i64 {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut previous: Option<&str> = None;
    let mut count = 0i64;

    for event in in_window(events, window) {
        let version = event.version.as_deref();
        let redeploys_older = match (version, previous) {
            (Some(v), Some(p)) => v != p && seen.contains(v),
            _ => false,
        };
        if tag_matches(event.tag.as_deref(), markers) || redeploys_older {
            count += 1;
        }
        if let Some(v) = version {
            seen.insert(v);
            previous = Some(v);
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> RolloutWindow {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RolloutWindow::new(start, start + Duration::days(1))
    }

    fn deploy(hour: i64, version: &str) -> DeploymentEvent {
        let mut e = DeploymentEvent::new(window().start + Duration::hours(hour));
        e.version = Some(version.to_string());
        e
    }

    fn markers() -> Vec<String> {
        vec!["[ROLLBACK]".to_string()]
    }

    #[test]
    fn returning_to_earlier_version_is_rollback() {
        let events = vec![deploy(1, "1.0"), deploy(2, "1.1"), deploy(3, "1.0")];
        assert_eq!(detect_rollbacks(&events, &window(), &markers()), 1);
    }

    #[test]
    fn redeploying_same_version_is_not_rollback() {
        let events = vec![deploy(1, "1.0"), deploy(2, "1.0"), deploy(3, "1.1")];
        assert_eq!(detect_rollbacks(&events, &window(), &markers()), 0);
    }

    #[test]
    fn marker_tag_counts_once() {
        let mut tagged = deploy(3, "1.0");
        tagged.tag = Some("[ROLLBACK] bad config".into());
        let events = vec![deploy(1, "1.0"), deploy(2, "1.1"), tagged];
        assert_eq!(detect_rollbacks(&events, &window(), &markers()), 1);
    }

    #[test]
    fn untagged_unversioned_events_are_not_rollbacks() {
        let start = window().start;
        let events = vec![
            DeploymentEvent::new(start + Duration::hours(1)),
            DeploymentEvent::new(start + Duration::hours(2)),
        ];
        assert_eq!(detect_rollbacks(&events, &window(), &markers()), 0);
    }
}
