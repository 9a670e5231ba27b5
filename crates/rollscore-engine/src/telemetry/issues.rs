use rollscore_core::metrics::RolloutWindow;
use rollscore_core::types::IssueEvent;

/// Issues opened inside `window` carrying any of `labels` (case-insensitive).
pub fn count_critical_issues(
    issues: &[IssueEvent],
    window: &RolloutWindow,
    labels: &[String],
) -> i64 {
    issues
        .iter()
        .filter(|i| window.contains(i.opened_at))
        .filter(|i| {
            i.labels
                .iter()
                .any(|l| labels.iter().any(|c| c.eq_ignore_ascii_case(l)))
        })
        .count() as i64
}
