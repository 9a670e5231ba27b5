pub mod hotfix;
pub mod issues;
pub mod rollback;

use rollscore_core::config::ScorerConfig;
use rollscore_core::errors::{ScoringError, TelemetryError};
use rollscore_core::metrics::{ManualOverrides, MetricRecord, RolloutWindow};
use rollscore_core::traits::TelemetrySource;
use rollscore_core::types::{DeploymentEvent, HotfixMode, IssueEvent};

/// Counts derived from telemetry, before manual overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct InferredCounts {
    pub deployments: usize,
    pub hotfixes: i64,
    pub rollbacks: i64,
    pub critical_issues: i64,
}

/// Derive counts from events inside `window`.
pub fn infer_counts(
    deployments: &[DeploymentEvent],
    issues: &[IssueEvent],
    window: &RolloutWindow,
    config: &ScorerConfig,
    mode: HotfixMode,
) -> InferredCounts {
    InferredCounts {
        deployments: in_window(deployments, window).len(),
        hotfixes: hotfix::infer_hotfixes(deployments, window, mode, &config.hotfix_markers),
        rollbacks: rollback::detect_rollbacks(deployments, window, &config.rollback_markers),
        critical_issues: issues::count_critical_issues(issues, window, &config.critical_labels),
    }
}

/// Build the metric record for one rollout: inferred counts plus overrides.
///
/// Manual counts are always added on top of inferred ones. A sum that does
/// not fit is reported as invalid metrics.
pub fn assemble_record(
    repository: &str,
    window: RolloutWindow,
    counts: &InferredCounts,
    overrides: &ManualOverrides,
) -> Result<MetricRecord, ScoringError> {
    let add = |name: &str, inferred: i64, manual: i64| {
        inferred.checked_add(manual).ok_or_else(|| {
            ScoringError::invalid_metrics(
                repository,
                format!("{name} overflows: {inferred} inferred + {manual} manual"),
            )
        })
    };
    let mut record = MetricRecord::new(repository, window);
    record.critical_issue_count = counts.critical_issues;
    record.hotfix_count = add("hotfix_count", counts.hotfixes, overrides.hotfixes)?;
    record.rollback_count = add("rollback_count", counts.rollbacks, overrides.rollbacks)?;
    record.downtime = overrides.downtime;
    record.failed = overrides.failed;
    Ok(record)
}

/// Pull telemetry for `repository` from `source` and count what happened on
/// `branch` inside `window`.
pub fn collect_counts(
    source: &dyn TelemetrySource,
    repository: &str,
    window: &RolloutWindow,
    branch: &str,
    config: &ScorerConfig,
    mode: HotfixMode,
) -> Result<InferredCounts, TelemetryError> {
    let deployments = on_branch(source.deployments(repository, window)?, branch);
    let issues = source.issues(repository, window)?;
    Ok(infer_counts(&deployments, &issues, window, config, mode))
}

/// Drop deployments built from another branch.
fn on_branch(deployments: Vec<DeploymentEvent>, branch: &str) -> Vec<DeploymentEvent> {
    deployments
        .into_iter()
        .filter(|d| d.is_on_branch(branch))
        .collect()
}

/// Events inside `window`, ordered by time (stable for equal timestamps).
pub(crate) fn in_window<'a>(
    events: &'a [DeploymentEvent],
    window: &RolloutWindow,
) -> Vec<&'a DeploymentEvent> {
    let mut inside: Vec<&DeploymentEvent> =
        events.iter().filter(|e| window.contains(e.at)).collect();
    inside.sort_by_key(|e| e.at);
    inside
}

/// Case-insensitive substring match of any marker.
pub(crate) fn tag_matches(tag: Option<&str>, markers: &[String]) -> bool {
    let Some(tag) = tag else {
        return false;
    };
    let tag = tag.to_lowercase();
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .any(|m| tag.contains(&m.to_lowercase()))
}
