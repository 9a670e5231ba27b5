use crate::duration::format_minutes;
use crate::scorecard::Scorecard;

/// Markdown scorecard: one row per metric with its value, target, and score.
///
/// `target_minutes` is the allowance the rollout was scored against.
pub fn to_markdown(card: &Scorecard, target_minutes: f64) -> String {
    let s = &card.scores;
    let mut out = format!(
        "The {} {} rollout score is {}.\n\n",
        card.repository, card.rollout_date, card.total_score
    );
    out.push_str("|              Metric              |   Value  |  Target  |   Score   |\n");
    out.push_str("|:--------------------------------:|:--------:|:--------:|:---------:|\n");
    let rows = [
        (
            "Time to Rollout",
            format_minutes(card.time_to_rollout_minutes),
            format_minutes(target_minutes),
            s.time_to_rollout,
        ),
        (
            "Critical/blocking issues created",
            card.critical_issues.to_string(),
            "0".to_string(),
            s.critical_issues,
        ),
        (
            "Hotfixes",
            card.hotfixes.to_string(),
            "0".to_string(),
            s.hotfixes,
        ),
        (
            "Rollbacks",
            card.rollbacks.to_string(),
            "0".to_string(),
            s.rollbacks,
        ),
        (
            "Service downtime",
            format_minutes(card.downtime_minutes),
            "00:00:00".to_string(),
            s.downtime,
        ),
        (
            "Failed to rollout",
            card.failed.to_string().to_uppercase(),
            "FALSE".to_string(),
            s.failure,
        ),
    ];
    for (metric, value, target, score) in rows {
        out.push_str(&format!(
            "| {metric:<32} | {value:^8} | {target:^8} | {score:^9} |\n"
        ));
    }
    out.push_str(&format!(
        "| {:<32} | {:^8} | {:^8} | {:^9} |\n",
        "Total",
        "",
        "",
        format!("**{}**", card.total_score)
    ));
    out
}
