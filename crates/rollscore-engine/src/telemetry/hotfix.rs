use rollscore_core::metrics::RolloutWindow;
use rollscore_core::types::{DeploymentEvent, HotfixMode};

use super::{in_window, tag_matches};

/// Infer the hotfix count from deployments inside `window`.
///
/// - `Tagged`: deployments whose tag contains one of `markers`.
/// - `Positional`: every deployment after the first successful one. Events
///   before the first success are failed attempts of the initial rollout,
///   not hotfixes. With every event successful this is `max(0, n - 1)`.
pub fn infer_hotfixes(
    events: &[DeploymentEvent],
    window: &RolloutWindow,
    mode: HotfixMode,
    markers: &[String],
) -> i64 {
    let events = in_window(events, window);
    let count = match mode {
        HotfixMode::Tagged => events
            .iter()
            .filter(|e| tag_matches(e.tag.as_deref(), markers))
            .count(),
        HotfixMode::Positional => events
            .iter()
            .position(|e| e.succeeded)
            .map(|first| events.len() - first - 1)
            .unwrap_or(0),
    };
    count as i64
}
