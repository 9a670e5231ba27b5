use crate::errors::TelemetryError;
use crate::metrics::RolloutWindow;
use crate::types::{DeploymentEvent, IssueEvent};

/// Supplies the raw telemetry a rollout is scored from.
///
/// Implementations front the deployment pipeline and the issue tracker.
/// They may return events outside the window; callers filter.
pub trait TelemetrySource {
    fn deployments(
        &self,
        repository: &str,
        window: &RolloutWindow,
    ) -> Result<Vec<DeploymentEvent>, TelemetryError>;

    fn issues(
        &self,
        repository: &str,
        window: &RolloutWindow,
    ) -> Result<Vec<IssueEvent>, TelemetryError>;
}

/// A source with nothing to report: every count comes from manual overrides.
pub struct NoTelemetry;

impl TelemetrySource for NoTelemetry {
    fn deployments(
        &self,
        _repository: &str,
        _window: &RolloutWindow,
    ) -> Result<Vec<DeploymentEvent>, TelemetryError> {
        Ok(Vec::new())
    }

    fn issues(
        &self,
        _repository: &str,
        _window: &RolloutWindow,
    ) -> Result<Vec<IssueEvent>, TelemetryError> {
        Ok(Vec::new())
    }
}
