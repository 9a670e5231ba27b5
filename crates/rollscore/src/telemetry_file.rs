use rollscore_core::errors::TelemetryError;
use rollscore_core::metrics::RolloutWindow;
use rollscore_core::traits::TelemetrySource;
use rollscore_core::types::{DeploymentEvent, IssueEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TelemetryFile {
    #[serde(default)]
    repository: Option<String>,
    #[serde(default)]
    deployments: Vec<DeploymentEvent>,
    #[serde(default)]
    issues: Vec<IssueEvent>,
}

/// Deployment and issue events exported to a JSON file.
///
/// A file naming a `repository` only answers for that repository.
#[derive(Debug)]
pub struct JsonTelemetry {
    file: TelemetryFile,
}

impl JsonTelemetry {
    pub fn load(path: &str) -> Result<Self, TelemetryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::Unavailable(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| match e {
            TelemetryError::Malformed(msg) => TelemetryError::Malformed(format!("{path}: {msg}")),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, TelemetryError> {
        let file = serde_json::from_str(content)
            .map_err(|e| TelemetryError::Malformed(e.to_string()))?;
        Ok(Self { file })
    }

    fn check_repository(&self, repository: &str) -> Result<(), TelemetryError> {
        match &self.file.repository {
            Some(r) if r != repository => Err(TelemetryError::NotFound(repository.to_string())),
            _ => Ok(()),
        }
    }
}

impl TelemetrySource for JsonTelemetry {
    fn deployments(
        &self,
        repository: &str,
        _window: &RolloutWindow,
    ) -> Result<Vec<DeploymentEvent>, TelemetryError> {
        self.check_repository(repository)?;
        Ok(self.file.deployments.clone())
    }

    fn issues(
        &self,
        repository: &str,
        _window: &RolloutWindow,
    ) -> Result<Vec<IssueEvent>, TelemetryError> {
        self.check_repository(repository)?;
        Ok(self.file.issues.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> RolloutWindow {
        RolloutWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap(),
        )
    }

    #[test]
    fn parses_events_with_defaults() {
        let t = JsonTelemetry::parse(
            r#"{
                "deployments": [
                    {"at": "2024-01-01T10:00:00Z"},
                    {"at": "2024-01-01T12:00:00Z", "tag": "[HOTFIX] fix", "succeeded": false, "branch": "refs/heads/main"}
                ],
                "issues": [{"opened_at": "2024-01-01T11:00:00Z", "labels": ["critical"]}]
            }"#,
        )
        .unwrap();
        let deployments = t.deployments("any", &window()).unwrap();
        assert_eq!(deployments.len(), 2);
        assert!(deployments[0].succeeded);
        assert!(!deployments[1].succeeded);
        assert!(deployments[0].branch.is_none());
        assert!(deployments[1].is_on_branch("main"));
        assert_eq!(t.issues("any", &window()).unwrap().len(), 1);
    }

    #[test]
    fn repository_mismatch_is_not_found() {
        let t = JsonTelemetry::parse(r#"{"repository": "arcade"}"#).unwrap();
        assert!(t.deployments("arcade", &window()).is_ok());
        assert!(matches!(
            t.issues("runtime", &window()),
            Err(TelemetryError::NotFound(r)) if r == "runtime"
        ));
    }

    #[test]
    fn unknown_fields_are_malformed() {
        let err = JsonTelemetry::parse(r#"{"deploys": []}"#).unwrap_err();
        assert!(matches!(err, TelemetryError::Malformed(_)));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = JsonTelemetry::load("/nonexistent/telemetry.json").unwrap_err();
        assert!(matches!(err, TelemetryError::Unavailable(_)));
    }
}
