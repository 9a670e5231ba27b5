use crate::scorecard::{Scorecard, ScorecardKey};

/// Failure to turn a metric record into a scorecard.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid metrics for {repository}: {reason}")]
    InvalidMetrics { repository: String, reason: String },
    #[error("repository '{0}' does not exist in config")]
    UnknownRepository(String),
}

impl ScoringError {
    pub fn invalid_metrics(repository: &str, reason: impl Into<String>) -> Self {
        ScoringError::InvalidMetrics {
            repository: repository.to_string(),
            reason: reason.into(),
        }
    }
}

/// Two scorecards claim the same (repository, rollout date) key.
///
/// Never resolved implicitly: the caller picks overwrite, skip, or abort.
#[derive(Debug, Clone, PartialEq, serde::Serialize, thiserror::Error)]
#[error(
    "merge conflict on {key}: existing total {} vs incoming total {}",
    .existing.total_score,
    .incoming.total_score
)]
pub struct MergeConflict {
    pub key: ScorecardKey,
    pub existing: Scorecard,
    pub incoming: Scorecard,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabularError {
    #[error("missing header row")]
    MissingHeader,
    #[error("header is missing column '{0}'")]
    MissingColumn(String),
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid {column} value '{value}'")]
    InvalidField {
        line: usize,
        column: String,
        value: String,
    },
    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
    #[error("line {line}: {reason}")]
    Inconsistent { line: usize, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("no telemetry for repository {0}")]
    NotFound(String),
    #[error("telemetry source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed telemetry: {0}")]
    Malformed(String),
}

/// Structured result for `rollscore check --json`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckReport {
    pub file: String,
    pub pass: bool,
    pub errors: Vec<CheckIssue>,
    pub warnings: Vec<CheckIssue>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckIssue {
    pub code: String,
    pub check: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
