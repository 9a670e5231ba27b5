use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dataset identity: one rollout per repository per day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScorecardKey {
    pub repository: String,
    pub rollout_date: NaiveDate,
}

impl fmt::Display for ScorecardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repository, self.rollout_date)
    }
}

/// Why `name` cannot identify a repository in a dataset, if it cannot.
///
/// Names are stored verbatim in one CSV cell, so surrounding whitespace and
/// control characters (line breaks included) are refused up front.
pub fn repository_name_problem(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("repository is empty")
    } else if name.trim() != name {
        Some("repository has leading or trailing whitespace")
    } else if name.chars().any(char::is_control) {
        Some("repository contains control characters")
    } else {
        None
    }
}

/// Penalty points per metric. Every field is non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubScores {
    pub time_to_rollout: f64,
    pub critical_issues: f64,
    pub hotfixes: f64,
    pub rollbacks: f64,
    pub downtime: f64,
    pub failure: f64,
}

impl SubScores {
    /// Sum in a fixed order so the total is reproducible bit for bit.
    pub fn total(&self) -> f64 {
        self.time_to_rollout
            + self.critical_issues
            + self.hotfixes
            + self.rollbacks
            + self.downtime
            + self.failure
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.time_to_rollout,
            self.critical_issues,
            self.hotfixes,
            self.rollbacks,
            self.downtime,
            self.failure,
        ]
    }
}

/// Scored rollout. A value object: it keeps the measured values it was
/// computed from but no reference to the record or weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub repository: String,
    pub rollout_date: NaiveDate,
    pub time_to_rollout_minutes: f64,
    pub critical_issues: u64,
    pub hotfixes: u64,
    pub rollbacks: u64,
    pub downtime_minutes: f64,
    pub failed: bool,
    pub scores: SubScores,
    pub total_score: f64,
}

impl Scorecard {
    pub fn key(&self) -> ScorecardKey {
        ScorecardKey {
            repository: self.repository.clone(),
            rollout_date: self.rollout_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_every_metric() {
        let scores = SubScores {
            time_to_rollout: 30.0,
            critical_issues: 10.0,
            hotfixes: 10.0,
            rollbacks: 0.0,
            downtime: 20.0,
            failure: 0.0,
        };
        assert_eq!(scores.total(), 70.0);
        assert_eq!(scores.as_array().iter().sum::<f64>(), 70.0);
    }

    #[test]
    fn repository_names_must_be_verbatim_safe() {
        assert_eq!(repository_name_problem("dotnet/arcade"), None);
        assert_eq!(repository_name_problem("org, \"repo\""), None);
        assert!(repository_name_problem("").is_some());
        assert!(repository_name_problem(" arcade").is_some());
        assert!(repository_name_problem("arcade\t").is_some());
        assert!(repository_name_problem("org\nrepo").is_some());
        assert!(repository_name_problem("org\rrepo").is_some());
    }

    #[test]
    fn key_display_is_repo_at_date() {
        let key = ScorecardKey {
            repository: "arcade-services".into(),
            rollout_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(key.to_string(), "arcade-services@2024-01-01");
    }
}
