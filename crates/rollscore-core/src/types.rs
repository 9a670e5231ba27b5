use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How hotfixes are inferred from deployment events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotfixMode {
    /// Count deployments whose tag carries a hotfix marker.
    #[default]
    Tagged,
    /// Count every deployment after the first successful one. Over-counts
    /// routine redeploys; meant for repositories that never tag hotfixes.
    Positional,
}

impl HotfixMode {
    pub fn from_assume_no_tags(assume_no_tags: bool) -> Self {
        if assume_no_tags {
            HotfixMode::Positional
        } else {
            HotfixMode::Tagged
        }
    }
}

impl fmt::Display for HotfixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotfixMode::Tagged => write!(f, "tagged"),
            HotfixMode::Positional => write!(f, "positional"),
        }
    }
}

/// What to do when an incoming scorecard collides with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Abort,
    Skip,
    Overwrite,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(ConflictPolicy::Abort),
            "skip" => Ok(ConflictPolicy::Skip),
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            other => Err(format!(
                "unknown conflict policy '{other}' (use: abort, skip, overwrite)"
            )),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Abort => write!(f, "abort"),
            ConflictPolicy::Skip => write!(f, "skip"),
            ConflictPolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// A single deployment observed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEvent {
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default = "default_true")]
    pub succeeded: bool,
    /// Artifact version that was deployed; used for rollback detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Source branch the deployed build came from, bare or as `refs/heads/...`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl DeploymentEvent {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            tag: None,
            succeeded: true,
            version: None,
            branch: None,
        }
    }

    pub fn tagged(at: DateTime<Utc>, tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Self::new(at)
        }
    }

    /// Events that do not name a branch match every branch.
    pub fn is_on_branch(&self, branch: &str) -> bool {
        match self.branch.as_deref() {
            Some(b) => branch_name(b) == branch_name(branch),
            None => true,
        }
    }
}

/// `refs/heads/main` and `main` name the same branch.
pub fn branch_name(branch: &str) -> &str {
    branch.strip_prefix("refs/heads/").unwrap_or(branch)
}

fn default_true() -> bool {
    true
}

/// An issue from the tracker, with the labels it carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<String>,
}
