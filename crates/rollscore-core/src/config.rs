use std::path::Path;

use anyhow::{bail, Context, Result};
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CheckIssue, CheckReport, ScoringError};

const CONFIG_SCHEMA: &str = include_str!("../schema/rollscore-config.schema.json");

/// Looked up in the working directory when no `--config` is given.
pub const WORKSPACE_CONFIG_PATH: &str = ".rollscore/config.json";

/// Branch scored when neither `--branch` nor the repository entry names one.
pub const DEFAULT_BRANCH: &str = "production";

/// Coefficients that turn raw metrics into penalty points.
///
/// Scores are penalties: more incidents, more points, lower is better. All
/// values must be finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    pub max_allowed_minutes: f64,
    pub time_weight: f64,
    pub critical_issue_weight: f64,
    pub hotfix_weight: f64,
    pub rollback_weight: f64,
    pub downtime_weight: f64,
    pub failure_points: f64,
}

impl WeightConfig {
    pub fn fields(&self) -> [(&'static str, f64); 7] {
        [
            ("max_allowed_minutes", self.max_allowed_minutes),
            ("time_weight", self.time_weight),
            ("critical_issue_weight", self.critical_issue_weight),
            ("hotfix_weight", self.hotfix_weight),
            ("rollback_weight", self.rollback_weight),
            ("downtime_weight", self.downtime_weight),
            ("failure_points", self.failure_points),
        ]
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        for (name, value) in self.fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoringError::InvalidConfiguration(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            max_allowed_minutes: 60.0,
            time_weight: 1.0,
            critical_issue_weight: 10.0,
            hotfix_weight: 5.0,
            rollback_weight: 20.0,
            downtime_weight: 2.0,
            failure_points: 50.0,
        }
    }
}

/// Per-repository settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub repo: String,
    /// Overrides the global threshold for this repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_allowed_minutes: Option<f64>,
    /// Branch scored for this repository unless `--branch` says otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Full scorer configuration, loaded once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub weights: WeightConfig,
    #[serde(default)]
    pub repos: Vec<RepoConfig>,
    #[serde(default = "default_hotfix_markers")]
    pub hotfix_markers: Vec<String>,
    #[serde(default = "default_rollback_markers")]
    pub rollback_markers: Vec<String>,
    #[serde(default = "default_critical_labels")]
    pub critical_labels: Vec<String>,
}

fn default_hotfix_markers() -> Vec<String> {
    vec!["[HOTFIX]".to_string()]
}

fn default_rollback_markers() -> Vec<String> {
    vec!["[ROLLBACK]".to_string()]
}

fn default_critical_labels() -> Vec<String> {
    vec!["critical".to_string(), "blocking".to_string()]
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            weights: WeightConfig::default(),
            repos: Vec::new(),
            hotfix_markers: default_hotfix_markers(),
            rollback_markers: default_rollback_markers(),
            critical_labels: default_critical_labels(),
        }
    }
}

impl ScorerConfig {
    /// Schema-validate, deserialize, and check weight invariants.
    pub fn from_value(data: &Value) -> Result<Self> {
        validate_schema(data)?;
        let config: ScorerConfig =
            serde_json::from_value(data.clone()).context("config does not match schema types")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, the workspace config, or the built-in default.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match resolve_path(path) {
            Some(p) => {
                let content =
                    std::fs::read_to_string(&p).with_context(|| format!("cannot read config {p}"))?;
                let data: Value = serde_json::from_str(&content)
                    .with_context(|| format!("{p}: invalid JSON"))?;
                Self::from_value(&data).with_context(|| format!("{p}: invalid config"))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        self.weights.validate()?;
        for repo in &self.repos {
            if let Some(m) = repo.max_allowed_minutes {
                if !m.is_finite() || m < 0.0 {
                    return Err(ScoringError::InvalidConfiguration(format!(
                        "repos[{}].max_allowed_minutes must be a non-negative number, got {m}",
                        repo.repo
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn repo(&self, name: &str) -> Option<&RepoConfig> {
        self.repos.iter().find(|r| r.repo == name)
    }

    /// Branch whose deployments count for `repo`.
    pub fn branch_for(&self, repo: &str) -> &str {
        self.repo(repo)
            .and_then(|r| r.branch.as_deref())
            .unwrap_or(DEFAULT_BRANCH)
    }

    /// Weights to score `repo` with.
    ///
    /// With no `repos` list every repository uses the global weights; with
    /// one, unlisted repositories are rejected.
    pub fn weights_for(&self, repo: &str) -> Result<WeightConfig, ScoringError> {
        if self.repos.is_empty() {
            return Ok(self.weights.clone());
        }
        let entry = self
            .repo(repo)
            .ok_or_else(|| ScoringError::UnknownRepository(repo.to_string()))?;
        let mut weights = self.weights.clone();
        if let Some(m) = entry.max_allowed_minutes {
            weights.max_allowed_minutes = m;
        }
        Ok(weights)
    }
}

/// Explicit path wins; otherwise the workspace config if it exists.
pub fn resolve_path(explicit: Option<&str>) -> Option<String> {
    match explicit {
        Some(p) => Some(p.to_string()),
        None if Path::new(WORKSPACE_CONFIG_PATH).exists() => Some(WORKSPACE_CONFIG_PATH.to_string()),
        None => None,
    }
}

pub fn validator() -> Result<Validator> {
    let schema: Value =
        serde_json::from_str(CONFIG_SCHEMA).context("embedded schema is invalid JSON")?;
    Validator::new(&schema).map_err(|e| anyhow::anyhow!("schema compilation failed: {e}"))
}

fn validate_schema(data: &Value) -> Result<()> {
    let v = validator()?;
    if v.is_valid(data) {
        return Ok(());
    }
    let mut msgs: Vec<String> = Vec::new();
    for error in v.iter_errors(data) {
        let path = error.instance_path.to_string();
        let loc = if path.is_empty() {
            "(root)".into()
        } else {
            path
        };
        msgs.push(format!("  {loc}: {error}"));
    }
    bail!("validation failed:\n{}", msgs.join("\n"));
}

/// Full check producing a structured report (for `rollscore check`).
pub fn check(data: &Value, file: &str, strict: bool) -> CheckReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match validator() {
        Ok(v) => {
            for error in v.iter_errors(data) {
                let path = error.instance_path.to_string();
                errors.push(CheckIssue {
                    code: "E001".to_string(),
                    check: "schema".to_string(),
                    message: error.to_string(),
                    path: Some(if path.is_empty() {
                        "$(root)".to_string()
                    } else {
                        format!("${path}")
                    }),
                });
            }
        }
        Err(e) => errors.push(CheckIssue {
            code: "E000".to_string(),
            check: "schema".to_string(),
            message: e.to_string(),
            path: None,
        }),
    }

    check_values(data, &mut errors);
    check_repos(data, &mut errors, &mut warnings);
    lint_checks(data, &mut warnings);

    let pass = errors.is_empty() && (!strict || warnings.is_empty());
    CheckReport {
        file: file.to_string(),
        pass,
        errors,
        warnings,
    }
}

fn negative_issue(path: String, name: &str, value: f64) -> CheckIssue {
    CheckIssue {
        code: "E002".to_string(),
        check: "weights".to_string(),
        message: format!("{name} must be non-negative, got {value}"),
        path: Some(path),
    }
}

fn check_values(data: &Value, errors: &mut Vec<CheckIssue>) {
    if let Some(weights) = data.get("weights").and_then(Value::as_object) {
        for (name, value) in weights {
            if let Some(n) = value.as_f64() {
                if n < 0.0 {
                    errors.push(negative_issue(format!("$.weights.{name}"), name, n));
                }
            }
        }
    }
    if let Some(repos) = data.get("repos").and_then(Value::as_array) {
        for (i, repo) in repos.iter().enumerate() {
            if let Some(n) = repo.get("max_allowed_minutes").and_then(Value::as_f64) {
                if n < 0.0 {
                    errors.push(negative_issue(
                        format!("$.repos[{i}].max_allowed_minutes"),
                        "max_allowed_minutes",
                        n,
                    ));
                }
            }
        }
    }
}

fn check_repos(data: &Value, errors: &mut Vec<CheckIssue>, warnings: &mut Vec<CheckIssue>) {
    let Some(repos) = data.get("repos").and_then(Value::as_array) else {
        return;
    };
    let mut seen: Vec<&str> = Vec::new();
    for (i, repo) in repos.iter().enumerate() {
        let Some(name) = repo.get("repo").and_then(Value::as_str) else {
            continue;
        };
        if seen.contains(&name) {
            errors.push(CheckIssue {
                code: "E003".to_string(),
                check: "repos".to_string(),
                message: format!("repository '{name}' is configured more than once"),
                path: Some(format!("$.repos[{i}].repo")),
            });
        }
        seen.push(name);

        let global = data
            .pointer("/weights/max_allowed_minutes")
            .and_then(Value::as_f64);
        let own = repo.get("max_allowed_minutes").and_then(Value::as_f64);
        if own.is_some() && own == global {
            warnings.push(CheckIssue {
                code: "W003".to_string(),
                check: "repos".to_string(),
                message: format!("repository '{name}' repeats the global max_allowed_minutes"),
                path: Some(format!("$.repos[{i}].max_allowed_minutes")),
            });
        }
    }
}

fn lint_checks(data: &Value, warnings: &mut Vec<CheckIssue>) {
    // W001: tag-mode inference can never fire without markers
    let markers_empty = data
        .get("hotfix_markers")
        .and_then(Value::as_array)
        .is_some_and(|m| m.is_empty());
    if markers_empty {
        warnings.push(CheckIssue {
            code: "W001".to_string(),
            check: "lint".to_string(),
            message: "no hotfix markers; tagged hotfix inference always yields 0".to_string(),
            path: Some("$.hotfix_markers".to_string()),
        });
    }

    // W002: every weight zero means every rollout scores 0
    let all_zero = data
        .get("weights")
        .and_then(Value::as_object)
        .is_some_and(|w| {
            w.iter()
                .filter(|(k, _)| k.as_str() != "max_allowed_minutes")
                .all(|(_, v)| v.as_f64() == Some(0.0))
        });
    if all_zero {
        warnings.push(CheckIssue {
            code: "W002".to_string(),
            check: "lint".to_string(),
            message: "all weights are zero; every rollout scores 0".to_string(),
            path: Some("$.weights".to_string()),
        });
    }
}
