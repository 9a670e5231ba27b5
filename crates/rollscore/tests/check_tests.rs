//! CLI configuration checks, init, and scorecard rendering.

mod test_helpers;
use test_helpers::{fixture, rollscore_err, rollscore_json, rollscore_stdout, run};

#[test]
fn builtin_defaults_pass_strict_check() {
    let dir = tempfile::tempdir().unwrap();
    let v = rollscore_json(dir.path(), &["check", "--strict", "--json"], 0);
    assert_eq!(v["pass"], true);
    assert_eq!(v["file"], "(built-in)");
}

#[test]
fn init_writes_workspace_config_once() {
    let dir = tempfile::tempdir().unwrap();
    assert!(run(dir.path(), &["init"]).status.success());
    let written = dir.path().join(".rollscore/config.json");
    let config: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
    assert_eq!(config["weights"]["failure_points"], 50.0);
    assert_eq!(config["hotfix_markers"][0], "[HOTFIX]");

    let v = rollscore_json(dir.path(), &["check", "--strict", "--json"], 0);
    assert_eq!(v["file"], ".rollscore/config.json");

    let stderr = rollscore_err(dir.path(), &["init"]);
    assert!(stderr.contains("already exists"), "{stderr}");
    assert!(run(dir.path(), &["init", "--force"]).status.success());
}

#[test]
fn negative_weight_fails_check() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture("config/negative-weight.json");
    let v = rollscore_json(dir.path(), &["check", "--config", &config, "--json"], 1);
    assert_eq!(v["pass"], false);
    let errors = v["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e["code"] == "E002"
        && e["path"] == "$.weights.critical_issue_weight"));
}

#[test]
fn warnings_fail_only_in_strict_mode() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture("config/no-hotfix-markers.json");

    let v = rollscore_json(dir.path(), &["check", "--config", &config, "--json"], 0);
    assert_eq!(v["pass"], true);
    assert_eq!(v["warnings"][0]["code"], "W001");

    let v = rollscore_json(
        dir.path(),
        &["check", "--config", &config, "--json", "--strict"],
        1,
    );
    assert_eq!(v["pass"], false);
}

#[test]
fn show_renders_markdown_against_repo_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let md = rollscore_stdout(
        dir.path(),
        &[
            "show",
            &fixture("scorecards/arcade-2024-01-01.csv"),
            "--config",
            &fixture("config/repos.json"),
        ],
    );
    assert!(md.starts_with("The arcade 2024-01-01 rollout score is 70."), "{md}");
    assert!(md.contains("01:30:00"));
    assert!(md.contains("02:00:00"));
    assert!(md.contains("**70**"));
}

#[test]
fn show_lists_every_scorecard() {
    let dir = tempfile::tempdir().unwrap();
    let md = rollscore_stdout(dir.path(), &["show", &fixture("scorecards/runtime.csv")]);
    assert_eq!(md.matches("rollout score is").count(), 2);
    assert!(md.contains("The runtime 2024-01-02 rollout score is 21.5."));
}
