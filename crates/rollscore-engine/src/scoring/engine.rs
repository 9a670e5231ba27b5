use rollscore_core::config::WeightConfig;
use rollscore_core::duration::to_minutes;
use rollscore_core::errors::ScoringError;
use rollscore_core::metrics::MetricRecord;
use rollscore_core::scorecard::{repository_name_problem, Scorecard, SubScores};

/// Deterministic scorer bound to one validated weight configuration.
///
/// Algorithm, per metric (durations in fractional minutes):
/// 1. time: `max(0, time_to_rollout - max_allowed_minutes) * time_weight`
/// 2. critical issues, hotfixes, rollbacks: `count * weight`
/// 3. downtime: `downtime_minutes * downtime_weight`
/// 4. failure: flat `failure_points` when failed
/// 5. total: sum of the six
///
/// Weights are checked once, in [`ScoringEngine::new`]; each record is
/// checked before any arithmetic so no partial scorecard escapes.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: WeightConfig,
}

impl ScoringEngine {
    pub fn new(weights: WeightConfig) -> Result<Self, ScoringError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &WeightConfig {
        &self.weights
    }

    pub fn score(&self, record: &MetricRecord) -> Result<Scorecard, ScoringError> {
        validate_record(record)?;
        let w = &self.weights;

        let time_to_rollout = to_minutes(record.time_to_rollout());
        let downtime = to_minutes(record.downtime);
        let overage = (time_to_rollout - w.max_allowed_minutes).max(0.0);

        let scores = SubScores {
            time_to_rollout: overage * w.time_weight,
            critical_issues: record.critical_issue_count as f64 * w.critical_issue_weight,
            hotfixes: record.hotfix_count as f64 * w.hotfix_weight,
            rollbacks: record.rollback_count as f64 * w.rollback_weight,
            downtime: downtime * w.downtime_weight,
            failure: if record.failed { w.failure_points } else { 0.0 },
        };

        Ok(Scorecard {
            repository: record.repository.clone(),
            rollout_date: record.rollout_date(),
            time_to_rollout_minutes: time_to_rollout,
            critical_issues: record.critical_issue_count.unsigned_abs(),
            hotfixes: record.hotfix_count.unsigned_abs(),
            rollbacks: record.rollback_count.unsigned_abs(),
            downtime_minutes: downtime,
            failed: record.failed,
            total_score: scores.total(),
            scores,
        })
    }

    /// Score each record independently; one bad record does not stop the rest.
    pub fn score_all(&self, records: &[MetricRecord]) -> Vec<Result<Scorecard, ScoringError>> {
        records.iter().map(|r| self.score(r)).collect()
    }
}

/// One-shot convenience: validate `weights`, then score `record`.
pub fn score(record: &MetricRecord, weights: &WeightConfig) -> Result<Scorecard, ScoringError> {
    ScoringEngine::new(weights.clone())?.score(record)
}

fn validate_record(record: &MetricRecord) -> Result<(), ScoringError> {
    let repo = record.repository.as_str();
    if let Some(reason) = repository_name_problem(repo) {
        return Err(ScoringError::invalid_metrics(repo, reason));
    }
    if record.rollout_end < record.rollout_start {
        return Err(ScoringError::invalid_metrics(
            repo,
            format!(
                "rollout end {} is before start {}",
                record.rollout_end, record.rollout_start
            ),
        ));
    }
    for (name, count) in [
        ("critical_issue_count", record.critical_issue_count),
        ("hotfix_count", record.hotfix_count),
        ("rollback_count", record.rollback_count),
    ] {
        if count < 0 {
            return Err(ScoringError::invalid_metrics(
                repo,
                format!("{name} is negative ({count})"),
            ));
        }
    }
    if record.downtime < chrono::Duration::zero() {
        return Err(ScoringError::invalid_metrics(repo, "downtime is negative"));
    }
    if record.time_to_rollout() < chrono::Duration::zero() {
        return Err(ScoringError::invalid_metrics(
            repo,
            "downtime exceeds the rollout window",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rollscore_core::metrics::RolloutWindow;

    fn weights() -> WeightConfig {
        WeightConfig {
            max_allowed_minutes: 60.0,
            time_weight: 1.0,
            critical_issue_weight: 10.0,
            hotfix_weight: 5.0,
            rollback_weight: 20.0,
            downtime_weight: 2.0,
            failure_points: 50.0,
        }
    }

    /// Record whose time to rollout is `ttr_minutes` after `downtime_minutes` is removed.
    fn record(ttr_minutes: i64, downtime_minutes: i64) -> MetricRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let end = start + Duration::minutes(ttr_minutes + downtime_minutes);
        let mut r = MetricRecord::new("arcade", RolloutWindow::new(start, end));
        r.downtime = Duration::minutes(downtime_minutes);
        r
    }

    #[test]
    fn worked_example_scores_seventy() {
        let mut r = record(90, 10);
        r.critical_issue_count = 1;
        r.hotfix_count = 2;
        let card = score(&r, &weights()).unwrap();
        assert_eq!(
            card.scores,
            SubScores {
                time_to_rollout: 30.0,
                critical_issues: 10.0,
                hotfixes: 10.0,
                rollbacks: 0.0,
                downtime: 20.0,
                failure: 0.0,
            }
        );
        assert_eq!(card.total_score, 70.0);
        assert_eq!(card.time_to_rollout_minutes, 90.0);
        assert_eq!(card.downtime_minutes, 10.0);
    }

    #[test]
    fn zero_baseline_scores_zero() {
        let card = score(&record(60, 0), &weights()).unwrap();
        assert_eq!(card.total_score, 0.0);
        assert_eq!(card.scores, SubScores::default());
    }

    #[test]
    fn failure_is_flat() {
        let mut r = record(10, 0);
        r.failed = true;
        let card = score(&r, &weights()).unwrap();
        assert_eq!(card.scores.failure, 50.0);
        assert_eq!(card.total_score, 50.0);
    }

    #[test]
    fn sub_minute_overage_is_not_truncated() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let end = start + Duration::minutes(60) + Duration::seconds(30);
        let r = MetricRecord::new("arcade", RolloutWindow::new(start, end));
        let card = score(&r, &weights()).unwrap();
        assert_eq!(card.scores.time_to_rollout, 0.5);
    }

    #[test]
    fn every_subscore_is_non_negative() {
        for ttr in [0, 30, 59, 60, 61, 600] {
            for count in [0, 1, 7] {
                let mut r = record(ttr, count);
                r.critical_issue_count = count;
                r.hotfix_count = count;
                r.rollback_count = count;
                r.failed = count % 2 == 1;
                let card = score(&r, &weights()).unwrap();
                assert!(card.scores.as_array().iter().all(|s| *s >= 0.0));
                assert!(card.total_score >= 0.0);
            }
        }
    }

    #[test]
    fn increasing_a_metric_never_lowers_the_score() {
        let engine = ScoringEngine::new(weights()).unwrap();
        let base = record(70, 5);
        let base_card = engine.score(&base).unwrap();

        let bumps: Vec<Box<dyn Fn(&mut MetricRecord)>> = vec![
            Box::new(|r| r.rollout_end += Duration::minutes(15)),
            Box::new(|r| r.critical_issue_count += 1),
            Box::new(|r| r.hotfix_count += 1),
            Box::new(|r| r.rollback_count += 1),
            Box::new(|r| {
                r.downtime += Duration::minutes(5);
                r.rollout_end += Duration::minutes(5);
            }),
            Box::new(|r| r.failed = true),
        ];
        for (i, bump) in bumps.iter().enumerate() {
            let mut bumped = base.clone();
            bump(&mut bumped);
            let card = engine.score(&bumped).unwrap();
            assert!(
                card.scores.as_array()[i] > base_card.scores.as_array()[i],
                "metric {i} did not increase"
            );
            assert!(card.total_score > base_card.total_score);
        }
    }

    #[test]
    fn negative_weight_is_rejected_before_scoring() {
        let mut w = weights();
        w.rollback_weight = -1.0;
        let err = ScoringEngine::new(w).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidConfiguration(m) if m.contains("rollback_weight")));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut w = weights();
        w.max_allowed_minutes = -60.0;
        assert!(matches!(
            score(&record(10, 0), &w),
            Err(ScoringError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn end_before_start_is_invalid_metrics() {
        let mut r = record(10, 0);
        r.rollout_end = r.rollout_start - Duration::minutes(1);
        assert!(matches!(
            score(&r, &weights()),
            Err(ScoringError::InvalidMetrics { .. })
        ));
    }

    #[test]
    fn repository_that_would_not_round_trip_is_invalid() {
        for name in ["", " arcade", "arcade ", "org\nrepo"] {
            let mut r = record(10, 0);
            r.repository = name.to_string();
            assert!(
                matches!(score(&r, &weights()), Err(ScoringError::InvalidMetrics { .. })),
                "{name:?}"
            );
        }
    }

    #[test]
    fn scored_card_round_trips_through_csv() {
        let mut r = record(90, 10);
        r.repository = "org, \"arcade\"".to_string();
        let card = score(&r, &weights()).unwrap();
        let parsed = rollscore_core::tabular::from_csv(&rollscore_core::tabular::to_csv(
            std::slice::from_ref(&card),
        ))
        .unwrap();
        assert_eq!(parsed, vec![card]);
    }

    #[test]
    fn negative_count_is_invalid_metrics() {
        let mut r = record(10, 0);
        r.hotfix_count = -1;
        let err = score(&r, &weights()).unwrap_err();
        assert!(err.to_string().contains("hotfix_count"));
    }

    #[test]
    fn downtime_longer_than_window_is_invalid() {
        let mut r = record(10, 0);
        r.downtime = Duration::minutes(11);
        assert!(matches!(
            score(&r, &weights()),
            Err(ScoringError::InvalidMetrics { .. })
        ));
    }

    #[test]
    fn bad_record_does_not_stop_batch() {
        let engine = ScoringEngine::new(weights()).unwrap();
        let mut bad = record(10, 0);
        bad.rollback_count = -2;
        let results = engine.score_all(&[record(90, 0), bad, record(30, 0)]);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn scoring_does_not_mutate_inputs() {
        let r = record(90, 10);
        let w = weights();
        let (r_before, w_before) = (r.clone(), w.clone());
        let _ = score(&r, &w).unwrap();
        assert_eq!(r, r_before);
        assert_eq!(w, w_before);
    }
}
