use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// The time span a rollout is measured over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloutWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RolloutWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Resolve a window from user input.
    ///
    /// An explicit end date covers that whole day (up to 23:59:59); without
    /// one the window runs until `now`.
    pub fn resolve(start: DateTime<Utc>, end_date: Option<NaiveDate>, now: DateTime<Utc>) -> Self {
        let end = end_date.map(end_of_day).unwrap_or(now);
        Self { start, end }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// Rollouts are attributed to the day they started, even across midnight.
    pub fn rollout_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

/// Last second of the given day, UTC.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    (date.and_time(NaiveTime::MIN) + Duration::seconds(86_399)).and_utc()
}

/// First instant of the given day, UTC.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Raw measurements for one rollout attempt.
///
/// Counts are signed because they arrive from external input and manual
/// overrides; the scoring engine rejects negative values.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub repository: String,
    pub rollout_start: DateTime<Utc>,
    pub rollout_end: DateTime<Utc>,
    pub critical_issue_count: i64,
    pub hotfix_count: i64,
    pub rollback_count: i64,
    pub downtime: Duration,
    pub failed: bool,
}

impl MetricRecord {
    /// A record with no incidents over the given window.
    pub fn new(repository: impl Into<String>, window: RolloutWindow) -> Self {
        Self {
            repository: repository.into(),
            rollout_start: window.start,
            rollout_end: window.end,
            critical_issue_count: 0,
            hotfix_count: 0,
            rollback_count: 0,
            downtime: Duration::zero(),
            failed: false,
        }
    }

    pub fn window(&self) -> RolloutWindow {
        RolloutWindow::new(self.rollout_start, self.rollout_end)
    }

    pub fn rollout_date(&self) -> NaiveDate {
        self.rollout_start.date_naive()
    }

    /// Elapsed window minus declared downtime. May be negative for a
    /// malformed record; the engine checks.
    pub fn time_to_rollout(&self) -> Duration {
        self.rollout_end - self.rollout_start - self.downtime
    }
}

/// Values an operator declares by hand on top of what telemetry shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualOverrides {
    pub rollbacks: i64,
    pub hotfixes: i64,
    pub downtime: Duration,
    pub failed: bool,
}

impl Default for ManualOverrides {
    fn default() -> Self {
        Self {
            rollbacks: 0,
            hotfixes: 0,
            downtime: Duration::zero(),
            failed: false,
        }
    }
}
