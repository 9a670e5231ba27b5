//! Scorecard CSV codec.
//!
//! One header row, one row per scorecard. Floats are written in Rust's
//! shortest round-trip form, so parsing a written file reproduces every
//! field exactly. Columns are looked up by name, so extra columns are ignored.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::errors::TabularError;
use crate::scorecard::{repository_name_problem, Scorecard, SubScores};

pub const COLUMNS: [&str; 15] = [
    "repository",
    "rollout_date",
    "time_to_rollout_minutes",
    "critical_issues",
    "hotfixes",
    "rollbacks",
    "downtime_minutes",
    "failed",
    "time_to_rollout_score",
    "critical_issue_score",
    "hotfix_score",
    "rollback_score",
    "downtime_score",
    "failure_score",
    "total_score",
];

/// Tolerance when checking a parsed total against its sub-scores.
const TOTAL_EPSILON: f64 = 1e-9;

/// Serialize scorecards to CSV, header included.
pub fn to_csv(cards: &[Scorecard]) -> String {
    let mut out = COLUMNS.join(",");
    out.push('\n');
    for card in cards {
        let s = &card.scores;
        let row = [
            csv_escape(&card.repository),
            card.rollout_date.format("%Y-%m-%d").to_string(),
            card.time_to_rollout_minutes.to_string(),
            card.critical_issues.to_string(),
            card.hotfixes.to_string(),
            card.rollbacks.to_string(),
            card.downtime_minutes.to_string(),
            card.failed.to_string(),
            s.time_to_rollout.to_string(),
            s.critical_issues.to_string(),
            s.hotfixes.to_string(),
            s.rollbacks.to_string(),
            s.downtime.to_string(),
            s.failure.to_string(),
            card.total_score.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Parse CSV produced by [`to_csv`] (or any file with the same columns).
pub fn from_csv(input: &str) -> Result<Vec<Scorecard>, TabularError> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty());

    let (header_line, header) = lines.next().ok_or(TabularError::MissingHeader)?;
    let header = split_record(header, header_line)?;
    let index: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();
    for column in COLUMNS {
        if !index.contains_key(column) {
            return Err(TabularError::MissingColumn(column.to_string()));
        }
    }

    let mut cards = Vec::new();
    for (line, raw) in lines {
        let fields = split_record(raw, line)?;
        if fields.len() != header.len() {
            return Err(TabularError::FieldCount {
                line,
                expected: header.len(),
                found: fields.len(),
            });
        }
        let row = Row {
            line,
            fields: &fields,
            index: &index,
        };
        cards.push(row.scorecard()?);
    }
    Ok(cards)
}

struct Row<'a> {
    line: usize,
    fields: &'a [String],
    index: &'a HashMap<&'a str, usize>,
}

impl Row<'_> {
    fn raw(&self, column: &str) -> &str {
        // Presence of every column was checked against the header.
        self.index
            .get(column)
            .and_then(|i| self.fields.get(*i))
            .map(|s| s.trim())
            .unwrap_or_default()
    }

    fn invalid(&self, column: &str) -> TabularError {
        TabularError::InvalidField {
            line: self.line,
            column: column.to_string(),
            value: self.raw(column).to_string(),
        }
    }

    fn count(&self, column: &str) -> Result<u64, TabularError> {
        self.raw(column).parse().map_err(|_| self.invalid(column))
    }

    fn number(&self, column: &str) -> Result<f64, TabularError> {
        match self.raw(column).parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(self.invalid(column)),
        }
    }

    fn flag(&self, column: &str) -> Result<bool, TabularError> {
        match self.raw(column).to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.invalid(column)),
        }
    }

    fn scorecard(&self) -> Result<Scorecard, TabularError> {
        // Kept verbatim: a name that only survives trimming would not round-trip.
        let repository = self
            .index
            .get("repository")
            .and_then(|i| self.fields.get(*i))
            .cloned()
            .unwrap_or_default();
        if let Some(reason) = repository_name_problem(&repository) {
            return Err(TabularError::Inconsistent {
                line: self.line,
                reason: format!("{reason}: {repository:?}"),
            });
        }
        let rollout_date = NaiveDate::parse_from_str(self.raw("rollout_date"), "%Y-%m-%d")
            .map_err(|_| self.invalid("rollout_date"))?;
        let scores = SubScores {
            time_to_rollout: self.number("time_to_rollout_score")?,
            critical_issues: self.number("critical_issue_score")?,
            hotfixes: self.number("hotfix_score")?,
            rollbacks: self.number("rollback_score")?,
            downtime: self.number("downtime_score")?,
            failure: self.number("failure_score")?,
        };
        let total_score = self.number("total_score")?;
        if (scores.total() - total_score).abs() > TOTAL_EPSILON {
            return Err(TabularError::Inconsistent {
                line: self.line,
                reason: format!(
                    "total_score {total_score} does not match sub-score sum {}",
                    scores.total()
                ),
            });
        }
        Ok(Scorecard {
            repository,
            rollout_date,
            time_to_rollout_minutes: self.number("time_to_rollout_minutes")?,
            critical_issues: self.count("critical_issues")?,
            hotfixes: self.count("hotfixes")?,
            rollbacks: self.count("rollbacks")?,
            downtime_minutes: self.number("downtime_minutes")?,
            failed: self.flag("failed")?,
            scores,
            total_score,
        })
    }
}

/// Quote a field if it contains a delimiter, quote, or newline.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Split one record, honouring double-quoted fields with `""` escapes.
fn split_record(line: &str, line_no: usize) -> Result<Vec<String>, TabularError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            (c, _) => current.push(c),
        }
    }
    if in_quotes {
        return Err(TabularError::UnterminatedQuote { line: line_no });
    }
    fields.push(current);
    Ok(fields)
}
