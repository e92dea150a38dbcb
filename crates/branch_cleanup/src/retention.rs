//! Branch retention rules.
//!
//! A branch becomes a deletion candidate once its last commit is at least
//! `threshold_months` old and its name is not protected. Months are fixed
//! 30-day periods, not calendar months.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;

/// Default minimum age, in months, before a branch is deleted.
pub const DEFAULT_THRESHOLD_MONTHS: u32 = 3;

/// Branch names that are never deleted unless configured otherwise.
pub const DEFAULT_PROTECTED_BRANCHES: [&str; 2] = ["master", "staging"];

const SECONDS_PER_MONTH: i64 = 60 * 60 * 24 * 30;

/// Outcome of evaluating a single branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionDecision {
    /// Old enough and not protected.
    Delete { age_months: i64 },
    /// Name is in the protected set. Age is not considered.
    Protected,
    /// Last commit is newer than the threshold.
    TooRecent { age_months: i64 },
    /// The last commit date could not be parsed as RFC 3339.
    InvalidTimestamp { reason: String },
}

impl RetentionDecision {
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }
}

/// Threshold and protected names applied to every branch of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    threshold_months: u32,
    protected: BTreeSet<String>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_THRESHOLD_MONTHS,
            DEFAULT_PROTECTED_BRANCHES.iter().map(|s| s.to_string()),
        )
    }
}

impl RetentionPolicy {
    pub fn new(threshold_months: u32, protected: impl IntoIterator<Item = String>) -> Self {
        Self {
            threshold_months,
            protected: protected.into_iter().collect(),
        }
    }

    pub fn threshold_months(&self) -> u32 {
        self.threshold_months
    }

    pub fn protected_branches(&self) -> impl Iterator<Item = &str> {
        self.protected.iter().map(String::as_str)
    }

    /// Returns true if `branch` must never be deleted.
    ///
    /// Matching is exact and case sensitive.
    pub fn is_protected(&self, branch: &str) -> bool {
        self.protected.contains(branch)
    }

    /// Decides what to do with a branch whose last commit is `last_commit`
    /// (raw RFC 3339 string) when the run started at `now`.
    pub fn evaluate(
        &self,
        now: DateTime<Utc>,
        branch: &str,
        last_commit: &str,
    ) -> RetentionDecision {
        if self.is_protected(branch) {
            return RetentionDecision::Protected;
        }

        let last_commit = match DateTime::parse_from_rfc3339(last_commit) {
            Ok(date) => date.with_timezone(&Utc),
            Err(err) => {
                return RetentionDecision::InvalidTimestamp {
                    reason: format!("'{last_commit}': {err}"),
                }
            }
        };

        let age_months = age_in_months(now, last_commit);
        if age_months >= i64::from(self.threshold_months) {
            RetentionDecision::Delete { age_months }
        } else {
            RetentionDecision::TooRecent { age_months }
        }
    }
}

/// Whole 30-day months elapsed between `last_commit` and `now`, rounded down.
///
/// Commits dated after `now` give a negative age.
pub fn age_in_months(now: DateTime<Utc>, last_commit: DateTime<Utc>) -> i64 {
    (now - last_commit).num_seconds().div_euclid(SECONDS_PER_MONTH)
}
