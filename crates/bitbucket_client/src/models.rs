//! Wire models for the Bitbucket Cloud 2.0 API.
//!
//! Only the fields the branch cleaner reads are modelled. Unknown fields are
//! ignored by serde so the models stay stable when Bitbucket adds data.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// One page of a paginated Bitbucket collection.
///
/// `size` is what the server reports for the whole collection. It is optional
/// in the Bitbucket API and is never used to size or index `values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// Absolute URL of the next page, absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// Returns true when the reported collection size disagrees with the
    /// number of entries on this page and there is no further page.
    pub fn size_mismatch(&self) -> bool {
        match self.size {
            Some(size) => self.next.is_none() && size != self.values.len() as u64,
            None => false,
        }
    }
}

/// A repository entry from `GET /repositories/{workspace}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
}

/// The commit a branch currently points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// RFC 3339 timestamp of the commit, kept as the raw wire string.
    #[serde(default)]
    pub date: String,
}

/// A branch entry from `GET /repositories/{workspace}/{repo}/refs/branches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub target: Target,
}

impl Branch {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: Target { date: date.into() },
        }
    }

    /// Raw timestamp of the most recent commit on this branch.
    pub fn last_commit_date(&self) -> &str {
        &self.target.date
    }
}

pub type RepositoryListing = Page<Repository>;
pub type BranchListing = Page<Branch>;
