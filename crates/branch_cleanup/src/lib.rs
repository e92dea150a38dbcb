//! Stale branch cleanup for Bitbucket workspaces.
//!
//! This crate walks every repository of a Bitbucket workspace that the
//! configured user can contribute to, and deletes branches whose last commit
//! is older than a retention threshold. Protected branch names are never
//! deleted. It can be used both programmatically and via the
//! `bb-workspace-cleaner` binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bitbucket_client::{BitbucketClient, Branch, Credentials, Pagination};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

pub mod credentials;
pub mod retention;

pub use credentials::{load_app_password, CredentialError, DEFAULT_PASSWORD_FILE};
pub use retention::{RetentionDecision, RetentionPolicy};

/// Environment variable holding the log filter directive.
pub const LOG_FILTER_ENV: &str = "BB_CLEANER_LOG";

/// Configuration for a cleanup run.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Bitbucket username used for basic auth
    pub user: String,
    /// Workspace whose repositories are cleaned
    pub organization: String,
    /// Base URL of the Bitbucket API
    pub base_url: String,
    /// File holding the app password on its first line
    pub password_file: PathBuf,
    /// Age threshold and protected branch names
    pub policy: RetentionPolicy,
    /// Evaluate and log only, never delete
    pub dry_run: bool,
    /// Whether listings follow `next` links
    pub pagination: Pagination,
}

impl CleanupConfig {
    /// Creates a configuration with the default base URL, password file,
    /// retention policy and single-page listings.
    pub fn new(user: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            organization: organization.into(),
            base_url: bitbucket_client::DEFAULT_BASE_URL.to_string(),
            password_file: PathBuf::from(DEFAULT_PASSWORD_FILE),
            policy: RetentionPolicy::default(),
            dry_run: false,
            pagination: Pagination::FirstPage,
        }
    }
}

/// A branch within a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub repository: String,
    pub branch: String,
}

impl BranchRef {
    fn new(repository: &str, branch: &str) -> Self {
        Self {
            repository: repository.to_string(),
            branch: branch.to_string(),
        }
    }
}

/// A branch deletion that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDeletion {
    pub target: BranchRef,
    pub reason: String,
}

/// A repository whose processing was cut short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRepository {
    pub repository: String,
    pub reason: String,
}

/// Summary of a cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub repositories_scanned: usize,
    pub skipped_repositories: Vec<SkippedRepository>,
    pub deleted: Vec<BranchRef>,
    /// Candidates found during a dry run.
    pub would_delete: Vec<BranchRef>,
    pub failed: Vec<FailedDeletion>,
    /// Branches left alone because their commit date could not be parsed.
    pub invalid_timestamps: Vec<BranchRef>,
}

/// Branch cleanup operations for a single workspace.
///
/// Repositories and branches are processed strictly one after another.
/// Failures are contained as narrowly as possible: a rejected deletion only
/// affects its branch, a failed branch listing only its repository. Only a
/// failure to list the repositories aborts the run.
pub struct BranchCleanup {
    client: BitbucketClient,
    policy: RetentionPolicy,
    dry_run: bool,
}

impl BranchCleanup {
    /// Create a new cleanup instance.
    ///
    /// # Arguments
    ///
    /// * `client` - Authenticated Bitbucket client scoped to the workspace
    /// * `policy` - Retention rules applied to every branch
    /// * `dry_run` - When true no delete request is issued
    pub fn new(client: BitbucketClient, policy: RetentionPolicy, dry_run: bool) -> Self {
        Self {
            client,
            policy,
            dry_run,
        }
    }

    /// Loads the app password and builds an authenticated client from `config`.
    pub fn from_config(config: &CleanupConfig) -> Result<Self> {
        let app_password = load_app_password(&config.password_file)?;
        let credentials = Credentials::new(config.user.clone(), app_password);

        let client = BitbucketClient::new(&config.base_url, &config.organization, credentials)
            .context("Failed to create Bitbucket client")?
            .with_pagination(config.pagination);

        Ok(Self::new(client, config.policy.clone(), config.dry_run))
    }

    /// Run the cleanup against the current time.
    pub async fn run(&self) -> Result<CleanupReport> {
        self.run_at(Utc::now()).await
    }

    /// Run the cleanup, measuring branch ages relative to `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        let org = self.client.organization();
        info!(
            org = org,
            threshold_months = self.policy.threshold_months(),
            protected = ?self.policy.protected_branches().collect::<Vec<_>>(),
            dry_run = self.dry_run,
            "Starting branch cleanup"
        );

        let repositories = match self.client.list_repositories().await {
            Ok(repos) => repos,
            Err(err) => {
                error!(org = org, error = %err, "Failed to list repositories");
                return Err(err).context("Failed to list organization repositories");
            }
        };

        let mut report = CleanupReport::default();

        for repo in &repositories {
            info!(repo_name = repo, "Fetching all branches of repository");
            report.repositories_scanned += 1;
            self.cleanup_repository(repo, now, &mut report).await;
        }

        info!(
            org = org,
            repositories = report.repositories_scanned,
            deleted = report.deleted.len(),
            would_delete = report.would_delete.len(),
            failed = report.failed.len(),
            skipped_repositories = report.skipped_repositories.len(),
            "Cleanup completed"
        );

        Ok(report)
    }

    /// Evaluates every branch against the retention policy without touching
    /// the remote side.
    pub fn evaluate_branches<'a>(
        &self,
        now: DateTime<Utc>,
        branches: &'a [Branch],
    ) -> Vec<(&'a Branch, RetentionDecision)> {
        branches
            .iter()
            .map(|branch| {
                let decision = self
                    .policy
                    .evaluate(now, &branch.name, branch.last_commit_date());
                (branch, decision)
            })
            .collect()
    }

    async fn cleanup_repository(
        &self,
        repo: &str,
        now: DateTime<Utc>,
        report: &mut CleanupReport,
    ) {
        let branches = match self.client.list_branches(repo).await {
            Ok(branches) => branches,
            Err(err) => {
                error!(
                    repo_name = repo,
                    error = %err,
                    "Failed to list branches, skipping repository"
                );
                report.skipped_repositories.push(SkippedRepository {
                    repository: repo.to_string(),
                    reason: err.to_string(),
                });
                return;
            }
        };

        for (branch, decision) in self.evaluate_branches(now, &branches) {
            match decision {
                RetentionDecision::Delete { age_months } => {
                    if self.dry_run {
                        info!(
                            repo_name = repo,
                            branch = branch.name,
                            age_months = age_months,
                            "Branch is stale and would be deleted (dry run)"
                        );
                        report.would_delete.push(BranchRef::new(repo, &branch.name));
                        continue;
                    }

                    info!(
                        repo_name = repo,
                        branch = branch.name,
                        age_months = age_months,
                        "Branch is stale, attempting deletion"
                    );

                    match self.client.delete_branch(repo, &branch.name).await {
                        Ok(()) => report.deleted.push(BranchRef::new(repo, &branch.name)),
                        Err(err @ bitbucket_client::Error::DeletionRejected { .. }) => {
                            warn!(
                                repo_name = repo,
                                branch = branch.name,
                                error = %err,
                                "Failed to delete branch, continuing"
                            );
                            report.failed.push(FailedDeletion {
                                target: BranchRef::new(repo, &branch.name),
                                reason: err.to_string(),
                            });
                        }
                        Err(err) => {
                            error!(
                                repo_name = repo,
                                branch = branch.name,
                                error = %err,
                                "Delete request failed, skipping rest of repository"
                            );
                            report.failed.push(FailedDeletion {
                                target: BranchRef::new(repo, &branch.name),
                                reason: err.to_string(),
                            });
                            report.skipped_repositories.push(SkippedRepository {
                                repository: repo.to_string(),
                                reason: err.to_string(),
                            });
                            return;
                        }
                    }
                }
                RetentionDecision::Protected => {
                    debug!(
                        repo_name = repo,
                        branch = branch.name,
                        "Branch is protected, skipping"
                    );
                }
                RetentionDecision::TooRecent { age_months } => {
                    debug!(
                        repo_name = repo,
                        branch = branch.name,
                        age_months = age_months,
                        "Branch is too new, skipping"
                    );
                }
                RetentionDecision::InvalidTimestamp { reason } => {
                    warn!(
                        repo_name = repo,
                        branch = branch.name,
                        reason = reason,
                        "Could not parse last commit date, skipping branch"
                    );
                    report
                        .invalid_timestamps
                        .push(BranchRef::new(repo, &branch.name));
                }
            }
        }
    }
}

/// Initialize logging for cleanup operations.
///
/// The filter is read from `BB_CLEANER_LOG` and defaults to `info`.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
