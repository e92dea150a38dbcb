//! Delete stale branches across a Bitbucket workspace.
//!
//! Walks every repository the user can contribute to and deletes branches
//! whose last commit is older than the given number of months. It's designed
//! to be run from a scheduled job or manually for maintenance.
//!
//! Usage:
//!   bb-workspace-cleaner --user <user> --organization <organization> [--months <months>]
//!
//! The Bitbucket app password is read from the first line of `pass.txt` in the
//! working directory unless `--password-file` points elsewhere.

use std::path::PathBuf;

use bitbucket_client::Pagination;
use branch_cleanup::{
    retention::{DEFAULT_PROTECTED_BRANCHES, DEFAULT_THRESHOLD_MONTHS},
    BranchCleanup, CleanupConfig, CleanupReport, RetentionPolicy,
};
use clap::Parser;
use tracing::error;

#[cfg(test)]
#[path = "bb_workspace_cleaner_tests.rs"]
mod tests;

/// Delete branches that have not been updated for a number of months
#[derive(Debug, Parser)]
#[command(name = "bb-workspace-cleaner")]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Username of the Bitbucket account
    #[arg(long, short = 'u')]
    user: String,

    /// Name of the organization (workspace) to clean
    #[arg(long, short = 'o')]
    organization: String,

    /// Minimum age in months of the last commit before a branch is deleted
    #[arg(long, short = 'm', default_value_t = DEFAULT_THRESHOLD_MONTHS)]
    months: u32,

    /// File whose first line holds the Bitbucket app password
    #[arg(long, default_value = branch_cleanup::DEFAULT_PASSWORD_FILE)]
    password_file: PathBuf,

    /// Base URL of the Bitbucket API
    #[arg(long, default_value = bitbucket_client::DEFAULT_BASE_URL)]
    base_url: String,

    /// Additional branch name that is never deleted (repeatable). `master`
    /// and `staging` are always protected unless `--no-default-protected`
    /// is given.
    #[arg(long = "protected", value_name = "BRANCH")]
    protected: Vec<String>,

    /// Do not protect `master` and `staging` by default
    #[arg(long)]
    no_default_protected: bool,

    /// Report stale branches without deleting them
    #[arg(long)]
    dry_run: bool,

    /// Follow pagination links instead of reading only the first page
    #[arg(long)]
    all_pages: bool,
}

impl CliArgs {
    fn into_config(self) -> CleanupConfig {
        let policy = RetentionPolicy::new(self.months, self.protected_branches());
        let mut config = CleanupConfig::new(self.user, self.organization);
        config.base_url = self.base_url;
        config.password_file = self.password_file;
        config.policy = policy;
        config.dry_run = self.dry_run;
        config.pagination = if self.all_pages {
            Pagination::AllPages
        } else {
            Pagination::FirstPage
        };
        config
    }

    fn protected_branches(&self) -> Vec<String> {
        let defaults: &[&str] = if self.no_default_protected {
            &[]
        } else {
            &DEFAULT_PROTECTED_BRANCHES
        };

        defaults
            .iter()
            .map(|name| name.to_string())
            .chain(self.protected.iter().cloned())
            .collect()
    }
}

#[tokio::main]
async fn main() {
    branch_cleanup::init_logging();

    let config = CliArgs::parse().into_config();

    if let Err(e) = run(&config).await {
        error!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: &CleanupConfig) -> anyhow::Result<()> {
    println!("🧹 Bitbucket Workspace Branch Cleanup");
    println!("=====================================");
    println!();
    println!("📋 Configuration:");
    println!("   User: {}", config.user);
    println!("   Organization: {}", config.organization);
    println!("   Max age: {} months", config.policy.threshold_months());
    println!(
        "   Protected branches: {}",
        config.policy.protected_branches().collect::<Vec<_>>().join(", ")
    );
    if config.dry_run {
        println!("   Dry run: no branch will be deleted");
    }
    println!();

    let cleanup = BranchCleanup::from_config(config)?;

    println!("🔍 Searching for stale branches...");
    let report = cleanup.run().await?;

    print_summary(&report, config);
    Ok(())
}

fn print_summary(report: &CleanupReport, config: &CleanupConfig) {
    println!();
    println!("✅ Cleanup completed!");
    println!("   Scanned {} repositories", report.repositories_scanned);

    if config.dry_run {
        println!("   {} branches would be deleted", report.would_delete.len());
        for target in &report.would_delete {
            println!("   - {}/{}", target.repository, target.branch);
        }
        return;
    }

    println!("   Deleted {} branches", report.deleted.len());
    if !report.deleted.is_empty() {
        println!();
        println!("📋 Deleted branches:");
        for target in &report.deleted {
            println!("   - {}/{}", target.repository, target.branch);
        }
    } else {
        println!(
            "   No branches found older than {} months",
            config.policy.threshold_months()
        );
    }

    if !report.failed.is_empty() {
        println!();
        println!("⚠️  Failed deletions:");
        for failure in &report.failed {
            println!(
                "   - {}/{}: {}",
                failure.target.repository, failure.target.branch, failure.reason
            );
        }
    }

    if !report.skipped_repositories.is_empty() {
        println!();
        println!("⚠️  Skipped repositories:");
        for skipped in &report.skipped_repositories {
            println!("   - {}: {}", skipped.repository, skipped.reason);
        }
    }
}
