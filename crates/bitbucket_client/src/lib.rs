//! Crate for interacting with the Bitbucket Cloud 2.0 REST API.
//!
//! This crate provides a small client that lists the repositories of a
//! workspace, lists the branches of a repository and deletes branches. Every
//! request authenticates with HTTP Basic auth using a username and an app
//! password, and asks for repositories with the `contributor` role.
//!
//! The client performs each request exactly once. It has no retry, backoff or
//! rate-limit handling and leaves the decision about which failures are fatal
//! to the caller.

use reqwest::{header::ACCEPT, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{Branch, BranchListing, Page, Repository, RepositoryListing};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Base URL of the public Bitbucket Cloud API.
pub const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Page size requested when listing repositories.
pub const REPOSITORY_PAGE_LEN: u32 = 50;

/// Page size requested when listing branches.
pub const BRANCH_PAGE_LEN: u32 = 100;

const CONTRIBUTOR_ROLE: &str = "contributor";
const USER_AGENT: &str = concat!("bb-workspace-cleaner/", env!("CARGO_PKG_VERSION"));

/// Basic-auth credentials used for every request.
///
/// The app password is held as a [`SecretString`] so it never shows up in
/// `Debug` output or logs.
#[derive(Debug)]
pub struct Credentials {
    username: String,
    app_password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, app_password: SecretString) -> Self {
        Self {
            username: username.into(),
            app_password,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// How many pages a listing call reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pagination {
    /// Read only the first page. Larger collections are silently truncated.
    #[default]
    FirstPage,
    /// Follow the `next` link of every page until the collection is exhausted.
    AllPages,
}

/// A client for the Bitbucket API scoped to a single workspace.
#[derive(Debug)]
pub struct BitbucketClient {
    http: reqwest::Client,
    base_url: Url,
    organization: String,
    credentials: Credentials,
    pagination: Pagination,
}

impl BitbucketClient {
    /// Creates a client for `organization` talking to `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if `base_url` is not an absolute URL that
    /// can carry path segments, and `Error::Transport` if the underlying HTTP
    /// client cannot be built.
    pub fn new(
        base_url: &str,
        organization: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        let parsed = Url::parse(base_url).map_err(|source| Error::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                url: base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| Error::Transport {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: parsed,
            organization: organization.into(),
            credentials,
            pagination: Pagination::default(),
        })
    }

    /// Sets how many pages the listing calls read.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Lists the names of the repositories in the workspace that the
    /// authenticated user can access as a contributor.
    ///
    /// Names are returned in the order the API returned them. Only the
    /// entries actually present in the response are returned, whatever
    /// `size` the server reports.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport`, `Error::UnexpectedStatus` or
    /// `Error::Deserialization` if the listing cannot be fetched.
    #[instrument(skip(self), fields(org = %self.organization))]
    pub async fn list_repositories(&self) -> Result<Vec<String>, Error> {
        let url = self.endpoint(&["repositories", &self.organization])?;
        let repositories: Vec<Repository> =
            self.list_collection(url, REPOSITORY_PAGE_LEN).await?;

        info!(
            org = self.organization,
            count = repositories.len(),
            "Fetched repositories the user can access"
        );

        Ok(repositories.into_iter().map(|r| r.name).collect())
    }

    /// Lists the branches of `repo` together with their last commit dates.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport`, `Error::UnexpectedStatus` or
    /// `Error::Deserialization` if the listing cannot be fetched.
    #[instrument(skip(self), fields(org = %self.organization))]
    pub async fn list_branches(&self, repo: &str) -> Result<Vec<Branch>, Error> {
        let url = self.endpoint(&[
            "repositories",
            &self.organization,
            repo,
            "refs",
            "branches",
        ])?;
        let branches: Vec<Branch> = self.list_collection(url, BRANCH_PAGE_LEN).await?;

        info!(
            repo_name = repo,
            count = branches.len(),
            "Fetched branches of repository"
        );

        Ok(branches)
    }

    /// Deletes `branch` from `repo`.
    ///
    /// Bitbucket answers a successful deletion with `204 No Content`; every
    /// other status is treated as a rejection.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeletionRejected` for any status other than 204 and
    /// `Error::Transport` if no response was received.
    #[instrument(skip(self), fields(org = %self.organization))]
    pub async fn delete_branch(&self, repo: &str, branch: &str) -> Result<(), Error> {
        let mut url = self.endpoint(&[
            "repositories",
            &self.organization,
            repo,
            "refs",
            "branches",
            branch,
        ])?;
        url.query_pairs_mut().append_pair("role", CONTRIBUTOR_ROLE);

        let response = self.send(Method::DELETE, url).await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            info!(repo_name = repo, branch = branch, "Branch deleted");
            Ok(())
        } else {
            warn!(
                repo_name = repo,
                branch = branch,
                status = status.as_u16(),
                "Branch deletion was rejected"
            );
            Err(Error::DeletionRejected {
                branch: branch.to_string(),
                status: status.as_u16(),
            })
        }
    }

    /// Appends `segments` to the base URL. Each segment is percent-encoded
    /// as a whole, so `/`, `#` and `%` inside a name never change the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl {
                url: self.base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Reads one page, or every page when pagination is enabled, of a
    /// collection endpoint.
    async fn list_collection<T: DeserializeOwned>(
        &self,
        mut url: Url,
        page_len: u32,
    ) -> Result<Vec<T>, Error> {
        url.query_pairs_mut()
            .append_pair("role", CONTRIBUTOR_ROLE)
            .append_pair("pagelen", &page_len.to_string());

        let mut values = Vec::new();
        let mut next = Some(url);
        let mut page_number = 1u32;

        while let Some(url) = next.take() {
            debug!(url = %url, page = page_number, "Fetching page");
            let page: Page<T> = self.get_page(url).await?;

            if page.size_mismatch() {
                warn!(
                    reported = page.size,
                    received = page.values.len(),
                    "Reported collection size does not match the entries received"
                );
            }

            values.extend(page.values);

            if self.pagination == Pagination::AllPages {
                if let Some(link) = page.next {
                    next = Some(Url::parse(&link).map_err(|source| Error::InvalidUrl {
                        url: link.clone(),
                        source,
                    })?);
                    page_number += 1;
                }
            } else if page.next.is_some() {
                debug!(
                    page = page_number,
                    "More entries are available but only the first page is read"
                );
            }
        }

        Ok(values)
    }

    async fn get_page<T: DeserializeOwned>(&self, url: Url) -> Result<Page<T>, Error> {
        let url_text = url.to_string();
        let response = self.send(Method::GET, url).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                url: url_text,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| Error::Transport {
                url: url_text,
                source,
            })?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(&self, method: Method, url: Url) -> Result<reqwest::Response, Error> {
        let url_text = url.to_string();
        self.http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .basic_auth(
                self.credentials.username(),
                Some(self.credentials.app_password.expose_secret()),
            )
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: url_text,
                source,
            })
    }
}
