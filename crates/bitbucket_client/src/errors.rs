//! Error types for Bitbucket client operations.
//!
//! The client never retries and never decides on its own whether a failure is
//! fatal. Every failure is surfaced as an [`Error`] and the caller chooses
//! whether to abort the run, skip a repository or skip a single branch.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while talking to the Bitbucket REST API.
///
/// ## Examples
///
/// ```rust,ignore
/// use bitbucket_client::Error;
///
/// match client.delete_branch("my-repo", "feature/old").await {
///     Ok(()) => println!("deleted"),
///     Err(Error::DeletionRejected { status, .. }) => eprintln!("rejected with {status}"),
///     Err(err) => eprintln!("request failed: {err}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced an HTTP response.
    ///
    /// Covers connection failures, DNS errors, TLS errors and failures while
    /// reading the response body.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A listing request returned a non-success status code.
    ///
    /// Bitbucket does not distinguish "not found" from "not allowed" for
    /// private workspaces, so no attempt is made to classify the status.
    #[error("Request to {url} returned unexpected status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    /// A branch delete request returned anything other than `204 No Content`.
    #[error("Deletion of branch {branch} was rejected with status {status}")]
    DeletionRejected { branch: String, status: u16 },

    /// The response body could not be decoded into the expected shape.
    #[error("Failed to deserialize Bitbucket response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A request URL could not be built from the base URL or a `next` link.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
