use super::*;
use std::error::Error as StdError;

#[test]
fn test_unexpected_status_error() {
    let error = Error::UnexpectedStatus {
        url: "https://api.bitbucket.org/2.0/repositories/acme".to_string(),
        status: 401,
    };

    assert_eq!(
        error.to_string(),
        "Request to https://api.bitbucket.org/2.0/repositories/acme returned unexpected status 401"
    );
    assert!(error.source().is_none());
}

#[test]
fn test_deletion_rejected_error() {
    let error = Error::DeletionRejected {
        branch: "feature/login".to_string(),
        status: 403,
    };

    assert_eq!(
        error.to_string(),
        "Deletion of branch feature/login was rejected with status 403"
    );
    assert!(error.source().is_none());
}

#[test]
fn test_deserialization_error_keeps_source() {
    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error = Error::from(json_error);

    assert!(error
        .to_string()
        .starts_with("Failed to deserialize Bitbucket response:"));
    assert!(error.source().is_some());
}

#[test]
fn test_invalid_url_error_keeps_source() {
    let parse_error = url::Url::parse("not a url").unwrap_err();
    let error = Error::InvalidUrl {
        url: "not a url".to_string(),
        source: parse_error,
    };

    assert!(error.to_string().starts_with("Invalid URL 'not a url':"));
    assert!(error.source().is_some());
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}
