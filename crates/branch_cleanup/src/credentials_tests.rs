use super::*;
use secrecy::ExposeSecret;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_password_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp file");
    file
}

#[test]
fn test_load_app_password_reads_first_line_only() {
    let file = write_password_file("s3cr3t-app-password\nsecond line\n");

    let password = load_app_password(file.path()).expect("Failed to load password");
    assert_eq!(password.expose_secret(), "s3cr3t-app-password");
}

#[test]
fn test_load_app_password_without_trailing_newline() {
    let file = write_password_file("s3cr3t");

    let password = load_app_password(file.path()).expect("Failed to load password");
    assert_eq!(password.expose_secret(), "s3cr3t");
}

#[test]
fn test_load_app_password_strips_windows_line_ending() {
    let file = write_password_file("s3cr3t\r\n");

    let password = load_app_password(file.path()).expect("Failed to load password");
    assert_eq!(password.expose_secret(), "s3cr3t");
}

#[test]
fn test_load_app_password_missing_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(DEFAULT_PASSWORD_FILE);

    let result = load_app_password(&path);
    match result {
        Err(CredentialError::Unreadable { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Unreadable, got {other:?}"),
    }
}

#[test]
fn test_load_app_password_empty_file() {
    let file = write_password_file("");

    let result = load_app_password(file.path());
    assert!(matches!(result, Err(CredentialError::Empty { .. })));
}

#[test]
fn test_load_app_password_blank_first_line() {
    let file = write_password_file("\nactual-password-on-line-two\n");

    let result = load_app_password(file.path());
    assert!(matches!(result, Err(CredentialError::Empty { .. })));
}
