//! Loading of the Bitbucket app password from a local file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use secrecy::SecretString;
use tracing::info;

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;

/// Default location of the app password file, relative to the working directory.
pub const DEFAULT_PASSWORD_FILE: &str = "pass.txt";

/// Errors raised while reading the app password file.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The file does not exist or cannot be read.
    #[error("Failed to read app password file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The first line of the file is empty.
    #[error("App password file {path} does not contain a password on its first line")]
    Empty { path: PathBuf },
}

/// Reads the app password from the first line of `path`.
///
/// Anything after the first line is ignored. Trailing line terminators are
/// stripped, all other characters are kept as-is.
pub fn load_app_password(path: &Path) -> Result<SecretString, CredentialError> {
    let contents = fs::read_to_string(path).map_err(|source| CredentialError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let first_line = contents
        .lines()
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r');

    if first_line.is_empty() {
        return Err(CredentialError::Empty {
            path: path.to_path_buf(),
        });
    }

    info!(path = %path.display(), "App password loaded");
    Ok(SecretString::from(first_line.to_string()))
}
