//! Shared password gate.
//!
//! Access to the tool is protected by a single shared password: the
//! `password` file holds the SHA-512 hex digest of the passphrase, and
//! user input is hashed and compared against it. There are no per-user
//! accounts and no lockout policy.

use anyhow::{Context, Result};
use sha2::{Digest, Sha512};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures raised by the password gate.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The password file is absent and `--insecure` was not given.
    #[error("no password file found at \"{0}\" (run with --insecure to skip the password check)")]
    MissingPasswordFile(PathBuf),
}

/// Holds the expected password digest for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct PasswordGate {
    digest: String,
}

impl PasswordGate {
    /// Load the stored digest from a password file.
    ///
    /// The file content is trimmed and lowercased, tolerating editors that
    /// append a trailing newline or uppercase the hex.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AuthError::MissingPasswordFile(path.to_path_buf()).into());
        }

        let digest = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read password file: {}", path.display()))?;

        Ok(Self {
            digest: digest.trim().to_lowercase(),
        })
    }

    /// Check user-entered text against the stored digest.
    pub fn verify(&self, input: &str) -> bool {
        Self::hash(input) == self.digest
    }

    /// SHA-512 hex digest of a passphrase.
    ///
    /// Also the helper operators use to produce the password file:
    /// `echo -n "passphrase" | sha512sum > password`.
    pub fn hash(plain: &str) -> String {
        hex::encode(Sha512::digest(plain.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_password_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_verify_accepts_matching_passphrase() {
        let file = write_password_file(&PasswordGate::hash("hunter2"));
        let gate = PasswordGate::load(file.path()).unwrap();

        assert!(gate.verify("hunter2"));
        assert!(!gate.verify("hunter3"));
        assert!(!gate.verify(""));
    }

    #[test]
    fn test_load_tolerates_trailing_newline_and_case() {
        let digest = PasswordGate::hash("hunter2").to_uppercase();
        let file = write_password_file(&format!("{}\n", digest));
        let gate = PasswordGate::load(file.path()).unwrap();

        assert!(gate.verify("hunter2"));
    }

    #[test]
    fn test_missing_file_is_an_auth_error() {
        let err = PasswordGate::load(Path::new("/nonexistent/password")).unwrap_err();
        assert!(err.downcast_ref::<AuthError>().is_some());
    }

    #[test]
    fn test_hash_is_hex_sha512() {
        let digest = PasswordGate::hash("anything");
        assert_eq!(digest.len(), 128);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
