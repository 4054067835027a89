use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Persisted login state
///
/// Access is a single shared token. Logging in checks it against the
/// configured value and stores it so later invocations can reuse it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
}

impl Session {
    /// Validates `token` and persists it to `path`
    pub fn login(path: &Path, token: &str, expected: Option<&str>) -> AppResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::InvalidInput("Token cannot be empty".to_string()));
        }

        let session = Self {
            token: token.to_string(),
        };
        session.verify(expected)?;

        std::fs::write(path, serde_json::to_vec_pretty(&session)?)?;
        tracing::info!(path = %path.display(), "Session stored");

        Ok(session)
    }

    /// Loads a stored session; a missing file means logged out
    pub fn load(path: &Path) -> AppResult<Option<Self>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the stored session, if any
    pub fn logout(path: &Path) -> AppResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Session removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Checks the token against the configured one
    ///
    /// With no configured token any non-empty token is accepted.
    pub fn verify(&self, expected: Option<&str>) -> AppResult<()> {
        match expected {
            Some(expected) if expected != self.token => Err(AppError::Unauthorized(
                "Access token does not match".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Loads and verifies the session that write commands run under
    pub fn require(path: &Path, expected: Option<&str>) -> AppResult<Self> {
        let session = Self::load(path)?.ok_or_else(|| {
            AppError::Unauthorized("Sign in first with `watchlog login <token>`".to_string())
        })?;
        session.verify(expected)?;
        Ok(session)
    }
}
