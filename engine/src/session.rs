//! Durable storage for the credentials issued at login.
//!
//! The store is injected into whatever needs it; nothing reaches for ambient
//! global state. Logout clears it wholesale.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;

use shopfront_types::AuthTokens;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O failed at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("session file at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait SessionStore: Send + Sync {
    fn set(&self, tokens: &AuthTokens) -> Result<(), SessionError>;
    fn get(&self) -> Result<Option<AuthTokens>, SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// In-process store; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    tokens: Mutex<Option<AuthTokens>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn set(&self, tokens: &AuthTokens) -> Result<(), SessionError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn get(&self) -> Result<Option<AuthTokens>, SessionError> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file store, written with a temp file + rename so a crash never
/// leaves a half-written session behind.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<(), SessionError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| self.io_error(e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }
        tmp.write_all(bytes).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn set(&self, tokens: &AuthTokens) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec_pretty(tokens)?;
        self.write_atomic(&bytes)?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn get(&self) -> Result<Option<AuthTokens>, SessionError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| SessionError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
