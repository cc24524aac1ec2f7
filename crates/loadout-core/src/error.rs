use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration and precondition errors. Any of these aborts the
/// whole serialize/restore before further I/O.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no loadout repository at {} (run `loadout init` first)", .0.display())]
    NotInitialized(PathBuf),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("profile already exists: {0}")]
    ProfileExists(String),

    #[error("invalid profile name {0:?}: must be 1-64 characters of [A-Za-z0-9._-]")]
    InvalidProfileName(String),

    #[error("cyclic profile inheritance: {}", .chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    #[error("sync settings file for profile {0} can not be found")]
    SyncSettingsNotFound(String),

    #[error("invalid document {}: {reason}", .path.display())]
    InvalidDocument { path: PathBuf, reason: String },
}

/// A JSON-with-comments document could not be tokenized or is not an object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed JSON document at byte {offset}: {reason}")]
pub struct JsoncError {
    pub offset: usize,
    pub reason: String,
}

impl JsoncError {
    pub(crate) fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}
