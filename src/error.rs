//! Error types shared by the store, the hotkey policy and the Tauri commands.
//!
//! Every variant serializes to `{ "kind": ..., "message": ... }` so a failed
//! command reaches the UI as a recoverable error object.

use serde::ser::SerializeStruct;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    /// Data directory or database file unavailable. Fatal at startup.
    #[error("failed to initialize folder store at {path}: {reason}")]
    StoreInit { path: String, reason: String },

    /// A store operation ran before `initialize` (or after `close`).
    #[error("folder store is not initialized")]
    StoreNotInitialized,

    #[error("folder already added: {path}")]
    DuplicatePath { path: String },

    #[error("hotkey {accelerator} is already in use or invalid")]
    HotkeyUnavailable { accelerator: String },

    /// Logged during initialization, never returned to the UI.
    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("lock poisoned: {context}")]
    LockPoisoned { context: String },

    #[error("shell integration failed: {0}")]
    Shell(String),

    #[error("update failed: {0}")]
    Update(String),
}

impl LauncherError {
    /// Stable machine-readable name used by the UI to pick a message.
    pub fn kind(&self) -> &'static str {
        match self {
            LauncherError::StoreInit { .. } => "storeInit",
            LauncherError::StoreNotInitialized => "storeNotInitialized",
            LauncherError::DuplicatePath { .. } => "duplicatePath",
            LauncherError::HotkeyUnavailable { .. } => "hotkeyUnavailable",
            LauncherError::Migration(_) => "migration",
            LauncherError::InvalidInput(_) => "invalidInput",
            LauncherError::Database(_) => "database",
            LauncherError::LockPoisoned { .. } => "lockPoisoned",
            LauncherError::Shell(_) => "shell",
            LauncherError::Update(_) => "update",
        }
    }

    /// Errors caused by what the user entered. The controller reports these
    /// as `{ success: false, message }` instead of failing the call.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            LauncherError::DuplicatePath { .. } | LauncherError::InvalidInput(_)
        )
    }
}

impl Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LauncherError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Converts a poisoned lock into `LauncherError::LockPoisoned`.
pub trait LockResultExt<T> {
    fn map_lock_err(self, context: &str) -> Result<T, LauncherError>;
}

impl<T> LockResultExt<T> for Result<T, std::sync::PoisonError<T>> {
    fn map_lock_err(self, context: &str) -> Result<T, LauncherError> {
        self.map_err(|_| LauncherError::LockPoisoned {
            context: context.to_string(),
        })
    }
}

pub type LauncherResult<T> = Result<T, LauncherError>;
