//! # Error Handling
//!
//! This module defines the centralized error type for `skill-sync`. It uses
//! `thiserror` to build a single `Error` enum whose variants carry enough
//! context (the failing path, command or registry entry) to be reported
//! directly to the user.
//!
//! Errors fall into two groups from the reconciler's point of view:
//!
//! - **Per-item failures**: a single `git submodule add`, a single output
//!   regeneration, and so on. The reconciler catches these, records them in
//!   its report and continues with the next item.
//! - **Environment failures**: unreadable registry, unreadable git metadata,
//!   a parent directory that cannot be created. These propagate with `?` and
//!   abort the operation.
//!
//! User cancellation is not an error; it is modelled as
//! [`crate::reconciler::Outcome::Cancelled`].

use thiserror::Error;

/// Main error type for skill-sync operations
#[derive(Error, Debug)]
pub enum Error {
    /// The registry file could not be parsed.
    ///
    /// Includes an optional hint about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The registry parsed but one of its entries is not usable.
    #[error("Invalid registry entry '{entry}': {message}")]
    InvalidRegistry { entry: String, message: String },

    /// A git command exited unsuccessfully or could not be spawned.
    #[error("Git command failed in {path}: git {command} - {stderr}")]
    GitCommand {
        command: String,
        path: String,
        stderr: String,
    },

    /// A filesystem capability operation failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// The interactive prompt backend failed (not a user cancellation).
    #[error("Prompt error: {message}")]
    Prompt { message: String },

    /// An interactive choice was required but prompts are disabled.
    #[error("Interactive input required for {action}, but prompts are disabled")]
    NonInteractive { action: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An error occurred during serialization.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Prompt {
            message: err.to_string(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
