//! Error types for the cards CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=document, 3=attachment, 4=remote, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for cards operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the exit code, JSON consumers on the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Document (exit 2)
    MalformedDocument,
    MetaMisalignment,

    // Attachment (exit 3)
    UnsupportedAttachment,
    AttachmentNotFound,

    // Remote state (exit 4)
    RemoteConsistency,
    DuplicateCardId,
    UnsupportedRemoteCard,

    // Remote call (exit 5)
    RemoteCallFailure,

    // Aborted by the user (exit 6)
    Aborted,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::MalformedDocument => "MALFORMED_DOCUMENT",
            Self::MetaMisalignment => "META_MISALIGNMENT",
            Self::UnsupportedAttachment => "UNSUPPORTED_ATTACHMENT",
            Self::AttachmentNotFound => "ATTACHMENT_NOT_FOUND",
            Self::RemoteConsistency => "REMOTE_CONSISTENCY",
            Self::DuplicateCardId => "DUPLICATE_CARD_ID",
            Self::UnsupportedRemoteCard => "UNSUPPORTED_REMOTE_CARD",
            Self::RemoteCallFailure => "REMOTE_CALL_FAILURE",
            Self::Aborted => "ABORTED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
        }
    }

    /// Category-based exit code (2-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedDocument | Self::MetaMisalignment => 2,
            Self::UnsupportedAttachment | Self::AttachmentNotFound => 3,
            Self::RemoteConsistency | Self::DuplicateCardId | Self::UnsupportedRemoteCard => 4,
            Self::RemoteCallFailure => 5,
            Self::Aborted => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether simply re-running `cards sync` is expected to make progress.
    ///
    /// Remote call failures are safe to replay: updates and deletions are
    /// idempotent and at most one creation is duplicated per interrupted run.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteCallFailure | Self::Aborted)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in cards operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed document {}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("Unsupported attachment: {}", path.display())]
    UnsupportedAttachment { path: PathBuf },

    #[error("Attachment not found: {}", path.display())]
    AttachmentNotFound { path: PathBuf },

    #[error("Card {id} is known locally but missing from the remote deck")]
    RemoteConsistency { id: String },

    #[error("Card {id} is claimed by more than one document")]
    DuplicateCardId { id: String },

    #[error("Remote card {id} is not supported: {reason}")]
    UnsupportedRemoteCard { id: String, reason: String },

    #[error("Remote call {method} {url} failed with status {status}: {body}")]
    RemoteCall {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Backward id of {} has no reverse prompt left", path.display())]
    MetaMisalignment { path: PathBuf },

    #[error("Aborted")]
    Aborted,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a parse-time failure of a single document.
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Fill in the document path of a `MalformedDocument` raised without one.
    #[must_use]
    pub fn in_document(self, document: &Path) -> Self {
        match self {
            Self::MalformedDocument { path, reason } if path.as_os_str().is_empty() => {
                Self::MalformedDocument {
                    path: document.to_path_buf(),
                    reason,
                }
            }
            other => other,
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::MalformedDocument { .. } => ErrorCode::MalformedDocument,
            Self::MetaMisalignment { .. } => ErrorCode::MetaMisalignment,
            Self::UnsupportedAttachment { .. } => ErrorCode::UnsupportedAttachment,
            Self::AttachmentNotFound { .. } => ErrorCode::AttachmentNotFound,
            Self::RemoteConsistency { .. } => ErrorCode::RemoteConsistency,
            Self::DuplicateCardId { .. } => ErrorCode::DuplicateCardId,
            Self::UnsupportedRemoteCard { .. } => ErrorCode::UnsupportedRemoteCard,
            Self::RemoteCall { .. } | Self::Http(_) => ErrorCode::RemoteCallFailure,
            Self::Aborted => ErrorCode::Aborted,
            Self::Config(_) | Self::Toml(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::MalformedDocument { .. } => Some(
                "A card needs exactly one `---` divider between question and answer, \
                 and at most one `! prompt` paragraph per page."
                    .to_string(),
            ),

            Self::UnsupportedAttachment { .. } => {
                Some("Only .png, .jpg and .jpeg images can be attached.".to_string())
            }

            Self::AttachmentNotFound { .. } => Some(
                "Image paths are resolved relative to the folder of the document.".to_string(),
            ),

            Self::RemoteConsistency { id } => Some(format!(
                "Card {id} was deleted on the remote side. Remove the id from the document, \
                 or set `on_missing_remote = \"recreate\"` in config.toml."
            )),

            Self::DuplicateCardId { id } => Some(format!(
                "Search your documents for '{id}' and keep it in one place only."
            )),

            Self::RemoteCall { .. } | Self::Http(_) => Some(
                "Nothing is retried automatically. Re-running `cards sync` is safe.".to_string(),
            ),

            Self::MetaMisalignment { path } => Some(format!(
                "Confirm the realignment, or add a reverse prompt back to {}.",
                path.display()
            )),

            Self::Config(_) | Self::Toml(_) => Some(
                "Check config.toml and credentials.toml in the base directory (see --base)."
                    .to_string(),
            ),

            Self::UnsupportedRemoteCard { .. }
            | Self::Aborted
            | Self::Io(_)
            | Self::Json(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
