// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of every failure the tool can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// CSRF or login request rejected
    Authentication,
    /// Unexpected status code or missing/malformed response field
    RemoteProtocol,
    /// Connection-level failure (DNS, TLS, timeout, reset)
    Transport,
    /// Byte transfer to the signed URL rejected
    Upload,
    /// Local file is not an audio file
    UnsupportedFileType,
    /// Remote processing reached a state the workflow cannot continue from
    UnhandledState,
    /// Missing or invalid configuration
    Configuration,
    /// Local filesystem failure
    Io,
}

impl ErrorKind {
    /// Whether trying the same operation again could plausibly succeed.
    ///
    /// Informational only: transport failures are reported, not retried.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transport)
    }
}

/// Errors that can occur while loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Errors raised by the remote session client
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Authentication failed during {step}, status code: {status}")]
    Authentication { step: &'static str, status: u16 },

    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to {operation}, status code: {status}")]
    HttpStatus { operation: &'static str, status: u16 },

    #[error("Unexpected response while trying to {operation}: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unknown audio processing state '{0}'")]
    UnknownProcessingState(String),

    #[error("PUT method not allowed by signed upload URL (allowed: '{allowed}')")]
    MethodNotAllowed { allowed: String },

    #[error("Failed to upload audio stream, status code: {status}")]
    Upload { status: u16 },

    #[error("Failed to read audio file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RemoteError::Authentication { .. } => ErrorKind::Authentication,
            RemoteError::HttpFailed { .. } => ErrorKind::Transport,
            RemoteError::HttpStatus { .. }
            | RemoteError::MalformedResponse { .. }
            | RemoteError::InvalidUrl(_)
            | RemoteError::UnknownProcessingState(_)
            | RemoteError::MethodNotAllowed { .. } => ErrorKind::RemoteProtocol,
            RemoteError::Upload { .. } => ErrorKind::Upload,
            RemoteError::FileReadFailed { .. } => ErrorKind::Io,
        }
    }
}

/// Errors that abort publishing a single file
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Cannot determine MIME type for {0}")]
    UnknownFileType(PathBuf),

    #[error("Invalid MIME type {mime_type} for {path}")]
    UnsupportedFileType { path: PathBuf, mime_type: String },

    #[error("Failed to open audio file {path}: {source}")]
    FileOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unhandled audio stream state: {0}")]
    UnhandledState(String),

    #[error("Could not find library item, audioId: {0}")]
    LibraryItemMissing(String),

    #[error("Gave up waiting for {stage} after {attempts} attempts")]
    PollingTimedOut { stage: &'static str, attempts: u32 },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::UnknownFileType(_) | PublishError::UnsupportedFileType { .. } => {
                ErrorKind::UnsupportedFileType
            }
            PublishError::FileOpenFailed { .. } => ErrorKind::Io,
            PublishError::UnhandledState(_) | PublishError::PollingTimedOut { .. } => {
                ErrorKind::UnhandledState
            }
            PublishError::LibraryItemMissing(_) => ErrorKind::RemoteProtocol,
            PublishError::Remote(e) => e.kind(),
        }
    }
}

/// Errors that abort a whole profile
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to set up HTTP client: {0}")]
    ClientSetup(#[from] reqwest::Error),

    #[error("Failed to scan {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ProfileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProfileError::ClientSetup(_) => ErrorKind::Transport,
            ProfileError::Discovery { .. } => ErrorKind::Io,
            ProfileError::Remote(e) => e.kind(),
        }
    }
}
