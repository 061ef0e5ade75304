//! Error types surfaced by the document store.
//!
//! Mirrors the split the spec calls for in its error-handling design: a
//! distinct variant per failure kind, with [`StoreError::RunFailed`] and
//! [`StoreError::InvalidBuildConfig`] treated identically by the build-file
//! state machine but differing in whether a diagnostic bundle was published.

use crate::uri::Uri;
use std::path::PathBuf;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{uri} is not a valid absolute path/URI: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("document exceeds max_document_size ({size} > {limit} bytes): {uri}")]
    DocumentTooLarge { uri: Uri, size: u64, limit: u64 },

    /// Covers both a non-zero exit and abnormal (e.g. signal) termination;
    /// `std::process::ExitStatus` already unifies the two.
    #[error("build runner for {build_file} exited with {status}")]
    RunFailed { build_file: Uri, status: std::process::ExitStatus, stderr: Vec<u8> },

    #[error("build runner stdout for {build_file} was not valid JSON: {source}")]
    InvalidBuildConfig { build_file: Uri, #[source] source: serde_json::Error },

    #[error("no zig executable configured")]
    NoZigExe,

    #[error("no build runner script configured")]
    NoBuildRunner,

    #[error("path is not absolute: {0}")]
    NotAbsolute(PathBuf),
}
