//! Error types for the edgequake-imgconvert library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ImgConvertError`]: **Fatal** for the operation that raised it: the
//!   intake, request build, submission, or download cannot proceed. Nothing
//!   is mutated when a validation variant is returned.
//!
//! * [`ProbeError`]: **Non-fatal**: reading or decoding a single file
//!   failed, but the file is still admitted (without preview or dimensions).
//!   Stored inside [`crate::intake::FileRecord`] so callers can show what
//!   went wrong per file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-imgconvert library.
#[derive(Debug, Error)]
pub enum ImgConvertError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// No files were supplied.
    #[error("No files selected")]
    NoFiles,

    /// Files were supplied but none of them is an image.
    #[error("Please select image files only (JPG, PNG, etc.); got: {}", names.join(", "))]
    NoImageFiles { names: Vec<String> },

    /// At least one image exceeds the size limit; the whole batch is rejected.
    #[error(
        "Some files exceed the maximum size of {} MB: {}",
        limit_bytes / (1024 * 1024),
        names.join(", ")
    )]
    FilesTooLarge { names: Vec<String>, limit_bytes: u64 },

    /// Requested width or height is outside `1..=max`.
    #[error("{axis} must be between 1 and {max} pixels, got {value}")]
    DimensionOutOfRange {
        axis: Axis,
        value: u32,
        max: u32,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Network / server errors ───────────────────────────────────────────
    /// The upload request could not be sent or the connection dropped.
    #[error("Upload to '{url}' failed: {reason}\nCheck the server is reachable.")]
    RequestFailed { url: String, reason: String },

    /// The upload did not complete within the configured timeout.
    #[error("Upload timed out after {secs}s for '{url}'\nIncrease --timeout.")]
    RequestTimeout { url: String, secs: u64 },

    /// The caller cancelled the request before it completed.
    #[error("Upload to '{url}' was cancelled")]
    Cancelled { url: String },

    /// The server answered with an error payload or a non-2xx status.
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// The server answered 2xx but the body is not a response we understand.
    #[error("Unexpected server response: {detail}")]
    InvalidResponse { detail: String },

    // ── Download errors ───────────────────────────────────────────────────
    /// Fetching a converted file failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The embedded archive payload is not valid hex.
    #[error("Error downloading the ZIP file '{filename}': {detail}")]
    InvalidArchive { filename: String, detail: String },

    /// Could not create or write a downloaded file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImgConvertError {
    /// `true` for errors raised before any state was touched or any request
    /// was sent (the caller should fix its input rather than retry).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ImgConvertError::NoFiles
                | ImgConvertError::NoImageFiles { .. }
                | ImgConvertError::FilesTooLarge { .. }
                | ImgConvertError::DimensionOutOfRange { .. }
                | ImgConvertError::InvalidConfig(_)
        )
    }

    /// The message shown to a user when a submission fails.
    ///
    /// Server-reported messages are passed through verbatim; everything else
    /// uses the `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            ImgConvertError::ServerError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Which dimension a [`ImgConvertError::DimensionOutOfRange`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    Width,
    Height,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Width => f.write_str("Width"),
            Axis::Height => f.write_str("Height"),
        }
    }
}

/// A non-fatal error for a single file's probe.
///
/// The file is still admitted; the field the probe would have filled stays
/// `None`.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ProbeError {
    /// The file's bytes could not be read.
    #[error("{name}: could not read file: {detail}")]
    ReadFailed { name: String, detail: String },

    /// The bytes were read but the image header could not be decoded.
    #[error("{name}: could not determine dimensions: {detail}")]
    DecodeFailed { name: String, detail: String },
}
