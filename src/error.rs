//! Error types for the quiz-ocr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`QuizOcrError`] (**hard**): the batch cannot proceed at all (no
//!   primary image, too many images, an internal fault while processing).
//!   Returned as `Err(QuizOcrError)` from the top-level `extract*` functions
//!   and from [`crate::batch::QuizExtractor::process_batch`].
//!
//! * [`OcrError`] (**soft**): a single recognition backend failed (binary
//!   missing, network error, timeout). It never leaves the pipeline: the
//!   local stage degrades to an empty result and the remote stage turns it
//!   into [`crate::backend::BackendOutcome::Failed`].
//!
//! Every hard error carries a stable user-facing message
//! ([`QuizOcrError::user_message`]) that is distinct from its diagnostic
//! detail ([`QuizOcrError::details`]), plus an HTTP-equivalent status code
//! for callers that put the batch behind a web endpoint.

use crate::backend::Provenance;
use std::path::PathBuf;
use thiserror::Error;

/// All hard errors returned by the quiz-ocr library.
///
/// Backend-level failures use [`OcrError`] and are absorbed by the
/// pipeline rather than propagated here.
#[derive(Debug, Error)]
pub enum QuizOcrError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The request carried no primary image.
    #[error("No primary image supplied")]
    NoPrimaryImage,

    /// More auxiliary images than the configured cap.
    #[error("Too many auxiliary images: {count} supplied, at most {max} allowed")]
    TooManyImages { count: usize, max: usize },

    /// One image exceeds the per-image size limit.
    #[error("Image '{file_name}' is {size} bytes, limit is {max} bytes")]
    ImageTooLarge {
        file_name: String,
        size: usize,
        max: usize,
    },

    // ── Input resolution errors ───────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected fault inside the analyzer or the orchestration itself.
    #[error("Internal error while {context}: {detail}")]
    Internal { context: String, detail: String },
}

impl QuizOcrError {
    pub(crate) fn internal(context: impl Into<String>, detail: impl ToString) -> Self {
        QuizOcrError::Internal {
            context: context.into(),
            detail: detail.to_string(),
        }
    }

    /// Stable, user-facing message. Does not change with the underlying cause.
    pub fn user_message(&self) -> &'static str {
        match self {
            QuizOcrError::NoPrimaryImage => "No image uploaded",
            QuizOcrError::TooManyImages { .. } => "Too many images in one request",
            QuizOcrError::ImageTooLarge { .. } => "Image exceeds the size limit",
            QuizOcrError::FileNotFound { .. } | QuizOcrError::PermissionDenied { .. } => {
                "Image file could not be read"
            }
            QuizOcrError::DownloadFailed { .. } | QuizOcrError::DownloadTimeout { .. } => {
                "Image could not be downloaded"
            }
            QuizOcrError::InvalidConfig(_) => "Service is misconfigured",
            QuizOcrError::Internal { .. } => "Failed to process image",
        }
    }

    /// Diagnostic detail for logs and the `details` field of error responses.
    pub fn details(&self) -> Option<String> {
        match self {
            QuizOcrError::NoPrimaryImage => None,
            QuizOcrError::Internal { detail, .. } => Some(detail.clone()),
            other => Some(other.to_string()),
        }
    }

    /// HTTP-equivalent failure status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            QuizOcrError::NoPrimaryImage | QuizOcrError::TooManyImages { .. } => 400,
            QuizOcrError::FileNotFound { .. } => 404,
            QuizOcrError::PermissionDenied { .. } => 403,
            QuizOcrError::ImageTooLarge { .. } => 413,
            QuizOcrError::InvalidConfig(_) => 422,
            QuizOcrError::DownloadFailed { .. } => 502,
            QuizOcrError::DownloadTimeout { .. } => 504,
            QuizOcrError::Internal { .. } => 500,
        }
    }
}

/// A soft error from a single recognition backend.
///
/// Produced by [`crate::backend::OcrBackend::recognize`] and absorbed by
/// the local and remote pipeline stages.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The backend cannot run at all (missing binary, missing credential).
    #[error("Backend not available: {0}")]
    Unavailable(String),

    /// The backend ran but reported a failure.
    #[error("{backend} failed: {detail}")]
    Failed { backend: Provenance, detail: String },

    /// The backend did not answer within its time budget.
    #[error("{backend} timed out after {secs}s")]
    Timeout { backend: Provenance, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
