//! Recognition backend abstraction.
//!
//! Every OCR engine (the on-device Tesseract pass, the optional Cloud
//! Vision call) implements [`OcrBackend`]. The orchestrator only
//! ever holds `Arc<dyn OcrBackend>`, so tests can swap in mock backends
//! that count calls or simulate failures without touching the pipeline.
//!
//! A backend's answer for one image is reported as a [`BackendOutcome`]:
//! an explicit tag the reconciler matches on, instead of null checks and
//! caught exceptions deciding which text wins.

use crate::error::OcrError;
use crate::output::RecognitionResult;
use crate::pipeline::input::ImageJob;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which backend produced a [`RecognitionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Local Tesseract engine.
    Tesseract,
    /// Google Cloud Vision API.
    CloudVision,
    /// The local engine failed and its result was degraded to empty text.
    LocalError,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Tesseract => "tesseract",
            Provenance::CloudVision => "cloud-vision",
            Provenance::LocalError => "local-error",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for OCR backends.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Tag stamped on every result this backend produces.
    fn provenance(&self) -> Provenance;

    /// Whether the backend can run at all (binary installed, credential set).
    fn is_available(&self) -> bool;

    /// What is needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Run OCR over one image.
    async fn recognize(&self, image: &ImageJob) -> Result<RecognitionResult, OcrError>;
}

/// What a single backend contributed for one image.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutcome {
    /// The backend answered.
    Recognized(RecognitionResult),
    /// The backend was skipped (not configured, credential missing).
    Unavailable(String),
    /// The backend ran and failed (network, provider error, timeout).
    Failed(String),
}

impl BackendOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            BackendOutcome::Recognized(_) => "recognized",
            BackendOutcome::Unavailable(_) => "unavailable",
            BackendOutcome::Failed(_) => "failed",
        }
    }
}
