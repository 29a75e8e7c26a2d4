//! # quiz-ocr
//!
//! Turn photographed quiz pages into structured question / answer records.
//!
//! ## Why this crate?
//!
//! Photos of printed quizzes are noisy: mixed Latin and Vietnamese script,
//! skewed pages, option labels in several styles. A single OCR engine is
//! either always available but mediocre (Tesseract on the box) or accurate
//! but remote, paid for, and occasionally down (a cloud OCR API). This
//! crate runs both, keeps whichever text is usable, and then applies small
//! line-based heuristics to pull out the question, its options, and a
//! first guess at the answer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! primary image + 0..=9 auxiliary images
//!  │
//!  ├─ 1. Validate   primary present, count cap, size cap (nothing runs otherwise)
//!  │
//!  └─ for each image, in order
//!      ├─ 2. Local      Tesseract (eng+vie); failure → empty result
//!      ├─ 3. Remote     Cloud Vision if a key is set; failure → skipped
//!      ├─ 4. Reconcile  remote text wins when non-empty, else local
//!      ├─ 5. Cleanup    line endings, invisible characters
//!      └─ 6. Analyze    question, options, answer guess
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quiz_ocr::{extract_quiz_from_paths, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Cloud Vision is used when QUIZ_OCR_VISION_API_KEY is set.
//!     let config = ExtractionConfig::from_env();
//!     let batch = extract_quiz_from_paths("page1.jpg", &["page2.jpg"], &config).await?;
//!     for image in &batch.images {
//!         println!("{}: {}", image.file_name, image.extraction.question);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `quiz-ocr` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! quiz-ocr = { version = "0.1", default-features = false }
//! ```
//!
//! ## Answer detection
//!
//! The "correct answer" is the option labelled `A` (or `1`). It is a
//! starting point for a human to correct, not answer-key detection.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{BackendOutcome, OcrBackend, Provenance};
pub use batch::{extract_quiz, extract_quiz_from_paths, extract_quiz_sync, BackendStatus, QuizExtractor};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, RemoteConfig};
pub use error::{OcrError, QuizOcrError};
pub use output::{
    BatchResponse, BatchResult, ErrorResponse, ImageResult, ProcessedWith, QuizExtraction,
    QuizRecord, ReconciledResult, RecognitionResult,
};
pub use pipeline::analyze::{analyze_lines, analyze_quiz};
pub use pipeline::input::{ImageJob, ImagePayload, ImageSlot};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
