//! Pipeline stages for turning one quiz image into a [`QuizExtraction`].
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap a backend (e.g. a different remote OCR service) without touching
//! the other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ local ──▶ remote ──▶ reconcile ──▶ postprocess ──▶ analyze
//! (bytes)  (tesseract) (vision)  (pick text)    (cleanup)     (quiz)
//!                        ▲
//!                      encode (base64)
//! ```
//!
//! 1. [`input`]: image payloads, batch jobs, path/URL resolution
//! 2. [`local`]: mandatory Tesseract pass; failures degrade to empty text
//! 3. [`encode`]: base64-wrap the image for the remote request body
//! 4. [`remote`]: optional Cloud Vision call; failures become a tagged
//!    outcome, never an error
//! 5. [`reconcile`]: remote text wins when non-empty, else local
//! 6. [`postprocess`]: line endings, invisible characters, trailing spaces
//! 7. [`analyze`]: question / options / answer heuristics
//!
//! [`QuizExtraction`]: crate::output::QuizExtraction

pub mod analyze;
pub mod encode;
pub mod input;
pub mod local;
pub mod postprocess;
pub mod reconcile;
pub mod remote;
