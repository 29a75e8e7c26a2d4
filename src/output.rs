//! Result types produced by the extraction pipeline.
//!
//! Everything here is request-scoped: built while a batch runs, handed to
//! the caller, and never retained by the library. Persisting quizzes is
//! the caller's business.

use crate::backend::Provenance;
use crate::error::QuizOcrError;
use crate::pipeline::postprocess::INVISIBLE_CHARS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output of a single OCR backend for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Extracted text, possibly empty.
    pub text: String,
    /// Engine-defined confidence in `[0, 1]`. Not comparable across backends.
    pub confidence: f32,
    /// Which backend produced this result.
    pub provenance: Provenance,
    /// Wall-clock time spent in the backend.
    pub duration_ms: u64,
}

impl RecognitionResult {
    pub fn new(text: impl Into<String>, confidence: f32, provenance: Provenance) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            provenance,
            duration_ms: 0,
        }
    }

    /// The degraded local result: empty text, zero confidence.
    pub fn degraded() -> Self {
        Self::new(String::new(), 0.0, Provenance::LocalError)
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    /// True when the text carries at least one visible character.
    ///
    /// Whitespace and the zero-width characters stripped by cleanup do not
    /// count.
    pub fn has_text(&self) -> bool {
        self.text
            .chars()
            .any(|c| !c.is_whitespace() && !INVISIBLE_CHARS.contains(&c))
    }
}

/// Which sources contributed to a reconciled result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessedWith {
    /// Only the local engine's text was usable (remote skipped or failed).
    #[serde(rename = "local")]
    Local,
    /// The remote provider's text won while the local engine also ran.
    #[serde(rename = "remote+local")]
    RemoteWithLocal,
}

impl ProcessedWith {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedWith::Local => "local",
            ProcessedWith::RemoteWithLocal => "remote+local",
        }
    }
}

impl fmt::Display for ProcessedWith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The winning text for one image after reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledResult {
    pub text: String,
    /// Confidence of whichever source's text was selected. Never blended.
    pub confidence: f32,
    pub processed_with: ProcessedWith,
    /// Set when neither backend produced usable text (`text` is empty,
    /// `confidence` is 0).
    pub no_text: bool,
}

/// Structured quiz content parsed from recognised text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizExtraction {
    /// First question-like line, else the first line, else empty.
    pub question: String,
    /// Detected options in source order; placeholders when none detected.
    /// Never empty.
    pub options: Vec<String>,
    /// Always a member of `options`.
    pub correct_answer: String,
    /// Count of non-empty lines in the analysed text.
    pub total_lines: usize,
}

/// Per-image outcome of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub file_name: String,
    /// 0 for the primary image, 1.. for auxiliary images.
    pub position: usize,
    /// Cleaned text the extraction was derived from, kept so a reviewer can
    /// check the answer guess against it.
    pub text: String,
    /// Neither backend produced usable text.
    pub no_text: bool,
    pub extraction: QuizExtraction,
    pub confidence: f32,
    pub processed_with: ProcessedWith,
    pub duration_ms: u64,
}

/// All results for one batch, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub images: Vec<ImageResult>,
    pub processed_at: DateTime<Utc>,
    pub total_duration_ms: u64,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Convert into the record list returned across an HTTP boundary.
    pub fn to_response(&self) -> BatchResponse {
        BatchResponse {
            results: self.images.iter().map(QuizRecord::from).collect(),
            timestamp: self.processed_at,
        }
    }
}

/// One serialised image result: the wire shape callers store or return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub file_name: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub confidence: f32,
    pub processed_with: ProcessedWith,
    pub total_lines: usize,
    pub text: String,
    pub no_text: bool,
}

impl From<&ImageResult> for QuizRecord {
    fn from(r: &ImageResult) -> Self {
        Self {
            file_name: r.file_name.clone(),
            question: r.extraction.question.clone(),
            options: r.extraction.options.clone(),
            correct_answer: r.extraction.correct_answer.clone(),
            confidence: r.confidence,
            processed_with: r.processed_with,
            total_lines: r.extraction.total_lines,
            text: r.text.clone(),
            no_text: r.no_text,
        }
    }
}

/// Successful batch response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<QuizRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Failure response body: a stable message plus optional diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&QuizOcrError> for ErrorResponse {
    fn from(e: &QuizOcrError) -> Self {
        Self {
            error: e.user_message().to_string(),
            details: e.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> ImageResult {
        ImageResult {
            file_name: "page1.jpg".into(),
            position: 0,
            text: "Question: What is 2+2?\nA. 3\nB. 4".into(),
            no_text: false,
            extraction: QuizExtraction {
                question: "Question: What is 2+2?".into(),
                options: vec!["3".into(), "4".into()],
                correct_answer: "3".into(),
                total_lines: 3,
            },
            confidence: 0.9,
            processed_with: ProcessedWith::RemoteWithLocal,
            duration_ms: 12,
        }
    }

    #[test]
    fn record_serialises_with_boundary_field_names() {
        let record = QuizRecord::from(&sample_image());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fileName"], "page1.jpg");
        assert_eq!(json["correctAnswer"], "3");
        assert_eq!(json["processedWith"], "remote+local");
        assert_eq!(json["totalLines"], 3);
        assert_eq!(json["text"], "Question: What is 2+2?\nA. 3\nB. 4");
        assert_eq!(json["noText"], false);
    }

    #[test]
    fn response_preserves_order_and_timestamp() {
        let mut second = sample_image();
        second.file_name = "page2.jpg".into();
        second.position = 1;
        let batch = BatchResult {
            images: vec![sample_image(), second],
            processed_at: Utc::now(),
            total_duration_ms: 40,
        };
        let response = batch.to_response();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[1].file_name, "page2.jpg");
        assert_eq!(response.timestamp, batch.processed_at);
    }

    #[test]
    fn error_response_omits_missing_details() {
        let resp = ErrorResponse::from(&QuizOcrError::NoPrimaryImage);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("details"), "got: {json}");
    }

    #[test]
    fn recognition_confidence_is_clamped() {
        let r = RecognitionResult::new("x", 1.7, Provenance::CloudVision);
        assert_eq!(r.confidence, 1.0);
        assert!(!RecognitionResult::degraded().has_text());
    }

    #[test]
    fn zero_width_text_is_not_text() {
        let r = RecognitionResult::new("\u{200B} \u{FEFF}\n", 0.9, Provenance::CloudVision);
        assert!(!r.has_text());
        let r = RecognitionResult::new("\u{200B}x", 0.9, Provenance::CloudVision);
        assert!(r.has_text());
    }
}
