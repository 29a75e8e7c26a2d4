//! Remote recognition: Google Cloud Vision `images:annotate`.
//!
//! The provider is opportunistic. It only runs when an API key is
//! configured, and every way it can go wrong (no key, transport error,
//! HTTP error, provider-side error, undecodable body, timeout) ends as a
//! [`BackendOutcome`] rather than an error, so the batch never fails
//! because of it.

use crate::backend::{BackendOutcome, OcrBackend, Provenance};
use crate::config::RemoteConfig;
use crate::error::OcrError;
use crate::output::RecognitionResult;
use crate::pipeline::encode::encode_image;
use crate::pipeline::input::ImageJob;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cloud Vision OCR provider.
pub struct CloudVisionProvider {
    config: RemoteConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest {
    image: VisionImage,
    features: Vec<VisionFeature>,
    image_context: ImageContext,
}

#[derive(Debug, Serialize)]
struct VisionImage {
    content: String,
}

#[derive(Debug, Serialize)]
struct VisionFeature {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<VisionPage>,
}

#[derive(Debug, Deserialize)]
struct VisionPage {
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct VisionStatus {
    #[serde(default)]
    message: String,
}

impl CloudVisionProvider {
    pub fn new(config: RemoteConfig) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::Failed {
                backend: Provenance::CloudVision,
                detail: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn build_request(&self, image: &ImageJob) -> AnnotateRequest {
        let encoded = encode_image(image.data());
        debug!(
            "cloud-vision: sending {} ({}) as {}",
            image.file_name(),
            encoded.mime_type,
            self.config.feature
        );
        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: VisionImage {
                    content: encoded.data,
                },
                features: vec![VisionFeature {
                    kind: self.config.feature.clone(),
                }],
                image_context: ImageContext {
                    language_hints: self.config.language_hints.clone(),
                },
            }],
        }
    }

    fn failed(detail: impl Into<String>) -> OcrError {
        OcrError::Failed {
            backend: Provenance::CloudVision,
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl OcrBackend for CloudVisionProvider {
    fn provenance(&self) -> Provenance {
        Provenance::CloudVision
    }

    fn is_available(&self) -> bool {
        self.config.has_credential()
    }

    fn availability_hint(&self) -> String {
        if self.config.has_credential() {
            format!("Cloud Vision is configured ({})", self.config.endpoint)
        } else {
            "Cloud Vision disabled: set QUIZ_OCR_VISION_API_KEY".to_string()
        }
    }

    async fn recognize(&self, image: &ImageJob) -> Result<RecognitionResult, OcrError> {
        if !self.config.has_credential() {
            return Err(OcrError::Unavailable("no Cloud Vision API key".to_string()));
        }

        let start = Instant::now();
        let request = self.build_request(image);

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OcrError::Timeout {
                        backend: Provenance::CloudVision,
                        secs: self.config.timeout_secs,
                    }
                } else {
                    // without_url keeps the API key out of logs
                    Self::failed(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::failed(e.without_url().to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(Self::failed(format!("HTTP {status}: {message}")));
        }

        let (text, confidence) = parse_annotate_response(&body, self.config.default_confidence)?;
        let elapsed = start.elapsed();
        debug!(
            "cloud-vision: {} → {} chars, confidence {:.2}, {:?}",
            image.file_name(),
            text.len(),
            confidence,
            elapsed
        );

        Ok(RecognitionResult::new(text, confidence, Provenance::CloudVision)
            .with_duration_ms(elapsed.as_millis() as u64))
    }
}

/// Extract text and confidence from an `images:annotate` response body.
///
/// Prefers `fullTextAnnotation.text`; falls back to the first
/// `textAnnotations` entry, which holds the whole detected text for the
/// `TEXT_DETECTION` feature. Confidence is the mean page confidence when
/// the provider reports one, else `default_confidence`.
fn parse_annotate_response(body: &str, default_confidence: f32) -> Result<(String, f32), OcrError> {
    let parsed: AnnotateResponse = serde_json::from_str(body)
        .map_err(|e| CloudVisionProvider::failed(format!("invalid response JSON: {e}")))?;

    let first = parsed.responses.into_iter().next().unwrap_or_default();

    if let Some(err) = first.error {
        return Err(CloudVisionProvider::failed(err.message));
    }

    let (text, page_confidences) = match first.full_text_annotation {
        Some(full) => (
            full.text,
            full.pages.iter().filter_map(|p| p.confidence).collect::<Vec<_>>(),
        ),
        None => (
            first
                .text_annotations
                .into_iter()
                .next()
                .map(|a| a.description)
                .unwrap_or_default(),
            Vec::new(),
        ),
    };

    let confidence = if page_confidences.is_empty() {
        default_confidence
    } else {
        page_confidences.iter().sum::<f32>() / page_confidences.len() as f32
    };

    Ok((text, confidence))
}

/// Run the remote provider if one is configured, absorbing every failure.
///
/// `None` or a provider without a credential is a skip, not an error.
pub async fn run_remote(backend: Option<&dyn OcrBackend>, image: &ImageJob) -> BackendOutcome {
    let Some(backend) = backend else {
        debug!("Remote OCR not configured, skipping '{}'", image.file_name());
        return BackendOutcome::Unavailable("remote provider not configured".to_string());
    };

    if !backend.is_available() {
        let hint = backend.availability_hint();
        debug!("Remote OCR skipped for '{}': {}", image.file_name(), hint);
        return BackendOutcome::Unavailable(hint);
    }

    match backend.recognize(image).await {
        Ok(result) => BackendOutcome::Recognized(result),
        Err(OcrError::Unavailable(reason)) => {
            debug!("Remote OCR unavailable for '{}': {}", image.file_name(), reason);
            BackendOutcome::Unavailable(reason)
        }
        Err(e) => {
            warn!(
                "Remote OCR failed for '{}' ({}), continuing with local result: {}",
                image.file_name(),
                image.slot(),
                e
            );
            BackendOutcome::Failed(e.to_string())
        }
    }
}

/// [`run_remote`] bounded by a timeout; a timeout counts as a failure.
pub async fn run_remote_with_timeout(
    backend: Option<&dyn OcrBackend>,
    image: &ImageJob,
    timeout: Duration,
) -> BackendOutcome {
    match tokio::time::timeout(timeout, run_remote(backend, image)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            let e = OcrError::Timeout {
                backend: Provenance::CloudVision,
                secs: timeout.as_secs(),
            };
            warn!("Remote OCR for '{}': {}", image.file_name(), e);
            BackendOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::{ImagePayload, ImageSlot};

    fn job() -> ImageJob {
        ImageJob::new(ImagePayload::new("q.jpg", vec![1, 2, 3]), ImageSlot::Primary)
    }

    #[test]
    fn parses_full_text_with_page_confidence() {
        let body = r#"{"responses":[{"fullTextAnnotation":{"text":"Câu 1?\nA. x","pages":[{"confidence":0.8},{"confidence":0.6}]}}]}"#;
        let (text, conf) = parse_annotate_response(body, 0.9).unwrap();
        assert_eq!(text, "Câu 1?\nA. x");
        assert!((conf - 0.7).abs() < 1e-6);
    }

    #[test]
    fn missing_confidence_uses_default() {
        let body = r#"{"responses":[{"fullTextAnnotation":{"text":"hello"}}]}"#;
        let (_, conf) = parse_annotate_response(body, 0.9).unwrap();
        assert_eq!(conf, 0.9);
    }

    #[test]
    fn falls_back_to_text_annotations() {
        let body = r#"{"responses":[{"textAnnotations":[{"description":"whole text"},{"description":"whole"}]}]}"#;
        let (text, conf) = parse_annotate_response(body, 0.9).unwrap();
        assert_eq!(text, "whole text");
        assert_eq!(conf, 0.9);
    }

    #[test]
    fn empty_response_is_empty_text() {
        let (text, _) = parse_annotate_response(r#"{"responses":[{}]}"#, 0.9).unwrap();
        assert!(text.is_empty());
        let (text, _) = parse_annotate_response("{}", 0.9).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn provider_error_is_failure() {
        let body = r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#;
        let err = parse_annotate_response(body, 0.9).unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }

    #[test]
    fn request_shape_matches_api() {
        let provider = CloudVisionProvider::new(RemoteConfig::new("k")).unwrap();
        let request = provider.build_request(&job());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requests"][0]["features"][0]["type"], "DOCUMENT_TEXT_DETECTION");
        assert_eq!(json["requests"][0]["image"]["content"], "AQID");
        assert_eq!(json["requests"][0]["imageContext"]["languageHints"][0], "vi");
    }

    #[test]
    fn unconfigured_remote_is_unavailable() {
        let outcome = tokio_test::block_on(run_remote(None, &job()));
        assert!(matches!(outcome, BackendOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn missing_credential_is_a_skip() {
        let provider = CloudVisionProvider::new(RemoteConfig::new("")).unwrap();
        let outcome = run_remote(Some(&provider), &job()).await;
        assert!(matches!(outcome, BackendOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_soft_failure() {
        let config = RemoteConfig::new("k")
            .with_endpoint("http://127.0.0.1:9/v1/images:annotate")
            .with_timeout_secs(5);
        let provider = CloudVisionProvider::new(config).unwrap();
        let outcome = run_remote(Some(&provider), &job()).await;
        assert!(matches!(outcome, BackendOutcome::Failed(_)), "got {outcome:?}");
    }
}
