//! Batch orchestration: one primary image plus up to nine auxiliary images.
//!
//! A batch is validated completely before any backend runs, so a rejected
//! request never touches an OCR engine. Images are then processed one at a
//! time, in submission order, each through the full
//! local → remote → reconcile → cleanup → analyze pipeline.
//!
//! ## Why one spawned task per image?
//!
//! Soft failures (backend errors, timeouts) are absorbed inside the
//! pipeline. Anything else that goes wrong while processing an image (a
//! panic in a stage) must abort the batch with a single error instead of
//! taking the caller down. Running each image on its own Tokio task and
//! awaiting it before starting the next keeps processing strictly
//! sequential while turning such a fault into [`QuizOcrError::Internal`].

use crate::backend::{OcrBackend, Provenance};
use crate::config::{ExtractionConfig, DEFAULT_REMOTE_TIMEOUT_SECS};
use crate::error::QuizOcrError;
use crate::output::{BatchResult, ImageResult};
use crate::pipeline::analyze::analyze_quiz;
use crate::pipeline::input::{self, ImageJob, ImagePayload, ImageSlot};
use crate::pipeline::local::{run_local, TesseractEngine};
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::reconcile::reconcile;
use crate::pipeline::remote::{run_remote_with_timeout, CloudVisionProvider};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Availability of one configured backend, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStatus {
    pub provenance: Provenance,
    pub available: bool,
    pub hint: String,
}

/// Runs quiz extraction batches against a fixed pair of backends.
///
/// Holds no per-request state: one extractor can serve any number of
/// concurrent batches.
#[derive(Clone)]
pub struct QuizExtractor {
    config: Arc<ExtractionConfig>,
    local: Arc<dyn OcrBackend>,
    remote: Option<Arc<dyn OcrBackend>>,
}

impl QuizExtractor {
    /// Build the default backends from configuration: Tesseract locally,
    /// Cloud Vision remotely when a credential is configured.
    pub fn from_config(config: ExtractionConfig) -> Result<Self, QuizOcrError> {
        let local: Arc<dyn OcrBackend> = Arc::new(TesseractEngine::from_config(&config));

        let remote: Option<Arc<dyn OcrBackend>> = match config.remote {
            Some(ref remote) if remote.has_credential() => {
                let provider = CloudVisionProvider::new(remote.clone())
                    .map_err(|e| QuizOcrError::InvalidConfig(e.to_string()))?;
                Some(Arc::new(provider))
            }
            _ => None,
        };

        Ok(Self::with_backends(config, local, remote))
    }

    /// Use caller-supplied backends (e.g. mocks in tests).
    pub fn with_backends(
        config: ExtractionConfig,
        local: Arc<dyn OcrBackend>,
        remote: Option<Arc<dyn OcrBackend>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            local,
            remote,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Report whether each backend can run.
    pub fn check_backends(&self) -> Vec<BackendStatus> {
        let mut status = vec![BackendStatus {
            provenance: self.local.provenance(),
            available: self.local.is_available(),
            hint: self.local.availability_hint(),
        }];
        match self.remote {
            Some(ref remote) => status.push(BackendStatus {
                provenance: remote.provenance(),
                available: remote.is_available(),
                hint: remote.availability_hint(),
            }),
            None => status.push(BackendStatus {
                provenance: Provenance::CloudVision,
                available: false,
                hint: "Cloud Vision disabled: set QUIZ_OCR_VISION_API_KEY".to_string(),
            }),
        }
        status
    }

    /// Reject a request that must not be processed, before any OCR runs.
    ///
    /// Checks, in order: a primary image is present, the auxiliary count is
    /// within the cap, and every image is within the size limit.
    pub fn validate(
        &self,
        primary: Option<&ImagePayload>,
        auxiliary: &[ImagePayload],
    ) -> Result<(), QuizOcrError> {
        let primary = primary.ok_or(QuizOcrError::NoPrimaryImage)?;

        let limit = self.config.auxiliary_limit();
        if auxiliary.len() > limit {
            return Err(QuizOcrError::TooManyImages {
                count: auxiliary.len(),
                max: limit,
            });
        }

        let max = self.config.max_image_bytes;
        if let Some(big) = std::iter::once(primary)
            .chain(auxiliary)
            .find(|p| p.data.len() > max)
        {
            return Err(QuizOcrError::ImageTooLarge {
                file_name: big.file_name.clone(),
                size: big.data.len(),
                max,
            });
        }

        Ok(())
    }

    /// Process one batch: the primary image first, then each auxiliary
    /// image in submission order.
    ///
    /// # Errors
    /// Returns `Err` when validation fails (nothing is processed) or when
    /// processing an image faults unexpectedly (no partial result is
    /// returned). Backend failures are never errors; they only lower the
    /// quality of the affected image's result.
    pub async fn process_batch(
        &self,
        primary: Option<ImagePayload>,
        auxiliary: Vec<ImagePayload>,
    ) -> Result<BatchResult, QuizOcrError> {
        let batch_start = Instant::now();
        self.validate(primary.as_ref(), &auxiliary)?;

        let jobs: Vec<ImageJob> = primary
            .into_iter()
            .map(|p| ImageJob::new(p, ImageSlot::Primary))
            .chain(
                auxiliary
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| ImageJob::new(p, ImageSlot::Auxiliary(i))),
            )
            .collect();
        let total = jobs.len();

        info!("Starting batch: {} image(s)", total);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }

        let mut images = Vec::with_capacity(total);
        for job in jobs {
            let index = job.slot().position();
            let file_name = job.file_name().to_string();
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_image_start(index, total, &file_name);
            }

            let task = tokio::spawn(process_image(
                Arc::clone(&self.local),
                self.remote.clone(),
                job,
                self.local_timeout(),
                self.remote_timeout(),
            ));
            let result = task
                .await
                .map_err(|e| QuizOcrError::internal(format!("processing '{file_name}'"), e))?;

            info!(
                "Image {}/{} '{}': {} options via {} (confidence {:.2}, {}ms)",
                index + 1,
                total,
                result.file_name,
                result.extraction.options.len(),
                result.processed_with,
                result.confidence,
                result.duration_ms
            );
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_image_complete(index, total, result.processed_with.as_str(), result.confidence);
            }
            images.push(result);
        }

        let total_duration_ms = batch_start.elapsed().as_millis() as u64;
        info!("Batch complete: {} image(s), {}ms", total, total_duration_ms);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(total);
        }

        Ok(BatchResult {
            images,
            processed_at: Utc::now(),
            total_duration_ms,
        })
    }

    fn local_timeout(&self) -> Duration {
        Duration::from_secs(self.config.local_timeout_secs)
    }

    fn remote_timeout(&self) -> Duration {
        let secs = self
            .config
            .remote
            .as_ref()
            .map(|r| r.timeout_secs)
            .unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }
}

/// The per-image pipeline. Infallible by construction; only a panic can
/// make its task fail.
async fn process_image(
    local: Arc<dyn OcrBackend>,
    remote: Option<Arc<dyn OcrBackend>>,
    job: ImageJob,
    local_timeout: Duration,
    remote_timeout: Duration,
) -> ImageResult {
    let start = Instant::now();
    debug!("Processing {} '{}' ({} bytes)", job.slot(), job.file_name(), job.len());

    let local_result = run_local(local.as_ref(), &job, local_timeout).await;
    let remote_outcome = run_remote_with_timeout(remote.as_deref(), &job, remote_timeout).await;
    debug!(
        "'{}': local {} ({} chars), remote {}",
        job.file_name(),
        local_result.provenance,
        local_result.text.len(),
        remote_outcome.label()
    );

    let reconciled = reconcile(&local_result, &remote_outcome);
    let text = clean_ocr_text(&reconciled.text);
    let extraction = analyze_quiz(&text);

    ImageResult {
        file_name: job.file_name().to_string(),
        position: job.slot().position(),
        text,
        no_text: reconciled.no_text,
        extraction,
        confidence: reconciled.confidence,
        processed_with: reconciled.processed_with,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

// ── Convenience entry points ─────────────────────────────────────────────

/// Extract quizzes from in-memory images with the default backends.
///
/// # Example
/// ```rust,no_run
/// use quiz_ocr::{extract_quiz, ExtractionConfig, ImagePayload};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("page1.jpg")?;
/// let config = ExtractionConfig::from_env();
/// let batch = extract_quiz(Some(ImagePayload::new("page1.jpg", bytes)), vec![], &config).await?;
/// println!("{}", batch.images[0].extraction.question);
/// # Ok(())
/// # }
/// ```
pub async fn extract_quiz(
    primary: Option<ImagePayload>,
    auxiliary: Vec<ImagePayload>,
    config: &ExtractionConfig,
) -> Result<BatchResult, QuizOcrError> {
    QuizExtractor::from_config(config.clone())?
        .process_batch(primary, auxiliary)
        .await
}

/// Synchronous wrapper around [`extract_quiz`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_quiz_sync(
    primary: Option<ImagePayload>,
    auxiliary: Vec<ImagePayload>,
    config: &ExtractionConfig,
) -> Result<BatchResult, QuizOcrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| QuizOcrError::internal("creating tokio runtime", e))?
        .block_on(extract_quiz(primary, auxiliary, config))
}

/// Resolve local paths or HTTP/HTTPS URLs, then extract.
///
/// The auxiliary count is checked before anything is read or downloaded.
pub async fn extract_quiz_from_paths<S: AsRef<str>>(
    primary: &str,
    auxiliary: &[S],
    config: &ExtractionConfig,
) -> Result<BatchResult, QuizOcrError> {
    let limit = config.auxiliary_limit();
    if auxiliary.len() > limit {
        return Err(QuizOcrError::TooManyImages {
            count: auxiliary.len(),
            max: limit,
        });
    }

    let max = config.max_image_bytes;
    let timeout = config.download_timeout_secs;
    let primary = input::resolve_input(primary, max, timeout).await?;
    let mut resolved = Vec::with_capacity(auxiliary.len());
    for path in auxiliary {
        resolved.push(input::resolve_input(path.as_ref(), max, timeout).await?);
    }

    extract_quiz(Some(primary), resolved, config).await
}
