//! Configuration types for quiz extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`],
//! built via its [`ExtractionConfigBuilder`] or resolved from the
//! environment with [`ExtractionConfig::from_env`]. The config is resolved
//! once per process and shared read-only by the extractor; nothing in the
//! pipeline mutates it.

use crate::error::QuizOcrError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default Tesseract language string: English plus Vietnamese.
pub const DEFAULT_LANGUAGE: &str = "eng+vie";

/// Default Cloud Vision endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Default Cloud Vision feature (the remote backend identifier).
pub const DEFAULT_VISION_FEATURE: &str = "DOCUMENT_TEXT_DETECTION";

/// Default timeout for one remote call, in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Default per-image size limit: 10 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Default cap on auxiliary images per batch.
pub const DEFAULT_MAX_AUXILIARY_IMAGES: usize = 9;

/// Configuration for quiz extraction.
///
/// # Example
/// ```rust
/// use quiz_ocr::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .language("eng+vie")
///     .local_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert!(config.remote.is_none());
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Path or name of the `tesseract` executable. Default: "tesseract".
    pub tesseract_path: String,

    /// Tesseract language string. Default: "eng+vie".
    ///
    /// Quiz pages mix Latin and Vietnamese script; both traineddata files
    /// must be installed for the default to work.
    pub language: String,

    /// Timeout for one local recognition call, in seconds. Default: 60.
    ///
    /// A call that exceeds it is treated like any other local failure: the
    /// image gets an empty, zero-confidence result and the batch continues.
    pub local_timeout_secs: u64,

    /// Remote provider settings. `None` disables the remote provider.
    pub remote: Option<RemoteConfig>,

    /// Maximum auxiliary images per batch. Default: 9.
    ///
    /// Can only be lowered: batches never exceed one primary plus
    /// [`DEFAULT_MAX_AUXILIARY_IMAGES`] auxiliary images.
    pub max_auxiliary_images: usize,

    /// Maximum size of a single image in bytes. Default: 10 MiB.
    pub max_image_bytes: usize,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tesseract_path: "tesseract".to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            local_timeout_secs: 60,
            remote: None,
            max_auxiliary_images: DEFAULT_MAX_AUXILIARY_IMAGES,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("tesseract_path", &self.tesseract_path)
            .field("language", &self.language)
            .field("local_timeout_secs", &self.local_timeout_secs)
            .field("remote", &self.remote)
            .field("max_auxiliary_images", &self.max_auxiliary_images)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    /// The auxiliary image limit actually enforced, capped at
    /// [`DEFAULT_MAX_AUXILIARY_IMAGES`] even if the field was raised directly.
    pub fn auxiliary_limit(&self) -> usize {
        self.max_auxiliary_images.min(DEFAULT_MAX_AUXILIARY_IMAGES)
    }

    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve configuration from environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `QUIZ_OCR_VISION_API_KEY` | enables [`RemoteConfig`] |
    /// | `QUIZ_OCR_VISION_ENDPOINT` | [`RemoteConfig::endpoint`] |
    /// | `QUIZ_OCR_VISION_FEATURE` | [`RemoteConfig::feature`] |
    /// | `QUIZ_OCR_LANGUAGE` | [`ExtractionConfig::language`] |
    /// | `QUIZ_OCR_TESSERACT_PATH` | [`ExtractionConfig::tesseract_path`] |
    ///
    /// A missing or empty API key leaves the remote provider disabled; it is
    /// not an error.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(lang) = non_empty_env("QUIZ_OCR_LANGUAGE") {
            config.language = lang;
        }
        if let Some(path) = non_empty_env("QUIZ_OCR_TESSERACT_PATH") {
            config.tesseract_path = path;
        }
        if let Some(key) = non_empty_env("QUIZ_OCR_VISION_API_KEY") {
            let mut remote = RemoteConfig::new(key);
            if let Some(endpoint) = non_empty_env("QUIZ_OCR_VISION_ENDPOINT") {
                remote.endpoint = endpoint;
            }
            if let Some(feature) = non_empty_env("QUIZ_OCR_VISION_FEATURE") {
                remote.feature = feature;
            }
            config.remote = Some(remote);
        }

        config
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Settings for the Cloud Vision remote provider.
#[derive(Clone, PartialEq)]
pub struct RemoteConfig {
    /// API key sent as the `key` query parameter.
    pub api_key: String,
    /// `images:annotate` endpoint. Default: Google's public endpoint.
    pub endpoint: String,
    /// Feature type requested, e.g. `DOCUMENT_TEXT_DETECTION` or `TEXT_DETECTION`.
    pub feature: String,
    /// Language hints passed in `imageContext`. Default: `["vi", "en"]`.
    pub language_hints: Vec<String>,
    /// Per-call timeout in seconds. Default: 30.
    pub timeout_secs: u64,
    /// Confidence reported when the provider gives none. Default: 0.9.
    pub default_confidence: f32,
}

impl RemoteConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            feature: DEFAULT_VISION_FEATURE.to_string(),
            language_hints: vec!["vi".to_string(), "en".to_string()],
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            default_confidence: 0.9,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = feature.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    /// True when a usable credential is present.
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("feature", &self.feature)
            .field("language_hints", &self.language_hints)
            .field("timeout_secs", &self.timeout_secs)
            .field("default_confidence", &self.default_confidence)
            .finish()
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn tesseract_path(mut self, path: impl Into<String>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn local_timeout_secs(mut self, secs: u64) -> Self {
        self.config.local_timeout_secs = secs.max(1);
        self
    }

    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.config.remote = Some(remote);
        self
    }

    /// Lower the auxiliary image limit. Values above the default are clamped.
    pub fn max_auxiliary_images(mut self, n: usize) -> Self {
        self.config.max_auxiliary_images = n.min(DEFAULT_MAX_AUXILIARY_IMAGES);
        self
    }

    pub fn max_image_bytes(mut self, bytes: usize) -> Self {
        self.config.max_image_bytes = bytes;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, QuizOcrError> {
        let c = &self.config;
        if c.tesseract_path.trim().is_empty() {
            return Err(QuizOcrError::InvalidConfig(
                "tesseract path must not be empty".into(),
            ));
        }
        if c.language.trim().is_empty() {
            return Err(QuizOcrError::InvalidConfig(
                "language must not be empty".into(),
            ));
        }
        if c.max_image_bytes == 0 {
            return Err(QuizOcrError::InvalidConfig(
                "max image size must be ≥ 1 byte".into(),
            ));
        }
        if let Some(ref remote) = c.remote {
            if remote.endpoint.trim().is_empty() {
                return Err(QuizOcrError::InvalidConfig(
                    "remote endpoint must not be empty".into(),
                ));
            }
            if !(0.0..=1.0).contains(&remote.default_confidence) {
                return Err(QuizOcrError::InvalidConfig(format!(
                    "remote default confidence must be 0–1, got {}",
                    remote.default_confidence
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ExtractionConfig::default();
        assert_eq!(c.language, "eng+vie");
        assert_eq!(c.max_auxiliary_images, 9);
        assert_eq!(c.max_image_bytes, 10 * 1024 * 1024);
        assert!(c.remote.is_none());
    }

    #[test]
    fn remote_defaults() {
        let r = RemoteConfig::new("k");
        assert_eq!(r.feature, "DOCUMENT_TEXT_DETECTION");
        assert_eq!(r.default_confidence, 0.9);
        assert!(r.has_credential());
        assert!(!RemoteConfig::new("  ").has_credential());
    }

    #[test]
    fn remote_debug_redacts_key() {
        let r = RemoteConfig::new("super-secret");
        let dbg = format!("{:?}", r);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn builder_rejects_empty_language() {
        let err = ExtractionConfig::builder().language("  ").build().unwrap_err();
        assert!(matches!(err, QuizOcrError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_bad_default_confidence() {
        let mut remote = RemoteConfig::new("k");
        remote.default_confidence = 1.5;
        let err = ExtractionConfig::builder().remote(remote).build().unwrap_err();
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn builder_clamps_timeouts() {
        let c = ExtractionConfig::builder()
            .local_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.local_timeout_secs, 1);
    }

    #[test]
    fn auxiliary_limit_can_only_be_lowered() {
        let c = ExtractionConfig::builder()
            .max_auxiliary_images(50)
            .build()
            .unwrap();
        assert_eq!(c.max_auxiliary_images, 9);

        let c = ExtractionConfig::builder()
            .max_auxiliary_images(3)
            .build()
            .unwrap();
        assert_eq!(c.auxiliary_limit(), 3);

        let mut c = ExtractionConfig::default();
        c.max_auxiliary_images = 100;
        assert_eq!(c.auxiliary_limit(), 9);
    }
}
