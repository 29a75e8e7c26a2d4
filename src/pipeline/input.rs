//! Input handling: image payloads, batch jobs, and path/URL resolution.
//!
//! Callers hand the orchestrator raw [`ImagePayload`]s. Once a batch has
//! been validated each payload is frozen into an [`ImageJob`] that records
//! its position in the batch; jobs are immutable and shared with the
//! backends through an `Arc`.
//!
//! The CLI (and [`crate::batch::extract_quiz_from_paths`]) accept local
//! paths or HTTP/HTTPS URLs; [`resolve_input`] turns either into a payload.

use crate::error::QuizOcrError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A raw image as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// Where an image sits in its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Primary,
    /// 0-based auxiliary index.
    Auxiliary(usize),
}

impl ImageSlot {
    /// Flat 0-based position: primary is 0, auxiliary `i` is `i + 1`.
    pub fn position(&self) -> usize {
        match self {
            ImageSlot::Primary => 0,
            ImageSlot::Auxiliary(i) => i + 1,
        }
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSlot::Primary => f.write_str("primary"),
            ImageSlot::Auxiliary(i) => write!(f, "auxiliary #{}", i + 1),
        }
    }
}

/// One image scheduled for processing. Immutable once created.
#[derive(Debug, Clone)]
pub struct ImageJob {
    data: Arc<[u8]>,
    file_name: String,
    slot: ImageSlot,
}

impl ImageJob {
    pub fn new(payload: ImagePayload, slot: ImageSlot) -> Self {
        Self {
            data: Arc::from(payload.data),
            file_name: payload.file_name,
            slot,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn slot(&self) -> ImageSlot {
        self.slot
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP/HTTPS URL into an image payload.
///
/// Files larger than `max_bytes` are rejected here so a huge download or
/// file never reaches the batch.
pub async fn resolve_input(
    input: &str,
    max_bytes: usize,
    timeout_secs: u64,
) -> Result<ImagePayload, QuizOcrError> {
    if is_url(input) {
        download_url(input, max_bytes, timeout_secs).await
    } else {
        read_local(Path::new(input), max_bytes).await
    }
}

async fn read_local(path: &Path, max_bytes: usize) -> Result<ImagePayload, QuizOcrError> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| io_to_error(path, e))?;
    let file_name = file_name_of(path);
    if meta.len() as usize > max_bytes {
        return Err(QuizOcrError::ImageTooLarge {
            file_name,
            size: meta.len() as usize,
            max: max_bytes,
        });
    }

    let data = tokio::fs::read(path).await.map_err(|e| io_to_error(path, e))?;
    debug!("Read {} ({} bytes)", path.display(), data.len());
    Ok(ImagePayload::new(file_name, data))
}

fn io_to_error(path: &Path, e: std::io::Error) -> QuizOcrError {
    match e.kind() {
        std::io::ErrorKind::NotFound => QuizOcrError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => QuizOcrError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => QuizOcrError::internal(format!("reading '{}'", path.display()), e),
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Download a URL into memory.
async fn download_url(
    url: &str,
    max_bytes: usize,
    timeout_secs: u64,
) -> Result<ImagePayload, QuizOcrError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| QuizOcrError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let to_error = |e: reqwest::Error| {
        if e.is_timeout() {
            QuizOcrError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            QuizOcrError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(to_error)?;

    if !response.status().is_success() {
        return Err(QuizOcrError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let file_name = extract_filename(url);
    if let Some(len) = response.content_length() {
        if len as usize > max_bytes {
            return Err(QuizOcrError::ImageTooLarge {
                file_name,
                size: len as usize,
                max: max_bytes,
            });
        }
    }

    let bytes = response.bytes().await.map_err(to_error)?;
    if bytes.len() > max_bytes {
        return Err(QuizOcrError::ImageTooLarge {
            file_name,
            size: bytes.len(),
            max: max_bytes,
        });
    }

    info!("Downloaded {} ({} bytes)", file_name, bytes.len());
    Ok(ImagePayload::new(file_name, bytes.to_vec()))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded-image".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/quiz.jpg"));
        assert!(is_url("http://example.com/quiz.jpg"));
        assert!(!is_url("/tmp/quiz.jpg"));
        assert!(!is_url("quiz.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(extract_filename("https://x.org/a/b/page1.png"), "page1.png");
        assert_eq!(extract_filename("https://x.org/upload/"), "downloaded-image");
        assert_eq!(extract_filename("not a url"), "downloaded-image");
    }

    #[test]
    fn slot_positions() {
        assert_eq!(ImageSlot::Primary.position(), 0);
        assert_eq!(ImageSlot::Auxiliary(0).position(), 1);
        assert_eq!(ImageSlot::Auxiliary(8).position(), 9);
        assert_eq!(ImageSlot::Auxiliary(2).to_string(), "auxiliary #3");
    }

    #[test]
    fn job_keeps_payload() {
        let job = ImageJob::new(ImagePayload::new("a.jpg", vec![1, 2, 3]), ImageSlot::Primary);
        assert_eq!(job.data(), &[1, 2, 3]);
        assert_eq!(job.file_name(), "a.jpg");
        assert_eq!(job.len(), 3);
    }

    #[tokio::test]
    async fn resolve_local_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"\x89PNG fake").unwrap();
        let payload = resolve_input(tmp.path().to_str().unwrap(), 1024, 5)
            .await
            .unwrap();
        assert_eq!(payload.data, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn resolve_local_rejects_oversize() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 64]).unwrap();
        let err = resolve_input(tmp.path().to_str().unwrap(), 16, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizOcrError::ImageTooLarge { size: 64, max: 16, .. }));
    }

    #[tokio::test]
    async fn resolve_missing_file() {
        let err = resolve_input("/definitely/not/here.jpg", 1024, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizOcrError::FileNotFound { .. }));
    }
}
