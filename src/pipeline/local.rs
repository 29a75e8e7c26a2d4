//! Local recognition: the on-device Tesseract pass.
//!
//! Tesseract runs as a child process over a temporary copy of the image
//! and reports word-level TSV, from which both the text and a confidence
//! score are rebuilt. This stage is mandatory and always runs first for
//! every image; whatever goes wrong (binary missing, bad image, timeout)
//! the stage still returns a [`RecognitionResult`], degraded to empty text
//! with [`Provenance::LocalError`], so the batch can carry on.

use crate::backend::{OcrBackend, Provenance};
use crate::config::ExtractionConfig;
use crate::error::OcrError;
use crate::output::RecognitionResult;
use crate::pipeline::encode::file_extension;
use crate::pipeline::input::ImageJob;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Tesseract OCR backend.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(&config.tesseract_path, &config.language)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    async fn run_tesseract(&self, image: &ImageJob) -> Result<String, OcrError> {
        // Extension must match the sniffed format.
        let tmp = tempfile::Builder::new()
            .prefix("quiz-ocr-")
            .suffix(&format!(".{}", file_extension(image.data())))
            .tempfile()?;
        tokio::fs::write(tmp.path(), image.data()).await?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .arg("tsv")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::Failed {
                    backend: Provenance::Tesseract,
                    detail: stderr.trim().to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::Unavailable(
                format!("'{}' not found (install tesseract-ocr)", self.binary),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

#[async_trait]
impl OcrBackend for TesseractEngine {
    fn provenance(&self) -> Provenance {
        Provenance::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(&self.binary)
    }

    fn availability_hint(&self) -> String {
        if check_binary(&self.binary) {
            format!("Tesseract is available (languages: {})", self.language)
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr tesseract-ocr-vie"
                .to_string()
        }
    }

    async fn recognize(&self, image: &ImageJob) -> Result<RecognitionResult, OcrError> {
        let start = Instant::now();
        let tsv = self.run_tesseract(image).await?;
        let (text, confidence) = parse_tsv(&tsv);
        let elapsed = start.elapsed();

        debug!(
            "tesseract: {} → {} chars, confidence {:.2}, {:?}",
            image.file_name(),
            text.len(),
            confidence,
            elapsed
        );

        Ok(RecognitionResult::new(text, confidence, Provenance::Tesseract)
            .with_duration_ms(elapsed.as_millis() as u64))
    }
}

/// Check whether an executable can be launched.
pub fn check_binary(binary: &str) -> bool {
    std::process::Command::new(binary)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run the local engine under a timeout, degrading every failure.
///
/// Never returns an error: a failed or timed-out call yields
/// [`RecognitionResult::degraded`] so the caller can continue with the
/// remote provider's text, or with nothing.
pub async fn run_local(
    backend: &dyn OcrBackend,
    image: &ImageJob,
    timeout: Duration,
) -> RecognitionResult {
    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, backend.recognize(image)).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(
                "Local OCR failed for '{}' ({}): {}",
                image.file_name(),
                image.slot(),
                e
            );
            RecognitionResult::degraded().with_duration_ms(elapsed_ms)
        }
        Err(_) => {
            let e = OcrError::Timeout {
                backend: backend.provenance(),
                secs: timeout.as_secs(),
            };
            warn!("Local OCR for '{}': {}", image.file_name(), e);
            RecognitionResult::degraded().with_duration_ms(elapsed_ms)
        }
    }
}

/// Rebuild text and a confidence score from tesseract's TSV output.
///
/// Word rows (level 5) are grouped into lines by their
/// `(page, block, paragraph, line)` key, in the order tesseract emits them.
/// Confidence is the mean word confidence scaled to `[0, 1]`; rows with a
/// negative confidence carry no recognised word and are ignored.
pub fn parse_tsv(tsv: &str) -> (String, f32) {
    let mut lines: Vec<String> = Vec::new();
    let mut current_key: Option<(&str, &str, &str, &str)> = None;
    let mut conf_sum = 0.0f64;
    let mut conf_count = 0usize;

    for row in tsv.lines() {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }

        let key = (cols[1], cols[2], cols[3], cols[4]);
        if current_key == Some(key) {
            if let Some(line) = lines.last_mut() {
                line.push(' ');
                line.push_str(word);
            }
        } else {
            lines.push(word.to_string());
            current_key = Some(key);
        }

        if let Ok(conf) = cols[10].trim().parse::<f64>() {
            if conf >= 0.0 {
                conf_sum += conf;
                conf_count += 1;
            }
        }
    }

    let confidence = if conf_count == 0 {
        0.0
    } else {
        ((conf_sum / conf_count as f64) / 100.0).clamp(0.0, 1.0) as f32
    };

    (lines.join("\n"), confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::{ImagePayload, ImageSlot};

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: u32, par: u32, line: u32, n: u32, conf: &str, text: &str) -> String {
        format!("5\t1\t{block}\t{par}\t{line}\t{n}\t0\t0\t10\t10\t{conf}\t{text}")
    }

    #[test]
    fn tsv_groups_words_into_lines() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t".to_string(),
            word(1, 1, 1, 1, "90", "Câu"),
            word(1, 1, 1, 2, "80", "1:"),
            word(1, 1, 2, 1, "70", "A."),
            word(1, 1, 2, 2, "60", "Hà"),
            word(1, 1, 2, 3, "100", "Nội"),
        ]
        .join("\n");

        let (text, confidence) = parse_tsv(&tsv);
        assert_eq!(text, "Câu 1:\nA. Hà Nội");
        assert!((confidence - 0.8).abs() < 1e-6, "got {confidence}");
    }

    #[test]
    fn tsv_ignores_negative_confidence_and_blank_words() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, 1, "-1", " "),
            word(1, 1, 1, 2, "50.5", "Paris"),
        ]
        .join("\n");
        let (text, confidence) = parse_tsv(&tsv);
        assert_eq!(text, "Paris");
        assert!((confidence - 0.505).abs() < 1e-6);
    }

    #[test]
    fn empty_tsv_has_zero_confidence() {
        assert_eq!(parse_tsv(""), (String::new(), 0.0));
        assert_eq!(parse_tsv(HEADER), (String::new(), 0.0));
    }

    #[test]
    fn new_block_starts_new_line() {
        let tsv = [word(1, 1, 1, 1, "90", "one"), word(2, 1, 1, 1, "90", "two")].join("\n");
        assert_eq!(parse_tsv(&tsv).0, "one\ntwo");
    }

    /// A stand-in for tesseract that prints the image file back as TSV.
    #[cfg(unix)]
    fn fake_tesseract(dir: &std::path::Path) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-tesseract");
        std::fs::write(&path, "#!/bin/sh\ncat \"$1\"\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn engine_reads_image_written_to_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(dir.path()), "vie");
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, 1, "90", "Câu"),
            word(1, 1, 1, 2, "90", "2?"),
            word(1, 1, 2, 1, "70", "A."),
            word(1, 1, 2, 2, "70", "Huế"),
        ]
        .join("\n");
        let job = ImageJob::new(ImagePayload::new("q.txt", tsv.into_bytes()), ImageSlot::Primary);

        let result = run_local(&engine, &job, Duration::from_secs(10)).await;
        assert_eq!(result.provenance, Provenance::Tesseract);
        assert_eq!(result.text, "Câu 2?\nA. Huế");
        assert!((result.confidence - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn missing_binary_degrades() {
        let engine = TesseractEngine::new("/nonexistent/tesseract-binary", "eng");
        assert!(!engine.is_available());
        let job = ImageJob::new(ImagePayload::new("a.png", vec![0u8; 8]), ImageSlot::Primary);
        let result = run_local(&engine, &job, Duration::from_secs(5)).await;
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.provenance, Provenance::LocalError);
    }
}
