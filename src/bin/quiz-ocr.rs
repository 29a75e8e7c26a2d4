//! CLI binary for quiz-ocr.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use quiz_ocr::{
    extract_quiz_from_paths, BatchProgressCallback, BatchResult, ErrorResponse, ExtractionConfig,
    ImageResult, ProgressCallback, QuizExtractor, QuizOcrError, RemoteConfig,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch, one log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    image_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:30.green/238}] {pos:>2}/{len} images  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Reading");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            image_started: Mutex::new(None),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_images: usize) {
        self.bar.set_length(total_images as u64);
        self.bar.reset_eta();
    }

    fn on_image_start(&self, _index: usize, _total: usize, file_name: &str) {
        if let Ok(mut started) = self.image_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(file_name.to_string());
    }

    fn on_image_complete(&self, index: usize, total: usize, processed_with: &str, confidence: f32) {
        let elapsed_ms = self
            .image_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        let mark = if confidence > 0.0 { green("✓") } else { red("✗") };
        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {:<13}  {}  {}",
            mark,
            index + 1,
            total,
            processed_with,
            dim(&format!("confidence {confidence:.2}")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_images: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} image(s) processed",
            green("✔"),
            bold(&total_images.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One quiz page, Tesseract only
  quiz-ocr page1.jpg

  # Primary page plus auxiliary pages (at most 9)
  quiz-ocr page1.jpg page2.jpg page3.png

  # Use Cloud Vision when reachable, Tesseract otherwise
  QUIZ_OCR_VISION_API_KEY=... quiz-ocr page1.jpg

  # JSON records for another program
  quiz-ocr --json page1.jpg > quiz.json

  # Check which OCR backends are usable
  quiz-ocr --check

ENVIRONMENT VARIABLES:
  QUIZ_OCR_VISION_API_KEY   Google Cloud Vision API key (enables remote OCR)
  QUIZ_OCR_VISION_ENDPOINT  Override the images:annotate endpoint
  QUIZ_OCR_VISION_FEATURE   DOCUMENT_TEXT_DETECTION (default) or TEXT_DETECTION
  QUIZ_OCR_LANGUAGE         Tesseract languages (default: eng+vie)
  QUIZ_OCR_TESSERACT_PATH   Path to the tesseract executable

SETUP:
  apt install tesseract-ocr tesseract-ocr-vie

  The answer marked correct is the option labelled A (or 1). Review it
  before saving the quiz.
"#;

/// Extract quiz questions and options from photographed quiz pages.
#[derive(Parser, Debug)]
#[command(
    name = "quiz-ocr",
    version,
    about = "Extract quiz questions and options from photographed pages",
    long_about = "Run OCR over a primary quiz image and up to nine auxiliary images \
(local files or URLs), then detect the question, its options, and a first guess at the \
correct answer. Tesseract always runs; Google Cloud Vision is used when an API key is set.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Primary image: local path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "check")]
    primary: Option<String>,

    /// Auxiliary images, processed after the primary in the order given.
    auxiliary: Vec<String>,

    /// Tesseract language string.
    #[arg(long, env = "QUIZ_OCR_LANGUAGE", default_value = "eng+vie")]
    language: String,

    /// Path to the tesseract executable.
    #[arg(long, env = "QUIZ_OCR_TESSERACT_PATH", default_value = "tesseract")]
    tesseract: String,

    /// Google Cloud Vision API key.
    #[arg(long, env = "QUIZ_OCR_VISION_API_KEY", hide_env_values = true)]
    vision_key: Option<String>,

    /// Cloud Vision images:annotate endpoint.
    #[arg(long, env = "QUIZ_OCR_VISION_ENDPOINT")]
    vision_endpoint: Option<String>,

    /// Cloud Vision feature type.
    #[arg(long, env = "QUIZ_OCR_VISION_FEATURE")]
    vision_feature: Option<String>,

    /// Per-image Tesseract timeout in seconds.
    #[arg(long, env = "QUIZ_OCR_LOCAL_TIMEOUT", default_value_t = 60)]
    local_timeout: u64,

    /// Per-image Cloud Vision timeout in seconds.
    #[arg(long, env = "QUIZ_OCR_REMOTE_TIMEOUT", default_value_t = 30)]
    remote_timeout: u64,

    /// Per-image size limit in MiB.
    #[arg(long, env = "QUIZ_OCR_MAX_IMAGE_MB", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..=100))]
    max_image_mb: u64,

    /// Output JSON records (or an error object) instead of text.
    #[arg(long)]
    json: bool,

    /// Report OCR backend availability and exit.
    #[arg(long)]
    check: bool,

    /// Disable progress bar.
    #[arg(long, env = "QUIZ_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "QUIZ_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "QUIZ_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Check mode ───────────────────────────────────────────────────────
    if cli.check {
        let extractor =
            QuizExtractor::from_config(config).context("Failed to initialise OCR backends")?;
        let mut all_ok = true;
        for status in extractor.check_backends() {
            let mark = if status.available {
                green("✓")
            } else {
                all_ok = false;
                red("✗")
            };
            println!("{} {:<13} {}", mark, status.provenance.as_str(), status.hint);
        }
        if !all_ok && !cli.quiet {
            eprintln!("{}", dim("Tesseract is required; Cloud Vision is optional."));
        }
        return Ok(());
    }

    let Some(ref primary) = cli.primary else {
        anyhow::bail!("a primary image is required");
    };

    // ── Run extraction ───────────────────────────────────────────────────
    let batch = match extract_quiz_from_paths(primary, &cli.auxiliary, &config).await {
        Ok(batch) => batch,
        Err(e) if cli.json => exit_with_json_error(&e),
        Err(e) => return Err(e).context("Quiz extraction failed"),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&batch.to_response())
            .context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_batch(&batch, cli.quiet);
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .language(&cli.language)
        .tesseract_path(&cli.tesseract)
        .local_timeout_secs(cli.local_timeout)
        .max_image_bytes((cli.max_image_mb as usize) * 1024 * 1024);

    if let Some(key) = cli.vision_key.as_deref().filter(|k| !k.trim().is_empty()) {
        let mut remote = RemoteConfig::new(key).with_timeout_secs(cli.remote_timeout);
        if let Some(ref endpoint) = cli.vision_endpoint {
            remote = remote.with_endpoint(endpoint);
        }
        if let Some(ref feature) = cli.vision_feature {
            remote = remote.with_feature(feature);
        }
        builder = builder.remote(remote);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn exit_with_json_error(e: &QuizOcrError) -> ! {
    let body = ErrorResponse::from(e);
    match serde_json::to_string_pretty(&body) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{{\"error\":\"{}\"}}", body.error),
    }
    eprintln!("{} {}", red("✘"), e);
    std::process::exit(1);
}

fn print_batch(batch: &BatchResult, quiet: bool) {
    for image in &batch.images {
        print_image(image);
    }
    if !quiet {
        eprintln!(
            "{}",
            dim(&format!(
                "{} image(s) in {}ms at {}",
                batch.len(),
                batch.total_duration_ms,
                batch.processed_at.to_rfc3339()
            ))
        );
    }
}

fn print_image(image: &ImageResult) {
    let slot = if image.position == 0 {
        "primary".to_string()
    } else {
        format!("auxiliary #{}", image.position)
    };
    println!("{} {} {}", cyan("◆"), bold(&image.file_name), dim(&format!("({slot})")));

    let question = if image.no_text {
        dim("(no text recognised)")
    } else {
        image.extraction.question.clone()
    };
    println!("  {question}");

    let mut answer_marked = false;
    for (i, option) in image.extraction.options.iter().enumerate() {
        let is_answer = !answer_marked && *option == image.extraction.correct_answer;
        answer_marked |= is_answer;
        let mark = if is_answer { green("✓") } else { " ".to_string() };
        println!("  {} {}. {}", mark, option_label(i), option);
    }

    println!(
        "  {}",
        dim(&format!(
            "confidence {:.2} · {} · {} line(s)",
            image.confidence, image.processed_with, image.extraction.total_lines
        ))
    );
    println!();
}

fn option_label(i: usize) -> String {
    match u8::try_from(i) {
        Ok(n) if n < 26 => char::from(b'A' + n).to_string(),
        _ => (i + 1).to_string(),
    }
}
