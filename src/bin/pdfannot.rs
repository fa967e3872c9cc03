//! CLI binary for pdf-annotator.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `EditorConfig`, drives an `EditSession`, and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_annotator::{
    input_text, resolve_input, AnalysisMode, Annotation, EditScript, EditSession, EditorConfig,
    ExportProgressCallback, ExportStats, FontFamily, HighlightMark, ProgressCallback,
    ServiceClient, ServiceConfig, TextMark,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar over the annotations being drawn, with
/// one log line per skipped annotation.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Exporting");
        bar.set_message("Parsing fresh copy…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} annotations",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
    }

    fn on_annotation_drawn(&self, page: u32, _index: usize, _total: usize) {
        self.bar.set_message(format!("page {page}"));
        self.bar.inc(1);
    }

    fn on_annotation_skipped(&self, page: u32, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} page {:>3}  {}", red("✗"), page, red(&msg)));
        self.bar.inc(1);
    }

    fn on_export_complete(&self, drawn: usize, skipped: usize) {
        self.bar.finish_and_clear();
        if skipped == 0 {
            eprintln!("{} {} annotations drawn", green("✔"), bold(&drawn.to_string()));
        } else {
            eprintln!(
                "{} {} drawn  ({} skipped)",
                cyan("⚠"),
                bold(&drawn.to_string()),
                red(&skipped.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Page count and page sizes
  pdfannot inspect document.pdf

  # Add a note and a highlight, write edited-document.pdf
  pdfannot annotate document.pdf --text "1:50:100:Reviewed" --highlight 2:10:20

  # Apply a placement script
  pdfannot annotate document.pdf --script marks.json -o out.pdf

  # Render page 1 with its annotations to a PNG
  pdfannot preview document.pdf --script marks.json --page 1 -o page1.png

  # Summarise a document via the hosted function
  pdfannot analyze report.pdf --mode keypoints

  # Search videos
  pdfannot search "rust ownership" --max-results 5

SCRIPT FORMAT:
  {"actions": [
    {"action": "text", "page": 1, "x": 50, "y": 100, "content": "Hello", "font": "Courier"},
    {"action": "highlight", "page": 2, "x": 10, "y": 20, "color": "#ffff00"},
    {"action": "image", "page": 1, "path": "logo.png"}
  ]}

COORDINATES:
  x/y are page points from the TOP-LEFT corner of the page, y growing down.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH        Path to the pdfium shared library
  PDFANNOT_SERVICE_URL   Base URL of the hosted functions
  PDFANNOT_SERVICE_KEY   API key for the hosted functions
  RUST_LOG               Override log filtering
"##;

/// Annotate PDF pages with text, images and highlights.
#[derive(Parser, Debug)]
#[command(
    name = "pdfannot",
    version,
    about = "Place text, image and highlight annotations on PDF pages",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFANNOT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFANNOT_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFANNOT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page count and page sizes.
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Output JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Place annotations and export the edited PDF.
    Annotate {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        marks: MarkArgs,

        /// Output path. Default: edited-document.pdf
        #[arg(short, long, env = "PDFANNOT_OUTPUT")]
        output: Option<PathBuf>,

        /// Print export stats as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render one page with its annotations to a PNG.
    Preview {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        marks: MarkArgs,

        /// 1-based page to render.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Preview zoom (0.5–2.5).
        #[arg(long, env = "PDFANNOT_SCALE", default_value_t = 1.5)]
        scale: f32,

        /// Output PNG path.
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },

    /// Summarise a PDF or plain-text file through the document-analysis function.
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        /// summary, keypoints or action.
        #[arg(long, default_value = "summary")]
        mode: AnalysisMode,

        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Search videos through the video-search function.
    Search {
        query: String,

        #[arg(long, default_value_t = 10)]
        max_results: u32,

        /// Output JSON instead of text.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        service: ServiceArgs,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFANNOT_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFANNOT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct MarkArgs {
    /// JSON placement script.
    #[arg(long, env = "PDFANNOT_SCRIPT")]
    script: Option<PathBuf>,

    /// Text mark as PAGE:X:Y:CONTENT (repeatable).
    #[arg(long = "text", value_name = "PAGE:X:Y:CONTENT")]
    texts: Vec<String>,

    /// Highlight as PAGE:X:Y (repeatable).
    #[arg(long = "highlight", value_name = "PAGE:X:Y")]
    highlights: Vec<String>,

    /// Font for --text marks: Helvetica, Courier or Times.
    #[arg(long, default_value = "Helvetica")]
    font: String,

    /// Font size for --text marks (8–72).
    #[arg(long, env = "PDFANNOT_FONT_SIZE", default_value_t = 16,
          value_parser = clap::value_parser!(u32).range(8..=72))]
    font_size: u32,

    /// Colour for text and highlights, as #RRGGBB.
    #[arg(long, env = "PDFANNOT_COLOR", default_value = "#000000")]
    color: String,

    /// Colour for --highlight marks. Default: the --color value.
    #[arg(long)]
    highlight_color: Option<String>,
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Base URL of the hosted functions.
    #[arg(long, env = "PDFANNOT_SERVICE_URL")]
    service_url: String,

    /// API key for the hosted functions.
    #[arg(long, env = "PDFANNOT_SERVICE_KEY", hide_env_values = true)]
    service_key: String,

    /// Request timeout in seconds.
    #[arg(long, env = "PDFANNOT_SERVICE_TIMEOUT", default_value_t = 60)]
    service_timeout: u64,
}

impl ServiceArgs {
    fn client(&self) -> Result<ServiceClient> {
        let mut config = ServiceConfig::new(&self.service_url, &self.service_key);
        config.timeout_secs = self.service_timeout;
        ServiceClient::new(config).context("Failed to create service client")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let show_progress = !cli.quiet && !cli.no_progress;

    match &cli.command {
        Command::Inspect { source, json } => run_inspect(source, *json).await,
        Command::Annotate {
            source,
            marks,
            output,
            json,
        } => {
            let progress: Option<ProgressCallback> = if show_progress && !*json {
                Some(CliProgressCallback::new() as Arc<dyn ExportProgressCallback>)
            } else {
                None
            };
            run_annotate(source, marks, output.as_deref(), *json, cli.quiet, progress).await
        }
        Command::Preview {
            source,
            marks,
            page,
            scale,
            output,
        } => run_preview(source, marks, *page, *scale, output, cli.quiet).await,
        Command::Analyze {
            source,
            mode,
            service,
        } => run_analyze(source, *mode, service).await,
        Command::Search {
            query,
            max_results,
            json,
            service,
        } => run_search(query, *max_results, *json, service).await,
    }
}

async fn run_inspect(source: &SourceArgs, json: bool) -> Result<()> {
    let session = open_session(source, EditorConfig::default()).await?;
    let doc = session.document();

    if json {
        let value = serde_json::json!({
            "input": source.input,
            "page_count": doc.page_count(),
            "pages": doc.geometry(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise metadata")?
        );
    } else {
        println!("File:   {}", source.input);
        println!("Pages:  {}", doc.page_count());
        for (i, g) in doc.geometry().iter().enumerate() {
            println!("  {:>4}  {:.1} × {:.1} pt", i + 1, g.width, g.height);
        }
    }
    Ok(())
}

async fn run_annotate(
    source: &SourceArgs,
    marks: &MarkArgs,
    output: Option<&Path>,
    json: bool,
    quiet: bool,
    progress: Option<ProgressCallback>,
) -> Result<()> {
    let mut builder = base_config(source, marks);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let mut session = open_session(source, config).await?;
    let placed = place_marks(&mut session, marks).await?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&session.config().output_filename));

    let stats = session
        .export_to_file(&path)
        .await
        .context("Export failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !quiet {
        print_summary(&stats, placed, &path);
    }
    Ok(())
}

async fn run_preview(
    source: &SourceArgs,
    marks: &MarkArgs,
    page: u32,
    scale: f32,
    output: &Path,
    quiet: bool,
) -> Result<()> {
    let config = base_config(source, marks)
        .preview_scale(scale)
        .build()
        .context("Invalid configuration")?;

    let mut session = open_session(source, config).await?;
    place_marks(&mut session, marks).await?;

    let canvas = session
        .preview(page)
        .await
        .with_context(|| format!("Failed to render page {page}"))?;
    canvas
        .save_with_format(output, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if !quiet {
        eprintln!(
            "{} page {}  {}×{} px  →  {}",
            green("✔"),
            page,
            canvas.width(),
            canvas.height(),
            bold(&output.display().to_string())
        );
    }
    Ok(())
}

async fn run_analyze(source: &SourceArgs, mode: AnalysisMode, service: &ServiceArgs) -> Result<()> {
    let resolved = resolve_input(&source.input, source.download_timeout)
        .await
        .with_context(|| format!("Failed to open {}", source.input))?;
    let text = input_text(resolved, source.password.as_deref())
        .await
        .context("Failed to extract text")?;
    if text.trim().is_empty() {
        bail!("No extractable text in {} (scanned document?)", source.input);
    }

    let summary = service
        .client()?
        .analyze_document(&text, mode)
        .await
        .context("Document analysis failed")?;
    println!("{summary}");
    Ok(())
}

async fn run_search(query: &str, max_results: u32, json: bool, service: &ServiceArgs) -> Result<()> {
    let videos = service
        .client()?
        .search_videos(query, max_results)
        .await
        .context("Video search failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&videos).context("Failed to serialise results")?
        );
        return Ok(());
    }

    for v in &videos {
        println!("{}", bold(&v.title));
        println!(
            "  {}  {}",
            cyan(&format!("https://www.youtube.com/watch?v={}", v.video_id)),
            dim(&v.channel_title)
        );
        if let Some(ref summary) = v.ai_summary {
            println!("  {summary}");
        }
    }
    if videos.is_empty() {
        eprintln!("No results for '{query}'");
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn base_config(source: &SourceArgs, marks: &MarkArgs) -> pdf_annotator::EditorConfigBuilder {
    let mut builder = EditorConfig::builder()
        .font_size(marks.font_size)
        .color(marks.color.clone());
    if let Some(ref pwd) = source.password {
        builder = builder.password(pwd.clone());
    }
    builder
}

async fn open_session(source: &SourceArgs, config: EditorConfig) -> Result<EditSession> {
    EditSession::open_input(&source.input, config, source.download_timeout)
        .await
        .with_context(|| format!("Failed to open {}", source.input))
}

/// Apply the script (if any), then the inline --text / --highlight marks.
async fn place_marks(session: &mut EditSession, marks: &MarkArgs) -> Result<usize> {
    let mut placed = 0;

    if let Some(ref path) = marks.script {
        let script = EditScript::load(path)
            .await
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        placed += script
            .apply(session, base_dir)
            .await
            .context("Failed to apply script")?
            .len();
    }

    let font = FontFamily::from_name(&marks.font);
    for spec in &marks.texts {
        let (page, x, y, content) = parse_text_mark(spec)?;
        let mark = TextMark {
            content,
            font,
            size: marks.font_size,
            color: marks.color.clone(),
        };
        session
            .add(Annotation::text(page, x, y, mark))
            .with_context(|| format!("Cannot place --text {spec}"))?;
        placed += 1;
    }

    let highlight_color = marks.highlight_color.as_ref().unwrap_or(&marks.color);
    for spec in &marks.highlights {
        let (page, x, y) = parse_position(spec)?;
        let config = session.config();
        let mark = HighlightMark::new(
            config.highlight_width,
            config.highlight_height,
            highlight_color.clone(),
        );
        session
            .add(Annotation::highlight(page, x, y, mark))
            .with_context(|| format!("Cannot place --highlight {spec}"))?;
        placed += 1;
    }

    Ok(placed)
}

/// Parse `PAGE:X:Y`.
fn parse_position(s: &str) -> Result<(u32, f32, f32)> {
    let parts: Vec<&str> = s.splitn(3, ':').collect();
    let [page, x, y] = parts.as_slice() else {
        bail!("Expected PAGE:X:Y, got '{s}'");
    };
    let page: u32 = page.trim().parse().context("Invalid page number")?;
    if page < 1 {
        bail!("Pages are 1-indexed, minimum is 1 (got {page})");
    }
    let x: f32 = x.trim().parse().context("Invalid x coordinate")?;
    let y: f32 = y.trim().parse().context("Invalid y coordinate")?;
    Ok((page, x, y))
}

/// Parse `PAGE:X:Y:CONTENT`; the content may itself contain colons.
fn parse_text_mark(s: &str) -> Result<(u32, f32, f32, String)> {
    let mut parts = s.splitn(4, ':');
    let (Some(page), Some(x), Some(y), Some(content)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("Expected PAGE:X:Y:CONTENT, got '{s}'");
    };
    let (page, x, y) = parse_position(&format!("{page}:{x}:{y}"))?;
    if content.trim().is_empty() {
        bail!("Text content must not be empty");
    }
    Ok((page, x, y, content.to_string()))
}

fn print_summary(stats: &ExportStats, placed: usize, path: &Path) {
    eprintln!(
        "{}  {}/{} annotations  {}ms  →  {}",
        if stats.skipped == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.drawn,
        placed,
        stats.duration_ms,
        bold(&path.display().to_string()),
    );
    for failure in &stats.failures {
        eprintln!("   {} {}", red("✗"), dim(&failure.to_string()));
    }
}
