//! CLI binary for edgequake-imgconvert.
//!
//! A thin shim over the library crate: maps flags to `ClientConfig` and
//! `ConversionOptions`, uploads, prints the result and saves the output.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_imgconvert::{
    download, Action, CancellationToken, ClientConfig, ConversionOptions, ConversionProgressCallback,
    ConversionRequest, FileRecord, HttpTransport, IcoSize, OutputFormat, ProgressCallback,
    QualityPreset, RawFile, RendererState, ResultRenderer, Selection,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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

/// Terminal progress callback. Intake gets a counting bar (probes finish
/// out of order, so only the count advances); the upload gets a spinner
/// because the server reports no progress.
struct CliProgressCallback {
    bar: ProgressBar,
    probe_errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Reading");
        bar.set_message("Checking files…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            probe_errors: AtomicUsize::new(0),
        })
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_intake_start(&self, total_files: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos:>3}/{len} files",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_files as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
    }

    fn on_record_ready(&self, index: usize, total: usize, record: &FileRecord) {
        let dims = record
            .dimensions
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown size".to_string());
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index + 1,
            total,
            record.display_name,
            dim(&dims),
        ));
        self.bar.inc(1);
    }

    fn on_probe_error(&self, _index: usize, error: &str) {
        self.probe_errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!("  {} {}", cyan("⚠"), dim(error)));
    }

    fn on_intake_complete(&self, admitted: usize, selection_len: usize) {
        let failed = self.probe_errors.load(Ordering::SeqCst);
        let note = if failed > 0 {
            format!(", {failed} probe warning(s)")
        } else {
            String::new()
        };
        self.bar.println(format!(
            "{} {} file(s) selected ({} added{})",
            cyan("◆"),
            bold(&selection_len.to_string()),
            admitted,
            note
        ));
    }

    fn on_submit_start(&self, file_count: usize) {
        // No percentage: the server does not report one.
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Converting");
        self.bar
            .set_message(format!("uploading {file_count} file(s)…"));
        self.bar.reset_elapsed();
    }

    fn on_submit_complete(&self, error: Option<&str>) {
        self.bar.finish_and_clear();
        if let Some(e) = error {
            eprintln!("{} {}", red("✘"), red(e));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one image to JPEG (default) and save it here
  imgconvert photo.png

  # WebP at 800 px wide, height follows the aspect ratio
  imgconvert --format webp --width 800 photo.png

  # Several files packaged into one ZIP
  imgconvert --batch --format png -o out/ a.jpg b.jpg c.jpg

  # Multi-size favicon
  imgconvert --format ico --ico-multi-size logo.png

  # Show file details without contacting the server
  imgconvert --inspect-only *.jpg

  # JSON result, no download
  imgconvert --json --no-download photo.png

OUTPUT FORMATS:
  png, jpeg, bmp, gif, tiff, ico, webp
  Quality applies to jpeg and webp only.

QUALITY:
  high (95), medium (85, default), low (70), or any value 1-100

ENVIRONMENT VARIABLES:
  IMGCONVERT_SERVER       Base URL of the conversion service
  IMGCONVERT_OUTPUT_DIR   Directory for downloaded results
  RUST_LOG                Log filter (overrides --verbose/--quiet)
"#;

/// Convert images through an image-conversion web service.
#[derive(Parser, Debug)]
#[command(
    name = "imgconvert",
    version,
    about = "Convert images through an image-conversion web service",
    long_about = "Upload image files to an image-conversion service, convert them to PNG, \
JPEG, BMP, GIF, TIFF, ICO or WebP with optional resizing, and download the result \
(a single file, or a ZIP in batch mode).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Base URL of the conversion service.
    #[arg(long, env = "IMGCONVERT_SERVER", default_value = "http://127.0.0.1:5000")]
    server: String,

    /// Output format: png, jpeg, bmp, gif, tiff, ico, webp.
    #[arg(short, long, env = "IMGCONVERT_FORMAT", default_value = "jpeg",
          value_parser = parse_format)]
    format: OutputFormat,

    /// Quality: high, medium, low, or 1-100.
    #[arg(long, env = "IMGCONVERT_QUALITY", default_value = "medium",
          value_parser = parse_quality)]
    quality: QualityPreset,

    /// Target width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Do not keep the aspect ratio when only one dimension is given.
    #[arg(long)]
    no_maintain_aspect: bool,

    /// Package all outputs into one ZIP.
    #[arg(long, env = "IMGCONVERT_BATCH")]
    batch: bool,

    /// ICO only: embed 16–256 px variants in one icon.
    #[arg(long)]
    ico_multi_size: bool,

    /// ICO only: single icon size (16, 32, 48, 64, 128, 256).
    #[arg(long, default_value_t = 256, value_parser = parse_ico_size)]
    ico_size: u32,

    /// Directory for downloaded results.
    #[arg(short, long, env = "IMGCONVERT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Do not download the converted output.
    #[arg(long)]
    no_download: bool,

    /// Print the result as JSON.
    #[arg(long, env = "IMGCONVERT_JSON")]
    json: bool,

    /// Print file details only, no upload.
    #[arg(long)]
    inspect_only: bool,

    /// Upload timeout in seconds.
    #[arg(long, env = "IMGCONVERT_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Download timeout in seconds.
    #[arg(long, env = "IMGCONVERT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "IMGCONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMGCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMGCONVERT_QUIET")]
    quiet: bool,
}

fn parse_format(s: &str) -> std::result::Result<OutputFormat, String> {
    s.parse()
}

fn parse_quality(s: &str) -> std::result::Result<QualityPreset, String> {
    s.parse()
}

fn parse_ico_size(s: &str) -> std::result::Result<u32, String> {
    let px: u32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    IcoSize::from_pixels(px)
        .map(|_| px)
        .ok_or_else(|| format!("ICO size must be one of 16, 32, 48, 64, 128, 256 (got {px})"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; --verbose brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Intake ───────────────────────────────────────────────────────────
    let raw_files = cli
        .inputs
        .iter()
        .map(|p| RawFile::from_path(p).with_context(|| format!("Cannot open {}", p.display())))
        .collect::<Result<Vec<_>>>()?;

    let mut selection = Selection::new();
    selection
        .ingest(raw_files, &config)
        .await
        .context("File selection rejected")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let infos: Vec<_> = selection.iter().map(FileRecord::info).collect();
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&infos).context("Failed to serialise file info")?
            );
        } else {
            for (i, info) in infos.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{info}");
            }
        }
        return Ok(());
    }

    // ── Options + request ────────────────────────────────────────────────
    let options = build_options(&cli, &selection);
    let request = ConversionRequest::build(&options, &selection, &config)
        .context("Invalid conversion options")?;

    // ── Submit (Ctrl-C cancels) ──────────────────────────────────────────
    let transport = HttpTransport::new(config.clone()).context("Invalid server URL")?;
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut renderer = ResultRenderer::new(config.clone());
    renderer.submit(&transport, request, &cancel).await;

    let view = renderer.view();
    if cli.json {
        let payload = match renderer.state() {
            RendererState::ShowingResult(r) => serde_json::to_value(r),
            _ => serde_json::to_value(&view),
        }
        .context("Failed to serialise result")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("Failed to serialise result")?
        );
    } else if !cli.quiet || matches!(renderer.state(), RendererState::ShowingError { .. }) {
        for (i, line) in view.lines.iter().enumerate() {
            if i == 0 {
                match renderer.state() {
                    RendererState::ShowingError { .. } => eprintln!("{} {}", red("✘"), bold(line)),
                    _ => eprintln!("{} {}", green("✔"), bold(line)),
                }
            } else {
                eprintln!("   {line}");
            }
        }
    }

    if let RendererState::ShowingError { message } = renderer.state() {
        anyhow::bail!("Conversion failed: {message}");
    }

    // ── Download ─────────────────────────────────────────────────────────
    if cli.no_download {
        return Ok(());
    }
    for action in &view.actions {
        if !matches!(action, Action::Download { .. } | Action::DownloadEmbedded { .. }) {
            continue;
        }
        let saved = download::perform(action, transport.http(), &config, &cli.output_dir)
            .await
            .context("Download failed")?;
        if let (Some(path), false) = (saved, cli.quiet || cli.json) {
            eprintln!("   {} {}", dim("→"), bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(cli.server.clone())
        .request_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

/// Map CLI args to `ConversionOptions`, applying the aspect lock against the
/// first selected file.
fn build_options(cli: &Cli, selection: &Selection) -> ConversionOptions {
    let reference = selection.reference_dimensions();
    let mut options = ConversionOptions::builder()
        .quality_preset(cli.quality)
        .batch(cli.batch)
        .ico_multi_size(cli.ico_multi_size)
        .ico_size(IcoSize::from_pixels(cli.ico_size).unwrap_or_default())
        .build();

    options.set_maintain_aspect(!cli.no_maintain_aspect);
    match (cli.width, cli.height) {
        // Both given: take them as-is.
        (Some(w), Some(h)) => {
            options.width = Some(w);
            options.height = Some(h);
        }
        (Some(w), None) => options.set_width(Some(w), reference),
        (None, Some(h)) => options.set_height(Some(h), reference),
        (None, None) => {}
    }
    options.set_format(cli.format);
    options
}
