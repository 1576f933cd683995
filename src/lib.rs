//! # edgequake-imgconvert
//!
//! Client for an image-conversion web service: pick image files, choose an
//! output format and size, upload them, and fetch the converted result.
//!
//! ## Flow
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Intake    validate (images only, size limit) and probe each file
//!  │               for dimensions + preview (CPU-bound, spawn_blocking)
//!  ├─ 2. Select    ordered list: add / remove / clear, first-file preview
//!  ├─ 3. Options   format, quality, width/height with aspect lock, ICO
//!  ├─ 4. Request   validate dimensions, build the multipart form
//!  ├─ 5. Submit    POST /upload with timeout + cancellation
//!  └─ 6. Result    single file, batch ZIP, or failure message; download
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_imgconvert::{
//!     download, CancellationToken, ClientConfig, ConversionOptions, ConversionRequest,
//!     HttpTransport, OutputFormat, RawFile, ResultRenderer, Selection,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://127.0.0.1:5000")
//!         .build()?;
//!
//!     let mut selection = Selection::new();
//!     selection
//!         .ingest(vec![RawFile::from_path("photo.png")?], &config)
//!         .await?;
//!
//!     let mut options = ConversionOptions::default();
//!     options.set_format(OutputFormat::Webp);
//!     options.set_width(Some(800), selection.reference_dimensions());
//!
//!     let request = ConversionRequest::build(&options, &selection, &config)?;
//!     let transport = HttpTransport::new(config.clone())?;
//!     let mut renderer = ResultRenderer::new(config.clone());
//!     renderer
//!         .submit(&transport, request, &CancellationToken::new())
//!         .await;
//!
//!     for action in renderer.view().actions {
//!         if let Some(path) =
//!             download::perform(&action, transport.http(), &config, ".".as_ref()).await?
//!         {
//!             println!("saved {}", path.display());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgconvert` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-imgconvert = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod intake;
pub mod options;
pub mod progress;
pub mod renderer;
pub mod request;
pub mod result;
pub mod selection;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{HttpTransport, Transport};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_MAX_DIMENSION, DEFAULT_MAX_FILE_BYTES};
pub use error::{Axis, ImgConvertError, ProbeError};
pub use intake::{
    format_file_size, Dimensions, FileInfo, FileRecord, FileSource, PreviewData, RawFile, RecordId,
};
pub use options::{ConversionOptions, ConversionOptionsBuilder, IcoSize, OutputFormat, QualityPreset};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use renderer::{Action, RenderedView, RendererState, ResultRenderer};
pub use request::ConversionRequest;
pub use result::{ArchiveSource, BatchEntry, ConversionResult};
pub use selection::{Preview, Selection};

pub use tokio_util::sync::CancellationToken;
