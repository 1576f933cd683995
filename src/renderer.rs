//! Result renderer: the submission state machine and what it displays.
//!
//! ```text
//!            submit()                 Ok(Single | Batch)
//!   Idle ───────────────▶ Submitting ───────────────────▶ ShowingResult
//!    ▲                         │
//!    │ reset()                 │ Ok(Failure) / Err(..)
//!    └──────────────────────── ShowingError ◀──┘
//! ```
//!
//! `submit` may be called from any state; a new submission replaces the
//! previous result. While `Submitting` there is no progress figure to show:
//! the server does not report any, so views render an indeterminate state.

use crate::client::Transport;
use crate::config::ClientConfig;
use crate::error::ImgConvertError;
use crate::request::ConversionRequest;
use crate::result::{ArchiveSource, ConversionResult, GENERIC_FAILURE};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Where the renderer is in the submission lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererState {
    Idle,
    Submitting,
    ShowingResult(ConversionResult),
    ShowingError { message: String },
}

/// A user action offered alongside a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Fetch `url` and save it as `filename`.
    Download { url: String, filename: String },
    /// Decode the hex payload and save it as `filename`.
    DownloadEmbedded { hex: String, filename: String },
    /// Dismiss the result and start over.
    ConvertMore,
    /// Dismiss the error and submit again.
    Retry,
}

/// Rendered content: summary lines plus the available actions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RenderedView {
    pub lines: Vec<String>,
    pub actions: Vec<Action>,
    /// `true` while a submission is in flight (show a spinner, no percentage).
    pub busy: bool,
}

/// Drives submissions and keeps the latest outcome.
#[derive(Debug)]
pub struct ResultRenderer {
    state: RendererState,
    config: ClientConfig,
}

impl ResultRenderer {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            state: RendererState::Idle,
            config,
        }
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    /// Send `request` through `transport` and move to the resulting state.
    ///
    /// Never returns an error: transport failures land in
    /// [`RendererState::ShowingError`] so the caller can offer a retry.
    pub async fn submit(
        &mut self,
        transport: &dyn Transport,
        request: ConversionRequest,
        cancel: &CancellationToken,
    ) -> &RendererState {
        let file_count = request.file_count();
        self.state = RendererState::Submitting;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_submit_start(file_count);
        }

        let outcome = transport.send(request, cancel).await;

        self.state = match outcome {
            Ok(ConversionResult::Failure { message }) => {
                warn!("Server rejected conversion: {}", message);
                RendererState::ShowingError { message }
            }
            Ok(result) => {
                info!("Conversion succeeded");
                RendererState::ShowingResult(result)
            }
            Err(e) => {
                warn!("Conversion request failed: {}", e);
                RendererState::ShowingError {
                    message: error_message(&e),
                }
            }
        };

        if let Some(ref cb) = self.config.progress_callback {
            match &self.state {
                RendererState::ShowingError { message } => cb.on_submit_complete(Some(message)),
                _ => cb.on_submit_complete(None),
            }
        }
        &self.state
    }

    /// Back to `Idle`, dropping any displayed result.
    pub fn reset(&mut self) {
        self.state = RendererState::Idle;
    }

    /// The latest successful result, if one is displayed.
    pub fn result(&self) -> Option<&ConversionResult> {
        match &self.state {
            RendererState::ShowingResult(r) => Some(r),
            _ => None,
        }
    }

    /// Render the current state.
    pub fn view(&self) -> RenderedView {
        match &self.state {
            RendererState::Idle => RenderedView::default(),
            RendererState::Submitting => RenderedView {
                lines: vec!["Converting…".to_string()],
                actions: Vec::new(),
                busy: true,
            },
            RendererState::ShowingError { message } => RenderedView {
                lines: vec!["Conversion error".to_string(), message.clone()],
                actions: vec![Action::Retry],
                busy: false,
            },
            RendererState::ShowingResult(result) => render_result(result),
        }
    }
}

fn error_message(e: &ImgConvertError) -> String {
    let msg = e.user_message();
    if msg.trim().is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        msg
    }
}

fn render_result(result: &ConversionResult) -> RenderedView {
    match result {
        ConversionResult::Single {
            filename,
            original_dimensions,
            output_dimensions,
            compression_ratio,
            output_filename,
            download_url,
            ..
        } => {
            let mut lines = vec![
                "Conversion successful!".to_string(),
                format!("File: {}", if filename.is_empty() { "N/A" } else { filename }),
            ];
            if let Some(d) = original_dimensions {
                lines.push(format!("Original size: {d}"));
            }
            if let Some(d) = output_dimensions {
                lines.push(format!("Converted size: {d}"));
            }
            if let Some(c) = compression_ratio {
                lines.push(format!("Compression: {c}"));
            }
            RenderedView {
                lines,
                actions: vec![
                    Action::Download {
                        url: download_url.clone(),
                        filename: output_filename.clone(),
                    },
                    Action::ConvertMore,
                ],
                busy: false,
            }
        }
        ConversionResult::Batch {
            results,
            zip_filename,
            archive,
        } => {
            let ok = results.iter().filter(|r| r.success).count();
            let mut lines = vec![
                "Conversion successful!".to_string(),
                format!("Processed {} of {} images.", ok, results.len()),
                "All images are packaged in a ZIP file.".to_string(),
            ];
            for r in results {
                let mark = if r.success { "✓ Converted" } else { "✗ Error" };
                lines.push(format!("  {}  {}", mark, r.filename));
            }
            let download = match archive {
                ArchiveSource::Url { url } => Action::Download {
                    url: url.clone(),
                    filename: zip_filename.clone(),
                },
                ArchiveSource::EmbeddedHex { hex } => Action::DownloadEmbedded {
                    hex: hex.clone(),
                    filename: zip_filename.clone(),
                },
            };
            RenderedView {
                lines,
                actions: vec![download, Action::ConvertMore],
                busy: false,
            }
        }
        ConversionResult::Failure { message } => RenderedView {
            lines: vec!["Conversion error".to_string(), message.clone()],
            actions: vec![Action::Retry],
            busy: false,
        },
    }
}
