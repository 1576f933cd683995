//! Server response parsing.
//!
//! The `/upload` endpoint answers with one loosely-typed JSON object whose
//! shape depends on the outcome. [`RawResponse`] accepts every field any
//! shape may carry; [`ConversionResult::from_response`] then classifies it
//! into exactly one of single, batch or failure.
//!
//! Quirks handled here:
//! * a failed single conversion comes back as HTTP 200 with
//!   `success: false`, so success is decided by the body, not the status;
//! * request-level errors carry only `error` (no `success` field) with a
//!   4xx/5xx status;
//! * older servers embed the ZIP as a hex string (`zip_data`) instead of a
//!   `download_url`.

use crate::error::ImgConvertError;
use crate::intake::Dimensions;
use serde::{Deserialize, Serialize};

/// Message used when the server gives no reason.
pub const GENERIC_FAILURE: &str = "Conversion failed";

/// Every field the server may send, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResponse {
    pub success: Option<bool>,
    pub error: Option<String>,
    #[serde(default)]
    pub batch: bool,
    pub filename: Option<String>,
    pub original_size: Option<(u32, u32)>,
    pub output_dimensions: Option<(u32, u32)>,
    pub compression_ratio: Option<String>,
    pub output_filename: Option<String>,
    pub download_url: Option<String>,
    pub is_ico: Option<bool>,
    pub ico_multi_size: Option<bool>,
    pub zip_filename: Option<String>,
    pub zip_data: Option<String>,
    #[serde(default)]
    pub results: Vec<RawBatchEntry>,
}

/// One element of a batch response's `results` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBatchEntry {
    pub filename: Option<String>,
    #[serde(default)]
    pub success: bool,
    pub output_filename: Option<String>,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

/// Per-file outcome inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub filename: String,
    pub success: bool,
    pub output_filename: Option<String>,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

/// Where a batch archive can be fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArchiveSource {
    /// Download from this (possibly relative) URL.
    Url { url: String },
    /// Legacy: archive bytes embedded as a hex string.
    EmbeddedHex { hex: String },
}

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversionResult {
    Single {
        filename: String,
        original_dimensions: Option<Dimensions>,
        output_dimensions: Option<Dimensions>,
        /// Server-formatted, e.g. `"42.1%"` or `"N/A"`.
        compression_ratio: Option<String>,
        output_filename: String,
        download_url: String,
        is_ico: bool,
        ico_multi_size: bool,
    },
    Batch {
        results: Vec<BatchEntry>,
        zip_filename: String,
        archive: ArchiveSource,
    },
    Failure {
        message: String,
    },
}

impl ConversionResult {
    /// Classify a response body received with HTTP `status`.
    ///
    /// Returns [`ImgConvertError::InvalidResponse`] only when the body claims
    /// success but lacks what is needed to fetch the output.
    pub fn from_response(status: u16, raw: RawResponse) -> Result<Self, ImgConvertError> {
        let ok_status = (200..300).contains(&status);
        let success = raw.success.unwrap_or(ok_status && raw.error.is_none());

        if !ok_status || !success {
            return Ok(ConversionResult::Failure {
                message: raw
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            });
        }

        if raw.batch {
            let archive = match (raw.download_url, raw.zip_data) {
                (Some(url), _) => ArchiveSource::Url { url },
                (None, Some(hex)) => ArchiveSource::EmbeddedHex { hex },
                (None, None) => {
                    return Err(ImgConvertError::InvalidResponse {
                        detail: "batch response has neither download_url nor zip_data".into(),
                    })
                }
            };
            let results = raw
                .results
                .into_iter()
                .map(|e| BatchEntry {
                    filename: e.filename.unwrap_or_default(),
                    success: e.success,
                    output_filename: e.output_filename,
                    download_url: e.download_url,
                    error: e.error,
                })
                .collect();
            return Ok(ConversionResult::Batch {
                results,
                zip_filename: raw
                    .zip_filename
                    .unwrap_or_else(|| "converted_images.zip".to_string()),
                archive,
            });
        }

        let download_url = raw.download_url.ok_or_else(|| ImgConvertError::InvalidResponse {
            detail: "successful response has no download_url".into(),
        })?;
        let output_filename = raw
            .output_filename
            .or_else(|| download_url.rsplit('/').next().map(str::to_string))
            .unwrap_or_else(|| "converted".to_string());

        Ok(ConversionResult::Single {
            filename: raw.filename.unwrap_or_default(),
            original_dimensions: raw.original_size.map(|(w, h)| Dimensions::new(w, h)),
            output_dimensions: raw.output_dimensions.map(|(w, h)| Dimensions::new(w, h)),
            compression_ratio: raw.compression_ratio,
            output_filename,
            download_url,
            is_ico: raw.is_ico.unwrap_or(false),
            ico_multi_size: raw.ico_multi_size.unwrap_or(false),
        })
    }

    /// Parse a response body. Bodies that are not JSON become an
    /// [`ImgConvertError::ServerError`] for non-2xx statuses (an HTML error
    /// page from a proxy, say) and an [`ImgConvertError::InvalidResponse`]
    /// otherwise.
    pub fn from_body(status: u16, body: &[u8]) -> Result<Self, ImgConvertError> {
        match serde_json::from_slice::<RawResponse>(body) {
            Ok(raw) => Self::from_response(status, raw),
            Err(_) if !(200..300).contains(&status) => Err(ImgConvertError::ServerError {
                status,
                message: format!("{GENERIC_FAILURE} (HTTP {status})"),
            }),
            Err(e) => Err(ImgConvertError::InvalidResponse {
                detail: format!("body is not valid JSON: {e}"),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ConversionResult::Failure { .. })
    }
}
