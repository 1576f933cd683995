//! Client configuration for talking to the conversion server.
//!
//! Everything that is fixed for the lifetime of a client (server location,
//! limits, timeouts, progress hooks) lives in [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. Per-submission choices (format, quality,
//! dimensions) live in [`crate::options::ConversionOptions`] instead, because
//! they are rebuilt every time the user presses "convert".

use crate::error::ImgConvertError;
use crate::progress::ProgressCallback;
use reqwest::Url;
use std::fmt;

/// Largest accepted upload per file: 50 MiB, matching the server's
/// `MAX_CONTENT_LENGTH`.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Largest width or height the server will resize to.
pub const DEFAULT_MAX_DIMENSION: u32 = 5000;

/// Configuration for an upload-and-convert client.
///
/// # Example
/// ```rust
/// use edgequake_imgconvert::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://localhost:5000")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.upload_url().unwrap().as_str(), "http://localhost:5000/upload");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `http://localhost:5000`. Default: `http://127.0.0.1:5000`.
    ///
    /// Relative download URLs returned by the server (`/download/...`) are
    /// resolved against this.
    pub base_url: String,

    /// Path of the upload endpoint. Default: `/upload`.
    pub upload_path: String,

    /// Per-file size limit in bytes. Default: 50 MiB.
    ///
    /// Checked at intake so an oversize batch never reaches the network.
    pub max_file_bytes: u64,

    /// Upper bound for requested width/height. Default: 5000.
    pub max_dimension: u32,

    /// Number of files probed concurrently during intake. Default: 8.
    ///
    /// Probing reads the whole file and decodes its header; a handful in
    /// flight keeps disks busy without holding hundreds of buffers at once.
    pub intake_concurrency: usize,

    /// Timeout for the upload round trip in seconds. Default: 120.
    ///
    /// Conversion of a large batch happens while the request is open, so
    /// this is deliberately generous.
    pub request_timeout_secs: u64,

    /// Timeout for downloading a converted file in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress callback for intake and submission events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            upload_path: "/upload".to_string(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            intake_concurrency: 8,
            request_timeout_secs: 120,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("upload_path", &self.upload_path)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("max_dimension", &self.max_dimension)
            .field("intake_concurrency", &self.intake_concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Parsed server root.
    pub fn base(&self) -> Result<Url, ImgConvertError> {
        parse_base(&self.base_url)
    }

    /// Full URL of the upload endpoint.
    pub fn upload_url(&self) -> Result<Url, ImgConvertError> {
        self.base()?
            .join(self.upload_path.trim_start_matches('/'))
            .map_err(|e| {
                ImgConvertError::InvalidConfig(format!(
                    "Invalid upload path '{}': {e}",
                    self.upload_path
                ))
            })
    }

    /// Resolve a server-returned URL (absolute or `/download/...`).
    pub fn resolve(&self, url: &str) -> Result<Url, ImgConvertError> {
        let joined = if url.starts_with("http://") || url.starts_with("https://") {
            Url::parse(url)
        } else {
            self.base()?.join(url.trim_start_matches('/'))
        };
        joined.map_err(|e| ImgConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Parse a base URL, normalising it to end in `/` so `join` appends instead
/// of replacing the last segment.
fn parse_base(s: &str) -> Result<Url, ImgConvertError> {
    let with_slash = if s.ends_with('/') {
        s.to_string()
    } else {
        format!("{s}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| ImgConvertError::InvalidConfig(format!("Invalid base URL '{s}': {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ImgConvertError::InvalidConfig(format!(
            "Base URL must be http(s), got '{s}'"
        )));
    }
    Ok(url)
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.config.upload_path = path.into();
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px;
        self
    }

    pub fn intake_concurrency(mut self, n: usize) -> Self {
        self.config.intake_concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ImgConvertError> {
        let c = &self.config;
        parse_base(&c.base_url)?;
        if c.max_file_bytes == 0 {
            return Err(ImgConvertError::InvalidConfig(
                "max_file_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_dimension == 0 {
            return Err(ImgConvertError::InvalidConfig(
                "max_dimension must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(ImgConvertError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.max_file_bytes, 50 * 1024 * 1024);
        assert_eq!(c.max_dimension, 5000);
        assert_eq!(c.upload_url().unwrap().as_str(), "http://127.0.0.1:5000/upload");
    }

    #[test]
    fn base_url_with_prefix_keeps_prefix() {
        let c = ClientConfig::builder()
            .base_url("https://tools.example.com/convert")
            .build()
            .unwrap();
        assert_eq!(
            c.upload_url().unwrap().as_str(),
            "https://tools.example.com/convert/upload"
        );
        assert_eq!(
            c.resolve("/download/out.png").unwrap().as_str(),
            "https://tools.example.com/convert/download/out.png"
        );
    }

    #[test]
    fn resolve_absolute_url_untouched() {
        let c = ClientConfig::default();
        let u = c.resolve("https://cdn.example.com/x.zip").unwrap();
        assert_eq!(u.as_str(), "https://cdn.example.com/x.zip");
    }

    #[test]
    fn build_rejects_bad_base_url() {
        let err = ClientConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ImgConvertError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_zero_timeout() {
        let err = ClientConfig::builder()
            .request_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Timeouts"));
    }

    #[test]
    fn intake_concurrency_is_at_least_one() {
        let c = ClientConfig::builder().intake_concurrency(0).build().unwrap();
        assert_eq!(c.intake_concurrency, 1);
    }
}
