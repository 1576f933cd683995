//! HTTP transport for the `/upload` endpoint.
//!
//! [`Transport`] is the seam between the result renderer and the network:
//! production code uses [`HttpTransport`] (reqwest), tests can plug in a
//! canned implementation. A submission ends at whichever comes first of
//! the response, the configured timeout or the [`CancellationToken`], so a
//! caller is never stuck waiting on a server that stopped answering.

use crate::config::ClientConfig;
use crate::error::ImgConvertError;
use crate::request::ConversionRequest;
use crate::result::ConversionResult;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sends a conversion request and returns the classified result.
///
/// `Ok(ConversionResult::Failure { .. })` means the server answered and
/// said no; `Err(..)` means no usable answer arrived.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ImgConvertError>;
}

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, ImgConvertError> {
        // Validate the URL up front rather than on first submit.
        config.upload_url()?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ImgConvertError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// The underlying client, shared with downloads.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send_inner(
        &self,
        request: ConversionRequest,
    ) -> Result<ConversionResult, ImgConvertError> {
        let url = self.config.upload_url()?;
        let url_str = url.to_string();
        let file_count = request.file_count();
        let form = request.into_form().await?;

        info!("Uploading {} file(s) to {}", file_count, url_str);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_send_error(e, &url_str, self.config.request_timeout_secs))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_send_error(e, &url_str, self.config.request_timeout_secs))?;
        debug!("Server answered HTTP {} with {} bytes", status, body.len());

        ConversionResult::from_body(status, &body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ImgConvertError> {
        let url = self.config.upload_url()?.to_string();
        let secs = self.config.request_timeout_secs;
        let start = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Upload to {} cancelled", url);
                Err(ImgConvertError::Cancelled { url: url.clone() })
            }
            res = tokio::time::timeout(Duration::from_secs(secs), self.send_inner(request)) => {
                match res {
                    Ok(inner) => inner,
                    Err(_) => Err(ImgConvertError::RequestTimeout { url: url.clone(), secs }),
                }
            }
        };

        debug!(
            "Upload finished in {}ms (ok = {})",
            start.elapsed().as_millis(),
            outcome.is_ok()
        );
        outcome
    }
}

fn map_send_error(e: reqwest::Error, url: &str, secs: u64) -> ImgConvertError {
    if e.is_timeout() {
        ImgConvertError::RequestTimeout {
            url: url.to_string(),
            secs,
        }
    } else {
        ImgConvertError::RequestFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
