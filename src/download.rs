//! Saving converted output to disk.
//!
//! Two ways a result reaches the user:
//!
//! * [`save_from_url`]: the normal path. GET the server's `download_url`
//!   and write the body.
//! * [`save_hex_archive`]: for servers that embed the ZIP as a hex
//!   string in the JSON response instead of linking to it.
//!
//! Both write through a temp file in the destination directory and rename
//! it into place, so an interrupted download never leaves a truncated file
//! under the final name.

use crate::config::ClientConfig;
use crate::error::ImgConvertError;
use crate::renderer::Action;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Reduce a server-supplied name to a bare file name.
///
/// Strips any directory components (`../x`, `a/b.png`, `C:\x`) so the
/// server cannot choose where the file lands.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "download".to_string()
    } else {
        base.to_string()
    }
}

/// Download `url` (absolute or relative to `config.base_url`) into
/// `dest_dir/filename`. Returns the written path.
pub async fn save_from_url(
    http: &reqwest::Client,
    config: &ClientConfig,
    url: &str,
    filename: &str,
    dest_dir: &Path,
) -> Result<PathBuf, ImgConvertError> {
    let resolved = config.resolve(url)?;
    let url_str = resolved.to_string();
    info!("Downloading {}", url_str);

    let response = http
        .get(resolved)
        .timeout(Duration::from_secs(config.download_timeout_secs))
        .send()
        .await
        .map_err(|e| ImgConvertError::DownloadFailed {
            url: url_str.clone(),
            reason: if e.is_timeout() {
                format!("timed out after {}s", config.download_timeout_secs)
            } else {
                e.to_string()
            },
        })?;

    if !response.status().is_success() {
        return Err(ImgConvertError::DownloadFailed {
            url: url_str,
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ImgConvertError::DownloadFailed {
            url: url_str.clone(),
            reason: e.to_string(),
        })?;
    debug!("Downloaded {} bytes from {}", bytes.len(), url_str);

    write_atomic(dest_dir, filename, &bytes).await
}

/// Decode a hex-encoded archive and save it as `dest_dir/filename`.
pub async fn save_hex_archive(
    hex_data: &str,
    filename: &str,
    dest_dir: &Path,
) -> Result<PathBuf, ImgConvertError> {
    let bytes = hex::decode(hex_data.trim()).map_err(|e| ImgConvertError::InvalidArchive {
        filename: filename.to_string(),
        detail: e.to_string(),
    })?;
    write_atomic(dest_dir, filename, &bytes).await
}

/// Carry out a download [`Action`]. Other actions yield `Ok(None)`.
pub async fn perform(
    action: &Action,
    http: &reqwest::Client,
    config: &ClientConfig,
    dest_dir: &Path,
) -> Result<Option<PathBuf>, ImgConvertError> {
    match action {
        Action::Download { url, filename } => {
            save_from_url(http, config, url, filename, dest_dir)
                .await
                .map(Some)
        }
        Action::DownloadEmbedded { hex, filename } => {
            save_hex_archive(hex, filename, dest_dir).await.map(Some)
        }
        Action::ConvertMore | Action::Retry => Ok(None),
    }
}

/// Write `bytes` to `dest_dir/filename` via temp file + rename.
async fn write_atomic(
    dest_dir: &Path,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, ImgConvertError> {
    let target = dest_dir.join(sanitize_filename(filename));

    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| ImgConvertError::OutputWriteFailed {
            path: target.clone(),
            source: e,
        })?;

    let dir = dest_dir.to_path_buf();
    let final_path = target.clone();
    let data = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&final_path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| ImgConvertError::Internal(format!("Write task panicked: {e}")))?
    .map_err(|e| ImgConvertError::OutputWriteFailed {
        path: target.clone(),
        source: e,
    })?;

    info!("Saved {} ({} bytes)", target.display(), bytes.len());
    Ok(target)
}
