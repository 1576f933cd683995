//! File intake: validate raw files and probe their metadata.
//!
//! A [`RawFile`] is what a caller hands us: a path on disk or an in-memory
//! buffer with a name and MIME type. Validation is all-or-nothing: if any
//! image in the batch is over the size limit, nothing is admitted. Files
//! that pass become [`FileRecord`]s after two independent probes:
//!
//! 1. **read**: load the bytes and wrap them as a `data:` URL preview
//! 2. **dimensions**: decode only the image header for width × height
//!
//! Either probe may fail without failing intake; the record just lacks the
//! corresponding field. Probes for different files run concurrently and
//! finish in any order, so every probe is seeded with the file's batch index
//! and results are put back in submission order.

use crate::config::ClientConfig;
use crate::error::{ImgConvertError, ProbeError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ── Raw input ────────────────────────────────────────────────────────────

/// Where a raw file's bytes live.
#[derive(Clone)]
pub enum FileSource {
    /// File on disk; read lazily at probe and upload time.
    Path(PathBuf),
    /// Bytes already in memory.
    Memory(Arc<[u8]>),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            FileSource::Memory(b) => write!(f, "Memory(<{} bytes>)", b.len()),
        }
    }
}

/// A file as selected by the user, before validation.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub source: FileSource,
}

impl RawFile {
    /// Describe a file on disk. The MIME type is guessed from the extension,
    /// as a browser does for `<input type="file">`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImgConvertError> {
        let path = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => ImgConvertError::PermissionDenied {
                path: path.clone(),
            },
            _ => ImgConvertError::FileNotFound { path: path.clone() },
        })?;
        if !meta.is_file() {
            return Err(ImgConvertError::FileNotFound { path });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            name,
            mime_type,
            size: meta.len(),
            source: FileSource::Path(path),
        })
    }

    /// Describe an in-memory buffer.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    /// `true` when the MIME type is `image/*`.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Load the file's bytes.
    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Path(p) => tokio::fs::read(p).await,
            FileSource::Memory(b) => Ok(b.to_vec()),
        }
    }
}

// ── Records ──────────────────────────────────────────────────────────────

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, monotonically increasing record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    fn next() -> Self {
        RecordId(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `width / height`, or `None` for a zero height.
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.height > 0).then(|| self.width as f64 / self.height as f64)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} px", self.width, self.height)
    }
}

/// A displayable preview: the file encoded as a `data:` URL.
#[derive(Clone, PartialEq, Eq)]
pub struct PreviewData(String);

impl PreviewData {
    fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        PreviewData(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
    }

    pub fn as_data_url(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PreviewData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreviewData(<{} chars>)", self.0.len())
    }
}

/// An admitted file and the metadata probed for it.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: RecordId,
    pub source: RawFile,
    pub display_name: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub dimensions: Option<Dimensions>,
    pub aspect_ratio: Option<f64>,
    pub preview: Option<PreviewData>,
    /// Probe failures for this file (empty when both probes succeeded).
    pub probe_errors: Vec<ProbeError>,
}

impl FileRecord {
    fn pending(id: RecordId, source: RawFile) -> Self {
        Self {
            id,
            display_name: source.name.clone(),
            byte_size: source.size,
            mime_type: source.mime_type.clone(),
            source,
            dimensions: None,
            aspect_ratio: None,
            preview: None,
            probe_errors: Vec::new(),
        }
    }

    /// Detail view for one file (name, size, type, dimensions, aspect ratio).
    pub fn info(&self) -> FileInfo {
        FileInfo {
            name: self.display_name.clone(),
            size: format_file_size(self.byte_size),
            mime_type: self.mime_type.clone(),
            dimensions: self.dimensions,
            aspect_ratio: self.aspect_ratio.map(|r| format!("{r:.2}")),
        }
    }
}

/// Serializable detail view of a [`FileRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: String,
    pub mime_type: String,
    pub dimensions: Option<Dimensions>,
    pub aspect_ratio: Option<String>,
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name:          {}", self.name)?;
        writeln!(f, "Size:          {}", self.size)?;
        write!(f, "Type:          {}", self.mime_type)?;
        if let Some(d) = self.dimensions {
            write!(f, "\nDimensions:    {} × {} px", d.width, d.height)?;
        }
        if let Some(ref r) = self.aspect_ratio {
            write!(f, "\nAspect ratio:  {r}")?;
        }
        Ok(())
    }
}

/// Format a byte count as `Bytes`/`KB`/`MB`/`GB` with at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    // Round to two decimals, then drop trailing zeros ("1.50" → "1.5").
    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

// ── Validation ───────────────────────────────────────────────────────────

/// Validate a batch and keep only the image files.
///
/// Non-image entries are dropped with a warning. Fails with
/// [`ImgConvertError::FilesTooLarge`] if any remaining file exceeds
/// `max_file_bytes`; the batch is rejected as a whole, never filtered.
pub fn validate(
    raw_files: Vec<RawFile>,
    max_file_bytes: u64,
) -> Result<Vec<RawFile>, ImgConvertError> {
    if raw_files.is_empty() {
        return Err(ImgConvertError::NoFiles);
    }

    let (images, others): (Vec<RawFile>, Vec<RawFile>) =
        raw_files.into_iter().partition(RawFile::is_image);

    if images.is_empty() {
        return Err(ImgConvertError::NoImageFiles {
            names: others.into_iter().map(|f| f.name).collect(),
        });
    }
    for skipped in &others {
        warn!(
            "Skipping non-image file '{}' ({})",
            skipped.name, skipped.mime_type
        );
    }

    let oversized: Vec<String> = images
        .iter()
        .filter(|f| f.size > max_file_bytes)
        .map(|f| f.name.clone())
        .collect();
    if !oversized.is_empty() {
        return Err(ImgConvertError::FilesTooLarge {
            names: oversized,
            limit_bytes: max_file_bytes,
        });
    }

    Ok(images)
}

// ── Probing ──────────────────────────────────────────────────────────────

/// Validate `raw_files` and probe every accepted file concurrently.
///
/// Returns the records in submission order. Ids are assigned in submission
/// order before any probe starts.
pub(crate) async fn ingest_records(
    raw_files: Vec<RawFile>,
    config: &ClientConfig,
) -> Result<Vec<FileRecord>, ImgConvertError> {
    let accepted = validate(raw_files, config.max_file_bytes)?;
    let total = accepted.len();
    info!("Ingesting {} image file(s)", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_intake_start(total);
    }

    let pending: Vec<(usize, FileRecord)> = accepted
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| (idx, FileRecord::pending(RecordId::next(), raw)))
        .collect();

    let mut slots: Vec<Option<FileRecord>> = vec![None; total];

    let mut completed = stream::iter(pending.into_iter().map(|(idx, record)| async move {
        (idx, probe_record(record).await)
    }))
    .buffer_unordered(config.intake_concurrency.max(1));

    while let Some((idx, record)) = completed.next().await {
        debug!(
            "Probed '{}' (#{}, index {}): {:?}",
            record.display_name, record.id, idx, record.dimensions
        );
        if let Some(ref cb) = config.progress_callback {
            for err in &record.probe_errors {
                cb.on_probe_error(idx, &err.to_string());
            }
            cb.on_record_ready(idx, total, &record);
        }
        slots[idx] = Some(record);
    }

    let records: Vec<FileRecord> = slots.into_iter().flatten().collect();
    if records.len() != total {
        return Err(ImgConvertError::Internal(format!(
            "Probed {} of {} files",
            records.len(),
            total
        )));
    }
    Ok(records)
}

/// Run both probes for one record. Never fails; failures are recorded.
async fn probe_record(mut record: FileRecord) -> FileRecord {
    let bytes = match record.source.read_bytes().await {
        Ok(b) => b,
        Err(e) => {
            let err = ProbeError::ReadFailed {
                name: record.display_name.clone(),
                detail: e.to_string(),
            };
            warn!("{}", err);
            record.probe_errors.push(err);
            return record;
        }
    };

    let bytes: Arc<[u8]> = bytes.into();
    let preview_bytes = Arc::clone(&bytes);
    let mime = record.mime_type.clone();
    let preview_task =
        tokio::task::spawn_blocking(move || PreviewData::from_bytes(&mime, &preview_bytes));
    let dims_task = tokio::task::spawn_blocking(move || probe_dimensions(&bytes));

    let (preview, dims) = tokio::join!(preview_task, dims_task);

    match preview {
        Ok(p) => record.preview = Some(p),
        Err(e) => {
            let err = ProbeError::ReadFailed {
                name: record.display_name.clone(),
                detail: format!("preview task panicked: {e}"),
            };
            warn!("{}", err);
            record.probe_errors.push(err);
        }
    }

    let dims = dims.unwrap_or_else(|e| Err(format!("probe task panicked: {e}")));
    match dims {
        Ok(d) => {
            record.dimensions = Some(d);
            record.aspect_ratio = d.aspect_ratio();
        }
        Err(detail) => {
            let err = ProbeError::DecodeFailed {
                name: record.display_name.clone(),
                detail,
            };
            warn!("{}", err);
            record.probe_errors.push(err);
        }
    }

    record
}

/// Decode only the image header to learn width × height.
fn probe_dimensions(bytes: &[u8]) -> Result<Dimensions, String> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())?;
    Ok(Dimensions::new(width, height))
}
