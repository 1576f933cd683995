//! Conversion request builder: options + selection → multipart payload.
//!
//! [`ConversionRequest::build`] is where option validation happens; once a
//! request exists it is known to be acceptable to the server (as far as the
//! client can tell). The form is only materialised by
//! [`ConversionRequest::into_form`], which reads file bytes from disk, so a
//! request can be inspected and logged without touching the file system.

use crate::config::ClientConfig;
use crate::error::{Axis, ImgConvertError};
use crate::intake::{FileSource, RawFile};
use crate::options::{ConversionOptions, OutputFormat};
use crate::selection::Selection;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

/// A validated upload, ready to be sent.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    files: Vec<RawFile>,
    fields: Vec<(&'static str, String)>,
}

impl ConversionRequest {
    /// Build a request from `options` for every file in `selection`.
    ///
    /// # Errors
    /// * [`ImgConvertError::NoFiles`]: the selection is empty
    /// * [`ImgConvertError::DimensionOutOfRange`]: a dimension that will be
    ///   sent is outside `1..=config.max_dimension`
    pub fn build(
        options: &ConversionOptions,
        selection: &Selection,
        config: &ClientConfig,
    ) -> Result<Self, ImgConvertError> {
        Self::from_files(
            options,
            selection.iter().map(|r| r.source.clone()).collect(),
            config,
        )
    }

    /// Same as [`ConversionRequest::build`] for files that were never put in
    /// a [`Selection`].
    pub fn from_files(
        options: &ConversionOptions,
        files: Vec<RawFile>,
        config: &ClientConfig,
    ) -> Result<Self, ImgConvertError> {
        if files.is_empty() {
            return Err(ImgConvertError::NoFiles);
        }

        let (width, height) = options.effective_dimensions();
        check_dimension(Axis::Width, width, config.max_dimension)?;
        check_dimension(Axis::Height, height, config.max_dimension)?;

        if files.len() > 1 && !options.batch {
            warn!(
                "{} files selected without batch mode; the server converts only '{}'",
                files.len(),
                files[0].name
            );
        }

        let mut fields: Vec<(&'static str, String)> = vec![
            ("format", options.format.as_str().to_string()),
            ("quality", options.quality.to_string()),
        ];
        if let Some(w) = width {
            fields.push(("width", w.to_string()));
        }
        if let Some(h) = height {
            fields.push(("height", h.to_string()));
        }
        fields.push(("maintain_aspect", options.maintain_aspect.to_string()));
        fields.push(("batch", options.batch.to_string()));
        if options.format == OutputFormat::Ico {
            fields.push(("ico_multi_size", options.ico_multi_size.to_string()));
            fields.push(("ico_size", options.ico_size.pixels().to_string()));
        }

        debug!("Built conversion request: {} file(s), {:?}", files.len(), fields);
        Ok(Self { files, fields })
    }

    pub fn files(&self) -> &[RawFile] {
        &self.files
    }

    /// Text fields in the order they are sent.
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// Value of text field `name`, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Materialise the multipart body: one `files` part per file, then the
    /// text fields.
    pub async fn into_form(self) -> Result<Form, ImgConvertError> {
        let mut form = Form::new();
        for file in self.files {
            let bytes = match &file.source {
                FileSource::Memory(b) => b.to_vec(),
                FileSource::Path(p) => tokio::fs::read(p).await.map_err(|e| match e.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        ImgConvertError::PermissionDenied { path: p.clone() }
                    }
                    _ => ImgConvertError::FileNotFound { path: p.clone() },
                })?,
            };
            let part = Part::bytes(bytes)
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| {
                    ImgConvertError::Internal(format!(
                        "Invalid MIME type '{}' for '{}': {e}",
                        file.mime_type, file.name
                    ))
                })?;
            form = form.part("files", part);
        }
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        Ok(form)
    }
}

fn check_dimension(axis: Axis, value: Option<u32>, max: u32) -> Result<(), ImgConvertError> {
    match value {
        Some(v) if v < 1 || v > max => Err(ImgConvertError::DimensionOutOfRange {
            axis,
            value: v,
            max,
        }),
        _ => Ok(()),
    }
}
