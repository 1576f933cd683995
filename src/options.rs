//! Per-submission conversion options.
//!
//! [`ConversionOptions`] mirrors the option panel: output format, quality,
//! target width/height, aspect lock, batch mode and the ICO-only settings.
//! Two rules couple the fields together and are enforced by the setters
//! rather than left to the caller:
//!
//! * **Aspect lock.** With `maintain_aspect` on, setting one dimension
//!   recomputes the other from a reference image (the first selected file):
//!   `height = round(ref_h / ref_w × width)` and vice versa.
//! * **ICO.** Selecting ICO forces the aspect lock on and, if no dimension
//!   was given, applies 256 × 256.

use crate::intake::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width and height applied when ICO is chosen with no dimension set.
pub const ICO_DEFAULT_DIMENSION: u32 = 256;

/// Output formats the server can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Png,
    #[default]
    Jpeg,
    Bmp,
    Gif,
    Tiff,
    Ico,
    Webp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Png,
        OutputFormat::Jpeg,
        OutputFormat::Bmp,
        OutputFormat::Gif,
        OutputFormat::Tiff,
        OutputFormat::Ico,
        OutputFormat::Webp,
    ];

    /// Value of the `format` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Gif => "GIF",
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Ico => "ICO",
            OutputFormat::Webp => "WEBP",
        }
    }

    /// File extension the server gives converted files.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Ico => "ico",
            OutputFormat::Webp => "webp",
        }
    }

    /// Whether the `quality` field has any effect for this format.
    pub fn uses_quality(&self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Webp)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PNG" => Ok(OutputFormat::Png),
            "JPEG" | "JPG" => Ok(OutputFormat::Jpeg),
            "BMP" => Ok(OutputFormat::Bmp),
            "GIF" => Ok(OutputFormat::Gif),
            "TIFF" | "TIF" => Ok(OutputFormat::Tiff),
            "ICO" => Ok(OutputFormat::Ico),
            "WEBP" => Ok(OutputFormat::Webp),
            other => Err(format!("unsupported output format '{other}'")),
        }
    }
}

/// Fixed icon sizes offered for single-size ICO output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IcoSize {
    S16,
    S32,
    S48,
    S64,
    S128,
    #[default]
    S256,
}

impl IcoSize {
    pub const ALL: [IcoSize; 6] = [
        IcoSize::S16,
        IcoSize::S32,
        IcoSize::S48,
        IcoSize::S64,
        IcoSize::S128,
        IcoSize::S256,
    ];

    pub fn pixels(&self) -> u32 {
        match self {
            IcoSize::S16 => 16,
            IcoSize::S32 => 32,
            IcoSize::S48 => 48,
            IcoSize::S64 => 64,
            IcoSize::S128 => 128,
            IcoSize::S256 => 256,
        }
    }

    pub fn from_pixels(px: u32) -> Option<Self> {
        IcoSize::ALL.into_iter().find(|s| s.pixels() == px)
    }
}

/// Quality presets from the option panel. `Custom` carries 1–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    High,
    Medium,
    Low,
    Custom(u8),
}

impl QualityPreset {
    pub fn value(&self) -> u8 {
        match self {
            QualityPreset::High => 95,
            QualityPreset::Medium => 85,
            QualityPreset::Low => 70,
            QualityPreset::Custom(q) => (*q).clamp(1, 100),
        }
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(QualityPreset::High),
            "medium" => Ok(QualityPreset::Medium),
            "low" => Ok(QualityPreset::Low),
            n => match n.parse::<u8>() {
                Ok(q) if (1..=100).contains(&q) => Ok(QualityPreset::Custom(q)),
                _ => Err(format!("quality must be high, medium, low or 1-100, got '{s}'")),
            },
        }
    }
}

/// Options for one conversion submission.
///
/// # Example
/// ```rust
/// use edgequake_imgconvert::{ConversionOptions, Dimensions, OutputFormat};
///
/// let mut opts = ConversionOptions::builder()
///     .format(OutputFormat::Webp)
///     .quality(80)
///     .build();
/// opts.set_width(Some(400), Some(Dimensions::new(800, 600)));
/// assert_eq!(opts.height, Some(300));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub format: OutputFormat,
    /// Encoder quality 1–100. Default: 85.
    pub quality: u8,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Keep width/height proportional. Default: true. Forced on for ICO.
    pub maintain_aspect: bool,
    /// Ask the server to package all outputs into one ZIP.
    pub batch: bool,
    /// Embed 16–256 px variants in one ICO instead of a single size.
    pub ico_multi_size: bool,
    pub ico_size: IcoSize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: 85,
            width: None,
            height: None,
            maintain_aspect: true,
            batch: false,
            ico_multi_size: false,
            ico_size: IcoSize::default(),
        }
    }
}

impl ConversionOptions {
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            opts: Self::default(),
        }
    }

    /// `true` while the aspect lock cannot be switched off (ICO selected).
    pub fn aspect_locked(&self) -> bool {
        self.format == OutputFormat::Ico
    }

    /// Change the output format, applying the ICO rules.
    ///
    /// The default size is always 256 × 256, whatever `ico_size` holds.
    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
        if format == OutputFormat::Ico {
            self.maintain_aspect = true;
            if self.width.is_none() && self.height.is_none() {
                self.width = Some(ICO_DEFAULT_DIMENSION);
                self.height = Some(ICO_DEFAULT_DIMENSION);
            }
        }
    }

    /// Toggle the aspect lock. Ignored while ICO is selected.
    pub fn set_maintain_aspect(&mut self, on: bool) {
        if !self.aspect_locked() {
            self.maintain_aspect = on;
        }
    }

    /// Set the width; with the aspect lock on, derive the height from
    /// `reference`.
    pub fn set_width(&mut self, width: Option<u32>, reference: Option<Dimensions>) {
        self.width = width;
        if !self.maintain_aspect {
            return;
        }
        if let (Some(w), Some(r)) = (width, reference) {
            if r.width > 0 {
                self.height = Some(scale(r.height, r.width, w));
            }
        }
    }

    /// Set the height; with the aspect lock on, derive the width from
    /// `reference`.
    pub fn set_height(&mut self, height: Option<u32>, reference: Option<Dimensions>) {
        self.height = height;
        if !self.maintain_aspect {
            return;
        }
        if let (Some(h), Some(r)) = (height, reference) {
            if r.height > 0 {
                self.width = Some(scale(r.width, r.height, h));
            }
        }
    }

    /// Width/height that will actually be sent. ICO multi-size drops both.
    pub fn effective_dimensions(&self) -> (Option<u32>, Option<u32>) {
        if self.format == OutputFormat::Ico && self.ico_multi_size {
            (None, None)
        } else {
            (self.width, self.height)
        }
    }
}

/// `round(numerator / denominator × value)`, saturating at `u32::MAX`.
fn scale(numerator: u32, denominator: u32, value: u32) -> u32 {
    let v = (numerator as f64 / denominator as f64 * value as f64).round();
    if v >= u32::MAX as f64 {
        u32::MAX
    } else {
        v as u32
    }
}

/// Builder for [`ConversionOptions`].
///
/// Setters are applied in call order; `format(Ico)` runs the same rules as
/// [`ConversionOptions::set_format`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    opts: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.opts.set_format(format);
        self
    }

    pub fn quality(mut self, q: u8) -> Self {
        self.opts.quality = q.clamp(1, 100);
        self
    }

    pub fn quality_preset(mut self, preset: QualityPreset) -> Self {
        self.opts.quality = preset.value();
        self
    }

    pub fn width(mut self, w: u32) -> Self {
        self.opts.width = Some(w);
        self
    }

    pub fn height(mut self, h: u32) -> Self {
        self.opts.height = Some(h);
        self
    }

    pub fn maintain_aspect(mut self, on: bool) -> Self {
        self.opts.set_maintain_aspect(on);
        self
    }

    pub fn batch(mut self, on: bool) -> Self {
        self.opts.batch = on;
        self
    }

    pub fn ico_multi_size(mut self, on: bool) -> Self {
        self.opts.ico_multi_size = on;
        self
    }

    pub fn ico_size(mut self, size: IcoSize) -> Self {
        self.opts.ico_size = size;
        self
    }

    pub fn build(self) -> ConversionOptions {
        self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_edit_derives_height() {
        let mut o = ConversionOptions::default();
        o.set_width(Some(400), Some(Dimensions::new(800, 600)));
        assert_eq!(o.width, Some(400));
        assert_eq!(o.height, Some(300));
    }

    #[test]
    fn height_edit_derives_width() {
        let mut o = ConversionOptions::default();
        o.set_height(Some(100), Some(Dimensions::new(1920, 1080)));
        // round(1920 / 1080 × 100) = round(177.77…) = 178
        assert_eq!(o.width, Some(178));
    }

    #[test]
    fn no_derivation_without_lock_or_reference() {
        let mut o = ConversionOptions::default();
        o.set_width(Some(400), None);
        assert_eq!(o.height, None);

        o.set_maintain_aspect(false);
        o.set_width(Some(400), Some(Dimensions::new(800, 600)));
        assert_eq!(o.height, None);
    }

    #[test]
    fn clearing_width_keeps_height() {
        let mut o = ConversionOptions::default();
        o.set_width(Some(400), Some(Dimensions::new(800, 600)));
        o.set_width(None, Some(Dimensions::new(800, 600)));
        assert_eq!(o.width, None);
        assert_eq!(o.height, Some(300));
    }

    #[test]
    fn ico_forces_lock_and_default_size() {
        let mut o = ConversionOptions::default();
        o.set_maintain_aspect(false);
        o.set_format(OutputFormat::Ico);
        assert!(o.maintain_aspect);
        assert_eq!((o.width, o.height), (Some(256), Some(256)));

        o.set_maintain_aspect(false);
        assert!(o.maintain_aspect, "lock cannot be released while ICO");

        o.set_format(OutputFormat::Png);
        o.set_maintain_aspect(false);
        assert!(!o.maintain_aspect);
    }

    #[test]
    fn ico_default_size_ignores_chosen_icon_size() {
        let o = ConversionOptions::builder()
            .ico_size(IcoSize::S32)
            .format(OutputFormat::Ico)
            .build();
        assert_eq!((o.width, o.height), (Some(256), Some(256)));
        assert_eq!(o.ico_size, IcoSize::S32);
    }

    #[test]
    fn ico_keeps_explicit_dimensions() {
        let o = ConversionOptions::builder()
            .width(100)
            .height(100)
            .format(OutputFormat::Ico)
            .build();
        assert_eq!((o.width, o.height), (Some(100), Some(100)));
    }

    #[test]
    fn ico_multi_size_drops_dimensions() {
        let o = ConversionOptions::builder()
            .width(100)
            .height(100)
            .format(OutputFormat::Ico)
            .ico_multi_size(true)
            .build();
        assert_eq!(o.effective_dimensions(), (None, None));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("WebP".parse::<OutputFormat>().unwrap(), OutputFormat::Webp);
        assert!("svg".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn quality_presets() {
        assert_eq!("high".parse::<QualityPreset>().unwrap().value(), 95);
        assert_eq!("42".parse::<QualityPreset>().unwrap().value(), 42);
        assert!("0".parse::<QualityPreset>().is_err());
        assert!("101".parse::<QualityPreset>().is_err());
    }

    #[test]
    fn ico_size_lookup() {
        assert_eq!(IcoSize::from_pixels(48), Some(IcoSize::S48));
        assert_eq!(IcoSize::from_pixels(50), None);
    }
}
