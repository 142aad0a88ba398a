//! Registry of installed image encoders.
//!
//! Every output format the linked `image` crate can write becomes an
//! [`ExportFormat`] descriptor: the format id, the encoder that produces it,
//! a human readable name, the media type used to tag exported files and the
//! preferred file extension.

use std::fmt;
use std::path::Path;

use image::{ColorType, ImageFormat};
use once_cell::sync::Lazy;

use crate::error::WorkflowError;

/// Formats we know how to feed from an 8-bit RGBA bitmap, in menu order.
const BITMAP_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::Tga,
    ImageFormat::Qoi,
    ImageFormat::Pnm,
    ImageFormat::Farbfeld,
    ImageFormat::Avif,
];

static INSTALLED: Lazy<EncoderRegistry> = Lazy::new(|| {
    let registry = EncoderRegistry::from_formats(BITMAP_FORMATS.iter().copied());
    log::debug!(
        "installed bitmap encoders: {}",
        registry
            .formats()
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(", ")
    );
    registry
});

/// Family of encoders, i.e. what kind of data they translate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EncoderFamily {
    Bitmap,
}

/// Identifies one concrete encoder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EncoderId(pub &'static str);

impl fmt::Display for EncoderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Identifies an output format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FormatId(pub ImageFormat);

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.to_mime_type())
    }
}

/// One entry of the "Export plot as" menu.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExportFormat {
    pub id: FormatId,
    pub encoder: EncoderId,
    pub family: EncoderFamily,
    pub name: &'static str,
    pub media_type: &'static str,
    pub extension: &'static str,
}

impl ExportFormat {
    /// Descriptor for an `image` crate format, or `None` if it has no extension.
    pub fn for_image_format(format: ImageFormat) -> Option<Self> {
        let extension = *format.extensions_str().first()?;
        Some(Self {
            id: FormatId(format),
            encoder: encoder_for(format),
            family: EncoderFamily::Bitmap,
            name: display_name(format),
            media_type: format.to_mime_type(),
            extension,
        })
    }

    pub fn image_format(&self) -> ImageFormat {
        self.id.0
    }

    /// Color type the encoder accepts for a bitmap that started out as RGBA8.
    pub fn target_color(&self) -> ColorType {
        match self.id.0 {
            ImageFormat::Jpeg | ImageFormat::Pnm => ColorType::Rgb8,
            ImageFormat::Farbfeld => ColorType::Rgba16,
            _ => ColorType::Rgba8,
        }
    }

    /// Whether decoding the exported file can yield different pixels.
    pub fn is_lossy(&self) -> bool {
        matches!(self.id.0, ImageFormat::Jpeg | ImageFormat::Avif)
    }
}

fn encoder_for(format: ImageFormat) -> EncoderId {
    EncoderId(match format {
        ImageFormat::Png => "image-png",
        ImageFormat::Jpeg => "image-jpeg",
        ImageFormat::WebP => "image-webp",
        ImageFormat::Gif => "image-gif",
        ImageFormat::Bmp => "image-bmp",
        ImageFormat::Tiff => "image-tiff",
        ImageFormat::Tga => "image-tga",
        ImageFormat::Qoi => "image-qoi",
        ImageFormat::Pnm => "image-pnm",
        ImageFormat::Farbfeld => "image-farbfeld",
        ImageFormat::Avif => "image-avif",
        _ => "image",
    })
}

fn display_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "PNG image",
        ImageFormat::Jpeg => "JPEG image",
        ImageFormat::WebP => "WebP image (lossless)",
        ImageFormat::Gif => "GIF image",
        ImageFormat::Bmp => "BMP image",
        ImageFormat::Tiff => "TIFF image",
        ImageFormat::Tga => "Targa image",
        ImageFormat::Qoi => "QOI image",
        ImageFormat::Pnm => "PPM image",
        ImageFormat::Farbfeld => "Farbfeld image",
        ImageFormat::Avif => "AVIF image",
        _ => "Image",
    }
}

/// The set of encoders available to the export flow.
#[derive(Clone, Debug, Default)]
pub struct EncoderRegistry {
    formats: Vec<ExportFormat>,
}

impl EncoderRegistry {
    /// Encoders compiled into this build.
    pub fn installed() -> &'static EncoderRegistry {
        &INSTALLED
    }

    /// Build a registry from a list of formats, keeping only writable ones.
    pub fn from_formats(formats: impl IntoIterator<Item = ImageFormat>) -> Self {
        let formats = formats
            .into_iter()
            .filter(|f| f.writing_enabled())
            .filter_map(ExportFormat::for_image_format)
            .collect();
        Self { formats }
    }

    pub fn formats(&self) -> &[ExportFormat] {
        &self.formats
    }

    /// Output formats offered by encoders of the given family.
    pub fn formats_for(&self, family: EncoderFamily) -> impl Iterator<Item = &ExportFormat> + '_ {
        self.formats.iter().filter(move |f| f.family == family)
    }

    /// Resolve the concrete encoder for a format choice.
    pub fn find(&self, encoder: EncoderId, format: FormatId) -> Result<&ExportFormat, WorkflowError> {
        self.formats
            .iter()
            .find(|f| f.encoder == encoder && f.id == format)
            .ok_or(WorkflowError::EncoderUnavailable { encoder, format })
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// Format of an existing image file judged by its extension, if it can be decoded.
pub fn readable_format_for_path(path: &Path) -> Option<ImageFormat> {
    ImageFormat::from_path(path)
        .ok()
        .filter(|f| f.reading_enabled())
}
