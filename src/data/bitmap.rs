use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbaImage};

use crate::error::WorkflowError;

/// Bitmap currently shown in the viewer.
#[derive(Clone, Debug)]
pub struct RenderedImage {
    pixels: RgbaImage,
    source: PathBuf,
}

impl RenderedImage {
    /// Decode an image file into an RGBA bitmap.
    ///
    /// The format is sniffed from the content first and the extension second,
    /// so a renderer writing PNG data to a file named `.gif` still loads.
    pub fn load(path: &Path) -> Result<Self, WorkflowError> {
        let file = File::open(path).map_err(|e| WorkflowError::file(path, e))?;
        let mut reader = ImageReader::new(BufReader::new(file))
            .with_guessed_format()
            .map_err(|e| WorkflowError::file(path, e))?;
        if reader.format().is_none() {
            if let Ok(fmt) = image::ImageFormat::from_path(path) {
                reader.set_format(fmt);
            }
        }
        let decoded = reader.decode().map_err(|source| WorkflowError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            pixels: decoded.into_rgba8(),
            source: path.to_path_buf(),
        })
    }

    pub fn from_rgba(pixels: RgbaImage, source: impl Into<PathBuf>) -> Self {
        Self {
            pixels,
            source: source.into(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// File the bitmap was decoded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Copy into an egui image for uploading as a texture.
    pub fn to_color_image(&self) -> egui::ColorImage {
        let (w, h) = self.pixels.dimensions();
        egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], self.pixels.as_raw())
    }
}
