//! Writing the displayed bitmap through an installed encoder.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, ImageFormat};

use crate::data::bitmap::RenderedImage;
use crate::data::formats::ExportFormat;
use crate::error::WorkflowError;

/// Destination chosen in the save dialog plus the format picked from the menu.
#[derive(Clone, Debug)]
pub struct ExportRequest {
    pub dir: PathBuf,
    pub filename: String,
    pub format: ExportFormat,
}

impl ExportRequest {
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
            format,
        }
    }

    /// Final output path, typed by its extension.
    ///
    /// An extension of the chosen format is kept. The extension of another
    /// image format is replaced, so JPEG data never ends up in `figure.png`.
    /// Any other name gets the format's extension appended.
    pub fn target_path(&self) -> PathBuf {
        let mut path = self.dir.join(&self.filename);
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext {
            Some(e) if self.format.image_format().extensions_str().contains(&e.as_str()) => {}
            Some(e) if ImageFormat::from_extension(&e).is_some() => {
                path.set_extension(self.format.extension);
            }
            Some(_) => {
                let mut name = path.file_name().map(OsString::from).unwrap_or_default();
                name.push(".");
                name.push(self.format.extension);
                path.set_file_name(name);
            }
            None => {
                path.set_extension(self.format.extension);
            }
        }
        path
    }
}

/// Split a full path returned by a save dialog into directory and file name.
pub fn split_target(path: &Path) -> Option<(PathBuf, String)> {
    let filename = path.file_name()?.to_string_lossy().into_owned();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, filename))
}

/// What was written by a successful export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportReceipt {
    pub path: PathBuf,
    pub media_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Encode `image` into a newly created (or truncated) file.
///
/// A file that fails halfway through encoding is removed again.
pub fn export_image(image: &RenderedImage, request: &ExportRequest) -> Result<ExportReceipt, WorkflowError> {
    if request.filename.trim().is_empty() {
        return Err(WorkflowError::file(
            &request.dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty file name"),
        ));
    }
    let path = request.target_path();
    let file = File::create(&path).map_err(|e| WorkflowError::file(&path, e))?;

    let converted = convert_for(image, &request.format);
    let mut writer = BufWriter::new(file);
    let written = converted
        .write_to(&mut writer, request.format.image_format())
        .map_err(|source| WorkflowError::Encode {
            path: path.clone(),
            source,
        })
        .and_then(|()| writer.flush().map_err(|e| WorkflowError::file(&path, e)));

    if let Err(e) = written {
        drop(writer);
        if let Err(rm) = fs::remove_file(&path) {
            log::warn!("could not remove partial export {}: {rm}", path.display());
        }
        return Err(e);
    }

    let (width, height) = image.dimensions();
    log::info!(
        "exported {}x{} plot to {} as {}",
        width,
        height,
        path.display(),
        request.format.media_type
    );
    Ok(ExportReceipt {
        path,
        media_type: request.format.media_type,
        width,
        height,
    })
}

fn convert_for(image: &RenderedImage, format: &ExportFormat) -> DynamicImage {
    let rgba = DynamicImage::ImageRgba8(image.pixels().clone());
    match format.target_color() {
        ColorType::Rgb8 => DynamicImage::ImageRgb8(rgba.to_rgb8()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(rgba.to_rgba16()),
        _ => rgba,
    }
}
