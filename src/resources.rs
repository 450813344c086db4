//! Images owned by a single conversion
//!
//! Every image registered while laying out a document lives in the
//! [`ResourceScope`] of that conversion and is released when the scope is
//! dropped, whether the conversion finished or failed.

use crate::Result;
use crate::error::LayoutError;
use image::{ImageFormat, ImageReader};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Encoded image bytes plus the properties read from its header
#[derive(Debug, PartialEq)]
pub struct ImageData {
    /// Index of the image within its scope
    pub id: usize,
    pub bytes: Arc<[u8]>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub format: ImageFormat,
}

pub type ImageHandle = Arc<ImageData>;

impl ImageData {
    /// Display size in points.
    ///
    /// A declared width and height are used as is. With only one of them, or
    /// none (then `default_width` is used), the other follows the pixel
    /// aspect ratio.
    pub fn display_size(
        &self,
        width: Option<f32>,
        height: Option<f32>,
        default_width: f32,
    ) -> (f32, f32) {
        let ratio = self.pixel_height as f32 / self.pixel_width.max(1) as f32;
        match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w * ratio),
            (None, Some(h)) if ratio > 0.0 => (h / ratio, h),
            _ => (default_width, default_width * ratio),
        }
    }
}

/// Read the format and pixel dimensions of encoded image bytes
pub fn probe_image(bytes: &[u8]) -> Result<(u32, u32, ImageFormat)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| LayoutError::ImageError("unrecognized image format".to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| LayoutError::ImageError(e.to_string()))?;
    if width == 0 || height == 0 {
        return Err(LayoutError::ImageError(format!(
            "empty image {width}x{height}"
        )));
    }
    Ok((width, height, format))
}

/// Owner of the images used by one conversion
#[derive(Debug, Default)]
pub struct ResourceScope {
    images: Vec<ImageHandle>,
    by_content: HashMap<Arc<[u8]>, usize>,
}

impl ResourceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register image bytes, reusing the handle of identical bytes.
    ///
    /// Fails with [`LayoutError::ImageError`] when the bytes cannot be
    /// decoded; callers skip the image and continue.
    #[instrument(skip_all, fields(bytes = data.len()))]
    pub fn register_image(&mut self, data: &Arc<[u8]>) -> Result<ImageHandle> {
        if let Some(&id) = self.by_content.get(data) {
            trace!(id, "Reusing registered image");
            return Ok(Arc::clone(&self.images[id]));
        }

        let (pixel_width, pixel_height, format) = probe_image(data)?;
        let image = Arc::new(ImageData {
            id: self.images.len(),
            bytes: Arc::clone(data),
            pixel_width,
            pixel_height,
            format,
        });
        trace!(id = image.id, pixel_width, pixel_height, ?format, "Registered image");
        self.by_content.insert(Arc::clone(data), image.id);
        self.images.push(Arc::clone(&image));
        Ok(image)
    }

    pub fn images(&self) -> &[ImageHandle] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Drop every image of the scope
    pub fn release(&mut self) {
        if !self.images.is_empty() {
            debug!("Releasing {} images", self.images.len());
        }
        self.images.clear();
        self.by_content.clear();
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        self.release();
    }
}

/// Encode a solid PNG of the given size
#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}
