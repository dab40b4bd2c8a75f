//! Image loading utilities for texture data
//!
//! Decodes PNG files (or encoded bytes) into tightly packed RGBA8 pixels.
//! Sources without an alpha channel get an opaque alpha; existing alpha is kept.

use std::path::Path;
use crate::assets::AssetError;

/// Number of bytes per decoded pixel (RGBA8)
pub const BYTES_PER_PIXEL: u32 = 4;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data, row-major, no padding
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        log::debug!("Loading image from: {:?}", path_ref);

        if !path_ref.exists() {
            return Err(AssetError::NotFound(path_ref.display().to_string()));
        }

        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image {}: {}", path_ref.display(), e)))?;

        // Convert to RGBA8 format (standard for GPU upload)
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::info!("Loaded image {}x{} from {:?}", width, height, path_ref);

        Self::from_raw(width, height, rgba_img.into_raw())
    }

    /// Load image from memory (useful for embedded resources)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {}", e)))?;

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::debug!("Loaded image {}x{} from memory", width, height);

        Self::from_raw(width, height, rgba_img.into_raw())
    }

    /// Wrap already decoded RGBA8 pixels
    ///
    /// Fails unless `data` holds exactly `width * height * 4` bytes of a non-empty image.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, AssetError> {
        if width == 0 || height == 0 {
            return Err(AssetError::InvalidData(format!("Image has zero extent: {}x{}", width, height)));
        }

        let expected = Self::byte_size(width, height);
        if data.len() as u64 != expected {
            return Err(AssetError::InvalidData(format!(
                "Expected {} bytes for a {}x{} RGBA8 image, got {}",
                expected, width, height, data.len()
            )));
        }

        Ok(Self { data, width, height })
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * BYTES_PER_PIXEL as usize);

        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }

        Self {
            data,
            width,
            height,
        }
    }

    /// Number of bytes an RGBA8 image of the given extent occupies
    pub fn byte_size(width: u32, height: u32) -> u64 {
        u64::from(width) * u64::from(height) * u64::from(BYTES_PER_PIXEL)
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}
