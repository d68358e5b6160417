//! CPU-side textures.
//!
//! Provides [`CpuTexture`] (RGBA8 pixels plus the source color table, if
//! the image was palettized), decoding of standard image files through the
//! `image` crate, and the [`dds`] fallback for block-compressed textures.

pub mod bmp;
pub mod dds;
mod error;

pub use error::TextureError;

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuTexture {
    width: u32,
    height: u32,
    data: Vec<u8>,
    color_table: Option<Vec<[u8; 3]>>,
}

impl CpuTexture {
    /// Create a texture from tightly packed RGBA8 rows.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            data,
            color_table: None,
        }
    }

    /// Attach the color table the pixels were expanded from.
    #[must_use]
    pub fn with_color_table(mut self, table: Vec<[u8; 3]>) -> Self {
        self.color_table = Some(table);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the pixel data in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Color table of a palettized source image.
    pub fn color_table(&self) -> Option<&[[u8; 3]]> {
        self.color_table.as_deref()
    }

    pub fn is_palettized(&self) -> bool {
        self.color_table.is_some()
    }

    /// Make every pixel showing color-table entry `index` fully transparent.
    ///
    /// Does nothing for images without a color table.
    pub fn key_out_entry(&mut self, index: usize) {
        let Some(&key) = self.color_table.as_ref().and_then(|t| t.get(index)) else {
            return;
        };
        for px in self.data.chunks_exact_mut(4) {
            if px[..3] == key {
                px[3] = 0;
            }
        }
    }

    /// Set each pixel's alpha to the average of its color channels.
    pub fn alpha_from_luminance(&mut self) {
        for px in self.data.chunks_exact_mut(4) {
            px[3] = ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8;
        }
    }

    /// Set every pixel's alpha.
    pub fn fill_alpha(&mut self, alpha: u8) {
        for px in self.data.chunks_exact_mut(4) {
            px[3] = alpha;
        }
    }
}

/// Decode a standard image file (BMP, PNG, TGA) to RGBA8.
///
/// Palettized BMPs keep their color table.
#[cfg(feature = "images")]
pub fn decode_image(bytes: &[u8]) -> Result<CpuTexture, TextureError> {
    let img = image::load_from_memory(bytes).map_err(|e| TextureError::Decode(format!("{e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let texture = CpuTexture::new(width, height, rgba.into_raw());

    Ok(match bmp::color_table(bytes) {
        Some(table) => texture.with_color_table(table),
        None => texture,
    })
}

/// Decode a standard image file. Always fails without the `images` feature.
#[cfg(not(feature = "images"))]
pub fn decode_image(_bytes: &[u8]) -> Result<CpuTexture, TextureError> {
    Err(TextureError::Decode("image decoding is disabled".into()))
}
