//! Image-backed materials and the flat material array.

use std::sync::Arc;

use crate::texture::CpuTexture;

/// Row order of a material's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// First row is the top of the image (standard image files).
    #[default]
    UpperLeft,
    /// First row is the bottom of the image (DDS textures).
    LowerLeft,
}

/// A concrete material: an image plus how to blend it.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    image: Arc<CpuTexture>,
    opaque: bool,
    origin: Origin,
    layer: Option<u32>,
}

impl Material {
    /// Create an opaque material with an upper-left origin.
    pub fn new(image: CpuTexture) -> Self {
        Self {
            image: Arc::new(image),
            opaque: true,
            origin: Origin::UpperLeft,
            layer: None,
        }
    }

    #[must_use]
    pub fn with_opaque(mut self, opaque: bool) -> Self {
        self.opaque = opaque;
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn image(&self) -> &CpuTexture {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Texture-array layer, once assigned.
    pub fn layer(&self) -> Option<u32> {
        self.layer
    }
}

/// Memory needed to pack all images of a [`MaterialArray`] into one
/// texture array (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureArrayInfo {
    pub max_width: u32,
    pub max_height: u32,
    /// Bytes of the array: every layer at the maximum size.
    pub total_memory: usize,
    /// Bytes actually covered by images.
    pub used_memory: usize,
}

/// Flat, indexable material list shared by one or more palettes.
///
/// Entries may be empty: a palette that fails to load a material still
/// reserves its position.
#[derive(Debug, Clone, Default)]
pub struct MaterialArray {
    materials: Vec<Option<Material>>,
}

impl MaterialArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positions, empty ones included.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Store a material at `pos`, growing the array as needed.
    pub fn set_material(&mut self, pos: u32, material: Option<Material>) {
        let pos = pos as usize;
        if pos >= self.materials.len() {
            self.materials.resize(pos + 1, None);
        }
        self.materials[pos] = material;
    }

    pub fn material(&self, id: u32) -> Option<&Material> {
        self.materials.get(id as usize).and_then(Option::as_ref)
    }

    /// All positions in order.
    pub fn materials(&self) -> &[Option<Material>] {
        &self.materials
    }

    /// Number of positions that hold a material.
    pub fn loaded_count(&self) -> usize {
        self.materials.iter().flatten().count()
    }

    /// Give each loaded material a texture-array layer, in array order.
    /// Returns the number of layers.
    pub fn assign_layers(&mut self) -> u32 {
        let mut layer = 0;
        for material in self.materials.iter_mut().flatten() {
            material.layer = Some(layer);
            layer += 1;
        }
        layer
    }

    pub fn texture_array_info(&self) -> TextureArrayInfo {
        let mut info = TextureArrayInfo::default();
        let mut count = 0usize;
        for m in self.materials.iter().flatten() {
            info.max_width = info.max_width.max(m.width());
            info.max_height = info.max_height.max(m.height());
            info.used_memory += m.width() as usize * m.height() as usize * 4;
            count += 1;
        }
        info.total_memory = info.max_width as usize * info.max_height as usize * 4 * count;
        info
    }
}
