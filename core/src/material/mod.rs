//! Materials: from definitions in the fragment graph to loaded images.
//!
//! - [`Material`] - decoded image plus blending flags
//! - [`MaterialArray`] - flat list of materials indexed by material id
//! - [`MaterialPalette`] - slots shared across skins, exported into a
//!   [`MaterialArray`] in skin-major order
//! - [`load_material`] - decodes a material definition's bitmap and applies
//!   its render mode
//!
//! # Example
//!
//! ```ignore
//! let mut claimed = HashSet::new();
//! let mut palette = MaterialPalette::from_def(palette_id);
//! palette.create_slots(&wld, true, &mut claimed)?;
//!
//! let mut array = MaterialArray::new();
//! palette.export_to(&mut array, &wld, &archive, &settings);
//! let skin_map = palette.make_skin_map(2);
//! ```

mod loader;
mod palette;
mod types;

pub use loader::{RenderMode, USER_DEFINED_FLAG, load_material};
pub use palette::{INVALID_INDEX, MaterialPalette, WldMaterial, WldMaterialSlot};
pub use types::{Material, MaterialArray, Origin, TextureArrayInfo};

#[cfg(test)]
pub(crate) use types::tests as fixtures;
