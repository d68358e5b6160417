//! Loading of material definitions into image-backed [`Material`]s.

use crate::archive::Archive;
use crate::settings::ImportSettings;
use crate::texture::{self, CpuTexture, dds};
use crate::wld::{MaterialDef, WldData};

use super::{Material, Origin};

/// Set by tools on user-defined render modes. Ignored when matching.
pub const USER_DEFINED_FLAG: u32 = 0x8000_0000;

/// Render modes understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Not drawn.
    Invisible,
    /// Drawn as is.
    Opaque,
    /// Color-table entry 0 is transparent.
    ColorKeyed,
    /// Alpha is the pixel's luminance.
    Luminance,
    /// Constant semi-transparency.
    SemiTransparent,
    /// Anything else. Drawn opaque.
    Unknown(u32),
}

impl RenderMode {
    pub fn from_bits(bits: u32) -> Self {
        match bits & !USER_DEFINED_FLAG {
            0x00 => RenderMode::Invisible,
            0x01 => RenderMode::Opaque,
            0x13 => RenderMode::ColorKeyed,
            0x17 => RenderMode::Luminance,
            0x05 => RenderMode::SemiTransparent,
            other => RenderMode::Unknown(other),
        }
    }

    pub fn is_opaque(self) -> bool {
        !matches!(
            self,
            RenderMode::ColorKeyed | RenderMode::Luminance | RenderMode::SemiTransparent
        )
    }

    fn apply(self, image: &mut CpuTexture, settings: &ImportSettings) {
        match self {
            // Color-table edits only make sense on palettized bitmaps.
            RenderMode::ColorKeyed if image.is_palettized() => image.key_out_entry(0),
            RenderMode::Luminance if image.is_palettized() => image.alpha_from_luminance(),
            RenderMode::SemiTransparent if image.is_palettized() => {
                image.fill_alpha(settings.semi_transparent_alpha)
            }
            RenderMode::Unknown(bits) => log::debug!("Unknown render mode {bits:#x}"),
            _ => {}
        }
    }
}

fn first_file_name<'a>(wld: &'a WldData, def: &MaterialDef) -> Option<&'a str> {
    let bitmap_id = *def.bitmaps.first()?;
    match wld.bitmap(bitmap_id) {
        Ok(bitmap) => bitmap.file_names.first().map(String::as_str),
        Err(e) => {
            log::warn!("Material '{}': {e}", def.name);
            None
        }
    }
}

/// Decode the image behind `def` and apply its render mode.
///
/// Returns `None` when the definition has no bitmap, the file is missing
/// from the archive, or neither the image decoder nor the DDS decoder
/// accepts it.
pub fn load_material(
    wld: &WldData,
    def: &MaterialDef,
    archive: &dyn Archive,
    settings: &ImportSettings,
) -> Option<Material> {
    let file_name = first_file_name(wld, def)?.to_ascii_lowercase();
    let bytes = match archive.unpack_file(&file_name) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Material '{}': {e}", def.name);
            return None;
        }
    };

    let (mut image, origin) = match texture::decode_image(&bytes) {
        Ok(image) => (image, Origin::UpperLeft),
        Err(image_err) => match dds::decode(&bytes) {
            Ok(image) => (image, Origin::LowerLeft),
            Err(dds_err) => {
                log::warn!("Could not decode '{file_name}': {image_err}; {dds_err}");
                return None;
            }
        },
    };

    let mode = RenderMode::from_bits(def.render_mode);
    mode.apply(&mut image, settings);
    Some(
        Material::new(image)
            .with_opaque(mode.is_opaque())
            .with_origin(origin),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::texture::dds::tests::dds_file;
    use crate::wld::{BitmapDef, Fragment};

    fn material_wld(file: &str, render_mode: u32) -> (WldData, MaterialDef) {
        let mut wld = WldData::new();
        let bitmap = wld.push(Fragment::Bitmap(BitmapDef {
            name: "ORCCH0001_SPRITE".into(),
            file_names: vec![file.into()],
        }));
        let def = MaterialDef {
            name: "ORCCH0001_MDF".into(),
            render_mode,
            bitmaps: vec![bitmap],
        };
        (wld, def)
    }

    #[test]
    fn render_mode_bits() {
        assert_eq!(RenderMode::from_bits(0), RenderMode::Invisible);
        assert_eq!(RenderMode::from_bits(0x8000_0001), RenderMode::Opaque);
        assert_eq!(RenderMode::from_bits(0x13), RenderMode::ColorKeyed);
        assert_eq!(RenderMode::from_bits(0x8000_0017), RenderMode::Luminance);
        assert_eq!(RenderMode::from_bits(0x05), RenderMode::SemiTransparent);
        assert_eq!(RenderMode::from_bits(0x42), RenderMode::Unknown(0x42));
        assert!(RenderMode::Unknown(0x42).is_opaque());
        assert!(!RenderMode::SemiTransparent.is_opaque());
    }

    #[test]
    fn missing_file() {
        let (wld, def) = material_wld("nothere.bmp", 1);
        let archive = MemoryArchive::new();
        assert!(load_material(&wld, &def, &archive, &ImportSettings::default()).is_none());
    }

    #[test]
    fn no_bitmap() {
        let wld = WldData::new();
        let def = MaterialDef {
            name: "EMPTY_MDF".into(),
            render_mode: 1,
            bitmaps: vec![],
        };
        let archive = MemoryArchive::new();
        assert!(load_material(&wld, &def, &archive, &ImportSettings::default()).is_none());
    }

    #[cfg(feature = "images")]
    #[test]
    fn color_keyed_bitmap() {
        use crate::texture::bmp::tests::palettized_bmp;

        let bmp = palettized_bmp(4, 1, &[[255, 0, 255], [10, 20, 30]], &[0, 1, 1, 0]);
        let archive = MemoryArchive::new().with_file("orcch0001.bmp", bmp);
        let (wld, def) = material_wld("ORCCH0001.BMP", 0x13);

        let material = load_material(&wld, &def, &archive, &ImportSettings::default()).unwrap();
        assert!(!material.is_opaque());
        assert_eq!(material.origin(), Origin::UpperLeft);
        assert_eq!(&material.image().data()[..8], &[255, 0, 255, 0, 10, 20, 30, 255]);
        assert_eq!(material.image().data()[15], 0);
    }

    #[cfg(feature = "images")]
    #[test]
    fn semi_transparent_uses_setting() {
        use crate::texture::bmp::tests::palettized_bmp;

        let bmp = palettized_bmp(4, 1, &[[1, 2, 3]], &[0, 0, 0, 0]);
        let archive = MemoryArchive::new().with_file("glass.bmp", bmp);
        let (wld, def) = material_wld("glass.bmp", 0x05);
        let settings = ImportSettings::new().with_semi_transparent_alpha(64);

        let material = load_material(&wld, &def, &archive, &settings).unwrap();
        assert_eq!(material.image().data()[3], 64);
    }

    #[test]
    fn falls_back_to_dds() {
        // One opaque white BC1 block.
        let block = [0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0];
        let archive = MemoryArchive::new().with_file("fire.dds", dds_file(4, 4, b"DXT1", &block));
        let (wld, def) = material_wld("fire.dds", 0x01);

        let material = load_material(&wld, &def, &archive, &ImportSettings::default()).unwrap();
        assert!(material.is_opaque());
        assert_eq!(material.origin(), Origin::LowerLeft);
        assert_eq!((material.width(), material.height()), (4, 4));
        assert!(material.image().data().iter().all(|&b| b == 255));
    }

    #[test]
    fn truecolor_keeps_alpha() {
        let block = [0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0];
        let archive = MemoryArchive::new().with_file("glass.dds", dds_file(4, 4, b"DXT1", &block));
        let (wld, def) = material_wld("glass.dds", 0x05);

        let material = load_material(&wld, &def, &archive, &ImportSettings::default()).unwrap();
        assert!(!material.is_opaque());
        assert!(material.image().data().chunks(4).all(|p| p[3] == 255));
    }

    #[test]
    fn undecodable_file() {
        let archive = MemoryArchive::new().with_file("junk.bmp", b"junk".to_vec());
        let (wld, def) = material_wld("junk.bmp", 0x01);
        assert!(load_material(&wld, &def, &archive, &ImportSettings::default()).is_none());
    }
}
