//! Mesh parts.

use crate::math::Aabb;
use crate::settings::ImportSettings;
use crate::wld::{FragmentId, WldData, WldError};

use super::{MeshBuffer, PartSource};

/// One part of a model: a mesh definition and its placement.
///
/// The bounding box is computed once, translated by the definition's
/// center.
#[derive(Debug, Clone, PartialEq)]
pub struct WldMesh {
    def: FragmentId,
    part_id: u32,
    bounds: Aabb,
    palette: Option<FragmentId>,
}

impl WldMesh {
    /// Create a part from a mesh definition.
    pub fn new(wld: &WldData, def: FragmentId, part_id: u32) -> Result<Self, WldError> {
        let mesh = wld.mesh(def)?;
        Ok(Self {
            def,
            part_id,
            bounds: mesh.bounds.translated(mesh.center),
            palette: mesh.palette,
        })
    }

    /// Mesh definition of this part.
    pub fn def(&self) -> FragmentId {
        self.def
    }

    pub fn part_id(&self) -> u32 {
        self.part_id
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Palette definition the mesh's slots index into.
    pub fn palette(&self) -> Option<FragmentId> {
        self.palette
    }

    /// Import this part alone into `buffer`, returning its index in
    /// `buffer.parts`.
    pub fn import_into(
        &self,
        wld: &WldData,
        buffer: &mut MeshBuffer,
        palette_offset: u32,
        settings: &ImportSettings,
    ) -> Result<usize, WldError> {
        let def = wld.mesh(self.def)?;
        buffer.import_part(
            PartSource {
                def,
                part_id: self.part_id,
                palette_offset,
            },
            settings,
        )
    }

    /// Pack several parts into one buffer, see [`MeshBuffer::combine`].
    ///
    /// Parts whose definition cannot be resolved are logged and skipped.
    pub fn combine(
        wld: &WldData,
        parts: &[&WldMesh],
        palette_offset: u32,
        settings: &ImportSettings,
    ) -> MeshBuffer {
        let sources: Vec<PartSource<'_>> = parts
            .iter()
            .filter_map(|part| match wld.mesh(part.def) {
                Ok(def) => Some(PartSource {
                    def,
                    part_id: part.part_id,
                    palette_offset,
                }),
                Err(e) => {
                    log::warn!("Skipping part {}: {e}", part.part_id);
                    None
                }
            })
            .collect();
        MeshBuffer::combine(&sources, settings)
    }
}
