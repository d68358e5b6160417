//! Shared vertex/index storage and material groups.

use std::collections::HashSet;
use std::ops::Range;

use crate::material::MaterialArray;
use crate::settings::ImportSettings;
use crate::wld::{MeshDef, WldError};

use super::Vertex;

/// Location of a part's data inside a [`MeshBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferSegment {
    /// First element.
    pub offset: u32,
    /// Number of elements.
    pub count: u32,
    /// Size of one element in bytes.
    pub element_size: u32,
}

impl BufferSegment {
    /// Element range covered by the segment.
    pub fn range(&self) -> Range<usize> {
        self.offset as usize..(self.offset + self.count) as usize
    }

    /// Byte size of the segment.
    pub fn byte_size(&self) -> usize {
        self.count as usize * self.element_size as usize
    }
}

/// Contiguous run of indices drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialGroup {
    /// Part the indices came from.
    pub id: u32,
    /// First index.
    pub offset: u32,
    /// Number of indices, always a multiple of 3.
    pub count: u32,
    /// Material index.
    pub mat_id: u32,
}

/// One part imported into a [`MeshBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub part_id: u32,
    pub vertex_segment: BufferSegment,
    /// `None` when the part's indices were interleaved with other parts by
    /// [`MeshBuffer::combine`].
    pub index_segment: Option<BufferSegment>,
    /// Groups with offsets relative to `index_segment`, or absolute offsets
    /// for combined parts.
    pub groups: Vec<MaterialGroup>,
}

impl MeshData {
    /// Groups with absolute index offsets.
    pub fn absolute_groups(&self) -> impl Iterator<Item = MaterialGroup> + '_ {
        let base = self.index_segment.map_or(0, |s| s.offset);
        self.groups.iter().map(move |g| MaterialGroup {
            offset: g.offset + base,
            ..*g
        })
    }
}

/// Input of [`MeshBuffer::combine`]: one part's geometry.
#[derive(Debug, Clone, Copy)]
pub struct PartSource<'a> {
    pub def: &'a MeshDef,
    pub part_id: u32,
    /// Added to every slot index to form the material id.
    pub palette_offset: u32,
}

/// Vertex and index storage shared by many parts.
///
/// Every index refers to a vertex of the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MeshBuffer {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Buffer-wide groups, with absolute index offsets.
    pub groups: Vec<MaterialGroup>,
    pub parts: Vec<MeshData>,
}

impl MeshBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part's vertices.
    ///
    /// Positions are moved by the part's center. Meshes without colors
    /// get the default color; bone indices come from the vertex pieces.
    pub fn import_vertex_data(&mut self, def: &MeshDef, settings: &ImportSettings) -> BufferSegment {
        let offset = self.vertices.len();
        let center = def.center;
        self.vertices.extend(def.vertices.iter().enumerate().map(|(i, v)| {
            let normal = def.normals.get(i).copied().unwrap_or_default();
            let uv = def.tex_coords.get(i).copied().unwrap_or_default();
            Vertex {
                position: (v + center).into(),
                normal: normal.into(),
                tex_coords: [uv.x, uv.y, 0.0],
                color: def
                    .colors
                    .get(i)
                    .copied()
                    .unwrap_or(settings.default_vertex_color),
                bone: 0,
            }
        }));

        let part = &mut self.vertices[offset..];
        let len = part.len();
        let mut pos = 0usize;
        for piece in &def.vertex_pieces {
            let end = pos + piece.count as usize;
            if end > len {
                log::warn!(
                    "Mesh '{}': vertex pieces cover {end} vertices but the mesh has {len}",
                    def.name
                );
            }
            for v in &mut part[pos.min(len)..end.min(len)] {
                v.bone = u32::from(piece.bone);
            }
            pos = end;
        }

        BufferSegment {
            offset: offset as u32,
            count: def.vertices.len() as u32,
            element_size: Vertex::SIZE,
        }
    }

    /// Append `def.indices[range]`, each moved by the vertex segment offset.
    pub fn import_index_data(
        &mut self,
        def: &MeshDef,
        vertices: &BufferSegment,
        range: Range<usize>,
    ) -> BufferSegment {
        let offset = self.indices.len();
        let source = def.indices.get(range).unwrap_or_default();
        self.indices
            .extend(source.iter().map(|&i| i + vertices.offset));
        BufferSegment {
            offset: offset as u32,
            count: source.len() as u32,
            element_size: std::mem::size_of::<u32>() as u32,
        }
    }

    /// Material groups of one part, with offsets relative to the part's
    /// first index.
    pub fn material_groups(def: &MeshDef, part_id: u32, palette_offset: u32) -> Vec<MaterialGroup> {
        let mut offset = 0;
        def.polygons_by_texture
            .iter()
            .map(|p| {
                let group = MaterialGroup {
                    id: part_id,
                    offset,
                    count: p.count * 3,
                    mat_id: palette_offset + p.slot,
                };
                offset += group.count;
                group
            })
            .collect()
    }

    /// Import one part as a contiguous vertex and index segment, returning
    /// its index in [`parts`](Self::parts).
    pub fn import_part(
        &mut self,
        source: PartSource<'_>,
        settings: &ImportSettings,
    ) -> Result<usize, WldError> {
        source.def.validate()?;
        let vertex_segment = self.import_vertex_data(source.def, settings);
        let index_segment = self.import_index_data(source.def, &vertex_segment, 0..source.def.indices.len());
        self.parts.push(MeshData {
            name: source.def.name.clone(),
            part_id: source.part_id,
            vertex_segment,
            index_segment: Some(index_segment),
            groups: Self::material_groups(source.def, source.part_id, source.palette_offset),
        });
        Ok(self.parts.len() - 1)
    }

    /// Pack several parts into one buffer with one index range per
    /// material, in ascending material order.
    ///
    /// Vertex data keeps the input order; only indices and groups are
    /// reordered. Malformed parts are logged and skipped.
    pub fn combine(sources: &[PartSource<'_>], settings: &ImportSettings) -> MeshBuffer {
        let mut buffer = MeshBuffer::new();
        let mut imported: Vec<(PartSource<'_>, BufferSegment)> = Vec::with_capacity(sources.len());
        // Each group tagged with the position of its part in `imported`.
        let mut tagged: Vec<(usize, MaterialGroup)> = Vec::new();

        for source in sources {
            if let Err(e) = source.def.validate() {
                log::warn!("Skipping part {}: {e}", source.part_id);
                continue;
            }
            let part = imported.len();
            let vertex_segment = buffer.import_vertex_data(source.def, settings);
            tagged.extend(
                Self::material_groups(source.def, source.part_id, source.palette_offset)
                    .into_iter()
                    .map(|g| (part, g)),
            );
            buffer.parts.push(MeshData {
                name: source.def.name.clone(),
                part_id: source.part_id,
                vertex_segment,
                index_segment: None,
                groups: Vec::new(),
            });
            imported.push((*source, vertex_segment));
        }

        tagged.sort_by_key(|(_, g)| g.mat_id);

        let mut groups = Vec::with_capacity(tagged.len());
        for (part, mut group) in tagged {
            let (source, vertices) = &imported[part];
            let start = group.offset as usize;
            let segment = buffer.import_index_data(source.def, vertices, start..start + group.count as usize);
            group.offset = segment.offset;
            buffer.parts[part].groups.push(group);
            groups.push(group);
        }

        buffer.add_material_groups(&groups);
        log::debug!(
            "Combined {} parts: {} vertices, {} indices, {} groups",
            buffer.parts.len(),
            buffer.vertices.len(),
            buffer.indices.len(),
            buffer.groups.len()
        );
        buffer
    }

    /// Append groups to the buffer, merging each into the previous one
    /// when both use the same material.
    pub fn add_material_groups(&mut self, groups: &[MaterialGroup]) {
        for g in groups {
            if let Some(last) = self.groups.last_mut()
                && last.mat_id == g.mat_id
                && last.offset + last.count == g.offset
            {
                last.count += g.count;
            } else {
                self.groups.push(*g);
            }
        }
    }

    /// Scale texture coordinates into texture-array space and store each
    /// vertex's layer.
    ///
    /// Only vertices whose layer component is still 0 are touched, and each
    /// vertex at most once per call.
    pub fn update_tex_coords(&mut self, materials: &MaterialArray) {
        let info = materials.texture_array_info();
        if info.max_width == 0 || info.max_height == 0 {
            return;
        }

        let groups: Vec<MaterialGroup> = self.parts.iter().flat_map(MeshData::absolute_groups).collect();

        let mut done = HashSet::new();
        for group in &groups {
            let Some(material) = materials.material(group.mat_id) else {
                continue;
            };
            let Some(layer) = material.layer() else {
                continue;
            };
            let sx = material.width() as f32 / info.max_width as f32;
            let sy = material.height() as f32 / info.max_height as f32;
            let range = group.offset as usize..(group.offset + group.count) as usize;
            for &index in self.indices.get(range).unwrap_or_default() {
                let Some(v) = self.vertices.get_mut(index as usize) else {
                    continue;
                };
                if v.tex_coords[2] == 0.0 && done.insert(index) {
                    v.tex_coords[0] *= sx;
                    v.tex_coords[1] *= sy;
                    v.tex_coords[2] = layer as f32;
                }
            }
        }
    }

    /// Vertex data as bytes, for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as bytes, for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.groups.clear();
        self.parts.clear();
    }
}
