//! Fragment definition records.
//!
//! Every cross-reference between definitions is a [`FragmentId`] into the
//! owning [`WldData`](super::WldData) arena.

use std::time::Duration;

use crate::math::{Aabb, Vec2, Vec3};
use crate::skeleton::BoneTransform;

use super::WldError;

/// Handle to a fragment stored in a [`WldData`](super::WldData) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(pub(crate) u32);

impl FragmentId {
    /// Position of the fragment in its arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for FragmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The fragment kinds consumed by the importers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Actor,
    Mesh,
    Skeleton,
    Material,
    Palette,
    Bitmap,
    Track,
}

/// One typed record of the fragment graph.
#[derive(Debug, Clone)]
pub enum Fragment {
    Actor(ActorDef),
    Mesh(MeshDef),
    Skeleton(SkeletonDef),
    Material(MaterialDef),
    Palette(PaletteDef),
    Bitmap(BitmapDef),
    Track(TrackDef),
}

impl Fragment {
    /// The kind of this fragment.
    pub fn kind(&self) -> FragmentKind {
        match self {
            Fragment::Actor(_) => FragmentKind::Actor,
            Fragment::Mesh(_) => FragmentKind::Mesh,
            Fragment::Skeleton(_) => FragmentKind::Skeleton,
            Fragment::Material(_) => FragmentKind::Material,
            Fragment::Palette(_) => FragmentKind::Palette,
            Fragment::Bitmap(_) => FragmentKind::Bitmap,
            Fragment::Track(_) => FragmentKind::Track,
        }
    }

    /// The name of this fragment.
    pub fn name(&self) -> &str {
        match self {
            Fragment::Actor(d) => &d.name,
            Fragment::Mesh(d) => &d.name,
            Fragment::Skeleton(d) => &d.name,
            Fragment::Material(d) => &d.name,
            Fragment::Palette(d) => &d.name,
            Fragment::Bitmap(d) => &d.name,
            Fragment::Track(d) => &d.name,
        }
    }
}

/// Top-level description of an actor: the meshes and skeletons it is built from.
#[derive(Debug, Clone, Default)]
pub struct ActorDef {
    pub name: String,
    /// Mesh or skeleton definitions, in the order they are listed.
    pub models: Vec<FragmentId>,
}

/// Run of consecutive vertices bound to one bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexPiece {
    /// Number of vertices in the run.
    pub count: u16,
    /// Bone index written into every vertex of the run.
    pub bone: u16,
}

/// Run of consecutive polygons drawn with one palette slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolygonTexture {
    /// Number of triangles in the run.
    pub count: u32,
    /// Slot index in the mesh's material palette.
    pub slot: u32,
}

/// Geometry of one mesh part.
#[derive(Debug, Clone, Default)]
pub struct MeshDef {
    pub name: String,
    /// Offset applied to every vertex position.
    pub center: Vec3,
    /// Bounding box relative to `center`.
    pub bounds: Aabb,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    /// Per-vertex ABGR colors. Empty when the mesh has none.
    pub colors: Vec<u32>,
    /// Triangle list, three indices per polygon.
    pub indices: Vec<u32>,
    pub vertex_pieces: Vec<VertexPiece>,
    pub polygons_by_texture: Vec<PolygonTexture>,
    pub palette: Option<FragmentId>,
}

impl MeshDef {
    /// Number of triangles.
    pub fn polygon_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Checks that the definition can be imported into a mesh buffer.
    pub fn validate(&self) -> Result<(), WldError> {
        let malformed = |reason: String| WldError::MalformedMesh {
            name: self.name.clone(),
            reason,
        };

        if self.indices.len() % 3 != 0 {
            return Err(malformed(format!(
                "{} indices is not a whole number of triangles",
                self.indices.len()
            )));
        }
        let vertex_count = self.vertices.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(malformed(format!(
                "index {index} out of range for {vertex_count} vertices"
            )));
        }
        for (attribute, len) in [
            ("normals", self.normals.len()),
            ("texture coordinates", self.tex_coords.len()),
            ("colors", self.colors.len()),
        ] {
            if len != 0 && len != vertex_count {
                return Err(malformed(format!(
                    "{len} {attribute} for {vertex_count} vertices"
                )));
            }
        }
        let textured: usize = self
            .polygons_by_texture
            .iter()
            .map(|p| p.count as usize)
            .sum();
        if textured > self.polygon_count() {
            return Err(malformed(format!(
                "{textured} textured polygons but only {} polygons",
                self.polygon_count()
            )));
        }
        Ok(())
    }
}

/// One bone of a skeleton definition.
#[derive(Debug, Clone, Default)]
pub struct BoneDef {
    pub name: String,
    /// Single-frame pose track, if any.
    pub track: Option<FragmentId>,
    /// Mesh attached to this bone, if any.
    pub mesh: Option<FragmentId>,
    /// Indices of child bones.
    pub children: Vec<u32>,
}

/// Bone hierarchy of an actor. Bone 0 is the root.
#[derive(Debug, Clone, Default)]
pub struct SkeletonDef {
    pub name: String,
    pub bones: Vec<BoneDef>,
    /// Mesh references. `None` is a reference whose definition is absent.
    pub meshes: Vec<Option<FragmentId>>,
    pub bounds: Aabb,
}

/// Material definition: render mode plus its bitmaps.
#[derive(Debug, Clone, Default)]
pub struct MaterialDef {
    pub name: String,
    /// Render mode bitfield. Zero means invisible.
    pub render_mode: u32,
    pub bitmaps: Vec<FragmentId>,
}

/// Ordered material definitions used by one or more meshes.
#[derive(Debug, Clone, Default)]
pub struct PaletteDef {
    pub name: String,
    pub materials: Vec<FragmentId>,
}

/// Names of the image files backing a material.
#[derive(Debug, Clone, Default)]
pub struct BitmapDef {
    pub name: String,
    pub file_names: Vec<String>,
}

/// Keyframes driving one bone.
#[derive(Debug, Clone, Default)]
pub struct TrackDef {
    pub name: String,
    pub frames: Vec<BoneTransform>,
    /// Time between two frames, when authored.
    pub frame_duration: Option<Duration>,
}
