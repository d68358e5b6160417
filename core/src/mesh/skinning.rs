//! Software skinning.
//!
//! Each vertex follows exactly one bone, so skinning is a single rigid
//! transform per vertex. The caller must not let the GPU read a buffer
//! while it is being rewritten here.

use crate::math::Vec3;
use crate::skeleton::BoneTransform;

use super::Vertex;

fn bone_of(bones: &[BoneTransform], index: u32) -> &BoneTransform {
    bones.get(index as usize).unwrap_or(&BoneTransform::IDENTITY)
}

/// Skin `source` into `target`, which must have the same length.
///
/// Positions are fully transformed; normals are only rotated.
/// Vertices whose bone index is out of range are copied unchanged.
pub fn skin_vertices_into(source: &[Vertex], bones: &[BoneTransform], target: &mut [Vertex]) {
    debug_assert_eq!(source.len(), target.len());
    for (src, dst) in source.iter().zip(target.iter_mut()) {
        let bone = bone_of(bones, src.bone);
        let normal = bone.map_direction(src.normal());
        *dst = Vertex {
            position: bone.map(src.position()).into(),
            normal: normal.try_normalize(f32::EPSILON).unwrap_or(Vec3::zeros()).into(),
            ..*src
        };
    }
}

/// Skinned copy of `source`.
pub fn skin_vertices(source: &[Vertex], bones: &[BoneTransform]) -> Vec<Vertex> {
    let mut out = source.to_vec();
    skin_vertices_into(source, bones, &mut out);
    out
}
