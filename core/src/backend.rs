//! Render backend capabilities and bone data packing for skinning.
//!
//! Skinning can run on the CPU ([`crate::mesh::skinning`]) or on the GPU,
//! with bone transforms uploaded either as a uniform array or as a float
//! texture of two texels per bone. [`SkinningMode::check`] tells whether a
//! backend can honour a mode for a given skeleton.

use std::fmt;

use crate::skeleton::BoneTransform;

/// Bones a GPU skinning program can address.
pub const MAX_BONES: usize = 256;

/// Where vertices are skinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkinningMode {
    /// On the CPU, rewriting the vertex buffer every frame.
    #[default]
    Software,
    /// On the GPU, bones in a uniform array.
    HardwareUniform,
    /// On the GPU, bones in a float texture.
    HardwareTexture,
}

/// What a render backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCaps {
    /// Bones that fit in the skinning program's uniform array.
    pub max_uniform_bones: usize,
    /// Whether 32-bit float textures can be sampled.
    pub float_textures: bool,
}

impl Default for BackendCaps {
    fn default() -> Self {
        Self {
            max_uniform_bones: MAX_BONES,
            float_textures: true,
        }
    }
}

impl BackendCaps {
    #[must_use]
    pub fn with_max_uniform_bones(mut self, bones: usize) -> Self {
        self.max_uniform_bones = bones;
        self
    }

    #[must_use]
    pub fn with_float_textures(mut self, enabled: bool) -> Self {
        self.float_textures = enabled;
        self
    }
}

/// A skinning mode the backend cannot provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The skeleton has more bones than the mode can address.
    TooManyBones {
        mode: SkinningMode,
        bones: usize,
        max: usize,
    },
    /// Texture skinning needs float textures.
    FloatTexturesUnsupported,
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityError::TooManyBones { mode, bones, max } => {
                write!(f, "{mode:?} skinning supports {max} bones, skeleton has {bones}")
            }
            CapabilityError::FloatTexturesUnsupported => {
                write!(f, "float textures are not supported")
            }
        }
    }
}

impl std::error::Error for CapabilityError {}

impl SkinningMode {
    /// Check that `caps` can skin a skeleton of `bone_count` bones in this
    /// mode. Software skinning always succeeds.
    pub fn check(self, bone_count: usize, caps: &BackendCaps) -> Result<(), CapabilityError> {
        let max = match self {
            SkinningMode::Software => return Ok(()),
            SkinningMode::HardwareUniform => caps.max_uniform_bones.min(MAX_BONES),
            SkinningMode::HardwareTexture => {
                if !caps.float_textures {
                    return Err(CapabilityError::FloatTexturesUnsupported);
                }
                MAX_BONES
            }
        };
        if bone_count > max {
            return Err(CapabilityError::TooManyBones {
                mode: self,
                bones: bone_count,
                max,
            });
        }
        Ok(())
    }

    /// The best mode `caps` supports for `bone_count` bones, preferring
    /// texture skinning over uniform skinning over software skinning.
    pub fn best_for(bone_count: usize, caps: &BackendCaps) -> Self {
        [SkinningMode::HardwareTexture, SkinningMode::HardwareUniform]
            .into_iter()
            .find(|mode| mode.check(bone_count, caps).is_ok())
            .unwrap_or(SkinningMode::Software)
    }
}

/// Dual-quaternion encoding of every bone, for GPU blending.
pub fn pack_dual_quaternions(bones: &[BoneTransform]) -> Vec<[[f32; 4]; 2]> {
    bones.iter().map(|b| b.to_dual_quaternion().to_arrays()).collect()
}

/// Bone data as `capacity` texel pairs: `(x, y, z, 1)` location, then the
/// `(x, y, z, w)` rotation. Missing bones are identity; extra bones are
/// dropped.
pub fn pack_bones(bones: &[BoneTransform], capacity: usize) -> Vec<[f32; 4]> {
    let mut out = Vec::with_capacity(capacity * 2);
    for i in 0..capacity {
        let bone = bones.get(i).unwrap_or(&BoneTransform::IDENTITY);
        let l = bone.location;
        let r = bone.rotation.coords;
        out.push([l.x, l.y, l.z, 1.0]);
        out.push([r.x, r.y, r.z, r.w]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Vec3};

    #[test]
    fn software_always_works() {
        let caps = BackendCaps::default().with_max_uniform_bones(0).with_float_textures(false);
        assert!(SkinningMode::Software.check(10_000, &caps).is_ok());
        assert_eq!(SkinningMode::best_for(10, &caps), SkinningMode::Software);
    }

    #[test]
    fn uniform_bone_limit() {
        let caps = BackendCaps::default().with_max_uniform_bones(64);
        assert!(SkinningMode::HardwareUniform.check(64, &caps).is_ok());
        assert_eq!(
            SkinningMode::HardwareUniform.check(65, &caps),
            Err(CapabilityError::TooManyBones {
                mode: SkinningMode::HardwareUniform,
                bones: 65,
                max: 64
            })
        );
    }

    #[test]
    fn texture_needs_float_textures() {
        let caps = BackendCaps::default().with_float_textures(false);
        assert_eq!(
            SkinningMode::HardwareTexture.check(1, &caps),
            Err(CapabilityError::FloatTexturesUnsupported)
        );
        assert_eq!(SkinningMode::best_for(1, &caps), SkinningMode::HardwareUniform);
        assert_eq!(SkinningMode::best_for(1, &BackendCaps::default()), SkinningMode::HardwareTexture);
        assert_eq!(
            SkinningMode::best_for(MAX_BONES + 1, &BackendCaps::default()),
            SkinningMode::Software
        );
    }

    #[test]
    fn packs_bone_pairs() {
        let bones = [BoneTransform::new(Quat::identity(), Vec3::new(1.0, 2.0, 3.0))];
        let packed = pack_bones(&bones, 2);
        assert_eq!(
            packed,
            vec![
                [1.0, 2.0, 3.0, 1.0],
                [0.0, 0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0, 1.0],
            ]
        );

        let dq = pack_dual_quaternions(&bones);
        assert_eq!(dq.len(), 1);
        assert_eq!(dq[0][0], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(dq[0][1], [0.5, 1.0, 1.5, 0.0]);
    }

    #[test]
    fn error_message() {
        let err = CapabilityError::TooManyBones {
            mode: SkinningMode::HardwareUniform,
            bones: 300,
            max: 256,
        };
        assert_eq!(err.to_string(), "HardwareUniform skinning supports 256 bones, skeleton has 300");
    }
}
