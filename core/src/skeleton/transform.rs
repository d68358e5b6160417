//! Rigid bone transforms.

use nalgebra::{DualQuaternion, Point3, Translation3, UnitDualQuaternion, UnitQuaternion};

use crate::math::{Quat, Vec3, Vec4, quat_rotate_vec3, quat_slerp, vec3_lerp};

/// Rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    /// Unit rotation quaternion.
    pub rotation: Quat,
    /// Translation applied after the rotation.
    pub location: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Dual-quaternion encoding of a [`BoneTransform`], as `[x, y, z, w]` pairs.
///
/// `real` is the rotation; `dual` is half the translation (as a pure
/// quaternion) multiplied by the rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuat {
    pub real: Vec4,
    pub dual: Vec4,
}

impl BoneTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        rotation: Quat::new(1.0, 0.0, 0.0, 0.0),
        location: Vec3::new(0.0, 0.0, 0.0),
    };

    /// Create a transform from a rotation and a translation.
    pub fn new(rotation: Quat, location: Vec3) -> Self {
        Self { rotation, location }
    }

    /// Transform a point.
    pub fn map(&self, p: Vec3) -> Vec3 {
        quat_rotate_vec3(self.rotation, p) + self.location
    }

    /// Rotate a direction (translation is ignored).
    pub fn map_direction(&self, v: Vec3) -> Vec3 {
        quat_rotate_vec3(self.rotation, v)
    }

    /// `self ∘ local`: apply `local` first, then `self`.
    #[must_use]
    pub fn compose(&self, local: &BoneTransform) -> BoneTransform {
        BoneTransform {
            rotation: self.rotation * local.rotation,
            location: quat_rotate_vec3(self.rotation, local.location) + self.location,
        }
    }

    /// Interpolate between two transforms.
    ///
    /// Rotation is slerped, location is lerped. `t == 0` (and `a == b`)
    /// returns `a` exactly.
    pub fn interpolate(a: &BoneTransform, b: &BoneTransform, t: f32) -> BoneTransform {
        if t <= 0.0 || a == b {
            return *a;
        }
        BoneTransform {
            rotation: quat_slerp(a.rotation, b.rotation, t),
            location: vec3_lerp(a.location, b.location, t),
        }
    }

    /// Encode as a dual quaternion for GPU skinning.
    pub fn to_dual_quaternion(&self) -> DualQuat {
        let dq = UnitDualQuaternion::from_parts(
            Translation3::from(self.location),
            UnitQuaternion::new_unchecked(self.rotation),
        );
        DualQuat {
            real: dq.real.coords,
            dual: dq.dual.coords,
        }
    }
}

impl DualQuat {
    fn to_unit(self) -> UnitDualQuaternion<f32> {
        UnitDualQuaternion::new_unchecked(DualQuaternion::from_real_and_dual(
            Quat::from(self.real),
            Quat::from(self.dual),
        ))
    }

    /// Decode back into a rotation and translation.
    pub fn to_transform(&self) -> BoneTransform {
        let iso = self.to_unit().to_isometry();
        BoneTransform {
            rotation: iso.rotation.into_inner(),
            location: iso.translation.vector,
        }
    }

    /// Transform a point with the rigid motion this dual quaternion encodes.
    pub fn map(&self, p: Vec3) -> Vec3 {
        self.to_unit().transform_point(&Point3::from(p)).coords
    }

    /// Flatten to two `[x, y, z, w]` arrays.
    pub fn to_arrays(&self) -> [[f32; 4]; 2] {
        [
            [self.real.x, self.real.y, self.real.z, self.real.w],
            [self.dual.x, self.dual.y, self.dual.z, self.dual.w],
        ]
    }
}
