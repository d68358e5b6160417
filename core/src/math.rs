//! Math type aliases and helper functions.
//!
//! Rendering math is always `f32`. Quaternions follow nalgebra's storage
//! (`[x, y, z, w]` in memory); use [`quat_from_xyzw`] to build them from
//! the component order used by the world files.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
pub type Quat = nalgebra::Quaternion<f32>;

/// Half-angle sine below which two rotations are treated as parallel and
/// interpolated linearly.
const SLERP_EPSILON: f32 = 1e-4;

/// Create a quaternion from x, y, z, w components.
pub fn quat_from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Quat {
    nalgebra::Quaternion::new(w, x, y, z)
}

/// Create a quaternion from a `[x, y, z, w]` array.
pub fn quat_from_array(a: [f32; 4]) -> Quat {
    nalgebra::Quaternion::new(a[3], a[0], a[1], a[2])
}

/// Convert a quaternion to a `[x, y, z, w]` array.
pub fn quat_to_array(q: Quat) -> [f32; 4] {
    [q.coords.x, q.coords.y, q.coords.z, q.coords.w]
}

/// Create a quaternion from a rotation of `angle` radians around `axis`.
pub fn quat_from_axis_angle(axis: Vec3, angle: f32) -> Quat {
    let axis = nalgebra::Unit::new_normalize(axis);
    nalgebra::UnitQuaternion::from_axis_angle(&axis, angle).into_inner()
}

/// Rotate a vector by a (unit) quaternion.
pub fn quat_rotate_vec3(q: Quat, v: Vec3) -> Vec3 {
    nalgebra::UnitQuaternion::new_unchecked(q) * v
}

/// Spherical linear interpolation between two unit quaternions.
///
/// Takes the shortest arc, falls back to a normalized lerp for nearly
/// parallel inputs, and returns `a` unchanged when `t == 0` so that
/// evaluation at keyframes is exact.
pub fn quat_slerp(a: Quat, b: Quat, t: f32) -> Quat {
    if t <= 0.0 || a == b {
        return a;
    }
    if t >= 1.0 {
        return b;
    }

    let ua = nalgebra::UnitQuaternion::new_normalize(a);
    let mut ub = nalgebra::UnitQuaternion::new_normalize(b);
    if ua.coords.dot(&ub.coords) < 0.0 {
        ub = nalgebra::UnitQuaternion::new_unchecked(-ub.into_inner());
    }
    ua.try_slerp(&ub, t, SLERP_EPSILON)
        .unwrap_or_else(|| ua.nlerp(&ub, t))
        .into_inner()
}

/// Linear interpolation between two vectors.
pub fn vec3_lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    if t <= 0.0 {
        return a;
    }
    a * (1.0 - t) + b * t
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub low: Vec3,
    /// Maximum corner.
    pub high: Vec3,
}

impl Aabb {
    /// Creates a box from its two corners.
    pub fn new(low: Vec3, high: Vec3) -> Self {
        Self { low, high }
    }

    /// Returns this box moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            low: self.low + offset,
            high: self.high + offset,
        }
    }

    /// Grows this box so that it also encloses `other`.
    pub fn extend_to(&mut self, other: &Aabb) {
        self.low = self.low.inf(&other.low);
        self.high = self.high.sup(&other.high);
    }

    /// Union of a sequence of boxes, `None` when the sequence is empty.
    pub fn union_of<'a>(boxes: impl IntoIterator<Item = &'a Aabb>) -> Option<Aabb> {
        let mut iter = boxes.into_iter();
        let mut result = *iter.next()?;
        for b in iter {
            result.extend_to(b);
        }
        Some(result)
    }

    /// Center of the box.
    pub fn center(&self) -> Vec3 {
        (self.low + self.high) * 0.5
    }

    /// Whether `p` lies inside the box (inclusive).
    pub fn contains(&self, p: &Vec3) -> bool {
        (0..3).all(|i| p[i] >= self.low[i] && p[i] <= self.high[i])
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros())
    }
}
