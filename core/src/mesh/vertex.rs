//! GPU vertex layout.

use bytemuck::{Pod, Zeroable};

use crate::math::Vec3;

/// Vertex as uploaded to the GPU.
///
/// The third texture coordinate is the texture-array layer, filled in by
/// [`MeshBuffer::update_tex_coords`](super::MeshBuffer::update_tex_coords).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 3],
    /// ABGR color.
    pub color: u32,
    pub bone: u32,
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const SIZE: u32 = std::mem::size_of::<Vertex>() as u32;

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from(self.normal)
    }
}
