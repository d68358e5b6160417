//! Mesh parts and packed mesh buffers.
//!
//! - [`Vertex`] - GPU vertex layout
//! - [`MeshBuffer`] - vertex/index storage shared by many parts, with
//!   material groups
//! - [`WldMesh`] - one part of a model, referencing its mesh definition
//! - [`skinning`] - CPU skinning of packed vertices

mod buffer;
mod part;
pub mod skinning;
mod vertex;

pub use buffer::{BufferSegment, MaterialGroup, MeshBuffer, MeshData, PartSource};
pub use part::WldMesh;
pub use vertex::Vertex;

#[cfg(test)]
pub(crate) use buffer::tests as fixtures;
