//! # EQuilibre Core
//!
//! Interpretation of decoded world-asset fragment graphs: model assembly,
//! material palettes, mesh buffer packing and skeletal animation.
//!
//! - [`wld`] - the fragment graph the importers read from
//! - [`model`] - models, skins and character import
//! - [`material`] - slots, skin maps and image-backed materials
//! - [`mesh`] - packed vertex/index buffers and software skinning
//! - [`skeleton`] - bone hierarchies, tracks and animation evaluation
//! - [`backend`] - skinning capabilities and bone data packing

pub mod archive;
pub mod backend;
pub mod material;
pub mod math;
pub mod mesh;
pub mod model;
pub mod names;
pub mod settings;
pub mod skeleton;
pub mod texture;
pub mod wld;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
