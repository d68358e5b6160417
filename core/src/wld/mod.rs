//! Fragment graph of a decoded world file.
//!
//! The parser that produces fragments lives outside this crate. It pushes
//! definition records into a [`WldData`] arena; every cross-reference is
//! a [`FragmentId`], so the graph holds no ownership cycles.
//!
//! # Example
//!
//! ```ignore
//! let mut wld = WldData::new();
//! let bitmap = wld.push(Fragment::Bitmap(BitmapDef {
//!     name: "ORCCH0201_SPRITE".into(),
//!     file_names: vec!["orcch0201.bmp".into()],
//! }));
//! let material = wld.push(Fragment::Material(MaterialDef {
//!     name: "ORCCH0201_MDF".into(),
//!     render_mode: 0x01,
//!     bitmaps: vec![bitmap],
//! }));
//! assert_eq!(wld.material(material)?.name, "ORCCH0201_MDF");
//! ```

mod error;
mod types;

pub use error::WldError;
pub use types::{
    ActorDef, BitmapDef, BoneDef, Fragment, FragmentId, FragmentKind, MaterialDef, MeshDef,
    PaletteDef, PolygonTexture, SkeletonDef, TrackDef, VertexPiece,
};

use std::collections::HashMap;

/// Arena of fragments addressed by [`FragmentId`].
#[derive(Debug, Clone, Default)]
pub struct WldData {
    fragments: Vec<Fragment>,
    names: HashMap<String, FragmentId>,
}

macro_rules! typed_accessor {
    ($(#[$doc:meta])* $get:ident, $iter:ident, $variant:ident, $def:ty) => {
        $(#[$doc])*
        pub fn $get(&self, id: FragmentId) -> Result<&$def, WldError> {
            match self.get(id)? {
                Fragment::$variant(def) => Ok(def),
                other => Err(WldError::WrongKind {
                    id,
                    expected: FragmentKind::$variant,
                    found: other.kind(),
                }),
            }
        }

        #[doc = concat!("Iterate over every `", stringify!($variant), "` fragment in arena order.")]
        pub fn $iter(&self) -> impl Iterator<Item = (FragmentId, &$def)> + '_ {
            self.iter().filter_map(|(id, f)| match f {
                Fragment::$variant(def) => Some((id, def)),
                _ => None,
            })
        }
    };
}

impl WldData {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return its handle.
    ///
    /// Names are indexed case-insensitively. When two fragments share a
    /// name, lookups return the first one.
    pub fn push(&mut self, fragment: Fragment) -> FragmentId {
        let id = FragmentId(self.fragments.len() as u32);
        let key = fragment.name().to_ascii_uppercase();
        if !key.is_empty() {
            self.names.entry(key).or_insert(id);
        }
        self.fragments.push(fragment);
        id
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Get a fragment of any kind.
    pub fn get(&self, id: FragmentId) -> Result<&Fragment, WldError> {
        self.fragments
            .get(id.index())
            .ok_or(WldError::MissingFragment(id))
    }

    /// Look up a fragment by name (case-insensitive).
    pub fn find(&self, name: &str) -> Result<FragmentId, WldError> {
        self.names
            .get(&name.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| WldError::UnknownName(name.to_owned()))
    }

    /// Iterate over all fragments in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (FragmentId, &Fragment)> + '_ {
        self.fragments
            .iter()
            .enumerate()
            .map(|(i, f)| (FragmentId(i as u32), f))
    }

    typed_accessor!(
        /// Get an actor definition.
        actor, actors, Actor, ActorDef
    );
    typed_accessor!(
        /// Get a mesh definition.
        mesh, meshes, Mesh, MeshDef
    );
    typed_accessor!(
        /// Get a skeleton definition.
        skeleton, skeletons, Skeleton, SkeletonDef
    );
    typed_accessor!(
        /// Get a material definition.
        material, materials, Material, MaterialDef
    );
    typed_accessor!(
        /// Get a palette definition.
        palette, palettes, Palette, PaletteDef
    );
    typed_accessor!(
        /// Get a bitmap definition.
        bitmap, bitmaps, Bitmap, BitmapDef
    );
    typed_accessor!(
        /// Get a track definition.
        track, tracks, Track, TrackDef
    );
}
