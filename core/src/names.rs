//! Decoding of the naming conventions that carry metadata in world files.
//!
//! Material definitions are named `CCCPPSSQQ_MDF` (character, part,
//! skin/palette id, sub-part). Alternate meshes are named
//! `AAA<mesh>SS_DMSPRITEDEF`. Animation tracks are named
//! `NNNAAA<bone>_TRACK`. Decoders return `None` for anything that does not
//! match exactly; they never guess.

const MATERIAL_SUFFIX: &str = "_MDF";
const MESH_SUFFIX: &str = "_DMSPRITEDEF";
const TRACK_SUFFIXES: [&str; 2] = ["_TRACKDEF", "_TRACK"];
const BONE_SUFFIX: &str = "_DAG";

/// Length of actor and animation codes.
pub const CODE_LEN: usize = 3;

/// Name of the pose animation built from a skeleton's own tracks.
pub const POSE_ANIMATION: &str = "POS";

fn is_word(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Decoded material definition name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialName {
    /// Three-character actor code, e.g. `ORC`.
    pub character: String,
    /// Two-digit skin (palette) id, e.g. `02`.
    pub palette: String,
    /// Four-character part code (mesh code + sub-part), e.g. `CH01`.
    pub part: String,
}

impl MaterialName {
    /// Numeric skin id.
    pub fn skin_id(&self) -> u32 {
        self.palette.parse().unwrap_or(0)
    }

    /// Name of the slot shared by every skin of this material.
    pub fn slot_name(&self) -> String {
        format!("{}00{}", self.character, self.part)
    }

    /// Re-encode into a definition name.
    pub fn definition_name(&self) -> String {
        format!(
            "{}{}{}{}{MATERIAL_SUFFIX}",
            self.character,
            &self.part[..2],
            self.palette,
            &self.part[2..]
        )
    }
}

/// Decode a material definition name such as `ORCCH0201_MDF`.
///
/// The name must be five word characters, four digits and `_MDF`.
pub fn explode_name(name: &str) -> Option<MaterialName> {
    let stem = name.strip_suffix(MATERIAL_SUFFIX)?;
    let bytes = stem.as_bytes();
    if bytes.len() != 9
        || !bytes[..5].iter().copied().all(is_word)
        || !bytes[5..].iter().all(u8::is_ascii_digit)
    {
        return None;
    }
    Some(MaterialName {
        character: stem[0..3].to_owned(),
        palette: stem[5..7].to_owned(),
        part: format!("{}{}", &stem[3..5], &stem[7..9]),
    })
}

/// Canonical slot name of a material definition.
///
/// Decodable names lose their skin id (`ORCCH0201_MDF` becomes
/// `ORC00CH01`); others just lose the `_MDF` suffix.
pub fn material_name(def_name: &str) -> String {
    match explode_name(def_name) {
        Some(decoded) => decoded.slot_name(),
        None => def_name
            .strip_suffix(MATERIAL_SUFFIX)
            .unwrap_or(def_name)
            .to_owned(),
    }
}

/// 32-bit FNV-1a hash of a material name.
pub fn material_hash(name: &str) -> u32 {
    name.bytes().fold(2_166_136_261u32, |hash, b| {
        (hash ^ u32::from(b)).wrapping_mul(16_777_619)
    })
}

/// Decoded mesh definition name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshName {
    /// Three-character actor code.
    pub actor: String,
    /// Mesh code, possibly empty.
    pub mesh: String,
    /// Skin id.
    pub skin_id: u32,
}

/// Decode a mesh definition name such as `ORCHE01_DMSPRITEDEF`.
pub fn explode_mesh_name(name: &str) -> Option<MeshName> {
    let stem = name.strip_suffix(MESH_SUFFIX)?;
    let bytes = stem.as_bytes();
    if bytes.len() < CODE_LEN + 2
        || !bytes[..CODE_LEN].iter().copied().all(is_word)
        || !bytes[bytes.len() - 2..].iter().all(u8::is_ascii_digit)
    {
        return None;
    }
    let skin = &stem[stem.len() - 2..];
    Some(MeshName {
        actor: stem[..CODE_LEN].to_owned(),
        mesh: stem[CODE_LEN..stem.len() - 2].to_owned(),
        skin_id: skin.parse().ok()?,
    })
}

/// Decoded animation track name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackName {
    /// Three-character animation code, e.g. `C01`.
    pub animation: String,
    /// Three-character actor code.
    pub actor: String,
    /// Bone key, see [`bone_key`].
    pub bone: String,
}

fn strip_track_suffix(name: &str) -> &str {
    TRACK_SUFFIXES
        .iter()
        .find_map(|s| name.strip_suffix(s))
        .unwrap_or(name)
}

/// Decode an animation track name `<ANIM><ACTOR><BONE>_TRACK`.
pub fn explode_track_name(name: &str) -> Option<TrackName> {
    let stem = strip_track_suffix(name);
    let bytes = stem.as_bytes();
    if bytes.len() < 2 * CODE_LEN || !bytes[..2 * CODE_LEN].iter().copied().all(is_word) {
        return None;
    }
    Some(TrackName {
        animation: stem[..CODE_LEN].to_ascii_uppercase(),
        actor: stem[CODE_LEN..2 * CODE_LEN].to_ascii_uppercase(),
        bone: stem[2 * CODE_LEN..].to_ascii_uppercase(),
    })
}

/// Actor-independent key used to match bones and tracks.
///
/// Strips the leading actor code and the `_DAG`/`_TRACK`/`_TRACKDEF`
/// suffixes, so `ORCHE_DAG`, `ORCHE_TRACK` and `ELFHE_TRACK` all map to
/// `HE`.
pub fn bone_key(name: &str) -> String {
    let stem = strip_track_suffix(name);
    let stem = stem.strip_suffix(BONE_SUFFIX).unwrap_or(stem);
    stem.get(CODE_LEN..).unwrap_or("").to_ascii_uppercase()
}
