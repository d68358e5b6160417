//! Renderable models assembled from actor definitions.
//!
//! A [`WldModel`] owns its parts, an optional [`Skeleton`], a
//! [`MaterialPalette`] and one or more [`ModelSkin`]s. Skin `"00"` always
//! exists and holds the base parts; other skins start as a copy of it and
//! replace individual parts.
//!
//! # Example
//!
//! ```ignore
//! let mut model = WldModel::from_actor(&wld, actor_id, &settings)?;
//! model.upload_buffer(&wld, &archive, &settings);
//! let groups = model.skin().material_groups(&model);
//! ```

mod character;

pub use character::CharacterImporter;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::archive::Archive;
use crate::material::{INVALID_INDEX, MaterialArray, MaterialPalette};
use crate::math::Aabb;
use crate::mesh::{MaterialGroup, MeshBuffer, WldMesh};
use crate::settings::ImportSettings;
use crate::skeleton::Skeleton;
use crate::wld::{ActorDef, Fragment, FragmentId, MeshDef, WldData, WldError};

/// Name of the skin holding a model's base parts.
pub const DEFAULT_SKIN: &str = "00";

/// A named set of parts. Parts are shared with other skins until replaced.
#[derive(Debug, Clone)]
pub struct ModelSkin {
    name: String,
    parts: Vec<Arc<WldMesh>>,
    bounds: Aabb,
}

impl ModelSkin {
    fn new(name: impl Into<String>, parts: Vec<Arc<WldMesh>>) -> Self {
        let mut skin = Self {
            name: name.into(),
            parts,
            bounds: Aabb::default(),
        };
        skin.update_bounds();
        skin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Skin id encoded in the name. Names that are not a number use the
    /// base materials.
    pub fn skin_id(&self) -> u32 {
        self.name.parse().unwrap_or(0)
    }

    /// Parts, indexed by part id.
    pub fn parts(&self) -> &[Arc<WldMesh>] {
        &self.parts
    }

    /// Union of the parts' bounds.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Append a part built from `def`. Its part id is the current part
    /// count.
    pub fn add_part(&mut self, wld: &WldData, def: FragmentId) -> Result<Arc<WldMesh>, WldError> {
        let part = Arc::new(WldMesh::new(wld, def, self.parts.len() as u32)?);
        self.parts.push(Arc::clone(&part));
        self.update_bounds();
        Ok(part)
    }

    /// Replace `base` with a part built from `def`.
    ///
    /// Nothing is replaced when `base` is no longer the part stored under
    /// its id, or when it already uses `def`. Returns whether the part was
    /// replaced.
    pub fn replace_part(
        &mut self,
        wld: &WldData,
        base: &Arc<WldMesh>,
        def: FragmentId,
    ) -> Result<bool, WldError> {
        let part_id = base.part_id();
        let replaced = match self.parts.get(part_id as usize) {
            Some(current) if Arc::ptr_eq(current, base) && base.def() != def => {
                self.parts[part_id as usize] = Arc::new(WldMesh::new(wld, def, part_id)?);
                true
            }
            _ => false,
        };
        self.update_bounds();
        Ok(replaced)
    }

    fn update_bounds(&mut self) {
        self.bounds = Aabb::union_of(self.parts.iter().map(|p| p.bounds())).unwrap_or_default();
    }

    /// Material groups to draw this skin from `model`'s buffer in one call.
    ///
    /// Empty until [`WldModel::upload_buffer`] has run.
    pub fn material_groups(&self, model: &WldModel) -> Vec<MaterialGroup> {
        let Some(buffer) = &model.buffer else {
            return Vec::new();
        };
        if self.same_parts(model.skin()) {
            return buffer.groups.clone();
        }

        let mut groups: Vec<MaterialGroup> = Vec::new();
        for part in &self.parts {
            let Some(data) = model.uploaded.get(&part.def()).and_then(|&i| buffer.parts.get(i)) else {
                log::warn!("Skin '{}': part {} was not uploaded", self.name, part.part_id());
                continue;
            };
            for group in data.absolute_groups() {
                match groups.last_mut() {
                    Some(last) if last.mat_id == group.mat_id && last.offset + last.count == group.offset => {
                        last.count += group.count;
                    }
                    _ => groups.push(group),
                }
            }
        }
        groups
    }

    fn same_parts(&self, other: &ModelSkin) -> bool {
        self.parts.len() == other.parts.len()
            && self.parts.iter().zip(&other.parts).all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

/// A model assembled from an actor definition.
#[derive(Debug, Clone)]
pub struct WldModel {
    skins: Vec<ModelSkin>,
    skeleton: Option<Skeleton>,
    palette: MaterialPalette,
    claimed: HashSet<FragmentId>,
    materials: Option<MaterialArray>,
    buffer: Option<MeshBuffer>,
    /// Index into `buffer.parts` of every uploaded mesh definition.
    uploaded: HashMap<FragmentId, usize>,
}

impl Default for WldModel {
    fn default() -> Self {
        Self {
            skins: vec![ModelSkin::new(DEFAULT_SKIN, Vec::new())],
            skeleton: None,
            palette: MaterialPalette::new(),
            claimed: HashSet::new(),
            materials: None,
            buffer: None,
            uploaded: HashMap::new(),
        }
    }
}

impl WldModel {
    /// Create an empty model with only the default skin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh definitions used by an actor, in part order.
    ///
    /// Includes meshes referenced directly by the actor, then those
    /// attached to its skeleton's bones.
    pub fn list_meshes(wld: &WldData, actor: &ActorDef) -> Vec<FragmentId> {
        let mut meshes = Vec::new();
        for &id in &actor.models {
            match wld.get(id) {
                Ok(Fragment::Mesh(_)) => meshes.push(id),
                Ok(Fragment::Skeleton(skeleton)) => {
                    meshes.extend(skeleton.meshes.iter().flatten().copied());
                }
                Ok(other) => {
                    log::debug!("Actor '{}': ignoring {:?} model {id}", actor.name, other.kind());
                }
                Err(e) => log::warn!("Actor '{}': {e}", actor.name),
            }
        }
        meshes
    }

    /// Build a model from an actor definition.
    ///
    /// Parts that fail to load are logged and left out. The palette comes
    /// from the first part's palette definition.
    pub fn from_actor(
        wld: &WldData,
        actor: FragmentId,
        settings: &ImportSettings,
    ) -> Result<Self, WldError> {
        let def = wld.actor(actor)?;
        let mut model = Self::new();

        for mesh in Self::list_meshes(wld, def) {
            if let Err(e) = model.skins[0].add_part(wld, mesh) {
                log::warn!("Actor '{}': {e}", def.name);
            }
        }

        let skeleton_id = def
            .models
            .iter()
            .copied()
            .find(|&id| matches!(wld.get(id), Ok(Fragment::Skeleton(_))));
        if let Some(id) = skeleton_id {
            match Skeleton::from_def(wld, id, settings) {
                Ok(skeleton) => model.skeleton = Some(skeleton),
                Err(e) => log::warn!("Actor '{}': {e}", def.name),
            }
        }

        if let Some(palette) = model.skin().parts().first().and_then(|p| p.palette()) {
            let mut resolved = MaterialPalette::from_def(palette);
            match resolved.create_slots(wld, true, &mut model.claimed) {
                Ok(()) => model.palette = resolved,
                Err(e) => log::warn!("Actor '{}': {e}", def.name),
            }
        }

        log::info!(
            "Imported actor '{}': {} part(s), {} slot(s), skeleton: {}",
            def.name,
            model.skin().parts().len(),
            model.palette.slots().len(),
            model.skeleton.is_some()
        );
        Ok(model)
    }

    /// The default skin.
    pub fn skin(&self) -> &ModelSkin {
        &self.skins[0]
    }

    pub fn skin_named(&self, name: &str) -> Option<&ModelSkin> {
        self.skins.iter().find(|s| s.name == name)
    }

    pub fn skin_mut(&mut self, name: &str) -> Option<&mut ModelSkin> {
        self.skins.iter_mut().find(|s| s.name == name)
    }

    /// Skins in creation order, the default skin first.
    pub fn skins(&self) -> &[ModelSkin] {
        &self.skins
    }

    /// Create a skin as a copy of the default skin's parts. An existing
    /// skin of the same name is reset.
    pub fn new_skin(&mut self, name: &str) -> &mut ModelSkin {
        let skin = ModelSkin::new(name, self.skins[0].parts.clone());
        let index = match self.skins.iter().position(|s| s.name == name) {
            Some(index) => {
                self.skins[index] = skin;
                index
            }
            None => {
                self.skins.push(skin);
                self.skins.len() - 1
            }
        };
        &mut self.skins[index]
    }

    /// Every distinct part used by any skin.
    pub fn meshes(&self) -> Vec<Arc<WldMesh>> {
        let mut meshes: Vec<Arc<WldMesh>> = Vec::new();
        for part in self.skins.iter().flat_map(|s| &s.parts) {
            if !meshes.iter().any(|m| Arc::ptr_eq(m, part)) {
                meshes.push(Arc::clone(part));
            }
        }
        meshes
    }

    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    pub fn skeleton_mut(&mut self) -> Option<&mut Skeleton> {
        self.skeleton.as_mut()
    }

    pub fn set_skeleton(&mut self, skeleton: Option<Skeleton>) {
        self.skeleton = skeleton;
    }

    pub fn palette(&self) -> &MaterialPalette {
        &self.palette
    }

    /// Register the materials of an alternate mesh under `skin_id`.
    pub fn add_mesh_materials(&mut self, wld: &WldData, mesh: &MeshDef, skin_id: u32) -> Result<(), WldError> {
        self.palette.add_mesh_materials(wld, mesh, skin_id, &mut self.claimed)
    }

    /// Register a material definition by its encoded name, see
    /// [`MaterialPalette::add_material_def`].
    pub fn add_material_def(&mut self, wld: &WldData, def: FragmentId) -> Result<bool, WldError> {
        self.palette.add_material_def(wld, def, &mut self.claimed)
    }

    /// Materials exported by the last upload.
    pub fn materials(&self) -> Option<&MaterialArray> {
        self.materials.as_ref()
    }

    /// Geometry packed by the last upload.
    pub fn buffer(&self) -> Option<&MeshBuffer> {
        self.buffer.as_ref()
    }

    /// Export the palette and pack every part into one buffer.
    ///
    /// The default skin's parts are combined into one range per material.
    /// Parts only used by other skins follow as separate segments, their
    /// groups pointing at that skin's materials.
    pub fn upload_buffer(&mut self, wld: &WldData, archive: &dyn Archive, settings: &ImportSettings) -> &MeshBuffer {
        let mut materials = MaterialArray::new();
        self.palette.export_to(&mut materials, wld, archive, settings);
        let offset = self.palette.array_offset();

        let base: Vec<&WldMesh> = self.skins[0].parts.iter().map(Arc::as_ref).collect();
        let mut buffer = WldMesh::combine(wld, &base, offset, settings);

        self.uploaded.clear();
        for (index, data) in buffer.parts.iter().enumerate() {
            if let Some(part) = self.skins[0].parts.iter().find(|p| p.part_id() == data.part_id) {
                self.uploaded.insert(part.def(), index);
            }
        }
        for skin in &self.skins[1..] {
            let skin_map = self.palette.make_skin_map(skin.skin_id());
            for part in &skin.parts {
                if self.uploaded.contains_key(&part.def()) {
                    continue;
                }
                match part.import_into(wld, &mut buffer, offset, settings) {
                    Ok(index) => {
                        remap_groups(&mut buffer.parts[index].groups, offset, &skin_map);
                        self.uploaded.insert(part.def(), index);
                    }
                    Err(e) => log::warn!("Skin '{}': skipping part {}: {e}", skin.name, part.part_id()),
                }
            }
        }

        materials.assign_layers();
        buffer.update_tex_coords(&materials);
        self.materials = Some(materials);
        self.buffer.insert(buffer)
    }
}

/// Point palette-relative groups at the materials of one skin. Slots with
/// no exported material keep their base id.
fn remap_groups(groups: &mut [MaterialGroup], palette_offset: u32, skin_map: &[u32]) {
    for group in groups {
        let mapped = group
            .mat_id
            .checked_sub(palette_offset)
            .and_then(|slot| skin_map.get(slot as usize))
            .copied();
        if let Some(mat_id) = mapped
            && mat_id != INVALID_INDEX
        {
            group.mat_id = mat_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::math::Vec3;
    use crate::mesh::fixtures::{quad, triangle};
    use crate::wld::{BoneDef, MaterialDef, PaletteDef, SkeletonDef};

    struct Fixture {
        wld: WldData,
        actor: FragmentId,
        body: FragmentId,
        head: FragmentId,
    }

    fn fixture() -> Fixture {
        let mut wld = WldData::new();
        let materials = ["ORCCH0001_MDF", "ORCHE0001_MDF"].map(|name| {
            wld.push(Fragment::Material(MaterialDef {
                name: name.into(),
                render_mode: 1,
                bitmaps: vec![],
            }))
        });
        let palette = wld.push(Fragment::Palette(PaletteDef {
            name: "ORC_MP".into(),
            materials: materials.to_vec(),
        }));
        let body = wld.push(Fragment::Mesh(MeshDef {
            name: "ORCCH00_DMSPRITEDEF".into(),
            bounds: Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)),
            palette: Some(palette),
            ..quad(0)
        }));
        let head = wld.push(Fragment::Mesh(MeshDef {
            name: "ORCHE00_DMSPRITEDEF".into(),
            bounds: Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 3.0)),
            palette: Some(palette),
            ..triangle(1)
        }));
        let skeleton = wld.push(Fragment::Skeleton(SkeletonDef {
            name: "ORC_HS_DEF".into(),
            bones: vec![BoneDef {
                name: "ORC_DAG".into(),
                ..Default::default()
            }],
            meshes: vec![Some(head), None],
            ..Default::default()
        }));
        let actor = wld.push(Fragment::Actor(ActorDef {
            name: "ORC_ACTORDEF".into(),
            models: vec![body, skeleton],
        }));
        Fixture { wld, actor, body, head }
    }

    #[test]
    fn lists_direct_then_skeleton_meshes() {
        let f = fixture();
        let actor = f.wld.actor(f.actor).unwrap();
        assert_eq!(WldModel::list_meshes(&f.wld, actor), vec![f.body, f.head]);
    }

    #[test]
    fn from_actor() {
        let f = fixture();
        let model = WldModel::from_actor(&f.wld, f.actor, &ImportSettings::default()).unwrap();

        let skin = model.skin();
        assert_eq!(skin.name(), DEFAULT_SKIN);
        assert_eq!(skin.parts().len(), 2);
        assert_eq!(skin.parts()[1].part_id(), 1);
        assert_eq!(skin.bounds().high, Vec3::new(11.0, 1.0, 3.0));
        assert_eq!(model.skeleton().unwrap().bone_count(), 1);
        assert_eq!(model.palette().slots().len(), 2);
    }

    #[test]
    fn replace_part_checks_handle() {
        let mut f = fixture();
        let alt = f.wld.push(Fragment::Mesh(MeshDef {
            name: "ORCHE01_DMSPRITEDEF".into(),
            bounds: Aabb::new(Vec3::zeros(), Vec3::new(5.0, 5.0, 5.0)),
            ..triangle(1)
        }));
        let mut model = WldModel::from_actor(&f.wld, f.actor, &ImportSettings::default()).unwrap();
        let head = Arc::clone(&model.skin().parts()[1]);
        let base_bounds = *model.skin().bounds();

        let skin = model.new_skin("01");
        assert_eq!(*skin.bounds(), base_bounds);
        // Same definition: nothing to replace.
        assert!(!skin.replace_part(&f.wld, &head, f.head).unwrap());
        assert!(skin.replace_part(&f.wld, &head, alt).unwrap());
        // The handle is stale now.
        assert!(!skin.replace_part(&f.wld, &head, alt).unwrap());
        assert_eq!(skin.bounds().high, Vec3::new(11.0, 5.0, 5.0));

        assert_eq!(model.skin().parts()[1].def(), f.head);
        assert_eq!(model.skin_named("01").unwrap().parts()[1].def(), alt);
        assert_eq!(model.meshes().len(), 3);
        let names: Vec<_> = model.skins().iter().map(ModelSkin::name).collect();
        assert_eq!(names, ["00", "01"]);
    }

    #[test]
    fn upload_packs_all_skins() {
        let mut f = fixture();
        let alt = f.wld.push(Fragment::Mesh(MeshDef {
            name: "ORCHE01_DMSPRITEDEF".into(),
            ..triangle(1)
        }));
        let settings = ImportSettings::default();
        let mut model = WldModel::from_actor(&f.wld, f.actor, &settings).unwrap();
        let head = Arc::clone(&model.skin().parts()[1]);
        model.new_skin("01").replace_part(&f.wld, &head, alt).unwrap();

        let buffer = model.upload_buffer(&f.wld, &MemoryArchive::new(), &settings);
        assert_eq!(buffer.vertices.len(), 10);
        assert_eq!(buffer.parts.len(), 3);
        assert_eq!(model.materials().unwrap().len(), 2);

        let base = model.skin().material_groups(&model);
        assert_eq!(base.len(), 2);
        assert_eq!(base.iter().map(|g| g.count).sum::<u32>(), 9);

        let groups = model.skin_named("01").unwrap().material_groups(&model);
        assert_eq!(groups.iter().map(|g| g.count).sum::<u32>(), 9);
        assert_eq!(groups[1], MaterialGroup { id: 1, offset: 9, count: 3, mat_id: 1 });
    }

    #[test]
    fn skin_groups_follow_skin_map() {
        let mut groups = vec![
            MaterialGroup { id: 1, offset: 0, count: 3, mat_id: 2 },
            MaterialGroup { id: 1, offset: 3, count: 3, mat_id: 3 },
            MaterialGroup { id: 1, offset: 6, count: 3, mat_id: 9 },
        ];
        remap_groups(&mut groups, 2, &[5, INVALID_INDEX]);
        let ids: Vec<u32> = groups.iter().map(|g| g.mat_id).collect();
        assert_eq!(ids, [5, 3, 9]);

        assert_eq!(ModelSkin::new("01", Vec::new()).skin_id(), 1);
        assert_eq!(ModelSkin::new("ALT", Vec::new()).skin_id(), 0);
    }

    #[test]
    fn groups_need_upload() {
        let f = fixture();
        let model = WldModel::from_actor(&f.wld, f.actor, &ImportSettings::default()).unwrap();
        assert!(model.skin().material_groups(&model).is_empty());
        assert!(model.buffer().is_none());
    }
}
