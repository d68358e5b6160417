//! Import of character models, their alternate skins and animations.
//!
//! Character files carry extra data encoded in fragment names:
//!
//! - `ORCHE01_DMSPRITEDEF` is skin 1 of the `HE` mesh of actor `ORC`
//! - `ORCCH0201_MDF` is skin 2 of material `CH01` of actor `ORC`
//! - `C01ORCHE_TRACK` is the `HE` bone's track of animation `C01` of `ORC`

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::names::{CODE_LEN, explode_mesh_name, explode_name};
use crate::settings::ImportSettings;
use crate::skeleton::{Skeleton, Track};
use crate::wld::{FragmentId, WldData};

use super::WldModel;

fn actor_code(name: &str) -> String {
    name.get(..CODE_LEN).unwrap_or(name).to_ascii_uppercase()
}

/// Builds one [`WldModel`] per character actor of a fragment graph.
pub struct CharacterImporter<'a> {
    wld: &'a WldData,
    settings: &'a ImportSettings,
    models: BTreeMap<String, WldModel>,
}

impl<'a> CharacterImporter<'a> {
    pub fn new(wld: &'a WldData, settings: &'a ImportSettings) -> Self {
        Self {
            wld,
            settings,
            models: BTreeMap::new(),
        }
    }

    /// Run every import step.
    pub fn import_all(mut self) -> BTreeMap<String, WldModel> {
        self.import_actors();
        self.import_skeletons();
        self.import_skins();
        self.import_palettes();
        self.import_animations();
        log::info!("Imported {} character(s)", self.models.len());
        self.models
    }

    /// Create a model for every actor definition, keyed by actor code.
    pub fn import_actors(&mut self) {
        for (id, actor) in self.wld.actors() {
            match WldModel::from_actor(self.wld, id, self.settings) {
                Ok(model) => {
                    self.models.insert(actor_code(&actor.name), model);
                }
                Err(e) => log::warn!("Actor '{}': {e}", actor.name),
            }
        }
    }

    /// Attach skeletons to actors that did not reference one.
    pub fn import_skeletons(&mut self) {
        for (id, def) in self.wld.skeletons() {
            let Some(model) = self.models.get_mut(&actor_code(&def.name)) else {
                continue;
            };
            if model.skeleton().is_some() {
                continue;
            }
            match Skeleton::from_def(self.wld, id, self.settings) {
                Ok(skeleton) => model.set_skeleton(Some(skeleton)),
                Err(e) => log::warn!("Skeleton '{}': {e}", def.name),
            }
        }
    }

    /// Create a skin for every alternate mesh and register its materials.
    pub fn import_skins(&mut self) {
        let wld = self.wld;
        for (id, def) in wld.meshes() {
            let Some(name) = explode_mesh_name(&def.name) else {
                continue;
            };
            if name.skin_id == 0 {
                continue;
            }
            let Some(model) = self.models.get_mut(&name.actor.to_ascii_uppercase()) else {
                log::debug!("Mesh '{}': unknown actor '{}'", def.name, name.actor);
                continue;
            };

            let base = model.skin().parts().iter().find(|part| {
                wld.mesh(part.def())
                    .ok()
                    .and_then(|d| explode_mesh_name(&d.name))
                    .is_some_and(|n| n.skin_id == 0 && n.mesh == name.mesh)
            });
            let Some(base) = base.map(Arc::clone) else {
                log::warn!("Mesh '{}': no base part to replace", def.name);
                continue;
            };

            let skin_name = format!("{:02}", name.skin_id);
            if model.skin_named(&skin_name).is_none() {
                model.new_skin(&skin_name);
            }
            let Some(skin) = model.skin_mut(&skin_name) else {
                continue;
            };
            if let Err(e) = skin.replace_part(wld, &base, id) {
                log::warn!("Mesh '{}': {e}", def.name);
                continue;
            }
            if let Err(e) = model.add_mesh_materials(wld, def, name.skin_id) {
                log::warn!("Mesh '{}': {e}", def.name);
            }
        }
    }

    /// Register material definitions into their actor's palette.
    pub fn import_palettes(&mut self) {
        for (id, def) in self.wld.materials() {
            let Some(name) = explode_name(&def.name) else {
                continue;
            };
            let Some(model) = self.models.get_mut(&name.character.to_ascii_uppercase()) else {
                continue;
            };
            if let Err(e) = model.add_material_def(self.wld, id) {
                log::warn!("Material '{}': {e}", def.name);
            }
        }
    }

    /// Attach animation tracks to their actor's skeleton.
    ///
    /// Tracks used by a skeleton's pose are skipped.
    pub fn import_animations(&mut self) {
        let pose_tracks: HashSet<FragmentId> = self
            .wld
            .skeletons()
            .flat_map(|(_, s)| s.bones.iter().filter_map(|b| b.track))
            .collect();

        for (id, def) in self.wld.tracks() {
            if pose_tracks.contains(&id) {
                continue;
            }
            let Some((name, track)) = Track::animation(def) else {
                continue;
            };
            let Some(skeleton) = self.models.get_mut(&name.actor).and_then(WldModel::skeleton_mut) else {
                log::debug!("Track '{}': no skeleton for actor '{}'", def.name, name.actor);
                continue;
            };
            skeleton.add_track(&name.animation, Arc::new(track));
        }
    }

    pub fn model(&self, actor: &str) -> Option<&WldModel> {
        self.models.get(&actor.to_ascii_uppercase())
    }

    pub fn into_models(self) -> BTreeMap<String, WldModel> {
        self.models
    }
}
