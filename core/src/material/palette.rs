//! Material slots shared across skins, and their export into a
//! [`MaterialArray`].
//!
//! A palette definition lists material definitions. Each becomes a slot,
//! keyed by its canonical name (the definition name with its skin id
//! zeroed). Alternate skins register their own definitions into the same
//! slots under their skin id. Exporting writes every slot's materials into
//! a flat array in skin-major order, after which a skin map resolves each
//! slot to an array index for a given skin.

use std::collections::HashSet;

use crate::archive::Archive;
use crate::names;
use crate::settings::ImportSettings;
use crate::wld::{FragmentId, MeshDef, WldData, WldError};

use super::{MaterialArray, load_material};

/// Index of a material that was not exported.
pub const INVALID_INDEX: u32 = u32::MAX;

/// One skin's material in a slot: the definition it came from and where it
/// landed in the material array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WldMaterial {
    def: Option<FragmentId>,
    index: u32,
}

impl Default for WldMaterial {
    fn default() -> Self {
        Self {
            def: None,
            index: INVALID_INDEX,
        }
    }
}

impl WldMaterial {
    pub fn def(&self) -> Option<FragmentId> {
        self.def
    }

    /// Position in the material array, or [`INVALID_INDEX`].
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_valid(&self) -> bool {
        self.index != INVALID_INDEX
    }

    /// Register `def` as this material's definition.
    ///
    /// A definition is only ever registered once across all slots that
    /// share `claimed`. The first definition set on a material wins; a
    /// different one is reported and ignored. Returns whether `def` was
    /// accepted.
    pub fn set_def(&mut self, def: FragmentId, claimed: &mut HashSet<FragmentId>) -> bool {
        if claimed.contains(&def) {
            return false;
        }
        if let Some(current) = self.def
            && current != def
        {
            log::warn!("Duplicated material definitions (fragments {current} and {def})");
            return false;
        }
        self.def = Some(def);
        claimed.insert(def);
        true
    }
}

/// A canonical material position shared by every skin.
#[derive(Debug, Clone, PartialEq)]
pub struct WldMaterialSlot {
    name: String,
    /// False when the base definition's render mode is zero.
    pub visible: bool,
    base: WldMaterial,
    skins: Vec<WldMaterial>,
}

impl WldMaterialSlot {
    /// Create an empty slot for the material definition called `def_name`.
    pub fn new(def_name: &str) -> Self {
        Self {
            name: names::material_name(def_name),
            visible: false,
            base: WldMaterial::default(),
            skins: Vec::new(),
        }
    }

    /// Canonical name, e.g. `ORC00CH01`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Material for `skin_id`. Skin 0 is the base skin.
    pub fn material(&self, skin_id: u32) -> Option<&WldMaterial> {
        match skin_id {
            0 => Some(&self.base),
            n => self.skins.get(n as usize - 1),
        }
    }

    /// Number of alternate skins, the base skin excluded.
    pub fn skin_count(&self) -> usize {
        self.skins.len()
    }

    /// Register `def` under `skin_id`.
    pub fn add_skin_material(
        &mut self,
        skin_id: u32,
        def: FragmentId,
        claimed: &mut HashSet<FragmentId>,
    ) -> bool {
        if skin_id == 0 {
            return self.base.set_def(def, claimed);
        }
        let index = skin_id as usize - 1;
        if index >= self.skins.len() {
            self.skins.resize(index + 1, WldMaterial::default());
        }
        self.skins[index].set_def(def, claimed)
    }

    /// Array index to use for `skin_id`: that skin's material if it was
    /// exported, otherwise the first exported material of any skin.
    pub fn find_skin_index(&self, skin_id: u32) -> u32 {
        if let Some(material) = self.material(skin_id)
            && material.is_valid()
        {
            return material.index;
        }
        std::iter::once(&self.base)
            .chain(&self.skins)
            .find(|m| m.is_valid())
            .map_or(INVALID_INDEX, |m| m.index)
    }

    fn materials_mut(&mut self) -> impl Iterator<Item = &mut WldMaterial> {
        std::iter::once(&mut self.base).chain(self.skins.iter_mut())
    }
}

/// Material slots of a model, built from a palette definition.
#[derive(Debug, Clone, Default)]
pub struct MaterialPalette {
    def: Option<FragmentId>,
    slots: Vec<WldMaterialSlot>,
    array_offset: u32,
}

impl MaterialPalette {
    /// Create an empty palette.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a palette backed by a palette definition. Slots are created
    /// separately with [`create_slots`](Self::create_slots).
    pub fn from_def(def: FragmentId) -> Self {
        Self {
            def: Some(def),
            ..Self::default()
        }
    }

    pub fn def(&self) -> Option<FragmentId> {
        self.def
    }

    pub fn slots(&self) -> &[WldMaterialSlot] {
        &self.slots
    }

    /// Index of this palette's first material in the array it was last
    /// exported to.
    pub fn array_offset(&self) -> u32 {
        self.array_offset
    }

    /// Create one slot per material of the palette definition.
    ///
    /// With `add_defs`, each definition also becomes its slot's base
    /// material.
    pub fn create_slots(
        &mut self,
        wld: &WldData,
        add_defs: bool,
        claimed: &mut HashSet<FragmentId>,
    ) -> Result<(), WldError> {
        let Some(def) = self.def else {
            return Ok(());
        };
        let palette = wld.palette(def)?;
        for &material_id in &palette.materials {
            let material = wld.material(material_id)?;
            let mut slot = WldMaterialSlot::new(&material.name);
            if add_defs {
                slot.add_skin_material(0, material_id, claimed);
            }
            slot.visible = material.render_mode != 0;
            self.slots.push(slot);
        }
        Ok(())
    }

    pub fn slot_by_name(&self, name: &str) -> Option<&WldMaterialSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// Register every material used by `mesh` under `skin_id`.
    ///
    /// The mesh's slot indices refer to its own palette definition, or to
    /// this palette's when it has none.
    pub fn add_mesh_materials(
        &mut self,
        wld: &WldData,
        mesh: &MeshDef,
        skin_id: u32,
        claimed: &mut HashSet<FragmentId>,
    ) -> Result<(), WldError> {
        let Some(def) = mesh.palette.or(self.def) else {
            return Ok(());
        };
        let palette = wld.palette(def)?;
        for texture in &mesh.polygons_by_texture {
            let slot_id = texture.slot as usize;
            match (self.slots.get_mut(slot_id), palette.materials.get(slot_id)) {
                (Some(slot), Some(&material)) => {
                    slot.add_skin_material(skin_id, material, claimed);
                }
                _ => log::warn!("Mesh '{}' uses unknown material slot {slot_id}", mesh.name),
            }
        }
        Ok(())
    }

    /// Register a material definition by its encoded name.
    ///
    /// Names that decode (e.g. `ORCCH0201_MDF`) go to the slot of their
    /// part under their skin id. Other names become the base material of a
    /// slot of the same name. Missing slots are created.
    pub fn add_material_def(
        &mut self,
        wld: &WldData,
        def: FragmentId,
        claimed: &mut HashSet<FragmentId>,
    ) -> Result<bool, WldError> {
        let material = wld.material(def)?;
        let skin_id = names::explode_name(&material.name).map_or(0, |n| n.skin_id());
        let slot_name = names::material_name(&material.name);

        let index = match self.slots.iter().position(|s| s.name == slot_name) {
            Some(index) => index,
            None => {
                let mut slot = WldMaterialSlot::new(&material.name);
                slot.visible = material.render_mode != 0;
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        Ok(self.slots[index].add_skin_material(skin_id, def, claimed))
    }

    /// Load every slot's materials and append them to `array`.
    ///
    /// Materials are written skin-major: the base material of every slot,
    /// then every slot's first alternate skin, and so on. Each registered
    /// material takes one position whether or not it loads; those that do
    /// not load are left empty and keep [`INVALID_INDEX`].
    pub fn export_to(
        &mut self,
        array: &mut MaterialArray,
        wld: &WldData,
        archive: &dyn Archive,
        settings: &ImportSettings,
    ) {
        let mut pos = array.len() as u32;
        self.array_offset = pos;

        let max_skins = self.slots.iter().map(|s| s.skins.len()).max().unwrap_or(0);
        for slot in &mut self.slots {
            export_material(&mut slot.base, array, &mut pos, wld, archive, settings);
        }
        for skin in 0..max_skins {
            for slot in &mut self.slots {
                if let Some(material) = slot.skins.get_mut(skin) {
                    export_material(material, array, &mut pos, wld, archive, settings);
                }
            }
        }
        log::info!(
            "Exported {} material(s) at offset {}",
            pos - self.array_offset,
            self.array_offset
        );
    }

    /// Forget exported indices, e.g. before exporting to another array.
    pub fn clear_indices(&mut self) {
        for slot in &mut self.slots {
            for material in slot.materials_mut() {
                material.index = INVALID_INDEX;
            }
        }
    }

    /// Array index of every slot for one skin.
    pub fn make_skin_map(&self, skin_id: u32) -> Vec<u32> {
        self.slots.iter().map(|slot| slot.find_skin_index(skin_id)).collect()
    }

    /// Array index of every slot, with a skin id per slot. Slots without an
    /// entry in `skin_ids` use the base skin.
    pub fn make_skin_map_per_slot(&self, skin_ids: &[u32]) -> Vec<u32> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| slot.find_skin_index(skin_ids.get(i).copied().unwrap_or(0)))
            .collect()
    }
}

fn export_material(
    material: &mut WldMaterial,
    array: &mut MaterialArray,
    pos: &mut u32,
    wld: &WldData,
    archive: &dyn Archive,
    settings: &ImportSettings,
) {
    let loaded = material.def.and_then(|id| match wld.material(id) {
        Ok(def) if def.render_mode != 0 || settings.export_invisible => {
            load_material(wld, def, archive, settings)
        }
        Ok(_) => None,
        Err(e) => {
            log::warn!("Cannot export material: {e}");
            None
        }
    });
    material.index = if loaded.is_some() { *pos } else { INVALID_INDEX };
    array.set_material(*pos, loaded);
    *pos += 1;
}
