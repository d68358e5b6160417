use std::sync::Arc;
use std::time::Duration;

use equilibre_core::archive::MemoryArchive;
use equilibre_core::backend::{BackendCaps, SkinningMode, pack_dual_quaternions};
use equilibre_core::material::{INVALID_INDEX, Origin};
use equilibre_core::math::{Quat, Vec2, Vec3, quat_from_axis_angle};
use equilibre_core::mesh::skinning::skin_vertices;
use equilibre_core::mesh::{MaterialGroup, MeshBuffer, PartSource};
use equilibre_core::model::{CharacterImporter, WldModel};
use equilibre_core::names::explode_name;
use equilibre_core::settings::ImportSettings;
use equilibre_core::skeleton::{BoneTransform, Track};
use equilibre_core::wld::{
    ActorDef, BitmapDef, BoneDef, Fragment, FragmentId, MaterialDef, MeshDef, PaletteDef,
    PolygonTexture, SkeletonDef, TrackDef, VertexPiece, WldData,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// An uncompressed 8-bit BMP. `width` must be a multiple of 4.
fn bmp(width: u32, height: u32, palette: &[[u8; 3]], index: u8) -> Vec<u8> {
    let pixels = vec![index; (width * height) as usize];
    let table_size = palette.len() as u32 * 4;
    let offset = 14 + 40 + table_size;
    let mut out = Vec::new();
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(offset + pixels.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(pixels.len() as u32).to_le_bytes());
    out.extend_from_slice(&2835i32.to_le_bytes());
    out.extend_from_slice(&2835i32.to_le_bytes());
    out.extend_from_slice(&(palette.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    for [r, g, b] in palette {
        out.extend_from_slice(&[*b, *g, *r, 0]);
    }
    out.extend_from_slice(&pixels);
    out
}

/// Part A: 4 vertices, 2 triangles.
fn part_a(slot: u32) -> MeshDef {
    MeshDef {
        name: "ORCCH00_DMSPRITEDEF".into(),
        vertices: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        tex_coords: vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
        vertex_pieces: vec![VertexPiece { count: 4, bone: 0 }],
        polygons_by_texture: vec![PolygonTexture { count: 2, slot }],
        ..Default::default()
    }
}

/// Part B: 3 vertices, 1 triangle.
fn part_b(name: &str, slot: u32) -> MeshDef {
    MeshDef {
        name: name.into(),
        center: Vec3::new(0.0, 0.0, 2.0),
        vertices: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        tex_coords: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
        indices: vec![0, 1, 2],
        vertex_pieces: vec![VertexPiece { count: 3, bone: 1 }],
        polygons_by_texture: vec![PolygonTexture { count: 1, slot }],
        ..Default::default()
    }
}

fn material(wld: &mut WldData, name: &str, render_mode: u32, file: &str) -> FragmentId {
    let bitmap = wld.push(Fragment::Bitmap(BitmapDef {
        name: format!("{name}_SPRITE"),
        file_names: vec![file.into()],
    }));
    wld.push(Fragment::Material(MaterialDef {
        name: name.into(),
        render_mode,
        bitmaps: vec![bitmap],
    }))
}

fn track(name: &str, frames: Vec<BoneTransform>) -> Fragment {
    Fragment::Track(TrackDef {
        name: name.into(),
        frames,
        frame_duration: None,
    })
}

fn at(z: f32) -> BoneTransform {
    BoneTransform::new(Quat::identity(), Vec3::new(0.0, 0.0, z))
}

/// An orc with a chest and a head, an alternate head and chest texture,
/// and a two-frame walk animation.
fn orc() -> (WldData, MemoryArchive) {
    let mut wld = WldData::new();
    let chest = material(&mut wld, "ORCCH0001_MDF", 0x01, "ORCCH0001.BMP");
    let face = material(&mut wld, "ORCHE0001_MDF", 0x13, "orche0001.bmp");
    let palette = wld.push(Fragment::Palette(PaletteDef {
        name: "ORC_MP".into(),
        materials: vec![chest, face],
    }));
    let body = wld.push(Fragment::Mesh(MeshDef {
        palette: Some(palette),
        ..part_a(0)
    }));
    let head = wld.push(Fragment::Mesh(MeshDef {
        palette: Some(palette),
        ..part_b("ORCHE00_DMSPRITEDEF", 1)
    }));

    let root = wld.push(track("ORC_TRACK", vec![at(0.0)]));
    let neck = wld.push(track("ORCHE_TRACK", vec![at(1.0)]));
    let skeleton = wld.push(Fragment::Skeleton(SkeletonDef {
        name: "ORC_HS_DEF".into(),
        bones: vec![
            BoneDef {
                name: "ORC_DAG".into(),
                track: Some(root),
                mesh: None,
                children: vec![1],
            },
            BoneDef {
                name: "ORCHE_DAG".into(),
                track: Some(neck),
                mesh: Some(head),
                children: vec![],
            },
        ],
        meshes: vec![Some(head)],
        ..Default::default()
    }));
    wld.push(Fragment::Actor(ActorDef {
        name: "ORC_ACTORDEF".into(),
        models: vec![body, skeleton],
    }));

    let alt_face = material(&mut wld, "ORCHE0101_MDF", 0x01, "orche0101.bmp");
    let alt_palette = wld.push(Fragment::Palette(PaletteDef {
        name: "ORC01_MP".into(),
        materials: vec![chest, alt_face],
    }));
    wld.push(Fragment::Mesh(MeshDef {
        palette: Some(alt_palette),
        ..part_b("ORCHE01_DMSPRITEDEF", 1)
    }));
    material(&mut wld, "ORCCH0201_MDF", 0x05, "orcch0201.bmp");
    wld.push(track("L01ORCHE_TRACK", vec![at(2.0), at(4.0)]));

    let colors = [[255, 0, 255], [200, 100, 50]];
    let archive = MemoryArchive::new()
        .with_file("orcch0001.bmp", bmp(8, 8, &colors, 1))
        .with_file("orche0001.bmp", bmp(4, 4, &colors, 0))
        .with_file("orche0101.bmp", bmp(4, 4, &colors, 1))
        .with_file("orcch0201.bmp", bmp(8, 4, &colors, 1));
    (wld, archive)
}

// ---------------------------------------------------------------------------
// Mesh buffer packing
// ---------------------------------------------------------------------------

#[test]
fn combine_two_parts() {
    init_logging();
    let settings = ImportSettings::default();
    let (a, b) = (part_a(1), part_b("B", 2));
    let buffer = MeshBuffer::combine(
        &[
            PartSource { def: &a, part_id: 0, palette_offset: 0 },
            PartSource { def: &b, part_id: 1, palette_offset: 0 },
        ],
        &settings,
    );

    assert_eq!(buffer.vertices.len(), 7);
    assert_eq!(buffer.indices.len(), 9);
    assert_eq!(
        buffer.groups,
        vec![
            MaterialGroup { id: 0, offset: 0, count: 6, mat_id: 1 },
            MaterialGroup { id: 1, offset: 6, count: 3, mat_id: 2 },
        ]
    );
    assert_eq!(&buffer.indices[6..], &[4, 5, 6]);
    assert_eq!(buffer.vertices[4].position, [0.0, 0.0, 2.0]);
    assert_eq!(buffer.vertices[4].bone, 1);
    assert_eq!(buffer.vertices[0].color, settings.default_vertex_color);
}

// ---------------------------------------------------------------------------
// Character import
// ---------------------------------------------------------------------------

#[test]
fn character_skins_and_materials() {
    init_logging();
    let (wld, archive) = orc();
    let settings = ImportSettings::default();
    let mut models = CharacterImporter::new(&wld, &settings).import_all();
    let model: &mut WldModel = models.get_mut("ORC").unwrap();

    let skins: Vec<&str> = model.skins().iter().map(|s| s.name()).collect();
    assert_eq!(skins, ["00", "01"]);

    model.upload_buffer(&wld, &archive, &settings);
    let materials = model.materials().unwrap();

    // Base materials first, then skin 1 (the chest has none), then skin 2.
    assert_eq!(materials.len(), 5);
    assert_eq!(materials.loaded_count(), 4);
    assert!(materials.material(2).is_none());
    let palette = model.palette();
    assert_eq!(palette.make_skin_map(0), vec![0, 1]);
    assert_eq!(palette.make_skin_map(1), vec![0, 3]);
    assert_eq!(palette.make_skin_map(2), vec![4, 1]);
    assert_eq!(palette.make_skin_map_per_slot(&[2, 1]), vec![4, 3]);

    // Color-keyed face: palette entry 0 is transparent.
    let face = materials.material(1).unwrap();
    assert!(!face.is_opaque());
    assert_eq!(face.origin(), Origin::UpperLeft);
    assert!(face.image().data().chunks(4).all(|p| p[3] == 0));

    // Semi-transparent chest of skin 2.
    let chest = materials.material(4).unwrap();
    assert!(!chest.is_opaque());
    assert!(chest.image().data().chunks(4).all(|p| p[3] == settings.semi_transparent_alpha));

    // Texture coordinates are rescaled to the largest image (8x8).
    let buffer = model.buffer().unwrap();
    assert_eq!(buffer.vertices[2].tex_coords, [1.0, 1.0, 0.0]);
    assert_eq!(buffer.vertices[5].tex_coords, [0.5, 0.0, 1.0]);
    assert_eq!(buffer.vertices[8].tex_coords, [0.5, 0.0, 2.0]);
}

#[test]
fn alternate_skin_draw_ranges() {
    init_logging();
    let (wld, archive) = orc();
    let settings = ImportSettings::default();
    let mut models = CharacterImporter::new(&wld, &settings).import_all();
    let model = models.get_mut("ORC").unwrap();
    model.upload_buffer(&wld, &archive, &settings);
    let model: &WldModel = model;

    let base = model.skin().material_groups(model);
    assert_eq!(
        base,
        vec![
            MaterialGroup { id: 0, offset: 0, count: 6, mat_id: 0 },
            MaterialGroup { id: 1, offset: 6, count: 3, mat_id: 1 },
        ]
    );

    let alt = model.skin_named("01").unwrap();
    let groups = alt.material_groups(model);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].offset, 9);
    // The alternate head draws with skin 1's face.
    assert_eq!(groups[1].mat_id, 3);
    assert_eq!(groups.iter().map(|g| g.count).sum::<u32>(), 9);
    assert_eq!(alt.bounds(), model.skin().bounds());
}

#[test]
fn palette_without_skins() {
    let (wld, archive) = orc();
    let settings = ImportSettings::default();
    let actor = wld.find("ORC_ACTORDEF").unwrap();
    let mut model = WldModel::from_actor(&wld, actor, &settings).unwrap();
    model.upload_buffer(&wld, &archive, &settings);

    for skin in 0..4 {
        assert_eq!(model.palette().make_skin_map(skin), vec![0, 1]);
    }
}

#[test]
fn missing_bitmaps_degrade_to_invalid_indices() {
    init_logging();
    let (wld, _) = orc();
    let settings = ImportSettings::default();
    let actor = wld.find("ORC_ACTORDEF").unwrap();
    let mut model = WldModel::from_actor(&wld, actor, &settings).unwrap();

    let buffer = model.upload_buffer(&wld, &MemoryArchive::new(), &settings);
    assert_eq!(buffer.vertices.len(), 7);
    assert_eq!(model.materials().unwrap().len(), 2);
    assert_eq!(model.materials().unwrap().loaded_count(), 0);
    assert_eq!(model.palette().make_skin_map(0), vec![INVALID_INDEX, INVALID_INDEX]);
}

#[test]
fn material_name_decoding() {
    let name = explode_name("ORCCH0201_MDF").unwrap();
    assert_eq!(name.character, "ORC");
    assert_eq!(name.palette, "02");
    assert_eq!(name.part, "CH01");
    assert_eq!(name.definition_name(), "ORCCH0201_MDF");
    assert!(explode_name("ORCCH021_MDF").is_none());
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

#[test]
fn animation_evaluation_and_skinning() {
    init_logging();
    let (wld, _) = orc();
    let settings = ImportSettings::default();
    let models = CharacterImporter::new(&wld, &settings).import_all();
    let skeleton = models["ORC"].skeleton().unwrap();

    let names: Vec<&str> = skeleton.animation_names().collect();
    assert_eq!(names, ["POS", "L01"]);
    let walk = skeleton.animation("L01").unwrap();
    assert_eq!(walk.frame_count(), 2);
    assert_eq!(walk.duration(), Duration::from_millis(200));

    // Exact keyframes, then halfway, then wrapped around.
    let at_frame = |f: f32| skeleton.transformations_at_frame("L01", f).unwrap()[1].location.z;
    assert_eq!(at_frame(0.0), 2.0);
    assert_eq!(at_frame(1.0), 4.0);
    assert!((at_frame(0.5) - 3.0).abs() < 1e-5);
    assert!((at_frame(1.5) - 3.0).abs() < 1e-5);

    let bones = skeleton.transformations_at_time("L01", Duration::from_millis(150)).unwrap();
    assert!((bones[1].location.z - 3.0).abs() < 1e-5);

    let model = &models["ORC"];
    let head = wld.mesh(model.skin().parts()[1].def()).unwrap();
    let mut buffer = MeshBuffer::new();
    buffer
        .import_part(PartSource { def: head, part_id: 1, palette_offset: 0 }, &settings)
        .unwrap();
    let skinned = skin_vertices(&buffer.vertices, &bones);
    assert!((skinned[0].position[2] - 5.0).abs() < 1e-5);
}

#[test]
fn imported_animation_keeps_authored_frame_rate() {
    init_logging();
    let (mut wld, _) = orc();
    wld.push(Fragment::Track(TrackDef {
        name: "C02ORCHE_TRACK".into(),
        frames: vec![at(0.0), at(10.0)],
        frame_duration: Some(Duration::from_millis(40)),
    }));
    let settings = ImportSettings::default();
    let models = CharacterImporter::new(&wld, &settings).import_all();
    let skeleton = models["ORC"].skeleton().unwrap();

    let attack = skeleton.animation("C02").unwrap();
    assert_eq!(attack.frame_duration(), Duration::from_millis(40));
    assert_eq!(attack.duration(), Duration::from_millis(80));
    assert_eq!(skeleton.animation("L01").unwrap().frame_duration(), Duration::from_millis(100));

    // 20 ms is half a frame at 40 ms per frame.
    let bones = skeleton.transformations_at_time("C02", Duration::from_millis(20)).unwrap();
    assert!((bones[1].location.z - 5.0).abs() < 1e-5);
}

#[test]
fn retarget_onto_another_skeleton() {
    let (wld, _) = orc();
    let settings = ImportSettings::default();
    let models = CharacterImporter::new(&wld, &settings).import_all();
    let donor = models["ORC"].skeleton().unwrap();

    let mut elf = donor.clone();
    assert!(elf.animation("L01").is_some());

    // A fresh track replaces the head's animation on the copy only.
    let track = Track::new("L01ELFHE_TRACK", "HE", vec![at(9.0)]);
    assert!(elf.replace_track("L01", Arc::new(track)));
    assert_eq!(elf.transformations_at_frame("L01", 0.0).unwrap()[1].location.z, 9.0);
    assert_eq!(donor.transformations_at_frame("L01", 0.0).unwrap()[1].location.z, 2.0);

    assert!(elf.copy_from(donor, "L01"));
    assert!(!elf.copy_from(donor, "C05"));
    assert_eq!(elf.transformations_at_frame("L01", 0.0).unwrap()[1].location.z, 2.0);
}

#[test]
fn gpu_bone_upload() {
    let bones = [
        BoneTransform::new(quat_from_axis_angle(Vec3::z(), std::f32::consts::FRAC_PI_2), Vec3::new(1.0, 0.0, 0.0)),
        BoneTransform::IDENTITY,
    ];
    let packed = pack_dual_quaternions(&bones);
    assert_eq!(packed.len(), 2);

    let caps = BackendCaps::default().with_max_uniform_bones(1);
    assert!(SkinningMode::HardwareUniform.check(bones.len(), &caps).is_err());
    assert!(SkinningMode::HardwareTexture.check(bones.len(), &caps).is_ok());
}
