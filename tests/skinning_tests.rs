//! Skinning tests
//!
//! Tests for:
//! - Bind-pose identity and bone-driven deformation
//! - Unnormalized weighted influences
//! - Deformed-face cache invalidation and cached/uncached agreement
//! - Load-time validation and bone linking
//! - Rigidity checks and GPU bone palettes

use glam::{Affine3A, Vec3};
use sinew::skinning::{DeformedFaceCache, MatrixSpace, SkinGeometry, SkinSection, SkinnedMesh};
use sinew::{Node, NodeHandle, NodeRole, Scene, SinewError, SkinKey, SkinningSettings};

// ============================================================================
// Helpers
// ============================================================================

const EPSILON: f32 = 1e-5;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn affine_approx(a: &Affine3A, b: &Affine3A) -> bool {
    a.abs_diff_eq(*b, EPSILON)
}

struct Rig {
    scene: Scene,
    root: NodeHandle,
    bone0: NodeHandle,
    bone1: NodeHandle,
    mesh_node: NodeHandle,
    skin: SkinKey,
}

/// One triangle over a two-bone chain:
///
/// - v0 at the origin, fully on `bone0`
/// - v1 at (0, 1, 0), fully on `bone1` (child of `bone0`)
/// - v2 at (1, 0, 0), half-weighted on `bone0` only
///
/// The mesh node sits off the skeleton root so the mesh-to-skeleton matrix
/// is not the identity.
fn triangle_geometry() -> SkinGeometry {
    SkinGeometry::new(
        vec![Vec3::ZERO, Vec3::Y, Vec3::X],
        2,
    )
    .with_indices(vec![0, 1, 2])
    .with_influences(vec![0, 0, 1, 0, 0, 0], vec![1.0, 0.0, 1.0, 0.0, 0.5, 0.0])
}

fn build_rig(settings: SkinningSettings) -> anyhow::Result<Rig> {
    init_logger();
    let mut scene = Scene::with_settings(settings);
    let root = scene.create_skeleton_root("root");
    let bone0 = scene.create_bone("bone0", root);
    let bone1 = scene.create_bone("bone1", bone0);
    scene.set_position(bone1, Vec3::Y);
    let mesh_node = scene.add_to_parent(Node::new("mesh"), root);
    scene.set_position(mesh_node, Vec3::new(0.0, 0.0, 2.0));

    let section = SkinSection::new(0, 3).with_bone(bone0).with_bone(bone1);
    let mesh = SkinnedMesh::new("triangle", triangle_geometry()).with_section(section);
    let skin = scene.add_skinned_mesh(mesh_node, mesh)?;
    scene.bind_rest_pose(skin)?;

    Ok(Rig {
        scene,
        root,
        bone0,
        bone1,
        mesh_node,
        skin,
    })
}

fn deformed(rig: &mut Rig, vertex: usize) -> Vec3 {
    rig.scene
        .deformed_vertex_location_at(rig.skin, vertex)
        .expect("vertex in range")
}

// ============================================================================
// Deformation
// ============================================================================

#[test]
fn rest_pose_deforms_to_bind_locations() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    assert!(vec3_approx(deformed(&mut rig, 0), Vec3::ZERO));
    assert!(vec3_approx(deformed(&mut rig, 1), Vec3::Y));
    Ok(())
}

#[test]
fn weights_are_not_renormalized() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    // A single half-weight influence contracts the vertex toward the origin.
    assert!(vec3_approx(deformed(&mut rig, 2), Vec3::new(0.5, 0.0, 0.0)));
    Ok(())
}

#[test]
fn moving_a_bone_moves_its_vertices_and_descendants() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    rig.scene.set_position(rig.bone0, Vec3::X);

    assert!(vec3_approx(deformed(&mut rig, 0), Vec3::X));
    // bone1 follows its parent
    assert!(vec3_approx(deformed(&mut rig, 1), Vec3::new(1.0, 1.0, 0.0)));
    // 0.5 * ((1, 0, 0) + (1, 0, 0))
    assert!(vec3_approx(deformed(&mut rig, 2), Vec3::X));
    Ok(())
}

#[test]
fn rotating_a_child_bone_only_moves_its_vertices() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    // Quarter turn about Z at bone1's pivot leaves its own vertex in place
    rig.scene
        .set_rotation(rig.bone1, glam::Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
    assert!(vec3_approx(deformed(&mut rig, 0), Vec3::ZERO));
    assert!(vec3_approx(deformed(&mut rig, 1), Vec3::Y));

    // Moving bone1 translates v1 only
    rig.scene.set_position(rig.bone1, Vec3::new(0.0, 2.0, 0.0));
    assert!(vec3_approx(deformed(&mut rig, 0), Vec3::ZERO));
    assert!(vec3_approx(deformed(&mut rig, 1), Vec3::new(0.0, 2.0, 0.0)));
    Ok(())
}

#[test]
fn moving_the_skeleton_root_does_not_deform() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    rig.scene.set_position(rig.root, Vec3::new(5.0, -3.0, 1.0));
    rig.scene
        .set_rotation(rig.root, glam::Quat::from_rotation_y(0.7));

    assert!(vec3_approx(deformed(&mut rig, 0), Vec3::ZERO));
    assert!(vec3_approx(deformed(&mut rig, 1), Vec3::Y));
    assert!(vec3_approx(deformed(&mut rig, 2), Vec3::new(0.5, 0.0, 0.0)));
    Ok(())
}

#[test]
fn skeletal_transform_places_mesh_relative_to_root() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    rig.scene.set_position(rig.root, Vec3::new(10.0, 0.0, 0.0));

    let skeletal = rig.scene.skeletal_transform_matrix(rig.skin).unwrap();
    assert!(affine_approx(
        &skeletal,
        &Affine3A::from_translation(Vec3::new(0.0, 0.0, 2.0))
    ));
    let inverse = rig.scene.skeletal_transform_matrix_inverted(rig.skin).unwrap();
    assert!(affine_approx(&(skeletal * inverse), &Affine3A::IDENTITY));

    let bone1 = rig.scene.skeletal_transform(rig.bone1)?;
    assert!(affine_approx(&bone1, &Affine3A::from_translation(Vec3::Y)));
    Ok(())
}

#[test]
fn animation_deforms_through_the_skeleton() -> anyhow::Result<()> {
    use sinew::animation::{DenseTrack, KeyframeTrack, TrackSlot};
    use std::sync::Arc;

    let mut rig = build_rig(SkinningSettings::default())?;
    let track = DenseTrack::new(2).with_locations(vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0)]);
    rig.scene
        .set_animation(rig.bone0, Arc::new(KeyframeTrack::from(track)));

    rig.scene
        .establish_animation_frame_at(rig.bone0, 1.0, TrackSlot::DEFAULT);
    assert!(vec3_approx(deformed(&mut rig, 0), Vec3::new(0.0, 0.0, 3.0)));
    Ok(())
}

#[test]
fn deformation_is_stable_without_bone_movement() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    rig.scene.set_rotation(rig.bone0, glam::Quat::from_rotation_y(0.9));

    let first: Vec<Vec3> = (0..3).map(|v| deformed(&mut rig, v)).collect();
    let second: Vec<Vec3> = (0..3).map(|v| deformed(&mut rig, v)).collect();
    assert_eq!(first, second);
    Ok(())
}

// ============================================================================
// Faces & Cache
// ============================================================================

#[test]
fn deformed_face_queries() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    let face = rig.scene.deformed_face_at(rig.skin, 0).unwrap();
    assert!(vec3_approx(face.vertices[2], Vec3::new(0.5, 0.0, 0.0)));

    let center = rig.scene.deformed_face_center_at(rig.skin, 0).unwrap();
    assert!(vec3_approx(center, Vec3::new(0.5 / 3.0, 1.0 / 3.0, 0.0)));

    let normal = rig.scene.deformed_face_normal_at(rig.skin, 0).unwrap();
    assert!(vec3_approx(normal, Vec3::NEG_Z));

    assert!(rig.scene.deformed_face_at(rig.skin, 1).is_none());
    assert!(rig.scene.deformed_vertex_location_at(rig.skin, 3).is_none());
    Ok(())
}

#[test]
fn bone_movement_invalidates_face_cache() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    let locations = rig.scene.deformed_vertex_locations(rig.skin).unwrap().to_vec();
    assert_eq!(locations.len(), 3);
    let faces = rig.scene.deformed_faces(rig.skin).unwrap();
    assert!(faces.is_allocated());
    assert!(!faces.is_dirty());

    rig.scene.set_position(rig.bone1, Vec3::new(0.0, 3.0, 0.0));
    assert!(rig.scene.deformed_faces(rig.skin).unwrap().is_dirty());

    let face = rig.scene.deformed_face_at(rig.skin, 0).unwrap();
    assert!(vec3_approx(face.vertices[1], Vec3::new(0.0, 3.0, 0.0)));
    assert!(!rig.scene.deformed_faces(rig.skin).unwrap().is_dirty());
    Ok(())
}

#[test]
fn mesh_node_movement_invalidates_face_cache() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    let _ = rig.scene.deformed_face_at(rig.skin, 0);
    assert!(!rig.scene.deformed_faces(rig.skin).unwrap().is_dirty());

    rig.scene.set_position(rig.mesh_node, Vec3::ZERO);
    assert!(rig.scene.deformed_faces(rig.skin).unwrap().is_dirty());
    Ok(())
}

#[test]
fn cached_and_uncached_faces_agree() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    rig.scene.set_position(rig.bone0, Vec3::new(0.5, 0.0, -1.0));
    rig.scene
        .set_rotation(rig.bone1, glam::Quat::from_rotation_x(0.3));

    let cached = rig.scene.deformed_face_at(rig.skin, 0).unwrap();

    rig.scene.set_should_cache_deformed_faces(rig.skin, false);
    assert!(!rig.scene.deformed_faces(rig.skin).unwrap().is_allocated());
    assert!(rig.scene.deformed_vertex_locations(rig.skin).is_none());

    let uncached = rig.scene.deformed_face_at(rig.skin, 0).unwrap();
    for (a, b) in cached.vertices.iter().zip(uncached.vertices) {
        assert!(vec3_approx(*a, b));
    }
    Ok(())
}

#[test]
fn settings_control_face_caching_of_new_meshes() -> anyhow::Result<()> {
    let rig = build_rig(SkinningSettings::default().with_cache_deformed_faces(false))?;
    assert!(!rig.scene.deformed_faces(rig.skin).unwrap().should_cache_faces());
    Ok(())
}

#[test]
fn supplied_buffer_matches_internal_cache() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    let mut reference = build_rig(SkinningSettings::default())?;
    for r in [&mut rig, &mut reference] {
        r.scene.set_position(r.bone1, Vec3::new(0.0, 2.0, 1.0));
    }

    let mut faces = DeformedFaceCache::new(true);
    faces.set_deformed_vertex_locations(vec![Vec3::splat(9.0); 3]);
    let previous = rig.scene.replace_deformed_face_cache(rig.skin, faces).unwrap();
    assert!(previous.should_cache_faces());

    let supplied = rig.scene.deformed_face_at(rig.skin, 0).unwrap();
    let internal = reference.scene.deformed_face_at(reference.skin, 0).unwrap();
    for (a, b) in supplied.vertices.iter().zip(internal.vertices) {
        assert!(vec3_approx(*a, b));
    }

    let locations = rig.scene.deformed_vertex_locations(rig.skin).unwrap().to_vec();
    assert_eq!(locations.len(), 3);
    assert!(locations.iter().all(|v| *v != Vec3::splat(9.0)));
    Ok(())
}

#[test]
fn replacing_the_face_cache_forces_repopulation() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    let before = rig.scene.deformed_face_at(rig.skin, 0).unwrap();
    assert!(!rig.scene.deformed_faces(rig.skin).unwrap().is_dirty());

    let previous = rig
        .scene
        .replace_deformed_face_cache(rig.skin, DeformedFaceCache::default())
        .unwrap();
    assert!(previous.is_allocated());
    assert!(rig.scene.deformed_faces(rig.skin).unwrap().is_dirty());

    let after = rig.scene.deformed_face_at(rig.skin, 0).unwrap();
    assert_eq!(after, before);
    assert!(!rig.scene.deformed_faces(rig.skin).unwrap().is_dirty());
    Ok(())
}

#[test]
fn faces_resolve_to_their_section() -> anyhow::Result<()> {
    let rig = build_rig(SkinningSettings::default())?;
    let mesh = rig.scene.skinned_mesh(rig.skin).unwrap();
    assert_eq!(mesh.section_for_face_index(0).map(SkinSection::vertex_start), Some(0));
    assert!(mesh.section_for_face_index(1).is_none());
    Ok(())
}

#[test]
fn unreferenced_vertices_fall_back_to_deformation() -> anyhow::Result<()> {
    init_logger();
    let mut scene = Scene::new();
    let root = scene.create_skeleton_root("root");
    let bone = scene.create_bone("bone", root);
    let mesh_node = scene.add_to_parent(Node::new("mesh"), root);

    // Vertex 3 is skinned but no face references it
    let mut geometry = SkinGeometry::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z], 1)
        .with_indices(vec![0, 1, 2]);
    for vertex in 0..4 {
        geometry.set_influence(vertex, 0, 0, 1.0);
    }
    let mesh = SkinnedMesh::new("loose", geometry).with_section(SkinSection::new(0, 4).with_bone(bone));
    let skin = scene.add_skinned_mesh(mesh_node, mesh)?;
    scene.bind_rest_pose(skin)?;

    scene.set_position(bone, Vec3::X);
    let _ = scene.deformed_face_at(skin, 0);
    let loose = scene.deformed_vertex_location_at(skin, 3).unwrap();
    assert!(vec3_approx(loose, Vec3::new(1.0, 0.0, 1.0)));
    Ok(())
}

// ============================================================================
// Validation & Linking
// ============================================================================

#[test]
fn too_many_bones_is_rejected() {
    init_logger();
    let mut scene = Scene::with_settings(SkinningSettings::default().with_max_bones_per_section(1));
    let root = scene.create_skeleton_root("root");
    let bone0 = scene.create_bone("bone0", root);
    let bone1 = scene.create_bone("bone1", bone0);
    let mesh_node = scene.add_to_parent(Node::new("mesh"), root);

    let section = SkinSection::new(0, 3).with_bone(bone0).with_bone(bone1);
    let mesh = SkinnedMesh::new("triangle", triangle_geometry()).with_section(section);
    let result = scene.add_skinned_mesh(mesh_node, mesh);

    assert!(matches!(
        result,
        Err(SinewError::TooManyBones { count: 2, max: 1, .. })
    ));
    assert!(scene.get_node(mesh_node).unwrap().skin().is_none());
}

#[test]
fn too_many_influences_is_rejected() {
    let mut scene = Scene::new();
    let mesh_node = scene.create_node("mesh");
    let geometry = SkinGeometry::new(vec![Vec3::ZERO; 3], 8);
    let mesh = SkinnedMesh::new("wide", geometry);

    assert!(matches!(
        scene.add_skinned_mesh(mesh_node, mesh),
        Err(SinewError::TooManyInfluences { count: 8, max: 4 })
    ));
}

#[test]
fn section_outside_vertex_range_is_rejected() {
    let mut scene = Scene::new();
    let mesh_node = scene.create_node("mesh");
    let mesh = SkinnedMesh::new("triangle", triangle_geometry()).with_section(SkinSection::new(2, 5));

    assert!(matches!(
        scene.add_skinned_mesh(mesh_node, mesh),
        Err(SinewError::VertexRangeOutOfBounds { vertex_count: 3, .. })
    ));
}

#[test]
fn index_past_last_vertex_is_rejected() {
    let mut scene = Scene::new();
    let mesh_node = scene.create_node("mesh");
    let geometry = SkinGeometry::new(vec![Vec3::ZERO; 3], 1).with_indices(vec![0, 1, 7]);

    assert!(matches!(
        scene.add_skinned_mesh(mesh_node, SkinnedMesh::new("broken", geometry)),
        Err(SinewError::IndexOutOfBounds { position: 2, vertex: 7, vertex_count: 3 })
    ));
}

#[test]
fn influence_beyond_section_palette_is_rejected() {
    let mut scene = Scene::new();
    let root = scene.create_skeleton_root("root");
    let bone0 = scene.create_bone("bone0", root);
    let mesh_node = scene.add_to_parent(Node::new("mesh"), root);

    // v1 references bone 1 but the section only binds one bone
    let mesh = SkinnedMesh::new("triangle", triangle_geometry())
        .with_section(SkinSection::new(0, 3).with_bone(bone0));

    assert!(matches!(
        scene.add_skinned_mesh(mesh_node, mesh),
        Err(SinewError::VertexBoneOutOfRange { vertex: 1, bone: 1, bone_count: 1 })
    ));
}

#[test]
fn rejected_section_leaves_mesh_unchanged() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    let result = rig.scene.add_skin_section(rig.skin, SkinSection::new(1, 10));
    assert!(matches!(result, Err(SinewError::VertexRangeOutOfBounds { .. })));
    assert_eq!(rig.scene.skinned_mesh(rig.skin).unwrap().sections().len(), 1);
    Ok(())
}

#[test]
fn bones_link_through_the_node_table() -> anyhow::Result<()> {
    init_logger();
    let mut scene = Scene::new();
    let root = scene.create_skeleton_root("root");
    let bone0 = scene.add_to_parent(Node::new("bone0"), root);
    let bone1 = scene.add_to_parent(Node::new("bone1"), bone0);
    let mesh_node = scene.add_to_parent(Node::new("mesh"), root);
    let node_table = [root, bone0, bone1, mesh_node];

    let section = SkinSection::new(0, 3).with_bone_node_indices(vec![1, 2]);
    let mesh = SkinnedMesh::new("triangle", triangle_geometry()).with_section(section);
    let skin = scene.add_skinned_mesh(mesh_node, mesh)?;
    scene.link_skin_bones(skin, &node_table)?;

    let mesh = scene.skinned_mesh(skin).unwrap();
    assert_eq!(mesh.sections()[0].bone_at(0), Some(bone0));
    assert_eq!(mesh.sections()[0].bone_at(1), Some(bone1));
    assert!(mesh.sections()[0].pending_bone_node_indices().is_empty());

    // Linked nodes become bones that notify the skin
    let node = scene.get_node(bone1).unwrap();
    assert_eq!(node.role(), NodeRole::Bone);
    assert_eq!(node.skin_listeners(), &[skin]);
    Ok(())
}

#[test]
fn unlinked_sections_keep_bind_locations() -> anyhow::Result<()> {
    init_logger();
    let mut scene = Scene::new();
    let root = scene.create_skeleton_root("root");
    let bone0 = scene.add_to_parent(Node::new("bone0"), root);
    let bone1 = scene.add_to_parent(Node::new("bone1"), bone0);
    let mesh_node = scene.add_to_parent(Node::new("mesh"), root);

    let section = SkinSection::new(0, 3).with_bone_node_indices(vec![1, 2]);
    let mesh = SkinnedMesh::new("triangle", triangle_geometry()).with_section(section);
    let skin = scene.add_skinned_mesh(mesh_node, mesh)?;

    // Queries before the linking pass see the bind pose
    assert_eq!(scene.deformed_vertex_location_at(skin, 1), Some(Vec3::Y));
    assert_eq!(scene.deformed_vertex_locations(skin).map(<[Vec3]>::len), Some(3));
    let face = scene.deformed_face_at(skin, 0).unwrap();
    assert_eq!(face.vertices, [Vec3::ZERO, Vec3::Y, Vec3::X]);

    scene.link_skin_bones(skin, &[root, bone0, bone1, mesh_node])?;
    scene.bind_rest_pose(skin)?;
    scene.set_position(bone0, Vec3::X);
    assert!(vec3_approx(scene.deformed_vertex_location_at(skin, 0).unwrap(), Vec3::X));
    Ok(())
}

#[test]
fn bad_node_table_index_links_nothing() -> anyhow::Result<()> {
    let mut scene = Scene::new();
    let root = scene.create_skeleton_root("root");
    let mesh_node = scene.add_to_parent(Node::new("mesh"), root);

    let section = SkinSection::new(0, 3).with_bone_node_indices(vec![0, 9]);
    let mesh = SkinnedMesh::new("triangle", triangle_geometry()).with_section(section);
    let skin = scene.add_skinned_mesh(mesh_node, mesh)?;

    let result = scene.link_skin_bones(skin, &[root, mesh_node]);
    assert_eq!(result, Err(SinewError::BoneIndexOutOfRange { index: 9, len: 2 }));
    let section = &scene.skinned_mesh(skin).unwrap().sections()[0];
    assert_eq!(section.bone_count(), 0);
    assert_eq!(section.pending_bone_node_indices(), &[0, 9]);
    Ok(())
}

#[test]
fn reattaching_follows_a_skeleton_copy() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    let copy_root = rig.scene.create_skeleton_root("copy");
    let copy_bone0 = rig.scene.create_bone("bone0", copy_root);
    let copy_bone1 = rig.scene.create_bone("bone1", copy_bone0);
    rig.scene.set_position(copy_bone1, Vec3::Y);

    rig.scene.reattach_bones_from(rig.skin, copy_root)?;
    let mesh = rig.scene.skinned_mesh(rig.skin).unwrap();
    assert_eq!(mesh.sections()[0].bone_at(0), Some(copy_bone0));
    assert_eq!(mesh.sections()[0].bone_at(1), Some(copy_bone1));
    assert!(rig.scene.get_node(rig.bone0).unwrap().skin_listeners().is_empty());

    // The copy drives the mesh; the original no longer does.
    let _ = rig.scene.deformed_face_at(rig.skin, 0);
    rig.scene.set_position(copy_bone0, Vec3::X);
    assert!(rig.scene.deformed_faces(rig.skin).unwrap().is_dirty());
    assert!(vec3_approx(deformed(&mut rig, 0), Vec3::X));

    rig.scene.set_position(rig.bone0, Vec3::new(0.0, 0.0, 7.0));
    assert!(vec3_approx(deformed(&mut rig, 0), Vec3::X));
    Ok(())
}

#[test]
fn reattaching_without_matching_names_fails() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    let stranger = rig.scene.create_skeleton_root("stranger");
    rig.scene.create_bone("bone0", stranger);

    let result = rig.scene.reattach_bones_from(rig.skin, stranger);
    assert_eq!(result, Err(SinewError::BoneNotFound("bone1".to_string())));
    let mesh = rig.scene.skinned_mesh(rig.skin).unwrap();
    assert_eq!(mesh.sections()[0].bone_at(0), Some(rig.bone0));
    Ok(())
}

#[test]
fn removing_the_mesh_node_drops_the_skin() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;

    rig.scene.remove_node(rig.mesh_node);
    assert!(rig.scene.skinned_mesh(rig.skin).is_none());
    assert!(rig.scene.get_node(rig.bone0).unwrap().skin_listeners().is_empty());
    assert!(rig.scene.deformed_face_at(rig.skin, 0).is_none());
    Ok(())
}

// ============================================================================
// Rigidity & Palettes
// ============================================================================

#[test]
fn rigidity_tracks_bone_scale() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    assert!(rig.scene.has_rigid_skeleton(rig.skin));

    rig.scene.set_scale(rig.bone0, Vec3::new(1.0, 2.0, 1.0));
    assert!(!rig.scene.has_rigid_skeleton(rig.skin));

    rig.scene.ensure_rigid_skeleton(rig.root);
    assert!(rig.scene.has_rigid_skeleton(rig.skin));
    Ok(())
}

#[test]
fn mesh_without_bones_is_not_rigid() -> anyhow::Result<()> {
    let mut scene = Scene::new();
    let mesh_node = scene.create_node("mesh");
    let mesh = SkinnedMesh::new("bare", triangle_geometry().with_influences(vec![0; 6], vec![0.0; 6]));
    let skin = scene.add_skinned_mesh(mesh_node, mesh)?;

    assert!(!scene.has_rigid_skeleton(skin));
    Ok(())
}

#[test]
fn bone_palette_matches_per_bone_matrices() -> anyhow::Result<()> {
    let mut rig = build_rig(SkinningSettings::default())?;
    rig.scene.set_position(rig.bone0, Vec3::new(0.0, 1.0, 0.0));

    let palette = rig
        .scene
        .bone_matrices(rig.skin, 0, MatrixSpace::MeshLocal)
        .unwrap();
    assert_eq!(palette.len(), 2);
    for (index, matrix) in palette.iter().enumerate() {
        let expected = rig.scene.bone_transform_matrix(rig.skin, 0, index).unwrap();
        assert!(matrix.abs_diff_eq(glam::Mat4::from(expected), EPSILON));
    }

    let global = rig
        .scene
        .bone_matrices(rig.skin, 0, MatrixSpace::Global)
        .unwrap();
    let mesh_world = rig.scene.world_matrix(rig.mesh_node).unwrap();
    assert!(global[0].abs_diff_eq(glam::Mat4::from(mesh_world) * palette[0], EPSILON));

    assert!(rig.scene.bone_matrices(rig.skin, 1, MatrixSpace::MeshLocal).is_none());
    assert!(rig.scene.bone_transform_matrix(rig.skin, 0, 2).is_none());
    Ok(())
}
