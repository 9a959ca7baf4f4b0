//! Scene-level skinning API.
//!
//! Skinned meshes live in the scene so that their caches can be invalidated
//! from the transform hierarchy: the mesh node dirties the skeletal caches,
//! and every bone dirties the deformed-face cache of the meshes it deforms.

use glam::{Affine3A, Mat4, Vec3};
use rustc_hash::FxHashMap;

use crate::errors::{Result, SinewError};
use crate::scene::node::NodeRole;
use crate::scene::scene::Scene;
use crate::scene::transform_system;
use crate::scene::{NodeHandle, SkinKey};
use crate::skinning::{DeformedFaceCache, Face, MatrixSpace, SkinSection, SkinnedMesh};

impl Scene {
    // ========================================================================
    // Registration
    // ========================================================================

    /// Validates `mesh` and attaches it to `node`.
    ///
    /// A node renders at most one skinned mesh; an existing one is removed.
    pub fn add_skinned_mesh(&mut self, node: NodeHandle, mut mesh: SkinnedMesh) -> Result<SkinKey> {
        if !self.nodes.contains_key(node) {
            return Err(SinewError::NodeNotFound);
        }
        mesh.validate(self.settings())?;

        if let Some(previous) = self.nodes.get(node).and_then(|n| n.skin) {
            self.remove_skinned_mesh(previous);
        }

        mesh.set_should_cache_faces(self.settings().cache_deformed_faces);
        mesh.attach_to(node);
        let name = mesh.name.clone();
        let key = self.skins.insert(mesh);

        if let Some(n) = self.nodes.get_mut(node) {
            n.skin = Some(key);
        }
        self.register_skin_listeners(key);

        log::debug!("Added skinned mesh '{name}' to node {node:?}");
        Ok(key)
    }

    /// Detaches and returns a skinned mesh.
    pub fn remove_skinned_mesh(&mut self, key: SkinKey) -> Option<SkinnedMesh> {
        self.unregister_skin_listeners(key);
        let mesh = self.skins.remove(key)?;
        if let Some(node) = mesh.node().and_then(|h| self.nodes.get_mut(h))
            && node.skin == Some(key)
        {
            node.skin = None;
        }
        Some(mesh)
    }

    #[must_use]
    pub fn skinned_mesh(&self, key: SkinKey) -> Option<&SkinnedMesh> {
        self.skins.get(key)
    }

    pub fn skinned_meshes(&self) -> impl Iterator<Item = (SkinKey, &SkinnedMesh)> {
        self.skins.iter()
    }

    /// Adds a section to a mesh already in the scene and tracks its bones.
    pub fn add_skin_section(&mut self, key: SkinKey, section: SkinSection) -> Result<()> {
        let settings = *self.settings();
        let skin = self.skins.get_mut(key).ok_or(SinewError::SkinNotFound)?;
        if let Err(err) = skin.try_add_section(section, &settings) {
            log::warn!("Skin section rejected by '{}': {err}", skin.name);
            return Err(err);
        }
        self.register_skin_listeners(key);
        Ok(())
    }

    fn register_skin_listeners(&mut self, key: SkinKey) {
        let Some(skin) = self.skins.get(key) else {
            return;
        };
        for bone in skin.bone_handles() {
            if let Some(node) = self.nodes.get_mut(bone) {
                if !node.skin_listeners.contains(&key) {
                    node.skin_listeners.push(key);
                }
                if node.role == NodeRole::Plain {
                    node.role = NodeRole::Bone;
                }
            }
        }
    }

    fn unregister_skin_listeners(&mut self, key: SkinKey) {
        let Some(skin) = self.skins.get(key) else {
            return;
        };
        for bone in skin.bone_handles() {
            if let Some(node) = self.nodes.get_mut(bone) {
                node.skin_listeners.retain(|k| *k != key);
            }
        }
    }

    // ========================================================================
    // Bone linking
    // ========================================================================

    /// Resolves the loader's bone node indices of every section through
    /// `node_table`, the scene handles in the loader's node order.
    pub fn link_skin_bones(&mut self, key: SkinKey, node_table: &[NodeHandle]) -> Result<()> {
        let skin = self.skins.get_mut(key).ok_or(SinewError::SkinNotFound)?;
        let linked = skin.link_bones(node_table)?;
        log::debug!("Linked {linked} bones of skinned mesh '{}'", skin.name);
        self.register_skin_listeners(key);
        Ok(())
    }

    /// Rebinds every bone of the mesh to the same-named node below `root`.
    ///
    /// Lets a mesh follow a copy of the skeleton it was authored against.
    /// Fails without changes if any bone has no same-named counterpart.
    pub fn reattach_bones_from(&mut self, key: SkinKey, root: NodeHandle) -> Result<()> {
        if !self.nodes.contains_key(root) {
            return Err(SinewError::NodeNotFound);
        }

        let skin = self.skins.get(key).ok_or(SinewError::SkinNotFound)?;
        log::debug!("Reattaching bones of skinned mesh '{}'", skin.name);
        self.unregister_skin_listeners(key);

        let Scene { nodes, skins, .. } = &mut *self;
        let mut bones_by_name: FxHashMap<&str, NodeHandle> = FxHashMap::default();
        for handle in transform_system::collect_subtree(nodes, root) {
            if let Some(node) = nodes.get(handle) {
                bones_by_name.entry(node.name.as_str()).or_insert(handle);
            }
        }
        let result = match skins.get_mut(key) {
            Some(skin) => skin.reattach_bones(nodes, &bones_by_name),
            None => Err(SinewError::SkinNotFound),
        };

        self.register_skin_listeners(key);
        result
    }

    // ========================================================================
    // Rest pose & rigidity
    // ========================================================================

    /// Captures the current pose of every bone as the mesh's rest pose.
    pub fn bind_rest_pose(&mut self, key: SkinKey) -> Result<()> {
        let skin = self.skins.get_mut(key).ok_or(SinewError::SkinNotFound)?;
        skin.bind_rest_pose(&mut self.nodes);
        Ok(())
    }

    /// `true` when the mesh has bones and all of them are rigid relative to
    /// the skeleton root.
    pub fn has_rigid_skeleton(&mut self, key: SkinKey) -> bool {
        self.skins
            .get_mut(key)
            .is_some_and(|skin| skin.has_rigid_skeleton(&mut self.nodes))
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// Mesh transform relative to its skeleton root.
    pub fn skeletal_transform_matrix(&mut self, key: SkinKey) -> Option<Affine3A> {
        let skin = self.skins.get_mut(key)?;
        Some(skin.skeletal_transform_matrix(&mut self.nodes))
    }

    pub fn skeletal_transform_matrix_inverted(&mut self, key: SkinKey) -> Option<Affine3A> {
        let skin = self.skins.get_mut(key)?;
        Some(skin.skeletal_transform_matrix_inverted(&mut self.nodes))
    }

    /// Mesh-local deformation matrix of bone `bone` in section `section`.
    pub fn bone_transform_matrix(
        &mut self,
        key: SkinKey,
        section: usize,
        bone: usize,
    ) -> Option<Affine3A> {
        let skin = self.skins.get_mut(key)?;
        skin.transform_matrix_for_bone_at(&mut self.nodes, section, bone)
    }

    /// Bone palette of one section for GPU skinning, capped at the
    /// configured bones per section.
    pub fn bone_matrices(
        &mut self,
        key: SkinKey,
        section: usize,
        space: MatrixSpace,
    ) -> Option<Vec<Mat4>> {
        let max_bones = self.settings().max_bones_per_section;
        let skin = self.skins.get_mut(key)?;
        skin.bone_matrices(&mut self.nodes, section, space, max_bones)
    }

    // ========================================================================
    // Deformed geometry
    // ========================================================================

    /// Deformed, mesh-local location of `vertex`.
    pub fn deformed_vertex_location_at(&mut self, key: SkinKey, vertex: usize) -> Option<Vec3> {
        let skin = self.skins.get_mut(key)?;
        if vertex >= skin.geometry().vertex_count() {
            return None;
        }
        Some(skin.deformed_vertex_location_at(&mut self.nodes, vertex))
    }

    /// All deformed vertex locations, populating the face cache if stale.
    /// `None` when the mesh does not cache faces.
    pub fn deformed_vertex_locations(&mut self, key: SkinKey) -> Option<&[Vec3]> {
        let skin = self.skins.get_mut(key)?;
        skin.deformed_vertex_locations(&mut self.nodes)
    }

    pub fn deformed_face_at(&mut self, key: SkinKey, face: usize) -> Option<Face> {
        let skin = self.skins.get_mut(key)?;
        if face >= skin.geometry().face_count() {
            return None;
        }
        Some(skin.face_at(&mut self.nodes, face))
    }

    pub fn deformed_face_center_at(&mut self, key: SkinKey, face: usize) -> Option<Vec3> {
        self.deformed_face_at(key, face).map(|f| f.center())
    }

    pub fn deformed_face_normal_at(&mut self, key: SkinKey, face: usize) -> Option<Vec3> {
        self.deformed_face_at(key, face).map(|f| f.normal())
    }

    pub fn set_should_cache_deformed_faces(&mut self, key: SkinKey, should_cache: bool) {
        if let Some(skin) = self.skins.get_mut(key) {
            skin.set_should_cache_faces(should_cache);
        }
    }

    /// Hands the mesh a different face cache, for example one filling a
    /// caller-supplied buffer. Returns the cache it replaced.
    pub fn replace_deformed_face_cache(
        &mut self,
        key: SkinKey,
        faces: DeformedFaceCache,
    ) -> Option<DeformedFaceCache> {
        let skin = self.skins.get_mut(key)?;
        Some(skin.replace_face_cache(faces))
    }

    #[must_use]
    pub fn deformed_faces(&self, key: SkinKey) -> Option<&DeformedFaceCache> {
        self.skins.get(key).map(SkinnedMesh::faces)
    }
}
