use glam::{Affine3A, Mat4, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::errors::{Result, SinewError};
use crate::math::{self, MatrixCache};
use crate::scene::transform_system;
use crate::scene::{Node, NodeHandle};
use crate::settings::SkinningSettings;
use crate::skinning::faces::{DeformedFaceCache, Face};
use crate::skinning::geometry::SkinGeometry;
use crate::skinning::section::{MatrixSpace, SkeletalFrame, SkinSection};

/// Borrowed view of everything needed to deform vertices of one mesh.
pub(crate) struct Deformer<'a> {
    pub geometry: &'a SkinGeometry,
    pub sections: &'a [SkinSection],
    pub nodes: &'a mut SlotMap<NodeHandle, Node>,
    pub frame: SkeletalFrame,
}

impl Deformer<'_> {
    /// Deforms `vertex` through the section covering it. Vertices outside
    /// every section keep their bind-pose location.
    pub fn deformed_vertex_location_at(&mut self, vertex: usize) -> Vec3 {
        let sections = self.sections;
        match sections.iter().find(|s| s.contains_vertex_index(vertex)) {
            Some(section) => {
                section.deformed_vertex_location_at(vertex, self.geometry, self.nodes, &self.frame)
            }
            None => self.geometry.vertex_location_at(vertex),
        }
    }
}

/// A mesh whose vertices are deformed by bones, split into sections that
/// each bind their own bone palette.
///
/// The mesh caches its skeletal transform (mesh relative to skeleton root),
/// the inverse of it, and optionally the deformed vertex locations used by
/// face queries. All three are invalidated through the scene when the mesh
/// node or any of its bones move.
#[derive(Debug, Clone)]
pub struct SkinnedMesh {
    pub name: String,
    node: Option<NodeHandle>,
    geometry: SkinGeometry,
    sections: Vec<SkinSection>,

    skeleton_root: Option<NodeHandle>,
    skeletal: MatrixCache,
    skeletal_inverse: MatrixCache,
    faces: DeformedFaceCache,
}

impl SkinnedMesh {
    #[must_use]
    pub fn new(name: &str, geometry: SkinGeometry) -> Self {
        Self {
            name: name.to_string(),
            node: None,
            geometry,
            sections: Vec::new(),
            skeleton_root: None,
            skeletal: MatrixCache::new(),
            skeletal_inverse: MatrixCache::new(),
            faces: DeformedFaceCache::default(),
        }
    }

    #[must_use]
    pub fn with_section(mut self, section: SkinSection) -> Self {
        self.add_section(section);
        self
    }

    /// Adds a section before the mesh enters a scene. Once added, use
    /// [`Scene::add_skin_section`](crate::scene::Scene::add_skin_section) so
    /// the new bones are tracked.
    pub fn add_section(&mut self, section: SkinSection) {
        self.sections.push(section);
        self.faces.mark_dirty();
    }

    /// Adds a section only if the mesh still validates with it.
    pub(crate) fn try_add_section(
        &mut self,
        section: SkinSection,
        settings: &SkinningSettings,
    ) -> Result<()> {
        self.sections.push(section);
        if let Err(err) = self.validate(settings) {
            self.sections.pop();
            return Err(err);
        }
        self.faces.mark_dirty();
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Node rendering this mesh, once it is in a scene.
    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeHandle> {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &SkinGeometry {
        &self.geometry
    }

    #[inline]
    #[must_use]
    pub fn sections(&self) -> &[SkinSection] {
        &self.sections
    }

    #[must_use]
    pub fn section_for_vertex_index(&self, vertex: usize) -> Option<&SkinSection> {
        self.sections.iter().find(|s| s.contains_vertex_index(vertex))
    }

    /// Section covering the first vertex of `face`.
    #[must_use]
    pub fn section_for_face_index(&self, face: usize) -> Option<&SkinSection> {
        if face >= self.geometry.face_count() {
            return None;
        }
        self.section_for_vertex_index(self.geometry.face_indices_at(face)[0])
    }

    #[must_use]
    pub fn has_skeleton(&self) -> bool {
        self.sections.iter().any(SkinSection::has_skeleton)
    }

    /// Skeleton root resolved at the last skeletal-frame rebuild.
    #[inline]
    #[must_use]
    pub fn skeleton_root(&self) -> Option<NodeHandle> {
        self.skeleton_root
    }

    #[inline]
    #[must_use]
    pub fn faces(&self) -> &DeformedFaceCache {
        &self.faces
    }

    pub fn set_should_cache_faces(&mut self, should_cache: bool) {
        self.faces.set_should_cache_faces(should_cache);
    }

    /// Replaces the face cache, returning the previous one. The incoming
    /// cache keeps its buffer but is repopulated for this mesh on next read.
    pub fn replace_face_cache(&mut self, mut faces: DeformedFaceCache) -> DeformedFaceCache {
        faces.mark_dirty();
        std::mem::replace(&mut self.faces, faces)
    }

    /// Distinct bones across all sections, in first-seen order.
    #[must_use]
    pub fn bone_handles(&self) -> Vec<NodeHandle> {
        let mut seen = FxHashSet::default();
        self.sections
            .iter()
            .flat_map(SkinSection::bones)
            .map(|b| b.bone)
            .filter(|&bone| seen.insert(bone))
            .collect()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Checks the mesh against load-time limits.
    ///
    /// The per-vertex deformation path trusts these checks and does not
    /// repeat them.
    pub fn validate(&self, settings: &SkinningSettings) -> Result<()> {
        let influences = self.geometry.influences_per_vertex();
        if influences > settings.max_influences_per_vertex {
            return Err(SinewError::TooManyInfluences {
                count: influences,
                max: settings.max_influences_per_vertex,
            });
        }

        let vertex_count = self.geometry.vertex_count();
        if let Some((position, &vertex)) = self
            .geometry
            .indices()
            .and_then(|indices| indices.iter().enumerate().find(|&(_, &v)| v as usize >= vertex_count))
        {
            return Err(SinewError::IndexOutOfBounds {
                position,
                vertex: vertex as usize,
                vertex_count,
            });
        }

        for (index, section) in self.sections.iter().enumerate() {
            if section.vertex_end() > vertex_count {
                return Err(SinewError::VertexRangeOutOfBounds {
                    section: index,
                    start: section.vertex_start(),
                    end: section.vertex_end(),
                    vertex_count,
                });
            }

            let bone_count = section.declared_bone_count();
            if bone_count > settings.max_bones_per_section {
                return Err(SinewError::TooManyBones {
                    section: index,
                    count: bone_count,
                    max: settings.max_bones_per_section,
                });
            }

            for vertex in section.vertex_start()..section.vertex_end() {
                for (bone, weight) in self.geometry.influences(vertex) {
                    if weight != 0.0 && bone >= bone_count {
                        return Err(SinewError::VertexBoneOutOfRange {
                            vertex,
                            bone,
                            bone_count,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Scene hooks
    // ========================================================================

    pub(crate) fn attach_to(&mut self, node: NodeHandle) {
        self.node = Some(node);
        self.faces.mark_dirty();
        self.mark_skeletal_dirty();
    }

    /// The mesh node moved: skeletal matrices and deformed faces are stale.
    pub(crate) fn mark_skeletal_dirty(&mut self) {
        self.skeletal.mark_dirty();
        self.skeletal_inverse.mark_dirty();
        self.faces.mark_dirty();
    }

    /// A bone bound to one of the sections moved.
    pub(crate) fn bone_was_transformed(&mut self, bone: NodeHandle) {
        log::trace!("Skin '{}' notified of bone {bone:?} movement", self.name);
        self.faces.mark_dirty();
    }

    pub(crate) fn link_bones(&mut self, node_table: &[NodeHandle]) -> Result<usize> {
        // Validate every section first so a failure leaves the mesh untouched.
        for section in &self.sections {
            if let Some(&index) = section
                .pending_bone_node_indices()
                .iter()
                .find(|&&index| index >= node_table.len())
            {
                return Err(SinewError::BoneIndexOutOfRange {
                    index,
                    len: node_table.len(),
                });
            }
        }

        let mut linked = 0;
        for section in &mut self.sections {
            linked += section.link_bone_nodes(node_table)?;
        }
        self.faces.mark_dirty();
        Ok(linked)
    }

    /// Rebinds every bone to the node of the same name in `bones_by_name`.
    pub(crate) fn reattach_bones(
        &mut self,
        nodes: &SlotMap<NodeHandle, Node>,
        bones_by_name: &FxHashMap<&str, NodeHandle>,
    ) -> Result<()> {
        let mut replacements = Vec::new();
        for (section_index, section) in self.sections.iter().enumerate() {
            for (bone_index, bone) in section.bones().iter().enumerate() {
                let name = nodes
                    .get(bone.bone)
                    .map(|node| node.name.as_str())
                    .ok_or(SinewError::NodeNotFound)?;
                let replacement = bones_by_name
                    .get(name)
                    .copied()
                    .ok_or_else(|| SinewError::BoneNotFound(name.to_string()))?;
                replacements.push((section_index, bone_index, replacement));
            }
        }

        for (section_index, bone_index, replacement) in replacements {
            self.sections[section_index].bones_mut()[bone_index].bone = replacement;
        }
        self.faces.mark_dirty();
        Ok(())
    }

    // ========================================================================
    // Skeletal frame
    // ========================================================================

    /// Samples the mesh and skeleton-root matrices, rebuilding the cached
    /// skeletal transform and its inverse if stale.
    pub(crate) fn skeletal_frame(&mut self, nodes: &mut SlotMap<NodeHandle, Node>) -> SkeletalFrame {
        let mesh_world = self
            .node
            .map_or(Affine3A::IDENTITY, |h| transform_system::world_matrix(nodes, h));

        if self.skeletal.is_dirty() {
            self.skeleton_root = self
                .node
                .and_then(|h| transform_system::find_skeleton_root(nodes, h));
        }
        let root_inverse = self.skeleton_root.map_or(Affine3A::IDENTITY, |root| {
            transform_system::world_matrix_inverse(nodes, root)
        });

        let to_skeleton = self.skeletal.get_or_rebuild(|| root_inverse * mesh_world);
        let from_skeleton = self
            .skeletal_inverse
            .get_or_rebuild(|| math::invert(&to_skeleton));

        SkeletalFrame {
            mesh_world,
            root_inverse,
            to_skeleton,
            from_skeleton,
        }
    }

    pub(crate) fn skeletal_transform_matrix(
        &mut self,
        nodes: &mut SlotMap<NodeHandle, Node>,
    ) -> Affine3A {
        self.skeletal_frame(nodes).to_skeleton
    }

    pub(crate) fn skeletal_transform_matrix_inverted(
        &mut self,
        nodes: &mut SlotMap<NodeHandle, Node>,
    ) -> Affine3A {
        self.skeletal_frame(nodes).from_skeleton
    }

    // ========================================================================
    // Deformation
    // ========================================================================

    pub(crate) fn transform_matrix_for_bone_at(
        &mut self,
        nodes: &mut SlotMap<NodeHandle, Node>,
        section: usize,
        bone: usize,
    ) -> Option<Affine3A> {
        if self.sections.get(section)?.bone_at(bone).is_none() {
            return None;
        }
        let frame = self.skeletal_frame(nodes);
        Some(self.sections[section].transform_matrix_for_bone_at(bone, nodes, &frame))
    }

    fn deformer<'a>(
        &'a mut self,
        nodes: &'a mut SlotMap<NodeHandle, Node>,
    ) -> (&'a mut DeformedFaceCache, Deformer<'a>) {
        let frame = self.skeletal_frame(nodes);
        let Self {
            faces,
            sections,
            geometry,
            ..
        } = self;
        (
            faces,
            Deformer {
                geometry: &*geometry,
                sections: sections.as_slice(),
                nodes,
                frame,
            },
        )
    }

    pub(crate) fn deformed_vertex_location_at(
        &mut self,
        nodes: &mut SlotMap<NodeHandle, Node>,
        vertex: usize,
    ) -> Vec3 {
        let (faces, mut deformer) = self.deformer(nodes);
        faces.deformed_vertex_location_at(vertex, &mut deformer)
    }

    pub(crate) fn face_at(&mut self, nodes: &mut SlotMap<NodeHandle, Node>, face: usize) -> Face {
        let (faces, mut deformer) = self.deformer(nodes);
        faces.face_at(face, &mut deformer)
    }

    pub(crate) fn deformed_vertex_locations<'a>(
        &'a mut self,
        nodes: &'a mut SlotMap<NodeHandle, Node>,
    ) -> Option<&'a [Vec3]> {
        let (faces, mut deformer) = self.deformer(nodes);
        faces.deformed_vertex_locations(&mut deformer)
    }

    /// `true` when the mesh has bones and every one of them is rigid.
    pub(crate) fn has_rigid_skeleton(&mut self, nodes: &mut SlotMap<NodeHandle, Node>) -> bool {
        let frame = self.skeletal_frame(nodes);
        self.has_skeleton()
            && self
                .sections
                .iter()
                .filter(|s| s.has_skeleton())
                .all(|s| s.has_rigid_skeleton(nodes, &frame))
    }

    pub(crate) fn bind_rest_pose(&mut self, nodes: &mut SlotMap<NodeHandle, Node>) {
        let frame = self.skeletal_frame(nodes);
        for section in &mut self.sections {
            section.bind_rest_pose(nodes, &frame);
        }
        self.faces.mark_dirty();
    }

    pub(crate) fn bone_matrices(
        &mut self,
        nodes: &mut SlotMap<NodeHandle, Node>,
        section: usize,
        space: MatrixSpace,
        max_bones: usize,
    ) -> Option<Vec<Mat4>> {
        self.sections.get(section)?;
        let frame = self.skeletal_frame(nodes);
        Some(self.sections[section].bone_matrices(nodes, &frame, space, max_bones))
    }
}
