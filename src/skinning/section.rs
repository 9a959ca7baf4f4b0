use glam::{Affine3A, Mat4, Vec3};
use slotmap::SlotMap;

use crate::errors::{Result, SinewError};
use crate::math;
use crate::scene::transform_system;
use crate::scene::{Node, NodeHandle};
use crate::skinning::geometry::SkinGeometry;

/// Matrices that place a skinned mesh relative to its skeleton root,
/// sampled once per query.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SkeletalFrame {
    /// World matrix of the mesh node.
    pub mesh_world: Affine3A,
    /// Inverse world matrix of the skeleton root (identity without one).
    pub root_inverse: Affine3A,
    /// Mesh-to-skeleton matrix `S`.
    pub to_skeleton: Affine3A,
    /// Skeleton-to-mesh matrix `S⁻¹`.
    pub from_skeleton: Affine3A,
}

impl SkeletalFrame {
    /// Transform of `bone` relative to the skeleton root.
    pub(crate) fn bone_skeletal(
        &self,
        nodes: &mut SlotMap<NodeHandle, Node>,
        bone: NodeHandle,
    ) -> Affine3A {
        self.root_inverse * transform_system::world_matrix(nodes, bone)
    }
}

/// Coordinate space of bone matrices handed to a vertex shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatrixSpace {
    /// Mesh-local: vertices stay in the mesh's model space.
    MeshLocal,
    /// World space.
    Global,
    /// Eye space, given the camera's view matrix.
    Eye(Affine3A),
}

/// A bone bound to a skin section, with the inverse of its skeletal
/// transform at bind time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinnedBone {
    pub bone: NodeHandle,
    pub rest_pose_inverse: Affine3A,
}

/// A contiguous vertex range of a skinned mesh and the bones that deform it.
///
/// Vertex influences index into this section's bone list.
#[derive(Debug, Clone, Default)]
pub struct SkinSection {
    vertex_start: usize,
    vertex_count: usize,
    bones: Vec<SkinnedBone>,
    /// Node-table indices awaiting [`link_bone_nodes`](Self::link_bone_nodes).
    pending_bone_nodes: Vec<usize>,
}

impl SkinSection {
    #[must_use]
    pub fn new(vertex_start: usize, vertex_count: usize) -> Self {
        Self {
            vertex_start,
            vertex_count,
            ..Self::default()
        }
    }

    /// Records the loader's node indices for each bone, resolved later by
    /// [`link_bone_nodes`](Self::link_bone_nodes).
    #[must_use]
    pub fn with_bone_node_indices(mut self, indices: Vec<usize>) -> Self {
        self.pending_bone_nodes = indices;
        self
    }

    #[must_use]
    pub fn with_bone(mut self, bone: NodeHandle) -> Self {
        self.add_bone(bone);
        self
    }

    /// Appends a bone with an identity rest pose.
    pub fn add_bone(&mut self, bone: NodeHandle) {
        self.add_bone_with_rest_pose_inverse(bone, Affine3A::IDENTITY);
    }

    pub fn add_bone_with_rest_pose_inverse(&mut self, bone: NodeHandle, rest_pose_inverse: Affine3A) {
        self.bones.push(SkinnedBone {
            bone,
            rest_pose_inverse,
        });
    }

    pub fn set_rest_pose_inverse(&mut self, bone_index: usize, rest_pose_inverse: Affine3A) {
        if let Some(bone) = self.bones.get_mut(bone_index) {
            bone.rest_pose_inverse = rest_pose_inverse;
        }
    }

    // ========================================================================
    // Vertex range & bones
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn vertex_start(&self) -> usize {
        self.vertex_start
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn vertex_end(&self) -> usize {
        self.vertex_start + self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn contains_vertex_index(&self, vertex: usize) -> bool {
        vertex >= self.vertex_start && vertex < self.vertex_end()
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn has_skeleton(&self) -> bool {
        !self.bones.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[SkinnedBone] {
        &self.bones
    }

    #[must_use]
    pub fn bone_at(&self, bone_index: usize) -> Option<NodeHandle> {
        self.bones.get(bone_index).map(|b| b.bone)
    }

    #[inline]
    #[must_use]
    pub fn pending_bone_node_indices(&self) -> &[usize] {
        &self.pending_bone_nodes
    }

    /// `false` while node-table indices await the linking pass.
    #[inline]
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.pending_bone_nodes.is_empty()
    }

    /// Bones counted against palette limits, linked or not.
    pub(crate) fn declared_bone_count(&self) -> usize {
        self.bones.len() + self.pending_bone_nodes.len()
    }

    /// Resolves pending node-table indices into bones.
    ///
    /// Nothing changes if any index is out of range.
    pub fn link_bone_nodes(&mut self, node_table: &[NodeHandle]) -> Result<usize> {
        let handles = self
            .pending_bone_nodes
            .iter()
            .map(|&index| {
                node_table
                    .get(index)
                    .copied()
                    .ok_or(SinewError::BoneIndexOutOfRange {
                        index,
                        len: node_table.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let linked = handles.len();
        for bone in handles {
            self.add_bone(bone);
        }
        self.pending_bone_nodes.clear();
        Ok(linked)
    }

    pub(crate) fn bones_mut(&mut self) -> &mut [SkinnedBone] {
        &mut self.bones
    }

    // ========================================================================
    // Deformation
    // ========================================================================

    /// Matrix taking a bind-pose vertex of the mesh to its deformed position
    /// under bone `bone_index`, in mesh-local space:
    /// `S⁻¹ · boneSkeletal · restPoseInverse · S`.
    pub(crate) fn transform_matrix_for_bone_at(
        &self,
        bone_index: usize,
        nodes: &mut SlotMap<NodeHandle, Node>,
        frame: &SkeletalFrame,
    ) -> Affine3A {
        let bone = &self.bones[bone_index];
        let bone_skeletal = frame.bone_skeletal(nodes, bone.bone);
        frame.from_skeleton * bone_skeletal * bone.rest_pose_inverse * frame.to_skeleton
    }

    /// Weighted sum of the bone-transformed bind location of `vertex`.
    ///
    /// An unlinked section leaves its vertices at their bind locations.
    pub(crate) fn deformed_vertex_location_at(
        &self,
        vertex: usize,
        geometry: &SkinGeometry,
        nodes: &mut SlotMap<NodeHandle, Node>,
        frame: &SkeletalFrame,
    ) -> Vec3 {
        let rest = geometry.vertex_location_at(vertex);
        if !self.is_linked() {
            return rest;
        }
        let mut deformed = Vec3::ZERO;
        for (bone_index, weight) in geometry.influences(vertex) {
            if weight == 0.0 {
                continue;
            }
            let m = self.transform_matrix_for_bone_at(bone_index, nodes, frame);
            deformed += m.transform_point3(rest) * weight;
        }
        deformed
    }

    /// `true` when every bone's skeletal transform is rigid. A section
    /// without bones is not rigid.
    pub(crate) fn has_rigid_skeleton(
        &self,
        nodes: &mut SlotMap<NodeHandle, Node>,
        frame: &SkeletalFrame,
    ) -> bool {
        self.has_skeleton()
            && self
                .bones
                .iter()
                .all(|b| math::is_rigid(&frame.bone_skeletal(nodes, b.bone)))
    }

    /// Captures the current skeletal pose of every bone as the rest pose.
    pub(crate) fn bind_rest_pose(
        &mut self,
        nodes: &mut SlotMap<NodeHandle, Node>,
        frame: &SkeletalFrame,
    ) {
        for bone in &mut self.bones {
            bone.rest_pose_inverse = math::invert(&frame.bone_skeletal(nodes, bone.bone));
        }
    }

    /// Bone matrices ready for upload, at most `max_bones` of them.
    pub(crate) fn bone_matrices(
        &self,
        nodes: &mut SlotMap<NodeHandle, Node>,
        frame: &SkeletalFrame,
        space: MatrixSpace,
        max_bones: usize,
    ) -> Vec<Mat4> {
        let to_space = match space {
            MatrixSpace::MeshLocal => Affine3A::IDENTITY,
            MatrixSpace::Global => frame.mesh_world,
            MatrixSpace::Eye(view) => view * frame.mesh_world,
        };
        (0..self.bones.len().min(max_bones))
            .map(|i| Mat4::from(to_space * self.transform_matrix_for_bone_at(i, nodes, frame)))
            .collect()
    }
}
