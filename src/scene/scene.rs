use glam::{Affine3A, Quat, Vec3};
use slotmap::SlotMap;

use crate::animation::{Pose, PoseChannels, TrackSlotAllocator};
use crate::errors::{Result, SinewError};
use crate::scene::node::{Node, NodeRole};
use crate::scene::transform::Transform;
use crate::scene::transform_system;
use crate::scene::wrapper::SceneNode;
use crate::scene::{NodeHandle, SkinKey};
use crate::settings::SkinningSettings;
use crate::skinning::SkinnedMesh;

/// The scene graph: nodes, skinned meshes and the track-slot allocator
/// shared by every animation loaded into it.
///
/// All pose writes go through the scene so that invalidation reaches every
/// cached matrix that depends on the written node.
pub struct Scene {
    pub(crate) nodes: SlotMap<NodeHandle, Node>,
    pub(crate) root_nodes: Vec<NodeHandle>,

    pub(crate) skins: SlotMap<SkinKey, SkinnedMesh>,

    pub(crate) track_slots: TrackSlotAllocator,
    settings: SkinningSettings,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(SkinningSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: SkinningSettings) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            skins: SlotMap::with_key(),
            track_slots: TrackSlotAllocator::new(),
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &SkinningSettings {
        &self.settings
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub fn build_node(&'_ mut self, name: &str) -> NodeBuilder<'_> {
        NodeBuilder::new(self, name)
    }

    /// Adds a node as a new root.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    pub fn add_to_parent(&mut self, child: Node, parent: NodeHandle) -> NodeHandle {
        let handle = self.add_node(child);
        self.attach(handle, parent);
        handle
    }

    pub fn create_node(&mut self, name: &str) -> NodeHandle {
        self.add_node(Node::new(name))
    }

    pub fn create_bone(&mut self, name: &str, parent: NodeHandle) -> NodeHandle {
        self.add_to_parent(Node::new(name).with_role(NodeRole::Bone), parent)
    }

    pub fn create_skeleton_root(&mut self, name: &str) -> NodeHandle {
        self.add_node(Node::new(name).with_role(NodeRole::SkeletonRoot))
    }

    /// Removes a node and its whole subtree, along with any skinned meshes
    /// rendered by them.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        if !self.nodes.contains_key(handle) {
            return;
        }

        self.unlink_from_parent(handle);

        for current in transform_system::collect_subtree(&self.nodes, handle) {
            if let Some(key) = self.nodes.get(current).and_then(|node| node.skin) {
                self.remove_skinned_mesh(key);
            }
            self.nodes.remove(current);
        }
    }

    /// Re-parents `child` under `parent`.
    ///
    /// Refuses (with a warning) to create a cycle.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            log::error!("Attach failed: node not found");
            return;
        }
        if transform_system::is_ancestor_or_self(&self.nodes, child, parent) {
            log::warn!("Cannot attach a node below itself");
            return;
        }

        // 1. Detach from old
        self.unlink_from_parent(child);

        // 2. Attach to new
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }

        // 3. Update child
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
        self.mark_transform_dirty(child);
    }

    /// Makes `child` a root node.
    pub fn detach(&mut self, child: NodeHandle) {
        if self.nodes.get(child).is_none_or(|node| node.parent.is_none()) {
            return;
        }
        self.unlink_from_parent(child);
        self.root_nodes.push(child);
        self.mark_transform_dirty(child);
    }

    fn unlink_from_parent(&mut self, child: NodeHandle) {
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(n) = self.nodes.get_mut(p)
                && let Some(i) = n.children.iter().position(|&x| x == child)
            {
                n.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == child) {
            self.root_nodes.remove(i);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    /// Chainable pose editing for one node.
    pub fn node(&mut self, handle: NodeHandle) -> SceneNode<'_> {
        SceneNode::new(self, handle)
    }

    #[inline]
    #[must_use]
    pub fn root_nodes(&self) -> &[NodeHandle] {
        &self.root_nodes
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First node named `name` in the subtree of `root`, depth-first.
    #[must_use]
    pub fn find_node_by_name(&self, root: NodeHandle, name: &str) -> Option<NodeHandle> {
        transform_system::collect_subtree(&self.nodes, root)
            .into_iter()
            .find(|&handle| self.nodes.get(handle).is_some_and(|node| node.name == name))
    }

    pub fn set_role(&mut self, handle: NodeHandle, role: NodeRole) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.role = role;
        }
        // Skeletal frames of skins below may now anchor elsewhere.
        self.mark_transform_dirty(handle);
    }

    // ========================================================================
    // Local pose
    // ========================================================================

    pub fn set_pose(&mut self, handle: NodeHandle, pose: &Pose) {
        let changed = self
            .nodes
            .get_mut(handle)
            .is_some_and(|node| node.transform.apply_pose(pose));
        if changed {
            self.mark_transform_dirty(handle);
        }
    }

    pub fn set_position(&mut self, handle: NodeHandle, position: Vec3) {
        if let Some(pose) = self.pose(handle) {
            self.set_pose(handle, &Pose { location: position, ..pose });
        }
    }

    pub fn set_rotation(&mut self, handle: NodeHandle, rotation: Quat) {
        if let Some(pose) = self.pose(handle) {
            self.set_pose(handle, &Pose { quaternion: rotation, ..pose });
        }
    }

    pub fn set_scale(&mut self, handle: NodeHandle, scale: Vec3) {
        if let Some(pose) = self.pose(handle) {
            self.set_pose(handle, &Pose { scale, ..pose });
        }
    }

    /// Decomposes `matrix` into the node's local pose. Shear is lost.
    pub fn apply_local_matrix(&mut self, handle: NodeHandle, matrix: Affine3A) {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        self.set_pose(handle, &Pose::new(translation, rotation, scale));
    }

    /// Local pose with any pending animation blend applied.
    pub fn pose(&mut self, handle: NodeHandle) -> Option<Pose> {
        let node = self.nodes.get_mut(handle)?;
        transform_system::update_from_animation(node);
        Some(node.transform.pose())
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    pub fn local_matrix(&mut self, handle: NodeHandle) -> Option<Affine3A> {
        let node = self.nodes.get_mut(handle)?;
        transform_system::update_from_animation(node);
        Some(node.transform.local_matrix())
    }

    pub fn world_matrix(&mut self, handle: NodeHandle) -> Option<Affine3A> {
        self.nodes
            .contains_key(handle)
            .then(|| transform_system::world_matrix(&mut self.nodes, handle))
    }

    pub fn world_matrix_inverse(&mut self, handle: NodeHandle) -> Option<Affine3A> {
        self.nodes
            .contains_key(handle)
            .then(|| transform_system::world_matrix_inverse(&mut self.nodes, handle))
    }

    #[must_use]
    pub fn is_transform_dirty(&self, handle: NodeHandle) -> bool {
        self.nodes
            .get(handle)
            .is_some_and(|node| node.transform.is_dirty())
    }

    /// Invalidates the world matrices of the subtree rooted at `handle` and
    /// every skinned-mesh cache that depends on them.
    pub fn mark_transform_dirty(&mut self, handle: NodeHandle) {
        let skins = &mut self.skins;
        transform_system::mark_transform_dirty(&mut self.nodes, handle, |current, node| {
            if let Some(key) = node.skin
                && let Some(skin) = skins.get_mut(key)
            {
                skin.mark_skeletal_dirty();
            }
            for &key in &node.skin_listeners {
                if let Some(skin) = skins.get_mut(key) {
                    skin.bone_was_transformed(current);
                }
            }
        });
    }

    // ========================================================================
    // Skeleton
    // ========================================================================

    /// Nearest `SkeletonRoot` at or above `handle`.
    #[must_use]
    pub fn skeleton_root_of(&self, handle: NodeHandle) -> Option<NodeHandle> {
        transform_system::find_skeleton_root(&self.nodes, handle)
    }

    /// Transform of `handle` relative to its skeleton root.
    ///
    /// Equals the world matrix when there is no skeleton root.
    pub fn skeletal_transform(&mut self, handle: NodeHandle) -> Result<Affine3A> {
        if !self.nodes.contains_key(handle) {
            return Err(SinewError::NodeNotFound);
        }
        let world = transform_system::world_matrix(&mut self.nodes, handle);
        let root_inverse = self
            .skeleton_root_of(handle)
            .map_or(Affine3A::IDENTITY, |root| {
                transform_system::world_matrix_inverse(&mut self.nodes, root)
            });
        Ok(root_inverse * world)
    }

    /// Forces unit scale on every bone below `root` and stops animations from
    /// driving bone scale, so every skin section can take the rigid path.
    pub fn ensure_rigid_skeleton(&mut self, root: NodeHandle) {
        let bones: Vec<NodeHandle> = transform_system::collect_subtree(&self.nodes, root)
            .into_iter()
            .filter(|&h| self.nodes.get(h).is_some_and(Node::is_bone))
            .collect();

        for &bone in &bones {
            self.set_channel_animation_enabled(bone, PoseChannels::SCALE, false);
            self.set_scale(bone, Vec3::ONE);
        }
        log::debug!("Forced rigid scale on {} bones", bones.len());
    }
}

/// Fluent construction of a node before it enters the scene.
pub struct NodeBuilder<'a> {
    scene: &'a mut Scene,
    node: Node,
    parent: Option<NodeHandle>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(scene: &'a mut Scene, name: &str) -> Self {
        Self {
            scene,
            node: Node::new(name),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.node.transform.position = Vec3::new(x, y, z);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.node.transform.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, s: f32) -> Self {
        self.node.transform.scale = Vec3::splat(s);
        self
    }

    #[must_use]
    pub fn with_pose(mut self, pose: &Pose) -> Self {
        self.node.transform = Transform::from_pose(pose);
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.node.role = role;
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> NodeHandle {
        match self.parent {
            Some(parent) => self.scene.add_to_parent(self.node, parent),
            None => self.scene.add_node(self.node),
        }
    }
}
