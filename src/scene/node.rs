use smallvec::SmallVec;

use crate::animation::NodeAnimation;
use crate::scene::transform::Transform;
use crate::scene::{NodeHandle, SkinKey};

/// What part a node plays in a skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeRole {
    #[default]
    Plain,
    /// A skeleton joint driven by animation and referenced by skin sections.
    Bone,
    /// The ancestor that anchors skeletal coordinate space.
    SkeletonRoot,
}

/// A scene node: hierarchy links, local transform, animation and skinning
/// attachments.
///
/// # Hierarchy
///
/// Nodes form a tree through parent-child relationships:
/// - `parent`: Optional handle to parent node (None for root nodes)
/// - `children`: List of child node handles
///
/// Links are maintained by [`Scene::attach`](crate::scene::Scene::attach) and
/// [`Scene::detach`](crate::scene::Scene::detach), which also invalidate the
/// affected world matrices.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: String,

    // === Core Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) role: NodeRole,

    // === Core Spatial Data ===
    pub(crate) transform: Transform,

    // === Attachments ===
    pub(crate) animation: NodeAnimation,
    /// Skinned mesh rendered by this node.
    pub(crate) skin: Option<SkinKey>,
    /// Skinned meshes with a section bound to this node as a bone.
    pub(crate) skin_listeners: SmallVec<[SkinKey; 2]>,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> NodeRole {
        self.role
    }

    #[inline]
    #[must_use]
    pub fn is_bone(&self) -> bool {
        self.role == NodeRole::Bone
    }

    #[inline]
    #[must_use]
    pub fn is_skeleton_root(&self) -> bool {
        self.role == NodeRole::SkeletonRoot
    }

    /// Local transform. The pose reflects the last blend; call
    /// [`Scene::pose`](crate::scene::Scene::pose) to apply pending animation first.
    #[inline]
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    #[inline]
    #[must_use]
    pub fn animation(&self) -> &NodeAnimation {
        &self.animation
    }

    #[inline]
    #[must_use]
    pub fn skin(&self) -> Option<SkinKey> {
        self.skin
    }

    #[inline]
    #[must_use]
    pub fn skin_listeners(&self) -> &[SkinKey] {
        &self.skin_listeners
    }
}
