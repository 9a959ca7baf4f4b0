//! Scene graph module
//!
//! Manages the node hierarchy and its lazily evaluated transforms:
//! - Node: scene node (hierarchy, pose, animation, skin attachments)
//! - Transform: local pose plus cached local/world matrices
//! - Scene: the container, owning nodes and skinned meshes
//! - TransformSystem: invalidation and on-demand matrix rebuilds

mod animation;
pub mod node;
pub mod scene;
mod skinning;
pub mod transform;
pub mod transform_system;
pub mod wrapper;

pub use node::{Node, NodeRole};
pub use scene::{NodeBuilder, Scene};
pub use transform::Transform;
pub use wrapper::SceneNode;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct SkinKey;
}
