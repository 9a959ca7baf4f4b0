//! Transform System
//!
//! Lazy invalidation and on-demand rebuilding of the matrix hierarchy.
//! Decoupled from `Scene` to avoid borrow conflicts: these functions only
//! borrow the nodes `SlotMap`.
//!
//! # Invariant
//!
//! A node whose world matrix is dirty has only dirty descendants. Invalidation
//! therefore stops at the first node that is already dirty, and a rebuild
//! walks up only until it meets a clean ancestor.

use glam::Affine3A;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::math;
use crate::scene::NodeHandle;
use crate::scene::node::Node;

/// Invalidates the local matrix of `handle` and the world matrices of its
/// subtree.
///
/// `on_invalidated` runs once for every node whose world matrix goes from
/// clean to dirty.
pub fn mark_transform_dirty<F>(
    nodes: &mut SlotMap<NodeHandle, Node>,
    handle: NodeHandle,
    mut on_invalidated: F,
) where
    F: FnMut(NodeHandle, &Node),
{
    if let Some(node) = nodes.get_mut(handle) {
        node.transform.local_matrix.mark_dirty();
    }

    let mut stack: SmallVec<[NodeHandle; 32]> = SmallVec::new();
    stack.push(handle);

    while let Some(current) = stack.pop() {
        let Some(node) = nodes.get_mut(current) else {
            continue;
        };
        if node.transform.world_matrix.is_dirty() {
            continue;
        }

        node.transform.world_matrix.mark_dirty();
        node.transform.world_matrix_inverse.mark_dirty();
        on_invalidated(current, node);

        stack.extend(node.children.iter().copied());
    }
}

/// Applies a pending animation blend to the node's local pose.
///
/// Returns `true` if the blend changed the pose.
pub fn update_from_animation(node: &mut Node) -> bool {
    if !node.animation.is_dirty() {
        return false;
    }

    let blended = node.animation.blend();
    let mut pose = node.transform.pose();
    if let Some(location) = blended.location {
        pose.location = location;
    }
    if let Some(quaternion) = blended.quaternion {
        pose.quaternion = quaternion;
    }
    if let Some(scale) = blended.scale {
        pose.scale = scale;
    }
    node.transform.apply_pose(&pose)
}

/// Returns the world matrix of `handle`, rebuilding stale matrices on the
/// path from the nearest clean ancestor.
///
/// A stale handle yields the identity.
pub fn world_matrix(nodes: &mut SlotMap<NodeHandle, Node>, handle: NodeHandle) -> Affine3A {
    // 1. Collect the dirty chain, bottom-up
    let mut chain: SmallVec<[NodeHandle; 16]> = SmallVec::new();
    let mut cursor = Some(handle);
    while let Some(current) = cursor {
        let Some(node) = nodes.get(current) else {
            break;
        };
        if !node.transform.world_matrix.is_dirty() {
            break;
        }
        chain.push(current);
        cursor = node.parent;
    }

    // 2. Rebuild top-down
    for &current in chain.iter().rev() {
        let parent_world = nodes
            .get(current)
            .and_then(|node| node.parent)
            .and_then(|parent| nodes.get(parent))
            .map_or(Affine3A::IDENTITY, |parent| *parent.transform.world_matrix.value());

        let Some(node) = nodes.get_mut(current) else {
            continue;
        };
        update_from_animation(node);
        let local = node.transform.local_matrix();
        node.transform.world_matrix.set(parent_world * local);
    }

    nodes
        .get(handle)
        .map_or(Affine3A::IDENTITY, |node| *node.transform.world_matrix.value())
}

/// Returns the inverse world matrix of `handle`, rebuilding it if stale.
pub fn world_matrix_inverse(
    nodes: &mut SlotMap<NodeHandle, Node>,
    handle: NodeHandle,
) -> Affine3A {
    let world = world_matrix(nodes, handle);
    let Some(node) = nodes.get_mut(handle) else {
        return Affine3A::IDENTITY;
    };
    node.transform
        .world_matrix_inverse
        .get_or_rebuild(|| math::invert(&world))
}

/// Nearest node at or above `handle` whose role is `SkeletonRoot`.
#[must_use]
pub fn find_skeleton_root(
    nodes: &SlotMap<NodeHandle, Node>,
    handle: NodeHandle,
) -> Option<NodeHandle> {
    let mut cursor = Some(handle);
    while let Some(current) = cursor {
        let node = nodes.get(current)?;
        if node.is_skeleton_root() {
            return Some(current);
        }
        cursor = node.parent;
    }
    None
}

/// Handles of the subtree rooted at `handle`, in depth-first pre-order.
#[must_use]
pub fn collect_subtree(nodes: &SlotMap<NodeHandle, Node>, handle: NodeHandle) -> Vec<NodeHandle> {
    let mut out = Vec::new();
    let mut stack = vec![handle];
    while let Some(current) = stack.pop() {
        let Some(node) = nodes.get(current) else {
            continue;
        };
        out.push(current);
        stack.extend(node.children.iter().rev().copied());
    }
    out
}

/// `true` if `ancestor` is `handle` or lies above it.
#[must_use]
pub fn is_ancestor_or_self(
    nodes: &SlotMap<NodeHandle, Node>,
    ancestor: NodeHandle,
    handle: NodeHandle,
) -> bool {
    let mut cursor = Some(handle);
    while let Some(current) = cursor {
        if current == ancestor {
            return true;
        }
        cursor = nodes.get(current).and_then(|node| node.parent);
    }
    false
}
