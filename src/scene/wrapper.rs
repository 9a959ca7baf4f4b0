//! Chainable node operation wrapper.
//!
//! [`SceneNode`] borrows a [`Scene`] mutably and provides a fluent API
//! for posing nodes and steering their animations.
//!
//! All methods silently no-op when the handle is stale, so users never
//! encounter panics from dangling handles.
//!
//! # Example
//!
//! ```rust,ignore
//! scene.node(bone)
//!     .set_position(0.0, 3.0, 0.0)
//!     .rotate_y(0.5)
//!     .set_blending_weight(0.25, walk);
//! ```
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::must_use_candidate)]
use glam::{EulerRot, Quat, Vec3};

use crate::animation::TrackSlot;
use crate::scene::NodeHandle;
use crate::scene::scene::Scene;

/// Temporary mutable borrow of a scene node for chainable operations.
pub struct SceneNode<'a> {
    scene: &'a mut Scene,
    handle: NodeHandle,
}

impl<'a> SceneNode<'a> {
    #[inline]
    pub fn new(scene: &'a mut Scene, handle: NodeHandle) -> Self {
        Self { scene, handle }
    }

    /// Returns the underlying handle.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    // -- Pose setters (chainable) --

    /// Sets the node's local position.
    #[inline]
    pub fn set_position(self, x: f32, y: f32, z: f32) -> Self {
        self.scene.set_position(self.handle, Vec3::new(x, y, z));
        self
    }

    /// Sets the node's local position from a Vec3.
    #[inline]
    pub fn set_position_vec(self, pos: Vec3) -> Self {
        self.scene.set_position(self.handle, pos);
        self
    }

    /// Sets uniform scale.
    #[inline]
    pub fn set_scale(self, s: f32) -> Self {
        self.scene.set_scale(self.handle, Vec3::splat(s));
        self
    }

    /// Sets non-uniform scale.
    #[inline]
    pub fn set_scale_xyz(self, x: f32, y: f32, z: f32) -> Self {
        self.scene.set_scale(self.handle, Vec3::new(x, y, z));
        self
    }

    /// Sets rotation from a quaternion.
    #[inline]
    pub fn set_rotation(self, quat: Quat) -> Self {
        self.scene.set_rotation(self.handle, quat);
        self
    }

    /// Sets rotation from Euler angles (XYZ intrinsic order, radians).
    #[inline]
    pub fn set_rotation_euler(self, x: f32, y: f32, z: f32) -> Self {
        self.scene
            .set_rotation(self.handle, Quat::from_euler(EulerRot::XYZ, x, y, z));
        self
    }

    /// Rotates around the Y axis by `angle` radians (cumulative).
    #[inline]
    pub fn rotate_y(self, angle: f32) -> Self {
        self.rotate(Quat::from_rotation_y(angle))
    }

    /// Rotates around the X axis by `angle` radians (cumulative).
    #[inline]
    pub fn rotate_x(self, angle: f32) -> Self {
        self.rotate(Quat::from_rotation_x(angle))
    }

    fn rotate(self, delta: Quat) -> Self {
        if let Some(pose) = self.scene.pose(self.handle) {
            self.scene.set_rotation(self.handle, pose.quaternion * delta);
        }
        self
    }

    // -- Animation (chainable) --

    /// Sets the blend weight of `slot` throughout the subtree.
    #[inline]
    pub fn set_blending_weight(self, weight: f32, slot: TrackSlot) -> Self {
        self.scene
            .set_animation_blending_weight(self.handle, weight, slot);
        self
    }

    /// Establishes `slot` at time `t` throughout the subtree.
    #[inline]
    pub fn establish_frame_at(self, t: f32, slot: TrackSlot) -> Self {
        self.scene.establish_animation_frame_at(self.handle, t, slot);
        self
    }

    /// Enables or disables `slot` throughout the subtree.
    #[inline]
    pub fn set_track_enabled(self, slot: TrackSlot, enabled: bool) -> Self {
        self.scene
            .set_all_animation_enabled_on_track(self.handle, slot, enabled);
        self
    }
}
