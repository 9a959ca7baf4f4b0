use glam::{Affine3A, EulerRot, Quat, Vec3};

use crate::animation::Pose;
use crate::math::MatrixCache;

/// Local pose of a node plus its lazily rebuilt matrices.
///
/// The pose is written through [`Scene`](crate::scene::Scene) so that every
/// change invalidates the world matrices below it. Matrices are rebuilt on
/// first read after invalidation.
#[derive(Debug, Clone)]
pub struct Transform {
    pub(crate) position: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) scale: Vec3,

    pub(crate) local_matrix: MatrixCache,
    pub(crate) world_matrix: MatrixCache,
    pub(crate) world_matrix_inverse: MatrixCache,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            local_matrix: MatrixCache::new(),
            world_matrix: MatrixCache::new(),
            world_matrix_inverse: MatrixCache::new(),
        }
    }

    #[must_use]
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            position: pose.location,
            rotation: pose.quaternion,
            scale: pose.scale,
            ..Self::new()
        }
    }

    // ========================================================================
    // Pose
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation, self.scale)
    }

    /// Current rotation as XYZ Euler angles in radians.
    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    #[must_use]
    pub fn is_uniformly_scaled(&self) -> bool {
        self.scale.x == self.scale.y && self.scale.x == self.scale.z
    }

    /// Writes `pose` and invalidates the local matrix.
    ///
    /// Returns `true` if anything changed. World matrices are the caller's
    /// responsibility.
    pub(crate) fn apply_pose(&mut self, pose: &Pose) -> bool {
        let changed = self.position != pose.location
            || self.rotation != pose.quaternion
            || self.scale != pose.scale;
        if changed {
            self.position = pose.location;
            self.rotation = pose.quaternion;
            self.scale = pose.scale;
            self.local_matrix.mark_dirty();
        }
        changed
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// Local matrix, rebuilt from the pose if stale.
    pub fn local_matrix(&mut self) -> Affine3A {
        let (scale, rotation, position) = (self.scale, self.rotation, self.position);
        self.local_matrix
            .get_or_rebuild(|| Affine3A::from_scale_rotation_translation(scale, rotation, position))
    }

    /// `true` when the world matrix must be rebuilt before use.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.world_matrix.is_dirty()
    }

    /// Last computed world matrix. May be stale; see [`is_dirty`](Self::is_dirty).
    #[inline]
    #[must_use]
    pub fn cached_world_matrix(&self) -> &Affine3A {
        self.world_matrix.value()
    }
}
