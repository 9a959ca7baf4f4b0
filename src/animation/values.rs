use bitflags::bitflags;
use glam::{Quat, Vec3};

pub trait Interpolatable: Copy + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for Vec3 {
    #[inline]
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    #[inline]
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }
}

/// Interpolates between two frame values, returning `start` untouched when
/// the fraction is exactly zero.
#[inline]
pub(crate) fn interpolate_frames<T: Interpolatable>(start: T, end: T, fraction: f32) -> T {
    if fraction == 0.0 {
        start
    } else {
        T::interpolate_linear(start, end, fraction)
    }
}

bitflags! {
    /// The local pose properties an animation can drive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PoseChannels: u8 {
        const LOCATION = 1 << 0;
        const QUATERNION = 1 << 1;
        const SCALE = 1 << 2;
    }
}

impl Default for PoseChannels {
    fn default() -> Self {
        Self::all()
    }
}

/// A local pose: translation, rotation and scale.
///
/// Properties a track does not animate keep their defaults (zero location,
/// identity rotation, unit scale).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub location: Vec3,
    pub quaternion: Quat,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        location: Vec3::ZERO,
        quaternion: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub const fn new(location: Vec3, quaternion: Quat, scale: Vec3) -> Self {
        Self {
            location,
            quaternion,
            scale,
        }
    }

    #[must_use]
    pub fn from_location(location: Vec3) -> Self {
        Self {
            location,
            ..Self::IDENTITY
        }
    }

    /// Component-wise approximate equality, treating `q` and `-q` as equal.
    #[must_use]
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        let same_rotation = self.quaternion.abs_diff_eq(other.quaternion, max_abs_diff)
            || self.quaternion.abs_diff_eq(-other.quaternion, max_abs_diff);
        self.location.abs_diff_eq(other.location, max_abs_diff)
            && same_rotation
            && self.scale.abs_diff_eq(other.scale, max_abs_diff)
    }
}
