//! Skinning & Animation Settings
//!
//! Scene-wide limits and defaults consumed by the skinning and animation
//! subsystems.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sinew::{Scene, SkinningSettings};
//!
//! // Default: small matrix palettes, cached deformed faces
//! let scene = Scene::new();
//!
//! // Wider palettes for content exported with more bones per draw call
//! let settings = SkinningSettings::default()
//!     .with_max_bones_per_section(32)
//!     .with_cache_deformed_faces(false);
//! let scene = Scene::with_settings(settings);
//! ```

use crate::animation::DEFAULT_INTERPOLATION_EPSILON;

/// Default upper bound on bones referenced by one skin section.
pub const DEFAULT_MAX_BONES_PER_SECTION: usize = 11;

/// Default upper bound on bone influences stored per vertex.
pub const DEFAULT_MAX_INFLUENCES_PER_VERTEX: usize = 4;

/// Limits and defaults for skinned content.
///
/// The limits are enforced once, when a [`SkinnedMesh`](crate::skinning::SkinnedMesh)
/// enters a scene. The per-vertex deformation path trusts them afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SkinningSettings {
    /// Maximum bones a single skin section may reference.
    ///
    /// Mirrors the size of the matrix palette one draw call can bind.
    pub max_bones_per_section: usize,

    /// Maximum bone influences stored per vertex.
    pub max_influences_per_vertex: usize,

    /// Whether newly added skinned meshes cache deformed vertex locations
    /// for face queries.
    pub cache_deformed_faces: bool,

    /// Snap distance applied to interpolation fractions of newly created
    /// dense tracks.
    pub interpolation_epsilon: f32,
}

impl Default for SkinningSettings {
    #[inline]
    fn default() -> Self {
        Self {
            max_bones_per_section: DEFAULT_MAX_BONES_PER_SECTION,
            max_influences_per_vertex: DEFAULT_MAX_INFLUENCES_PER_VERTEX,
            cache_deformed_faces: true,
            interpolation_epsilon: DEFAULT_INTERPOLATION_EPSILON,
        }
    }
}

impl SkinningSettings {
    #[inline]
    #[must_use]
    pub fn with_max_bones_per_section(mut self, max: usize) -> Self {
        self.max_bones_per_section = max;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_influences_per_vertex(mut self, max: usize) -> Self {
        self.max_influences_per_vertex = max;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_cache_deformed_faces(mut self, cache: bool) -> Self {
        self.cache_deformed_faces = cache;
        self
    }

    /// Sets the snap distance, clamped to `[0, 0.5]` so the two snapping
    /// zones never overlap.
    #[inline]
    #[must_use]
    pub fn with_interpolation_epsilon(mut self, epsilon: f32) -> Self {
        self.interpolation_epsilon = epsilon.clamp(0.0, 0.5);
        self
    }
}
