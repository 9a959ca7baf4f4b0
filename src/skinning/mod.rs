//! CPU vertex skinning.
//!
//! A [`SkinnedMesh`] is split into [`SkinSection`]s, each deforming a
//! contiguous vertex range with its own bone palette. For a bone `B` of a
//! section the vertex transform is
//!
//! ```text
//! S⁻¹ · Bskel · R⁻¹ · S
//! ```
//!
//! where `S` places the mesh relative to its skeleton root, `Bskel` places
//! the bone relative to the same root, and `R⁻¹` undoes the bone's skeletal
//! transform at bind time. A deformed vertex is the weighted sum of its
//! bind location under each influencing bone.

pub mod faces;
pub mod geometry;
pub mod section;
pub mod skinned_mesh;

pub use faces::{DeformedFaceCache, Face};
pub use geometry::SkinGeometry;
pub use section::{MatrixSpace, SkinSection, SkinnedBone};
pub use skinned_mesh::SkinnedMesh;
