//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SinewError`] covers the recoverable failure modes:
//! - Stale node or skinned-mesh handles
//! - Segment tracks built without a base track or with an invalid range
//! - Skin content that violates load-time limits (bone counts, vertex ranges)
//! - Bone linking and re-attachment failures
//!
//! Per-vertex work on the deformation hot path never returns errors; skin
//! content is checked once by [`SkinnedMesh::validate`](crate::skinning::SkinnedMesh::validate)
//! when it enters a scene.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for `std::result::Result<T, SinewError>`.
//!
//! ```rust,ignore
//! use sinew::errors::{SinewError, Result};
//!
//! fn link(scene: &mut Scene, skin: SkinKey, nodes: &[NodeHandle]) -> Result<()> {
//!     scene.link_skin_bones(skin, nodes)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinewError {
    // ========================================================================
    // Handle Errors
    // ========================================================================
    /// The node handle was removed or never belonged to this scene.
    #[error("Node not found: handle is stale or belongs to another scene")]
    NodeNotFound,

    /// The skinned mesh handle was removed or never belonged to this scene.
    #[error("Skinned mesh not found: handle is stale or belongs to another scene")]
    SkinNotFound,

    // ========================================================================
    // Track Errors
    // ========================================================================
    /// A segment track was requested without a base track to window.
    #[error("Segment track requires a base track")]
    MissingBaseTrack,

    /// A segment window does not lie inside the normalized track range.
    #[error("Invalid segment range: [{start}, {end}] must lie within [0, 1]")]
    InvalidSegmentRange {
        /// Requested start time
        start: f32,
        /// Requested end time
        end: f32,
    },

    // ========================================================================
    // Skin Content Errors
    // ========================================================================
    /// A skin section addresses vertices past the end of the mesh.
    #[error(
        "Skin section {section} covers vertices {start}..{end}, but the mesh has {vertex_count}"
    )]
    VertexRangeOutOfBounds {
        /// Section index within the mesh
        section: usize,
        /// First vertex of the section
        start: usize,
        /// One past the last vertex of the section
        end: usize,
        /// Total vertex count of the mesh
        vertex_count: usize,
    },

    /// A skin section references more bones than one draw call may bind.
    #[error("Skin section {section} references {count} bones (limit: {max})")]
    TooManyBones {
        /// Section index within the mesh
        section: usize,
        /// Bones referenced by the section
        count: usize,
        /// Configured limit
        max: usize,
    },

    /// The mesh stores more bone influences per vertex than supported.
    #[error("Mesh stores {count} bone influences per vertex (limit: {max})")]
    TooManyInfluences {
        /// Influences declared by the mesh
        count: usize,
        /// Configured limit
        max: usize,
    },

    /// The index stream references a vertex the mesh does not have.
    #[error("Index {position} references vertex {vertex}, but the mesh has {vertex_count}")]
    IndexOutOfBounds {
        /// Position within the index stream
        position: usize,
        /// Referenced vertex
        vertex: usize,
        /// Total vertex count of the mesh
        vertex_count: usize,
    },

    /// A weighted vertex influence indexes past its section's bone list.
    #[error("Vertex {vertex} references bone {bone}, but its section has {bone_count} bones")]
    VertexBoneOutOfRange {
        /// Vertex index within the mesh
        vertex: usize,
        /// Section-local bone index stored on the vertex
        bone: usize,
        /// Bones in the owning section
        bone_count: usize,
    },

    // ========================================================================
    // Linking Errors
    // ========================================================================
    /// A skin section names a bone node index outside the loaded node table.
    #[error("Bone node index {index} is out of range for a node table of {len}")]
    BoneIndexOutOfRange {
        /// Index stored in the skin section
        index: usize,
        /// Length of the node table
        len: usize,
    },

    /// Re-attachment found no bone with the given name in the new skeleton.
    #[error("No bone named '{0}' below the re-attachment root")]
    BoneNotFound(String),
}

/// Alias for `Result<T, SinewError>`.
pub type Result<T> = std::result::Result<T, SinewError>;
