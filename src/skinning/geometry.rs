use glam::Vec3;

/// Bind-pose vertex data of a skinned mesh.
///
/// Each vertex stores `influences_per_vertex` pairs of (section-local bone
/// index, weight). Weights are used exactly as stored.
#[derive(Debug, Clone, Default)]
pub struct SkinGeometry {
    positions: Vec<Vec3>,
    indices: Option<Vec<u32>>,
    influences_per_vertex: usize,
    bone_indices: Vec<u16>,
    bone_weights: Vec<f32>,
}

impl SkinGeometry {
    /// Creates geometry with every influence zeroed.
    #[must_use]
    pub fn new(positions: Vec<Vec3>, influences_per_vertex: usize) -> Self {
        let slots = positions.len() * influences_per_vertex;
        Self {
            positions,
            indices: None,
            influences_per_vertex,
            bone_indices: vec![0; slots],
            bone_weights: vec![0.0; slots],
        }
    }

    /// Triangle-list indices. Without them, consecutive vertex triples form
    /// the faces.
    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        debug_assert!(indices.len() % 3 == 0, "index count is not a multiple of 3");
        self.indices = Some(indices);
        self
    }

    /// Replaces all influences at once. Both arrays hold
    /// `vertex_count * influences_per_vertex` entries.
    #[must_use]
    pub fn with_influences(mut self, bone_indices: Vec<u16>, bone_weights: Vec<f32>) -> Self {
        let slots = self.positions.len() * self.influences_per_vertex;
        debug_assert_eq!(bone_indices.len(), slots, "bone index count mismatch");
        debug_assert_eq!(bone_weights.len(), slots, "bone weight count mismatch");
        self.bone_indices = bone_indices;
        self.bone_weights = bone_weights;
        self
    }

    /// Sets influence `slot` of `vertex`.
    pub fn set_influence(&mut self, vertex: usize, slot: usize, bone: u16, weight: f32) {
        debug_assert!(slot < self.influences_per_vertex, "influence slot out of range");
        let i = vertex * self.influences_per_vertex + slot;
        self.bone_indices[i] = bone;
        self.bone_weights[i] = weight;
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn influences_per_vertex(&self) -> usize {
        self.influences_per_vertex
    }

    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    #[must_use]
    pub fn vertex_location_at(&self, vertex: usize) -> Vec3 {
        self.positions[vertex]
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Length of the index stream faces are read from.
    #[must_use]
    pub fn vertex_index_count(&self) -> usize {
        self.indices.as_ref().map_or(self.positions.len(), Vec::len)
    }

    /// Vertex referenced at `position` of the index stream.
    #[inline]
    #[must_use]
    pub fn vertex_index_at(&self, position: usize) -> usize {
        self.indices
            .as_ref()
            .map_or(position, |indices| indices[position] as usize)
    }

    #[must_use]
    pub fn face_count(&self) -> usize {
        self.vertex_index_count() / 3
    }

    #[must_use]
    pub fn face_indices_at(&self, face: usize) -> [usize; 3] {
        let base = face * 3;
        [
            self.vertex_index_at(base),
            self.vertex_index_at(base + 1),
            self.vertex_index_at(base + 2),
        ]
    }

    /// (section-local bone index, weight) pairs of `vertex`.
    pub fn influences(&self, vertex: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let start = vertex * self.influences_per_vertex;
        let end = start + self.influences_per_vertex;
        self.bone_indices[start..end]
            .iter()
            .zip(&self.bone_weights[start..end])
            .map(|(&bone, &weight)| (usize::from(bone), weight))
    }
}
