use glam::Vec3;

use crate::skinning::section::SkinSection;
use crate::skinning::skinned_mesh::Deformer;

/// A triangle of deformed vertex locations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub vertices: [Vec3; 3],
}

impl Face {
    #[must_use]
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }

    /// Unit normal following counter-clockwise winding. Degenerate faces
    /// yield zero.
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        let [a, b, c] = self.vertices;
        (b - a).cross(c - a).normalize_or_zero()
    }
}

/// Deformed vertex locations cached for face queries.
///
/// The cache is populated lazily in one sweep over the index stream and
/// invalidated whenever any bone of the mesh, or the mesh node itself, moves.
#[derive(Debug, Clone)]
pub struct DeformedFaceCache {
    locations: Vec<Vec3>,
    populated: Vec<bool>,
    dirty: bool,
    should_cache: bool,
}

impl Default for DeformedFaceCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DeformedFaceCache {
    #[must_use]
    pub fn new(should_cache: bool) -> Self {
        Self {
            locations: Vec::new(),
            populated: Vec::new(),
            dirty: true,
            should_cache,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        !self.locations.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn should_cache_faces(&self) -> bool {
        self.should_cache
    }

    /// Turning caching off releases the cached locations.
    pub fn set_should_cache_faces(&mut self, should_cache: bool) {
        self.should_cache = should_cache;
        if !should_cache {
            self.deallocate();
        }
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Supplies the buffer the cache fills, reusing its allocation.
    pub fn set_deformed_vertex_locations(&mut self, locations: Vec<Vec3>) {
        self.locations = locations;
        self.populated.clear();
        self.dirty = true;
    }

    fn deallocate(&mut self) {
        self.locations = Vec::new();
        self.populated = Vec::new();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Cached locations, repopulated first if stale. `None` with caching off.
    pub(crate) fn deformed_vertex_locations(
        &mut self,
        deformer: &mut Deformer<'_>,
    ) -> Option<&[Vec3]> {
        if !self.should_cache {
            return None;
        }
        if self.dirty {
            self.populate(deformer);
        }
        Some(&self.locations)
    }

    pub(crate) fn deformed_vertex_location_at(
        &mut self,
        vertex: usize,
        deformer: &mut Deformer<'_>,
    ) -> Vec3 {
        if self.should_cache {
            if self.dirty {
                self.populate(deformer);
            }
            if self.populated.get(vertex).copied().unwrap_or(false) {
                return self.locations[vertex];
            }
        }
        deformer.deformed_vertex_location_at(vertex)
    }

    pub(crate) fn face_at(&mut self, face: usize, deformer: &mut Deformer<'_>) -> Face {
        let [a, b, c] = deformer.geometry.face_indices_at(face);
        Face::new(
            self.deformed_vertex_location_at(a, deformer),
            self.deformed_vertex_location_at(b, deformer),
            self.deformed_vertex_location_at(c, deformer),
        )
    }

    /// Sweeps the index stream once, deforming each referenced vertex the
    /// first time it is seen.
    fn populate(&mut self, deformer: &mut Deformer<'_>) {
        let vertex_count = deformer.geometry.vertex_count();
        if self.locations.len() != vertex_count {
            self.locations.resize(vertex_count, Vec3::ZERO);
        }
        self.populated.clear();
        self.populated.resize(vertex_count, false);

        let sections = deformer.sections;
        let mut current: Option<&SkinSection> = None;
        let mut uncovered = 0usize;

        for position in 0..deformer.geometry.vertex_index_count() {
            let vertex = deformer.geometry.vertex_index_at(position);
            if self.populated[vertex] {
                continue;
            }

            if !current.is_some_and(|s| s.contains_vertex_index(vertex)) {
                current = sections.iter().find(|s| s.contains_vertex_index(vertex));
            }

            self.locations[vertex] = match current {
                Some(section) => section.deformed_vertex_location_at(
                    vertex,
                    deformer.geometry,
                    deformer.nodes,
                    &deformer.frame,
                ),
                None => {
                    uncovered += 1;
                    deformer.geometry.vertex_location_at(vertex)
                }
            };
            self.populated[vertex] = true;
        }

        if uncovered > 0 {
            log::warn!("{uncovered} skinned vertices lie outside every skin section");
        }
        log::trace!("Populated deformed faces for {vertex_count} vertices");
        self.dirty = false;
    }
}
