//! Matrix helpers shared by the transform hierarchy and the skinning code.
//!
//! [`MatrixCache`] is the lazily recomputed matrix slot used for local,
//! world, world-inverse and skeletal matrices. [`invert`] takes the cheap
//! transpose path whenever [`is_rigid`] holds.

use glam::{Affine3A, Vec3A};

/// Relative tolerance used when testing a matrix for rigidity.
pub const RIGIDITY_EPSILON: f32 = 1e-4;

/// A cached matrix plus the dirty flag that guards it.
///
/// A fresh cache starts dirty. Readers call [`get_or_rebuild`](Self::get_or_rebuild)
/// (or check [`is_dirty`](Self::is_dirty) and [`set`](Self::set) themselves when
/// the rebuild needs borrows the closure form cannot express).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixCache {
    value: Affine3A,
    dirty: bool,
}

impl Default for MatrixCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixCache {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: Affine3A::IDENTITY,
            dirty: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Stores a freshly computed value and clears the dirty flag.
    #[inline]
    pub fn set(&mut self, value: Affine3A) {
        self.value = value;
        self.dirty = false;
    }

    /// Last stored value, whether or not it is still current.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Affine3A {
        &self.value
    }

    /// Returns the cached value, recomputing it first when dirty.
    #[inline]
    pub fn get_or_rebuild(&mut self, rebuild: impl FnOnce() -> Affine3A) -> Affine3A {
        if self.dirty {
            self.set(rebuild());
        }
        self.value
    }
}

/// Returns `true` when the linear part of `m` is a rotation combined with a
/// uniform scale: mutually orthogonal basis vectors of equal length.
#[must_use]
pub fn is_rigid(m: &Affine3A) -> bool {
    let x = m.matrix3.x_axis;
    let y = m.matrix3.y_axis;
    let z = m.matrix3.z_axis;

    let lx = x.length();
    let ly = y.length();
    let lz = z.length();
    if lx <= f32::EPSILON {
        return false;
    }

    let tol = RIGIDITY_EPSILON * lx;
    let uniform = (lx - ly).abs() <= tol && (lx - lz).abs() <= tol;

    let tol2 = RIGIDITY_EPSILON * lx * lx;
    let orthogonal = x.dot(y).abs() <= tol2 && x.dot(z).abs() <= tol2 && y.dot(z).abs() <= tol2;

    uniform && orthogonal
}

/// Inverts an affine transform.
///
/// Rigid matrices are inverted by transposing the linear part and dividing
/// by the squared scale; everything else takes the general inverse.
#[must_use]
pub fn invert(m: &Affine3A) -> Affine3A {
    if !is_rigid(m) {
        return m.inverse();
    }

    let scale_sq = m.matrix3.x_axis.length_squared();
    let matrix3 = m.matrix3.transpose().mul_scalar(1.0 / scale_sq);
    let translation: Vec3A = -(matrix3 * m.translation);
    Affine3A {
        matrix3,
        translation,
    }
}
