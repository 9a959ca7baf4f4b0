use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::animation::state::{AnimationState, TrackSlot};
use crate::animation::tracks::KeyframeTrack;
use crate::animation::values::{Interpolatable, PoseChannels};

/// Result of blending a node's animation states.
///
/// A property is `Some` only when at least one enabled state with a non-zero
/// weight drives it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlendedPose {
    pub location: Option<Vec3>,
    pub quaternion: Option<Quat>,
    pub scale: Option<Vec3>,
}

/// Running weighted average of one pose property.
///
/// Each new contribution is folded in with `value.lerp(next, w / total)`,
/// which reproduces the weighted mean without normalizing the weights.
#[derive(Debug, Clone, Copy)]
struct Accumulator<T> {
    value: T,
    total_weight: f32,
}

impl<T: Interpolatable> Accumulator<T> {
    fn new(initial: T) -> Self {
        Self {
            value: initial,
            total_weight: 0.0,
        }
    }

    fn add(&mut self, value: T, weight: f32) {
        let first = self.total_weight <= 0.0;
        self.total_weight += weight;
        self.value = if first {
            value
        } else {
            T::interpolate_linear(self.value, value, weight / self.total_weight)
        };
    }

    fn finish(self) -> Option<T> {
        (self.total_weight > 0.0).then_some(self.value)
    }
}

/// The animation states attached to one node, at most one per track slot.
#[derive(Debug, Clone, Default)]
pub struct NodeAnimation {
    states: Vec<AnimationState>,
    dirty: bool,
}

impl NodeAnimation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    #[must_use]
    pub fn states(&self) -> &[AnimationState] {
        &self.states
    }

    /// `true` when a state changed since the last [`blend`](Self::blend).
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn state_on_track(&self, slot: TrackSlot) -> Option<&AnimationState> {
        self.states.iter().find(|state| state.slot() == slot)
    }

    /// Mutable access to a state. Marks the animation dirty.
    pub fn state_on_track_mut(&mut self, slot: TrackSlot) -> Option<&mut AnimationState> {
        let state = self.states.iter_mut().find(|state| state.slot() == slot)?;
        self.dirty = true;
        Some(state)
    }

    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut AnimationState> {
        self.dirty = true;
        self.states.iter_mut()
    }

    #[must_use]
    pub fn contains_track(&self, slot: TrackSlot) -> bool {
        self.state_on_track(slot).is_some()
    }

    /// Attaches `state`, replacing any state already on its slot.
    ///
    /// Returns the replaced state.
    pub fn insert(&mut self, state: AnimationState) -> Option<AnimationState> {
        self.dirty = true;
        match self.states.iter_mut().find(|s| s.slot() == state.slot()) {
            Some(existing) => Some(std::mem::replace(existing, state)),
            None => {
                self.states.push(state);
                None
            }
        }
    }

    pub fn remove_track(&mut self, slot: TrackSlot) -> Option<AnimationState> {
        let index = self.states.iter().position(|s| s.slot() == slot)?;
        self.dirty = true;
        Some(self.states.remove(index))
    }

    /// Removes every state playing exactly `track`.
    ///
    /// Returns `true` if anything was removed.
    pub fn remove_track_data(&mut self, track: &Arc<KeyframeTrack>) -> bool {
        let before = self.states.len();
        self.states.retain(|s| !Arc::ptr_eq(s.track(), track));
        let removed = self.states.len() != before;
        self.dirty |= removed;
        removed
    }

    /// Advances every state. Returns `true` if any state moved.
    pub fn advance(&mut self, dt: f32) -> bool {
        let mut advanced = false;
        for state in &mut self.states {
            advanced |= state.advance(dt);
        }
        self.dirty |= advanced;
        advanced
    }

    /// Blends all contributing states and clears the dirty flag.
    ///
    /// Only enabled states with a non-zero weight contribute, and each one
    /// only to the properties it animates.
    pub fn blend(&mut self) -> BlendedPose {
        self.dirty = false;

        let mut location = Accumulator::new(Vec3::ZERO);
        let mut quaternion = Accumulator::new(Quat::IDENTITY);
        let mut scale = Accumulator::new(Vec3::ONE);

        for state in &self.states {
            let weight = state.blend_weight();
            if weight == 0.0 || !state.is_enabled() {
                continue;
            }

            let channels = state.animating_channels();
            let pose = state.pose();
            if channels.contains(PoseChannels::LOCATION) {
                location.add(pose.location, weight);
            }
            if channels.contains(PoseChannels::QUATERNION) {
                quaternion.add(pose.quaternion, weight);
            }
            if channels.contains(PoseChannels::SCALE) {
                scale.add(pose.scale, weight);
            }
        }

        BlendedPose {
            location: location.finish(),
            quaternion: quaternion.finish(),
            scale: scale.finish(),
        }
    }
}
