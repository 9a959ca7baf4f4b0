//! Node-level animation API.
//!
//! Operations named `*_on_track` address one [`TrackSlot`]; most recurse
//! through the subtree of the given node, mirroring how an animation file
//! lays one logical track across every node of a model.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::animation::{
    AnimationState, DenseTrack, FrozenTrack, KeyframeTrack, NodeAnimation, PoseChannels, SegmentTrack,
    TrackSlot,
};
use crate::errors::{Result, SinewError};
use crate::scene::NodeHandle;
use crate::scene::scene::Scene;
use crate::scene::transform_system;

impl Scene {
    /// Generates a fresh slot, unique across the whole scene.
    pub fn generate_track_slot(&mut self) -> TrackSlot {
        self.track_slots.generate()
    }

    /// Runs `edit` on the node's animation, then invalidates its transform.
    fn edit_animation<R>(
        &mut self,
        handle: NodeHandle,
        edit: impl FnOnce(&mut NodeAnimation) -> R,
    ) -> Option<R> {
        let node = self.nodes.get_mut(handle)?;
        let result = edit(&mut node.animation);
        node.animation.mark_dirty();
        self.mark_transform_dirty(handle);
        Some(result)
    }

    /// An empty dense track using the scene's interpolation epsilon.
    #[must_use]
    pub fn create_dense_track(&self, frame_count: usize) -> DenseTrack {
        DenseTrack::new(frame_count).with_interpolation_epsilon(self.settings().interpolation_epsilon)
    }

    fn subtree(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        transform_system::collect_subtree(&self.nodes, handle)
    }

    // ========================================================================
    // Attaching animations
    // ========================================================================

    /// Plays `track` on `handle` under `slot`.
    ///
    /// A no-op if that exact track is already on the slot; otherwise replaces
    /// the slot's state. Returns `true` if a new state was attached.
    pub fn add_animation(
        &mut self,
        handle: NodeHandle,
        track: Arc<KeyframeTrack>,
        slot: TrackSlot,
    ) -> bool {
        let Some(node) = self.nodes.get(handle) else {
            return false;
        };
        if node
            .animation
            .state_on_track(slot)
            .is_some_and(|state| Arc::ptr_eq(state.track(), &track))
        {
            return false;
        }
        self.add_animation_state(AnimationState::new(handle, track, slot))
    }

    /// Attaches a prepared state to the node it targets.
    pub fn add_animation_state(&mut self, state: AnimationState) -> bool {
        let handle = state.node();
        let slot = state.slot();
        let added = self
            .edit_animation(handle, |animation| {
                animation.insert(state);
            })
            .is_some();
        if added {
            log::debug!("Attached animation {slot} to node {handle:?}");
        }
        added
    }

    /// Plays `track` on the default slot.
    pub fn set_animation(&mut self, handle: NodeHandle, track: Arc<KeyframeTrack>) -> bool {
        self.add_animation(handle, track, TrackSlot::DEFAULT)
    }

    #[must_use]
    pub fn animation_state_on_track(
        &self,
        handle: NodeHandle,
        slot: TrackSlot,
    ) -> Option<&AnimationState> {
        self.nodes.get(handle)?.animation.state_on_track(slot)
    }

    /// Mutable access to one state. The node is invalidated up front, so
    /// any change made through the reference is picked up by the next read.
    pub fn animation_state_on_track_mut(
        &mut self,
        handle: NodeHandle,
        slot: TrackSlot,
    ) -> Option<&mut AnimationState> {
        if !self
            .nodes
            .get(handle)
            .is_some_and(|node| node.animation.contains_track(slot))
        {
            return None;
        }
        self.mark_transform_dirty(handle);
        self.nodes.get_mut(handle)?.animation.state_on_track_mut(slot)
    }

    #[must_use]
    pub fn animation_on_track(
        &self,
        handle: NodeHandle,
        slot: TrackSlot,
    ) -> Option<&Arc<KeyframeTrack>> {
        self.animation_state_on_track(handle, slot)
            .map(AnimationState::track)
    }

    /// Removes the state on `slot` from every node in the subtree.
    pub fn remove_animation_track(&mut self, handle: NodeHandle, slot: TrackSlot) {
        for current in self.subtree(handle) {
            if self
                .nodes
                .get(current)
                .is_some_and(|node| node.animation.contains_track(slot))
            {
                self.edit_animation(current, |animation| animation.remove_track(slot));
            }
        }
    }

    /// Removes every state on `handle` that plays exactly `track`.
    pub fn remove_animation(&mut self, handle: NodeHandle, track: &Arc<KeyframeTrack>) -> bool {
        self.edit_animation(handle, |animation| animation.remove_track_data(track))
            .unwrap_or(false)
    }

    // ========================================================================
    // Segments
    // ========================================================================

    /// Adds a segment `[start_time, end_time]` of the animation on
    /// `base_slot` under a freshly generated slot, for every node in the
    /// subtree that has a base animation.
    pub fn add_animation_segment(
        &mut self,
        handle: NodeHandle,
        start_time: f32,
        end_time: f32,
        base_slot: TrackSlot,
    ) -> Result<TrackSlot> {
        let slot = self.generate_track_slot();
        self.add_animation_segment_on_track(handle, start_time, end_time, base_slot, slot)?;
        Ok(slot)
    }

    /// As [`add_animation_segment`](Self::add_animation_segment), placing the
    /// segments on a caller-chosen slot.
    pub fn add_animation_segment_on_track(
        &mut self,
        handle: NodeHandle,
        start_time: f32,
        end_time: f32,
        base_slot: TrackSlot,
        slot: TrackSlot,
    ) -> Result<()> {
        self.add_segments(handle, slot, base_slot, |base| {
            SegmentTrack::try_new(base, start_time, end_time)
        })
    }

    /// Adds a segment spanning base frames `start_frame..=end_frame` under a
    /// freshly generated slot.
    pub fn add_animation_frames(
        &mut self,
        handle: NodeHandle,
        start_frame: usize,
        end_frame: usize,
        base_slot: TrackSlot,
    ) -> Result<TrackSlot> {
        let slot = self.generate_track_slot();
        self.add_animation_frames_on_track(handle, start_frame, end_frame, base_slot, slot)?;
        Ok(slot)
    }

    pub fn add_animation_frames_on_track(
        &mut self,
        handle: NodeHandle,
        start_frame: usize,
        end_frame: usize,
        base_slot: TrackSlot,
        slot: TrackSlot,
    ) -> Result<()> {
        self.add_segments(handle, slot, base_slot, |base| {
            SegmentTrack::try_from_frames(base, start_frame, end_frame)
        })
    }

    fn add_segments(
        &mut self,
        handle: NodeHandle,
        slot: TrackSlot,
        base_slot: TrackSlot,
        make: impl Fn(Option<Arc<KeyframeTrack>>) -> Result<SegmentTrack>,
    ) -> Result<()> {
        if !self.nodes.contains_key(handle) {
            return Err(SinewError::NodeNotFound);
        }

        let mut added = 0usize;
        for current in self.subtree(handle) {
            let base = self.animation_on_track(current, base_slot).cloned();
            match make(base) {
                Ok(segment) => {
                    let track = Arc::new(KeyframeTrack::from(segment));
                    self.add_animation(current, track, slot);
                    added += 1;
                }
                Err(SinewError::MissingBaseTrack) => {}
                Err(err) => return Err(err),
            }
        }
        log::debug!("Added {added} segments on {slot} from {base_slot}");
        Ok(())
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Establishes the state on `slot` at time `t` on every node in the
    /// subtree that has one.
    pub fn establish_animation_frame_at(&mut self, handle: NodeHandle, t: f32, slot: TrackSlot) {
        for current in self.subtree(handle) {
            if let Some(state) = self.animation_state_on_track_mut(current, slot) {
                state.establish_pose_at(t);
            }
        }
    }

    /// Time of the first state on `slot` found in the subtree, depth-first.
    #[must_use]
    pub fn animation_time_on_track(&self, handle: NodeHandle, slot: TrackSlot) -> Option<f32> {
        self.subtree(handle)
            .into_iter()
            .find_map(|current| self.animation_state_on_track(current, slot))
            .map(AnimationState::time)
    }

    /// Advances every playing state by `dt` seconds and invalidates the
    /// nodes that moved. Nothing is recomputed until it is next read.
    pub fn update(&mut self, dt: f32) {
        let mut advanced = Vec::new();
        for (handle, node) in &mut self.nodes {
            if node.animation.advance(dt) {
                advanced.push(handle);
            }
        }
        for handle in advanced {
            self.mark_transform_dirty(handle);
        }
    }

    // ========================================================================
    // Weights & enablement
    // ========================================================================

    /// Blend weight of the first state on `slot` found in the subtree.
    #[must_use]
    pub fn animation_blending_weight_on_track(
        &self,
        handle: NodeHandle,
        slot: TrackSlot,
    ) -> Option<f32> {
        self.subtree(handle)
            .into_iter()
            .find_map(|current| self.animation_state_on_track(current, slot))
            .map(AnimationState::blend_weight)
    }

    /// Sets the blend weight of the state on `slot` throughout the subtree.
    pub fn set_animation_blending_weight(
        &mut self,
        handle: NodeHandle,
        weight: f32,
        slot: TrackSlot,
    ) {
        for current in self.subtree(handle) {
            if let Some(state) = self.animation_state_on_track_mut(current, slot) {
                state.set_blend_weight(weight);
            }
        }
    }

    /// Enables or disables the state on `slot` of this node only.
    pub fn set_animation_enabled_on_track(
        &mut self,
        handle: NodeHandle,
        slot: TrackSlot,
        enabled: bool,
    ) {
        if let Some(state) = self.animation_state_on_track_mut(handle, slot) {
            state.set_enabled(enabled);
        }
    }

    /// Enables or disables the state on `slot` throughout the subtree.
    pub fn set_all_animation_enabled_on_track(
        &mut self,
        handle: NodeHandle,
        slot: TrackSlot,
        enabled: bool,
    ) {
        for current in self.subtree(handle) {
            self.set_animation_enabled_on_track(current, slot, enabled);
        }
    }

    /// Enables or disables every state of this node.
    pub fn set_animation_enabled(&mut self, handle: NodeHandle, enabled: bool) {
        self.edit_animation(handle, |animation| {
            for state in animation.states_mut() {
                state.set_enabled(enabled);
            }
        });
    }

    /// Enables or disables every state throughout the subtree.
    pub fn set_all_animation_enabled(&mut self, handle: NodeHandle, enabled: bool) {
        for current in self.subtree(handle) {
            self.set_animation_enabled(current, enabled);
        }
    }

    #[must_use]
    pub fn is_animation_enabled_on_track(&self, handle: NodeHandle, slot: TrackSlot) -> bool {
        self.animation_state_on_track(handle, slot)
            .is_some_and(AnimationState::is_enabled)
    }

    /// Allows or forbids every state of this node from driving `channels`.
    pub fn set_channel_animation_enabled(
        &mut self,
        handle: NodeHandle,
        channels: PoseChannels,
        enabled: bool,
    ) {
        self.edit_animation(handle, |animation| {
            for state in animation.states_mut() {
                state.set_channel_enabled(channels, enabled);
            }
        });
    }

    pub fn set_all_channel_animation_enabled(
        &mut self,
        handle: NodeHandle,
        channels: PoseChannels,
        enabled: bool,
    ) {
        for current in self.subtree(handle) {
            self.set_channel_animation_enabled(current, channels, enabled);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// `true` if any node in the subtree has a state on `slot`.
    #[must_use]
    pub fn contains_animation_on_track(&self, handle: NodeHandle, slot: TrackSlot) -> bool {
        self.subtree(handle)
            .into_iter()
            .any(|current| self.animation_state_on_track(current, slot).is_some())
    }

    /// `true` if any node in the subtree has any animation state.
    #[must_use]
    pub fn contains_animation(&self, handle: NodeHandle) -> bool {
        self.subtree(handle).into_iter().any(|current| {
            self.nodes
                .get(current)
                .is_some_and(|node| !node.animation.is_empty())
        })
    }

    /// `true` if any state on this node is enabled and driving a property.
    #[must_use]
    pub fn is_animating(&self, handle: NodeHandle) -> bool {
        self.nodes.get(handle).is_some_and(|node| {
            node.animation.states().iter().any(AnimationState::is_animating)
        })
    }

    // ========================================================================
    // Freezing
    // ========================================================================

    /// Pins the node's current pose onto `slot` when it has no animation
    /// there, so blending on that slot holds the node still. An existing
    /// frozen track on the slot is refreshed from the current pose.
    pub fn freeze_if_inanimate_on_track(&mut self, handle: NodeHandle, slot: TrackSlot) {
        let refresh = self
            .animation_on_track(handle, slot)
            .is_none_or(|track| matches!(track.as_ref(), KeyframeTrack::Frozen(_)));
        if !refresh {
            return;
        }

        let Some(pose) = self.pose(handle) else {
            return;
        };
        let frozen = Arc::new(KeyframeTrack::from(FrozenTrack::from_pose(&pose)));
        self.add_animation(handle, frozen, slot);
    }

    pub fn freeze_all_inanimates_on_track(&mut self, handle: NodeHandle, slot: TrackSlot) {
        for current in self.subtree(handle) {
            self.freeze_if_inanimate_on_track(current, slot);
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Describes every animated node in the subtree at `frame_count` evenly
    /// spaced times of `slot`.
    pub fn describe_animation_state_for_frames(
        &mut self,
        handle: NodeHandle,
        slot: TrackSlot,
        frame_count: usize,
        start_time: f32,
        end_time: f32,
    ) -> String {
        let mut desc = String::new();
        for current in self.subtree(handle) {
            let Some(name) = self.nodes.get(current).map(|node| node.name.clone()) else {
                continue;
            };
            let Some(state) = self.animation_state_on_track_mut(current, slot) else {
                continue;
            };
            let lines = state.describe_state_for_frames(frame_count, start_time, end_time);
            let _ = writeln!(desc, "{name}: {lines}");
        }
        desc
    }
}
