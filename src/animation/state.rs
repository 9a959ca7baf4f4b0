use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::animation::tracks::KeyframeTrack;
use crate::animation::values::{Pose, PoseChannels};
use crate::scene::NodeHandle;

/// Identifies one logical animation track across a whole node tree.
///
/// Slot `0` is the default track used by content that only ever carries
/// a single animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackSlot(u32);

impl TrackSlot {
    pub const DEFAULT: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track #{}", self.0)
    }
}

/// Hands out fresh, strictly increasing track slots.
///
/// The first generated slot is `1`; `0` stays reserved for [`TrackSlot::DEFAULT`].
#[derive(Debug, Default)]
pub struct TrackSlotAllocator {
    last: u32,
}

impl TrackSlotAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self) -> TrackSlot {
        debug_assert!(self.last < u32::MAX, "track slot space exhausted");
        self.last = self.last.saturating_add(1);
        log::debug!("Generated animation {}", TrackSlot(self.last));
        TrackSlot(self.last)
    }

    /// The most recently generated slot, or the default slot if none was.
    #[must_use]
    pub fn last_generated(&self) -> TrackSlot {
        TrackSlot(self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopMode {
    Once,
    #[default]
    Loop,
    PingPong,
}

/// Playback of one track on one node.
///
/// The state samples its track at the current normalized time and keeps the
/// result in [`pose`](Self::pose) for the owning node to blend.
#[derive(Debug, Clone)]
pub struct AnimationState {
    node: NodeHandle,
    track: Arc<KeyframeTrack>,
    slot: TrackSlot,

    enabled: bool,
    channels: PoseChannels,
    blend_weight: f32,
    time: f32,
    /// Unfolded playback position in `[0, 2)`; the second half runs backward.
    cycle: f32,
    pose: Pose,

    /// Seconds one pass over the track takes when driven by `Scene::update`.
    pub duration: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
    pub paused: bool,
}

impl AnimationState {
    /// Creates an enabled state with full weight, established at time zero.
    #[must_use]
    pub fn new(node: NodeHandle, track: Arc<KeyframeTrack>, slot: TrackSlot) -> Self {
        let mut state = Self {
            node,
            track,
            slot,
            enabled: true,
            channels: PoseChannels::all(),
            blend_weight: 1.0,
            time: 0.0,
            cycle: 0.0,
            pose: Pose::IDENTITY,
            duration: 1.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Loop,
            paused: false,
        };
        state.establish_pose_at(0.0);
        state
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeHandle {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn track(&self) -> &Arc<KeyframeTrack> {
        &self.track
    }

    #[inline]
    #[must_use]
    pub fn slot(&self) -> TrackSlot {
        self.slot
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.track.frame_count()
    }

    // ========================================================================
    // Enablement & weight
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    #[inline]
    #[must_use]
    pub fn blend_weight(&self) -> f32 {
        self.blend_weight
    }

    /// Sets the blend weight, clamped to `[0, 1]`.
    pub fn set_blend_weight(&mut self, weight: f32) {
        self.blend_weight = weight.clamp(0.0, 1.0);
    }

    /// Channels this state is allowed to drive, before track coverage.
    #[inline]
    #[must_use]
    pub fn enabled_channels(&self) -> PoseChannels {
        self.channels
    }

    pub fn set_channel_enabled(&mut self, channels: PoseChannels, enabled: bool) {
        self.channels.set(channels, enabled);
    }

    /// Channels both enabled on the state and carried by its track.
    #[inline]
    #[must_use]
    pub fn animating_channels(&self) -> PoseChannels {
        self.channels & self.track.channels()
    }

    #[must_use]
    pub fn is_animating_location(&self) -> bool {
        self.animating_channels().contains(PoseChannels::LOCATION)
    }

    #[must_use]
    pub fn is_animating_quaternion(&self) -> bool {
        self.animating_channels().contains(PoseChannels::QUATERNION)
    }

    #[must_use]
    pub fn is_animating_scale(&self) -> bool {
        self.animating_channels().contains(PoseChannels::SCALE)
    }

    /// Enabled and driving at least one property.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.enabled && !self.animating_channels().is_empty()
    }

    // ========================================================================
    // Sampling
    // ========================================================================

    /// Moves the state to normalized time `t` and, when enabled, samples the
    /// animated properties into its pose.
    ///
    /// `t` is clamped to `[0, 1]`. Properties the state does not animate keep
    /// their previous values.
    pub fn establish_pose_at(&mut self, t: f32) {
        self.time = t.clamp(0.0, 1.0);
        self.cycle = self.time;
        self.sample();
    }

    fn sample(&mut self) {
        if !self.enabled {
            return;
        }

        let channels = self.animating_channels();
        if channels.is_empty() {
            return;
        }

        let sampled = self.track.pose_at(self.time);
        if channels.contains(PoseChannels::LOCATION) {
            self.pose.location = sampled.location;
        }
        if channels.contains(PoseChannels::QUATERNION) {
            self.pose.quaternion = sampled.quaternion;
        }
        if channels.contains(PoseChannels::SCALE) {
            self.pose.scale = sampled.scale;
        }
    }

    /// Advances playback by `dt` seconds.
    ///
    /// Returns `true` when the state moved and its pose was re-established.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.paused || !self.enabled {
            return false;
        }

        if self.duration <= 0.0 {
            return false;
        }

        // 1. Accumulate normalized time
        let step = dt * self.time_scale / self.duration;
        let mut t = self.time + step;

        // 2. Handle loop mode
        match self.loop_mode {
            LoopMode::Once => {
                if t >= 1.0 {
                    t = 1.0;
                    self.paused = true;
                } else if t < 0.0 {
                    t = 0.0;
                    self.paused = true;
                }
            }
            LoopMode::Loop => {
                if t >= 1.0 {
                    t %= 1.0;
                } else if t < 0.0 {
                    t = 1.0 + (t % 1.0);
                }
            }
            LoopMode::PingPong => {
                let mut cycle = (self.cycle + step) % 2.0;
                if cycle < 0.0 {
                    cycle += 2.0;
                }
                self.cycle = cycle;
                self.time = if cycle > 1.0 { 2.0 - cycle } else { cycle };
                self.sample();
                return true;
            }
        }

        self.establish_pose_at(t);
        true
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// One-line description of the current time and animated properties.
    #[must_use]
    pub fn describe_current_state(&self) -> String {
        let mut desc = format!("Time: {:.4}", self.time);
        if self.is_animating_location() {
            let _ = write!(desc, " Loc: {}", self.pose.location);
        }
        if self.is_animating_quaternion() {
            let _ = write!(desc, " Quat: {}", self.pose.quaternion);
        }
        if self.is_animating_scale() {
            let _ = write!(desc, " Scale: {}", self.pose.scale);
        }
        if !self.is_animating() {
            desc.push_str(" No animation enabled.");
        }
        desc
    }

    /// Describes the state at `frame_count` evenly spaced times across
    /// `[start_time, end_time]`, one line per frame.
    ///
    /// The state is re-established at its original time (and enablement)
    /// before returning.
    pub fn describe_state_for_frames(
        &mut self,
        frame_count: usize,
        start_time: f32,
        end_time: f32,
    ) -> String {
        let start_time = start_time.clamp(0.0, 1.0);
        let end_time = end_time.clamp(0.0, 1.0);
        let step = if frame_count > 1 {
            (end_time - start_time) / (frame_count - 1) as f32
        } else {
            0.0
        };

        let original_time = self.time;
        let original_cycle = self.cycle;
        let was_enabled = self.enabled;
        self.enabled = true;

        let mut desc = format!(
            "Animation {} over {frame_count} frames from {start_time:.4} to {end_time:.4}:",
            self.slot
        );
        for frame in 0..frame_count {
            self.establish_pose_at(start_time + step * frame as f32);
            let _ = write!(desc, "\n\t{}", self.describe_current_state());
        }

        self.establish_pose_at(original_time);
        self.cycle = original_cycle;
        self.enabled = was_enabled;
        desc
    }
}
