// src/animation/tracks.rs
use std::ops::Deref;
use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::animation::values::{Pose, PoseChannels, interpolate_frames};
use crate::errors::{Result, SinewError};

/// Fractions closer than this to either neighbouring frame snap onto it.
pub const DEFAULT_INTERPOLATION_EPSILON: f32 = 0.1;

/// Storage for one per-frame property array.
#[derive(Debug, Clone)]
pub enum FrameArray<T> {
    /// Allocated by the track itself and released by `deallocate_*`.
    Allocated(Vec<T>),
    /// Supplied by the caller. The track never releases it.
    Shared(Arc<[T]>),
}

impl<T> FrameArray<T> {
    #[inline]
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        matches!(self, Self::Allocated(_))
    }
}

impl<T> Deref for FrameArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match self {
            Self::Allocated(values) => values,
            Self::Shared(values) => values,
        }
    }
}

fn allocate<T: Copy>(
    slot: &mut Option<FrameArray<T>>,
    frame_count: usize,
    fill: T,
) -> Option<&mut [T]> {
    if frame_count == 0 {
        return None;
    }
    log::trace!(
        "Allocating {frame_count} frames of {}",
        std::any::type_name::<T>()
    );
    *slot = Some(FrameArray::Allocated(vec![fill; frame_count]));
    allocated_mut(slot)
}

fn allocated_mut<T>(slot: &mut Option<FrameArray<T>>) -> Option<&mut [T]> {
    match slot {
        Some(FrameArray::Allocated(values)) => Some(values.as_mut_slice()),
        _ => None,
    }
}

fn deallocate<T>(slot: &mut Option<FrameArray<T>>) {
    if slot.as_ref().is_some_and(FrameArray::is_allocated) {
        log::trace!("Releasing frames of {}", std::any::type_name::<T>());
        *slot = None;
    }
}

fn frame_value<T: Copy>(slot: Option<&FrameArray<T>>, index: usize, default: T) -> T {
    slot.and_then(|values| values.get(index.min(values.len().saturating_sub(1))).copied())
        .unwrap_or(default)
}

// ============================================================================
// Dense track
// ============================================================================

/// A track holding one value per frame for each animated property.
///
/// Frame times are optional: without them frames are spread uniformly
/// across `[0, 1]`. A property without an array is not animated.
#[derive(Debug, Clone)]
pub struct DenseTrack {
    frame_count: usize,
    frame_times: Option<FrameArray<f32>>,
    locations: Option<FrameArray<Vec3>>,
    quaternions: Option<FrameArray<Quat>>,
    scales: Option<FrameArray<Vec3>>,
    should_interpolate: bool,
    interpolation_epsilon: f32,
}

impl DenseTrack {
    #[must_use]
    pub fn new(frame_count: usize) -> Self {
        Self {
            frame_count,
            frame_times: None,
            locations: None,
            quaternions: None,
            scales: None,
            should_interpolate: true,
            interpolation_epsilon: DEFAULT_INTERPOLATION_EPSILON,
        }
    }

    #[must_use]
    pub fn with_frame_times(mut self, times: Vec<f32>) -> Self {
        debug_assert_eq!(times.len(), self.frame_count, "frame time count mismatch");
        self.frame_times = Some(FrameArray::Allocated(times));
        self
    }

    #[must_use]
    pub fn with_locations(mut self, locations: Vec<Vec3>) -> Self {
        debug_assert_eq!(locations.len(), self.frame_count, "location count mismatch");
        self.locations = Some(FrameArray::Allocated(locations));
        self
    }

    #[must_use]
    pub fn with_quaternions(mut self, quaternions: Vec<Quat>) -> Self {
        debug_assert_eq!(quaternions.len(), self.frame_count, "quaternion count mismatch");
        self.quaternions = Some(FrameArray::Allocated(quaternions));
        self
    }

    #[must_use]
    pub fn with_scales(mut self, scales: Vec<Vec3>) -> Self {
        debug_assert_eq!(scales.len(), self.frame_count, "scale count mismatch");
        self.scales = Some(FrameArray::Allocated(scales));
        self
    }

    #[must_use]
    pub fn with_interpolation(mut self, should_interpolate: bool) -> Self {
        self.should_interpolate = should_interpolate;
        self
    }

    #[must_use]
    pub fn with_interpolation_epsilon(mut self, epsilon: f32) -> Self {
        self.set_interpolation_epsilon(epsilon);
        self
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    #[must_use]
    pub fn should_interpolate(&self) -> bool {
        self.should_interpolate
    }

    pub fn set_should_interpolate(&mut self, should_interpolate: bool) {
        self.should_interpolate = should_interpolate;
    }

    #[inline]
    #[must_use]
    pub fn interpolation_epsilon(&self) -> f32 {
        self.interpolation_epsilon
    }

    pub fn set_interpolation_epsilon(&mut self, epsilon: f32) {
        self.interpolation_epsilon = epsilon.clamp(0.0, 0.5);
    }

    // ========================================================================
    // Frame arrays
    // ========================================================================

    /// Allocates zeroed frame times owned by the track.
    ///
    /// Returns `None` (and allocates nothing) for a track without frames.
    pub fn allocate_frame_times(&mut self) -> Option<&mut [f32]> {
        allocate(&mut self.frame_times, self.frame_count, 0.0)
    }

    pub fn allocate_locations(&mut self) -> Option<&mut [Vec3]> {
        allocate(&mut self.locations, self.frame_count, Vec3::ZERO)
    }

    /// Allocates quaternions initialized to identity.
    pub fn allocate_quaternions(&mut self) -> Option<&mut [Quat]> {
        allocate(&mut self.quaternions, self.frame_count, Quat::IDENTITY)
    }

    /// Allocates scales initialized to one.
    pub fn allocate_scales(&mut self) -> Option<&mut [Vec3]> {
        allocate(&mut self.scales, self.frame_count, Vec3::ONE)
    }

    /// Releases track-allocated frame times. Shared arrays are left in place.
    pub fn deallocate_frame_times(&mut self) {
        deallocate(&mut self.frame_times);
    }

    pub fn deallocate_locations(&mut self) {
        deallocate(&mut self.locations);
    }

    pub fn deallocate_quaternions(&mut self) {
        deallocate(&mut self.quaternions);
    }

    pub fn deallocate_scales(&mut self) {
        deallocate(&mut self.scales);
    }

    /// Points the track at caller-owned frame times, replacing whatever it held.
    pub fn set_frame_times(&mut self, times: Option<Arc<[f32]>>) {
        debug_assert!(times.as_ref().is_none_or(|t| t.len() == self.frame_count));
        self.frame_times = times.map(FrameArray::Shared);
    }

    pub fn set_locations(&mut self, locations: Option<Arc<[Vec3]>>) {
        debug_assert!(locations.as_ref().is_none_or(|v| v.len() == self.frame_count));
        self.locations = locations.map(FrameArray::Shared);
    }

    pub fn set_quaternions(&mut self, quaternions: Option<Arc<[Quat]>>) {
        debug_assert!(quaternions.as_ref().is_none_or(|v| v.len() == self.frame_count));
        self.quaternions = quaternions.map(FrameArray::Shared);
    }

    pub fn set_scales(&mut self, scales: Option<Arc<[Vec3]>>) {
        debug_assert!(scales.as_ref().is_none_or(|v| v.len() == self.frame_count));
        self.scales = scales.map(FrameArray::Shared);
    }

    #[must_use]
    pub fn frame_times(&self) -> Option<&FrameArray<f32>> {
        self.frame_times.as_ref()
    }

    #[must_use]
    pub fn locations(&self) -> Option<&FrameArray<Vec3>> {
        self.locations.as_ref()
    }

    #[must_use]
    pub fn quaternions(&self) -> Option<&FrameArray<Quat>> {
        self.quaternions.as_ref()
    }

    #[must_use]
    pub fn scales(&self) -> Option<&FrameArray<Vec3>> {
        self.scales.as_ref()
    }

    /// Mutable view of track-allocated frame times. Shared arrays are read-only.
    pub fn frame_times_mut(&mut self) -> Option<&mut [f32]> {
        allocated_mut(&mut self.frame_times)
    }

    pub fn locations_mut(&mut self) -> Option<&mut [Vec3]> {
        allocated_mut(&mut self.locations)
    }

    pub fn quaternions_mut(&mut self) -> Option<&mut [Quat]> {
        allocated_mut(&mut self.quaternions)
    }

    pub fn scales_mut(&mut self) -> Option<&mut [Vec3]> {
        allocated_mut(&mut self.scales)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn channels(&self) -> PoseChannels {
        let mut channels = PoseChannels::empty();
        channels.set(PoseChannels::LOCATION, self.locations.is_some());
        channels.set(PoseChannels::QUATERNION, self.quaternions.is_some());
        channels.set(PoseChannels::SCALE, self.scales.is_some());
        channels
    }

    #[must_use]
    pub fn time_at_frame(&self, frame_index: usize) -> f32 {
        match &self.frame_times {
            Some(times) => frame_value(Some(times), frame_index, 0.0),
            None => {
                let span = self.frame_count.saturating_sub(1).max(1) as f32;
                (frame_index as f32 / span).clamp(0.0, 1.0)
            }
        }
    }

    /// Index of the last frame whose time is at or before `t`.
    #[must_use]
    pub fn frame_index_at(&self, t: f32) -> usize {
        if self.frame_count == 0 {
            return 0;
        }

        if let Some(times) = &self.frame_times {
            // Backward scan: the last frame not after `t`.
            return times.iter().rposition(|&time| time <= t).unwrap_or(0);
        }

        let last = self.frame_count - 1;
        let mut index = ((last as f32) * t).max(0.0) as usize;
        index = index.min(last);

        // The product above can land a hair off an exact frame boundary.
        if index > 0 && self.time_at_frame(index) > t {
            index -= 1;
        }
        if index < last && self.time_at_frame(index + 1) <= t {
            index += 1;
        }
        index
    }

    #[must_use]
    pub fn location_at_frame(&self, frame_index: usize) -> Vec3 {
        frame_value(self.locations.as_ref(), frame_index, Vec3::ZERO)
    }

    #[must_use]
    pub fn quaternion_at_frame(&self, frame_index: usize) -> Quat {
        frame_value(self.quaternions.as_ref(), frame_index, Quat::IDENTITY)
    }

    #[must_use]
    pub fn scale_at_frame(&self, frame_index: usize) -> Vec3 {
        frame_value(self.scales.as_ref(), frame_index, Vec3::ONE)
    }

    /// Samples the pose at normalized time `t`.
    #[must_use]
    pub fn pose_at(&self, t: f32) -> Pose {
        if self.frame_count == 0 {
            return Pose::IDENTITY;
        }

        let mut index = self.frame_index_at(t);
        let mut fraction = 0.0;

        if self.should_interpolate && index + 1 < self.frame_count {
            let frame_time = self.time_at_frame(index);
            let frame_duration = self.time_at_frame(index + 1) - frame_time;
            if frame_duration != 0.0 {
                fraction = (t - frame_time) / frame_duration;
            }

            if fraction < self.interpolation_epsilon {
                fraction = 0.0;
            } else if 1.0 - fraction < self.interpolation_epsilon {
                fraction = 0.0;
                index += 1;
            }
        }

        Pose {
            location: interpolate_frames(
                self.location_at_frame(index),
                self.location_at_frame(index + 1),
                fraction,
            ),
            quaternion: interpolate_frames(
                self.quaternion_at_frame(index),
                self.quaternion_at_frame(index + 1),
                fraction,
            ),
            scale: interpolate_frames(
                self.scale_at_frame(index),
                self.scale_at_frame(index + 1),
                fraction,
            ),
        }
    }
}

// ============================================================================
// Frozen track
// ============================================================================

/// A single constant pose.
///
/// Properties left as `None` are not animated.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrozenTrack {
    pub location: Option<Vec3>,
    pub quaternion: Option<Quat>,
    pub scale: Option<Vec3>,
}

impl FrozenTrack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezes every property of `pose`.
    #[must_use]
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            location: Some(pose.location),
            quaternion: Some(pose.quaternion),
            scale: Some(pose.scale),
        }
    }

    #[must_use]
    pub fn channels(&self) -> PoseChannels {
        let mut channels = PoseChannels::empty();
        channels.set(PoseChannels::LOCATION, self.location.is_some());
        channels.set(PoseChannels::QUATERNION, self.quaternion.is_some());
        channels.set(PoseChannels::SCALE, self.scale.is_some());
        channels
    }

    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose {
            location: self.location.unwrap_or(Vec3::ZERO),
            quaternion: self.quaternion.unwrap_or(Quat::IDENTITY),
            scale: self.scale.unwrap_or(Vec3::ONE),
        }
    }
}

// ============================================================================
// Segment track
// ============================================================================

/// A window `[start_time, end_time]` onto a shared base track.
///
/// Queries at segment time `t` read the base at `start + (end - start) * t`.
#[derive(Debug, Clone)]
pub struct SegmentTrack {
    base: Arc<KeyframeTrack>,
    start_time: f32,
    end_time: f32,
}

impl SegmentTrack {
    /// A segment spanning the whole base track.
    #[must_use]
    pub fn new(base: Arc<KeyframeTrack>) -> Self {
        Self {
            base,
            start_time: 0.0,
            end_time: 1.0,
        }
    }

    /// Builds a segment over `[start_time, end_time]` of `base`.
    pub fn try_new(
        base: Option<Arc<KeyframeTrack>>,
        start_time: f32,
        end_time: f32,
    ) -> Result<Self> {
        let base = base.ok_or(SinewError::MissingBaseTrack)?;
        if !(0.0..=1.0).contains(&start_time) || !(0.0..=1.0).contains(&end_time) {
            return Err(SinewError::InvalidSegmentRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            base,
            start_time,
            end_time,
        })
    }

    /// Builds a segment spanning the base frames `start_frame..=end_frame`.
    pub fn try_from_frames(
        base: Option<Arc<KeyframeTrack>>,
        start_frame: usize,
        end_frame: usize,
    ) -> Result<Self> {
        let base = base.ok_or(SinewError::MissingBaseTrack)?;
        let start_time = base.time_at_frame(start_frame);
        let end_time = base.time_at_frame(end_frame);
        Self::try_new(Some(base), start_time, end_time)
    }

    #[inline]
    #[must_use]
    pub fn base(&self) -> &Arc<KeyframeTrack> {
        &self.base
    }

    #[inline]
    #[must_use]
    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    #[inline]
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    /// Moves the start of the window, clamped to `[0, 1]`.
    pub fn set_start_time(&mut self, start_time: f32) {
        self.start_time = start_time.clamp(0.0, 1.0);
    }

    /// Moves the end of the window, clamped to `[0, 1]`.
    pub fn set_end_time(&mut self, end_time: f32) {
        self.end_time = end_time.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn start_frame_index(&self) -> usize {
        self.base.frame_index_at(self.start_time)
    }

    #[must_use]
    pub fn end_frame_index(&self) -> usize {
        self.base.frame_index_at(self.end_time)
    }

    pub fn set_start_frame_index(&mut self, frame_index: usize) {
        self.start_time = self.base.time_at_frame(frame_index);
    }

    pub fn set_end_frame_index(&mut self, frame_index: usize) {
        self.end_time = self.base.time_at_frame(frame_index);
    }

    /// Maps segment time onto base-track time.
    #[inline]
    #[must_use]
    pub fn base_time(&self, t: f32) -> f32 {
        self.start_time + (self.end_time - self.start_time) * t
    }
}

// ============================================================================
// KeyframeTrack
// ============================================================================

/// The per-node animation data for one logical track.
///
/// Tracks are immutable once shared; segments of the same base share it
/// through an [`Arc`].
#[derive(Debug, Clone)]
pub enum KeyframeTrack {
    Dense(DenseTrack),
    Frozen(FrozenTrack),
    Segment(SegmentTrack),
}

impl From<DenseTrack> for KeyframeTrack {
    fn from(track: DenseTrack) -> Self {
        Self::Dense(track)
    }
}

impl From<FrozenTrack> for KeyframeTrack {
    fn from(track: FrozenTrack) -> Self {
        Self::Frozen(track)
    }
}

impl From<SegmentTrack> for KeyframeTrack {
    fn from(track: SegmentTrack) -> Self {
        Self::Segment(track)
    }
}

impl KeyframeTrack {
    #[must_use]
    pub fn frame_count(&self) -> usize {
        match self {
            Self::Dense(track) => track.frame_count(),
            Self::Frozen(_) => 1,
            Self::Segment(track) => track.base.frame_count(),
        }
    }

    #[must_use]
    pub fn should_interpolate(&self) -> bool {
        match self {
            Self::Dense(track) => track.should_interpolate(),
            Self::Frozen(_) => false,
            Self::Segment(track) => track.base.should_interpolate(),
        }
    }

    #[must_use]
    pub fn has_variable_frame_timing(&self) -> bool {
        match self {
            Self::Dense(track) => track.frame_times.is_some(),
            Self::Frozen(_) => false,
            Self::Segment(track) => track.base.has_variable_frame_timing(),
        }
    }

    /// The pose properties this track drives.
    #[must_use]
    pub fn channels(&self) -> PoseChannels {
        match self {
            Self::Dense(track) => track.channels(),
            Self::Frozen(track) => track.channels(),
            Self::Segment(track) => track.base.channels(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_animating(&self) -> bool {
        !self.channels().is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_animating_location(&self) -> bool {
        self.channels().contains(PoseChannels::LOCATION)
    }

    #[inline]
    #[must_use]
    pub fn is_animating_quaternion(&self) -> bool {
        self.channels().contains(PoseChannels::QUATERNION)
    }

    #[inline]
    #[must_use]
    pub fn is_animating_scale(&self) -> bool {
        self.channels().contains(PoseChannels::SCALE)
    }

    #[must_use]
    pub fn time_at_frame(&self, frame_index: usize) -> f32 {
        match self {
            Self::Dense(track) => track.time_at_frame(frame_index),
            Self::Frozen(_) => (frame_index as f32).clamp(0.0, 1.0),
            Self::Segment(track) => track.base.time_at_frame(frame_index),
        }
    }

    #[must_use]
    pub fn frame_index_at(&self, t: f32) -> usize {
        match self {
            Self::Dense(track) => track.frame_index_at(t),
            Self::Frozen(_) => 0,
            Self::Segment(track) => track.base.frame_index_at(track.base_time(t)),
        }
    }

    #[must_use]
    pub fn location_at_frame(&self, frame_index: usize) -> Vec3 {
        match self {
            Self::Dense(track) => track.location_at_frame(frame_index),
            Self::Frozen(track) => track.location.unwrap_or(Vec3::ZERO),
            Self::Segment(track) => track.base.location_at_frame(frame_index),
        }
    }

    #[must_use]
    pub fn quaternion_at_frame(&self, frame_index: usize) -> Quat {
        match self {
            Self::Dense(track) => track.quaternion_at_frame(frame_index),
            Self::Frozen(track) => track.quaternion.unwrap_or(Quat::IDENTITY),
            Self::Segment(track) => track.base.quaternion_at_frame(frame_index),
        }
    }

    #[must_use]
    pub fn scale_at_frame(&self, frame_index: usize) -> Vec3 {
        match self {
            Self::Dense(track) => track.scale_at_frame(frame_index),
            Self::Frozen(track) => track.scale.unwrap_or(Vec3::ONE),
            Self::Segment(track) => track.base.scale_at_frame(frame_index),
        }
    }

    /// Samples the pose at normalized time `t`.
    ///
    /// Properties the track does not animate come back at their defaults.
    #[must_use]
    pub fn pose_at(&self, t: f32) -> Pose {
        match self {
            Self::Dense(track) => track.pose_at(t),
            Self::Frozen(track) => track.pose(),
            Self::Segment(track) => track.base.pose_at(track.base_time(t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frame_count: usize) -> DenseTrack {
        let locations = (0..frame_count).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        DenseTrack::new(frame_count).with_locations(locations)
    }

    #[test]
    fn uniform_timing() {
        let track = ramp(5);
        assert!((track.time_at_frame(0)).abs() < 1e-6);
        assert!((track.time_at_frame(2) - 0.5).abs() < 1e-6);
        assert!((track.time_at_frame(9) - 1.0).abs() < 1e-6);

        assert_eq!(track.frame_index_at(0.0), 0);
        assert_eq!(track.frame_index_at(0.24), 0);
        assert_eq!(track.frame_index_at(0.25), 1);
        assert_eq!(track.frame_index_at(0.75), 3);
        assert_eq!(track.frame_index_at(1.0), 4);
    }

    #[test]
    fn explicit_times_scan_backward() {
        let track = ramp(4).with_frame_times(vec![0.0, 0.1, 0.2, 1.0]);
        assert_eq!(track.frame_index_at(0.05), 0);
        assert_eq!(track.frame_index_at(0.2), 2);
        assert_eq!(track.frame_index_at(0.99), 2);
        assert_eq!(track.frame_index_at(1.0), 3);
    }

    #[test]
    fn frame_getters_clamp() {
        let track = ramp(3);
        assert_eq!(track.location_at_frame(99), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(track.quaternion_at_frame(1), Quat::IDENTITY);
        assert_eq!(track.scale_at_frame(0), Vec3::ONE);
    }

    #[test]
    fn allocation_lifecycle() {
        let mut track = DenseTrack::new(3);
        assert!(track.allocate_quaternions().is_some_and(|q| q.iter().all(|q| *q == Quat::IDENTITY)));
        assert!(track.allocate_scales().is_some_and(|s| s.iter().all(|s| *s == Vec3::ONE)));

        let shared: Arc<[Vec3]> = Arc::from(vec![Vec3::X; 3]);
        track.set_locations(Some(shared));

        track.deallocate_quaternions();
        track.deallocate_locations();
        assert!(track.quaternions().is_none());
        // Caller-owned arrays survive deallocation.
        assert!(track.locations().is_some());
        assert!(track.locations_mut().is_none());

        let mut empty = DenseTrack::new(0);
        assert!(empty.allocate_locations().is_none());
        assert!(empty.locations().is_none());
    }

    #[test]
    fn segment_requires_base_and_valid_range() {
        assert_eq!(
            SegmentTrack::try_new(None, 0.0, 1.0).unwrap_err(),
            SinewError::MissingBaseTrack
        );

        let base = Arc::new(KeyframeTrack::from(ramp(3)));
        assert!(matches!(
            SegmentTrack::try_new(Some(base), 0.5, 1.5),
            Err(SinewError::InvalidSegmentRange { .. })
        ));
    }

    #[test]
    fn segment_setters_stay_in_range() {
        let mut segment = SegmentTrack::new(Arc::new(KeyframeTrack::from(ramp(5))));
        segment.set_start_time(-0.5);
        segment.set_end_time(1.5);
        assert!(segment.start_time().abs() < 1e-6);
        assert!((segment.end_time() - 1.0).abs() < 1e-6);

        segment.set_start_frame_index(1);
        segment.set_end_frame_index(3);
        assert!((segment.start_time() - 0.25).abs() < 1e-6);
        assert!((segment.end_time() - 0.75).abs() < 1e-6);
        assert_eq!(segment.start_frame_index(), 1);
        assert_eq!(segment.end_frame_index(), 3);

        // Past the last frame clamps onto it
        segment.set_end_frame_index(40);
        assert_eq!(segment.end_frame_index(), 4);
    }
}
