//! Keyframe tracks, per-node animation states and weighted blending.
//!
//! A [`KeyframeTrack`] stores the poses of one node over normalized time
//! `[0, 1]`. An [`AnimationState`] plays one track on one node under a
//! [`TrackSlot`], and a node's [`NodeAnimation`] blends its states into the
//! local pose.

pub mod mixer;
pub mod state;
pub mod tracks;
mod values;

pub use mixer::{BlendedPose, NodeAnimation};
pub use state::{AnimationState, LoopMode, TrackSlot, TrackSlotAllocator};
pub use tracks::{
    DEFAULT_INTERPOLATION_EPSILON, DenseTrack, FrameArray, FrozenTrack, KeyframeTrack,
    SegmentTrack,
};
pub use values::{Interpolatable, Pose, PoseChannels};
