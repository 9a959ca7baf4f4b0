#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod errors;
pub mod math;
pub mod scene;
pub mod settings;
pub mod skinning;

pub use animation::{
    AnimationState, DenseTrack, FrozenTrack, KeyframeTrack, LoopMode, Pose, PoseChannels,
    SegmentTrack, TrackSlot,
};
pub use errors::{Result, SinewError};
pub use scene::{Node, NodeHandle, NodeRole, Scene, SceneNode, SkinKey, Transform};
pub use settings::SkinningSettings;
pub use skinning::{DeformedFaceCache, Face, MatrixSpace, SkinGeometry, SkinSection, SkinnedMesh};
