//! Serialization tests (`serde` feature)
//!
//! Tests for:
//! - SkinningSettings round trip and partial documents
//! - PoseChannels, Pose, TrackSlot and NodeRole round trips

#![cfg(feature = "serde")]

use glam::{Quat, Vec3};
use sinew::{LoopMode, NodeRole, Pose, PoseChannels, SkinningSettings, TrackSlot};

#[test]
fn settings_round_trip() -> anyhow::Result<()> {
    let settings = SkinningSettings::default()
        .with_max_bones_per_section(32)
        .with_cache_deformed_faces(false)
        .with_interpolation_epsilon(0.25);

    let json = serde_json::to_string(&settings)?;
    let back: SkinningSettings = serde_json::from_str(&json)?;
    assert_eq!(back, settings);
    Ok(())
}

#[test]
fn settings_fill_missing_fields_with_defaults() -> anyhow::Result<()> {
    let settings: SkinningSettings = serde_json::from_str(r#"{ "max_bones_per_section": 24 }"#)?;
    assert_eq!(settings.max_bones_per_section, 24);
    assert_eq!(
        settings.max_influences_per_vertex,
        SkinningSettings::default().max_influences_per_vertex
    );
    assert!(settings.cache_deformed_faces);
    Ok(())
}

#[test]
fn pose_channels_round_trip() -> anyhow::Result<()> {
    for channels in [
        PoseChannels::empty(),
        PoseChannels::LOCATION | PoseChannels::SCALE,
        PoseChannels::all(),
    ] {
        let json = serde_json::to_string(&channels)?;
        let back: PoseChannels = serde_json::from_str(&json)?;
        assert_eq!(back, channels);
    }
    Ok(())
}

#[test]
fn pose_and_identifiers_round_trip() -> anyhow::Result<()> {
    let pose = Pose::new(Vec3::new(1.0, -2.0, 0.5), Quat::from_rotation_z(0.3), Vec3::splat(2.0));
    let back: Pose = serde_json::from_str(&serde_json::to_string(&pose)?)?;
    assert_eq!(back, pose);

    let slot: TrackSlot = serde_json::from_str(&serde_json::to_string(&TrackSlot::new(7))?)?;
    assert_eq!(slot, TrackSlot::new(7));

    let role: NodeRole = serde_json::from_str(&serde_json::to_string(&NodeRole::SkeletonRoot)?)?;
    assert_eq!(role, NodeRole::SkeletonRoot);

    let mode: LoopMode = serde_json::from_str(&serde_json::to_string(&LoopMode::PingPong)?)?;
    assert_eq!(mode, LoopMode::PingPong);
    Ok(())
}
