//! Animation extraction (scene clip -> bone tracks + node hierarchy)

use glam::Mat4;
use nui_common::{
    Animation, Bone, BoneTable, KeyPosition, KeyRotation, KeyScale, Matrix4, NodeData,
    IDENTITY_MATRIX,
};

use crate::scene::{NodeChannel, SceneAnimation, SceneNode};

/// Convert one clip.
///
/// Every channel becomes a bone track. Channels targeting a node the meshes
/// never referenced are appended to `bones` with an identity inverse-bind
/// matrix, so the clip's own bone table only ever holds entries copied from
/// the model table.
pub fn extract_animation(
    animation: &SceneAnimation,
    root: &SceneNode,
    bones: &mut BoneTable,
) -> Animation {
    let root_node = mirror_hierarchy(root);
    let mut tracks = Vec::with_capacity(animation.channels.len());
    let mut bone_ids = BoneTable::new();

    for channel in &animation.channels {
        if !bones.contains(&channel.node_name) {
            tracing::debug!(
                "Clip '{}': node '{}' has no skin bone, adding it",
                animation.name,
                channel.node_name
            );
        }
        let info = bones.get_or_insert(&channel.node_name, IDENTITY_MATRIX);

        let local_transform = root_node
            .find(&channel.node_name)
            .map(|node| node.transformation)
            .unwrap_or(IDENTITY_MATRIX);

        tracks.push(build_track(channel, info.id, local_transform));
        bone_ids.insert(&channel.node_name, info);
    }

    Animation {
        duration: animation.duration,
        ticks_per_second: animation.ticks_per_second,
        bones: tracks,
        root_node,
        bone_ids,
    }
}

/// Copy the full transform hierarchy below `node`
pub fn mirror_hierarchy(node: &SceneNode) -> NodeData {
    NodeData {
        name: node.name.clone(),
        transformation: node.transform,
        children: node.children.iter().map(mirror_hierarchy).collect(),
    }
}

/// Build a track, replacing each empty key list with a single key taken
/// from the bind-pose `local_transform`.
fn build_track(channel: &NodeChannel, id: i32, local_transform: Matrix4) -> Bone {
    // Stored row-major; glam wants columns
    let (scale, rotation, translation) = Mat4::from_cols_array(&local_transform)
        .transpose()
        .to_scale_rotation_translation();

    let mut positions: Vec<KeyPosition> = channel
        .position_keys
        .iter()
        .map(|key| KeyPosition {
            position: key.value,
            time_stamp: key.time,
        })
        .collect();
    if positions.is_empty() {
        positions.push(KeyPosition {
            position: translation.to_array(),
            time_stamp: 0.0,
        });
    }

    let mut rotations: Vec<KeyRotation> = channel
        .rotation_keys
        .iter()
        .map(|key| KeyRotation {
            orientation: key.value,
            time_stamp: key.time,
        })
        .collect();
    if rotations.is_empty() {
        rotations.push(KeyRotation {
            orientation: rotation.to_array(),
            time_stamp: 0.0,
        });
    }

    let mut scales: Vec<KeyScale> = channel
        .scaling_keys
        .iter()
        .map(|key| KeyScale {
            scale: key.value,
            time_stamp: key.time,
        })
        .collect();
    if scales.is_empty() {
        scales.push(KeyScale {
            scale: scale.to_array(),
            time_stamp: 0.0,
        });
    }

    Bone {
        name: channel.node_name.clone(),
        id,
        positions,
        rotations,
        scales,
        local_transform,
    }
}
