//! Bone table and per-vertex bone weights
//!
//! Bones are identified by name across the whole model. The first mesh that
//! mentions a bone fixes its id and inverse-bind matrix.

use nui_common::{BoneTable, Vertex};

use crate::mesh::ExtractError;
use crate::scene::SceneBone;

/// Register `bones` in `table` and write their weights into `vertices`.
///
/// Each weight lands in the vertex's first empty slot; once all four are
/// taken further weights are dropped. Returns the number of dropped weights.
pub fn attach_bone_weights(
    mesh_name: &str,
    vertices: &mut [Vertex],
    bones: &[SceneBone],
    table: &mut BoneTable,
) -> Result<usize, ExtractError> {
    let mut dropped = 0;
    let count = vertices.len();

    for bone in bones {
        let info = table.get_or_insert(&bone.name, bone.offset_matrix);

        for weight in &bone.weights {
            let vertex = vertices.get_mut(weight.vertex_id as usize).ok_or_else(|| {
                ExtractError::IndexOutOfRange {
                    mesh: mesh_name.to_string(),
                    index: weight.vertex_id,
                    count,
                }
            })?;
            if !vertex.attach_influence(info.id, weight.weight) {
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        tracing::debug!(
            "Mesh '{}': dropped {} bone weights beyond {} per vertex",
            mesh_name,
            dropped,
            nui_common::MAX_BONE_INFLUENCES
        );
    }

    Ok(dropped)
}
