//! Geometry extraction (scene mesh -> submesh)

use nui_common::{BoneTable, Submesh, Vertex, MAX_SUBMESH_VERTICES};
use thiserror::Error;

use crate::material::resolve_material;
use crate::scene::{Scene, SceneMaterial, SceneMesh, SceneNode};
use crate::skeleton::attach_bone_weights;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(
        "mesh '{mesh}' has {count} vertices, more than {} addressable by u16 indices",
        MAX_SUBMESH_VERTICES
    )]
    TooManyVertices { mesh: String, count: usize },
    #[error("mesh '{mesh}' references vertex {index} but only has {count}")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        count: usize,
    },
}

/// Convert one scene mesh into a submesh, registering its bones in `bones`.
pub fn extract_submesh(
    mesh: &SceneMesh,
    materials: &[SceneMaterial],
    bones: &mut BoneTable,
    texture_prefix: &str,
) -> Result<Submesh, ExtractError> {
    let count = mesh.positions.len();
    if count > MAX_SUBMESH_VERTICES {
        return Err(ExtractError::TooManyVertices {
            mesh: mesh.name.clone(),
            count,
        });
    }

    let mut vertices = build_vertices(mesh);

    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
    for index in mesh.faces.iter().flat_map(|face| face.indices.iter().copied()) {
        if index as usize >= count {
            return Err(ExtractError::IndexOutOfRange {
                mesh: mesh.name.clone(),
                index,
                count,
            });
        }
        // Bounded by the vertex count check above
        indices.push(index as u16);
    }

    attach_bone_weights(&mesh.name, &mut vertices, &mesh.bones, bones)?;

    let material = mesh
        .material_index
        .and_then(|i| materials.get(i))
        .map(|m| resolve_material(m, texture_prefix));

    Ok(Submesh {
        vertices,
        indices,
        material,
    })
}

/// Vertices with every bone slot empty
fn build_vertices(mesh: &SceneMesh) -> Vec<Vertex> {
    let at3 = |attr: &Option<Vec<[f32; 3]>>, i: usize| {
        attr.as_ref()
            .and_then(|values| values.get(i))
            .copied()
            .unwrap_or_default()
    };

    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let mut vertex = Vertex {
                position,
                normal: at3(&mesh.normals, i),
                ..Default::default()
            };
            // Tangent frame only makes sense with texture coordinates
            if let Some(uvs) = &mesh.tex_coords {
                vertex.uv = uvs.get(i).copied().unwrap_or_default();
                vertex.tangent = at3(&mesh.tangents, i);
                vertex.bitangent = at3(&mesh.bitangents, i);
            }
            vertex
        })
        .collect()
}

/// Depth-first walk appending one submesh per mesh reference, in node order.
pub fn extract_node_meshes(
    node: &SceneNode,
    scene: &Scene,
    bones: &mut BoneTable,
    texture_prefix: &str,
    submeshes: &mut Vec<Submesh>,
) -> Result<(), ExtractError> {
    for &mesh_index in &node.meshes {
        let Some(mesh) = scene.meshes.get(mesh_index) else {
            tracing::warn!(
                "Node '{}' references missing mesh {}, skipping",
                node.name,
                mesh_index
            );
            continue;
        };
        submeshes.push(extract_submesh(
            mesh,
            &scene.materials,
            bones,
            texture_prefix,
        )?);
    }

    for child in &node.children {
        extract_node_meshes(child, scene, bones, texture_prefix, submeshes)?;
    }

    Ok(())
}
