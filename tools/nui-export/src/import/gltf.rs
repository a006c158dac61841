//! glTF/GLB scene import
//!
//! Keyframe times are converted to milliseconds, so every clip runs at
//! [`GLTF_TICKS_PER_SECOND`].

use anyhow::{Context, Result};
use hashbrown::HashMap;
use nui_common::{Matrix4, IDENTITY_MATRIX};
use std::path::Path;

use super::tangents::{compute_tangents, frame_from_tangent};
use crate::scene::{
    Face, NodeChannel, QuatKey, Scene, SceneAnimation, SceneBone, SceneMaterial, SceneMesh,
    SceneNode, VectorKey, VertexWeight,
};

/// Tick rate of imported clips (times are stored in milliseconds)
pub const GLTF_TICKS_PER_SECOND: f32 = 1000.0;

/// Name of the synthetic root when the glTF scene has none
pub const DEFAULT_ROOT_NAME: &str = "RootNode";

/// Skin data resolved for one node: joint names and inverse-bind matrices
struct SkinJoints {
    names: Vec<String>,
    inverse_binds: Vec<Matrix4>,
}

/// Load a `.gltf` or `.glb` file.
///
/// Only buffers are loaded; images are referenced by URI or name and never
/// decoded.
pub fn import_gltf(path: &Path) -> Result<Scene> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(path).with_context(|| format!("Failed to load glTF: {:?}", path))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .with_context(|| format!("Failed to load glTF buffers: {:?}", path))?;

    let mut scene = Scene {
        materials: document.materials().map(convert_material).collect(),
        ..Default::default()
    };

    let gltf_scene = document.default_scene().or_else(|| document.scenes().next());
    let mut root = SceneNode::new(
        gltf_scene
            .as_ref()
            .and_then(|s| s.name())
            .unwrap_or(DEFAULT_ROOT_NAME),
    );
    if let Some(gltf_scene) = &gltf_scene {
        for node in gltf_scene.nodes() {
            root.children.push(convert_node(&node, &buffers, &mut scene)?);
        }
    }
    scene.root = Some(root);

    for animation in document.animations() {
        scene.animations.push(convert_animation(&animation, &buffers)?);
    }

    tracing::debug!(
        "Imported {:?}: {} meshes, {} materials, {} animations",
        path,
        scene.meshes.len(),
        scene.materials.len(),
        scene.animations.len()
    );

    Ok(scene)
}

fn buffer_data<'a>(buffers: &'a [gltf::buffer::Data], buffer: gltf::Buffer) -> Option<&'a [u8]> {
    buffers.get(buffer.index()).map(|data| data.0.as_slice())
}

/// Column-major glTF matrix -> row-major
pub fn row_major(columns: [[f32; 4]; 4]) -> Matrix4 {
    let mut m = [0.0; 16];
    for (c, column) in columns.iter().enumerate() {
        for (r, value) in column.iter().enumerate() {
            m[r * 4 + c] = *value;
        }
    }
    m
}

fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()))
}

fn convert_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    scene: &mut Scene,
) -> Result<SceneNode> {
    let mut out = SceneNode::new(node_name(node));
    out.transform = row_major(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let skin = node.skin().map(|skin| read_skin(&skin, buffers));
        let base_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let primitive_count = mesh.primitives().len();

        for primitive in mesh.primitives() {
            let name = if primitive_count == 1 {
                base_name.clone()
            } else {
                format!("{}_{}", base_name, primitive.index())
            };
            let converted = convert_primitive(&primitive, buffers, name, skin.as_ref())?;
            if let Some(converted) = converted {
                out.meshes.push(scene.meshes.len());
                scene.meshes.push(converted);
            }
        }
    }

    for child in node.children() {
        out.children.push(convert_node(&child, buffers, scene)?);
    }

    Ok(out)
}

fn read_skin(skin: &gltf::Skin, buffers: &[gltf::buffer::Data]) -> SkinJoints {
    let names: Vec<String> = skin.joints().map(|joint| node_name(&joint)).collect();

    let reader = skin.reader(|buffer| buffer_data(buffers, buffer));
    let mut inverse_binds: Vec<Matrix4> = reader
        .read_inverse_bind_matrices()
        .map(|iter| iter.map(row_major).collect())
        .unwrap_or_default();
    // Missing matrices are identity
    inverse_binds.resize(names.len(), IDENTITY_MATRIX);

    SkinJoints {
        names,
        inverse_binds,
    }
}

fn convert_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    name: String,
    skin: Option<&SkinJoints>,
) -> Result<Option<SceneMesh>> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        tracing::warn!(
            "Skipping primitive of mesh '{}': {:?} is not a triangle list",
            name,
            primitive.mode()
        );
        return Ok(None);
    }

    let reader = primitive.reader(|buffer| buffer_data(buffers, buffer));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .with_context(|| format!("Mesh '{}' has no positions", name))?
        .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());
    let tex_coords: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|iter| iter.into_f32().collect());

    let indices: Vec<u32> = match reader.read_indices() {
        Some(iter) => iter.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let faces: Vec<Face> = indices
        .chunks_exact(3)
        .map(|tri| Face::triangle(tri[0], tri[1], tri[2]))
        .collect();

    let mut mesh = SceneMesh {
        name,
        material_index: primitive.material().index(),
        ..Default::default()
    };

    if let (Some(normals), Some(uvs)) = (&normals, &tex_coords) {
        let (tangents, bitangents): (Vec<[f32; 3]>, Vec<[f32; 3]>) = match reader.read_tangents() {
            Some(iter) => iter
                .zip(normals.iter())
                .map(|(tangent, &normal)| frame_from_tangent(normal, tangent))
                .unzip(),
            None => compute_tangents(&positions, normals, uvs, &faces),
        };
        mesh.tangents = Some(tangents);
        mesh.bitangents = Some(bitangents);
    }

    if let Some(skin) = skin {
        let joints: Option<Vec<[u16; 4]>> =
            reader.read_joints(0).map(|iter| iter.into_u16().collect());
        let weights: Option<Vec<[f32; 4]>> =
            reader.read_weights(0).map(|iter| iter.into_f32().collect());
        match (joints, weights) {
            (Some(joints), Some(weights)) => {
                mesh.bones = group_weights_by_joint(&joints, &weights, skin);
            }
            (None, None) => {}
            _ => tracing::warn!(
                "Mesh '{}' has partial skinning data (joints or weights missing), ignoring skinning",
                mesh.name
            ),
        }
    }

    mesh.positions = positions;
    mesh.normals = normals;
    mesh.tex_coords = tex_coords;
    mesh.faces = faces;

    Ok(Some(mesh))
}

/// Regroup per-vertex `JOINTS_0`/`WEIGHTS_0` into one weight list per joint.
///
/// Joints come out in skin order; joints with no non-zero weight are omitted.
fn group_weights_by_joint(
    joints: &[[u16; 4]],
    weights: &[[f32; 4]],
    skin: &SkinJoints,
) -> Vec<SceneBone> {
    let mut per_joint: Vec<Vec<VertexWeight>> = vec![Vec::new(); skin.names.len()];

    for (vertex_id, (joint_set, weight_set)) in joints.iter().zip(weights.iter()).enumerate() {
        for (&joint, &weight) in joint_set.iter().zip(weight_set.iter()) {
            if weight <= 0.0 {
                continue;
            }
            match per_joint.get_mut(joint as usize) {
                Some(list) => list.push(VertexWeight {
                    vertex_id: vertex_id as u32,
                    weight,
                }),
                None => tracing::warn!(
                    "Vertex {} references joint {} but the skin has {}",
                    vertex_id,
                    joint,
                    skin.names.len()
                ),
            }
        }
    }

    per_joint
        .into_iter()
        .enumerate()
        .filter(|(_, weights)| !weights.is_empty())
        .map(|(joint, weights)| SceneBone {
            name: skin.names[joint].clone(),
            offset_matrix: skin.inverse_binds[joint],
            weights,
        })
        .collect()
}

fn texture_reference(texture: gltf::Texture) -> Option<String> {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::Uri { uri, .. } => Some(uri.to_string()),
        gltf::image::Source::View { .. } => image.name().map(str::to_string),
    }
}

fn convert_material(material: gltf::Material) -> SceneMaterial {
    let name = match (material.name(), material.index()) {
        (Some(name), _) => name.to_string(),
        (None, Some(index)) => format!("material_{}", index),
        (None, None) => String::new(),
    };
    let pbr = material.pbr_metallic_roughness();

    SceneMaterial {
        name,
        ambient: material
            .occlusion_texture()
            .and_then(|info| texture_reference(info.texture())),
        diffuse: pbr
            .base_color_texture()
            .and_then(|info| texture_reference(info.texture())),
        specular: pbr
            .metallic_roughness_texture()
            .and_then(|info| texture_reference(info.texture())),
        normals: material
            .normal_texture()
            .and_then(|info| texture_reference(info.texture())),
    }
}

/// Keep the value of each (in-tangent, value, out-tangent) triple for
/// cubic-spline samplers.
fn sampler_values<T: Copy>(
    values: Vec<T>,
    interpolation: gltf::animation::Interpolation,
) -> Vec<T> {
    match interpolation {
        gltf::animation::Interpolation::CubicSpline => {
            values.chunks_exact(3).map(|triple| triple[1]).collect()
        }
        _ => values,
    }
}

fn convert_animation(
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
) -> Result<SceneAnimation> {
    use gltf::animation::util::ReadOutputs;

    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation_{}", animation.index()));

    let mut channels: Vec<NodeChannel> = Vec::new();
    let mut by_node: HashMap<usize, usize> = HashMap::new();
    let mut duration = 0.0f32;

    for channel in animation.channels() {
        let target = channel.target().node();
        let interpolation = channel.sampler().interpolation();
        let reader = channel.reader(|buffer| buffer_data(buffers, buffer));

        let times: Vec<f32> = reader
            .read_inputs()
            .with_context(|| format!("Animation '{}' has a channel without key times", name))?
            .map(|t| t * GLTF_TICKS_PER_SECOND)
            .collect();
        if let Some(&last) = times.last() {
            duration = duration.max(last);
        }

        let Some(outputs) = reader.read_outputs() else {
            tracing::warn!("Animation '{}': channel without output values, skipping", name);
            continue;
        };

        let slot = *by_node.entry(target.index()).or_insert_with(|| {
            channels.push(NodeChannel {
                node_name: node_name(&target),
                ..Default::default()
            });
            channels.len() - 1
        });
        let out = &mut channels[slot];

        match outputs {
            ReadOutputs::Translations(iter) => {
                let values = sampler_values(iter.collect(), interpolation);
                out.position_keys = times
                    .iter()
                    .zip(values)
                    .map(|(&time, value)| VectorKey { time, value })
                    .collect();
            }
            ReadOutputs::Rotations(rotations) => {
                let values = sampler_values(rotations.into_f32().collect(), interpolation);
                out.rotation_keys = times
                    .iter()
                    .zip(values)
                    .map(|(&time, value)| QuatKey { time, value })
                    .collect();
            }
            ReadOutputs::Scales(iter) => {
                let values = sampler_values(iter.collect(), interpolation);
                out.scaling_keys = times
                    .iter()
                    .zip(values)
                    .map(|(&time, value)| VectorKey { time, value })
                    .collect();
            }
            ReadOutputs::MorphTargetWeights(_) => {}
        }
    }

    Ok(SceneAnimation {
        name,
        duration,
        ticks_per_second: GLTF_TICKS_PER_SECOND,
        channels,
    })
}
