//! Compile pipeline: scene -> asset model -> `.nui` bytes

use anyhow::{Context, Result};
use nui_common::{encode_model, AssetModel, BoneTable, PrimitiveType};
use std::path::Path;

use crate::animation::extract_animation;
use crate::config::ExportConfig;
use crate::import::import_scene;
use crate::mesh::{extract_node_meshes, ExtractError};
use crate::scene::Scene;

/// Build the in-memory model for a scene.
///
/// Geometry is walked depth-first from the root, registering bones as
/// meshes mention them; animations are converted afterwards so that channel
/// nodes already known as skin bones keep their ids. An incomplete scene or
/// one without a root yields an empty model.
pub fn build_model(scene: &Scene, config: &ExportConfig) -> Result<AssetModel, ExtractError> {
    let mut model = AssetModel::new();
    model.primitive = PrimitiveType::Triangles;

    let root = match (&scene.root, scene.incomplete) {
        (Some(root), false) => root,
        _ => {
            tracing::warn!("Scene is incomplete or has no root node, emitting empty model");
            return Ok(model);
        }
    };

    let mut bones = BoneTable::new();
    extract_node_meshes(
        root,
        scene,
        &mut bones,
        &config.texture_prefix,
        &mut model.submeshes,
    )?;

    for animation in &scene.animations {
        let clip = extract_animation(animation, root, &mut bones);
        model.add_animation(animation.name.clone(), clip);
    }

    model.bones = bones;
    Ok(model)
}

/// Build, rig if needed, and encode
pub fn compile_scene(scene: &Scene, config: &ExportConfig) -> Result<Vec<u8>> {
    let mut model = build_model(scene, config)?;

    if model.ensure_rigged() {
        tracing::info!("Animated model has no skinned vertices, binding all vertices to bone 0");
    }

    let bytes = encode_model(&model).context("Failed to encode model")?;
    tracing::debug!(
        "Encoded {} submeshes, {} bones, {} animations ({} bytes)",
        model.submeshes.len(),
        model.bones.len(),
        model.animation_count(),
        bytes.len()
    );
    Ok(bytes)
}

/// Import and compile one model file.
///
/// A file the importer cannot read compiles to the empty model.
pub fn compile_file(path: &Path, config: &ExportConfig) -> Result<Vec<u8>> {
    let scene = match import_scene(path) {
        Ok(scene) => scene,
        Err(e) => {
            tracing::warn!("Failed to import {:?}: {:#}", path, e);
            Scene::failed()
        }
    };
    compile_scene(&scene, config).with_context(|| format!("Failed to compile {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{
        Face, NodeChannel, SceneAnimation, SceneBone, SceneMesh, SceneNode, VertexWeight,
    };
    use nui_common::{decode_model, BoneInfluence, IDENTITY_MATRIX};

    fn triangle(name: &str) -> SceneMesh {
        SceneMesh {
            name: name.into(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![Face::triangle(0, 1, 2)],
            ..Default::default()
        }
    }

    fn skinned_scene() -> Scene {
        let mut body = triangle("body");
        body.bones = vec![
            SceneBone {
                name: "spine".into(),
                offset_matrix: IDENTITY_MATRIX,
                weights: vec![VertexWeight {
                    vertex_id: 0,
                    weight: 1.0,
                }],
            },
            SceneBone {
                name: "head".into(),
                offset_matrix: IDENTITY_MATRIX,
                weights: vec![VertexWeight {
                    vertex_id: 2,
                    weight: 1.0,
                }],
            },
        ];
        let mut root = SceneNode::new("root");
        root.meshes.push(0);
        root.children.push(SceneNode::new("spine"));
        Scene {
            meshes: vec![body],
            root: Some(root),
            animations: vec![SceneAnimation {
                name: "idle".into(),
                duration: 10.0,
                ticks_per_second: 30.0,
                channels: vec![NodeChannel {
                    node_name: "head".into(),
                    ..Default::default()
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_failed_scene_is_empty_model() {
        let model = build_model(&Scene::failed(), &ExportConfig::default()).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.primitive, PrimitiveType::Triangles);

        let rootless = Scene {
            meshes: vec![triangle("orphan")],
            ..Default::default()
        };
        assert!(build_model(&rootless, &ExportConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_bone_ids_stable_across_runs() {
        let scene = skinned_scene();
        let config = ExportConfig::default();
        let first = build_model(&scene, &config).unwrap();
        let second = build_model(&scene, &config).unwrap();

        assert_eq!(first.bones, second.bones);
        assert_eq!(first.bones.get("spine").unwrap().id, 0);
        assert_eq!(first.bones.get("head").unwrap().id, 1);
        assert_eq!(
            compile_scene(&scene, &config).unwrap(),
            compile_scene(&scene, &config).unwrap()
        );
    }

    #[test]
    fn test_clip_reuses_skin_bone_id() {
        let model = build_model(&skinned_scene(), &ExportConfig::default()).unwrap();
        let clip = model.animation("idle").unwrap();
        assert_eq!(clip.bones[0].id, 1);
        assert_eq!(clip.bone_ids.get("head"), model.bones.get("head"));
        assert_eq!(model.bones.len(), 2);
    }

    #[test]
    fn test_unrigged_animation_gets_trivial_rig() {
        let mut scene = skinned_scene();
        scene.meshes[0].bones.clear();
        let bytes = compile_scene(&scene, &ExportConfig::default()).unwrap();
        let model = decode_model(&bytes).unwrap();

        for vertex in &model.submeshes[0].vertices {
            assert_eq!(
                vertex.influences[0],
                Some(BoneInfluence {
                    bone_id: 0,
                    weight: 1.0
                })
            );
        }
    }

    #[test]
    fn test_static_model_stays_unrigged() {
        let mut scene = skinned_scene();
        scene.meshes[0].bones.clear();
        scene.animations.clear();
        let model = build_model(&scene, &ExportConfig::default()).unwrap();
        assert!(!model.has_skinned_vertices());
        assert!(model.bones.is_empty());
    }

    #[test]
    fn test_unreadable_file_compiles_to_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gltf");
        std::fs::write(&path, "{ not json").unwrap();

        let bytes = compile_file(&path, &ExportConfig::default()).unwrap();
        // three zero counts + Triangles tag
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 4, 0, 0, 0]);
    }
}
