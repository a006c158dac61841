//! Parsed scene graph handed to the extractors
//!
//! Importers (glTF, OBJ) fill these plain values; the extractors never see
//! the source file format. Matrices are row-major.

use nui_common::{Matrix4, IDENTITY_MATRIX};

#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Set when the parser could not produce a usable scene
    pub incomplete: bool,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
    pub root: Option<SceneNode>,
    pub animations: Vec<SceneAnimation>,
}

impl Scene {
    /// The value standing for a failed or partial parse
    pub fn failed() -> Self {
        Self {
            incomplete: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    /// First UV channel
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    /// Triangulated by the importer
    pub faces: Vec<Face>,
    pub material_index: Option<usize>,
    pub bones: Vec<SceneBone>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Face {
    pub indices: Vec<u32>,
}

impl Face {
    pub fn triangle(a: u32, b: u32, c: u32) -> Self {
        Self {
            indices: vec![a, b, c],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex_id: u32,
    pub weight: f32,
}

/// A bone as seen by one mesh: its bind data and the vertices it moves
#[derive(Debug, Clone)]
pub struct SceneBone {
    pub name: String,
    /// Inverse-bind matrix
    pub offset_matrix: Matrix4,
    pub weights: Vec<VertexWeight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureChannel {
    Ambient,
    Diffuse,
    Specular,
    Normals,
}

#[derive(Debug, Clone, Default)]
pub struct SceneMaterial {
    pub name: String,
    pub ambient: Option<String>,
    pub diffuse: Option<String>,
    pub specular: Option<String>,
    pub normals: Option<String>,
}

impl SceneMaterial {
    /// Texture reference of the first texture in `channel`
    pub fn texture(&self, channel: TextureChannel) -> Option<&str> {
        match channel {
            TextureChannel::Ambient => self.ambient.as_deref(),
            TextureChannel::Diffuse => self.diffuse.as_deref(),
            TextureChannel::Specular => self.specular.as_deref(),
            TextureChannel::Normals => self.normals.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Matrix4,
    /// Indices into [`Scene::meshes`]
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: IDENTITY_MATRIX,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorKey {
    pub time: f32,
    pub value: [f32; 3],
}

/// Rotation key, quaternion `[x, y, z, w]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuatKey {
    pub time: f32,
    pub value: [f32; 4],
}

/// Keyframes targeting one node
#[derive(Debug, Clone, Default)]
pub struct NodeChannel {
    pub node_name: String,
    pub position_keys: Vec<VectorKey>,
    pub rotation_keys: Vec<QuatKey>,
    pub scaling_keys: Vec<VectorKey>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneAnimation {
    pub name: String,
    /// Length in ticks
    pub duration: f32,
    pub ticks_per_second: f32,
    pub channels: Vec<NodeChannel>,
}
