//! Shared helpers for integration tests: programmatic GLB and OBJ fixtures.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::f32::consts::FRAC_1_SQRT_2;
use std::path::{Path, PathBuf};

const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;

/// Accumulates a binary buffer plus the buffer views and accessors that
/// describe it.
#[derive(Default)]
pub struct GlbBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_view(&mut self, bytes: &[u8]) -> usize {
        while !self.bin.len().is_multiple_of(4) {
            self.bin.push(0);
        }
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
        }));
        self.views.len() - 1
    }

    /// Float accessor; `type_` is `SCALAR`, `VEC2`, `VEC3`, `VEC4` or `MAT4`.
    /// Min/max are recorded for SCALAR and VEC3 data.
    pub fn floats(&mut self, data: &[f32], type_: &str) -> usize {
        let width = components(type_);
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.push_view(&bytes);

        let mut accessor = json!({
            "bufferView": view,
            "componentType": FLOAT,
            "count": data.len() / width,
            "type": type_,
        });
        if type_ == "SCALAR" || type_ == "VEC3" {
            let (min, max) = bounds(data, width);
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    /// Unsigned short accessor (indices, joints)
    pub fn u16s(&mut self, data: &[u16], type_: &str) -> usize {
        let width = components(type_);
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.push_view(&bytes);
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": UNSIGNED_SHORT,
            "count": data.len() / width,
            "type": type_,
        }));
        self.accessors.len() - 1
    }

    /// Fill in buffers/views/accessors of `document` and assemble the GLB
    pub fn finish(self, mut document: Value) -> Vec<u8> {
        document["asset"] = json!({ "version": "2.0" });
        document["buffers"] = json!([{ "byteLength": self.bin.len() }]);
        document["bufferViews"] = Value::Array(self.views);
        document["accessors"] = Value::Array(self.accessors);
        assemble_glb(&document, &self.bin)
    }
}

fn components(type_: &str) -> usize {
    match type_ {
        "SCALAR" => 1,
        "VEC2" => 2,
        "VEC3" => 3,
        "VEC4" => 4,
        "MAT4" => 16,
        other => panic!("unknown accessor type {other}"),
    }
}

fn bounds(data: &[f32], width: usize) -> (Vec<f32>, Vec<f32>) {
    let mut min = vec![f32::MAX; width];
    let mut max = vec![f32::MIN; width];
    for chunk in data.chunks_exact(width) {
        for (i, &v) in chunk.iter().enumerate() {
            min[i] = min[i].min(v);
            max[i] = max[i].max(v);
        }
    }
    (min, max)
}

/// Assemble the final GLB binary
pub fn assemble_glb(document: &Value, buffer_data: &[u8]) -> Vec<u8> {
    let json_string = serde_json::to_string(document).expect("Failed to serialize JSON");
    let json_bytes = json_string.as_bytes();

    // Pad JSON to 4-byte alignment
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;

    // Pad buffer to 4-byte alignment
    let buffer_padding = (4 - (buffer_data.len() % 4)) % 4;
    let buffer_chunk_length = buffer_data.len() + buffer_padding;

    let total_length = 12 + 8 + json_chunk_length + 8 + buffer_chunk_length;

    let mut glb = Vec::with_capacity(total_length);

    // Header
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    // JSON chunk
    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes());
    glb.extend_from_slice(json_bytes);
    glb.extend(std::iter::repeat_n(0x20u8, json_padding));

    // BIN chunk
    glb.extend_from_slice(&(buffer_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes());
    glb.extend_from_slice(buffer_data);
    glb.extend(std::iter::repeat_n(0u8, buffer_padding));

    glb
}

/// Height of the `Spine` joint above `Hip`
pub const SPINE_HEIGHT: f32 = 1.0;

/// A single skinned triangle driven by a two-joint skeleton.
///
/// Node layout (scene "Character"):
/// ```text
/// Hip (joint 0)
///   Spine (joint 1, translated +Y by SPINE_HEIGHT)
/// Body (mesh 0, skin 0)
/// ```
/// Vertex 0 follows Hip, vertex 1 is shared 50/50, vertex 2 follows Spine.
/// Animation "Wave" translates Spine and rotates Hip over one second.
pub fn skinned_triangle_glb() -> Vec<u8> {
    let mut b = GlbBuilder::new();

    let positions = b.floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0], "VEC3");
    let normals = b.floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0], "VEC3");
    let uvs = b.floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0], "VEC2");
    let joints = b.u16s(&[0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0], "VEC4");
    let weights = b.floats(
        &[
            1.0, 0.0, 0.0, 0.0, //
            0.5, 0.5, 0.0, 0.0, //
            1.0, 0.0, 0.0, 0.0,
        ],
        "VEC4",
    );
    let indices = b.u16s(&[0, 1, 2], "SCALAR");

    // Column-major inverse binds: identity for Hip, -SPINE_HEIGHT in Y for Spine
    #[rustfmt::skip]
    let ibm = [
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
        //
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, -SPINE_HEIGHT, 0.0, 1.0,
    ];
    let inverse_binds = b.floats(&ibm, "MAT4");

    let times = b.floats(&[0.0, 1.0], "SCALAR");
    let spine_translation = b.floats(&[0.0, 1.0, 0.0, 0.0, 1.5, 0.0], "VEC3");
    let hip_rotation = b.floats(
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2],
        "VEC4",
    );

    let document = json!({
        "scene": 0,
        "scenes": [{ "name": "Character", "nodes": [0, 2] }],
        "nodes": [
            { "name": "Hip", "children": [1] },
            { "name": "Spine", "translation": [0.0, SPINE_HEIGHT, 0.0] },
            { "name": "Body", "mesh": 0, "skin": 0 },
        ],
        "meshes": [{
            "name": "Body",
            "primitives": [{
                "attributes": {
                    "POSITION": positions,
                    "NORMAL": normals,
                    "TEXCOORD_0": uvs,
                    "JOINTS_0": joints,
                    "WEIGHTS_0": weights,
                },
                "indices": indices,
                "material": 0,
            }],
        }],
        "materials": [{
            "name": "Skin",
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } },
            "normalTexture": { "index": 1 },
        }],
        "textures": [{ "source": 0 }, { "source": 1 }],
        "images": [
            { "uri": "textures/skin_diffuse.png" },
            { "uri": "skin_normal.png" },
        ],
        "skins": [{ "joints": [0, 1], "inverseBindMatrices": inverse_binds }],
        "animations": [{
            "name": "Wave",
            "samplers": [
                { "input": times, "output": spine_translation, "interpolation": "LINEAR" },
                { "input": times, "output": hip_rotation, "interpolation": "LINEAR" },
            ],
            "channels": [
                { "sampler": 0, "target": { "node": 1, "path": "translation" } },
                { "sampler": 1, "target": { "node": 0, "path": "rotation" } },
            ],
        }],
    });

    b.finish(document)
}

/// A static quad with one material, as OBJ + MTL text
pub const QUAD_OBJ: &str = "\
mtllib quad.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl tiles
f 1/1/1 2/2/1 3/3/1 4/4/1
";

pub const QUAD_MTL: &str = "\
newmtl tiles
map_Kd art\\tiles_d.png
map_Ks tiles_s.png
";

/// Write the quad OBJ and its MTL into `dir`, returning the OBJ path
pub fn write_quad_obj(dir: &Path, stem: &str) -> PathBuf {
    let obj = dir.join(format!("{stem}.obj"));
    std::fs::write(&obj, QUAD_OBJ).unwrap();
    std::fs::write(dir.join("quad.mtl"), QUAD_MTL).unwrap();
    obj
}
