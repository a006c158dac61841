//! Wavefront OBJ (+ MTL) scene import
//!
//! Static geometry only: one mesh per `usemtl` run, all attached to a single
//! root node.

use anyhow::{bail, Context, Result};
use hashbrown::HashMap;
use std::fs;
use std::path::Path;

use crate::scene::{Face, Scene, SceneMaterial, SceneMesh, SceneNode};

/// Corner key: position, texcoord and normal index (0-based)
type Corner = (usize, Option<usize>, Option<usize>);

/// Load an `.obj` file and the material libraries it names
pub fn import_obj(path: &Path) -> Result<Scene> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to open OBJ: {:?}", path))?;
    let root_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("RootNode");
    parse_obj(&text, root_name, path.parent())
}

/// Parse OBJ text. `dir` is where `mtllib` files are looked up; without it
/// material libraries are ignored.
pub fn parse_obj(text: &str, root_name: &str, dir: Option<&Path>) -> Result<Scene> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut tex_coords: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut materials: Vec<SceneMaterial> = Vec::new();
    let mut meshes: Vec<SceneMesh> = Vec::new();
    let mut object_name = root_name.to_string();
    let mut current = MeshBuilder::new(&object_name, None);

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" if parts.len() >= 4 => positions.push(parse_floats(&parts[1..4])),
            "vt" if parts.len() >= 3 => {
                let [u, v] = parse_floats::<2>(&parts[1..3]);
                // Top-left UV origin
                tex_coords.push([u, 1.0 - v]);
            }
            "vn" if parts.len() >= 4 => normals.push(parse_floats(&parts[1..4])),
            "f" if parts.len() >= 4 => {
                let corners = parts[1..]
                    .iter()
                    .map(|s| {
                        parse_corner(s, positions.len(), tex_coords.len(), normals.len())
                            .with_context(|| format!("Invalid face on line {}", line_no + 1))
                    })
                    .collect::<Result<Vec<Corner>>>()?;

                // Fan triangulation
                for i in 1..corners.len() - 1 {
                    let a = current.corner(corners[0], &positions, &tex_coords, &normals);
                    let b = current.corner(corners[i], &positions, &tex_coords, &normals);
                    let c = current.corner(corners[i + 1], &positions, &tex_coords, &normals);
                    current.faces.push(Face::triangle(a, b, c));
                }
            }
            "usemtl" => {
                let material = parts.get(1).map(|s| s.to_string()).unwrap_or_default();
                let next = MeshBuilder::new(&object_name, Some(material));
                push_mesh(std::mem::replace(&mut current, next), &mut materials, &mut meshes);
            }
            "o" | "g" => {
                if let Some(name) = parts.get(1) {
                    object_name = name.to_string();
                    if current.faces.is_empty() {
                        current.name = object_name.clone();
                    }
                }
            }
            "mtllib" => {
                let Some(dir) = dir else {
                    continue;
                };
                for lib in &parts[1..] {
                    let lib_path = dir.join(lib);
                    match fs::read_to_string(&lib_path) {
                        Ok(mtl) => materials.extend(parse_mtl(&mtl)),
                        Err(e) => {
                            tracing::warn!("Material library {:?} not loaded: {}", lib_path, e)
                        }
                    }
                }
            }
            _ => {}
        }
    }
    push_mesh(current, &mut materials, &mut meshes);

    let mut root = SceneNode::new(root_name);
    root.meshes = (0..meshes.len()).collect();

    Ok(Scene {
        incomplete: false,
        meshes,
        materials,
        root: Some(root),
        animations: Vec::new(),
    })
}

fn parse_floats<const N: usize>(parts: &[&str]) -> [f32; N] {
    let mut out = [0.0; N];
    for (value, part) in out.iter_mut().zip(parts) {
        *value = part.parse().unwrap_or(0.0);
    }
    out
}

/// Resolve a 1-based (or negative, relative) OBJ index against `count`
fn resolve_index(raw: &str, count: usize, what: &str) -> Result<usize> {
    let index: i64 = raw
        .parse()
        .with_context(|| format!("Bad {} index '{}'", what, raw))?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => count as i64 + i,
        _ => bail!("{} index 0 is not valid", what),
    };
    if resolved < 0 || resolved >= count as i64 {
        bail!("{} index {} out of range ({} defined)", what, index, count);
    }
    Ok(resolved as usize)
}

/// Parse `v`, `v/vt`, `v/vt/vn` or `v//vn`
fn parse_corner(s: &str, positions: usize, tex_coords: usize, normals: usize) -> Result<Corner> {
    let mut parts = s.split('/');
    let v = resolve_index(parts.next().unwrap_or_default(), positions, "vertex")?;
    let vt = match parts.next().filter(|p| !p.is_empty()) {
        Some(raw) => Some(resolve_index(raw, tex_coords, "texcoord")?),
        None => None,
    };
    let vn = match parts.next().filter(|p| !p.is_empty()) {
        Some(raw) => Some(resolve_index(raw, normals, "normal")?),
        None => None,
    };
    Ok((v, vt, vn))
}

struct MeshBuilder {
    name: String,
    material: Option<String>,
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    has_tex_coords: bool,
    has_normals: bool,
    faces: Vec<Face>,
    corners: HashMap<Corner, u32>,
}

impl MeshBuilder {
    fn new(name: &str, material: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            material,
            positions: Vec::new(),
            tex_coords: Vec::new(),
            normals: Vec::new(),
            has_tex_coords: false,
            has_normals: false,
            faces: Vec::new(),
            corners: HashMap::new(),
        }
    }

    /// Index of `corner` in this mesh, adding a vertex the first time it is seen
    fn corner(
        &mut self,
        corner: Corner,
        positions: &[[f32; 3]],
        tex_coords: &[[f32; 2]],
        normals: &[[f32; 3]],
    ) -> u32 {
        if let Some(&index) = self.corners.get(&corner) {
            return index;
        }
        let (v, vt, vn) = corner;
        let index = self.positions.len() as u32;

        self.positions.push(positions[v]);
        self.tex_coords.push(vt.map(|i| tex_coords[i]).unwrap_or_default());
        self.normals.push(vn.map(|i| normals[i]).unwrap_or_default());
        self.has_tex_coords |= vt.is_some();
        self.has_normals |= vn.is_some();

        self.corners.insert(corner, index);
        index
    }
}

fn push_mesh(
    builder: MeshBuilder,
    materials: &mut Vec<SceneMaterial>,
    meshes: &mut Vec<SceneMesh>,
) {
    if builder.faces.is_empty() {
        return;
    }

    let material_index = builder.material.as_ref().map(|name| {
        materials
            .iter()
            .position(|m| &m.name == name)
            .unwrap_or_else(|| {
                tracing::warn!("Material '{}' not defined in any material library", name);
                materials.push(SceneMaterial {
                    name: name.clone(),
                    ..Default::default()
                });
                materials.len() - 1
            })
    });

    let name = match &builder.material {
        Some(material) if !material.is_empty() => format!("{}_{}", builder.name, material),
        _ => builder.name,
    };

    meshes.push(SceneMesh {
        name,
        positions: builder.positions,
        normals: builder.has_normals.then_some(builder.normals),
        tex_coords: builder.has_tex_coords.then_some(builder.tex_coords),
        tangents: None,
        bitangents: None,
        faces: builder.faces,
        material_index,
        bones: Vec::new(),
    });
}

/// Parse MTL text into materials (texture maps only)
pub fn parse_mtl(text: &str) -> Vec<SceneMaterial> {
    let mut materials: Vec<SceneMaterial> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        // Options like `-bm 1.0` precede the file name
        let file = parts.last().map(str::to_string);

        if keyword == "newmtl" {
            materials.push(SceneMaterial {
                name: file.unwrap_or_default(),
                ..Default::default()
            });
            continue;
        }

        let Some(material) = materials.last_mut() else {
            continue;
        };
        match keyword.to_ascii_lowercase().as_str() {
            "map_ka" => material.ambient = file,
            "map_kd" => material.diffuse = file,
            "map_ks" => material.specular = file,
            "map_bump" | "bump" | "norm" => material.normals = file,
            _ => {}
        }
    }

    materials
}
