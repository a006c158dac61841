//! Model importers producing a [`Scene`]
//!
//! - [`gltf`] - glTF 2.0 (`.gltf`, `.glb`), including skins and animations
//! - [`obj`] - Wavefront OBJ with MTL materials (static geometry only)

pub mod gltf;
pub mod obj;
pub mod tangents;

use anyhow::{bail, Result};
use std::path::Path;

use crate::scene::Scene;

/// Source extensions recognised by [`import_scene`] (lower case)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["gltf", "glb", "obj"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

/// True when `path` has a recognised model extension
pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// Parse a model file into a scene graph
pub fn import_scene(path: &Path) -> Result<Scene> {
    match extension_of(path).as_str() {
        "gltf" | "glb" => gltf::import_gltf(path),
        "obj" => obj::import_obj(path),
        _ => bail!(
            "Unsupported model format: {:?} (use .gltf, .glb, or .obj)",
            path
        ),
    }
}
