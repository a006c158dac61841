//! Material resolution
//!
//! Each texture channel becomes a `(filename, path)` pair: the filename is the
//! texture reference with any directory stripped, the path is the configured
//! prefix followed by that filename.

use nui_common::{Material, TextureSlot};

use crate::scene::{SceneMaterial, TextureChannel};

/// Strip everything up to the last `/` or `\`
pub fn strip_directory(reference: &str) -> &str {
    match reference.rfind(['/', '\\']) {
        Some(pos) => &reference[pos + 1..],
        None => reference,
    }
}

/// Resolve one channel. A missing texture yields an empty filename and the
/// bare prefix as path.
pub fn resolve_texture(
    material: &SceneMaterial,
    channel: TextureChannel,
    prefix: &str,
) -> TextureSlot {
    let filename = strip_directory(material.texture(channel).unwrap_or_default()).to_string();
    let path = format!("{prefix}{filename}");
    TextureSlot { filename, path }
}

/// Resolve all four texture slots of a scene material
pub fn resolve_material(material: &SceneMaterial, prefix: &str) -> Material {
    Material {
        name: material.name.clone(),
        ambient: resolve_texture(material, TextureChannel::Ambient, prefix),
        diffuse: resolve_texture(material, TextureChannel::Diffuse, prefix),
        specular: resolve_texture(material, TextureChannel::Specular, prefix),
        normal: resolve_texture(material, TextureChannel::Normals, prefix),
    }
}
