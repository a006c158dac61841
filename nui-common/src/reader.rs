//! `.nui` model decoder
//!
//! Inverse of [`crate::encoder`]. Used by tooling to inspect compiled files
//! and to jump straight to nodes of an animation's hierarchy.

use crate::codec::{BinaryReader, DecodeError};
use crate::model::{
    Animation, AssetModel, Bone, BoneInfo, BoneTable, Material, Matrix4, NodeData,
    PrimitiveType, Submesh, TextureSlot, Vertex,
};

/// Header of one node block, as found at its absolute offset
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHeader {
    pub name: String,
    pub transformation: Matrix4,
    /// Absolute offsets of the children's blocks
    pub child_offsets: Vec<usize>,
}

/// Read the node block that begins at absolute `offset`
pub fn read_node_at(bytes: &[u8], offset: usize) -> Result<NodeHeader, DecodeError> {
    let mut r = BinaryReader::at(bytes, offset)?;
    let transformation = r.read_scalar()?;
    let name = r.read_str()?;
    let child_count = r.read_count()?;
    let child_offsets = (0..child_count)
        .map(|_| r.read_offset())
        .collect::<Result<_, _>>()?;
    Ok(NodeHeader {
        name,
        transformation,
        child_offsets,
    })
}

/// Rebuild the subtree rooted at `offset` by following child offsets
pub fn read_node_tree(bytes: &[u8], offset: usize) -> Result<NodeData, DecodeError> {
    let header = read_node_at(bytes, offset)?;
    let children = header
        .child_offsets
        .iter()
        .map(|&child| read_node_tree(bytes, child))
        .collect::<Result<_, _>>()?;
    Ok(NodeData {
        name: header.name,
        transformation: header.transformation,
        children,
    })
}

/// Decode a complete `.nui` file.
///
/// Materials carry no presence flag on the wire. A submesh whose next bytes
/// parse as a named material is first read with it; if the rest of the file
/// then fails to decode, the decoder backtracks to the most recent such
/// submesh and reads it without a material.
pub fn decode_model(bytes: &[u8]) -> Result<AssetModel, DecodeError> {
    let mut r = BinaryReader::new(bytes);
    let count = r.read_count()?;

    let mut submeshes: Vec<Submesh> = Vec::with_capacity(count);
    let mut choices: Vec<MaterialChoice<'_>> = Vec::new();

    loop {
        let failure = if submeshes.len() == count {
            match decode_tail(bytes, r.clone()) {
                Ok(mut model) => {
                    model.submeshes = submeshes;
                    return Ok(model);
                }
                Err(e) => e,
            }
        } else {
            match read_geometry(&mut r) {
                Ok((vertices, indices)) => {
                    let mut with_material = r.clone();
                    let material = match read_material(&mut with_material) {
                        // Encoded materials always carry a name
                        Ok(material) if !material.name.is_empty() => {
                            choices.push(MaterialChoice {
                                index: submeshes.len(),
                                without: r.clone(),
                            });
                            r = with_material;
                            Some(material)
                        }
                        _ => None,
                    };
                    submeshes.push(Submesh {
                        vertices,
                        indices,
                        material,
                    });
                    continue;
                }
                Err(e) => e,
            }
        };

        let choice = choices.pop().ok_or(failure)?;
        submeshes.truncate(choice.index + 1);
        submeshes[choice.index].material = None;
        r = choice.without;
    }
}

/// A submesh read with a material, and where its material-less reading resumes
struct MaterialChoice<'a> {
    index: usize,
    without: BinaryReader<'a>,
}

fn read_geometry(r: &mut BinaryReader<'_>) -> Result<(Vec<Vertex>, Vec<u16>), DecodeError> {
    Ok((r.read_array()?, r.read_array()?))
}

fn read_material(r: &mut BinaryReader<'_>) -> Result<Material, DecodeError> {
    let name = r.read_str()?;
    let mut slot = || -> Result<TextureSlot, DecodeError> {
        Ok(TextureSlot {
            filename: r.read_str()?,
            path: r.read_str()?,
        })
    };
    let ambient = slot()?;
    let diffuse = slot()?;
    let normal = slot()?;
    let specular = slot()?;
    Ok(Material {
        name,
        ambient,
        diffuse,
        specular,
        normal,
    })
}

/// Everything after the submeshes: bone table, clips, primitive tag
fn decode_tail<'a>(
    bytes: &'a [u8],
    mut r: BinaryReader<'a>,
) -> Result<AssetModel, DecodeError> {
    let mut model = AssetModel::new();
    model.bones = read_bone_table(&mut r)?;

    let animation_count = r.read_count()?;
    for _ in 0..animation_count {
        let (name, animation) = read_animation(bytes, &mut r)?;
        model.add_animation(name, animation);
    }

    let tag: i32 = r.read_scalar()?;
    model.primitive =
        PrimitiveType::from_tag(tag).ok_or(DecodeError::UnknownPrimitive { tag })?;

    if r.remaining() != 0 {
        return Err(DecodeError::TrailingBytes {
            remaining: r.remaining(),
        });
    }
    Ok(model)
}

fn read_bone_table(r: &mut BinaryReader<'_>) -> Result<BoneTable, DecodeError> {
    let count = r.read_count()?;
    let mut table = BoneTable::new();
    for _ in 0..count {
        let name = r.read_str()?;
        let id = r.read_scalar()?;
        let offset = r.read_scalar()?;
        table.insert(&name, BoneInfo { id, offset });
    }
    Ok(table)
}

fn read_animation<'a>(
    bytes: &'a [u8],
    r: &mut BinaryReader<'a>,
) -> Result<(String, Animation), DecodeError> {
    let name = r.read_str()?;
    let duration = r.read_scalar()?;
    let ticks_per_second = r.read_scalar()?;

    let track_count = r.read_count()?;
    let mut bones = Vec::with_capacity(track_count);
    for _ in 0..track_count {
        bones.push(Bone {
            positions: r.read_array()?,
            rotations: r.read_array()?,
            scales: r.read_array()?,
            local_transform: r.read_scalar()?,
            name: r.read_str()?,
            id: r.read_scalar()?,
        });
    }

    let node_offset = r.read_offset()?;
    let table_offset = r.read_offset()?;
    let root_node = read_node_tree(bytes, node_offset)?;

    *r = BinaryReader::at(bytes, table_offset)?;
    let bone_ids = read_bone_table(r)?;

    Ok((
        name,
        Animation {
            duration,
            ticks_per_second,
            bones,
            root_node,
            bone_ids,
        },
    ))
}
