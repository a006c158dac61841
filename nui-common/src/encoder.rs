//! `.nui` model encoder
//!
//! No magic bytes or version field; the reader must know the schema.
//!
//! # Layout
//! ```text
//! u16 submesh_count
//! submesh × submesh_count:
//!     array<Vertex>   vertices        (88 bytes per vertex)
//!     array<u16>      indices
//!     [only when the material name is non-empty]
//!     str material_name
//!     str ambient.filename,  str ambient.path
//!     str diffuse.filename,  str diffuse.path
//!     str normal.filename,   str normal.path
//!     str specular.filename, str specular.path
//! u16 bone_count
//! bone × bone_count:       str name, i32 id, f32×16 offset
//! u16 animation_count
//! animation × animation_count:
//!     str name, f32 duration, f32 ticks_per_second
//!     u16 track_count
//!     track × track_count:
//!         array<KeyPosition>, array<KeyRotation>, array<KeyScale>,
//!         f32×16 local_transform, str name, i32 id
//!     u32 node_offset     absolute offset of the root node block
//!     u32 table_offset    absolute offset of the clip bone table
//!     node tree
//!     u16 clip_bone_count, bone × clip_bone_count
//! i32 primitive_tag
//! ```
//!
//! A node block is
//! ```text
//! f32×16 transformation, str name, u16 child_count,
//! u32 child_offset × child_count, child blocks in order
//! ```
//! where each child offset is the absolute file position of that child's
//! block, so a reader can jump to any child without walking its siblings.

use crate::codec::{BinaryWriter, EncodeError, Scalar};
use crate::model::{Animation, AssetModel, Bone, BoneTable, NodeData, Submesh};

/// Encode a whole model into the `.nui` byte layout
pub fn encode_model(model: &AssetModel) -> Result<Vec<u8>, EncodeError> {
    let mut w = BinaryWriter::new();

    w.write_count("submesh", model.submeshes.len())?;
    for submesh in &model.submeshes {
        encode_submesh(&mut w, submesh)?;
    }

    encode_bone_table(&mut w, "bone", &model.bones)?;

    w.write_count("animation", model.animation_count())?;
    for (name, animation) in model.animations() {
        encode_animation(&mut w, name, animation)?;
    }

    w.write_scalar(&model.primitive.tag());

    Ok(w.into_bytes())
}

pub fn encode_submesh(w: &mut BinaryWriter, submesh: &Submesh) -> Result<(), EncodeError> {
    w.write_array(&submesh.vertices)?;
    w.write_array(&submesh.indices)?;

    if let Some(material) = submesh.named_material() {
        w.write_str(&material.name)?;
        for slot in [
            &material.ambient,
            &material.diffuse,
            &material.normal,
            &material.specular,
        ] {
            w.write_str(&slot.filename)?;
            w.write_str(&slot.path)?;
        }
    }

    Ok(())
}

pub fn encode_bone_table(
    w: &mut BinaryWriter,
    what: &'static str,
    table: &BoneTable,
) -> Result<(), EncodeError> {
    w.write_count(what, table.len())?;
    for (name, info) in table.iter() {
        w.write_str(name)?;
        w.write_scalar(&info.id);
        w.write_scalar(&info.offset);
    }
    Ok(())
}

pub fn encode_animation(
    w: &mut BinaryWriter,
    name: &str,
    animation: &Animation,
) -> Result<(), EncodeError> {
    w.write_str(name)?;
    w.write_scalar(&animation.duration);
    w.write_scalar(&animation.ticks_per_second);

    w.write_count("bone track", animation.bones.len())?;
    for bone in &animation.bones {
        encode_bone_track(w, bone)?;
    }

    // The tree starts after the node and table offset fields
    let node_offset = w.position() + 2 * u32::SIZE;
    let tree = encode_node(&animation.root_node, node_offset)?;
    let table_offset = node_offset + tree.len();

    w.write_offset(node_offset)?;
    w.write_offset(table_offset)?;
    w.append(tree);

    encode_bone_table(w, "clip bone", &animation.bone_ids)
}

fn encode_bone_track(w: &mut BinaryWriter, bone: &Bone) -> Result<(), EncodeError> {
    w.write_array(&bone.positions)?;
    w.write_array(&bone.rotations)?;
    w.write_array(&bone.scales)?;
    w.write_scalar(&bone.local_transform);
    w.write_str(&bone.name)?;
    w.write_scalar(&bone.id);
    Ok(())
}

/// Encode `node` as a block that will sit at absolute offset `start`.
///
/// Children are encoded first into their own blocks, each built for the
/// offset it will occupy: the first child sits right after this node's
/// header and offset slots, every later one after its predecessor. The
/// parent block is then header, resolved slots, and the child blocks in
/// order, so no byte is ever patched after being written.
pub fn encode_node(node: &NodeData, start: usize) -> Result<BinaryWriter, EncodeError> {
    let mut block = BinaryWriter::at(start);
    block.write_scalar(&node.transformation);
    block.write_str(&node.name)?;
    block.write_count("node child", node.children.len())?;

    let mut cursor = block.position() + node.children.len() * u32::SIZE;
    let mut children = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let child_block = encode_node(child, cursor)?;
        cursor += child_block.len();
        children.push(child_block);
    }

    for child_block in &children {
        block.write_offset(child_block.base())?;
    }
    for child_block in children {
        block.append(child_block);
    }

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{array_size, str_size};
    use crate::model::{
        BoneInfluence, KeyPosition, Material, TextureSlot, Vertex, IDENTITY_MATRIX,
    };

    fn read_u32(bytes: &[u8], at: usize) -> usize {
        u32::read_le(&bytes[at..at + 4]) as usize
    }

    fn read_u16(bytes: &[u8], at: usize) -> usize {
        u16::read_le(&bytes[at..at + 2]) as usize
    }

    fn triangle() -> Submesh {
        Submesh {
            vertices: vec![Vertex::default(); 3],
            indices: vec![0, 1, 2],
            material: None,
        }
    }

    #[test]
    fn test_empty_model_layout() {
        let bytes = encode_model(&AssetModel::default()).unwrap();
        // three u16 counts + i32 primitive tag
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 4, 0, 0, 0]);
    }

    #[test]
    fn test_submesh_without_material_writes_arrays_only() {
        let mut w = BinaryWriter::new();
        encode_submesh(&mut w, &triangle()).unwrap();
        assert_eq!(w.len(), (4 + 3 * 88) + (4 + 3 * 2));

        // An unnamed material is treated as absent
        let mut unnamed = triangle();
        unnamed.material = Some(Material {
            diffuse: TextureSlot {
                filename: "a.png".into(),
                path: "textures/a.png".into(),
            },
            ..Default::default()
        });
        let mut w2 = BinaryWriter::new();
        encode_submesh(&mut w2, &unnamed).unwrap();
        assert_eq!(w2.as_bytes(), w.as_bytes());
    }

    #[test]
    fn test_submesh_material_slot_order() {
        let slot = |name: &str| TextureSlot {
            filename: name.to_string(),
            path: format!("tex/{name}"),
        };
        let mut submesh = triangle();
        submesh.material = Some(Material {
            name: "skin".into(),
            ambient: slot("a"),
            diffuse: slot("d"),
            specular: slot("s"),
            normal: slot("n"),
        });

        let mut w = BinaryWriter::new();
        encode_submesh(&mut w, &submesh).unwrap();

        let arrays = array_size::<Vertex>(3) + array_size::<u16>(3);
        let material = &w.as_bytes()[arrays..];
        assert_eq!(&material[2..6], b"skin");

        // filename/path pairs follow: ambient, diffuse, normal, specular
        let mut at = str_size("skin");
        let mut filenames = Vec::new();
        for _ in 0..4 {
            let len = read_u16(material, at);
            filenames.push(String::from_utf8(material[at + 2..at + 2 + len].to_vec()).unwrap());
            at += 2 + len;
            at += 2 + read_u16(material, at);
        }
        assert_eq!(filenames, vec!["a", "d", "n", "s"]);
        assert_eq!(at, material.len());
    }

    #[test]
    fn test_leaf_node_has_no_offset_slots() {
        let leaf = NodeData::leaf("tip", IDENTITY_MATRIX);
        let block = encode_node(&leaf, 40).unwrap();
        assert_eq!(block.len(), 64 + str_size("tip") + 2);
        assert_eq!(read_u16(block.as_bytes(), 64 + 5), 0);
    }

    #[test]
    fn test_child_offsets_are_absolute() {
        // R -> [A -> [C], B]
        let mut a = NodeData::leaf("A", IDENTITY_MATRIX);
        a.children.push(NodeData::leaf("C", IDENTITY_MATRIX));
        let mut root = NodeData::leaf("R", IDENTITY_MATRIX);
        root.children.push(a);
        root.children.push(NodeData::leaf("B", IDENTITY_MATRIX));

        let start = 1000;
        let block = encode_node(&root, start).unwrap();
        let bytes = block.as_bytes();

        let header = 64 + str_size("R") + 2;
        let offset_a = read_u32(bytes, header);
        let offset_b = read_u32(bytes, header + 4);

        // A begins right after R's header and both slots
        assert_eq!(offset_a, start + header + 8);

        // A's block: header, one slot, then C
        let a_header = 64 + str_size("A") + 2;
        let a_local = offset_a - start;
        assert_eq!(&bytes[a_local + 66..a_local + 67], b"A");
        let offset_c = read_u32(bytes, a_local + a_header);
        assert_eq!(offset_c, offset_a + a_header + 4);
        assert_eq!(&bytes[offset_c - start + 66..offset_c - start + 67], b"C");

        // B follows all of A's subtree
        let c_size = 64 + str_size("C") + 2;
        assert_eq!(offset_b, offset_a + a_header + 4 + c_size);
        assert_eq!(&bytes[offset_b - start + 66..offset_b - start + 67], b"B");
        assert_eq!(offset_b - start + 64 + str_size("B") + 2, bytes.len());
    }

    #[test]
    fn test_animation_trailing_offsets() {
        let mut animation = Animation {
            duration: 48.0,
            ticks_per_second: 24.0,
            root_node: NodeData::leaf("root", IDENTITY_MATRIX),
            ..Default::default()
        };
        animation.bones.push(Bone {
            name: "root".into(),
            id: 0,
            positions: vec![KeyPosition {
                position: [0.0, 1.0, 0.0],
                time_stamp: 0.0,
            }],
            rotations: Vec::new(),
            scales: Vec::new(),
            local_transform: IDENTITY_MATRIX,
        });
        animation.bone_ids.insert(
            "root",
            crate::model::BoneInfo {
                id: 0,
                offset: IDENTITY_MATRIX,
            },
        );

        // Place the clip away from the file start
        let mut w = BinaryWriter::new();
        w.write_scalar(&0u32);
        encode_animation(&mut w, "walk", &animation).unwrap();
        let bytes = w.as_bytes();

        let track = array_size::<KeyPosition>(1) + 4 + 4 + 64 + str_size("root") + 4;
        let fields = 4 + str_size("walk") + 4 + 4 + 2 + track;
        let node_offset = read_u32(bytes, fields);
        let table_offset = read_u32(bytes, fields + 4);

        assert_eq!(node_offset, fields + 8);
        assert_eq!(&bytes[node_offset + 66..node_offset + 70], b"root");
        let node_size = 64 + str_size("root") + 2;
        assert_eq!(table_offset, node_offset + node_size);
        assert_eq!(read_u16(bytes, table_offset), 1);
    }

    #[test]
    fn test_model_ends_with_primitive_tag() {
        let mut model = AssetModel::default();
        let mut submesh = triangle();
        submesh.vertices[0].influences[0] = Some(BoneInfluence {
            bone_id: 0,
            weight: 1.0,
        });
        model.submeshes.push(submesh);
        model.bones.get_or_insert("hip", IDENTITY_MATRIX);

        let bytes = encode_model(&model).unwrap();
        let expected = 2
            + array_size::<Vertex>(3)
            + array_size::<u16>(3)
            + 2
            + (str_size("hip") + 4 + 64)
            + 2
            + 4;
        assert_eq!(bytes.len(), expected);
        assert_eq!(i32::read_le(&bytes[bytes.len() - 4..]), 4);
    }
}
