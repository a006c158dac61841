//! Shared types and binary format for `.nui` compiled models
//!
//! This crate is used by:
//! - `nui-export` (asset pipeline, writes `.nui`)
//! - runtime loaders and inspection tools (read `.nui`)
//!
//! # Modules
//!
//! - [`model`] - In-memory asset model (submeshes, bone table, animation clips)
//! - [`codec`] - Scalar / array / string wire encoding
//! - [`encoder`] - Model serializer, including the node-tree offset layout
//! - [`reader`] - Model decoder and random access to node blocks

pub mod codec;
pub mod encoder;
pub mod model;
pub mod reader;

pub use codec::{BinaryReader, BinaryWriter, DecodeError, EncodeError, Scalar};
pub use encoder::encode_model;
pub use model::{
    Animation, AssetModel, Bone, BoneInfluence, BoneInfo, BoneTable, KeyPosition, KeyRotation,
    KeyScale, Material, Matrix4, NodeData, PrimitiveType, Submesh, TextureSlot, Vertex,
    IDENTITY_MATRIX, MAX_BONE_INFLUENCES, MAX_SUBMESH_VERTICES,
};
pub use reader::{decode_model, read_node_at, NodeHeader};

/// File extension of compiled models
pub const NUI_EXT: &str = "nui";
