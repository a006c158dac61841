//! In-memory asset model
//!
//! The intermediate representation produced by the exporter and consumed by
//! the encoder. Everything here is created during a single compile pass and
//! dropped once the encoded bytes have been written.

use hashbrown::HashMap;

/// 4×4 matrix stored as 16 floats, row-major.
pub type Matrix4 = [f32; 16];

/// Row-major identity matrix
pub const IDENTITY_MATRIX: Matrix4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

/// Maximum number of bone influences stored per vertex
pub const MAX_BONE_INFLUENCES: usize = 4;

/// Maximum number of vertices a submesh may hold (u16 indices)
pub const MAX_SUBMESH_VERTICES: usize = u16::MAX as usize;

/// A single `(bone id, weight)` pair attached to a vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneInfluence {
    pub bone_id: i32,
    pub weight: f32,
}

/// Mesh vertex with tangent frame and up to four bone influences.
///
/// Unused influence slots are `None`; the wire format writes them as
/// `bone_id = -1, weight = 0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub influences: [Option<BoneInfluence>; MAX_BONE_INFLUENCES],
}

impl Vertex {
    /// Fill the first empty influence slot.
    ///
    /// Returns `false` (and drops the influence) when all slots are taken.
    pub fn attach_influence(&mut self, bone_id: i32, weight: f32) -> bool {
        match self.influences.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(BoneInfluence { bone_id, weight });
                true
            }
            None => false,
        }
    }

    pub fn is_skinned(&self) -> bool {
        self.influences.iter().any(Option::is_some)
    }

    pub fn influence_count(&self) -> usize {
        self.influences.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Texture reference: bare filename plus the resolved runtime path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureSlot {
    pub filename: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Material {
    pub name: String,
    pub ambient: TextureSlot,
    pub diffuse: TextureSlot,
    pub specular: TextureSlot,
    pub normal: TextureSlot,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub material: Option<Material>,
}

impl Submesh {
    /// The material to serialize, if it carries a name
    pub fn named_material(&self) -> Option<&Material> {
        self.material.as_ref().filter(|m| !m.name.is_empty())
    }
}

/// Bone id and inverse-bind matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneInfo {
    pub id: i32,
    pub offset: Matrix4,
}

/// Name-keyed bone table preserving insertion order.
///
/// The model-wide table assigns dense ids in first-seen order through
/// [`BoneTable::get_or_insert`]; clip-local tables copy entries from it with
/// [`BoneTable::insert`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneTable {
    entries: Vec<(String, BoneInfo)>,
    lookup: HashMap<String, usize>,
}

impl BoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&BoneInfo> {
        self.lookup.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Look up `name`, allocating the next dense id on first encounter.
    ///
    /// The offset of the first encounter wins; later offsets are ignored.
    pub fn get_or_insert(&mut self, name: &str, offset: Matrix4) -> BoneInfo {
        if let Some(info) = self.get(name) {
            return *info;
        }
        let info = BoneInfo {
            id: self.entries.len() as i32,
            offset,
        };
        self.lookup.insert(name.to_string(), self.entries.len());
        self.entries.push((name.to_string(), info));
        info
    }

    /// Insert an entry with an explicit id. An existing entry is kept.
    pub fn insert(&mut self, name: &str, info: BoneInfo) {
        if self.contains(name) {
            return;
        }
        self.lookup.insert(name.to_string(), self.entries.len());
        self.entries.push((name.to_string(), info));
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoneInfo)> {
        self.entries.iter().map(|(name, info)| (name.as_str(), info))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPosition {
    pub position: [f32; 3],
    pub time_stamp: f32,
}

/// Rotation key; quaternion stored as `[x, y, z, w]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyRotation {
    pub orientation: [f32; 4],
    pub time_stamp: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyScale {
    pub scale: [f32; 3],
    pub time_stamp: f32,
}

/// Animation track for one bone
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub id: i32,
    pub positions: Vec<KeyPosition>,
    pub rotations: Vec<KeyRotation>,
    pub scales: Vec<KeyScale>,
    /// Used by the runtime when the track has no keys
    pub local_transform: Matrix4,
}

/// Node of the transform hierarchy mirrored for playback
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub name: String,
    pub transformation: Matrix4,
    pub children: Vec<NodeData>,
}

impl NodeData {
    pub fn leaf(name: impl Into<String>, transformation: Matrix4) -> Self {
        Self {
            name: name.into(),
            transformation,
            children: Vec::new(),
        }
    }

    /// Depth-first search by name
    pub fn find(&self, name: &str) -> Option<&NodeData> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeData::node_count).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(NodeData::depth).max().unwrap_or(0)
    }
}

impl Default for NodeData {
    fn default() -> Self {
        Self::leaf("", IDENTITY_MATRIX)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    /// Clip length in ticks
    pub duration: f32,
    pub ticks_per_second: f32,
    pub bones: Vec<Bone>,
    pub root_node: NodeData,
    /// Subset of the model's bone table referenced by this clip
    pub bone_ids: BoneTable,
}

/// Primitive topology of the whole model, as GL enumerants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum PrimitiveType {
    Points = 0,
    Lines = 1,
    LineStrip = 3,
    #[default]
    Triangles = 4,
    TriangleStrip = 5,
}

impl PrimitiveType {
    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            3 => Some(Self::LineStrip),
            4 => Some(Self::Triangles),
            5 => Some(Self::TriangleStrip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetModel {
    pub primitive: PrimitiveType,
    pub submeshes: Vec<Submesh>,
    pub bones: BoneTable,
    animations: Vec<(String, Animation)>,
}

impl AssetModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clip. A clip with the same name is replaced in place.
    pub fn add_animation(&mut self, name: impl Into<String>, animation: Animation) {
        let name = name.into();
        match self.animations.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = animation,
            None => self.animations.push((name, animation)),
        }
    }

    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// Clips in insertion order
    pub fn animations(&self) -> impl Iterator<Item = (&str, &Animation)> {
        self.animations.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submeshes.is_empty() && self.bones.is_empty() && self.animations.is_empty()
    }

    pub fn has_skinned_vertices(&self) -> bool {
        self.submeshes
            .iter()
            .flat_map(|s| s.vertices.iter())
            .any(Vertex::is_skinned)
    }

    /// Rig every vertex to bone 0 when the model is animated but no vertex
    /// carries an influence, so that the clips still move the mesh.
    ///
    /// Returns `true` when the rig was applied.
    pub fn ensure_rigged(&mut self) -> bool {
        if self.animations.is_empty() || self.has_skinned_vertices() {
            return false;
        }
        for vertex in self.submeshes.iter_mut().flat_map(|s| s.vertices.iter_mut()) {
            vertex.influences[0] = Some(BoneInfluence {
                bone_id: 0,
                weight: 1.0,
            });
        }
        true
    }
}
