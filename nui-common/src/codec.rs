//! Length-prefixed binary codec
//!
//! Every value written to a `.nui` file falls into one of three encode
//! variants:
//!
//! | variant | wire form |
//! |---|---|
//! | scalar ([`Scalar`]) | raw little-endian bytes, `Scalar::SIZE` long |
//! | array of scalars | `u32` payload byte length, then the elements |
//! | string | `u16` byte count, then the raw bytes (no terminator) |
//!
//! There is no padding or alignment anywhere. [`BinaryWriter`] tracks the
//! absolute file position of its buffer so blocks built out of line can
//! refer to each other by offset; [`BinaryReader`] is the inverse.

use thiserror::Error;

use crate::model::{BoneInfluence, KeyPosition, KeyRotation, KeyScale, Vertex};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("string of {len} bytes exceeds the u16 length prefix")]
    StringTooLong { len: usize },
    #[error("array payload of {bytes} bytes exceeds the u32 length prefix")]
    ArrayTooLarge { bytes: usize },
    #[error("{what} count {count} exceeds u16")]
    CountOverflow { what: &'static str, count: usize },
    #[error("absolute offset {offset} exceeds u32")]
    OffsetOverflow { offset: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data at offset {offset} (needed {needed} bytes)")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("array payload of {bytes} bytes is not a multiple of the {element}-byte element")]
    MisalignedArray { bytes: usize, element: usize },
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },
    #[error("unknown primitive tag {tag}")]
    UnknownPrimitive { tag: i32 },
    #[error("{remaining} unread bytes after the last field")]
    TrailingBytes { remaining: usize },
}

/// A fixed-size value written as its raw little-endian bytes.
pub trait Scalar: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    fn write_le(&self, out: &mut Vec<u8>);

    /// Decode from exactly `SIZE` bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar_primitive {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn write_le(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    <$t>::from_le_bytes(std::array::from_fn(|i| bytes[i]))
                }
            }
        )*
    };
}

impl_scalar_primitive!(u16, u32, i32, f32);

impl<T: Scalar, const N: usize> Scalar for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn write_le(&self, out: &mut Vec<u8>) {
        for item in self {
            item.write_le(out);
        }
    }

    fn read_le(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| T::read_le(&bytes[i * T::SIZE..(i + 1) * T::SIZE]))
    }
}

/// Bone id written for an empty influence slot
pub const EMPTY_BONE_ID: i32 = -1;

impl Scalar for Vertex {
    const SIZE: usize = 3 * 4 + 3 * 4 + 2 * 4 + 3 * 4 + 3 * 4 + 4 * 4 + 4 * 4;

    fn write_le(&self, out: &mut Vec<u8>) {
        self.position.write_le(out);
        self.normal.write_le(out);
        self.uv.write_le(out);
        self.tangent.write_le(out);
        self.bitangent.write_le(out);
        for slot in &self.influences {
            slot.map_or(EMPTY_BONE_ID, |i| i.bone_id).write_le(out);
        }
        for slot in &self.influences {
            slot.map_or(0.0, |i| i.weight).write_le(out);
        }
    }

    fn read_le(bytes: &[u8]) -> Self {
        let ids = <[i32; 4]>::read_le(&bytes[56..72]);
        let weights = <[f32; 4]>::read_le(&bytes[72..88]);
        Self {
            position: Scalar::read_le(&bytes[0..12]),
            normal: Scalar::read_le(&bytes[12..24]),
            uv: Scalar::read_le(&bytes[24..32]),
            tangent: Scalar::read_le(&bytes[32..44]),
            bitangent: Scalar::read_le(&bytes[44..56]),
            influences: std::array::from_fn(|i| {
                (ids[i] != EMPTY_BONE_ID).then_some(BoneInfluence {
                    bone_id: ids[i],
                    weight: weights[i],
                })
            }),
        }
    }
}

impl Scalar for KeyPosition {
    const SIZE: usize = 16;

    fn write_le(&self, out: &mut Vec<u8>) {
        self.position.write_le(out);
        self.time_stamp.write_le(out);
    }

    fn read_le(bytes: &[u8]) -> Self {
        Self {
            position: Scalar::read_le(&bytes[0..12]),
            time_stamp: Scalar::read_le(&bytes[12..16]),
        }
    }
}

impl Scalar for KeyRotation {
    const SIZE: usize = 20;

    fn write_le(&self, out: &mut Vec<u8>) {
        self.orientation.write_le(out);
        self.time_stamp.write_le(out);
    }

    fn read_le(bytes: &[u8]) -> Self {
        Self {
            orientation: Scalar::read_le(&bytes[0..16]),
            time_stamp: Scalar::read_le(&bytes[16..20]),
        }
    }
}

impl Scalar for KeyScale {
    const SIZE: usize = 16;

    fn write_le(&self, out: &mut Vec<u8>) {
        self.scale.write_le(out);
        self.time_stamp.write_le(out);
    }

    fn read_le(bytes: &[u8]) -> Self {
        Self {
            scale: Scalar::read_le(&bytes[0..12]),
            time_stamp: Scalar::read_le(&bytes[12..16]),
        }
    }
}

/// Encoded size of a string
pub fn str_size(s: &str) -> usize {
    2 + s.len()
}

/// Encoded size of an array of `count` scalars
pub fn array_size<T: Scalar>(count: usize) -> usize {
    4 + count * T::SIZE
}

/// Append-only byte buffer that knows where it will land in the file.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    base: usize,
    buf: Vec<u8>,
}

impl BinaryWriter {
    /// Writer for a buffer starting at file offset 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer for a block that will be placed at absolute offset `base`
    pub fn at(base: usize) -> Self {
        Self {
            base,
            buf: Vec::new(),
        }
    }

    /// Absolute file offset where this block begins
    pub fn base(&self) -> usize {
        self.base
    }

    /// Absolute file offset of the next byte written
    pub fn position(&self) -> usize {
        self.base + self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_scalar<T: Scalar>(&mut self, value: &T) {
        value.write_le(&mut self.buf);
    }

    pub fn write_array<T: Scalar>(&mut self, items: &[T]) -> Result<(), EncodeError> {
        let bytes = items.len() * T::SIZE;
        let prefix = u32::try_from(bytes).map_err(|_| EncodeError::ArrayTooLarge { bytes })?;
        self.write_scalar(&prefix);
        self.buf.reserve(bytes);
        for item in items {
            item.write_le(&mut self.buf);
        }
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), EncodeError> {
        let len =
            u16::try_from(s.len()).map_err(|_| EncodeError::StringTooLong { len: s.len() })?;
        self.write_scalar(&len);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Write a `u16` element count
    pub fn write_count(&mut self, what: &'static str, count: usize) -> Result<(), EncodeError> {
        let count = u16::try_from(count).map_err(|_| EncodeError::CountOverflow { what, count })?;
        self.write_scalar(&count);
        Ok(())
    }

    /// Write a `u32` absolute file offset
    pub fn write_offset(&mut self, offset: usize) -> Result<(), EncodeError> {
        let value = u32::try_from(offset).map_err(|_| EncodeError::OffsetOverflow { offset })?;
        self.write_scalar(&value);
        Ok(())
    }

    /// Append a block that was built for the current position.
    pub fn append(&mut self, block: BinaryWriter) {
        debug_assert_eq!(
            block.base,
            self.position(),
            "block appended away from the offset it was built for"
        );
        self.buf.extend_from_slice(&block.buf);
    }
}

/// Cursor over an encoded buffer
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Reader positioned at absolute offset `pos`
    pub fn at(bytes: &'a [u8], pos: usize) -> Result<Self, DecodeError> {
        if pos > bytes.len() {
            return Err(DecodeError::UnexpectedEof {
                offset: pos,
                needed: 0,
            });
        }
        Ok(Self { bytes, pos })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < needed {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    pub fn read_scalar<T: Scalar>(&mut self) -> Result<T, DecodeError> {
        self.take(T::SIZE).map(T::read_le)
    }

    pub fn read_array<T: Scalar>(&mut self) -> Result<Vec<T>, DecodeError> {
        let bytes = self.read_scalar::<u32>()? as usize;
        if !bytes.is_multiple_of(T::SIZE) {
            return Err(DecodeError::MisalignedArray {
                bytes,
                element: T::SIZE,
            });
        }
        let payload = self.take(bytes)?;
        Ok(payload.chunks_exact(T::SIZE).map(T::read_le).collect())
    }

    pub fn read_str(&mut self) -> Result<String, DecodeError> {
        let len = self.read_scalar::<u16>()? as usize;
        let offset = self.pos;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }

    pub fn read_count(&mut self) -> Result<usize, DecodeError> {
        self.read_scalar::<u16>().map(usize::from)
    }

    pub fn read_offset(&mut self) -> Result<usize, DecodeError> {
        self.read_scalar::<u32>().map(|o| o as usize)
    }
}
