use std::{fmt, fs, mem::size_of, path::Path};

use byteorder::LE;
use tracing::debug;
use zerocopy::{
    byteorder::{F32, U16},
    AsBytes, FromBytes, Unaligned,
};

use crate::binary_utils::{
    null_terminated_prefix, parse_mut, parse_slice_mut, take_mut, write, write_slice,
};
use crate::{write_bytes, Error, Result};

const MAGIC_LEN: usize = 27;

/// Format name and version, including the terminating nul.
pub const MAGIC: &[u8; MAGIC_LEN] = b"Perfect 3D Model (Ver 0.5)\0";
/// Number of child slots in a bone record.
pub const MAX_CHILDREN: usize = 10;
/// Marks an unused child slot or an unbound vertex.
pub const NO_INDEX: u8 = 0xff;
/// Size of the opaque block between the mesh counts and the triangles.
pub const RESERVED_LEN: usize = 260;
pub const MAX_BONES: usize = u8::MAX as usize;
pub const MAX_VERTICES: usize = u16::MAX as usize;
pub const MAX_FACES: usize = u16::MAX as usize;

#[derive(Debug, Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct Header {
    magic: [u8; MAGIC_LEN],
    position_bone_count: u8,
    angle_bone_count: u8,
}

#[derive(Debug, Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct RawPositionBone {
    position: [F32<LE>; 3],
    child_angle_indices: [u8; MAX_CHILDREN],
    padding: [u8; 2],
}

#[derive(Debug, Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct RawAngleBone {
    vector: [F32<LE>; 3],
    scale: F32<LE>,
    child_position_indices: [u8; MAX_CHILDREN],
    padding: [u8; 2],
}

#[derive(Debug, Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct MeshHeader {
    vertex_count: U16<LE>,
    face_count: U16<LE>,
}

#[derive(Debug, Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct RawTriangle {
    vertex_indices: [U16<LE>; 3],
}

#[derive(Debug, Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct RawVertex {
    position: [F32<LE>; 3],
    weight: F32<LE>,
    bone_index: u8,
    padding: [u8; 3],
    normal: [F32<LE>; 3],
    uv: [F32<LE>; 2],
}

/// The child slots of a bone record.
/// Unused slots hold [`NO_INDEX`]; the slots are kept as stored so that a parsed file
/// writes back byte for byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildIndices([u8; MAX_CHILDREN]);

impl ChildIndices {
    pub const EMPTY: Self = Self([NO_INDEX; MAX_CHILDREN]);

    /// Packs indices into the slots in order.
    /// Returns the number of indices that didn't fit and were dropped.
    pub fn pack(indices: impl IntoIterator<Item = u8>) -> (Self, usize) {
        let mut slots = [NO_INDEX; MAX_CHILDREN];
        let mut len = 0;
        let mut dropped = 0;

        for index in indices {
            if len < MAX_CHILDREN {
                slots[len] = index;
                len += 1;
            } else {
                dropped += 1;
            }
        }

        (Self(slots), dropped)
    }

    #[must_use]
    pub fn from_slots(slots: [u8; MAX_CHILDREN]) -> Self {
        Self(slots)
    }

    #[must_use]
    pub fn slots(&self) -> &[u8; MAX_CHILDREN] {
        &self.0
    }

    /// Iterates the used slots.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .filter(|&&index| index != NO_INDEX)
            .map(|&index| usize::from(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChildIndices {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for ChildIndices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// A unique joint location. `position` is relative to the parent angle bone's head,
/// except for the root's joint which is absolute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionBone {
    pub position: [f32; 3],
    pub child_angle_indices: ChildIndices,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleBone {
    pub local_vector: [f32; 3],
    pub scale: f32,
    pub child_position_indices: ChildIndices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    pub vertex_indices: [u16; 3],
}

/// A skinned vertex as stored.
/// `bone_index` is biased by the position bone count, or [`NO_INDEX`] if unbound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub weight: f32,
    pub bone_index: u8,
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

fn vec_from_raw<const N: usize>(raw: [F32<LE>; N]) -> [f32; N] {
    raw.map(F32::get)
}

fn vec_to_raw<const N: usize>(vec: [f32; N]) -> [F32<LE>; N] {
    vec.map(F32::new)
}

impl From<&RawPositionBone> for PositionBone {
    fn from(raw: &RawPositionBone) -> Self {
        Self {
            position: vec_from_raw(raw.position),
            child_angle_indices: ChildIndices::from_slots(raw.child_angle_indices),
        }
    }
}

impl From<&PositionBone> for RawPositionBone {
    fn from(bone: &PositionBone) -> Self {
        Self {
            position: vec_to_raw(bone.position),
            child_angle_indices: *bone.child_angle_indices.slots(),
            padding: [0; 2],
        }
    }
}

impl From<&RawAngleBone> for AngleBone {
    fn from(raw: &RawAngleBone) -> Self {
        Self {
            local_vector: vec_from_raw(raw.vector),
            scale: raw.scale.get(),
            child_position_indices: ChildIndices::from_slots(raw.child_position_indices),
        }
    }
}

impl From<&AngleBone> for RawAngleBone {
    fn from(bone: &AngleBone) -> Self {
        Self {
            vector: vec_to_raw(bone.local_vector),
            scale: F32::new(bone.scale),
            child_position_indices: *bone.child_position_indices.slots(),
            padding: [0; 2],
        }
    }
}

impl From<&RawTriangle> for Triangle {
    fn from(raw: &RawTriangle) -> Self {
        Self {
            vertex_indices: raw.vertex_indices.map(U16::get),
        }
    }
}

impl From<&Triangle> for RawTriangle {
    fn from(triangle: &Triangle) -> Self {
        Self {
            vertex_indices: triangle.vertex_indices.map(U16::new),
        }
    }
}

impl From<&RawVertex> for Vertex {
    fn from(raw: &RawVertex) -> Self {
        Self {
            position: vec_from_raw(raw.position),
            weight: raw.weight.get(),
            bone_index: raw.bone_index,
            normal: vec_from_raw(raw.normal),
            uv: vec_from_raw(raw.uv),
        }
    }
}

impl From<&Vertex> for RawVertex {
    fn from(vertex: &Vertex) -> Self {
        Self {
            position: vec_to_raw(vertex.position),
            weight: F32::new(vertex.weight),
            bone_index: vertex.bone_index,
            padding: [0; 3],
            normal: vec_to_raw(vertex.normal),
            uv: vec_to_raw(vertex.uv),
        }
    }
}

fn parse_record<'a, T: FromBytes + Unaligned>(
    bytes: &mut &'a [u8],
    section: &'static str,
) -> Result<&'a T> {
    let available = bytes.len();
    parse_mut(bytes).ok_or(Error::TruncatedBuffer {
        section,
        needed: size_of::<T>(),
        available,
    })
}

fn parse_records<'a, T: FromBytes + Unaligned>(
    bytes: &mut &'a [u8],
    count: usize,
    section: &'static str,
) -> Result<&'a [T]> {
    let available = bytes.len();
    parse_slice_mut(bytes, count).ok_or(Error::TruncatedBuffer {
        section,
        needed: size_of::<T>() * count,
        available,
    })
}

pub(crate) fn check_capacity(what: &'static str, count: usize, limit: usize) -> Result<()> {
    if count > limit {
        return Err(Error::CapacityExceeded { what, count, limit });
    }
    Ok(())
}

/// The bone and geometry arrays of a `.p3m` file, exactly as stored.
#[derive(Clone, PartialEq)]
pub struct P3m {
    position_bones: Vec<PositionBone>,
    angle_bones: Vec<AngleBone>,
    triangles: Vec<Triangle>,
    vertices: Vec<Vertex>,
    reserved: Vec<u8>,
}

impl P3m {
    /// Creates a file with a zeroed reserved block.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a count doesn't fit its field in the file.
    pub fn new(
        position_bones: Vec<PositionBone>,
        angle_bones: Vec<AngleBone>,
        triangles: Vec<Triangle>,
        vertices: Vec<Vertex>,
    ) -> Result<Self> {
        check_capacity("position bone", position_bones.len(), MAX_BONES)?;
        check_capacity("angle bone", angle_bones.len(), MAX_BONES)?;
        check_capacity("face", triangles.len(), MAX_FACES)?;
        check_capacity("vertex", vertices.len(), MAX_VERTICES)?;

        Ok(Self {
            position_bones,
            angle_bones,
            triangles,
            vertices,
            reserved: vec![0; RESERVED_LEN],
        })
    }

    /// # Errors
    ///
    /// Returns `Err` if the file can't be read or isn't a valid p3m file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading `{}`", path.display());

        let bytes = fs::read(path).map_err(|err| Error::from_io(&err, &path.display()))?;
        Self::parse(&bytes)
    }

    /// # Errors
    ///
    /// Returns `Err` if the magic doesn't match or `bytes` ends before the declared
    /// counts are satisfied.
    pub fn parse(mut bytes: &[u8]) -> Result<Self> {
        let magic_prefix = &bytes[..bytes.len().min(MAGIC_LEN)];
        if !MAGIC.starts_with(magic_prefix) {
            return Err(Error::MalformedHeader {
                magic: String::from_utf8_lossy(
                    null_terminated_prefix(magic_prefix).unwrap_or_default(),
                )
                .into_owned(),
            });
        }

        let header: &Header = parse_record(&mut bytes, "header")?;
        let position_bone_count = usize::from(header.position_bone_count);
        let angle_bone_count = usize::from(header.angle_bone_count);

        let position_bones: &[RawPositionBone] =
            parse_records(&mut bytes, position_bone_count, "position bones")?;
        let angle_bones: &[RawAngleBone] =
            parse_records(&mut bytes, angle_bone_count, "angle bones")?;

        let mesh_header: &MeshHeader = parse_record(&mut bytes, "mesh header")?;
        let vertex_count = usize::from(mesh_header.vertex_count.get());
        let face_count = usize::from(mesh_header.face_count.get());

        let available = bytes.len();
        let reserved = take_mut(&mut bytes, RESERVED_LEN).ok_or(Error::TruncatedBuffer {
            section: "reserved block",
            needed: RESERVED_LEN,
            available,
        })?;

        let triangles: &[RawTriangle] = parse_records(&mut bytes, face_count, "triangles")?;
        let vertices: &[RawVertex] = parse_records(&mut bytes, vertex_count, "vertices")?;

        debug!(
            "parsed {} position bones, {} angle bones, {} faces, {} vertices",
            position_bone_count, angle_bone_count, face_count, vertex_count
        );

        if !bytes.is_empty() {
            debug!("ignoring {} trailing bytes", bytes.len());
        }

        Ok(Self {
            position_bones: position_bones.iter().map(PositionBone::from).collect(),
            angle_bones: angle_bones.iter().map(AngleBone::from).collect(),
            triangles: triangles.iter().map(Triangle::from).collect(),
            vertices: vertices.iter().map(Vertex::from).collect(),
            reserved: reserved.to_vec(),
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());

        write(
            &mut out,
            &Header {
                magic: *MAGIC,
                position_bone_count: self.position_bones.len() as u8,
                angle_bone_count: self.angle_bones.len() as u8,
            },
        );

        let position_bones: Vec<RawPositionBone> =
            self.position_bones.iter().map(RawPositionBone::from).collect();
        write_slice(&mut out, &position_bones);

        let angle_bones: Vec<RawAngleBone> =
            self.angle_bones.iter().map(RawAngleBone::from).collect();
        write_slice(&mut out, &angle_bones);

        write(
            &mut out,
            &MeshHeader {
                vertex_count: U16::new(self.vertices.len() as u16),
                face_count: U16::new(self.triangles.len() as u16),
            },
        );
        out.extend_from_slice(&self.reserved);

        let triangles: Vec<RawTriangle> = self.triangles.iter().map(RawTriangle::from).collect();
        write_slice(&mut out, &triangles);

        let vertices: Vec<RawVertex> = self.vertices.iter().map(RawVertex::from).collect();
        write_slice(&mut out, &vertices);

        out
    }

    /// # Errors
    ///
    /// Returns `Err` if the file can't be created or written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        write_bytes(path.as_ref(), &self.to_bytes())
    }

    /// Size of the file in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        size_of::<Header>()
            + self.position_bones.len() * size_of::<RawPositionBone>()
            + self.angle_bones.len() * size_of::<RawAngleBone>()
            + size_of::<MeshHeader>()
            + RESERVED_LEN
            + self.triangles.len() * size_of::<RawTriangle>()
            + self.vertices.len() * size_of::<RawVertex>()
    }

    #[must_use]
    pub fn position_bones(&self) -> &[PositionBone] {
        &self.position_bones
    }

    #[must_use]
    pub fn angle_bones(&self) -> &[AngleBone] {
        &self.angle_bones
    }

    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The opaque block, texture metadata in older tools. Never interpreted.
    #[must_use]
    pub fn reserved(&self) -> &[u8] {
        &self.reserved
    }
}

impl fmt::Debug for P3m {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("P3m")
            .field("position_bones", &self.position_bones.len())
            .field("angle_bones", &self.angle_bones.len())
            .field("triangles", &self.triangles.len())
            .field("vertices", &self.vertices.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
