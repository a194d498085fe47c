//! Faces, skin bindings and vertex groups.

use std::result;

use glam::Vec2;
use tracing::warn;

use crate::{Error, Result, NO_INDEX};

/// A triangle dropped while building topology.
#[derive(Debug, Clone, Copy, thiserror::Error, Hash, PartialEq, Eq)]
pub enum DegenerateFace {
    #[error("face {face} uses vertex {vertex} more than once")]
    RepeatedVertex { face: usize, vertex: u32 },
    #[error("face {face} references missing vertex {vertex}")]
    MissingVertex { face: usize, vertex: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Index of the triangle this face was built from.
    pub index: usize,
    pub vertices: [u32; 3],
    pub uvs: [Vec2; 3],
}

/// Renderable faces, plus the triangles that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub faces: Vec<Face>,
    pub rejected: Vec<DegenerateFace>,
}

/// The vertices bound to one bone, with their weights.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexGroup {
    pub bone: usize,
    pub name: String,
    pub members: Vec<(usize, f32)>,
}

/// Groups a flat stream of face corners into triangles.
/// A trailing partial triangle is discarded.
#[must_use]
pub fn faces_from_corners(corners: &[u32]) -> Vec<[u32; 3]> {
    let chunks = corners.chunks_exact(3);
    if !chunks.remainder().is_empty() {
        warn!(
            "discarding {} trailing face corners",
            chunks.remainder().len()
        );
    }

    chunks.map(|chunk| [chunk[0], chunk[1], chunk[2]]).collect()
}

/// Builds faces with per-corner UVs, skipping triangles that repeat a vertex or
/// reference one past `uvs`.
#[must_use]
pub fn build_topology(triangles: &[[u32; 3]], uvs: &[Vec2]) -> Topology {
    let mut topology = Topology::default();

    for (index, &vertices) in triangles.iter().enumerate() {
        match check_triangle(index, vertices, uvs.len()) {
            Ok(()) => topology.faces.push(Face {
                index,
                vertices,
                uvs: vertices.map(|vertex| uvs[vertex as usize]),
            }),
            Err(rejected) => {
                warn!("skipping face: {}", rejected);
                topology.rejected.push(rejected);
            }
        }
    }

    topology
}

fn check_triangle(
    face: usize,
    vertices: [u32; 3],
    vertex_count: usize,
) -> result::Result<(), DegenerateFace> {
    if let Some(&vertex) = vertices
        .iter()
        .find(|&&vertex| vertex as usize >= vertex_count)
    {
        return Err(DegenerateFace::MissingVertex { face, vertex });
    }

    let [a, b, c] = vertices;
    if a == b || a == c {
        return Err(DegenerateFace::RepeatedVertex { face, vertex: a });
    }
    if b == c {
        return Err(DegenerateFace::RepeatedVertex { face, vertex: b });
    }

    Ok(())
}

/// One group per bone, named like the bone, listing every vertex bound to it.
#[must_use]
pub fn vertex_groups<'a>(
    bone_names: impl IntoIterator<Item = &'a str>,
    bindings: impl IntoIterator<Item = Option<(usize, f32)>>,
) -> Vec<VertexGroup> {
    let mut groups: Vec<VertexGroup> = bone_names
        .into_iter()
        .enumerate()
        .map(|(bone, name)| VertexGroup {
            bone,
            name: name.to_owned(),
            members: Vec::new(),
        })
        .collect();

    for (vertex, binding) in bindings.into_iter().enumerate() {
        if let Some((bone, weight)) = binding {
            if let Some(group) = groups.get_mut(bone) {
                group.members.push((vertex, weight));
            }
        }
    }

    groups
}

/// The stored bone index of a vertex bound to angle bone `bone`.
///
/// # Errors
///
/// Returns `Err(CapacityExceeded)` if the biased index would collide with the unbound
/// marker.
pub fn bias_bone_index(bone: usize, position_bone_count: usize) -> Result<u8> {
    let biased = bone + position_bone_count;
    if biased >= usize::from(NO_INDEX) {
        return Err(Error::CapacityExceeded {
            what: "biased bone index",
            count: biased,
            limit: usize::from(NO_INDEX) - 1,
        });
    }
    Ok(biased as u8)
}

/// The angle bone a stored bone index refers to, or `None` for an unbound vertex.
///
/// # Errors
///
/// Returns `Err(InvalidBoneIndex)` if the index doesn't land on an angle bone.
pub fn unbias_bone_index(
    vertex: usize,
    stored: u8,
    position_bone_count: usize,
    angle_bone_count: usize,
) -> Result<Option<usize>> {
    if stored == NO_INDEX {
        return Ok(None);
    }

    usize::from(stored)
        .checked_sub(position_bone_count)
        .filter(|&bone| bone < angle_bone_count)
        .map(Some)
        .ok_or(Error::InvalidBoneIndex {
            vertex,
            index: usize::from(stored),
        })
}
