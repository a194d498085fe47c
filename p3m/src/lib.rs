#![warn(clippy::all, clippy::pedantic)]
// file format counts are u8/u16 by definition
#![allow(clippy::cast_possible_truncation)]

//! Reading and writing of Perfect 3D Model (`.p3m`) skeletal meshes.
//!
//! [`decode`] turns the bytes of a file into a [`Scene`] with absolute bone heads and
//! vertex positions in the host frame; [`encode`] is its inverse. [`P3m`] exposes the
//! raw bone and geometry arrays for tools that want to look at the file as stored.

mod assemble;
mod binary_utils;
mod flatten;
mod format;
mod settings;

pub mod dedup;
pub mod hierarchy;
pub mod mesh;
pub mod scene;
pub mod transform;

use std::{
    fmt::{self, Display},
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    result,
};

use thiserror::Error;
use tracing::debug;

pub use format::{
    AngleBone, ChildIndices, P3m, PositionBone, Triangle, Vertex, MAGIC, MAX_BONES, MAX_CHILDREN,
    MAX_FACES, MAX_VERTICES, NO_INDEX, RESERVED_LEN,
};
pub use mesh::{faces_from_corners, DegenerateFace, Face, Topology, VertexGroup};
pub use scene::{BoneBinding, Scene, SceneBone, SceneSink, SceneSource, SceneVertex};
pub use settings::DecodeSettings;

#[derive(Debug, Clone, Error, Hash, PartialEq, Eq)]
pub enum Error {
    #[error("io error accessing `{path}`: {error}")]
    Io { path: String, error: String },
    #[error("not a p3m file: invalid magic `{magic}`")]
    MalformedHeader { magic: String },
    #[error("eof reading {section}: {needed} bytes needed, {available} left")]
    TruncatedBuffer {
        section: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("{what} count {count} exceeds the format limit of {limit}")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        limit: usize,
    },
    #[error("{kind} bone {index} is not reachable from the root bone")]
    OrphanBone { kind: BoneKind, index: usize },
    #[error("angle bone {index} is reached more than once while walking the hierarchy")]
    CyclicHierarchy { index: usize },
    #[error("vertex {vertex} references invalid bone index {index}")]
    InvalidBoneIndex { vertex: usize, index: usize },
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum BoneKind {
    Position,
    Angle,
}

pub type Result<T> = result::Result<T, Error>;

impl Display for BoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoneKind::Position => "position",
            BoneKind::Angle => "angle",
        })
    }
}

impl Error {
    fn from_io(err: &io::Error, path: &impl ToString) -> Self {
        Self::Io {
            path: path.to_string(),
            error: err.to_string(),
        }
    }
}

/// Encodes a scene into the bytes of a `.p3m` file.
///
/// # Errors
///
/// Returns `Err` if the scene exceeds the format's capacity or its bone parents
/// don't form a single tree rooted at bone 0.
pub fn encode(scene: &Scene) -> Result<Vec<u8>> {
    Ok(flatten::flatten(scene)?.to_bytes())
}

/// Encodes the scene exposed by a host application.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_from(source: &impl SceneSource) -> Result<Vec<u8>> {
    encode(&Scene::from_source(source))
}

/// Decodes the bytes of a `.p3m` file with the default settings.
///
/// # Errors
///
/// Returns `Err` if the header is invalid, the buffer is truncated or the bone
/// hierarchy can't be reconstructed.
pub fn decode(bytes: &[u8]) -> Result<Scene> {
    decode_with(bytes, &DecodeSettings::default())
}

/// # Errors
///
/// See [`decode`].
pub fn decode_with(bytes: &[u8], settings: &DecodeSettings) -> Result<Scene> {
    let file = P3m::parse(bytes)?;
    assemble::assemble(&file, settings)
}

/// Reads and decodes a `.p3m` file.
///
/// # Errors
///
/// Returns `Err` if reading the file fails or the file can't be decoded.
pub fn read_file(path: impl AsRef<Path>, settings: &DecodeSettings) -> Result<Scene> {
    let file = P3m::read(path)?;
    assemble::assemble(&file, settings)
}

/// Encodes a scene and writes it to `path`.
/// Nothing is created if the scene can't be encoded.
///
/// # Errors
///
/// Returns `Err` if encoding or writing fails.
pub fn write_file(path: impl AsRef<Path>, scene: &Scene) -> Result<()> {
    let bytes = encode(scene)?;
    write_bytes(path.as_ref(), &bytes)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    debug!("writing {} bytes to `{}`", bytes.len(), path.display());

    let file = File::create(path).map_err(|err| Error::from_io(&err, &path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .map_err(|err| Error::from_io(&err, &path.display()))
}
