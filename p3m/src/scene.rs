//! The host-neutral skeletal mesh that is encoded and decoded.
//!
//! Positions here are absolute and in the host frame. Host applications either build
//! a [`Scene`] directly or expose their data through [`SceneSource`], and receive
//! decoded scenes through [`SceneSink`].

use glam::{Vec2, Vec3};
use itertools::Itertools;

use crate::mesh::{
    build_topology, faces_from_corners, DegenerateFace, Face, Topology, VertexGroup,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneBinding {
    pub bone: usize,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneBone {
    pub name: String,
    pub head: Vec3,
    /// Derived when decoding; ignored by the encoder.
    pub tail: Vec3,
    /// `None` only for bone 0.
    pub parent: Option<usize>,
    pub local_vector: Vec3,
    pub scale: f32,
    /// Derived when decoding; ignored by the encoder.
    pub hidden: bool,
}

impl SceneBone {
    #[must_use]
    pub fn new(name: impl Into<String>, head: Vec3, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            head,
            tail: head,
            parent,
            local_vector: Vec3::ZERO,
            scale: 1.0,
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Bottom-left origin.
    pub uv: Vec2,
    pub binding: Option<BoneBinding>,
}

impl SceneVertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
            binding: None,
        }
    }

    #[must_use]
    pub fn bound_to(mut self, bone: usize, weight: f32) -> Self {
        self.binding = Some(BoneBinding { bone, weight });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub bones: Vec<SceneBone>,
    pub vertices: Vec<SceneVertex>,
    pub triangles: Vec<[u32; 3]>,
}

/// Read access to an armature and mesh owned by a host application.
pub trait SceneSource {
    /// Bones in index order, bone 0 being the root.
    fn bones(&self) -> Vec<SceneBone>;
    fn vertices(&self) -> Vec<SceneVertex>;
    /// Vertex indices of the face corners, three per triangle.
    fn face_corners(&self) -> Vec<u32>;
}

/// Receives a decoded scene, building the host's own objects from it.
pub trait SceneSink {
    fn bone(&mut self, index: usize, bone: &SceneBone);
    fn vertex(&mut self, index: usize, vertex: &SceneVertex);
    fn face(&mut self, face: &Face);
    fn vertex_group(&mut self, group: &VertexGroup);
}

impl Scene {
    #[must_use]
    pub fn from_source(source: &impl SceneSource) -> Self {
        Self {
            bones: source.bones(),
            vertices: source.vertices(),
            triangles: faces_from_corners(&source.face_corners()),
        }
    }

    #[must_use]
    pub fn topology(&self) -> Topology {
        let uvs: Vec<Vec2> = self.vertices.iter().map(|vertex| vertex.uv).collect();
        build_topology(&self.triangles, &uvs)
    }

    #[must_use]
    pub fn vertex_groups(&self) -> Vec<VertexGroup> {
        crate::mesh::vertex_groups(
            self.bones.iter().map(|bone| bone.name.as_str()),
            self.vertices
                .iter()
                .map(|vertex| vertex.binding.map(|binding| (binding.bone, binding.weight))),
        )
    }

    /// Replays the scene into `sink`: bones, then vertices, faces and vertex groups.
    /// Returns the faces that were skipped.
    pub fn emit(&self, sink: &mut impl SceneSink) -> Vec<DegenerateFace> {
        for (index, bone) in self.bones.iter().enumerate() {
            sink.bone(index, bone);
        }
        for (index, vertex) in self.vertices.iter().enumerate() {
            sink.vertex(index, vertex);
        }

        let topology = self.topology();
        for face in &topology.faces {
            sink.face(face);
        }
        for group in &self.vertex_groups() {
            sink.vertex_group(group);
        }

        topology.rejected
    }

    /// Hides every bone that no vertex is bound to and whose children are all hidden.
    /// Other bones are unhidden.
    pub fn mark_unused_bones(&mut self) {
        let bone_count = self.bones.len();

        let mut used = vec![false; bone_count];
        for binding in self.vertices.iter().filter_map(|vertex| vertex.binding) {
            if let Some(flag) = used.get_mut(binding.bone) {
                *flag = true;
            }
        }

        let mut children = vec![Vec::new(); bone_count];
        for (index, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent.filter(|&parent| parent < bone_count) {
                children[parent].push(index);
            }
        }

        // deepest first, so children are decided before their parents
        let order = (0..bone_count)
            .sorted_by_key(|&index| std::cmp::Reverse(self.depth(index)))
            .collect_vec();

        for index in order {
            let hidden =
                !used[index] && children[index].iter().all(|&child| self.bones[child].hidden);
            self.bones[index].hidden = hidden;
        }
    }

    fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.bones[index].parent;

        while let Some(parent) = current {
            depth += 1;
            if depth > self.bones.len() {
                break;
            }
            current = self.bones.get(parent).and_then(|bone| bone.parent);
        }

        depth
    }
}
