//! Rebuilding the angle bone tree from the two cross-referencing bone arrays.
//!
//! Everything here is in the file frame. Position bones carry each joint's offset from
//! its parent joint; angle bones list the position bones they lead to. The tree is
//! recovered by joining the two lists and walking it breadth first from angle bone 0.

use std::collections::VecDeque;

use glam::Vec3;
use tracing::debug;

use crate::{AngleBone, BoneKind, Error, PositionBone, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Absolute head in the file frame.
    pub head: Vec3,
    pub tail: Vec3,
    /// Absolute, accumulated from the stored per-bone deltas.
    pub local_vector: Vec3,
    pub scale: f32,
}

/// A reconstructed angle bone tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    nodes: Vec<Node>,
    order: Vec<usize>,
}

impl Skeleton {
    /// Nodes indexed like the angle bones they came from.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node indices in breadth first order from the root.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Rebuilds the tree.
///
/// A bone with exactly one child gets a tail at that child's head; any
/// other bone gets a tail of `stub_length` continuing its parent's direction, or
/// pointing along +Y for the root.
///
/// # Errors
///
/// Returns `Err(OrphanBone)` if a child list references a bone that doesn't exist or
/// an angle bone can't be reached from the root, and `Err(CyclicHierarchy)` if an
/// angle bone is reached twice.
pub fn reconstruct(
    position_bones: &[PositionBone],
    angle_bones: &[AngleBone],
    stub_length: f32,
) -> Result<Skeleton> {
    let offsets = joint_offsets(position_bones, angle_bones.len())?;
    if angle_bones.is_empty() {
        return Ok(Skeleton {
            nodes: Vec::new(),
            order: Vec::new(),
        });
    }

    let children = resolve_children(position_bones, angle_bones)?;

    let mut nodes: Vec<Node> = angle_bones
        .iter()
        .zip(&offsets)
        .map(|(bone, offset)| Node {
            parent: None,
            children: Vec::new(),
            head: offset.unwrap_or(Vec3::ZERO),
            tail: Vec3::ZERO,
            local_vector: Vec3::from(bone.local_vector),
            scale: bone.scale,
        })
        .collect();

    if offsets[0].is_none() {
        debug!("no position bone lists the root, placing it at the origin");
    }

    let mut visited = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    let mut queue = VecDeque::from([0]);
    visited[0] = true;

    while let Some(index) = queue.pop_front() {
        order.push(index);

        for &child in &children[index] {
            if child == index {
                debug!("angle bone {} lists its own joint, ignoring", index);
                continue;
            }
            if visited[child] {
                return Err(Error::CyclicHierarchy { index: child });
            }
            visited[child] = true;

            let (head, local_vector) = (nodes[index].head, nodes[index].local_vector);
            let node = &mut nodes[child];
            node.parent = Some(index);
            node.head += head;
            node.local_vector += local_vector;

            nodes[index].children.push(child);
            queue.push_back(child);
        }
    }

    if let Some(index) = visited.iter().position(|&seen| !seen) {
        return Err(Error::OrphanBone {
            kind: BoneKind::Angle,
            index,
        });
    }

    for &index in &order {
        let tail = tail_for(&nodes, index, stub_length);
        nodes[index].tail = tail;
    }

    Ok(Skeleton { nodes, order })
}

/// The stored offset of each angle bone's joint.
/// When several position bones list the same angle bone, the last one wins.
fn joint_offsets(
    position_bones: &[PositionBone],
    angle_count: usize,
) -> Result<Vec<Option<Vec3>>> {
    let mut offsets = vec![None; angle_count];

    for bone in position_bones {
        for angle in bone.child_angle_indices.iter() {
            let offset = offsets.get_mut(angle).ok_or(Error::OrphanBone {
                kind: BoneKind::Angle,
                index: angle,
            })?;
            *offset = Some(Vec3::from(bone.position));
        }
    }

    Ok(offsets)
}

/// Angle bone children of each angle bone, in first seen order without repeats.
fn resolve_children(
    position_bones: &[PositionBone],
    angle_bones: &[AngleBone],
) -> Result<Vec<Vec<usize>>> {
    angle_bones
        .iter()
        .map(|bone| {
            let mut children = Vec::new();

            for position in bone.child_position_indices.iter() {
                let joint = position_bones.get(position).ok_or(Error::OrphanBone {
                    kind: BoneKind::Position,
                    index: position,
                })?;

                for angle in joint.child_angle_indices.iter() {
                    if !children.contains(&angle) {
                        children.push(angle);
                    }
                }
            }

            Ok(children)
        })
        .collect()
}

fn tail_for(nodes: &[Node], index: usize, stub_length: f32) -> Vec3 {
    let node = &nodes[index];

    if let &[child] = node.children.as_slice() {
        return nodes[child].head;
    }

    let direction = node
        .parent
        .map(|parent| (nodes[parent].tail - nodes[parent].head).normalize_or_zero())
        .filter(|direction| *direction != Vec3::ZERO)
        .unwrap_or(Vec3::Y);

    node.head + direction * stub_length
}
