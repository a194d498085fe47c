//! Merging of coincident joints into shared position bones.

use glam::Vec3;
use itertools::Itertools;
use tracing::debug;

/// A position bone being built by the encoder.
///
/// `position` is in the file frame, relative to the head of `parent`.
#[derive(Debug, Clone, PartialEq)]
pub struct JointCandidate {
    pub position: Vec3,
    pub parent: Option<usize>,
    pub angle_children: Vec<usize>,
}

impl JointCandidate {
    /// The candidate for a single angle bone's joint.
    #[must_use]
    pub fn new(position: Vec3, parent: Option<usize>, angle_bone: usize) -> Self {
        Self {
            position,
            parent,
            angle_children: vec![angle_bone],
        }
    }

    fn coincides_with(&self, other: &Self) -> bool {
        self.parent == other.parent
            && self.position.to_array().map(f32::to_bits)
                == other.position.to_array().map(f32::to_bits)
    }
}

/// Merges candidates with bit-identical coordinates under the same parent angle bone,
/// until no such pair remains.
///
/// The earlier candidate absorbs the angle children of the later one, which is removed.
/// Order among the survivors is preserved.
#[must_use]
pub fn dedup_joints(mut candidates: Vec<JointCandidate>) -> Vec<JointCandidate> {
    loop {
        let pair = (0..candidates.len())
            .tuple_combinations()
            .find(|&(i, j)| candidates[i].coincides_with(&candidates[j]));

        let Some((i, j)) = pair else {
            return candidates;
        };

        let merged = candidates.remove(j);
        debug!(
            "merging joint {} into {} at {:?}: angle bones {:?}",
            j, i, merged.position, merged.angle_children
        );
        candidates[i].angle_children.extend(merged.angle_children);
    }
}
